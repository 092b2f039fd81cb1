//! Wire types for the runtime's asynchronous webhook callback.

use serde::{Deserialize, Serialize};

/// Final run state delivered to `POST /callbacks/{thread_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunCallback {
    pub thread_id: String,
    #[serde(default)]
    pub metadata: CallbackMetadata,
    #[serde(default)]
    pub values: RunValues,
}

/// Metadata echoed back from run creation; used to route the reply into
/// the originating Slack thread.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallbackMetadata {
    #[serde(default)]
    pub thread_ts: Option<String>,
    #[serde(default)]
    pub event_ts: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub channel_type: Option<String>,
}

impl CallbackMetadata {
    /// Thread timestamp to reply under: the originating thread when the
    /// trigger was already threaded, otherwise the trigger's own ts.
    pub fn reply_thread_ts(&self) -> Option<&str> {
        self.thread_ts.as_deref().or(self.event_ts.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunValues {
    #[serde(default)]
    pub messages: Vec<RunMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMessage {
    #[serde(default)]
    pub content: MessageContent,
}

/// Message content as produced by the runtime: either a bare string or a
/// list of typed blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl Default for MessageContent {
    fn default() -> Self {
        MessageContent::Text(String::new())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type", default)]
    pub block_type: String,
    #[serde(default)]
    pub text: String,
}

impl MessageContent {
    /// Flattens content into plain text; block lists keep only `text`
    /// blocks, concatenated in order.
    pub fn flatten(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter(|block| block.block_type == "text")
                .map(|block| block.text.as_str())
                .collect(),
        }
    }
}

impl RunCallback {
    /// The reply is the last message of the run's final state.
    pub fn reply_text(&self) -> Option<String> {
        self.values
            .messages
            .last()
            .map(|message| message.content.flatten())
    }
}
