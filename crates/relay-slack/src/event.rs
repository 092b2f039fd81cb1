//! Wire types for the Slack Events API webhook.

use serde::{Deserialize, Serialize};

/// Outer envelope delivered to the events endpoint. `url_verification`
/// envelopes carry a challenge to echo; `event_callback` envelopes carry
/// the inner event payload.
#[derive(Debug, Clone, Deserialize)]
pub struct SlackEventEnvelope {
    #[serde(rename = "type")]
    pub envelope_type: String,
    #[serde(default)]
    pub challenge: Option<String>,
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub event: Option<SlackMessageEvent>,
}

/// A message event as delivered by Slack. Immutable once received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackMessageEvent {
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub channel_type: Option<String>,
    #[serde(default)]
    pub ts: String,
    #[serde(default)]
    pub thread_ts: Option<String>,
    #[serde(default)]
    pub client_msg_id: Option<String>,
    #[serde(default)]
    pub event_ts: Option<String>,
}

impl SlackMessageEvent {
    /// Timestamp anchoring the thread this message belongs to: the parent
    /// `thread_ts` when replying inside a thread, otherwise the message's
    /// own `ts` (it starts a new thread).
    pub fn thread_anchor_ts(&self) -> &str {
        self.thread_ts.as_deref().unwrap_or(self.ts.as_str())
    }

    pub fn is_dm(&self) -> bool {
        self.channel_type.as_deref() == Some("im")
    }
}
