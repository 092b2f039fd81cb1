//! Builds the contextual prompt for a thread: paginated history, bot-reply
//! truncation, display-name resolution, and the two-part prompt layout.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use futures_util::future::join_all;
use relay_slack::{
    mention_ids, replace_mentions, SlackApiClient, SlackHistoryMessage, SlackMessageEvent,
};

/// Process-wide user id → display name map. Append-only, never
/// invalidated: display names going stale is an accepted tradeoff.
pub(crate) struct NameCache {
    names: Mutex<HashMap<String, String>>,
}

impl NameCache {
    pub fn new() -> Self {
        Self {
            names: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, user_id: &str) -> Option<String> {
        self.names
            .lock()
            .ok()
            .and_then(|names| names.get(user_id).cloned())
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.names
            .lock()
            .map(|names| names.contains_key(user_id))
            .unwrap_or(false)
    }

    pub fn insert(&self, user_id: &str, name: String) {
        if let Ok(mut names) = self.names.lock() {
            names.insert(user_id.to_string(), name);
        }
    }
}

/// Assembles the prompt for the agent: all thread turns since the bot's
/// last reply, oldest first, with mention tokens and speakers rendered
/// as display names, ending in the triggering message.
pub(crate) async fn build_contextual_message(
    slack: &SlackApiClient,
    cache: &NameCache,
    bot_user_id: &str,
    event: &SlackMessageEvent,
) -> String {
    let history = fetch_thread_history(slack, &event.channel, event.thread_anchor_ts()).await;

    // Newest-to-oldest scan, truncated at the bot's last reply. What
    // remains is the conversation the bot has not yet seen.
    let mut included: Vec<&SlackHistoryMessage> = Vec::new();
    for message in history.iter().rev() {
        if authored_by_bot(message, bot_user_id) {
            break;
        }
        included.push(message);
    }
    included.reverse();

    let mut user_ids: HashSet<String> = HashSet::new();
    for message in &included {
        if let Some(user) = &message.user {
            user_ids.insert(user.clone());
        }
        user_ids.extend(mention_ids(&message.text));
    }
    if let Some(user) = &event.user {
        user_ids.insert(user.clone());
    }
    user_ids.extend(mention_ids(&event.text));

    resolve_display_names(slack, cache, &user_ids).await;

    let mut lines: Vec<String> = included
        .iter()
        .map(|message| format_line(cache, message.user.as_deref(), &message.text))
        .collect();
    if lines.is_empty() {
        // No retrievable history (or every page fetch failed): the
        // triggering event alone is the new message.
        lines.push(format_line(cache, event.user.as_deref(), &event.text));
    }

    let new_message = lines.pop().unwrap_or_default();
    let preceding = lines.join("\n");

    let mut prompt = String::new();
    if !preceding.is_empty() {
        prompt.push_str("Preceding context:\n");
        prompt.push_str(&preceding);
    }
    prompt.push_str("\n\nNew message:\n");
    prompt.push_str(&new_message);
    prompt
}

fn authored_by_bot(message: &SlackHistoryMessage, bot_user_id: &str) -> bool {
    message.bot_id.as_deref() == Some(bot_user_id) || message.user.as_deref() == Some(bot_user_id)
}

/// Follows `conversations.replies` pagination to the end. A failed page
/// fetch degrades to whatever was collected so far instead of failing
/// the task.
async fn fetch_thread_history(
    slack: &SlackApiClient,
    channel: &str,
    thread_ts: &str,
) -> Vec<SlackHistoryMessage> {
    tracing::debug!(channel, thread_ts, "fetching thread history");
    let mut messages = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        match slack
            .thread_replies_page(channel, thread_ts, cursor.as_deref())
            .await
        {
            Ok(page) => {
                messages.extend(page.messages);
                match page.next_cursor {
                    Some(next) => cursor = Some(next),
                    None => break,
                }
            }
            Err(error) => {
                tracing::warn!(
                    channel,
                    thread_ts,
                    error = %format!("{error:#}"),
                    "thread history fetch failed, continuing with partial history"
                );
                break;
            }
        }
    }
    messages
}

/// Resolves display names for ids not yet cached, concurrently. One
/// failed lookup does not fail the batch; that id keeps rendering as its
/// raw identifier.
async fn resolve_display_names(
    slack: &SlackApiClient,
    cache: &NameCache,
    user_ids: &HashSet<String>,
) {
    let uncached: Vec<&str> = user_ids
        .iter()
        .map(String::as_str)
        .filter(|user_id| !cache.contains(user_id))
        .collect();
    if uncached.is_empty() {
        return;
    }
    let lookups = uncached
        .into_iter()
        .map(|user_id| async move { (user_id, slack.user_display_name(user_id).await) });
    for (user_id, result) in join_all(lookups).await {
        match result {
            Ok(name) => cache.insert(user_id, name),
            Err(error) => tracing::warn!(
                user_id,
                error = %format!("{error:#}"),
                "failed to resolve display name"
            ),
        }
    }
}

fn format_line(cache: &NameCache, user: Option<&str>, text: &str) -> String {
    let replaced = replace_mentions(text, |user_id| cache.get(user_id));
    let speaker_id = user.unwrap_or("unknown");
    let speaker = cache
        .get(speaker_id)
        .unwrap_or_else(|| speaker_id.to_string());
    format!("<slackMessage user=\"{speaker}\">{replaced}</slackMessage>")
}
