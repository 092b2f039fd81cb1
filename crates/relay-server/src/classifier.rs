//! Decides whether an inbound Slack event should be forwarded to the agent.

use anyhow::Result;
use relay_slack::{SlackApiClient, SlackMessageEvent};

use crate::state::BotIdentity;

/// An event is forwarded only when it has a known speaker, the speaker
/// is not the bot itself, and it is either a direct message or mentions
/// the bot explicitly. Everything else is acknowledged and dropped.
pub(crate) async fn should_forward(
    event: &SlackMessageEvent,
    bot_identity: &BotIdentity,
    slack: &SlackApiClient,
) -> Result<bool> {
    let Some(user) = event.user.as_deref().filter(|user| !user.is_empty()) else {
        return Ok(false);
    };
    let bot_user_id = bot_identity.user_id(slack).await?;
    if user == bot_user_id || event.bot_id.as_deref() == Some(bot_user_id) {
        return Ok(false);
    }
    if event.is_dm() {
        return Ok(true);
    }
    Ok(bot_identity.mention_regex(slack).await?.is_match(&event.text))
}
