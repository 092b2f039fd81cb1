//! Slack Web API client, inbound event wire types, and mrkdwn rendering.

mod event;
mod markdown;
mod mention;
mod slack_client;

pub use event::{SlackEventEnvelope, SlackMessageEvent};
pub use markdown::render_slack_markdown;
pub use mention::{mention_ids, mention_pattern, replace_mentions};
pub use slack_client::{
    SlackApiClient, SlackHistoryMessage, SlackPostedMessage, SlackRepliesPage,
};
