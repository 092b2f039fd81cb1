//! Process-scoped shared state for the relay.

use std::sync::OnceLock;

use anyhow::Result;
use regex::Regex;
use relay_agent::AgentRuntimeClient;
use relay_slack::{mention_pattern, SlackApiClient};
use serde_json::Value;
use tokio::sync::{mpsc, OnceCell};

use crate::worker::Task;

/// Settings the worker and handlers read but never mutate.
#[derive(Debug, Clone)]
pub(crate) struct RelayConfig {
    pub assistant_id: String,
    pub run_config: Value,
    pub deployment_url: String,
    pub default_channel: Option<String>,
}

/// Everything the HTTP handlers and the worker share. Handlers only
/// enqueue; the worker is the single consumer and the single writer of
/// the name cache.
pub(crate) struct RelayState {
    pub config: RelayConfig,
    pub slack: SlackApiClient,
    pub agent: AgentRuntimeClient,
    pub bot_identity: BotIdentity,
    pub name_cache: crate::context::NameCache,
    pub queue_tx: mpsc::UnboundedSender<Task>,
}

/// The bot's own user id, resolved at most once per process. Concurrent
/// first callers race to the same value (re-resolving is idempotent), so
/// a `OnceCell` is sufficient. The mention regex is compiled once
/// against the resolved id.
pub(crate) struct BotIdentity {
    configured: Option<String>,
    resolved: OnceCell<String>,
    mention: OnceLock<Regex>,
}

impl BotIdentity {
    pub fn new(configured: Option<String>) -> Self {
        Self {
            configured: configured.filter(|value| !value.trim().is_empty()),
            resolved: OnceCell::new(),
            mention: OnceLock::new(),
        }
    }

    /// The bot's user id, from configuration when present, otherwise
    /// resolved lazily via `auth.test` and memoized for the process
    /// lifetime.
    pub async fn user_id(&self, slack: &SlackApiClient) -> Result<&str> {
        let resolved = self
            .resolved
            .get_or_try_init(|| async {
                match &self.configured {
                    Some(user_id) => Ok(user_id.clone()),
                    None => slack.resolve_bot_user_id().await,
                }
            })
            .await?;
        Ok(resolved.as_str())
    }

    /// Regex matching explicit mentions of the bot, compiled against the
    /// resolved id on first use.
    pub async fn mention_regex(&self, slack: &SlackApiClient) -> Result<&Regex> {
        let user_id = self.user_id(slack).await?;
        Ok(self.mention.get_or_init(|| mention_pattern(user_id)))
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn configured_id_skips_auth_test() {
        let server = MockServer::start();
        let auth = server
            .mock(|when, then| {
                when.method(POST).path("/auth.test");
                then.status(200)
                    .json_body(json!({"ok": true, "user_id": "UOTHER"}));
            });

        let slack = SlackApiClient::new(&server.base_url(), "xoxb-test").expect("client");
        let identity = BotIdentity::new(Some("UBOT".to_string()));
        assert_eq!(identity.user_id(&slack).await.expect("id"), "UBOT");
        assert_eq!(auth.calls(), 0);
    }

    #[tokio::test]
    async fn lazy_resolution_happens_exactly_once() {
        let server = MockServer::start();
        let auth = server
            .mock(|when, then| {
                when.method(POST).path("/auth.test");
                then.status(200)
                    .json_body(json!({"ok": true, "user_id": "UBOT"}));
            });

        let slack = SlackApiClient::new(&server.base_url(), "xoxb-test").expect("client");
        let identity = BotIdentity::new(None);
        assert_eq!(identity.user_id(&slack).await.expect("id"), "UBOT");
        assert_eq!(identity.user_id(&slack).await.expect("id"), "UBOT");
        let pattern = identity.mention_regex(&slack).await.expect("pattern");
        assert!(pattern.is_match("hi <@UBOT>"));
        assert_eq!(auth.calls(), 1);
    }

    #[tokio::test]
    async fn blank_configured_id_falls_back_to_resolution() {
        let server = MockServer::start();
        server
            .mock(|when, then| {
                when.method(POST).path("/auth.test");
                then.status(200)
                    .json_body(json!({"ok": true, "user_id": "UREAL"}));
            });

        let slack = SlackApiClient::new(&server.base_url(), "xoxb-test").expect("client");
        let identity = BotIdentity::new(Some("   ".to_string()));
        assert_eq!(identity.user_id(&slack).await.expect("id"), "UREAL");
    }
}
