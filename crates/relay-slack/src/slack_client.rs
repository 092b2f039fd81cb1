//! Slack Web API client used by the relay's inbound and outbound flows.

use anyhow::{anyhow, bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

const THREAD_REPLIES_PAGE_LIMIT: u32 = 150;

#[derive(Debug, Clone, Deserialize)]
struct SlackAuthTestResponse {
    ok: bool,
    user_id: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackChatMessageResponse {
    ok: bool,
    ts: Option<String>,
    channel: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackUserInfoResponse {
    ok: bool,
    #[serde(default)]
    user: Option<SlackUserObject>,
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackUserObject {
    #[serde(default)]
    profile: Option<SlackUserProfile>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackUserProfile {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    real_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackRepliesResponse {
    ok: bool,
    #[serde(default)]
    messages: Vec<SlackHistoryMessage>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    response_metadata: Option<SlackResponseMetadata>,
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackResponseMetadata {
    #[serde(default)]
    next_cursor: Option<String>,
}

/// One message out of a thread-history page.
#[derive(Debug, Clone, Deserialize)]
pub struct SlackHistoryMessage {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub ts: String,
}

/// One page of `conversations.replies` results.
#[derive(Debug, Clone)]
pub struct SlackRepliesPage {
    pub messages: Vec<SlackHistoryMessage>,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SlackPostedMessage {
    pub channel: String,
    pub ts: String,
}

/// Thin typed wrapper over the Slack Web API. No request timeouts are
/// configured: a hung call blocks the single worker, which is the
/// relay's documented delivery-order-over-latency tradeoff.
#[derive(Clone)]
pub struct SlackApiClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
}

impl SlackApiClient {
    pub fn new(api_base: &str, bot_token: &str) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("failed to create slack api client")?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token: bot_token.trim().to_string(),
        })
    }

    /// Resolves the bot's own user id via `auth.test`.
    pub async fn resolve_bot_user_id(&self) -> Result<String> {
        let response: SlackAuthTestResponse = self
            .post_api("auth.test", &json!({}))
            .await
            .context("slack auth.test request failed")?;
        if !response.ok {
            bail!(
                "slack auth.test failed: {}",
                response
                    .error
                    .unwrap_or_else(|| "unknown error".to_string())
            );
        }
        response
            .user_id
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| anyhow!("slack auth.test did not return user_id"))
    }

    /// Posts `text` into `channel`, threading under `thread_ts` when
    /// present and attaching opaque message metadata when given.
    pub async fn post_message(
        &self,
        channel: &str,
        thread_ts: Option<&str>,
        text: &str,
        metadata: Option<Value>,
    ) -> Result<SlackPostedMessage> {
        let mut payload = json!({
            "channel": channel,
            "text": text,
            "unfurl_links": false,
            "unfurl_media": false,
        });
        if let Some(thread_ts) = thread_ts {
            payload["thread_ts"] = Value::String(thread_ts.to_string());
        }
        if let Some(metadata) = metadata {
            payload["metadata"] = metadata;
        }

        let response: SlackChatMessageResponse = self
            .post_api("chat.postMessage", &payload)
            .await
            .context("slack chat.postMessage request failed")?;
        if !response.ok {
            bail!(
                "slack chat.postMessage failed: {}",
                response
                    .error
                    .unwrap_or_else(|| "unknown error".to_string())
            );
        }
        Ok(SlackPostedMessage {
            channel: response.channel.unwrap_or_else(|| channel.to_string()),
            ts: response
                .ts
                .ok_or_else(|| anyhow!("slack chat.postMessage response missing ts"))?,
        })
    }

    /// Resolves a user's display name via `users.info`, preferring the
    /// profile display name, then the real name, then the raw id.
    pub async fn user_display_name(&self, user_id: &str) -> Result<String> {
        let response = self
            .http
            .get(format!("{}/users.info", self.api_base))
            .bearer_auth(&self.bot_token)
            .query(&[("user", user_id)])
            .send()
            .await
            .context("slack users.info request failed")?;
        let response: SlackUserInfoResponse = decode_api_response("users.info", response).await?;
        if !response.ok {
            bail!(
                "slack users.info failed for {user_id}: {}",
                response
                    .error
                    .unwrap_or_else(|| "unknown error".to_string())
            );
        }
        let profile = response.user.and_then(|user| user.profile);
        let name = profile
            .and_then(|profile| {
                profile
                    .display_name
                    .filter(|value| !value.trim().is_empty())
                    .or(profile.real_name)
                    .filter(|value| !value.trim().is_empty())
            })
            .unwrap_or_else(|| user_id.to_string());
        Ok(name)
    }

    /// Fetches one page of thread history (`conversations.replies`,
    /// inclusive of the anchor message). The caller drives pagination
    /// with the returned cursor.
    pub async fn thread_replies_page(
        &self,
        channel: &str,
        thread_ts: &str,
        cursor: Option<&str>,
    ) -> Result<SlackRepliesPage> {
        let limit = THREAD_REPLIES_PAGE_LIMIT.to_string();
        let mut query = vec![
            ("channel", channel),
            ("ts", thread_ts),
            ("inclusive", "true"),
            ("limit", limit.as_str()),
        ];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor));
        }
        let response = self
            .http
            .get(format!("{}/conversations.replies", self.api_base))
            .bearer_auth(&self.bot_token)
            .query(&query)
            .send()
            .await
            .context("slack conversations.replies request failed")?;
        let response: SlackRepliesResponse =
            decode_api_response("conversations.replies", response).await?;
        if !response.ok {
            bail!(
                "slack conversations.replies failed: {}",
                response
                    .error
                    .unwrap_or_else(|| "unknown error".to_string())
            );
        }

        let next_cursor = if response.has_more {
            response
                .response_metadata
                .and_then(|metadata| metadata.next_cursor)
                .filter(|cursor| !cursor.is_empty())
        } else {
            None
        };
        Ok(SlackRepliesPage {
            messages: response.messages,
            next_cursor,
        })
    }

    async fn post_api<T: DeserializeOwned>(&self, operation: &str, payload: &Value) -> Result<T> {
        let response = self
            .http
            .post(format!("{}/{operation}", self.api_base))
            .bearer_auth(&self.bot_token)
            .json(payload)
            .send()
            .await
            .with_context(|| format!("slack api {operation} request failed"))?;
        decode_api_response(operation, response).await
    }
}

async fn decode_api_response<T: DeserializeOwned>(
    operation: &str,
    response: reqwest::Response,
) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!(
            "slack api {operation} failed with status {}: {body}",
            status.as_u16()
        );
    }
    response
        .json::<T>()
        .await
        .with_context(|| format!("failed to decode slack {operation} response"))
}
