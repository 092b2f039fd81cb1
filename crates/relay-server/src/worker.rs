//! Single-consumer task worker. HTTP handlers enqueue, this loop drains,
//! one task at a time, preserving arrival order within the process.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use relay_agent::{NewRun, RunCallback};
use relay_slack::{render_slack_markdown, SlackMessageEvent};
use serde_json::json;
use tokio::sync::mpsc;

use crate::context::build_contextual_message;
use crate::state::RelayState;
use crate::thread_identity::thread_conversation_id;

/// Unit of work for the relay's queue.
pub(crate) enum Task {
    /// An admitted inbound Slack message to forward to the agent runtime.
    SlackMessage(SlackMessageEvent),
    /// A finished-run callback whose reply goes back to Slack.
    Callback(RunCallback),
    /// Drain no further tasks and exit the loop.
    Shutdown,
}

/// Drains the queue until a `Shutdown` task (or a closed channel). A
/// failed task is logged and dropped; it never takes the worker down
/// with it.
pub(crate) async fn run_worker(state: Arc<RelayState>, mut queue_rx: mpsc::UnboundedReceiver<Task>) {
    while let Some(task) = queue_rx.recv().await {
        let outcome = match task {
            Task::SlackMessage(event) => process_slack_message(&state, event).await,
            Task::Callback(callback) => process_callback(&state, callback).await,
            Task::Shutdown => {
                tracing::info!("worker received shutdown task, draining stopped");
                break;
            }
        };
        if let Err(error) = outcome {
            tracing::error!(error = %format!("{error:#}"), "task failed");
        }
    }
}

/// Assembles the contextual prompt for the message's thread and submits a
/// run, addressed by the thread's deterministic conversation id.
async fn process_slack_message(state: &RelayState, event: SlackMessageEvent) -> Result<()> {
    let bot_user_id = state
        .bot_identity
        .user_id(&state.slack)
        .await
        .context("failed to resolve bot user id")?
        .to_string();

    let prompt =
        build_contextual_message(&state.slack, &state.name_cache, &bot_user_id, &event).await;
    let thread_id = thread_conversation_id(event.thread_anchor_ts(), &event.channel);
    let webhook = format!(
        "{}/callbacks/{thread_id}",
        state.config.deployment_url.trim_end_matches('/')
    );

    tracing::info!(
        thread_id,
        channel = %event.channel,
        ts = %event.ts,
        "forwarding slack message to agent runtime"
    );
    state
        .agent
        .create_run(
            &thread_id,
            &NewRun {
                assistant_id: state.config.assistant_id.clone(),
                user_message: prompt,
                config: state.config.run_config.clone(),
                metadata: json!({
                    "event": "slack",
                    "slack_event_type": event.event_type,
                    "bot_user_id": bot_user_id,
                    "slack_user_id": event.user,
                    "channel": event.channel,
                    "thread_ts": event.thread_ts,
                    "event_ts": event.ts,
                    "channel_type": event.channel_type,
                }),
                webhook,
            },
        )
        .await?;
    Ok(())
}

/// Posts the run's final reply back into the originating Slack thread,
/// with Slack-dialect markdown.
async fn process_callback(state: &RelayState, callback: RunCallback) -> Result<()> {
    let Some(reply) = callback.reply_text() else {
        bail!(
            "callback for thread {} carried no messages",
            callback.thread_id
        );
    };
    let Some(channel) = callback
        .metadata
        .channel
        .as_deref()
        .or(state.config.default_channel.as_deref())
    else {
        bail!(
            "callback for thread {} has no channel and no default channel is configured",
            callback.thread_id
        );
    };

    let text = render_slack_markdown(&reply);
    let posted = state
        .slack
        .post_message(
            channel,
            callback.metadata.reply_thread_ts(),
            &text,
            Some(json!({
                "event_type": "webhook",
                "event_payload": {"thread_id": callback.thread_id},
            })),
        )
        .await?;
    tracing::info!(
        thread_id = %callback.thread_id,
        channel = %posted.channel,
        ts = %posted.ts,
        "posted agent reply to slack"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use relay_agent::AgentRuntimeClient;
    use relay_slack::SlackApiClient;
    use serde_json::json;

    use crate::context::NameCache;
    use crate::state::{BotIdentity, RelayConfig};

    use super::*;

    fn test_state(
        server: &MockServer,
        default_channel: Option<&str>,
    ) -> (Arc<RelayState>, mpsc::UnboundedReceiver<Task>) {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let state = Arc::new(RelayState {
            config: RelayConfig {
                assistant_id: "chat".to_string(),
                run_config: json!({}),
                deployment_url: "https://relay.example".to_string(),
                default_channel: default_channel.map(str::to_string),
            },
            slack: SlackApiClient::new(&server.base_url(), "xoxb-test").expect("slack client"),
            agent: AgentRuntimeClient::new(&server.base_url()).expect("agent client"),
            bot_identity: BotIdentity::new(Some("UBOT".to_string())),
            name_cache: NameCache::new(),
            queue_tx,
        });
        (state, queue_rx)
    }

    #[tokio::test]
    async fn forwards_a_direct_message_as_a_contextual_run() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/conversations.replies");
            then.status(200).json_body(json!({
                "ok": true,
                "messages": [{"user": "U1", "text": "hello", "ts": "42.0"}],
                "has_more": false,
            }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/users.info").query_param("user", "U1");
            then.status(200).json_body(json!({
                "ok": true,
                "user": {"profile": {"display_name": "Alice"}},
            }));
        });
        // Deterministic conversation id for ("42.0", "D024BE91L").
        let create_run = server.mock(|when, then| {
            when.method(POST)
                .path("/threads/9efc946d-9e76-5814-97b9-7574cb25078e/runs")
                .json_body(json!({
                    "assistant_id": "chat",
                    "input": {"messages": [{
                        "role": "user",
                        "content": "\n\nNew message:\n<slackMessage user=\"Alice\">hello</slackMessage>",
                    }]},
                    "config": {},
                    "metadata": {
                        "event": "slack",
                        "slack_event_type": "message",
                        "bot_user_id": "UBOT",
                        "slack_user_id": "U1",
                        "channel": "D024BE91L",
                        "thread_ts": null,
                        "event_ts": "42.0",
                        "channel_type": "im",
                    },
                    "multitask_strategy": "interrupt",
                    "if_not_exists": "create",
                    "webhook": "https://relay.example/callbacks/9efc946d-9e76-5814-97b9-7574cb25078e",
                }));
            then.status(200).json_body(json!({"run_id": "r-1"}));
        });

        let (state, _queue_rx) = test_state(&server, None);
        let event: SlackMessageEvent = serde_json::from_value(json!({
            "type": "message",
            "user": "U1",
            "text": "hello",
            "channel": "D024BE91L",
            "channel_type": "im",
            "ts": "42.0",
        }))
        .expect("decode event");

        process_slack_message(&state, event).await.expect("forward");
        create_run.assert();
    }

    #[tokio::test]
    async fn callback_reply_is_rendered_and_threaded() {
        let server = MockServer::start();
        let post = server.mock(|when, then| {
            when.method(POST).path("/chat.postMessage").json_body(json!({
                "channel": "C1",
                "text": "*hi*",
                "thread_ts": "1.0",
                "unfurl_links": false,
                "unfurl_media": false,
                "metadata": {
                    "event_type": "webhook",
                    "event_payload": {"thread_id": "t-1"},
                },
            }));
            then.status(200)
                .json_body(json!({"ok": true, "ts": "2.0", "channel": "C1"}));
        });

        let (state, _queue_rx) = test_state(&server, None);
        let callback: RunCallback = serde_json::from_value(json!({
            "thread_id": "t-1",
            "metadata": {"thread_ts": "1.0", "channel": "C1"},
            "values": {"messages": [{"content": "**hi**"}]},
        }))
        .expect("decode callback");

        process_callback(&state, callback).await.expect("post reply");
        post.assert();
    }

    #[tokio::test]
    async fn callback_without_channel_falls_back_to_the_configured_default() {
        let server = MockServer::start();
        let post = server.mock(|when, then| {
            when.method(POST)
                .path("/chat.postMessage")
                .json_body_includes(json!({"channel": "CDEFAULT"}).to_string());
            then.status(200)
                .json_body(json!({"ok": true, "ts": "2.0", "channel": "CDEFAULT"}));
        });

        let (state, _queue_rx) = test_state(&server, Some("CDEFAULT"));
        let callback: RunCallback = serde_json::from_value(json!({
            "thread_id": "t-1",
            "metadata": {"event_ts": "1.0"},
            "values": {"messages": [{"content": "done"}]},
        }))
        .expect("decode callback");

        process_callback(&state, callback).await.expect("post reply");
        post.assert();
    }

    #[tokio::test]
    async fn callback_with_no_routable_channel_is_an_error() {
        let server = MockServer::start();
        let post = server.mock(|when, then| {
            when.method(POST).path("/chat.postMessage");
            then.status(200).json_body(json!({"ok": true, "ts": "2.0"}));
        });

        let (state, _queue_rx) = test_state(&server, None);
        let callback: RunCallback = serde_json::from_value(json!({
            "thread_id": "t-lost",
            "values": {"messages": [{"content": "reply"}]},
        }))
        .expect("decode callback");

        let error = process_callback(&state, callback).await.expect_err("no channel");
        assert!(error.to_string().contains("no channel"));
        post.assert_calls(0);
    }

    #[tokio::test]
    async fn worker_survives_failing_tasks_and_exits_on_shutdown() {
        let server = MockServer::start();
        let post = server.mock(|when, then| {
            when.method(POST).path("/chat.postMessage");
            then.status(200)
                .json_body(json!({"ok": true, "ts": "2.0", "channel": "C1"}));
        });

        let (state, queue_rx) = test_state(&server, None);
        let queue_tx = state.queue_tx.clone();
        let worker = tokio::spawn(run_worker(state, queue_rx));

        // First task fails (no channel anywhere); the worker keeps going.
        let broken: RunCallback = serde_json::from_value(json!({
            "thread_id": "t-broken",
            "values": {"messages": [{"content": "reply"}]},
        }))
        .expect("decode callback");
        let good: RunCallback = serde_json::from_value(json!({
            "thread_id": "t-good",
            "metadata": {"channel": "C1", "thread_ts": "1.0"},
            "values": {"messages": [{"content": "reply"}]},
        }))
        .expect("decode callback");

        queue_tx.send(Task::Callback(broken)).expect("enqueue");
        queue_tx.send(Task::Callback(good)).expect("enqueue");
        queue_tx.send(Task::Shutdown).expect("enqueue");
        worker.await.expect("worker exits cleanly");

        post.assert_calls(1);
    }
}
