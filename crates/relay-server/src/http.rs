//! HTTP surface: the Slack Events API webhook and the agent runtime's
//! finished-run callback. Handlers acknowledge fast and enqueue; all
//! upstream work happens on the worker.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use relay_agent::RunCallback;
use relay_slack::SlackEventEnvelope;
use serde_json::{json, Value};

use crate::classifier::should_forward;
use crate::state::RelayState;
use crate::worker::Task;

pub(crate) fn build_relay_router(state: Arc<RelayState>) -> Router {
    Router::new()
        .route("/events/slack", post(handle_slack_event))
        .route("/callbacks/{thread_id}", post(handle_run_callback))
        .with_state(state)
}

/// Slack retries deliveries that are not acknowledged quickly, so this
/// handler always answers 200 and never blocks on upstream calls beyond
/// admission classification.
async fn handle_slack_event(
    State(state): State<Arc<RelayState>>,
    Json(envelope): Json<SlackEventEnvelope>,
) -> Json<Value> {
    if envelope.envelope_type == "url_verification" {
        let challenge = envelope.challenge.unwrap_or_default();
        return Json(json!({"challenge": challenge}));
    }

    let Some(event) = envelope.event else {
        return Json(json!({"status": "success"}));
    };
    match event.event_type.as_str() {
        "message" => {
            match should_forward(&event, &state.bot_identity, &state.slack).await {
                Ok(true) => {
                    tracing::info!(
                        channel = %event.channel,
                        ts = %event.ts,
                        event_id = ?envelope.event_id,
                        "admitted slack message"
                    );
                    if state.queue_tx.send(Task::SlackMessage(event)).is_err() {
                        tracing::error!("task queue is closed, dropping slack message");
                    }
                }
                Ok(false) => {
                    tracing::debug!(channel = %event.channel, ts = %event.ts, "ignored slack message");
                }
                Err(error) => {
                    tracing::error!(
                        error = %format!("{error:#}"),
                        "failed to classify slack message"
                    );
                }
            }
        }
        // Directed channel messages arrive as both `message` and
        // `app_mention`; only the former is forwarded, so mentions are
        // acknowledged without enqueueing a duplicate.
        "app_mention" => {
            tracing::debug!(channel = %event.channel, ts = %event.ts, "acknowledged app_mention");
        }
        other => {
            tracing::debug!(event_type = other, "ignored unsupported event type");
        }
    }
    Json(json!({"status": "success"}))
}

async fn handle_run_callback(
    State(state): State<Arc<RelayState>>,
    Path(thread_id): Path<String>,
    Json(callback): Json<RunCallback>,
) -> Json<Value> {
    if callback.thread_id != thread_id {
        tracing::warn!(
            path_thread_id = thread_id,
            body_thread_id = callback.thread_id,
            "callback path and body disagree on thread id, trusting the body"
        );
    }
    tracing::info!(thread_id = %callback.thread_id, "received run callback");
    if state.queue_tx.send(Task::Callback(callback)).is_err() {
        tracing::error!("task queue is closed, dropping run callback");
    }
    Json(json!({"status": "success"}))
}
