//! Slack relay server: receives Slack events and agent-runtime callbacks
//! over HTTP, queues them, and drives a single worker that talks to both
//! upstreams.

mod classifier;
mod context;
mod http;
mod server_args;
mod state;
mod thread_identity;
mod worker;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use relay_agent::AgentRuntimeClient;
use relay_slack::SlackApiClient;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::http::build_relay_router;
use crate::server_args::RelayArgs;
use crate::state::{BotIdentity, RelayConfig, RelayState};
use crate::worker::{run_worker, Task};

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = RelayArgs::parse();

    let run_config: serde_json::Value = serde_json::from_str(&args.run_config)
        .context("failed to parse AGENT_RUN_CONFIG as JSON")?;

    let (queue_tx, queue_rx) = mpsc::unbounded_channel();
    let state = Arc::new(RelayState {
        config: RelayConfig {
            assistant_id: args.assistant_id,
            run_config,
            deployment_url: args.deployment_url,
            default_channel: args
                .slack_channel_id
                .filter(|channel| !channel.trim().is_empty()),
        },
        slack: SlackApiClient::new(&args.slack_api_base, &args.slack_bot_token)?,
        agent: AgentRuntimeClient::new(&args.agent_runtime_url)?,
        bot_identity: BotIdentity::new(args.slack_bot_user_id),
        name_cache: context::NameCache::new(),
        queue_tx: queue_tx.clone(),
    });

    let worker = tokio::spawn(run_worker(state.clone(), queue_rx));

    let listener = TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("failed to bind relay server on {}", args.bind))?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve bound relay server address")?;
    tracing::info!(addr = %local_addr, "relay server listening");

    let app = build_relay_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(error) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %error, "failed to listen for shutdown signal");
            }
            tracing::info!("shutdown signal received");
            // Queued tasks drain before the worker exits.
            let _ = queue_tx.send(Task::Shutdown);
        })
        .await
        .context("relay server failed")?;

    worker.await.context("worker task panicked")?;
    Ok(())
}
