//! Create-run client for the agent runtime's HTTP API.

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};

/// Parameters for one run creation. The webhook URL is where the runtime
/// delivers the run's final state once it completes.
#[derive(Debug, Clone)]
pub struct NewRun {
    pub assistant_id: String,
    pub user_message: String,
    pub config: Value,
    pub metadata: Value,
    pub webhook: String,
}

#[derive(Clone)]
pub struct AgentRuntimeClient {
    http: reqwest::Client,
    api_base: String,
}

impl AgentRuntimeClient {
    pub fn new(api_base: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("failed to create agent runtime client")?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    /// Submits a run for `thread_id`. A new message for a thread with an
    /// in-flight run preempts it (`multitask_strategy: interrupt`), and
    /// the thread is created on first use (`if_not_exists: create`).
    pub async fn create_run(&self, thread_id: &str, run: &NewRun) -> Result<Value> {
        let payload = json!({
            "assistant_id": run.assistant_id,
            "input": {
                "messages": [{"role": "user", "content": run.user_message}],
            },
            "config": run.config,
            "metadata": run.metadata,
            "multitask_strategy": "interrupt",
            "if_not_exists": "create",
            "webhook": run.webhook,
        });

        let response = self
            .http
            .post(format!("{}/threads/{thread_id}/runs", self.api_base))
            .json(&payload)
            .send()
            .await
            .context("agent runtime create-run request failed")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!(
                "agent runtime create-run failed with status {}: {body}",
                status.as_u16()
            );
        }
        let body: Value = response
            .json()
            .await
            .context("failed to decode agent runtime create-run response")?;
        tracing::debug!(thread_id, run = %body, "agent runtime run created");
        Ok(body)
    }
}
