//! Command-line and environment configuration for the relay server.

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "relay-server",
    about = "Relays Slack messages to an asynchronous agent runtime and posts its replies back",
    version
)]
pub(crate) struct RelayArgs {
    #[arg(
        long,
        env = "RELAY_BIND",
        default_value = "0.0.0.0:8080",
        help = "Address the webhook server listens on."
    )]
    pub bind: String,

    #[arg(
        long,
        env = "SLACK_API_BASE",
        default_value = "https://slack.com/api",
        help = "Slack Web API base URL."
    )]
    pub slack_api_base: String,

    #[arg(
        long,
        env = "SLACK_BOT_TOKEN",
        help = "Slack bot token used for all Web API calls."
    )]
    pub slack_bot_token: String,

    #[arg(
        long,
        env = "SLACK_BOT_USER_ID",
        help = "Bot user id. Resolved once via auth.test when omitted."
    )]
    pub slack_bot_user_id: Option<String>,

    #[arg(
        long,
        env = "SLACK_CHANNEL_ID",
        help = "Fallback channel for agent callbacks carrying no routable channel metadata."
    )]
    pub slack_channel_id: Option<String>,

    #[arg(
        long,
        env = "AGENT_RUNTIME_URL",
        help = "Base URL of the agent runtime API."
    )]
    pub agent_runtime_url: String,

    #[arg(
        long,
        env = "AGENT_ASSISTANT_ID",
        default_value = "chat",
        help = "Assistant id that runs are created against."
    )]
    pub assistant_id: String,

    #[arg(
        long,
        env = "AGENT_RUN_CONFIG",
        default_value = "{}",
        help = "JSON configuration blob forwarded on every create-run call."
    )]
    pub run_config: String,

    #[arg(
        long,
        env = "DEPLOYMENT_URL",
        default_value = "",
        help = "Public base URL of this deployment, used to build the per-thread webhook URLs handed to the agent runtime."
    )]
    pub deployment_url: String,
}
