use std::env;
use std::sync::Arc;
use std::time::Duration;

use adviser::assistants::configs::OpenAiAssistantConfig;
use adviser::assistants::openai::OpenAiAssistantClient;
use adviser::relay::{MessageStreamer, Relay, RelayConfig};
use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod prompt;
mod remote;
mod session;

use prompt::rustyline::RustylinePrompt;
use remote::RemoteRelay;
use session::Session;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Base URL of a running adviserd. Without it the CLI talks to OpenAI directly.
    #[arg(short, long)]
    server: Option<String>,

    /// OpenAI API key (can also be set via ADVISER_ASSISTANT__API_KEY or OPENAI_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Assistant to run (can also be set via ADVISER_ASSISTANT__ASSISTANT_ID)
    #[arg(long)]
    assistant_id: Option<String>,

    /// Seconds between run status checks
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    poll_interval: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    // Logs go to stderr so they never interleave with the rendered replies
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let streamer = build_streamer(&cli)?;
    let prompt = RustylinePrompt::new()?;

    let mut session = Session::new(streamer, Box::new(prompt));
    session.start().await
}

fn build_streamer(cli: &Cli) -> Result<Box<dyn MessageStreamer>> {
    if let Some(server) = &cli.server {
        tracing::info!(server = %server, "relaying through adviserd");
        return Ok(Box::new(RemoteRelay::new(server.clone())));
    }

    let api_key = cli
        .api_key
        .clone()
        .or_else(|| env::var("ADVISER_ASSISTANT__API_KEY").ok())
        .or_else(|| env::var("OPENAI_API_KEY").ok())
        .context(
            "API key must be provided via --api-key, ADVISER_ASSISTANT__API_KEY or OPENAI_API_KEY",
        )?;
    let assistant_id = cli
        .assistant_id
        .clone()
        .or_else(|| env::var("ADVISER_ASSISTANT__ASSISTANT_ID").ok())
        .context(
            "Assistant id must be provided via --assistant-id or ADVISER_ASSISTANT__ASSISTANT_ID",
        )?;

    let mut config = OpenAiAssistantConfig::new(api_key)
        .with_organization(env::var("ADVISER_ASSISTANT__ORGANIZATION").ok());
    if let Ok(host) = env::var("ADVISER_ASSISTANT__HOST") {
        config = config.with_host(host);
    }
    let client = OpenAiAssistantClient::new(config)?;

    let relay_config =
        RelayConfig::new(assistant_id).with_poll_interval(Duration::from_secs(cli.poll_interval));
    Ok(Box::new(Relay::new(Arc::new(client), relay_config)))
}
