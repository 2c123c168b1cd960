mod configuration;
mod error;
mod routes;
mod state;

use adviser::assistants::openai::OpenAiAssistantClient;
use adviser::relay::Relay;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Credentials may come from a local .env file
    if let Ok(path) = dotenv::dotenv() {
        println!("Loaded environment from {:?}", path);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = configuration::Settings::new()?;

    // The client is built once per process and injected into the relay
    let client = OpenAiAssistantClient::new(settings.assistant.client_config())?;
    let relay = Relay::new(Arc::new(client), settings.assistant.relay_config());
    info!(
        assistant_id = %relay.config().assistant_id,
        "relaying to {}", settings.assistant.host
    );

    let state = state::AppState::new(relay);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::configure(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(settings.server.socket_addr()?).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
