//! travius HTTP server.
//!
//! # Usage
//!
//! ```bash
//! OPENAI_API_KEY=sk-... cargo run -p travius-web
//! cargo run -p travius-web -- --port 8080 --credential-source request
//! CREDENTIAL_SOURCE=directory DIRECTORY_URL=http://directory.internal \
//!   DIRECTORY_TOKEN=... cargo run -p travius-web
//! ```

use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use travius::client::OpenAiClient;
use travius::credential::build_resolver;
use travius::relay::Relay;
use travius_web::{ServerConfig, spawn_web};

fn init_tracing(debug_gpt: bool) {
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if debug_gpt {
        for directive in ["travius=debug", "travius_web=debug"] {
            if let Ok(directive) = directive.parse() {
                filter = filter.add_directive(directive);
            }
        }
    }
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}

async fn run(config: ServerConfig) -> Result<(), String> {
    let client = OpenAiClient::new(&config.openai_base_url)?.with_debug_upstream(config.debug_gpt);
    let relay = Arc::new(Relay::new(Arc::new(client), config.relay_settings()));
    let resolver = build_resolver(config.credential_source, config.resolver_settings());

    let web_config = config.web_config();
    let addr = spawn_web(relay, resolver, web_config.clone())
        .await
        .map_err(|e| format!("failed to bind {}: {e}", web_config.bind_addr))?;
    info!(
        "Travius API listening on http://{addr} (credentials: {}, model: {})",
        config.credential_source, config.model
    );

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("failed to listen for shutdown signal: {e}"))?;
    info!("Shutting down");
    Ok(())
}

#[tokio::main]
async fn main() {
    // `.env` must be loaded before clap reads env fallbacks.
    let _ = dotenvy::dotenv();
    let config = ServerConfig::parse();
    init_tracing(config.debug_gpt);

    if let Err(e) = run(config).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
