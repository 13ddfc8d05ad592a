//! HTTP surface for the travius follow-up question relay.
//!
//! `travius-web` exposes [`Relay`] over four JSON routes and a liveness
//! route:
//!
//! | Route | Relay operation |
//! |---|---|
//! | `GET /` | none |
//! | `POST /analyze` | [`Relay::analyze`] |
//! | `POST /suggest` | [`Relay::suggest`] |
//! | `POST /chat` | [`Relay::chat`] |
//! | `POST /summarize` | [`Relay::summarize`] |
//!
//! Each request resolves its own credential through the configured
//! [`CredentialResolver`] before any upstream call.
//!
//! # Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//! use travius::prelude::*;
//! use travius_web::{WebConfig, spawn_web};
//!
//! let client = OpenAiClient::new(OPENAI_BASE_URL)?;
//! let relay = Arc::new(Relay::new(Arc::new(client), RelaySettings::default()));
//! let resolver = build_resolver(CredentialSource::Env, ResolverSettings {
//!     api_key: std::env::var("OPENAI_API_KEY").ok(),
//!     ..Default::default()
//! });
//!
//! let addr = spawn_web(relay, resolver, WebConfig::default()).await?;
//! println!("Listening on http://{addr}");
//! ```

mod api;
pub mod config;
pub mod error;
mod server;

pub use api::AppState;
pub use config::ServerConfig;
pub use error::ApiError;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use travius::credential::CredentialResolver;
use travius::relay::Relay;

/// Request bodies larger than this are rejected. 2 MiB.
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Configuration for the web server.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Address to bind to. Default: `0.0.0.0:3000`.
    pub bind_addr: SocketAddr,
    /// Maximum request body size in bytes. Default: [`DEFAULT_BODY_LIMIT`].
    pub body_limit: usize,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

/// Spawn the web server on a Tokio task and return the bound address.
///
/// The server runs until the Tokio runtime shuts down.
pub async fn spawn_web(
    relay: Arc<Relay>,
    resolver: Arc<dyn CredentialResolver>,
    config: WebConfig,
) -> io::Result<SocketAddr> {
    let router = server::build_router(AppState { relay, resolver }, config.body_limit);
    server::start_server(router, config.bind_addr).await
}
