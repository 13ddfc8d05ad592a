//! Server configuration from flags and environment variables.

use std::net::{IpAddr, SocketAddr};

use clap::ArgAction;
use clap::Parser;
use clap::builder::BoolishValueParser;
use travius::credential::{CredentialSource, ResolverSettings};
use travius::relay::RelaySettings;
use travius::{DEFAULT_MODEL, OPENAI_BASE_URL};

use crate::WebConfig;

/// HTTP server for the travius follow-up question relay.
///
/// Every flag can also be set through the environment variable shown in
/// its help. A `.env` file in the working directory is read first.
#[derive(Parser, Debug, Clone)]
#[command(name = "travius-web")]
pub struct ServerConfig {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Address to bind to.
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0")]
    pub bind_addr: IpAddr,

    /// Upstream base URL; `/chat/completions` is appended.
    #[arg(long, env = "OPENAI_BASE_URL", default_value = OPENAI_BASE_URL)]
    pub openai_base_url: String,

    /// Model for every upstream call.
    #[arg(long, env = "OPENAI_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Where per-request API keys come from.
    #[arg(long, env = "CREDENTIAL_SOURCE", value_enum, default_value_t = CredentialSource::Env)]
    pub credential_source: CredentialSource,

    /// Key used by the `env` credential source.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Directory service base URL for the `directory` credential source.
    #[arg(long, env = "DIRECTORY_URL")]
    pub directory_url: Option<String>,

    /// Bearer token for the directory service.
    #[arg(long, env = "DIRECTORY_TOKEN", hide_env_values = true)]
    pub directory_token: Option<String>,

    /// Log raw upstream responses and raise `travius` logging to debug.
    #[arg(long, env = "DEBUG_GPT", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub debug_gpt: bool,

    /// Replace the reported thinking level with a classifying second call.
    #[arg(long = "classify-level", env = "CLASSIFY_THINKING_LEVEL", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub classify_level: bool,
}

impl ServerConfig {
    pub fn web_config(&self) -> WebConfig {
        WebConfig {
            bind_addr: SocketAddr::new(self.bind_addr, self.port),
            ..Default::default()
        }
    }

    pub fn relay_settings(&self) -> RelaySettings {
        RelaySettings {
            model: self.model.clone(),
            classify_level: self.classify_level,
        }
    }

    pub fn resolver_settings(&self) -> ResolverSettings {
        ResolverSettings {
            api_key: self.api_key.clone(),
            directory_url: self.directory_url.clone(),
            directory_token: self.directory_token.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_to_settings() {
        let config = ServerConfig::try_parse_from([
            "travius-web",
            "--port",
            "8080",
            "--bind-addr",
            "127.0.0.1",
            "--model",
            "gpt-4o-mini",
            "--credential-source",
            "directory",
            "--directory-url",
            "http://directory.internal",
            "--directory-token",
            "tok",
            "--classify-level",
        ])
        .unwrap();

        assert_eq!(
            config.web_config().bind_addr,
            SocketAddr::from(([127, 0, 0, 1], 8080))
        );
        assert_eq!(config.credential_source, CredentialSource::Directory);

        let relay = config.relay_settings();
        assert_eq!(relay.model, "gpt-4o-mini");
        assert!(relay.classify_level);

        let resolver = config.resolver_settings();
        assert_eq!(resolver.directory_url.as_deref(), Some("http://directory.internal"));
        assert_eq!(resolver.directory_token.as_deref(), Some("tok"));
    }
}
