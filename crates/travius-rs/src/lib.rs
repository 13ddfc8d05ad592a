//! Follow-up question relay for OpenAI-compatible chat completion APIs.
//!
//! `travius` takes a conversation log and the assistant's most recent reply,
//! composes a system instruction that encodes one of four fixed
//! [thinking modes](prompt::ThinkingMode), asks the upstream model for a
//! single deeper follow-up question, and interprets the model's JSON reply
//! into a [`CompletionResult`](interpret::CompletionResult). A malformed model
//! reply never fails a request: the interpreter falls back to a sentinel
//! payload instead.
//!
//! # Getting started
//!
//! ```ignore
//! use std::sync::Arc;
//! use travius::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), String> {
//!     let client = OpenAiClient::new(OPENAI_BASE_URL).map_err(|e| e.to_string())?;
//!     let relay = Relay::new(Arc::new(client), RelaySettings::default());
//!
//!     let credential = Credential::new(std::env::var("OPENAI_API_KEY").unwrap())
//!         .validated()
//!         .map_err(|e| e.to_string())?;
//!
//!     let result = relay
//!         .analyze(
//!             &credential,
//!             AnalyzeInput {
//!                 dialog: vec!["What is a flywheel?".into()],
//!                 last_reply: "A flywheel stores rotational energy...".into(),
//!                 mode: ThinkingMode::from_selector(Some(&serde_json::json!(3))),
//!                 refinement: None,
//!             },
//!         )
//!         .await
//!         .map_err(|e| e.to_string())?;
//!
//!     println!("{}", result.prompt);
//!     Ok(())
//! }
//! ```
//!
//! # Where to find things
//!
//! - **Pick the API key for a request:** [`credential`] has the
//!   [`CredentialResolver`](credential::CredentialResolver) trait and its
//!   static, directory-service, and request-supplied strategies.
//! - **Build the system instruction:** [`prompt::compose`] and friends.
//! - **Talk to the upstream API:** [`client::ChatClient`] and
//!   [`client::OpenAiClient`].
//! - **Turn model text into a result:** [`interpret`].
//! - **Summarize a transcript:** [`summarize`].
//! - **Run a whole route's worth of work:** [`relay::Relay`].

pub mod client;
pub mod credential;
pub mod interpret;
pub mod prelude;
pub mod prompt;
pub mod relay;
pub mod summarize;

#[cfg(test)]
mod testing;

use serde::{Deserialize, Serialize};

// ── Constants ──────────────────────────────────────────────────────

/// Default upstream base URL. `/chat/completions` is appended per request.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model for all upstream calls.
pub const DEFAULT_MODEL: &str = "gpt-4o";

// ── Request types ──────────────────────────────────────────────────

/// Chat completion request body sent upstream.
#[derive(Serialize, Debug, Default)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
}

// ── Message types ──────────────────────────────────────────────────

/// Role of a message in the conversation.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// A message in the conversation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

// ── Response types ─────────────────────────────────────────────────

/// Raw API response (internal deserialization target).
#[derive(Deserialize, Debug)]
pub(crate) struct RawChatResponse {
    pub(crate) choices: Option<Vec<RawChoice>>,
    pub(crate) error: Option<ApiErrorResponse>,
    #[serde(default)]
    pub(crate) usage: Option<UsageInfo>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct RawChoice {
    pub(crate) message: Option<RawResponseMessage>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct RawResponseMessage {
    pub(crate) content: Option<String>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ApiErrorResponse {
    pub(crate) message: String,
}

/// Token usage statistics.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct UsageInfo {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}
