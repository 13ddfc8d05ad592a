//! Chat completion client for OpenAI-compatible endpoints.
//!
//! [`ChatClient`] is the seam between the relay and the network. The
//! production implementation is [`OpenAiClient`]; tests substitute stubs.
//! A client holds no credential of its own. The caller passes the
//! [`Credential`] resolved for the current request into every call.

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use crate::credential::Credential;
use crate::{ChatRequest, DEFAULT_MODEL, Message, RawChatResponse};

// ── Request ────────────────────────────────────────────────────────

/// Sampling preset for one call site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl SamplingParams {
    /// Follow-up question generation.
    pub const PROMPT_GENERATION: Self = Self {
        temperature: 0.8,
        max_tokens: 600,
    };
    /// Thinking-level classification of a generated question.
    pub const CLASSIFICATION: Self = Self {
        temperature: 0.7,
        max_tokens: 50,
    };
    /// Conversation summaries.
    pub const SUMMARY: Self = Self {
        temperature: 0.7,
        max_tokens: 300,
    };
    /// Plain chat and suggestion relays.
    pub const RELAY: Self = Self {
        temperature: 0.8,
        max_tokens: 1000,
    };
}

/// One upstream call: the messages plus the model and sampling preset.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub params: SamplingParams,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>, params: SamplingParams) -> Self {
        Self {
            model: model.into(),
            messages,
            params,
        }
    }

    /// A system instruction followed by a single user instruction.
    pub fn instructed(
        model: impl Into<String>,
        system: impl Into<String>,
        user: impl Into<String>,
        params: SamplingParams,
    ) -> Self {
        Self::new(
            model,
            vec![Message::system(system), Message::user(user)],
            params,
        )
    }

    fn to_body(&self) -> ChatRequest {
        ChatRequest {
            model: if self.model.is_empty() {
                DEFAULT_MODEL.to_string()
            } else {
                self.model.clone()
            },
            messages: self.messages.clone(),
            max_tokens: self.params.max_tokens,
            temperature: self.params.temperature,
        }
    }
}

// ── Response ───────────────────────────────────────────────────────

/// Text of the first choice plus token usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    /// Trimmed content of the first choice. Empty when the upstream returned
    /// no content.
    pub text: String,
    /// `usage.total_tokens`, or 0 when the upstream did not report it.
    pub total_tokens: u32,
}

/// Why a completion call failed.
///
/// The `Display` form never contains the upstream body. The body is kept in
/// `detail` for server-side logs only.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("upstream API key is not provided")]
    MissingCredential,

    #[error("upstream call failed{}", http_suffix(.status))]
    Upstream { status: Option<u16>, detail: String },
}

fn http_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl CompletionError {
    pub fn code(&self) -> &'static str {
        match self {
            CompletionError::MissingCredential => "ORG_API_KEY_NOT_REGISTERED",
            CompletionError::Upstream { .. } => "UPSTREAM_ERROR",
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            CompletionError::MissingCredential => 403,
            CompletionError::Upstream { .. } => 502,
        }
    }

    fn upstream(status: Option<u16>, detail: impl Into<String>) -> Self {
        CompletionError::Upstream {
            status,
            detail: detail.into(),
        }
    }
}

// ── Client trait ───────────────────────────────────────────────────

/// Boxed future returned by [`ChatClient::complete`].
pub type CompletionFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Completion, CompletionError>> + Send + 'a>>;

/// Sends exactly one chat completion request per call. No retries.
pub trait ChatClient: Send + Sync {
    fn complete<'a>(
        &'a self,
        request: &'a CompletionRequest,
        credential: &'a Credential,
    ) -> CompletionFuture<'a>;
}

// ── OpenAI-compatible client ───────────────────────────────────────

/// Async HTTP client for an OpenAI-compatible `/chat/completions` endpoint.
///
/// The inner `reqwest::Client` is shared across requests for connection
/// keep-alive only.
pub struct OpenAiClient {
    client: reqwest::Client,
    endpoint: String,
    debug_upstream: bool,
}

impl OpenAiClient {
    /// Create a client for `base_url` (e.g. `https://api.openai.com/v1`).
    pub fn new(base_url: &str) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .user_agent("travius/0.1")
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            debug_upstream: false,
        })
    }

    /// Log every raw upstream response body at `info`.
    pub fn with_debug_upstream(mut self, enabled: bool) -> Self {
        self.debug_upstream = enabled;
        self
    }

    async fn send(
        &self,
        request: &CompletionRequest,
        credential: &Credential,
    ) -> Result<Completion, CompletionError> {
        if credential.is_empty() {
            return Err(CompletionError::MissingCredential);
        }

        let body = request.to_body();
        debug!(
            "LLM request: model={}, messages={}, max_tokens={}, temp={}, key={}",
            body.model,
            body.messages.len(),
            body.max_tokens,
            body.temperature,
            credential.prefix(),
        );

        let start = Instant::now();

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(credential.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("LLM request failed: {e}");
                CompletionError::upstream(None, format!("request failed: {e}"))
            })?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| {
            error!("Failed to read LLM response: {e}");
            CompletionError::upstream(Some(status.as_u16()), format!("failed to read response: {e}"))
        })?;

        debug!(
            "LLM response: HTTP {} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            text.len()
        );
        if self.debug_upstream {
            info!("LLM raw response: {text}");
        }

        if !status.is_success() {
            error!("LLM API HTTP {status}: {text}");
            return Err(CompletionError::upstream(Some(status.as_u16()), text));
        }

        let parsed: RawChatResponse = serde_json::from_str(&text).map_err(|e| {
            error!("Failed to parse LLM response: {e}");
            CompletionError::upstream(Some(status.as_u16()), format!("unparseable body: {e}"))
        })?;

        if let Some(err) = parsed.error {
            error!("LLM API error: {}", err.message);
            return Err(CompletionError::upstream(Some(status.as_u16()), err.message));
        }

        let total_tokens = parsed
            .usage
            .as_ref()
            .and_then(|u| u.total_tokens)
            .unwrap_or(0);

        let text = parsed
            .choices
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .map(|s| s.trim().to_string())
            .unwrap_or_default();

        debug!("LLM output: {} chars, {} tokens", text.len(), total_tokens);
        Ok(Completion { text, total_tokens })
    }
}

impl ChatClient for OpenAiClient {
    fn complete<'a>(
        &'a self,
        request: &'a CompletionRequest,
        credential: &'a Credential,
    ) -> CompletionFuture<'a> {
        Box::pin(self.send(request, credential))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::Router;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;

    const KEY: &str = "sk-test-0123456789abcdefghij";

    #[derive(Clone)]
    struct Stub {
        status: StatusCode,
        body: &'static str,
        hits: Arc<AtomicUsize>,
        auth: Arc<std::sync::Mutex<Option<String>>>,
    }

    async fn stub_handler(State(stub): State<Stub>, headers: HeaderMap) -> (StatusCode, String) {
        stub.hits.fetch_add(1, Ordering::SeqCst);
        *stub.auth.lock().unwrap() = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        (stub.status, stub.body.to_string())
    }

    async fn spawn_upstream(status: StatusCode, body: &'static str) -> (String, Stub) {
        let stub = Stub {
            status,
            body,
            hits: Arc::new(AtomicUsize::new(0)),
            auth: Arc::new(std::sync::Mutex::new(None)),
        };
        let router = Router::new()
            .route("/v1/chat/completions", post(stub_handler))
            .with_state(stub.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        (format!("http://{addr}/v1"), stub)
    }

    fn request() -> CompletionRequest {
        CompletionRequest::instructed("gpt-4o", "sys", "user", SamplingParams::RELAY)
    }

    #[test]
    fn instructed_builds_system_then_user() {
        let req = request();
        assert_eq!(req.messages.len(), 2);
        assert_eq!(req.messages[0], Message::system("sys"));
        assert_eq!(req.messages[1], Message::user("user"));
    }

    #[test]
    fn empty_model_falls_back_to_default() {
        let req = CompletionRequest::new("", vec![], SamplingParams::SUMMARY);
        let body = req.to_body();
        assert_eq!(body.model, DEFAULT_MODEL);
        assert_eq!(body.max_tokens, 300);
    }

    #[test]
    fn upstream_display_hides_detail() {
        let err = CompletionError::upstream(Some(401), "invalid key sk-secret");
        let shown = err.to_string();
        assert!(shown.contains("401"));
        assert!(!shown.contains("sk-secret"));
        assert_eq!(err.code(), "UPSTREAM_ERROR");
    }

    #[tokio::test]
    async fn returns_trimmed_first_choice_and_usage() {
        let (base, stub) = spawn_upstream(
            StatusCode::OK,
            r#"{"choices":[{"message":{"content":"  hi there \n"}}],"usage":{"total_tokens":42}}"#,
        )
        .await;
        let client = OpenAiClient::new(&base).unwrap();

        let completion = client
            .complete(&request(), &Credential::new(KEY))
            .await
            .unwrap();
        assert_eq!(completion.text, "hi there");
        assert_eq!(completion.total_tokens, 42);
        assert_eq!(stub.hits.load(Ordering::SeqCst), 1);
        assert_eq!(
            stub.auth.lock().unwrap().as_deref(),
            Some(format!("Bearer {KEY}").as_str())
        );
    }

    #[tokio::test]
    async fn missing_content_is_empty_text() {
        let (base, _stub) = spawn_upstream(StatusCode::OK, r#"{"choices":[{"message":{}}]}"#).await;
        let client = OpenAiClient::new(&base).unwrap();

        let completion = client
            .complete(&request(), &Credential::new(KEY))
            .await
            .unwrap();
        assert_eq!(completion, Completion::default());
    }

    #[tokio::test]
    async fn non_success_status_is_upstream_error() {
        let (base, _stub) = spawn_upstream(
            StatusCode::UNAUTHORIZED,
            r#"{"error":{"message":"Incorrect API key"}}"#,
        )
        .await;
        let client = OpenAiClient::new(&base).unwrap();

        let err = client
            .complete(&request(), &Credential::new(KEY))
            .await
            .unwrap_err();
        match err {
            CompletionError::Upstream { status, detail } => {
                assert_eq!(status, Some(401));
                assert!(detail.contains("Incorrect API key"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_upstream_error() {
        let (base, _stub) = spawn_upstream(StatusCode::OK, "<html>gateway</html>").await;
        let client = OpenAiClient::new(&base).unwrap();

        let err = client
            .complete(&request(), &Credential::new(KEY))
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::Upstream { status: Some(200), .. }));
    }

    #[tokio::test]
    async fn empty_credential_fails_before_network() {
        let (base, stub) = spawn_upstream(StatusCode::OK, "{}").await;
        let client = OpenAiClient::new(&base).unwrap();

        let err = client
            .complete(&request(), &Credential::new("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::MissingCredential));
        assert_eq!(stub.hits.load(Ordering::SeqCst), 0);
    }
}
