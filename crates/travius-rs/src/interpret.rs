//! Interpretation of free-text model replies.
//!
//! Model output is handled as a two-stage pipeline: [`strip_code_fence`]
//! normalizes the text, then [`parse_string_field`] strictly parses it.
//! [`interpret`] wraps both and substitutes a sentinel result on any failure,
//! so a malformed reply degrades the answer instead of failing the request.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::{ChatClient, CompletionRequest, SamplingParams};
use crate::credential::Credential;
use crate::prompt::{ThinkingMode, classification_instruction, level_for};

/// Prompt text returned when the model reply could not be parsed.
pub const GENERATION_FAILED: &str = "(generation failed)";

/// Descriptive copy returned alongside a generated question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Explanation {
    pub step: String,
    pub background: String,
    pub intention: String,
    pub usage_hint: String,
}

impl Explanation {
    /// Explanation for a question generated under a thinking mode.
    pub fn mode_based() -> Self {
        Self {
            step: "(output based on the thinking mode)".into(),
            background: "This prompt was composed according to the selected thinking mode."
                .into(),
            intention: "It aims to deepen the user's thinking in a specific direction.".into(),
            usage_hint: "Present it carefully as a question that follows the mode.".into(),
        }
    }

    /// Explanation for the sentinel result.
    pub fn format_error() -> Self {
        Self {
            step: "(unknown)".into(),
            background: "The generated reply was not in the expected format.".into(),
            intention: "The intent could not be determined because of the format error."
                .into(),
            usage_hint: "Try again, or contact the developers.".into(),
        }
    }
}

/// What the `/analyze` route returns inside `result`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResult {
    pub prompt: String,
    pub explanation: Explanation,
    pub thinking_level: u8,
    pub token_usage: u32,
}

impl CompletionResult {
    /// The degraded result used when the model reply did not parse.
    pub fn fallback(mode: Option<ThinkingMode>) -> Self {
        Self {
            prompt: GENERATION_FAILED.to_string(),
            explanation: Explanation::format_error(),
            thinking_level: level_for(mode),
            token_usage: 0,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.prompt == GENERATION_FAILED
    }
}

/// Why a model reply did not match the expected JSON shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InterpretError {
    #[error("reply is not a JSON object: {0}")]
    NotJson(String),

    #[error("reply has no \"{0}\" field")]
    MissingField(&'static str),

    #[error("\"{0}\" is not a string")]
    WrongType(&'static str),
}

/// Remove a surrounding code fence (```` ``` ```` or ```` ```json ````) and
/// whitespace. Only fences at the very start and end are removed; backticks
/// inside the text are left alone. Text without a fence is only trimmed.
///
/// ```
/// use travius::interpret::strip_code_fence;
///
/// assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
/// assert_eq!(strip_code_fence("```\n{\"a\":1}```"), "{\"a\":1}");
/// assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
/// assert_eq!(strip_code_fence("{\"a\":\"```x```\"}"), "{\"a\":\"```x```\"}");
/// ```
pub fn strip_code_fence(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        text = match rest.get(..4) {
            Some(tag) if tag.eq_ignore_ascii_case("json") => rest.get(4..).unwrap_or(rest),
            _ => rest,
        };
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Content of the first fenced block anywhere in `raw`, for replies that put
/// prose before the JSON.
fn embedded_block(raw: &str) -> Option<&str> {
    let (_, rest) = raw.split_once("```")?;
    let rest = match rest.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => rest.get(4..).unwrap_or(rest),
        _ => rest,
    };
    let (inner, _) = rest.split_once("```")?;
    Some(inner.trim())
}

/// Strictly parse `raw` (after fence stripping) as a JSON object and return
/// its string field `field`.
///
/// When the stripped text is not JSON, the first fenced block inside the
/// reply gets one more try.
pub fn parse_string_field(raw: &str, field: &'static str) -> Result<String, InterpretError> {
    let value: Value = match serde_json::from_str(strip_code_fence(raw)) {
        Ok(value) => value,
        Err(e) => embedded_block(raw)
            .and_then(|block| serde_json::from_str(block).ok())
            .ok_or_else(|| InterpretError::NotJson(e.to_string()))?,
    };
    let object = value
        .as_object()
        .ok_or_else(|| InterpretError::NotJson("top-level value is not an object".into()))?;
    match object.get(field) {
        Some(Value::String(s)) => Ok(s.trim().to_string()),
        Some(_) => Err(InterpretError::WrongType(field)),
        None => Err(InterpretError::MissingField(field)),
    }
}

/// Parse the `prompt` field of a follow-up question reply.
pub fn parse_prompt(raw: &str) -> Result<String, InterpretError> {
    parse_string_field(raw, "prompt")
}

/// Turn a raw model reply into a [`CompletionResult`]. Never fails.
pub fn interpret(raw: &str, mode: Option<ThinkingMode>, token_usage: u32) -> CompletionResult {
    match parse_prompt(raw) {
        Ok(prompt) => CompletionResult {
            prompt,
            explanation: Explanation::mode_based(),
            thinking_level: level_for(mode),
            token_usage,
        },
        Err(e) => {
            warn!("Model reply did not parse ({e}); raw text: {raw}");
            CompletionResult::fallback(mode)
        }
    }
}

/// Ask the model which thinking category `question` belongs to.
///
/// Any failure (the call, the JSON, or an unknown label) yields
/// [`ThinkingMode::Clarify`]. This never fails the surrounding request.
pub async fn classify_level(
    client: &dyn ChatClient,
    credential: &Credential,
    model: &str,
    question: &str,
) -> ThinkingMode {
    let (system, user) = classification_instruction(question);
    let request =
        CompletionRequest::instructed(model, system, user, SamplingParams::CLASSIFICATION);

    let text = match client.complete(&request, credential).await {
        Ok(completion) => completion.text,
        Err(e) => {
            warn!("Thinking-level classification call failed: {e}");
            return ThinkingMode::Clarify;
        }
    };

    let label = match parse_string_field(&text, "level") {
        Ok(label) => label,
        Err(e) => {
            warn!("Thinking-level reply did not parse ({e}); raw text: {text}");
            return ThinkingMode::Clarify;
        }
    };

    match ThinkingMode::from_label(&label) {
        Some(mode) => {
            debug!("Classified question as {label:?} (level {})", mode.selector());
            mode
        }
        None => {
            warn!("Unknown thinking-level label {label:?}");
            ThinkingMode::Clarify
        }
    }
}
