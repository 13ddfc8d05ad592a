//! Route handlers.
//!
//! Each handler validates its body, resolves the credential for the request,
//! and only then calls the relay. A request that fails validation or
//! credential resolution never reaches the upstream API.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info};
use travius::credential::{Credential, CredentialResolver};
use travius::prompt::{Refinement, ThinkingMode};
use travius::relay::{AnalyzeInput, Relay};
use travius::summarize::{DialogTurn, parse_transcript};

use crate::error::ApiError;

/// Shared application state passed to all handlers via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
    pub resolver: Arc<dyn CredentialResolver>,
}

impl AppState {
    async fn credential(
        &self,
        org_id: Option<&str>,
        api_key: Option<&str>,
    ) -> Result<Credential, ApiError> {
        Ok(self.resolver.resolve(org_id, api_key).await?)
    }
}

type ApiResult = Result<Json<Value>, ApiError>;

fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::missing_field(field))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// GET / — liveness text.
pub async fn health() -> &'static str {
    "Travius API is running."
}

// ── /analyze ───────────────────────────────────────────────────────

/// `dialogLog` arrives either as one newline-delimited string or as an array
/// of lines.
#[derive(Deserialize, Debug, PartialEq)]
#[serde(untagged)]
pub enum DialogLog {
    Text(String),
    Lines(Vec<String>),
}

impl DialogLog {
    /// Lines in order. A string is split on newlines, trimmed, and blank
    /// lines are dropped. An array is taken as is.
    pub fn into_lines(self) -> Vec<String> {
        match self {
            DialogLog::Text(text) => text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect(),
            DialogLog::Lines(lines) => lines,
        }
    }

    fn is_blank(&self) -> bool {
        matches!(self, DialogLog::Text(text) if text.trim().is_empty())
    }
}

/// Request body for POST /analyze.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub org_id: Option<String>,
    pub dialog_log: Option<DialogLog>,
    pub gpt_reply: Option<String>,
    /// Number or numeric string; anything else falls back to generic framing.
    pub selected_mode: Option<Value>,
    pub api_key: Option<String>,
    pub previous_prompt: Option<String>,
    pub supplement: Option<String>,
}

/// POST /analyze — generate one follow-up question.
pub async fn analyze(
    State(app): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> ApiResult {
    let Json(body) = payload?;

    let org_id = required(body.org_id, "orgId")?;
    let dialog = body
        .dialog_log
        .filter(|log| !log.is_blank())
        .ok_or_else(|| ApiError::missing_field("dialogLog"))?
        .into_lines();
    let last_reply = required(body.gpt_reply, "gptReply")?;
    let mode = ThinkingMode::from_selector(body.selected_mode.as_ref());
    let refinement = non_blank(body.previous_prompt).map(|previous_prompt| Refinement {
        previous_prompt,
        supplement: non_blank(body.supplement),
    });

    info!(
        "POST /analyze org={org_id} turns={} mode={mode:?}",
        dialog.len()
    );
    let credential = app
        .credential(Some(&org_id), body.api_key.as_deref())
        .await?;

    let result = app
        .relay
        .analyze(
            &credential,
            AnalyzeInput {
                dialog,
                last_reply,
                mode,
                refinement,
            },
        )
        .await?;
    let result = serde_json::to_value(result).map_err(|e| {
        error!("Failed to serialize analyze result: {e}");
        ApiError::internal()
    })?;
    Ok(Json(json!({ "ok": true, "result": result })))
}

// ── /suggest ───────────────────────────────────────────────────────

/// Request body for POST /suggest.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct SuggestRequest {
    pub prompt: Option<String>,
    pub talce: Option<String>,
    pub gpt_reply: Option<String>,
    pub org_id: Option<String>,
    pub api_key: Option<String>,
}

/// POST /suggest — restyle a draft prompt.
pub async fn suggest(
    State(app): State<AppState>,
    payload: Result<Json<SuggestRequest>, JsonRejection>,
) -> ApiResult {
    let Json(body) = payload?;

    let prompt = required(body.prompt, "prompt")?;
    let talce = required(body.talce, "talce")?;
    let gpt_reply = non_blank(body.gpt_reply);

    info!("POST /suggest talce={talce:?}");
    let credential = app
        .credential(body.org_id.as_deref(), body.api_key.as_deref())
        .await?;

    let result = app
        .relay
        .suggest(&credential, &prompt, &talce, gpt_reply.as_deref())
        .await?;
    Ok(Json(json!({ "result": result })))
}

// ── /chat ──────────────────────────────────────────────────────────

/// Request body for POST /chat.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub prompt: Option<String>,
    pub org_id: Option<String>,
    pub api_key: Option<String>,
}

/// POST /chat — relay one prompt and return the trimmed reply.
pub async fn chat(
    State(app): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult {
    let Json(body) = payload?;

    let prompt = required(body.prompt, "prompt")?;

    info!("POST /chat ({} chars)", prompt.chars().count());
    let credential = app
        .credential(body.org_id.as_deref(), body.api_key.as_deref())
        .await?;

    let result = app.relay.chat(&credential, &prompt).await?;
    Ok(Json(json!({ "result": result })))
}

// ── /summarize ─────────────────────────────────────────────────────

/// Request body for POST /summarize. `messages` wins when both are sent.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeRequest {
    /// Newline-delimited `Speaker: text` transcript.
    pub messages: Option<String>,
    pub history: Option<Vec<DialogTurn>>,
    pub org_id: Option<String>,
    pub api_key: Option<String>,
}

/// Which input form a summary request used. It decides the response key.
enum SummaryInput {
    Transcript(Vec<DialogTurn>),
    History(Vec<DialogTurn>),
}

/// POST /summarize — summarize a transcript (`{result}`) or a role-tagged
/// history (`{summary}`).
pub async fn summarize(
    State(app): State<AppState>,
    payload: Result<Json<SummarizeRequest>, JsonRejection>,
) -> ApiResult {
    let Json(body) = payload?;

    let input = match (body.messages, body.history) {
        (Some(messages), _) => SummaryInput::Transcript(parse_transcript(&messages)),
        (None, Some(history)) => SummaryInput::History(history),
        (None, None) => return Err(ApiError::missing_field("messages or history")),
    };
    let turns = match &input {
        SummaryInput::Transcript(turns) | SummaryInput::History(turns) => turns,
    };
    if turns.is_empty() {
        return Err(ApiError::empty_history());
    }

    info!("POST /summarize turns={}", turns.len());
    let credential = app
        .credential(body.org_id.as_deref(), body.api_key.as_deref())
        .await?;

    let summary = app.relay.summarize(&credential, turns).await?;
    Ok(Json(match input {
        SummaryInput::Transcript(_) => json!({ "result": summary }),
        SummaryInput::History(_) => json!({ "summary": summary }),
    }))
}
