//! Error responses for the HTTP surface.
//!
//! Every failure leaves the server as `{ "ok": false, "code", "error" }`.
//! The `error` text is a fixed message per code; lookup and upstream detail
//! only goes to the server log.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::{error, warn};

use travius::client::CompletionError;
use travius::credential::CredentialError;
use travius::summarize::SummarizeError;

#[derive(Debug, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    /// A required request field is absent or blank.
    pub fn missing_field(field: &str) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "MISSING_FIELD",
            format!("{field} is required"),
        )
    }

    pub fn invalid_body(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "INVALID_BODY", message)
    }

    pub fn empty_history() -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "EMPTY_HISTORY",
            "conversation history is empty",
        )
    }

    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            "internal server error",
        )
    }
}

fn status_from(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!("Rejected request body: {}", rejection.body_text());
        ApiError::invalid_body("request body must be a JSON object with the expected fields")
    }
}

impl From<CredentialError> for ApiError {
    fn from(e: CredentialError) -> Self {
        let message = match &e {
            CredentialError::MissingOrgId => "orgId is required",
            CredentialError::OrgNotFound(_) => "organization not found",
            CredentialError::NotRegistered => {
                "no valid API key is registered for this organization"
            }
            CredentialError::Config(_) => "credential lookup is not configured",
            CredentialError::Lookup(_) => "credential lookup failed",
        };
        match &e {
            CredentialError::Config(_) | CredentialError::Lookup(_) => {
                error!("Credential resolution failed: {e}")
            }
            _ => warn!("Credential rejected: {e}"),
        }
        ApiError::new(status_from(e.status()), e.code(), message)
    }
}

impl From<CompletionError> for ApiError {
    fn from(e: CompletionError) -> Self {
        let message = match &e {
            CompletionError::MissingCredential => {
                "no valid API key is registered for this organization"
            }
            CompletionError::Upstream { status, detail } => {
                error!("Upstream call failed (status {status:?}): {detail}");
                "the language model call failed"
            }
        };
        ApiError::new(status_from(e.status()), e.code(), message)
    }
}

impl From<SummarizeError> for ApiError {
    fn from(e: SummarizeError) -> Self {
        match e {
            SummarizeError::EmptyHistory => ApiError::empty_history(),
            SummarizeError::Completion(inner) => inner.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "ok": false,
            "code": self.code,
            "error": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn response_shape() {
        let (status, json) = body_json(ApiError::missing_field("gptReply")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["ok"], false);
        assert_eq!(json["code"], "MISSING_FIELD");
        assert_eq!(json["error"], "gptReply is required");
    }

    #[test]
    fn credential_errors_keep_codes() {
        let cases = [
            (CredentialError::NotRegistered, 403, "ORG_API_KEY_NOT_REGISTERED"),
            (CredentialError::OrgNotFound("org9".into()), 404, "ORG_NOT_FOUND"),
            (CredentialError::Config("x".into()), 500, "CREDENTIAL_CONFIG_MISSING"),
            (CredentialError::Lookup("x".into()), 502, "CREDENTIAL_LOOKUP_FAILED"),
            (CredentialError::MissingOrgId, 400, "MISSING_FIELD"),
        ];
        for (e, status, code) in cases {
            let api: ApiError = e.into();
            assert_eq!(api.status.as_u16(), status);
            assert_eq!(api.code, code);
        }
    }

    #[tokio::test]
    async fn upstream_detail_is_not_exposed() {
        let e = CompletionError::Upstream {
            status: Some(401),
            detail: "Incorrect API key provided: sk-abc1234".into(),
        };
        let (status, json) = body_json(e.into()).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(json["code"], "UPSTREAM_ERROR");
        assert!(!json.to_string().contains("sk-abc1234"));
    }

    #[test]
    fn empty_history_maps_to_400() {
        let api: ApiError = SummarizeError::EmptyHistory.into();
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.code, "EMPTY_HISTORY");
    }
}
