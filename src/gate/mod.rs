//! Remote translation gate: request/response types and the backend adapter
//! trait. The HTTP implementation lives in [`http`].

pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use http::HttpGate;

/// Provider name the gate expects in every request.
pub const TRANSLATION_PROVIDER: &str = "claude";

/// Body sent to the gate. Every call site sends exactly one target language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GateRequest {
    pub post_id: String,
    pub target_languages: Vec<String>,
    pub translation_provider: String,
    pub model: String,
}

impl GateRequest {
    pub fn single(post_id: &str, language: &str, model: &str) -> Self {
        Self {
            post_id: post_id.to_string(),
            target_languages: vec![language.to_string()],
            translation_provider: TRANSLATION_PROVIDER.to_string(),
            model: model.to_string(),
        }
    }
}

/// Per-language result, decoded at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LanguageOutcome {
    Ok,
    Error(String),
}

/// A decoded, gate-level successful reply.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GateReply {
    pub results: Vec<(String, LanguageOutcome)>,
}

impl GateReply {
    /// Outcome for one language. A language the gate did not report on is
    /// treated as translated: gate-level success is authoritative.
    pub fn outcome_for(&self, language: &str) -> LanguageOutcome {
        self.results
            .iter()
            .find(|(code, _)| code == language)
            .map(|(_, outcome)| outcome.clone())
            .unwrap_or(LanguageOutcome::Ok)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("gate transport error: {0}")]
    Transport(String),
    #[error("gate returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed gate response: {0}")]
    Decode(String),
    #[error("gate rejected request: {0}")]
    Rejected(String),
    #[error("gate call timed out")]
    Timeout,
    #[error("gate call cancelled")]
    Cancelled,
    #[error("gate misconfigured: {0}")]
    Config(String),
}

/// Adapter for whatever sits behind the gate endpoint.
#[async_trait]
pub trait TranslationGate: Send + Sync {
    async fn translate(&self, request: &GateRequest) -> Result<GateReply, GateError>;
}

// --- Wire format ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResponse {
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    results: Option<Vec<WireLanguageResult>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireLanguageResult {
    language_code: String,
    status: WireStatus,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum WireStatus {
    Ok,
    Error,
}

/// Decode a raw gate body into a [`GateReply`].
/// `success: false` becomes [`GateError::Rejected`].
pub fn decode_response(body: &[u8]) -> Result<GateReply, GateError> {
    let wire: WireResponse =
        serde_json::from_slice(body).map_err(|e| GateError::Decode(e.to_string()))?;

    if !wire.success {
        return Err(GateError::Rejected(
            wire.error.unwrap_or_else(|| "unspecified gate error".to_string()),
        ));
    }

    let results = wire
        .results
        .unwrap_or_default()
        .into_iter()
        .map(|r| {
            let outcome = match r.status {
                WireStatus::Ok => LanguageOutcome::Ok,
                WireStatus::Error => LanguageOutcome::Error(
                    r.error.unwrap_or_else(|| "translation failed".to_string()),
                ),
            };
            (r.language_code, outcome)
        })
        .collect();

    Ok(GateReply { results })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_camel_case() {
        let req = GateRequest::single("p1", "da", "model-x");
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "postId": "p1",
                "targetLanguages": ["da"],
                "translationProvider": "claude",
                "model": "model-x"
            })
        );
    }

    #[test]
    fn decodes_per_language_error() {
        let body = br#"{"success":true,"results":[{"languageCode":"da","status":"error","error":"too long"}]}"#;
        let reply = decode_response(body).unwrap();
        assert_eq!(reply.outcome_for("da"), LanguageOutcome::Error("too long".into()));
    }

    #[test]
    fn missing_language_result_counts_as_ok() {
        let reply = decode_response(br#"{"success":true}"#).unwrap();
        assert_eq!(reply.outcome_for("sv"), LanguageOutcome::Ok);
    }

    #[test]
    fn unsuccessful_reply_is_rejected() {
        let err = decode_response(br#"{"success":false,"error":"quota"}"#).unwrap_err();
        assert!(matches!(err, GateError::Rejected(msg) if msg == "quota"));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(matches!(decode_response(b"<html>"), Err(GateError::Decode(_))));
        let unknown_status = br#"{"success":true,"results":[{"languageCode":"da","status":"maybe"}]}"#;
        assert!(matches!(decode_response(unknown_status), Err(GateError::Decode(_))));
    }
}
