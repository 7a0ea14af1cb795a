//! HTTP client for the translation edge function.
//! Pooled reqwest client, bearer service credential, one attempt per call:
//! failed languages are retried by the user, never automatically.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{decode_response, GateError, GateReply, GateRequest, TranslationGate};
use crate::config::GateConfig;

pub struct HttpGate {
    http: reqwest::Client,
    url: String,
    token: String,
}

impl HttpGate {
    pub fn new(config: &GateConfig) -> Result<Self, GateError> {
        let token = config
            .token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| GateError::Config("gate service token not set".into()))?;

        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(config.timeout)
            .build()
            .map_err(|e| GateError::Config(e.to_string()))?;

        Ok(Self {
            http,
            url: config.url.clone(),
            token,
        })
    }
}

#[async_trait]
impl TranslationGate for HttpGate {
    async fn translate(&self, request: &GateRequest) -> Result<GateReply, GateError> {
        let start = Instant::now();
        let result = self
            .http
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await;

        let response = match result {
            Ok(resp) => resp,
            Err(e) if e.is_timeout() => return Err(GateError::Timeout),
            Err(e) => return Err(GateError::Transport(e.to_string())),
        };

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            warn!(
                post_id = %request.post_id,
                status = status.as_u16(),
                "gate returned non-success status"
            );
            return Err(GateError::Status {
                status: status.as_u16(),
                body: body_text.chars().take(200).collect(),
            });
        }

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                GateError::Timeout
            } else {
                GateError::Transport(e.to_string())
            }
        })?;

        debug!(
            post_id = %request.post_id,
            languages = ?request.target_languages,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "gate responded"
        );

        decode_response(&body)
    }
}
