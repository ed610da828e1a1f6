//! HTTP backend: talks to a remote verification server over REST.
//!
//! Endpoints: `POST /api/v1/verify/{name}`, `GET /api/v1/verifiers`,
//! `GET /api/v1/verifiers/{name}`. Error responses carry the standard
//! `{error, message, detail}` envelope and are decoded back into the typed
//! error taxonomy. Transport errors are retried with exponential backoff up
//! to a configured budget.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use veridown_types::{
    ErrorBody, Result, VerificationError, VerificationResponse, VerifierInfo, VerifiersList,
    VerifyRequest,
};

use crate::VerificationBackend;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const BACKOFF_BASE: Duration = Duration::from_millis(100);

pub struct HttpBackend {
    base_url: String,
    timeout: Duration,
    max_retries: usize,
    client: reqwest::Client,
    blocking: reqwest::blocking::Client,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            timeout,
            max_retries: 2,
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            blocking: reqwest::blocking::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| reqwest::blocking::Client::new()),
        }
    }

    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn verify_url(&self, verifier_name: &str) -> String {
        format!("{}/api/v1/verify/{verifier_name}", self.base_url)
    }

    fn verifiers_url(&self) -> String {
        format!("{}/api/v1/verifiers", self.base_url)
    }

    fn verifier_info_url(&self, verifier_name: &str) -> String {
        format!("{}/api/v1/verifiers/{verifier_name}", self.base_url)
    }

    /// Decode an error envelope back into the typed taxonomy.
    fn error_from_body(status: u16, body: ErrorBody) -> VerificationError {
        let detail = body.detail.unwrap_or(Value::Null);
        let strings = |key: &str| -> Vec<String> {
            detail
                .get(key)
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default()
        };
        match body.error.as_str() {
            "verifier_not_found" => VerificationError::VerifierNotFound {
                name: body.message.clone(),
                available: strings("available_verifiers"),
            },
            "invalid_config" => VerificationError::InvalidConfig {
                invalid_options: strings("invalid_options"),
            },
            "invalid_filter" => VerificationError::InvalidFilter {
                invalid_roles: strings("invalid_roles"),
            },
            "timeout" => VerificationError::Timeout { timeout_ms: 0 },
            _ => VerificationError::Verification(format!("HTTP {status}: {}", body.message)),
        }
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            let value = response
                .json::<T>()
                .await
                .map_err(|e| VerificationError::Transport(e.to_string()))?;
            return Ok(value);
        }
        let body = response
            .json::<ErrorBody>()
            .await
            .unwrap_or_else(|_| ErrorBody {
                error: "http_error".to_string(),
                message: format!("server returned status {status}"),
                detail: None,
            });
        Err(Self::error_from_body(status.as_u16(), body))
    }

    fn decode_blocking<T: serde::de::DeserializeOwned>(
        response: reqwest::blocking::Response,
    ) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            let value = response
                .json::<T>()
                .map_err(|e| VerificationError::Transport(e.to_string()))?;
            return Ok(value);
        }
        let body = response
            .json::<ErrorBody>()
            .unwrap_or_else(|_| ErrorBody {
                error: "http_error".to_string(),
                message: format!("server returned status {status}"),
                detail: None,
            });
        Err(Self::error_from_body(status.as_u16(), body))
    }

    async fn get_with_retry<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let mut attempt = 0;
        loop {
            match self.client.get(url).send().await {
                Ok(response) => return Self::decode(response).await,
                Err(error) if attempt < self.max_retries => {
                    let backoff = BACKOFF_BASE * 2u32.pow(attempt as u32);
                    tracing::debug!(%error, attempt, "transport error, retrying");
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(error) => return Err(VerificationError::Transport(error.to_string())),
            }
        }
    }

    async fn post_with_retry<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        payload: &VerifyRequest,
    ) -> Result<T> {
        let mut attempt = 0;
        loop {
            match self.client.post(url).json(payload).send().await {
                Ok(response) => return Self::decode(response).await,
                Err(error) if attempt < self.max_retries => {
                    let backoff = BACKOFF_BASE * 2u32.pow(attempt as u32);
                    tracing::debug!(%error, attempt, "transport error, retrying");
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(error) => return Err(VerificationError::Transport(error.to_string())),
            }
        }
    }
}

#[async_trait]
impl VerificationBackend for HttpBackend {
    async fn verify(
        &self,
        verifier_name: &str,
        request: &VerifyRequest,
    ) -> Result<VerificationResponse> {
        self.post_with_retry(&self.verify_url(verifier_name), request)
            .await
    }

    fn verify_blocking(
        &self,
        verifier_name: &str,
        request: &VerifyRequest,
    ) -> Result<VerificationResponse> {
        let mut attempt = 0;
        loop {
            let sent = self
                .blocking
                .post(self.verify_url(verifier_name))
                .json(request)
                .send();
            match sent {
                Ok(response) => return Self::decode_blocking(response),
                Err(error) if attempt < self.max_retries => {
                    tracing::debug!(%error, attempt, "transport error, retrying");
                    std::thread::sleep(BACKOFF_BASE * 2u32.pow(attempt as u32));
                    attempt += 1;
                }
                Err(error) => return Err(VerificationError::Transport(error.to_string())),
            }
        }
    }

    async fn list_verifiers(&self) -> Result<VerifiersList> {
        self.get_with_retry(&self.verifiers_url()).await
    }

    fn list_verifiers_blocking(&self) -> Result<VerifiersList> {
        let response = self
            .blocking
            .get(self.verifiers_url())
            .send()
            .map_err(|e| VerificationError::Transport(e.to_string()))?;
        Self::decode_blocking(response)
    }

    async fn verifier_info(&self, verifier_name: &str) -> Result<VerifierInfo> {
        self.get_with_retry(&self.verifier_info_url(verifier_name))
            .await
    }

    fn verifier_info_blocking(&self, verifier_name: &str) -> Result<VerifierInfo> {
        let response = self
            .blocking
            .get(self.verifier_info_url(verifier_name))
            .send()
            .map_err(|e| VerificationError::Transport(e.to_string()))?;
        Self::decode_blocking(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_assembled_from_base() {
        let backend = HttpBackend::new("http://localhost:8000/");
        assert_eq!(
            backend.verify_url("infreco"),
            "http://localhost:8000/api/v1/verify/infreco"
        );
        assert_eq!(
            backend.verifiers_url(),
            "http://localhost:8000/api/v1/verifiers"
        );
        assert_eq!(
            backend.verifier_info_url("argmap"),
            "http://localhost:8000/api/v1/verifiers/argmap"
        );
    }

    #[test]
    fn error_bodies_decode_to_typed_errors() {
        let body = ErrorBody {
            error: "invalid_config".to_string(),
            message: "Invalid config options: bogus".to_string(),
            detail: Some(serde_json::json!({ "invalid_options": ["bogus"] })),
        };
        let err = HttpBackend::error_from_body(422, body);
        match err {
            VerificationError::InvalidConfig { invalid_options } => {
                assert_eq!(invalid_options, vec!["bogus".to_string()]);
            }
            other => panic!("expected InvalidConfig, got {other:?}"),
        }

        let unknown = ErrorBody {
            error: "internal_error".to_string(),
            message: "boom".to_string(),
            detail: None,
        };
        let err = HttpBackend::error_from_body(500, unknown);
        assert!(matches!(err, VerificationError::Verification(_)));
    }
}
