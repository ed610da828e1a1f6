//! Client facade for the Veridown verification service.
//!
//! A [`VerificationBackend`] abstracts the transport: [`LocalBackend`] runs
//! the dispatch service in-process, [`HttpBackend`] talks to a remote
//! server over REST. Both expose identical sync and async entry points.

mod http;
mod local;

pub use http::HttpBackend;
pub use local::LocalBackend;

use async_trait::async_trait;
use veridown_types::{Result, VerificationResponse, VerifierInfo, VerifiersList, VerifyRequest};

/// Transport abstraction for verification operations.
#[async_trait]
pub trait VerificationBackend: Send + Sync {
    async fn verify(&self, verifier_name: &str, request: &VerifyRequest)
        -> Result<VerificationResponse>;

    fn verify_blocking(
        &self,
        verifier_name: &str,
        request: &VerifyRequest,
    ) -> Result<VerificationResponse>;

    async fn list_verifiers(&self) -> Result<VerifiersList>;

    fn list_verifiers_blocking(&self) -> Result<VerifiersList>;

    async fn verifier_info(&self, verifier_name: &str) -> Result<VerifierInfo>;

    fn verifier_info_blocking(&self, verifier_name: &str) -> Result<VerifierInfo>;

    /// Release backend resources. Idempotent; the default does nothing.
    fn close(&self) {}
}

/// Thin convenience wrapper owning a backend.
pub struct VerifiersClient {
    backend: Box<dyn VerificationBackend>,
}

impl VerifiersClient {
    pub fn new(backend: Box<dyn VerificationBackend>) -> Self {
        Self { backend }
    }

    /// A client running the verification service in-process.
    pub fn local() -> Self {
        Self::new(Box::new(LocalBackend::default()))
    }

    /// A client talking to a remote verification server.
    pub fn remote(base_url: impl Into<String>) -> Self {
        Self::new(Box::new(HttpBackend::new(base_url)))
    }

    pub async fn verify(
        &self,
        verifier_name: &str,
        request: &VerifyRequest,
    ) -> Result<VerificationResponse> {
        self.backend.verify(verifier_name, request).await
    }

    pub fn verify_blocking(
        &self,
        verifier_name: &str,
        request: &VerifyRequest,
    ) -> Result<VerificationResponse> {
        self.backend.verify_blocking(verifier_name, request)
    }

    pub async fn list_verifiers(&self) -> Result<VerifiersList> {
        self.backend.list_verifiers().await
    }

    pub fn list_verifiers_blocking(&self) -> Result<VerifiersList> {
        self.backend.list_verifiers_blocking()
    }

    pub async fn verifier_info(&self, verifier_name: &str) -> Result<VerifierInfo> {
        self.backend.verifier_info(verifier_name).await
    }

    pub fn verifier_info_blocking(&self, verifier_name: &str) -> Result<VerifierInfo> {
        self.backend.verifier_info_blocking(verifier_name)
    }

    pub fn close(&self) {
        self.backend.close();
    }
}
