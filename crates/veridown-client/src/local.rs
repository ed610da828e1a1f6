//! In-process backend: runs the dispatch service directly, with behavior
//! identical to the HTTP API minus the transport.

use async_trait::async_trait;
use veridown_service::{DispatchOptions, Dispatcher};
use veridown_types::{Result, VerificationResponse, VerifierInfo, VerifiersList, VerifyRequest};

use crate::VerificationBackend;

pub struct LocalBackend {
    dispatcher: Dispatcher,
}

impl LocalBackend {
    pub fn new(options: DispatchOptions) -> Self {
        Self {
            dispatcher: Dispatcher::new(options),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::new(DispatchOptions::default())
    }
}

#[async_trait]
impl VerificationBackend for LocalBackend {
    async fn verify(
        &self,
        verifier_name: &str,
        request: &VerifyRequest,
    ) -> Result<VerificationResponse> {
        Ok(self
            .dispatcher
            .verify_async(verifier_name, request)
            .await?
            .response)
    }

    fn verify_blocking(
        &self,
        verifier_name: &str,
        request: &VerifyRequest,
    ) -> Result<VerificationResponse> {
        Ok(self.dispatcher.verify_sync(verifier_name, request)?.response)
    }

    async fn list_verifiers(&self) -> Result<VerifiersList> {
        Ok(self.dispatcher.registry().all_infos())
    }

    fn list_verifiers_blocking(&self) -> Result<VerifiersList> {
        Ok(self.dispatcher.registry().all_infos())
    }

    async fn verifier_info(&self, verifier_name: &str) -> Result<VerifierInfo> {
        self.dispatcher.registry().info(verifier_name)
    }

    fn verifier_info_blocking(&self, verifier_name: &str) -> Result<VerifierInfo> {
        self.dispatcher.registry().info(verifier_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veridown_types::VerificationError;

    #[test]
    fn unknown_verifier_propagates_typed_error() {
        let backend = LocalBackend::default();
        let err = backend
            .verify_blocking("bogus", &VerifyRequest::new("x"))
            .unwrap_err();
        assert!(matches!(err, VerificationError::VerifierNotFound { .. }));
    }

    #[test]
    fn info_for_known_verifier() {
        let backend = LocalBackend::default();
        let info = backend.verifier_info_blocking("arganno_argmap").unwrap();
        assert!(info.is_coherence_verifier);
    }
}
