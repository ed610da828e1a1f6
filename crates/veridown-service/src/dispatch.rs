//! The dispatch service: synchronous execution plus an async front that
//! offloads work onto the bounded worker pool.

use std::sync::Arc;
use std::time::{Duration, Instant};

use veridown_types::{
    parse_filter_spec, Result, ScoringResult, VerificationError, VerificationResponse,
    VerifierConfig, VerifyRequest,
};
use veridown_verify::{Handler, VerificationRequest};

use crate::pool::WorkerPool;
use crate::registry::VerifierRegistry;

/// Dispatcher construction options.
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    pub max_workers: usize,
    pub queue_capacity: Option<usize>,
    pub timeout: Duration,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            max_workers: 4,
            queue_capacity: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// The full result of one verification run: the wire envelope plus any
/// virtue scores (scores never travel in the envelope).
#[derive(Debug, Clone)]
pub struct VerificationOutcome {
    pub response: VerificationResponse,
    pub scores: Vec<ScoringResult>,
}

/// Owns the registry and the worker pool; entry point for all verification.
pub struct Dispatcher {
    registry: Arc<VerifierRegistry>,
    pool: WorkerPool,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(options: DispatchOptions) -> Self {
        Self {
            registry: Arc::new(VerifierRegistry::new()),
            pool: WorkerPool::new(options.max_workers, options.queue_capacity),
            timeout: options.timeout,
        }
    }

    pub fn registry(&self) -> &VerifierRegistry {
        &self.registry
    }

    /// Resolve, validate, build, and run a verifier pipeline synchronously.
    pub fn verify_sync(
        &self,
        verifier_name: &str,
        request: &VerifyRequest,
    ) -> Result<VerificationOutcome> {
        run_verification(&self.registry, verifier_name, request)
    }

    /// Run `verify_sync` on the worker pool, bounded by the configured
    /// deadline. On timeout the in-flight worker result is discarded; the
    /// worker itself is allowed to finish.
    pub async fn verify_async(
        &self,
        verifier_name: &str,
        request: &VerifyRequest,
    ) -> Result<VerificationOutcome> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let registry = Arc::clone(&self.registry);
        let name = verifier_name.to_string();
        let request = request.clone();

        self.pool.submit(move || {
            let result = run_verification(&registry, &name, &request);
            let _ = tx.send(result);
        })?;

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(VerificationError::Verification(
                "verification worker dropped before completing".to_string(),
            )),
            Err(_) => Err(VerificationError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}

/// The synchronous verification routine shared by both entry points.
fn run_verification(
    registry: &VerifierRegistry,
    verifier_name: &str,
    request: &VerifyRequest,
) -> Result<VerificationOutcome> {
    let builder = registry.get(verifier_name)?;

    let empty = serde_json::Map::new();
    let config_map = request.config.as_ref().unwrap_or(&empty);

    let invalid_options = builder.validate_config(config_map);
    if !invalid_options.is_empty() {
        return Err(VerificationError::InvalidConfig { invalid_options });
    }
    if let Some(filters_value) = config_map.get("filters") {
        let spec = parse_filter_spec(filters_value)?;
        let roles: Vec<_> = spec.keys().copied().collect();
        let invalid_roles = builder.validate_roles(&roles);
        if !invalid_roles.is_empty() {
            return Err(VerificationError::InvalidFilter { invalid_roles });
        }
    }

    let config = VerifierConfig::from_map(config_map)?;

    let started = Instant::now();
    let root = builder.build(&config);
    let mut internal =
        VerificationRequest::new(request.inputs.clone(), request.source.clone())
            .with_config(config);
    root.process(&mut internal);

    let scores = root.collect_scores(&internal);

    // strip details so every response is serializable
    for result in &mut internal.results {
        result.details = serde_json::Map::new();
    }

    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    tracing::info!(
        verifier = verifier_name,
        is_valid = internal.is_valid(),
        elapsed_ms,
        "verification completed"
    );

    let response = VerificationResponse {
        verifier: verifier_name.to_string(),
        is_valid: internal.is_valid(),
        verification_data: internal
            .verification_data
            .iter()
            .map(|item| item.summary())
            .collect(),
        results: internal.results.clone(),
        executed_handlers: internal.executed_handlers.clone(),
        processing_time_ms: elapsed_ms,
    };

    Ok(VerificationOutcome { response, scores })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(DispatchOptions::default())
    }

    #[test]
    fn unknown_verifier_is_rejected_before_running() {
        let err = dispatcher()
            .verify_sync("bogus", &VerifyRequest::new("x"))
            .unwrap_err();
        assert!(matches!(err, VerificationError::VerifierNotFound { .. }));
        assert_eq!(err.http_status(), 404);
    }

    #[test]
    fn unknown_config_key_is_rejected_before_running() {
        let mut config = serde_json::Map::new();
        config.insert("bogus".to_string(), serde_json::json!(1));
        let request = VerifyRequest::new("x").with_config(config);
        let err = dispatcher().verify_sync("infreco", &request).unwrap_err();
        match &err {
            VerificationError::InvalidConfig { invalid_options } => {
                assert_eq!(invalid_options, &vec!["bogus".to_string()]);
            }
            other => panic!("expected InvalidConfig, got {other:?}"),
        }
        assert_eq!(err.http_status(), 422);
        assert_eq!(
            err.detail().unwrap()["invalid_options"],
            serde_json::json!(["bogus"])
        );
    }

    #[test]
    fn disallowed_filter_role_is_rejected() {
        let mut config = serde_json::Map::new();
        config.insert(
            "filters".to_string(),
            serde_json::json!({ "logreco": { "filename": "x" } }),
        );
        let request = VerifyRequest::new("x").with_config(config);
        let err = dispatcher().verify_sync("infreco", &request).unwrap_err();
        match err {
            VerificationError::InvalidFilter { invalid_roles } => {
                assert_eq!(invalid_roles, vec!["logreco".to_string()]);
            }
            other => panic!("expected InvalidFilter, got {other:?}"),
        }
    }

    #[test]
    fn details_are_stripped_from_responses() {
        let inputs = "```argdown\n<A>\n(1) P. {formalization: \"p\", declarations: {p: \"p\"}}\n-- {from: ['1']} --\n(2) P again. {formalization: \"p\"}\n```\n";
        let outcome = dispatcher()
            .verify_sync("logreco", &VerifyRequest::new(inputs))
            .unwrap();
        for result in &outcome.response.results {
            assert!(result.details.is_empty(), "details leaked: {result:?}");
        }
    }
}
