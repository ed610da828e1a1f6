//! Handler framework: the `Handler` trait, composite grouping, and the
//! per-item / pairwise evaluation drivers shared by the check families.

use std::sync::Arc;

use veridown_types::{CheckResult, Dtype, FilterSpec, Result, Role};

use crate::request::{PrimaryData, VerificationRequest};

// ---------------------------------------------------------------------------
// Handler trait
// ---------------------------------------------------------------------------

/// A verification handler.
///
/// `process` is the fixed outer routine: it honors the short-circuit flag,
/// appends the handler name to the audit log, runs `handle`, converts an
/// error into an invalid result (one failing check must not abort the
/// pipeline), and finally delegates to `next` when present.
pub trait Handler: Send + Sync {
    fn name(&self) -> &str;

    /// Concrete check logic. Errors are captured by `process`, never
    /// propagated across the handler boundary.
    fn handle(&self, request: &mut VerificationRequest) -> Result<()>;

    /// Optional linear successor.
    fn next(&self) -> Option<&dyn Handler> {
        None
    }

    fn process(&self, request: &mut VerificationRequest) {
        if !request.continue_processing {
            return;
        }
        tracing::debug!(handler = self.name(), "executing handler");
        request.executed_handlers.push(self.name().to_string());

        if let Err(error) = self.handle(request) {
            tracing::warn!(handler = self.name(), %error, "handler failed");
            request.add_result(CheckResult::invalid(
                self.name(),
                vec![],
                format!("Processing error: {error}"),
            ));
        }

        if request.continue_processing {
            if let Some(next) = self.next() {
                next.process(request);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// CompositeHandler
// ---------------------------------------------------------------------------

/// Groups handlers; children run in insertion order, breaking early when a
/// child stops the chain. Composites may be nested.
pub struct CompositeHandler {
    name: String,
    handlers: Vec<Box<dyn Handler>>,
}

impl CompositeHandler {
    pub fn new(name: impl Into<String>, handlers: Vec<Box<dyn Handler>>) -> Self {
        Self {
            name: name.into(),
            handlers,
        }
    }

    pub fn push(&mut self, handler: Box<dyn Handler>) {
        self.handlers.push(handler);
    }

    pub fn handlers(&self) -> &[Box<dyn Handler>] {
        &self.handlers
    }
}

impl Handler for CompositeHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, request: &mut VerificationRequest) -> Result<()> {
        for handler in &self.handlers {
            handler.process(request);
            if !request.continue_processing {
                break;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Item filters
// ---------------------------------------------------------------------------

/// Predicate over primary data, compiled from a filter role's criteria.
pub type ItemFilter = Arc<dyn Fn(&PrimaryData) -> bool + Send + Sync>;

/// Compile one role's criteria into a predicate. The role pins the data
/// type; every criterion must match the item's metadata. Criterion
/// evaluation errors (bad patterns) fail closed.
pub fn compile_filter(role: Role, criteria: &[veridown_types::FilterCriterion]) -> ItemFilter {
    let criteria = criteria.to_vec();
    Arc::new(move |item: &PrimaryData| {
        if item.dtype != role.dtype() {
            return false;
        }
        criteria
            .iter()
            .all(|c| c.matches(&item.metadata).unwrap_or(false))
    })
}

/// Compile a full filter spec into per-role predicates.
pub fn compile_filters(
    spec: &FilterSpec,
) -> indexmap::IndexMap<Role, ItemFilter> {
    spec.iter()
        .map(|(role, criteria)| (*role, compile_filter(*role, criteria)))
        .collect()
}

// ---------------------------------------------------------------------------
// Evaluation drivers
// ---------------------------------------------------------------------------

/// Per-item evaluation: visit each parsed item of the given type that passes
/// the filter, collect one optional result per item.
pub fn evaluate_items<F>(
    request: &mut VerificationRequest,
    dtype: Dtype,
    filter: Option<&ItemFilter>,
    evaluate: F,
) -> Result<()>
where
    F: Fn(&PrimaryData, &VerificationRequest) -> Result<Option<CheckResult>>,
{
    let mut results = Vec::new();
    for item in &request.verification_data {
        if item.artifact.is_none() || item.dtype != dtype {
            continue;
        }
        if let Some(filter) = filter {
            if !filter(item) {
                continue;
            }
        }
        if let Some(result) = evaluate(item, request)? {
            results.push(result);
        }
    }
    for result in results {
        request.add_result(result);
    }
    Ok(())
}

/// Pairwise evaluation over ordered pairs (i < j) of parsed items.
pub fn evaluate_pairs<A, F>(
    request: &mut VerificationRequest,
    applicable: A,
    evaluate: F,
) -> Result<()>
where
    A: Fn(&PrimaryData, &PrimaryData, &VerificationRequest) -> bool,
    F: Fn(&PrimaryData, &PrimaryData, &VerificationRequest) -> Result<Option<CheckResult>>,
{
    let mut results = Vec::new();
    for i in 0..request.verification_data.len() {
        for j in (i + 1)..request.verification_data.len() {
            let a = &request.verification_data[i];
            let b = &request.verification_data[j];
            if a.artifact.is_none() || b.artifact.is_none() {
                continue;
            }
            if applicable(a, b, request) {
                if let Some(result) = evaluate(a, b, request)? {
                    results.push(result);
                }
            }
        }
    }
    for result in results {
        request.add_result(result);
    }
    Ok(())
}

/// The last item matching a predicate, the anchor for coherence handlers.
pub fn last_matching<'a>(
    request: &'a VerificationRequest,
    predicate: impl Fn(&PrimaryData) -> bool,
) -> Option<&'a PrimaryData> {
    request
        .verification_data
        .iter()
        .rev()
        .find(|item| predicate(item))
}
