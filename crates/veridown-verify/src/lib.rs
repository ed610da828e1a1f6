//! Verification engine for argument artifacts: handler framework, input
//! processing, check families, coherence checks, and virtue scoring.
//!
//! A [`VerificationRequest`] is threaded through a tree of [`Handler`]s.
//! Handlers append [`veridown_types::CheckResult`]s; a request is valid iff
//! every result is. The concrete pipelines are assembled per verifier by
//! the service crate.

pub mod arganno;
pub mod argmap;
pub mod coherence;
pub mod content;
pub mod dialectics;
pub mod handler;
pub mod infreco;
pub mod logreco;
pub mod processing;
pub mod request;
pub mod scoring;
pub(crate) mod util;

pub use handler::{
    compile_filter, compile_filters, CompositeHandler, Handler, ItemFilter,
};
pub use request::{Artifact, PrimaryData, RequestState, VerificationRequest};
pub use scoring::{Scorer, ScoringPipeline};
