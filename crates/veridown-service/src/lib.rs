//! Veridown dispatch service: the verifier registry, the builders for the
//! closed verifier set, and synchronous/asynchronous dispatch over a
//! bounded worker pool.

pub mod builders;
pub mod dispatch;
pub mod pool;
pub mod registry;

pub use dispatch::{DispatchOptions, Dispatcher, VerificationOutcome};
pub use pool::WorkerPool;
pub use registry::{VerifierBuilder, VerifierRegistry};
