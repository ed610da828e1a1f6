//! First-order formula parser and entailment checking for the logical
//! reconstruction verifiers.

mod parser;
mod prover;
mod syntax;

pub use parser::parse;
pub use prover::{ModelChecker, Prover};
pub use syntax::{render_nl, Formula};
