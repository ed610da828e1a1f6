//! Argdown parser for the argument-map and reconstruction subset used by
//! the Veridown verification pipelines.
//!
//! The entry point is [`parse`], which turns an Argdown snippet into an
//! [`ArgdownGraph`] of propositions, arguments (with premise-conclusion
//! structures), and dialectical relations.

mod ast;
mod data;
mod parser;

pub use ast::{
    ArgdownGraph, Argument, DataMap, DialecticalRelation, DialecticalType, PcsItem, PcsStatement,
    Proposition, Valence,
};
pub use data::parse_data_map;
pub use parser::parse;
