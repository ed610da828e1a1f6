//! Pairwise coherence checks spanning two primary artifacts.
//!
//! Each handler anchors on the *last* item matching each of its two role
//! filters and asserts bidirectional referential and dialectical
//! consistency between the pair.

mod arganno_argmap;
mod arganno_reco;
mod argmap_infreco;
mod argmap_logreco;

pub use arganno_argmap::{
    arganno_argmap_coherence, ArgannoArgmapElemCohereHandler, ArgannoArgmapRelationCohereHandler,
};
pub use arganno_reco::{
    arganno_infreco_coherence, arganno_logreco_coherence, ArgannoInfrecoElemCohereHandler,
    ArgannoInfrecoRelationCohereHandler,
};
pub use argmap_infreco::{
    argmap_infreco_coherence, ArgmapInfrecoElemCohereHandler, ArgmapInfrecoRelationCohereHandler,
};
pub use argmap_logreco::{
    argmap_logreco_coherence, ArgmapLogrecoElemCohereHandler, ArgmapLogrecoRelationCohereHandler,
};

use crate::handler::{last_matching, ItemFilter};
use crate::request::{PrimaryData, VerificationRequest};
use veridown_types::Dtype;

/// Role filters for a coherence pair. When the client supplies none, each
/// family falls back to its conventional defaults.
#[derive(Clone, Default)]
pub struct PairFilters {
    pub first: Option<ItemFilter>,
    pub second: Option<ItemFilter>,
}

impl PairFilters {
    pub fn new(first: Option<ItemFilter>, second: Option<ItemFilter>) -> Self {
        Self { first, second }
    }
}

fn matches(item: &PrimaryData, filter: &Option<ItemFilter>, default: fn(&PrimaryData) -> bool) -> bool {
    match filter {
        Some(f) => f(item),
        None => default(item),
    }
}

/// Locate the anchored pair: the last parsed item matching each filter.
/// Returns `None` when either side is missing or both resolve to the same
/// item.
pub(crate) fn locate_pair<'a>(
    ctx: &'a VerificationRequest,
    filters: &PairFilters,
    default_first: fn(&PrimaryData) -> bool,
    default_second: fn(&PrimaryData) -> bool,
) -> Option<(&'a PrimaryData, &'a PrimaryData)> {
    let first = last_matching(ctx, |item| {
        item.artifact.is_some() && matches(item, &filters.first, default_first)
    })?;
    let second = last_matching(ctx, |item| {
        item.artifact.is_some() && matches(item, &filters.second, default_second)
    })?;
    if first.id == second.id {
        return None;
    }
    Some((first, second))
}

/// Applicability for `evaluate_pairs`: the unordered pair must coincide with
/// the anchored pair.
pub(crate) fn is_anchored_pair(
    a: &PrimaryData,
    b: &PrimaryData,
    ctx: &VerificationRequest,
    filters: &PairFilters,
    default_first: fn(&PrimaryData) -> bool,
    default_second: fn(&PrimaryData) -> bool,
) -> bool {
    match locate_pair(ctx, filters, default_first, default_second) {
        Some((first, second)) => {
            (a.id == first.id && b.id == second.id) || (a.id == second.id && b.id == first.id)
        }
        None => false,
    }
}

pub(crate) fn default_argdown(item: &PrimaryData) -> bool {
    item.dtype == Dtype::Argdown
}

pub(crate) fn default_xml(item: &PrimaryData) -> bool {
    item.dtype == Dtype::Xml
}

pub(crate) fn default_map(item: &PrimaryData) -> bool {
    item.dtype == Dtype::Argdown
        && item
            .metadata
            .get("filename")
            .is_some_and(|f| f.starts_with("map"))
}

pub(crate) fn default_reco(item: &PrimaryData) -> bool {
    item.dtype == Dtype::Argdown
        && item
            .metadata
            .get("filename")
            .is_some_and(|f| f.starts_with("reconstruction"))
}
