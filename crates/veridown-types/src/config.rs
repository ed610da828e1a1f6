//! Typed per-verifier configuration record.
//!
//! Clients send a loose JSON map; builders resolve it into this record after
//! the dispatch boundary has rejected unknown option keys.

use std::collections::BTreeSet;

use crate::filter::{parse_filter_spec, FilterSpec};
use crate::{Result, VerificationError};

pub const DEFAULT_FROM_KEY: &str = "from";
pub const DEFAULT_FORMALIZATION_KEY: &str = "formalization";
pub const DEFAULT_DECLARATIONS_KEY: &str = "declarations";

/// Resolved configuration options for one verification run.
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Key under which a conclusion's inference data lists its premises.
    pub from_key: String,
    /// Key under which a proposition carries its logical formalization.
    pub formalization_key: String,
    /// Key under which a proposition carries its symbol declarations.
    pub declarations_key: String,
    /// Minimum argument count for the at-least-N check.
    pub min_arguments: usize,
    /// Scorer ids activated via `enable_<scorer_id>` options.
    pub enabled_scorers: BTreeSet<String>,
    /// Per-role metadata filters, popped out of the raw config map.
    pub filters: FilterSpec,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            from_key: DEFAULT_FROM_KEY.to_string(),
            formalization_key: DEFAULT_FORMALIZATION_KEY.to_string(),
            declarations_key: DEFAULT_DECLARATIONS_KEY.to_string(),
            min_arguments: 1,
            enabled_scorers: BTreeSet::new(),
            filters: FilterSpec::new(),
        }
    }
}

impl VerifierConfig {
    /// Resolve a raw config map into the typed record.
    ///
    /// Key validation against the builder's declared options happens before
    /// this call; here a value of the wrong shape is still rejected.
    pub fn from_map(raw: &serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        let mut config = VerifierConfig::default();

        for (key, value) in raw {
            match key.as_str() {
                "from_key" => config.from_key = expect_string(key, value)?,
                "formalization_key" => config.formalization_key = expect_string(key, value)?,
                "declarations_key" => config.declarations_key = expect_string(key, value)?,
                "N" => {
                    config.min_arguments = value.as_u64().ok_or_else(|| {
                        VerificationError::InvalidConfig {
                            invalid_options: vec![key.clone()],
                        }
                    })? as usize;
                }
                "filters" => config.filters = parse_filter_spec(value)?,
                other => {
                    if let Some(scorer_id) = other.strip_prefix("enable_") {
                        if value.as_bool() == Some(true) {
                            config.enabled_scorers.insert(scorer_id.to_string());
                        }
                    }
                    // Unknown keys were rejected at the dispatch boundary.
                }
            }
        }

        Ok(config)
    }

    pub fn scorer_enabled(&self, scorer_id: &str) -> bool {
        self.enabled_scorers.contains(scorer_id)
    }
}

fn expect_string(key: &str, value: &serde_json::Value) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| VerificationError::InvalidConfig {
            invalid_options: vec![key.to_string()],
        })
}
