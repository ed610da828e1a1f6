//! Filter roles and metadata filter specifications.
//!
//! A filter spec maps a role (`arganno`, `argmap`, `infreco`, `logreco`) to a
//! list of criteria over a data item's metadata. Roles also pin the data
//! type: `arganno` selects xml items, every other role selects argdown items.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{Dtype, VerificationError};

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// A named selector pairing filter criteria with a class of primary data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Arganno,
    Argmap,
    Infreco,
    Logreco,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Arganno, Role::Argmap, Role::Infreco, Role::Logreco];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Arganno => "arganno",
            Role::Argmap => "argmap",
            Role::Infreco => "infreco",
            Role::Logreco => "logreco",
        }
    }

    /// The data type this role selects.
    pub fn dtype(&self) -> Dtype {
        match self {
            Role::Arganno => Dtype::Xml,
            _ => Dtype::Argdown,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "arganno" => Ok(Role::Arganno),
            "argmap" => Ok(Role::Argmap),
            "infreco" => Ok(Role::Infreco),
            "logreco" => Ok(Role::Logreco),
            other => Err(format!("unknown filter role '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Criteria
// ---------------------------------------------------------------------------

/// A single metadata criterion: `metadata[key]` must equal `value`, or match
/// it as a regular expression when `regex` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriterion {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub regex: bool,
}

impl FilterCriterion {
    pub fn exact(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            regex: false,
        }
    }

    pub fn matching(key: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: pattern.into(),
            regex: true,
        }
    }

    /// Evaluate this criterion against a metadata map.
    pub fn matches(&self, metadata: &IndexMap<String, String>) -> crate::Result<bool> {
        let Some(actual) = metadata.get(&self.key) else {
            return Ok(false);
        };
        if self.regex {
            let re = regex::Regex::new(&self.value).map_err(|e| {
                VerificationError::Filtering(format!("invalid pattern '{}': {e}", self.value))
            })?;
            Ok(re.is_match(actual))
        } else {
            Ok(actual == &self.value)
        }
    }
}

/// Criteria for one role, accepting both the list form
/// `[{"key": k, "value": v, "regex": false}]` and the shorthand map form
/// `{"key": "value"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoleCriteria {
    List(Vec<FilterCriterion>),
    Map(IndexMap<String, String>),
}

impl RoleCriteria {
    pub fn into_criteria(self) -> Vec<FilterCriterion> {
        match self {
            RoleCriteria::List(list) => list,
            RoleCriteria::Map(map) => map
                .into_iter()
                .map(|(key, value)| FilterCriterion::exact(key, value))
                .collect(),
        }
    }
}

/// Ordered mapping from role to its criteria list.
pub type FilterSpec = IndexMap<Role, Vec<FilterCriterion>>;

/// Parse the `filters` config value into a [`FilterSpec`], rejecting roles
/// outside the closed role set.
pub fn parse_filter_spec(value: &serde_json::Value) -> crate::Result<FilterSpec> {
    let raw: IndexMap<String, RoleCriteria> =
        serde_json::from_value(value.clone()).map_err(|e| {
            VerificationError::Filtering(format!("malformed filter specification: {e}"))
        })?;

    let mut spec = FilterSpec::new();
    let mut invalid_roles = Vec::new();
    for (role_name, criteria) in raw {
        match role_name.parse::<Role>() {
            Ok(role) => {
                spec.insert(role, criteria.into_criteria());
            }
            Err(_) => invalid_roles.push(role_name),
        }
    }
    if !invalid_roles.is_empty() {
        return Err(VerificationError::InvalidFilter { invalid_roles });
    }
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn role_round_trip() {
        for role in Role::ALL {
            let parsed: Role = role.as_str().parse().unwrap();
            assert_eq!(parsed, role);
        }
        assert!("bogus".parse::<Role>().is_err());
    }

    #[test]
    fn role_dtype_domains() {
        assert_eq!(Role::Arganno.dtype(), Dtype::Xml);
        assert_eq!(Role::Argmap.dtype(), Dtype::Argdown);
        assert_eq!(Role::Infreco.dtype(), Dtype::Argdown);
        assert_eq!(Role::Logreco.dtype(), Dtype::Argdown);
    }

    #[test]
    fn exact_criterion_matches() {
        let c = FilterCriterion::exact("filename", "map.ad");
        assert!(c.matches(&metadata(&[("filename", "map.ad")])).unwrap());
        assert!(!c.matches(&metadata(&[("filename", "reco.ad")])).unwrap());
        assert!(!c.matches(&metadata(&[])).unwrap());
    }

    #[test]
    fn regex_criterion_matches() {
        let c = FilterCriterion::matching("filename", "map.*");
        assert!(c.matches(&metadata(&[("filename", "map.ad")])).unwrap());
        assert!(!c.matches(&metadata(&[("filename", "reconstructions.ad")])).unwrap());
    }

    #[test]
    fn invalid_regex_is_a_filtering_error() {
        let c = FilterCriterion::matching("filename", "ma[p");
        let err = c.matches(&metadata(&[("filename", "map.ad")])).unwrap_err();
        assert!(matches!(err, VerificationError::Filtering(_)));
    }

    #[test]
    fn parse_filter_spec_list_form() {
        let value = serde_json::json!({
            "infreco": [{ "key": "version", "value": "v3", "regex": false }]
        });
        let spec = parse_filter_spec(&value).unwrap();
        assert_eq!(spec[&Role::Infreco], vec![FilterCriterion::exact("version", "v3")]);
    }

    #[test]
    fn parse_filter_spec_map_shorthand() {
        let value = serde_json::json!({ "argmap": { "filename": "map.ad" } });
        let spec = parse_filter_spec(&value).unwrap();
        assert_eq!(spec[&Role::Argmap], vec![FilterCriterion::exact("filename", "map.ad")]);
    }

    #[test]
    fn parse_filter_spec_rejects_unknown_role() {
        let value = serde_json::json!({ "bogus": { "filename": "x" } });
        let err = parse_filter_spec(&value).unwrap_err();
        match err {
            VerificationError::InvalidFilter { invalid_roles } => {
                assert_eq!(invalid_roles, vec!["bogus".to_string()]);
            }
            other => panic!("expected InvalidFilter, got {other:?}"),
        }
    }
}
