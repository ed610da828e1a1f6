//! Verifier registry: named builders assembling check pipelines plus
//! scorers. Constructed once at startup and read-only afterwards.

use veridown_types::{
    ConfigOption, OptionType, Role, VerificationError, VerifierConfig, VerifierInfo, VerifiersList,
};
use veridown_verify::ScoringPipeline;

/// One registered verifier: descriptive metadata plus the pipeline factory.
pub trait VerifierBuilder: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn input_types(&self) -> Vec<veridown_types::Dtype>;
    fn allowed_filter_roles(&self) -> Vec<Role>;
    fn is_coherence_verifier(&self) -> bool {
        false
    }

    /// Options declared by the builder itself (scorer toggles excluded).
    fn declared_options(&self) -> Vec<ConfigOption> {
        Vec::new()
    }

    /// Scorer ids this verifier can activate.
    fn scorer_ids(&self) -> Vec<&'static str> {
        Vec::new()
    }

    /// Assemble the pipeline plus the activated scorers.
    fn build(&self, config: &VerifierConfig) -> ScoringPipeline;

    /// Declared options plus one auto-generated `enable_<scorer_id>` toggle
    /// per scorer.
    fn config_options(&self) -> Vec<ConfigOption> {
        let mut options = self.declared_options();
        for scorer_id in self.scorer_ids() {
            let option_name = format!("enable_{scorer_id}");
            if options.iter().any(|o| o.name == option_name) {
                continue;
            }
            options.push(ConfigOption::new(
                option_name,
                OptionType::Bool,
                Some(serde_json::json!(false)),
                format!("Enable scoring of {scorer_id}"),
            ));
        }
        options
    }

    /// Returns the config keys outside the declared option set.
    fn validate_config(&self, config: &serde_json::Map<String, serde_json::Value>) -> Vec<String> {
        let mut valid: Vec<String> = self.config_options().into_iter().map(|o| o.name).collect();
        valid.push("filters".to_string());
        config
            .keys()
            .filter(|key| !valid.contains(key))
            .cloned()
            .collect()
    }

    /// Returns the filter roles outside the allowed role set.
    fn validate_roles(&self, roles: &[Role]) -> Vec<String> {
        let allowed = self.allowed_filter_roles();
        roles
            .iter()
            .filter(|role| !allowed.contains(role))
            .map(|role| role.as_str().to_string())
            .collect()
    }

    fn info(&self) -> VerifierInfo {
        VerifierInfo {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_types: self.input_types(),
            allowed_filter_roles: self.allowed_filter_roles(),
            config_options: self.config_options(),
            is_coherence_verifier: self.is_coherence_verifier(),
        }
    }
}

impl std::fmt::Debug for dyn VerifierBuilder + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifierBuilder").field("name", &self.name()).finish()
    }
}

/// The closed set of named verifiers. Immutable after construction; safe to
/// share across workers behind an `Arc`.
pub struct VerifierRegistry {
    builders: Vec<Box<dyn VerifierBuilder>>,
}

impl VerifierRegistry {
    pub fn new() -> Self {
        Self {
            builders: crate::builders::all_builders(),
        }
    }

    pub fn get(&self, name: &str) -> Result<&dyn VerifierBuilder, VerificationError> {
        self.builders
            .iter()
            .find(|b| b.name() == name)
            .map(|b| b.as_ref())
            .ok_or_else(|| VerificationError::VerifierNotFound {
                name: name.to_string(),
                available: self.names(),
            })
    }

    pub fn names(&self) -> Vec<String> {
        self.builders.iter().map(|b| b.name().to_string()).collect()
    }

    pub fn info(&self, name: &str) -> Result<VerifierInfo, VerificationError> {
        Ok(self.get(name)?.info())
    }

    /// All verifiers grouped for discovery: `has_*` verifiers are content
    /// checks, coherence verifiers their own group, everything else core.
    pub fn all_infos(&self) -> VerifiersList {
        let mut list = VerifiersList::default();
        for builder in &self.builders {
            let info = builder.info();
            if builder.name().starts_with("has_") {
                list.content_check.push(info);
            } else if builder.is_coherence_verifier() {
                list.coherence.push(info);
            } else {
                list.core.push(info);
            }
        }
        list
    }
}

impl Default for VerifierRegistry {
    fn default() -> Self {
        Self::new()
    }
}
