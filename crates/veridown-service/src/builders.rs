//! The builders behind the registered verifiers. Each assembles its
//! pipeline from the check families, tailored the way the verifier needs,
//! plus the scorers activated by `enable_<scorer_id>` options.

use veridown_types::{ConfigOption, Dtype, FilterCriterion, OptionType, Role, VerifierConfig};
use veridown_verify::arganno::arganno_composite;
use veridown_verify::argmap::argmap_composite;
use veridown_verify::coherence::{
    arganno_argmap_coherence, arganno_infreco_coherence, arganno_logreco_coherence,
    argmap_infreco_coherence, argmap_logreco_coherence, PairFilters,
};
use veridown_verify::content::{HasAnnotationsHandler, HasArgdownHandler};
use veridown_verify::handler::compile_filter;
use veridown_verify::infreco::{
    EndsWithConclusionHandler, HasArgumentsHandler, HasAtLeastNArgumentsHandler, HasGistHandler,
    HasInferenceDataHandler, HasLabelHandler, HasPCSHandler, HasUniqueArgumentHandler,
    NoArgInlineDataHandler, NoDuplicatePCSLabelsHandler, NoExtraPropositionsHandler,
    NoPropInlineDataHandler, NotMultipleGistsHandler, OnlyGroundedDialecticalRelationsHandler,
    PropRefsExistHandler, StartsWithPremiseHandler, UsesAllPropsHandler,
};
use veridown_verify::logreco::logreco_composite;
use veridown_verify::processing::{
    default_processing, AnnotationParserHandler, ArgdownParserHandler, FencedCodeBlockExtractor,
};
use veridown_verify::scoring::{
    AnnotationDensityScorer, CoverageScorer, FaithfulnessScorer, FormalizationsFaithfulnessScorer,
    MapDensityScorer, MapSizeScorer, PredicateLogicScorer, PremisesScorer, Scorer, ScopeScorer,
    SemanticCoherenceScorer, SubargumentsScorer, TrivialityScorer,
};
use veridown_verify::{CompositeHandler, Handler, ItemFilter, ScoringPipeline};

use crate::registry::VerifierBuilder;

// ---------------------------------------------------------------------------
// Shared option declarations and filter plumbing
// ---------------------------------------------------------------------------

fn from_key_option() -> ConfigOption {
    ConfigOption::new(
        "from_key",
        OptionType::String,
        Some(serde_json::json!("from")),
        "Key used for inference information in arguments",
    )
}

fn formalization_key_option() -> ConfigOption {
    ConfigOption::new(
        "formalization_key",
        OptionType::String,
        Some(serde_json::json!("formalization")),
        "Key used for formalization information",
    )
}

fn declarations_key_option() -> ConfigOption {
    ConfigOption::new(
        "declarations_key",
        OptionType::String,
        Some(serde_json::json!("declarations")),
        "Key used for declarations information",
    )
}

fn min_arguments_option() -> ConfigOption {
    ConfigOption::new(
        "N",
        OptionType::Int,
        Some(serde_json::json!(1)),
        "Minimum number of arguments expected in the snippet",
    )
}

/// Compile the client's filter for a role, when one was supplied.
fn role_filter(config: &VerifierConfig, role: Role) -> Option<ItemFilter> {
    config
        .filters
        .get(&role)
        .map(|criteria| compile_filter(role, criteria))
}

/// Compile the client's filter for a role, falling back to a conventional
/// filename pattern so multi-argdown pipelines can tell their items apart.
fn role_filter_or_default(
    config: &VerifierConfig,
    role: Role,
    default_pattern: &str,
) -> ItemFilter {
    match config.filters.get(&role) {
        Some(criteria) => compile_filter(role, criteria),
        None => compile_filter(
            role,
            &[FilterCriterion::matching("filename", default_pattern)],
        ),
    }
}

// ---------------------------------------------------------------------------
// Scorer construction
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
enum ScorerKind {
    Coverage,
    Scope,
    AnnotationDensity,
    MapSize,
    MapDensity,
    Faithfulness,
    Subarguments,
    Premises,
    PredicateLogic,
    FormalizationsFaithfulness,
    Triviality,
    SemanticCoherence,
}

fn make_scorer(kind: ScorerKind, parent: &str, scorer_id: &str) -> Box<dyn Scorer> {
    match kind {
        ScorerKind::Coverage => Box::new(CoverageScorer::new(parent, scorer_id)),
        ScorerKind::Scope => Box::new(ScopeScorer::new(parent, scorer_id)),
        ScorerKind::AnnotationDensity => Box::new(AnnotationDensityScorer::new(parent, scorer_id)),
        ScorerKind::MapSize => Box::new(MapSizeScorer::new(parent, scorer_id)),
        ScorerKind::MapDensity => Box::new(MapDensityScorer::new(parent, scorer_id)),
        ScorerKind::Faithfulness => Box::new(FaithfulnessScorer::new(parent, scorer_id)),
        ScorerKind::Subarguments => Box::new(SubargumentsScorer::new(parent, scorer_id)),
        ScorerKind::Premises => Box::new(PremisesScorer::new(parent, scorer_id)),
        ScorerKind::PredicateLogic => Box::new(PredicateLogicScorer::new(parent, scorer_id)),
        ScorerKind::FormalizationsFaithfulness => {
            Box::new(FormalizationsFaithfulnessScorer::new(parent, scorer_id))
        }
        ScorerKind::Triviality => Box::new(TrivialityScorer::new(parent, scorer_id)),
        ScorerKind::SemanticCoherence => Box::new(SemanticCoherenceScorer::new(parent, scorer_id)),
    }
}

fn build_scorers(
    parent: &str,
    catalog: &[(&'static str, ScorerKind)],
    config: &VerifierConfig,
) -> Vec<Box<dyn Scorer>> {
    catalog
        .iter()
        .filter(|(scorer_id, _)| config.scorer_enabled(scorer_id))
        .map(|(scorer_id, kind)| make_scorer(*kind, parent, scorer_id))
        .collect()
}

// ---------------------------------------------------------------------------
// Tailored infreco composites
// ---------------------------------------------------------------------------

/// Standalone infreco: the full family minus the uses-all-props rule.
fn standalone_infreco(filter: Option<ItemFilter>, from_key: &str) -> CompositeHandler {
    CompositeHandler::new(
        "InfRecoCompositeHandler",
        vec![
            Box::new(HasArgumentsHandler::new("InfReco.HasArgumentsHandler", filter.clone())),
            Box::new(HasUniqueArgumentHandler::new(
                "InfReco.HasUniqueArgumentHandler",
                filter.clone(),
            )),
            Box::new(HasPCSHandler::new("InfReco.HasPCSHandler", filter.clone())),
            Box::new(StartsWithPremiseHandler::new(
                "InfReco.StartsWithPremiseHandler",
                filter.clone(),
            )),
            Box::new(EndsWithConclusionHandler::new(
                "InfReco.EndsWithConclusionHandler",
                filter.clone(),
            )),
            Box::new(NotMultipleGistsHandler::new(
                "InfReco.NotMultipleGistsHandler",
                filter.clone(),
            )),
            Box::new(NoDuplicatePCSLabelsHandler::new(
                "InfReco.NoDuplicatePCSLabelsHandler",
                filter.clone(),
            )),
            Box::new(HasLabelHandler::new("InfReco.HasLabelHandler", filter.clone())),
            Box::new(HasGistHandler::new("InfReco.HasGistHandler", filter.clone())),
            Box::new(HasInferenceDataHandler::new(
                "InfReco.HasInferenceDataHandler",
                filter.clone(),
                from_key,
            )),
            Box::new(PropRefsExistHandler::new(
                "InfReco.PropRefsExistHandler",
                filter.clone(),
                from_key,
            )),
            Box::new(NoExtraPropositionsHandler::new(
                "InfReco.NoExtraPropositionsHandler",
                filter.clone(),
            )),
            Box::new(OnlyGroundedDialecticalRelationsHandler::new(
                "InfReco.OnlyGroundedDialecticalRelationsHandler",
                filter.clone(),
            )),
            Box::new(NoPropInlineDataHandler::new(
                "InfReco.NoPropInlineDataHandler",
                filter.clone(),
            )),
            Box::new(NoArgInlineDataHandler::new("InfReco.NoArgInlineDataHandler", filter)),
        ],
    )
}

/// The reduced infreco set used in coherence pipelines: structural and
/// inference rules only, keeping uses-all-props.
fn coherence_infreco(filter: Option<ItemFilter>, from_key: &str) -> CompositeHandler {
    CompositeHandler::new(
        "InfRecoCompositeHandler",
        vec![
            Box::new(HasArgumentsHandler::new("InfReco.HasArgumentsHandler", filter.clone())),
            Box::new(HasPCSHandler::new("InfReco.HasPCSHandler", filter.clone())),
            Box::new(StartsWithPremiseHandler::new(
                "InfReco.StartsWithPremiseHandler",
                filter.clone(),
            )),
            Box::new(EndsWithConclusionHandler::new(
                "InfReco.EndsWithConclusionHandler",
                filter.clone(),
            )),
            Box::new(NoDuplicatePCSLabelsHandler::new(
                "InfReco.NoDuplicatePCSLabelsHandler",
                filter.clone(),
            )),
            Box::new(HasLabelHandler::new("InfReco.HasLabelHandler", filter.clone())),
            Box::new(HasInferenceDataHandler::new(
                "InfReco.HasInferenceDataHandler",
                filter.clone(),
                from_key,
            )),
            Box::new(PropRefsExistHandler::new(
                "InfReco.PropRefsExistHandler",
                filter.clone(),
                from_key,
            )),
            Box::new(UsesAllPropsHandler::new(
                "InfReco.UsesAllPropsHandler",
                filter,
                from_key,
            )),
        ],
    )
}

/// The infreco set preceding the logreco composite: the full family minus
/// the inline-data bans, which logical profiles rely on.
fn logreco_infreco(filter: Option<ItemFilter>, from_key: &str) -> CompositeHandler {
    CompositeHandler::new(
        "InfRecoCompositeHandler",
        vec![
            Box::new(HasArgumentsHandler::new("InfReco.HasArgumentsHandler", filter.clone())),
            Box::new(HasPCSHandler::new("InfReco.HasPCSHandler", filter.clone())),
            Box::new(StartsWithPremiseHandler::new(
                "InfReco.StartsWithPremiseHandler",
                filter.clone(),
            )),
            Box::new(EndsWithConclusionHandler::new(
                "InfReco.EndsWithConclusionHandler",
                filter.clone(),
            )),
            Box::new(NotMultipleGistsHandler::new(
                "InfReco.NotMultipleGistsHandler",
                filter.clone(),
            )),
            Box::new(NoDuplicatePCSLabelsHandler::new(
                "InfReco.NoDuplicatePCSLabelsHandler",
                filter.clone(),
            )),
            Box::new(HasLabelHandler::new("InfReco.HasLabelHandler", filter.clone())),
            Box::new(HasInferenceDataHandler::new(
                "InfReco.HasInferenceDataHandler",
                filter.clone(),
                from_key,
            )),
            Box::new(PropRefsExistHandler::new(
                "InfReco.PropRefsExistHandler",
                filter.clone(),
                from_key,
            )),
            Box::new(UsesAllPropsHandler::new(
                "InfReco.UsesAllPropsHandler",
                filter.clone(),
                from_key,
            )),
            Box::new(NoExtraPropositionsHandler::new(
                "InfReco.NoExtraPropositionsHandler",
                filter,
            )),
        ],
    )
}

fn pipeline(name: &str, handlers: Vec<Box<dyn Handler>>, scorers: Vec<Box<dyn Scorer>>) -> ScoringPipeline {
    ScoringPipeline::new(format!("{name}_pipeline"), handlers, scorers)
}

// ---------------------------------------------------------------------------
// Core builders
// ---------------------------------------------------------------------------

pub struct ArgannoBuilder;

const ARGANNO_SCORERS: &[(&str, ScorerKind)] = &[
    ("annotation_coverage_scorer", ScorerKind::Coverage),
    ("annotation_density_scorer", ScorerKind::AnnotationDensity),
    ("annotation_scope_scorer", ScorerKind::Scope),
];

impl VerifierBuilder for ArgannoBuilder {
    fn name(&self) -> &str {
        "arganno"
    }

    fn description(&self) -> &str {
        "Validates argumentative annotations in XML format"
    }

    fn input_types(&self) -> Vec<Dtype> {
        vec![Dtype::Xml]
    }

    fn allowed_filter_roles(&self) -> Vec<Role> {
        vec![Role::Arganno]
    }

    fn scorer_ids(&self) -> Vec<&'static str> {
        ARGANNO_SCORERS.iter().map(|(id, _)| *id).collect()
    }

    fn build(&self, config: &VerifierConfig) -> ScoringPipeline {
        let filter = role_filter(config, Role::Arganno);
        pipeline(
            self.name(),
            vec![
                Box::new(FencedCodeBlockExtractor::new()),
                Box::new(AnnotationParserHandler::new()),
                Box::new(HasAnnotationsHandler::new(filter.clone())),
                Box::new(arganno_composite(filter)),
            ],
            build_scorers(self.name(), ARGANNO_SCORERS, config),
        )
    }
}

pub struct ArgmapBuilder;

const ARGMAP_SCORERS: &[(&str, ScorerKind)] = &[
    ("argmap_size_scorer", ScorerKind::MapSize),
    ("argmap_density_scorer", ScorerKind::MapDensity),
    ("argmap_faithfulness_scorer", ScorerKind::Faithfulness),
];

impl VerifierBuilder for ArgmapBuilder {
    fn name(&self) -> &str {
        "argmap"
    }

    fn description(&self) -> &str {
        "Validates argument maps in Argdown format"
    }

    fn input_types(&self) -> Vec<Dtype> {
        vec![Dtype::Argdown]
    }

    fn allowed_filter_roles(&self) -> Vec<Role> {
        vec![Role::Argmap]
    }

    fn scorer_ids(&self) -> Vec<&'static str> {
        ARGMAP_SCORERS.iter().map(|(id, _)| *id).collect()
    }

    fn build(&self, config: &VerifierConfig) -> ScoringPipeline {
        let filter = role_filter(config, Role::Argmap);
        pipeline(
            self.name(),
            vec![
                Box::new(FencedCodeBlockExtractor::new()),
                Box::new(ArgdownParserHandler::new()),
                Box::new(HasArgdownHandler::new(filter.clone())),
                Box::new(argmap_composite(filter)),
            ],
            build_scorers(self.name(), ARGMAP_SCORERS, config),
        )
    }
}

pub struct InfrecoBuilder;

const INFRECO_SCORERS: &[(&str, ScorerKind)] = &[
    ("infreco_subarguments_scorer", ScorerKind::Subarguments),
    ("infreco_premises_scorer", ScorerKind::Premises),
    ("infreco_faithfulness_scorer", ScorerKind::Faithfulness),
];

impl VerifierBuilder for InfrecoBuilder {
    fn name(&self) -> &str {
        "infreco"
    }

    fn description(&self) -> &str {
        "Validates informal argument reconstruction in Argdown format"
    }

    fn input_types(&self) -> Vec<Dtype> {
        vec![Dtype::Argdown]
    }

    fn allowed_filter_roles(&self) -> Vec<Role> {
        vec![Role::Infreco]
    }

    fn declared_options(&self) -> Vec<ConfigOption> {
        vec![from_key_option(), min_arguments_option()]
    }

    fn scorer_ids(&self) -> Vec<&'static str> {
        INFRECO_SCORERS.iter().map(|(id, _)| *id).collect()
    }

    fn build(&self, config: &VerifierConfig) -> ScoringPipeline {
        let filter = role_filter(config, Role::Infreco);
        let mut handlers: Vec<Box<dyn Handler>> = vec![
            Box::new(FencedCodeBlockExtractor::new()),
            Box::new(ArgdownParserHandler::new()),
            Box::new(HasArgdownHandler::new(filter.clone())),
        ];
        if config.min_arguments > 1 {
            handlers.push(Box::new(HasAtLeastNArgumentsHandler::new(
                "InfReco.HasAtLeastNArgumentsHandler",
                filter.clone(),
                config.min_arguments,
            )));
        }
        handlers.push(Box::new(standalone_infreco(filter, &config.from_key)));
        pipeline(
            self.name(),
            handlers,
            build_scorers(self.name(), INFRECO_SCORERS, config),
        )
    }
}

pub struct LogrecoBuilder;

const LOGRECO_SCORERS: &[(&str, ScorerKind)] = &[
    ("logreco_premises_scorer", ScorerKind::Premises),
    ("logreco_subarguments_scorer", ScorerKind::Subarguments),
    ("logreco_faithfulness_scorer", ScorerKind::Faithfulness),
    ("logreco_predicate_logic_scorer", ScorerKind::PredicateLogic),
    (
        "logreco_formalizations_faithfulness_scorer",
        ScorerKind::FormalizationsFaithfulness,
    ),
    ("logreco_triviality_scorer", ScorerKind::Triviality),
];

impl VerifierBuilder for LogrecoBuilder {
    fn name(&self) -> &str {
        "logreco"
    }

    fn description(&self) -> &str {
        "Validates logical argument reconstruction in Argdown format"
    }

    fn input_types(&self) -> Vec<Dtype> {
        vec![Dtype::Argdown]
    }

    fn allowed_filter_roles(&self) -> Vec<Role> {
        vec![Role::Logreco]
    }

    fn declared_options(&self) -> Vec<ConfigOption> {
        vec![
            from_key_option(),
            formalization_key_option(),
            declarations_key_option(),
            min_arguments_option(),
        ]
    }

    fn scorer_ids(&self) -> Vec<&'static str> {
        LOGRECO_SCORERS.iter().map(|(id, _)| *id).collect()
    }

    fn build(&self, config: &VerifierConfig) -> ScoringPipeline {
        let filter = role_filter(config, Role::Logreco);
        let mut handlers: Vec<Box<dyn Handler>> = vec![
            Box::new(FencedCodeBlockExtractor::new()),
            Box::new(ArgdownParserHandler::new()),
            Box::new(HasArgdownHandler::new(filter.clone())),
        ];
        if config.min_arguments > 1 {
            handlers.push(Box::new(HasAtLeastNArgumentsHandler::new(
                "InfReco.HasAtLeastNArgumentsHandler",
                filter.clone(),
                config.min_arguments,
            )));
        }
        handlers.push(Box::new(logreco_infreco(filter.clone(), &config.from_key)));
        handlers.push(Box::new(logreco_composite(
            filter,
            &config.from_key,
            &config.formalization_key,
            &config.declarations_key,
        )));
        pipeline(
            self.name(),
            handlers,
            build_scorers(self.name(), LOGRECO_SCORERS, config),
        )
    }
}

// ---------------------------------------------------------------------------
// Content-check builders
// ---------------------------------------------------------------------------

pub struct HasAnnotationsBuilder;

impl VerifierBuilder for HasAnnotationsBuilder {
    fn name(&self) -> &str {
        "has_annotations"
    }

    fn description(&self) -> &str {
        "Checks that the input contains at least one parsable XML annotation block"
    }

    fn input_types(&self) -> Vec<Dtype> {
        vec![Dtype::Xml]
    }

    fn allowed_filter_roles(&self) -> Vec<Role> {
        Vec::new()
    }

    fn build(&self, _config: &VerifierConfig) -> ScoringPipeline {
        pipeline(
            self.name(),
            vec![
                Box::new(FencedCodeBlockExtractor::new()),
                Box::new(AnnotationParserHandler::new()),
                Box::new(HasAnnotationsHandler::new(None)),
            ],
            Vec::new(),
        )
    }
}

pub struct HasArgdownBuilder;

impl VerifierBuilder for HasArgdownBuilder {
    fn name(&self) -> &str {
        "has_argdown"
    }

    fn description(&self) -> &str {
        "Checks that the input contains at least one parsable Argdown block"
    }

    fn input_types(&self) -> Vec<Dtype> {
        vec![Dtype::Argdown]
    }

    fn allowed_filter_roles(&self) -> Vec<Role> {
        Vec::new()
    }

    fn build(&self, _config: &VerifierConfig) -> ScoringPipeline {
        pipeline(
            self.name(),
            vec![
                Box::new(FencedCodeBlockExtractor::new()),
                Box::new(ArgdownParserHandler::new()),
                Box::new(HasArgdownHandler::new(None)),
            ],
            Vec::new(),
        )
    }
}

// ---------------------------------------------------------------------------
// Coherence builders
// ---------------------------------------------------------------------------

pub struct ArgannoArgmapBuilder;

const ARGANNO_ARGMAP_SCORERS: &[(&str, ScorerKind)] = &[
    (
        "annotation_argmap_semantic_coherence_scorer",
        ScorerKind::SemanticCoherence,
    ),
    ("annotation_argmap_coverage_scorer", ScorerKind::Coverage),
    ("annotation_argmap_density_scorer", ScorerKind::AnnotationDensity),
    ("annotation_argmap_scope_scorer", ScorerKind::Scope),
];

impl VerifierBuilder for ArgannoArgmapBuilder {
    fn name(&self) -> &str {
        "arganno_argmap"
    }

    fn description(&self) -> &str {
        "Checks coherence between argumentative annotations and argument maps"
    }

    fn input_types(&self) -> Vec<Dtype> {
        vec![Dtype::Xml, Dtype::Argdown]
    }

    fn allowed_filter_roles(&self) -> Vec<Role> {
        vec![Role::Arganno, Role::Argmap]
    }

    fn is_coherence_verifier(&self) -> bool {
        true
    }

    fn scorer_ids(&self) -> Vec<&'static str> {
        ARGANNO_ARGMAP_SCORERS.iter().map(|(id, _)| *id).collect()
    }

    fn build(&self, config: &VerifierConfig) -> ScoringPipeline {
        let arganno_filter = role_filter(config, Role::Arganno);
        let argmap_filter = role_filter(config, Role::Argmap);
        let pair = PairFilters::new(argmap_filter.clone(), arganno_filter.clone());
        pipeline(
            self.name(),
            vec![
                Box::new(default_processing()),
                Box::new(HasAnnotationsHandler::new(arganno_filter.clone())),
                Box::new(HasArgdownHandler::new(argmap_filter.clone())),
                Box::new(arganno_composite(arganno_filter)),
                Box::new(argmap_composite(argmap_filter)),
                Box::new(arganno_argmap_coherence(pair)),
            ],
            build_scorers(self.name(), ARGANNO_ARGMAP_SCORERS, config),
        )
    }
}

pub struct ArgannoInfrecoBuilder;

const ARGANNO_INFRECO_SCORERS: &[(&str, ScorerKind)] = &[
    (
        "annotation_infreco_semantic_coherence_scorer",
        ScorerKind::SemanticCoherence,
    ),
    ("annotation_infreco_coverage_scorer", ScorerKind::Coverage),
    ("annotation_infreco_density_scorer", ScorerKind::AnnotationDensity),
    ("annotation_infreco_scope_scorer", ScorerKind::Scope),
];

impl VerifierBuilder for ArgannoInfrecoBuilder {
    fn name(&self) -> &str {
        "arganno_infreco"
    }

    fn description(&self) -> &str {
        "Checks coherence between argumentative annotations and informal argument reconstructions"
    }

    fn input_types(&self) -> Vec<Dtype> {
        vec![Dtype::Xml, Dtype::Argdown]
    }

    fn allowed_filter_roles(&self) -> Vec<Role> {
        vec![Role::Arganno, Role::Infreco]
    }

    fn is_coherence_verifier(&self) -> bool {
        true
    }

    fn declared_options(&self) -> Vec<ConfigOption> {
        vec![from_key_option()]
    }

    fn scorer_ids(&self) -> Vec<&'static str> {
        ARGANNO_INFRECO_SCORERS.iter().map(|(id, _)| *id).collect()
    }

    fn build(&self, config: &VerifierConfig) -> ScoringPipeline {
        let arganno_filter = role_filter(config, Role::Arganno);
        let infreco_filter = role_filter(config, Role::Infreco);
        let pair = PairFilters::new(infreco_filter.clone(), arganno_filter.clone());
        pipeline(
            self.name(),
            vec![
                Box::new(default_processing()),
                Box::new(HasAnnotationsHandler::new(arganno_filter.clone())),
                Box::new(HasArgdownHandler::new(infreco_filter.clone())),
                Box::new(arganno_composite(arganno_filter)),
                Box::new(coherence_infreco(infreco_filter, &config.from_key)),
                Box::new(arganno_infreco_coherence(pair, &config.from_key)),
            ],
            build_scorers(self.name(), ARGANNO_INFRECO_SCORERS, config),
        )
    }
}

pub struct ArgannoLogrecoBuilder;

const ARGANNO_LOGRECO_SCORERS: &[(&str, ScorerKind)] = &[
    (
        "annotation_logreco_semantic_coherence_scorer",
        ScorerKind::SemanticCoherence,
    ),
    ("annotation_logreco_coverage_scorer", ScorerKind::Coverage),
    ("annotation_logreco_density_scorer", ScorerKind::AnnotationDensity),
    ("annotation_logreco_scope_scorer", ScorerKind::Scope),
    (
        "annotation_logreco_formalizations_faithfulness_scorer",
        ScorerKind::FormalizationsFaithfulness,
    ),
    (
        "annotation_logreco_predicate_logic_scorer",
        ScorerKind::PredicateLogic,
    ),
    ("annotation_logreco_triviality_scorer", ScorerKind::Triviality),
];

impl VerifierBuilder for ArgannoLogrecoBuilder {
    fn name(&self) -> &str {
        "arganno_logreco"
    }

    fn description(&self) -> &str {
        "Checks coherence between argumentative annotations and logical argument reconstructions"
    }

    fn input_types(&self) -> Vec<Dtype> {
        vec![Dtype::Xml, Dtype::Argdown]
    }

    fn allowed_filter_roles(&self) -> Vec<Role> {
        vec![Role::Arganno, Role::Logreco]
    }

    fn is_coherence_verifier(&self) -> bool {
        true
    }

    fn declared_options(&self) -> Vec<ConfigOption> {
        vec![
            from_key_option(),
            formalization_key_option(),
            declarations_key_option(),
        ]
    }

    fn scorer_ids(&self) -> Vec<&'static str> {
        ARGANNO_LOGRECO_SCORERS.iter().map(|(id, _)| *id).collect()
    }

    fn build(&self, config: &VerifierConfig) -> ScoringPipeline {
        let arganno_filter = role_filter(config, Role::Arganno);
        let logreco_filter = role_filter(config, Role::Logreco);
        let pair = PairFilters::new(logreco_filter.clone(), arganno_filter.clone());
        pipeline(
            self.name(),
            vec![
                Box::new(default_processing()),
                Box::new(HasAnnotationsHandler::new(arganno_filter.clone())),
                Box::new(HasArgdownHandler::new(logreco_filter.clone())),
                Box::new(arganno_composite(arganno_filter)),
                Box::new(coherence_infreco(logreco_filter.clone(), &config.from_key)),
                Box::new(logreco_composite(
                    logreco_filter,
                    &config.from_key,
                    &config.formalization_key,
                    &config.declarations_key,
                )),
                Box::new(arganno_logreco_coherence(pair, &config.from_key)),
            ],
            build_scorers(self.name(), ARGANNO_LOGRECO_SCORERS, config),
        )
    }
}

pub struct ArgmapInfrecoBuilder;

impl VerifierBuilder for ArgmapInfrecoBuilder {
    fn name(&self) -> &str {
        "argmap_infreco"
    }

    fn description(&self) -> &str {
        "Checks coherence between argument maps and informal argument reconstructions"
    }

    fn input_types(&self) -> Vec<Dtype> {
        vec![Dtype::Argdown]
    }

    fn allowed_filter_roles(&self) -> Vec<Role> {
        vec![Role::Argmap, Role::Infreco]
    }

    fn is_coherence_verifier(&self) -> bool {
        true
    }

    fn declared_options(&self) -> Vec<ConfigOption> {
        vec![from_key_option()]
    }

    fn build(&self, config: &VerifierConfig) -> ScoringPipeline {
        let argmap_filter = role_filter_or_default(config, Role::Argmap, "map.*");
        let infreco_filter = role_filter_or_default(config, Role::Infreco, "reconstruction.*");
        let pair = PairFilters::new(Some(argmap_filter.clone()), Some(infreco_filter.clone()));
        pipeline(
            self.name(),
            vec![
                Box::new(FencedCodeBlockExtractor::new()),
                Box::new(ArgdownParserHandler::new()),
                Box::new(HasArgdownHandler::with_name(
                    "HasArgdownHandler.map",
                    Some(argmap_filter.clone()),
                )),
                Box::new(HasArgdownHandler::with_name(
                    "HasArgdownHandler.reco",
                    Some(infreco_filter.clone()),
                )),
                Box::new(argmap_composite(Some(argmap_filter))),
                Box::new(coherence_infreco(Some(infreco_filter), &config.from_key)),
                Box::new(argmap_infreco_coherence(pair)),
            ],
            Vec::new(),
        )
    }
}

pub struct ArgmapLogrecoBuilder;

impl VerifierBuilder for ArgmapLogrecoBuilder {
    fn name(&self) -> &str {
        "argmap_logreco"
    }

    fn description(&self) -> &str {
        "Checks coherence between argument maps and logical argument reconstructions"
    }

    fn input_types(&self) -> Vec<Dtype> {
        vec![Dtype::Argdown]
    }

    fn allowed_filter_roles(&self) -> Vec<Role> {
        vec![Role::Argmap, Role::Logreco]
    }

    fn is_coherence_verifier(&self) -> bool {
        true
    }

    fn declared_options(&self) -> Vec<ConfigOption> {
        vec![
            from_key_option(),
            formalization_key_option(),
            declarations_key_option(),
        ]
    }

    fn build(&self, config: &VerifierConfig) -> ScoringPipeline {
        let argmap_filter = role_filter_or_default(config, Role::Argmap, "map.*");
        let logreco_filter = role_filter_or_default(config, Role::Logreco, "reconstruction.*");
        let pair = PairFilters::new(Some(argmap_filter.clone()), Some(logreco_filter.clone()));
        pipeline(
            self.name(),
            vec![
                Box::new(FencedCodeBlockExtractor::new()),
                Box::new(ArgdownParserHandler::new()),
                Box::new(HasArgdownHandler::with_name(
                    "HasArgdownHandler.map",
                    Some(argmap_filter.clone()),
                )),
                Box::new(HasArgdownHandler::with_name(
                    "HasArgdownHandler.reco",
                    Some(logreco_filter.clone()),
                )),
                Box::new(argmap_composite(Some(argmap_filter))),
                Box::new(logreco_infreco(Some(logreco_filter.clone()), &config.from_key)),
                Box::new(logreco_composite(
                    Some(logreco_filter),
                    &config.from_key,
                    &config.formalization_key,
                    &config.declarations_key,
                )),
                Box::new(argmap_logreco_coherence(pair)),
            ],
            Vec::new(),
        )
    }
}

pub struct ArgannoArgmapLogrecoBuilder;

impl VerifierBuilder for ArgannoArgmapLogrecoBuilder {
    fn name(&self) -> &str {
        "arganno_argmap_logreco"
    }

    fn description(&self) -> &str {
        "Checks mutual coherence of annotations, argument maps, and logical reconstructions"
    }

    fn input_types(&self) -> Vec<Dtype> {
        vec![Dtype::Xml, Dtype::Argdown]
    }

    fn allowed_filter_roles(&self) -> Vec<Role> {
        vec![Role::Arganno, Role::Argmap, Role::Logreco]
    }

    fn is_coherence_verifier(&self) -> bool {
        true
    }

    fn declared_options(&self) -> Vec<ConfigOption> {
        vec![
            from_key_option(),
            formalization_key_option(),
            declarations_key_option(),
        ]
    }

    fn build(&self, config: &VerifierConfig) -> ScoringPipeline {
        let arganno_filter = role_filter(config, Role::Arganno);
        let argmap_filter = role_filter_or_default(config, Role::Argmap, "map.*");
        let logreco_filter = role_filter_or_default(config, Role::Logreco, "reconstruction.*");
        let anno_map_pair =
            PairFilters::new(Some(argmap_filter.clone()), arganno_filter.clone());
        let map_reco_pair =
            PairFilters::new(Some(argmap_filter.clone()), Some(logreco_filter.clone()));
        pipeline(
            self.name(),
            vec![
                Box::new(default_processing()),
                Box::new(HasAnnotationsHandler::new(arganno_filter.clone())),
                Box::new(HasArgdownHandler::with_name(
                    "HasArgdownHandler.map",
                    Some(argmap_filter.clone()),
                )),
                Box::new(HasArgdownHandler::with_name(
                    "HasArgdownHandler.reco",
                    Some(logreco_filter.clone()),
                )),
                Box::new(arganno_composite(arganno_filter)),
                Box::new(argmap_composite(Some(argmap_filter))),
                Box::new(logreco_infreco(Some(logreco_filter.clone()), &config.from_key)),
                Box::new(logreco_composite(
                    Some(logreco_filter),
                    &config.from_key,
                    &config.formalization_key,
                    &config.declarations_key,
                )),
                Box::new(arganno_argmap_coherence(anno_map_pair)),
                Box::new(argmap_logreco_coherence(map_reco_pair)),
            ],
            Vec::new(),
        )
    }
}

/// Every registered verifier, in registry order.
pub fn all_builders() -> Vec<Box<dyn VerifierBuilder>> {
    vec![
        Box::new(ArgannoBuilder),
        Box::new(ArgmapBuilder),
        Box::new(InfrecoBuilder),
        Box::new(LogrecoBuilder),
        Box::new(HasAnnotationsBuilder),
        Box::new(HasArgdownBuilder),
        Box::new(ArgannoArgmapBuilder),
        Box::new(ArgannoInfrecoBuilder),
        Box::new(ArgannoLogrecoBuilder),
        Box::new(ArgmapInfrecoBuilder),
        Box::new(ArgmapLogrecoBuilder),
        Box::new(ArgannoArgmapLogrecoBuilder),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use veridown_verify::VerificationRequest;

    fn run(builder: &dyn VerifierBuilder, inputs: &str) -> VerificationRequest {
        let config = VerifierConfig::default();
        let root = builder.build(&config);
        let mut request = VerificationRequest::new(inputs, None);
        root.process(&mut request);
        request
    }

    #[test]
    fn argmap_pipeline_order_matches_builder() {
        let request = run(&ArgmapBuilder, "```argdown\n[C]: Claim.\n  <+ <A>: Because.\n```\n");
        assert!(request.is_valid(), "{:#?}", request.results);
        assert_eq!(
            request.executed_handlers,
            vec![
                "argmap_pipeline".to_string(),
                "FencedCodeBlockExtractor".to_string(),
                "ArgdownParser".to_string(),
                "HasArgdownHandler".to_string(),
                "ArgMapCompositeHandler".to_string(),
                "ArgMap.CompleteClaimsHandler".to_string(),
                "ArgMap.NoDuplicateLabelsHandler".to_string(),
                "ArgMap.NoPCSHandler".to_string(),
            ]
        );
    }

    #[test]
    fn infreco_pipeline_omits_uses_all_props() {
        let request = run(
            &InfrecoBuilder,
            "```argdown\n<A>: Gist.\n\n(1) One.\n-- {from: ['1']} --\n(2) Two.\n```\n",
        );
        assert!(request.is_valid(), "{:#?}", request.results);
        assert!(!request
            .executed_handlers
            .contains(&"InfReco.UsesAllPropsHandler".to_string()));
        assert!(request
            .executed_handlers
            .contains(&"InfReco.HasGistHandler".to_string()));
    }

    #[test]
    fn scorers_only_activate_when_enabled() {
        let raw = serde_json::json!({ "enable_argmap_size_scorer": true });
        let config = VerifierConfig::from_map(raw.as_object().unwrap()).unwrap();
        let root = ArgmapBuilder.build(&config);
        assert_eq!(root.scorers().len(), 1);
        assert_eq!(root.scorers()[0].scorer_id(), "argmap_size_scorer");

        let default_root = ArgmapBuilder.build(&VerifierConfig::default());
        assert!(default_root.scorers().is_empty());
    }

    #[test]
    fn argmap_infreco_uses_default_filename_filters() {
        let inputs = "```argdown {filename=\"map.ad\"}\n[C]: Claim.\n  <+ <A>: Because.\n```\n```argdown {filename=\"reconstructions.ad\"}\n<A>: Because.\n\n(1) Reason.\n-- {from: ['1']} --\n(2) [C]: Claim.\n```\n";
        let request = run(&ArgmapInfrecoBuilder, inputs);
        assert!(request.is_valid(), "{:#?}", request.results);
        assert!(request
            .executed_handlers
            .contains(&"ArgmapInfrecoElemCohereHandler".to_string()));
        // the map item must not be pulled into the reconstruction checks
        let no_pcs = request
            .results
            .iter()
            .find(|r| r.verifier_id == "ArgMap.NoPCSHandler")
            .unwrap();
        assert_eq!(no_pcs.verification_data_references, vec!["argdown_0".to_string()]);
    }

    #[test]
    fn logreco_builder_wires_prover_checks() {
        let inputs = "```argdown\n<A>: Modus ponens.\n\n(1) It rains. {formalization: \"p\", declarations: {p: \"it rains\"}}\n(2) Rain wets. {formalization: \"p -> q\", declarations: {q: \"the street is wet\"}}\n-- {from: ['1', '2']} --\n(3) The street is wet. {formalization: \"q\"}\n```\n";
        let request = run(&LogrecoBuilder, inputs);
        assert!(request.is_valid(), "{:#?}", request.results);
        assert!(request
            .executed_handlers
            .contains(&"LogReco.DeductiveValidityHandler".to_string()));
    }
}
