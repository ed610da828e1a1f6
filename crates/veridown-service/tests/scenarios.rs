//! End-to-end scenarios exercising dispatch, the registry, and the full
//! check pipelines.

use veridown_service::{DispatchOptions, Dispatcher};
use veridown_types::{VerificationError, VerifyRequest};

fn dispatcher() -> Dispatcher {
    Dispatcher::new(DispatchOptions::default())
}

#[test]
fn empty_input_falls_back_to_argdown_item() {
    let outcome = dispatcher()
        .verify_sync("arganno", &VerifyRequest::new(""))
        .unwrap();
    let response = outcome.response;

    assert_eq!(response.verifier, "arganno");
    assert!(!response.is_valid);
    assert_eq!(response.verification_data.len(), 1);
    assert_eq!(response.verification_data[0].id, "input_0");
    assert_eq!(response.verification_data[0].dtype, veridown_types::Dtype::Argdown);
    let failing: Vec<_> = response.results.iter().filter(|r| !r.is_valid).collect();
    assert!(failing
        .iter()
        .any(|r| r.message.as_deref().unwrap_or("").contains("No fenced xml block")));
}

#[test]
fn single_valid_map_passes_argmap() {
    let inputs = "```argdown\n[C]: Claim.\n  <+ <A>: Because.\n```\n";
    let outcome = dispatcher()
        .verify_sync("argmap", &VerifyRequest::new(inputs))
        .unwrap();
    let response = outcome.response;

    assert!(response.is_valid, "results: {:#?}", response.results);
    assert_eq!(response.verification_data.len(), 1);
    assert_eq!(response.verification_data[0].dtype, veridown_types::Dtype::Argdown);

    let composite_results: Vec<&str> = response
        .results
        .iter()
        .map(|r| r.verifier_id.as_str())
        .collect();
    assert!(composite_results.contains(&"ArgMap.CompleteClaimsHandler"));
    assert!(composite_results.contains(&"ArgMap.NoDuplicateLabelsHandler"));
    assert!(composite_results.contains(&"ArgMap.NoPCSHandler"));

    assert_eq!(
        response.executed_handlers,
        vec![
            "argmap_pipeline",
            "FencedCodeBlockExtractor",
            "ArgdownParser",
            "HasArgdownHandler",
            "ArgMapCompositeHandler",
            "ArgMap.CompleteClaimsHandler",
            "ArgMap.NoDuplicateLabelsHandler",
            "ArgMap.NoPCSHandler",
        ]
    );
}

#[test]
fn coherent_arganno_infreco_pair_is_valid() {
    let inputs = "```xml\n<proposition id=\"i1\" argument_label=\"A\" ref_reco_label=\"2\">P.</proposition>\n```\n```argdown\n<A>\n(1) X {annotation_ids: []}\n-- {from: ['1']} --\n(2) P. {annotation_ids: ['i1']}\n```\n";
    let outcome = dispatcher()
        .verify_sync("arganno_infreco", &VerifyRequest::new(inputs))
        .unwrap();
    let response = outcome.response;

    assert!(response.is_valid, "results: {:#?}", response.results);
    assert_eq!(response.verification_data.len(), 2);
    let ids: Vec<&str> = response
        .verification_data
        .iter()
        .map(|d| d.id.as_str())
        .collect();
    assert_eq!(ids, vec!["xml_0", "argdown_0"]);
    assert!(response
        .executed_handlers
        .contains(&"ArgannoInfrecoElemCohereHandler".to_string()));
    assert!(response
        .executed_handlers
        .contains(&"ArgannoInfrecoRelationCohereHandler".to_string()));
}

#[test]
fn dangling_support_reference_fails_arganno() {
    let inputs = "```xml\n<proposition id=\"a\" supports=\"b\">Something profound.</proposition>\n```\n";
    let outcome = dispatcher()
        .verify_sync("arganno", &VerifyRequest::new(inputs))
        .unwrap();
    let response = outcome.response;

    assert!(!response.is_valid);
    let support_result = response
        .results
        .iter()
        .find(|r| r.verifier_id == "Arganno.SupportReferenceValidityHandler")
        .unwrap();
    assert!(!support_result.is_valid);
    let message = support_result.message.as_deref().unwrap();
    assert!(
        message.contains("Supported proposition with id 'b'"),
        "got: {message}"
    );
    assert!(message.contains("does not exist."));
}

#[test]
fn unknown_config_key_is_a_422_class_error() {
    let mut config = serde_json::Map::new();
    config.insert("bogus".to_string(), serde_json::json!(1));
    let request = VerifyRequest::new("x").with_config(config);
    let err = dispatcher().verify_sync("infreco", &request).unwrap_err();

    assert_eq!(err.http_status(), 422);
    let body = err.to_body();
    assert_eq!(body.error, "invalid_config");
    assert_eq!(
        body.detail.unwrap()["invalid_options"],
        serde_json::json!(["bogus"])
    );
    // the pipeline never started, so no handler could have run
    assert!(matches!(err, VerificationError::InvalidConfig { .. }));
}

#[tokio::test]
async fn async_and_sync_agree_modulo_timing() {
    let inputs = "```argdown\n[C]: Claim.\n  <+ <A>: Because.\n```\n";
    let request = VerifyRequest::new(inputs);
    let dispatcher = dispatcher();

    let sync = dispatcher.verify_sync("argmap", &request).unwrap().response;
    let run = dispatcher.verify_async("argmap", &request).await.unwrap().response;

    assert_eq!(sync.verifier, run.verifier);
    assert_eq!(sync.is_valid, run.is_valid);
    assert_eq!(sync.executed_handlers, run.executed_handlers);
    assert_eq!(sync.results.len(), run.results.len());
    for (a, b) in sync.results.iter().zip(run.results.iter()) {
        assert_eq!(a.verifier_id, b.verifier_id);
        assert_eq!(a.is_valid, b.is_valid);
        assert_eq!(a.message, b.message);
        assert_eq!(a.verification_data_references, b.verification_data_references);
    }
}

#[tokio::test]
async fn async_errors_propagate() {
    let err = dispatcher()
        .verify_async("bogus", &VerifyRequest::new("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, VerificationError::VerifierNotFound { .. }));
}

#[test]
fn executed_handler_names_are_unique_per_run() {
    let inputs = "```xml\n<proposition id=\"i1\" argument_label=\"A\" ref_reco_label=\"2\">P.</proposition>\n```\n```argdown\n<A>\n(1) X {annotation_ids: []}\n-- {from: ['1']} --\n(2) P. {annotation_ids: ['i1']}\n```\n";
    let response = dispatcher()
        .verify_sync("arganno_infreco", &VerifyRequest::new(inputs))
        .unwrap()
        .response;
    for name in &response.executed_handlers {
        let count = response
            .executed_handlers
            .iter()
            .filter(|n| *n == name)
            .count();
        assert_eq!(count, 1, "handler {name} appears {count} times");
    }
}

#[test]
fn overall_validity_follows_individual_results() {
    let inputs = "```argdown\n<A>\n(1) One.\n(2) Two.\n```\n";
    let response = dispatcher()
        .verify_sync("infreco", &VerifyRequest::new(inputs))
        .unwrap()
        .response;
    assert_eq!(
        response.is_valid,
        response.results.iter().all(|r| r.is_valid)
    );
    assert!(!response.is_valid);
}

#[test]
fn scores_are_computed_only_for_valid_requests_and_enabled_scorers() {
    let inputs = "```argdown\n[C]: Root claim.\n  <+ <A>: One.\n  <+ <B>: Two.\n  <- <D>: Three.\n  <+ <E>: Four.\n```\n";

    // no scorers enabled
    let outcome = dispatcher()
        .verify_sync("argmap", &VerifyRequest::new(inputs))
        .unwrap();
    assert!(outcome.response.is_valid);
    assert!(outcome.scores.is_empty());

    // size scorer enabled
    let mut config = serde_json::Map::new();
    config.insert("enable_argmap_size_scorer".to_string(), serde_json::json!(true));
    let outcome = dispatcher()
        .verify_sync("argmap", &VerifyRequest::new(inputs).with_config(config.clone()))
        .unwrap();
    assert_eq!(outcome.scores.len(), 1);
    assert_eq!(outcome.scores[0].id, "argmap.argmap_size_scorer");
    assert!(outcome.scores[0].score > 0.0);

    // invalid request yields no scores even with the scorer enabled
    let invalid_inputs = "```argdown\nUnlabeled claim text.\n```\n";
    let outcome = dispatcher()
        .verify_sync("argmap", &VerifyRequest::new(invalid_inputs).with_config(config))
        .unwrap();
    assert!(!outcome.response.is_valid);
    assert!(outcome.scores.is_empty());
}

#[test]
fn filters_route_items_to_roles() {
    let inputs = "```argdown {filename=\"map.ad\"}\n[C]: Claim.\n  <+ <A>: Because.\n```\n```argdown {filename=\"reconstructions.ad\"}\n<A>: Because.\n\n(1) Reason.\n-- {from: ['1']} --\n(2) [C]: Claim.\n```\n";
    let response = dispatcher()
        .verify_sync("argmap_infreco", &VerifyRequest::new(inputs))
        .unwrap()
        .response;
    assert!(response.is_valid, "results: {:#?}", response.results);

    // explicit filters targeting the same items also pass
    let mut config = serde_json::Map::new();
    config.insert(
        "filters".to_string(),
        serde_json::json!({
            "argmap": [{ "key": "filename", "value": "map.ad", "regex": false }],
            "infreco": [{ "key": "filename", "value": "reconstructions.ad", "regex": false }]
        }),
    );
    let response = dispatcher()
        .verify_sync(
            "argmap_infreco",
            &VerifyRequest::new(inputs).with_config(config),
        )
        .unwrap()
        .response;
    assert!(response.is_valid, "results: {:#?}", response.results);
}

#[test]
fn extractor_round_trip_holds_for_every_item() {
    let inputs = "prose before\n```argdown {filename=\"map.ad\" version=\"v3\"}\n[C]: Claim.\n```\nmiddle\n```xml\n<proposition id=\"a\">text</proposition>\n```\n";
    let response = dispatcher()
        .verify_sync("has_argdown", &VerifyRequest::new(inputs))
        .unwrap()
        .response;
    for item in &response.verification_data {
        assert!(
            inputs.contains(&item.code_snippet),
            "snippet of {} not found verbatim in inputs",
            item.id
        );
    }
    let map_item = &response.verification_data[0];
    assert_eq!(map_item.metadata.get("filename").map(String::as_str), Some("map.ad"));
    assert_eq!(map_item.metadata.get("version").map(String::as_str), Some("v3"));
}

#[test]
fn whitespace_changes_do_not_affect_source_integrity() {
    let source = "First sentence here. Second sentence there.";
    let tight = "```xml\n<proposition id=\"a\">First sentence here.</proposition> Second sentence there.\n```\n";
    let loose = "```xml\n<proposition id=\"a\">First   sentence\n   here.</proposition>   Second\nsentence there.\n```\n";

    let dispatcher = dispatcher();
    for inputs in [tight, loose] {
        let response = dispatcher
            .verify_sync(
                "arganno",
                &VerifyRequest::new(inputs).with_source(source),
            )
            .unwrap()
            .response;
        let integrity = response
            .results
            .iter()
            .find(|r| r.verifier_id == "Arganno.SourceTextIntegrityHandler")
            .unwrap();
        assert!(integrity.is_valid, "inputs {inputs:?}: {integrity:?}");
    }
}
