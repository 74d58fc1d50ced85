use ns_core::{ErrorInfo, NsError};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("walker", 3)
        .with_context("reason", "example")
}

#[test]
fn contract_error_surface() {
    let err = NsError::Contract(sample_info("walker-busy", "proposal in flight"));
    assert!(err.is_contract());
    assert_eq!(err.info().code, "walker-busy");
    assert_eq!(err.info().context.get("walker").map(String::as_str), Some("3"));
}

#[test]
fn contract_shorthand_matches_variant() {
    let err = NsError::contract("index-length", "lengths differ");
    assert_eq!(
        err,
        NsError::Contract(ErrorInfo::new("index-length", "lengths differ"))
    );
}

#[test]
fn non_contract_families_are_distinguished() {
    for err in [
        NsError::Problem(sample_info("invalid-bounds", "low >= high")),
        NsError::Likelihood(sample_info("invalid-order", "not a node")),
        NsError::Config(sample_info("max-trials", "zero trials")),
        NsError::Serde(sample_info("metrics-write", "disk full")),
    ] {
        assert!(!err.is_contract());
        assert!(err.info().context.contains_key("reason"));
    }
}

#[test]
fn display_carries_code_context_and_hint() {
    let err = NsError::Config(
        ErrorInfo::new("max-trials", "max_trials must be at least 1")
            .with_context("path", "engine.yaml")
            .with_hint("the default is 5"),
    );
    let text = err.to_string();
    assert!(text.starts_with("config error:"));
    assert!(text.contains("max-trials"));
    assert!(text.contains("engine.yaml"));
    assert!(text.contains("the default is 5"));
}

#[test]
fn errors_serialize_with_family_tag() {
    let err = NsError::Likelihood(ErrorInfo::new("tour-revisit", "tour visits a node twice"));
    let json = serde_json::to_value(&err).expect("serialize");
    assert_eq!(json["family"], "Likelihood");
    assert_eq!(json["detail"]["code"], "tour-revisit");

    let back: NsError = serde_json::from_value(json).expect("deserialize");
    assert_eq!(back, err);
}
