use ns_core::{ParameterProblem, Prior, Problem};
use proptest::prelude::*;

proptest! {
    #[test]
    fn uniform_unit_mapping_inverts(low in -100.0f64..100.0, width in 0.01f64..50.0, unit in 0.0f64..=1.0) {
        let prior = Prior::uniform(low, low + width).unwrap();
        let value = prior.unit_to_domain(unit);
        prop_assert!(value >= low && value <= low + width);
        prop_assert!((prior.domain_to_unit(value) - unit).abs() < 1e-9);
    }

    #[test]
    fn log_uniform_unit_mapping_inverts(low in 1e-3f64..10.0, ratio in 1.5f64..1e4, unit in 0.0f64..=1.0) {
        let prior = Prior::log_uniform(low, low * ratio).unwrap();
        let value = prior.unit_to_domain(unit);
        prop_assert!(value >= low && value <= low * ratio);
        prop_assert!((prior.domain_to_unit(value) - unit).abs() < 1e-9);
    }

    #[test]
    fn uniform_domain_values_map_back(low in -100.0f64..100.0, width in 0.01f64..50.0, frac in 0.0f64..=1.0) {
        let prior = Prior::uniform(low, low + width).unwrap();
        let value = low + frac * width;
        let back = prior.unit_to_domain(prior.domain_to_unit(value));
        prop_assert!((back - value).abs() <= 1e-9 * value.abs().max(1.0));
    }

    #[test]
    fn log_uniform_domain_values_map_back(low in 1e-3f64..10.0, ratio in 1.5f64..1e5, frac in 0.0f64..=1.0) {
        let prior = Prior::log_uniform(low, low * ratio).unwrap();
        let value = (low * ratio.powf(frac)).clamp(low, low * ratio);
        let back = prior.unit_to_domain(prior.domain_to_unit(value));
        prop_assert!((back - value).abs() <= 1e-9 * value);
    }
}

#[test]
fn out_of_bounds_values_clamp_to_the_unit_interval() {
    let prior = Prior::uniform(-1.0, 1.0).unwrap();
    assert_eq!(prior.domain_to_unit(-5.0), 0.0);
    assert_eq!(prior.domain_to_unit(5.0), 1.0);
    assert_eq!(prior.unit_to_domain(1.5), 1.0);
}

#[test]
fn log_uniform_midpoint_is_geometric_mean() {
    let prior = Prior::log_uniform(1.0, 100.0).unwrap();
    assert!((prior.unit_to_domain(0.5) - 10.0).abs() < 1e-9);
}

#[test]
fn invalid_bounds_are_problem_errors() {
    for err in [
        Prior::uniform(1.0, 1.0).unwrap_err(),
        Prior::uniform(f64::NAN, 1.0).unwrap_err(),
        Prior::log_uniform(0.0, 1.0).unwrap_err(),
    ] {
        assert!(matches!(err, ns_core::NsError::Problem(_)));
        assert_eq!(err.info().code, "invalid-bounds");
    }
}

#[test]
fn parameter_problem_reports_offending_prior() {
    let err = ParameterProblem::new(vec![
        Prior::Uniform { low: 0.0, high: 1.0 },
        Prior::LogUniform { low: -1.0, high: 1.0 },
    ])
    .unwrap_err();
    assert_eq!(err.info().context.get("parameter").map(String::as_str), Some("1"));
}

#[test]
fn parameter_problem_exposes_priors() {
    let problem = ParameterProblem::uniform(3, 0.0, 2.0).unwrap();
    assert_eq!(problem.npars(), 3);
    assert_eq!(problem.prior(2), Some(&Prior::Uniform { low: 0.0, high: 2.0 }));
    assert_eq!(problem.prior(3), None);
    assert!(!problem.is_order_problem());
    assert!(problem.node_distance(0, 1).is_none());
}

#[test]
fn priors_serialize_with_type_tag() {
    let prior = Prior::log_uniform(0.5, 8.0).unwrap();
    let json = serde_json::to_string(&prior).unwrap();
    assert!(json.contains("\"type\":\"log-uniform\""));
    let back: Prior = serde_json::from_str(&json).unwrap();
    assert_eq!(back, prior);
}
