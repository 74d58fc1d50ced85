use ns_core::{
    order_indices, DistanceMetric, ErrorDistribution, NsError, Problem, SalesmanProblem,
    TourLength,
};

fn unit_square() -> SalesmanProblem {
    SalesmanProblem::new(
        vec![
            vec![0.0, 0.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
            vec![0.0, 1.0],
        ],
        None,
        DistanceMetric::Euclidean,
        None,
    )
    .unwrap()
}

#[test]
fn scale_defaults_to_the_minimum_distance() {
    let problem = SalesmanProblem::new(
        vec![vec![0.0], vec![2.0], vec![7.0]],
        None,
        DistanceMetric::Manhattan,
        None,
    )
    .unwrap();
    assert_eq!(problem.scale(), 2.0);
    assert_eq!(problem.npars(), 3);
    assert!(problem.is_order_problem());
    assert!(problem.prior(0).is_none());
}

#[test]
fn coincident_nodes_fall_back_to_unit_scale() {
    let problem = SalesmanProblem::new(
        vec![vec![1.0, 1.0], vec![1.0, 1.0], vec![3.0, 1.0]],
        None,
        DistanceMetric::Euclidean,
        None,
    )
    .unwrap();
    assert_eq!(problem.scale(), 1.0);
}

#[test]
fn spherical_distance_is_great_circle_angle() {
    let problem = SalesmanProblem::new(
        vec![vec![0.0, 0.0], vec![90.0, 0.0], vec![0.0, 90.0]],
        None,
        DistanceMetric::Spherical,
        Some(1.0),
    )
    .unwrap();
    let quarter = std::f64::consts::FRAC_PI_2;
    assert!((problem.distance(0, 1).unwrap() - quarter).abs() < 1e-12);
    assert!((problem.distance(1, 2).unwrap() - quarter).abs() < 1e-12);
}

#[test]
fn invalid_definitions_are_problem_errors() {
    let ragged = SalesmanProblem::new(
        vec![vec![0.0, 0.0], vec![1.0]],
        None,
        DistanceMetric::Euclidean,
        None,
    );
    assert!(matches!(ragged, Err(NsError::Problem(_))));

    let weights = SalesmanProblem::new(
        vec![vec![0.0], vec![1.0]],
        Some(vec![1.0]),
        DistanceMetric::Manhattan,
        None,
    );
    assert_eq!(weights.unwrap_err().info().code, "weight-length");

    let sphere = SalesmanProblem::new(
        vec![vec![0.0, 0.0, 0.0]],
        None,
        DistanceMetric::Spherical,
        None,
    );
    assert_eq!(sphere.unwrap_err().info().code, "unsupported-metric");
}

#[test]
fn legs_close_the_tour_and_apply_weights() {
    let problem = SalesmanProblem::new(
        vec![vec![0.0], vec![1.0], vec![3.0]],
        Some(vec![1.0, 2.0, 0.5]),
        DistanceMetric::Manhattan,
        Some(1.0),
    )
    .unwrap();
    let legs = problem.leg_lengths(&[0, 1, 2]).unwrap();
    assert_eq!(legs, vec![1.0, 4.0, 1.5]);
}

#[test]
fn tour_length_prefers_the_perimeter() {
    let problem = unit_square();
    let likelihood = TourLength::new(problem.clone());
    let perimeter = likelihood
        .log_likelihood(&problem, &[0.0, 1.0, 2.0, 3.0])
        .unwrap();
    let crossed = likelihood
        .log_likelihood(&problem, &[0.0, 2.0, 1.0, 3.0])
        .unwrap();
    assert!((perimeter + 4.0).abs() < 1e-12);
    assert!(crossed < perimeter);
}

#[test]
fn tour_length_rejects_invalid_tours() {
    let problem = unit_square();
    let likelihood = TourLength::new(problem.clone());

    let revisit = likelihood.log_likelihood(&problem, &[0.0, 1.0, 1.0, 3.0]);
    assert_eq!(revisit.unwrap_err().info().code, "tour-revisit");

    let short = likelihood.log_likelihood(&problem, &[0.0, 1.0, 2.0]);
    assert_eq!(short.unwrap_err().info().code, "tour-length");

    let fractional = likelihood.log_likelihood(&problem, &[0.0, 1.5, 2.0, 3.0]);
    assert_eq!(fractional.unwrap_err().info().code, "invalid-order");
}

#[test]
fn order_indices_accepts_integral_entries_only() {
    assert_eq!(order_indices(&[2.0, 0.0, 1.0], 3).unwrap(), vec![2, 0, 1]);
    assert!(order_indices(&[3.0], 3).is_err());
    assert!(order_indices(&[-1.0], 3).is_err());
    assert!(order_indices(&[f64::NAN], 3).is_err());
}
