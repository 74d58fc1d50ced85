use std::sync::Arc;

use ns_core::{
    ErrorDistribution, FnLikelihood, ParameterProblem, Population, Problem, Walker, WalkerList,
};
use ns_engine::{
    run_configured_round, run_round, Engine, EngineConfig, EngineKind, MoveEngine, RoundConfig,
    StepMove,
};

fn gaussian() -> Arc<dyn ErrorDistribution> {
    Arc::new(FnLikelihood::new(|params: &[f64]| {
        -0.5 * params.iter().map(|x| (x - 0.3).powi(2) / 0.01).sum::<f64>()
    }))
}

fn population(walkers: usize) -> Arc<WalkerList> {
    let problem: Arc<dyn Problem> = Arc::new(ParameterProblem::uniform(3, 0.0, 1.0).unwrap());
    let errdis = gaussian();
    let walkers = (0..walkers)
        .map(|id| {
            let x = (id as f64 + 0.5) / walkers as f64;
            let allpars = vec![x, 1.0 - x, 0.5];
            let logl = errdis.log_likelihood(problem.as_ref(), &allpars).unwrap();
            Walker::new(id, Arc::clone(&problem), allpars, vec![0, 1, 2], logl).unwrap()
        })
        .collect();
    Arc::new(WalkerList::from_walkers(walkers).unwrap())
}

fn config(seed: u64) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.seed_policy.master_seed = seed;
    config
}

#[test]
fn parallel_and_sequential_rounds_agree() {
    let ids: Vec<usize> = (0..16).collect();
    let floor = -20.0;

    let serial_population = population(16);
    let mut serial = StepMove::new(serial_population.clone(), gaussian(), &config(99)).unwrap();
    let serial_summary = run_round(&mut serial, &ids, floor, false).unwrap();

    let parallel_population = population(16);
    let mut parallel =
        StepMove::new(parallel_population.clone(), gaussian(), &config(99)).unwrap();
    let parallel_summary = run_round(&mut parallel, &ids, floor, true).unwrap();

    assert_eq!(serial_summary, parallel_summary);
    for (a, b) in serial_population
        .snapshot()
        .iter()
        .zip(parallel_population.snapshot())
    {
        assert_eq!(a.allpars(), b.allpars());
        assert_eq!(a.log_likelihood(), b.log_likelihood());
    }
}

#[test]
fn round_counters_are_merged_into_the_engine() {
    let walkers = population(8);
    let mut engine = StepMove::new(walkers.clone(), gaussian(), &config(3)).unwrap();
    let ids = [0, 2, 4, 6];

    let summary = run_round(&mut engine, &ids, f64::NEG_INFINITY, true).unwrap();

    assert_eq!(summary.engine, "step");
    assert_eq!(summary.moved, vec![3; 4]);
    assert_eq!(summary.accepted(), 4);
    assert_eq!(summary.counters.calls, 4);
    assert_eq!(engine.counters(), summary.counters);

    run_round(&mut engine, &[1, 3], f64::NEG_INFINITY, false).unwrap();
    assert_eq!(engine.counters().calls, 6);
    for id in 0..8 {
        assert!(walkers.get(id).unwrap().log_likelihood().is_finite());
    }
}

#[test]
fn duplicate_walkers_are_refused_before_any_move() {
    let walkers = population(4);
    let before = walkers.snapshot();
    let mut engine = StepMove::new(walkers.clone(), gaussian(), &config(3)).unwrap();

    let err = run_round(&mut engine, &[0, 1, 0], f64::NEG_INFINITY, true).unwrap_err();
    assert!(err.is_contract());
    assert_eq!(err.info().code, "duplicate-walker");
    assert_eq!(engine.counters().calls, 0);
    for (a, b) in before.iter().zip(walkers.snapshot()) {
        assert_eq!(a.allpars(), b.allpars());
    }
}

#[test]
fn unknown_walker_fails_the_round() {
    let walkers = population(2);
    let mut engine = StepMove::new(walkers, gaussian(), &config(3)).unwrap();
    let err = run_round(&mut engine, &[0, 5], f64::NEG_INFINITY, false).unwrap_err();
    assert_eq!(err.info().code, "unknown-walker");
}

#[test]
fn copies_get_distinct_reproducible_streams() {
    let walkers = population(2);
    let first = StepMove::new(walkers.clone(), gaussian(), &config(42)).unwrap();
    let second = StepMove::new(walkers, gaussian(), &config(42)).unwrap();

    let seeds_a: Vec<u64> = (0..4).map(|_| first.copy().core().seed()).collect();
    let seeds_b: Vec<u64> = (0..4).map(|_| second.copy().core().seed()).collect();

    assert_eq!(seeds_a, seeds_b);
    let mut unique = seeds_a.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), 4);
    assert!(!seeds_a.contains(&first.core().seed()));
}

#[test]
fn copies_share_the_population() {
    let walkers = population(2);
    let engine = StepMove::new(walkers.clone(), gaussian(), &config(42)).unwrap();
    let mut copy = engine.copy();
    assert_eq!(copy.execute(1, f64::NEG_INFINITY).unwrap(), 3);
    assert_eq!(copy.counters().calls, 1);
    assert_eq!(engine.counters().calls, 0);
    assert_ne!(walkers.get(1).unwrap().allpars(), &[0.75, 0.25, 0.5]);
}

#[test]
fn move_engine_dispatches_by_kind() {
    let walkers = population(2);
    for kind in [
        EngineKind::Step,
        EngineKind::Shuffle,
        EngineKind::Near,
        EngineKind::Start,
        EngineKind::StartOrder,
    ] {
        let engine = MoveEngine::build(kind, walkers.clone(), gaussian(), &config(1)).unwrap();
        assert_eq!(engine.kind(), kind);
        assert_eq!(engine.name(), kind.as_str());
        assert_eq!(engine.copy().kind(), kind);
    }
}

#[test]
fn configured_round_runs_the_requested_engine() {
    let walkers = population(6);
    let round: RoundConfig = serde_yaml::from_str(
        "engine: start\nconfig:\n  max_trials: 3\n  seed_policy:\n    master_seed: 7\nparallel: false\n",
    )
    .unwrap();

    let (engine, summary) =
        run_configured_round(&round, walkers.clone(), gaussian(), &[0, 1, 2], f64::NEG_INFINITY)
            .unwrap();

    assert_eq!(engine.kind(), EngineKind::Start);
    assert_eq!(engine.core().max_trials(), 3);
    assert_eq!(summary.engine, "start");
    assert_eq!(summary.moved, vec![3, 3, 3]);
    assert_eq!(engine.counters().successes, 3);
}
