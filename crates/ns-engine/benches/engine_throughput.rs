use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use ns_core::{
    DistanceMetric, ErrorDistribution, FnLikelihood, ParameterProblem, Problem, SalesmanProblem,
    TourLength, Walker, WalkerList,
};
use ns_engine::{run_round, EngineConfig, ShuffleMove, StepMove};

fn step_population() -> (Arc<WalkerList>, Arc<dyn ErrorDistribution>) {
    let problem: Arc<dyn Problem> = Arc::new(ParameterProblem::uniform(8, -5.0, 5.0).unwrap());
    let errdis: Arc<dyn ErrorDistribution> = Arc::new(FnLikelihood::new(|params: &[f64]| {
        -0.5 * params.iter().map(|x| x * x).sum::<f64>()
    }));
    let walkers = (0..64)
        .map(|id| {
            let allpars = vec![(id % 9) as f64 - 4.0; 8];
            let logl = errdis.log_likelihood(problem.as_ref(), &allpars).unwrap();
            Walker::new(id, Arc::clone(&problem), allpars, (0..8).collect(), logl).unwrap()
        })
        .collect();
    (Arc::new(WalkerList::from_walkers(walkers).unwrap()), errdis)
}

fn tour_population() -> (Arc<WalkerList>, Arc<dyn ErrorDistribution>) {
    let nodes = (0..40)
        .map(|k| vec![(k * 7 % 40) as f64, (k * 13 % 40) as f64])
        .collect();
    let problem = SalesmanProblem::new(nodes, None, DistanceMetric::Euclidean, None).unwrap();
    let errdis: Arc<dyn ErrorDistribution> = Arc::new(TourLength::new(problem.clone()));
    let shared: Arc<dyn Problem> = Arc::new(problem);
    let order: Vec<f64> = (0..40).map(f64::from).collect();
    let logl = errdis.log_likelihood(shared.as_ref(), &order).unwrap();
    let walkers = (0..32)
        .map(|id| {
            Walker::new(id, Arc::clone(&shared), order.clone(), (0..40).collect(), logl).unwrap()
        })
        .collect();
    (Arc::new(WalkerList::from_walkers(walkers).unwrap()), errdis)
}

fn bench_step_round(c: &mut Criterion) {
    let (population, errdis) = step_population();
    let mut engine = StepMove::new(population, errdis, &EngineConfig::default()).unwrap();
    let ids: Vec<usize> = (0..64).collect();

    c.bench_function("step_round_parallel", |b| {
        b.iter(|| {
            let _ = run_round(&mut engine, &ids, -40.0, true).unwrap();
        })
    });
}

fn bench_shuffle_round(c: &mut Criterion) {
    let (population, errdis) = tour_population();
    let mut engine = ShuffleMove::new(population, errdis, &EngineConfig::default()).unwrap();
    let ids: Vec<usize> = (0..32).collect();

    c.bench_function("shuffle_round_sequential", |b| {
        b.iter(|| {
            let _ = run_round(&mut engine, &ids, f64::NEG_INFINITY, false).unwrap();
        })
    });
}

criterion_group!(benches, bench_step_round, bench_shuffle_round);
criterion_main!(benches);
