use std::collections::BTreeSet;
use std::sync::Arc;

use ns_core::{ErrorDistribution, ErrorInfo, NsError, Population};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{EngineConfig, EngineKind, RoundConfig};
use crate::engine::{Engine, EngineCore, EngineCounters};
use crate::moves_order::{NearMove, ShuffleMove};
use crate::moves_start::{StartMove, StartOrderMove};
use crate::moves_step::StepMove;

/// Tagged set of move strategies behind the common [`Engine`] capability.
#[derive(Debug)]
pub enum MoveEngine {
    /// Random step of the free parameters.
    Step(StepMove),
    /// Window shuffle of an order vector.
    Shuffle(ShuffleMove),
    /// Nearest-neighbour insertion in an order vector.
    Near(NearMove),
    /// Fresh draw of the free parameters.
    Start(StartMove),
    /// Fresh permutation of an order vector.
    StartOrder(StartOrderMove),
}

macro_rules! dispatch {
    ($engine:expr, $inner:ident => $body:expr) => {
        match $engine {
            MoveEngine::Step($inner) => $body,
            MoveEngine::Shuffle($inner) => $body,
            MoveEngine::Near($inner) => $body,
            MoveEngine::Start($inner) => $body,
            MoveEngine::StartOrder($inner) => $body,
        }
    };
}

impl MoveEngine {
    /// Builds the engine of the requested kind.
    pub fn build(
        kind: EngineKind,
        population: Arc<dyn Population>,
        errdis: Arc<dyn ErrorDistribution>,
        config: &EngineConfig,
    ) -> Result<Self, NsError> {
        Ok(match kind {
            EngineKind::Step => MoveEngine::Step(StepMove::new(population, errdis, config)?),
            EngineKind::Shuffle => {
                MoveEngine::Shuffle(ShuffleMove::new(population, errdis, config)?)
            }
            EngineKind::Near => MoveEngine::Near(NearMove::new(population, errdis, config)?),
            EngineKind::Start => MoveEngine::Start(StartMove::new(population, errdis, config)?),
            EngineKind::StartOrder => {
                MoveEngine::StartOrder(StartOrderMove::new(population, errdis, config)?)
            }
        })
    }

    /// Kind tag of the wrapped strategy.
    pub fn kind(&self) -> EngineKind {
        match self {
            MoveEngine::Step(_) => EngineKind::Step,
            MoveEngine::Shuffle(_) => EngineKind::Shuffle,
            MoveEngine::Near(_) => EngineKind::Near,
            MoveEngine::Start(_) => EngineKind::Start,
            MoveEngine::StartOrder(_) => EngineKind::StartOrder,
        }
    }
}

impl Engine for MoveEngine {
    fn name(&self) -> &'static str {
        dispatch!(self, engine => engine.name())
    }

    fn execute(&mut self, walker_id: usize, low_log_l: f64) -> Result<usize, NsError> {
        dispatch!(self, engine => engine.execute(walker_id, low_log_l))
    }

    fn copy(&self) -> Self {
        match self {
            MoveEngine::Step(engine) => MoveEngine::Step(engine.copy()),
            MoveEngine::Shuffle(engine) => MoveEngine::Shuffle(engine.copy()),
            MoveEngine::Near(engine) => MoveEngine::Near(engine.copy()),
            MoveEngine::Start(engine) => MoveEngine::Start(engine.copy()),
            MoveEngine::StartOrder(engine) => MoveEngine::StartOrder(engine.copy()),
        }
    }

    fn core(&self) -> &EngineCore {
        dispatch!(self, engine => engine.core())
    }

    fn core_mut(&mut self) -> &mut EngineCore {
        dispatch!(self, engine => engine.core_mut())
    }

    fn calculate_unit_range(&mut self) -> Result<(), NsError> {
        dispatch!(self, engine => engine.calculate_unit_range())
    }
}

/// Result of one fan-out over a set of walkers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundSummary {
    /// Name of the strategy used.
    pub engine: String,
    /// Floor every proposal was tested against.
    pub low_log_likelihood: f64,
    /// Return value of `execute` per walker, in input order.
    pub moved: Vec<usize>,
    /// Counters accumulated by the round alone.
    pub counters: EngineCounters,
}

impl RoundSummary {
    /// Number of walkers that accepted a proposal.
    pub fn accepted(&self) -> usize {
        self.moved.iter().filter(|&&moved| moved > 0).count()
    }
}

/// Runs one proposal per walker in `walker_ids` against `low_log_l`.
///
/// Every walker gets its own copy of `engine`; copies are derived in input
/// order before any proposal runs, so the outcome does not depend on
/// `parallel`. The copies' counters are merged back into `engine`.
pub fn run_round<E: Engine>(
    engine: &mut E,
    walker_ids: &[usize],
    low_log_l: f64,
    parallel: bool,
) -> Result<RoundSummary, NsError> {
    let mut seen = BTreeSet::new();
    for &id in walker_ids {
        if !seen.insert(id) {
            return Err(NsError::Contract(
                ErrorInfo::new("duplicate-walker", "walker listed twice in one round")
                    .with_context("id", id)
                    .with_hint("one walker, one in-flight proposal"),
            ));
        }
    }

    let copies: Vec<E> = walker_ids.iter().map(|_| engine.copy()).collect();
    let run_one = |(mut copy, &id): (E, &usize)| {
        let outcome = copy.execute(id, low_log_l);
        (outcome, copy.counters())
    };
    let results: Vec<(Result<usize, NsError>, EngineCounters)> = if parallel {
        copies
            .into_par_iter()
            .zip(walker_ids.par_iter())
            .map(run_one)
            .collect()
    } else {
        copies.into_iter().zip(walker_ids.iter()).map(run_one).collect()
    };

    let mut counters = EngineCounters::default();
    let mut moved = Vec::with_capacity(results.len());
    let mut first_error = None;
    for (outcome, copy_counters) in results {
        counters.merge(&copy_counters);
        match outcome {
            Ok(count) => moved.push(count),
            Err(err) => {
                moved.push(0);
                first_error.get_or_insert(err);
            }
        }
    }
    engine.core_mut().absorb(&counters);
    if let Some(err) = first_error {
        return Err(err);
    }

    let summary = RoundSummary {
        engine: engine.name().to_string(),
        low_log_likelihood: low_log_l,
        moved,
        counters,
    };
    log::debug!(
        "round engine={} walkers={} accepted={} acceptance={:.3}",
        summary.engine,
        walker_ids.len(),
        summary.accepted(),
        counters.acceptance_rate()
    );
    Ok(summary)
}

/// Builds the engine described by `round` and runs one round with it.
///
/// The engine is returned so its counters and seed stream can be reused.
pub fn run_configured_round(
    round: &RoundConfig,
    population: Arc<dyn Population>,
    errdis: Arc<dyn ErrorDistribution>,
    walker_ids: &[usize],
    low_log_l: f64,
) -> Result<(MoveEngine, RoundSummary), NsError> {
    let mut engine = MoveEngine::build(round.engine, population, errdis, &round.config)?;
    if !round.engine.is_order_move() {
        engine.calculate_unit_range()?;
    }
    let summary = run_round(&mut engine, walker_ids, low_log_l, round.parallel)?;
    Ok((engine, summary))
}
