use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ns_core::{ErrorDistribution, NsError, Population, Problem, RngHandle, Walker};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::determinism;
use crate::mapper::CoordinateMapper;

/// Running statistics of an engine.
///
/// `rejects` counts trials below the floor that were followed by another
/// trial; `failures` counts calls abandoned after their last trial.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineCounters {
    /// Number of `execute` entries.
    pub calls: u64,
    /// Accepted proposals.
    pub successes: u64,
    /// Rejected trials with retries remaining.
    pub rejects: u64,
    /// Calls that ran out of trials.
    pub failures: u64,
}

impl EngineCounters {
    /// Number of trials that reached a verdict.
    pub fn trials(&self) -> u64 {
        self.successes + self.rejects + self.failures
    }

    /// Accepted fraction of all trials (0 before the first trial).
    pub fn acceptance_rate(&self) -> f64 {
        ratio(self.successes, self.trials())
    }

    /// Fraction of calls that ended in exhaustion (0 before the first call).
    pub fn failure_rate(&self) -> f64 {
        ratio(self.failures, self.calls)
    }

    /// Adds the counts of `other` to `self`.
    pub fn merge(&mut self, other: &EngineCounters) {
        self.calls += other.calls;
        self.successes += other.successes;
        self.rejects += other.rejects;
        self.failures += other.failures;
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Capability shared by every proposal strategy.
pub trait Engine: Send {
    /// Stable strategy name.
    fn name(&self) -> &'static str;

    /// Attempts one proposal for walker `walker_id` against `low_log_l`.
    ///
    /// Returns the number of parameters moved, 0 when nothing was accepted.
    /// Only contract violations are reported as errors.
    fn execute(&mut self, walker_id: usize, low_log_l: f64) -> Result<usize, NsError>;

    /// Independent copy sharing population and likelihood, with a fresh random stream.
    fn copy(&self) -> Self
    where
        Self: Sized;

    /// Shared trial and bookkeeping state.
    fn core(&self) -> &EngineCore;

    /// Mutable access to the shared state.
    fn core_mut(&mut self) -> &mut EngineCore;

    /// Snapshot of the counters.
    fn counters(&self) -> EngineCounters {
        self.core().counters()
    }

    /// Recomputes the unit range from the current population.
    fn calculate_unit_range(&mut self) -> Result<(), NsError> {
        self.core_mut().calculate_unit_range()
    }
}

/// State and protocol every engine builds on: the population and likelihood
/// handles, a private random stream, trial limits, counters, and the cached
/// unit range.
pub struct EngineCore {
    population: Arc<dyn Population>,
    errdis: Arc<dyn ErrorDistribution>,
    rng: RngHandle,
    counters: EngineCounters,
    max_trials: usize,
    verbose: u8,
    unit_range: Vec<f64>,
    copies: AtomicU64,
}

impl std::fmt::Debug for EngineCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineCore")
            .field("seed", &self.rng.seed())
            .field("counters", &self.counters)
            .field("max_trials", &self.max_trials)
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

impl EngineCore {
    /// Creates the shared state from a validated configuration.
    ///
    /// The unit range starts at one for every parameter of walker 0's problem.
    pub fn new(
        population: Arc<dyn Population>,
        errdis: Arc<dyn ErrorDistribution>,
        config: &EngineConfig,
    ) -> Result<Self, NsError> {
        config.validate()?;
        let npars = if population.is_empty() {
            0
        } else {
            population.get(0)?.problem().npars()
        };
        Ok(Self {
            population,
            errdis,
            rng: RngHandle::from_seed(config.seed_policy.master_seed),
            counters: EngineCounters::default(),
            max_trials: config.max_trials,
            verbose: config.verbose,
            unit_range: vec![1.0; npars],
            copies: AtomicU64::new(0),
        })
    }

    /// Copy with zeroed counters and a stream derived from this engine's seed
    /// and its running copy count.
    pub fn copy(&self) -> Self {
        let index = self.copies.fetch_add(1, Ordering::Relaxed) + 1;
        Self {
            population: Arc::clone(&self.population),
            errdis: Arc::clone(&self.errdis),
            rng: RngHandle::from_seed(determinism::copy_seed(self.rng.seed(), index)),
            counters: EngineCounters::default(),
            max_trials: self.max_trials,
            verbose: self.verbose,
            unit_range: self.unit_range.clone(),
            copies: AtomicU64::new(0),
        }
    }

    /// Population the engine commits into.
    pub fn population(&self) -> &Arc<dyn Population> {
        &self.population
    }

    /// Private random stream.
    pub fn rng_mut(&mut self) -> &mut RngHandle {
        &mut self.rng
    }

    /// Seed of the private random stream.
    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    /// Trial budget of one `execute` call.
    pub fn max_trials(&self) -> usize {
        self.max_trials
    }

    /// Diagnostic verbosity.
    pub fn verbose(&self) -> u8 {
        self.verbose
    }

    /// Cached per-parameter unit range.
    pub fn unit_range(&self) -> &[f64] {
        &self.unit_range
    }

    /// Snapshot of the counters.
    pub fn counters(&self) -> EngineCounters {
        self.counters
    }

    /// Adds counters gathered by a copy of this engine.
    pub fn absorb(&mut self, counters: &EngineCounters) {
        self.counters.merge(counters);
    }

    /// Recomputes the unit range from every walker in the population.
    pub fn calculate_unit_range(&mut self) -> Result<(), NsError> {
        if self.population.is_empty() {
            return Ok(());
        }
        let walkers = (0..self.population.len())
            .map(|id| self.population.get(id))
            .collect::<Result<Vec<_>, _>>()?;
        let npars = walkers[0].problem().npars();
        self.unit_range = CoordinateMapper::unit_range(&walkers, npars)?;
        Ok(())
    }

    /// Counts an `execute` entry.
    pub fn report_call(&mut self) {
        self.counters.calls += 1;
    }

    /// Counts an accepted proposal.
    pub fn report_success(&mut self) {
        self.counters.successes += 1;
    }

    /// Counts a trial below the floor with retries remaining.
    pub fn report_reject(&mut self) {
        self.counters.rejects += 1;
    }

    /// Counts a call abandoned after its last trial.
    pub fn report_failed(&mut self) {
        self.counters.failures += 1;
    }

    /// Claims `walker_id` for the duration of one `execute` call.
    pub fn claim(&self, walker_id: usize) -> Result<WalkerClaim, NsError> {
        self.population.try_claim(walker_id)?;
        Ok(WalkerClaim {
            population: Arc::clone(&self.population),
            id: walker_id,
        })
    }

    /// Scores a candidate. Invalid points (errors, non-finite values) yield `None`.
    pub fn evaluate(&self, problem: &dyn Problem, params: &[f64]) -> Option<f64> {
        match self.errdis.log_likelihood(problem, params) {
            Ok(value) if value.is_finite() => Some(value),
            Ok(value) => {
                if self.verbose > 4 {
                    log::trace!("non-finite log-likelihood {value} treated as rejection");
                }
                None
            }
            Err(err) => {
                if self.verbose > 4 {
                    log::trace!("invalid candidate treated as rejection: {err}");
                }
                None
            }
        }
    }

    /// Commits an accepted candidate into the population in place of walker `walker_id`.
    pub fn set_walker(
        &self,
        walker_id: usize,
        problem: &Arc<dyn Problem>,
        allpars: Vec<f64>,
        log_likelihood: f64,
        fit_index: Vec<usize>,
    ) -> Result<(), NsError> {
        let walker = Walker::new(
            walker_id,
            Arc::clone(problem),
            allpars,
            fit_index,
            log_likelihood,
        )?;
        self.population.commit(walker_id, walker)
    }
}

/// Marks a walker as having a proposal in flight; released on drop.
pub struct WalkerClaim {
    population: Arc<dyn Population>,
    id: usize,
}

impl Drop for WalkerClaim {
    fn drop(&mut self) {
        self.population.release(self.id);
    }
}

/// Values of the free parameters, in fit-index order.
pub(crate) fn gather_free(allpars: &[f64], fit_index: &[usize]) -> Vec<f64> {
    fit_index.iter().map(|&k| allpars[k]).collect()
}

/// Copy of `allpars` with the free parameters replaced by `free`.
pub(crate) fn scatter_free(allpars: &[f64], fit_index: &[usize], free: &[f64]) -> Vec<f64> {
    let mut ptry = allpars.to_vec();
    for (&k, &value) in fit_index.iter().zip(free) {
        ptry[k] = value;
    }
    ptry
}

/// Outcome of one trial, used by the retry loops of every move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Trial {
    /// Candidate met the floor.
    Accepted(f64),
    /// Candidate missed the floor or was invalid.
    Rejected,
}

impl Trial {
    pub(crate) fn judge(log_l: Option<f64>, low_log_l: f64) -> Self {
        match log_l {
            Some(value) if value >= low_log_l => Trial::Accepted(value),
            _ => Trial::Rejected,
        }
    }
}
