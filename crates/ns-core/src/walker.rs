//! Walkers and the population capability engines commit into.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::errors::{ErrorInfo, NsError};
use crate::problem::Problem;

/// One member of the sampling population.
///
/// Walkers are immutable once built; an accepted proposal replaces the stored
/// walker as a whole so readers always see a consistent
/// `(allpars, log_likelihood)` pair.
#[derive(Debug, Clone)]
pub struct Walker {
    id: usize,
    problem: Arc<dyn Problem>,
    allpars: Vec<f64>,
    fit_index: Vec<usize>,
    log_likelihood: f64,
}

impl Walker {
    /// Creates a walker, validating the parameter vector and fit index against the problem.
    pub fn new(
        id: usize,
        problem: Arc<dyn Problem>,
        allpars: Vec<f64>,
        fit_index: Vec<usize>,
        log_likelihood: f64,
    ) -> Result<Self, NsError> {
        let npars = problem.npars();
        if allpars.len() != npars {
            return Err(NsError::Contract(
                ErrorInfo::new("parameter-length", "parameter vector does not match problem")
                    .with_context("walker", id)
                    .with_context("npars", npars)
                    .with_context("len", allpars.len()),
            ));
        }
        validate_fit_index(&fit_index, npars).map_err(|err| match err {
            NsError::Contract(info) => NsError::Contract(info.with_context("walker", id)),
            other => other,
        })?;
        Ok(Self {
            id,
            problem,
            allpars,
            fit_index,
            log_likelihood,
        })
    }

    /// Position of the walker in its population.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Problem the walker belongs to.
    pub fn problem(&self) -> &Arc<dyn Problem> {
        &self.problem
    }

    /// Full parameter vector in physical units.
    pub fn allpars(&self) -> &[f64] {
        &self.allpars
    }

    /// Indices of the parameters free to vary.
    pub fn fit_index(&self) -> &[usize] {
        &self.fit_index
    }

    /// Cached log-likelihood of `allpars`.
    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    /// Same walker with parameters and log-likelihood replaced.
    pub fn with_state(&self, allpars: Vec<f64>, log_likelihood: f64) -> Result<Self, NsError> {
        Walker::new(
            self.id,
            Arc::clone(&self.problem),
            allpars,
            self.fit_index.clone(),
            log_likelihood,
        )
    }
}

/// Checks that every index is in range and appears only once.
pub fn validate_fit_index(fit_index: &[usize], npars: usize) -> Result<(), NsError> {
    let mut seen = BTreeSet::new();
    for &k in fit_index {
        if k >= npars {
            return Err(NsError::Contract(
                ErrorInfo::new("fit-index-range", "fit index exceeds parameter count")
                    .with_context("index", k)
                    .with_context("npars", npars),
            ));
        }
        if !seen.insert(k) {
            return Err(NsError::Contract(
                ErrorInfo::new("fit-index-duplicate", "fit index lists a parameter twice")
                    .with_context("index", k),
            ));
        }
    }
    Ok(())
}

/// Capability through which engines read and replace walkers.
///
/// This is the single synchronisation boundary of the kernel: implementations
/// decide how reads and commits are isolated, engines only see `get`/`commit`.
pub trait Population: Send + Sync {
    /// Number of walker slots.
    fn len(&self) -> usize;

    /// True when the population holds no walkers.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the walker stored at `id`.
    fn get(&self, id: usize) -> Result<Arc<Walker>, NsError>;

    /// Atomically replaces the walker stored at `id`.
    fn commit(&self, id: usize, walker: Walker) -> Result<(), NsError>;

    /// Marks `id` as having a proposal in flight; fails when it already has one.
    fn try_claim(&self, id: usize) -> Result<(), NsError>;

    /// Clears the in-flight mark set by [`Population::try_claim`].
    fn release(&self, id: usize);
}

struct Slot {
    walker: RwLock<Arc<Walker>>,
    busy: AtomicBool,
}

/// Ordered, index-addressed population of walkers.
pub struct WalkerList {
    slots: Vec<Slot>,
}

impl std::fmt::Debug for WalkerList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalkerList")
            .field("len", &self.slots.len())
            .finish_non_exhaustive()
    }
}

impl WalkerList {
    /// Creates `count` identical walkers with an unset (`-inf`) log-likelihood.
    pub fn new(
        problem: Arc<dyn Problem>,
        count: usize,
        allpars: Vec<f64>,
        fit_index: Vec<usize>,
    ) -> Result<Self, NsError> {
        let walkers = (0..count)
            .map(|id| {
                Walker::new(
                    id,
                    Arc::clone(&problem),
                    allpars.clone(),
                    fit_index.clone(),
                    f64::NEG_INFINITY,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_walkers(walkers)
    }

    /// Wraps prepared walkers; walker `k` must carry id `k`.
    pub fn from_walkers(walkers: Vec<Walker>) -> Result<Self, NsError> {
        let slots = walkers
            .into_iter()
            .enumerate()
            .map(|(position, walker)| {
                if walker.id() != position {
                    return Err(NsError::Contract(
                        ErrorInfo::new("walker-id", "walker id does not match its position")
                            .with_context("position", position)
                            .with_context("id", walker.id()),
                    ));
                }
                Ok(Slot {
                    walker: RwLock::new(Arc::new(walker)),
                    busy: AtomicBool::new(false),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { slots })
    }

    /// Snapshot of every walker in order.
    pub fn snapshot(&self) -> Vec<Arc<Walker>> {
        self.slots
            .iter()
            .map(|slot| Arc::clone(&slot.walker.read()))
            .collect()
    }

    /// Lowest log-likelihood in the population together with its walker id.
    pub fn low_log_likelihood(&self) -> Option<(f64, usize)> {
        self.snapshot()
            .iter()
            .map(|walker| (walker.log_likelihood(), walker.id()))
            .min_by(|a, b| a.0.total_cmp(&b.0))
    }

    fn slot(&self, id: usize) -> Result<&Slot, NsError> {
        self.slots.get(id).ok_or_else(|| {
            NsError::Contract(
                ErrorInfo::new("unknown-walker", "walker id outside the population")
                    .with_context("id", id)
                    .with_context("len", self.slots.len()),
            )
        })
    }
}

impl Population for WalkerList {
    fn len(&self) -> usize {
        self.slots.len()
    }

    fn get(&self, id: usize) -> Result<Arc<Walker>, NsError> {
        Ok(Arc::clone(&self.slot(id)?.walker.read()))
    }

    fn commit(&self, id: usize, walker: Walker) -> Result<(), NsError> {
        if walker.id() != id {
            return Err(NsError::Contract(
                ErrorInfo::new("walker-id", "committed walker carries another id")
                    .with_context("slot", id)
                    .with_context("id", walker.id()),
            ));
        }
        *self.slot(id)?.walker.write() = Arc::new(walker);
        Ok(())
    }

    fn try_claim(&self, id: usize) -> Result<(), NsError> {
        let slot = self.slot(id)?;
        if slot
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(NsError::Contract(
                ErrorInfo::new("walker-busy", "walker already has a proposal in flight")
                    .with_context("id", id)
                    .with_hint("dispatch at most one proposal per walker at a time"),
            ));
        }
        Ok(())
    }

    fn release(&self, id: usize) {
        if let Some(slot) = self.slots.get(id) {
            slot.busy.store(false, Ordering::Release);
        }
    }
}
