use std::sync::Arc;

use ns_core::{order_indices, ErrorDistribution, ErrorInfo, NsError, Population, Problem, Walker};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, Geometric};

use crate::config::EngineConfig;
use crate::engine::{gather_free, scatter_free, Engine, EngineCore, Trial};

/// Success probability of the geometric draw that sizes the shuffle window.
const WINDOW_P: f64 = 0.2;

/// Rotates `params` left by `src` and shuffles the first `window` entries.
///
/// Order moves pass only the free parameters, in fit-index order.
///
/// Entries beyond the window keep their rotated order. `window` is capped at
/// the sequence length.
pub fn shuffle_window<R: Rng + ?Sized>(
    params: &[f64],
    src: usize,
    window: usize,
    rng: &mut R,
) -> Vec<f64> {
    let mut candidate = params.to_vec();
    if candidate.is_empty() {
        return candidate;
    }
    candidate.rotate_left(src % params.len());
    let window = window.min(candidate.len());
    candidate[..window].shuffle(rng);
    candidate
}

/// Shuffles a randomly placed, randomly sized window of the order vector.
///
/// The window starts at `2 + min(G, np / 2)` with `G ~ Geometric(0.2)` counted
/// in trials, and after every rejection shrinks to a uniform draw below its
/// current size; the call ends once the window drops to one element or less.
#[derive(Debug)]
pub struct ShuffleMove {
    core: EngineCore,
    window: Geometric,
}

impl ShuffleMove {
    /// Creates a shuffle engine over `population`.
    pub fn new(
        population: Arc<dyn Population>,
        errdis: Arc<dyn ErrorDistribution>,
        config: &EngineConfig,
    ) -> Result<Self, NsError> {
        Ok(Self {
            core: EngineCore::new(population, errdis, config)?,
            window: window_distribution()?,
        })
    }

    fn initial_window(&mut self, np: usize) -> usize {
        let geometric = 1 + self.window.sample(self.core.rng_mut()) as usize;
        2 + geometric.min(np / 2)
    }
}

fn window_distribution() -> Result<Geometric, NsError> {
    Geometric::new(WINDOW_P).map_err(|err| {
        NsError::Config(
            ErrorInfo::new("window-distribution", err.to_string()).with_context("p", WINDOW_P),
        )
    })
}

impl Engine for ShuffleMove {
    fn name(&self) -> &'static str {
        "shuffle"
    }

    fn execute(&mut self, walker_id: usize, low_log_l: f64) -> Result<usize, NsError> {
        self.core.report_call();
        let _claim = self.core.claim(walker_id)?;

        let walker = self.core.population().get(walker_id)?;
        let problem = Arc::clone(walker.problem());
        let fit_index = walker.fit_index();
        let param = gather_free(walker.allpars(), fit_index);
        let np = param.len();
        if np < 2 {
            return Ok(0);
        }

        let src = self.core.rng_mut().gen_range(0..np);
        let mut t = self.initial_window(np);
        while t > 1 {
            let window = t.min(np);
            let free = shuffle_window(&param, src, window, self.core.rng_mut());
            let ptry = scatter_free(walker.allpars(), fit_index, &free);
            let log_l = self.core.evaluate(problem.as_ref(), &ptry);
            if self.core.verbose() > 4 {
                log::trace!(
                    "shuffle walker={walker_id} src={src} window={window} floor={low_log_l} logL={log_l:?}"
                );
                log::trace!("  {param:?}");
                log::trace!("  {free:?}");
            }

            if let Trial::Accepted(value) = Trial::judge(log_l, low_log_l) {
                self.core
                    .set_walker(walker_id, &problem, ptry, value, fit_index.to_vec())?;
                self.core.report_success();
                return Ok(window);
            }

            t = self.core.rng_mut().gen_range(0..t);
            if t > 1 {
                self.core.report_reject();
            } else {
                self.core.report_failed();
            }
        }

        if self.core.verbose() > 0 {
            log::debug!("shuffle walker={walker_id} window degenerated without acceptance");
        }
        Ok(0)
    }

    fn copy(&self) -> Self {
        Self {
            core: self.core.copy(),
            window: self.window,
        }
    }

    fn core(&self) -> &EngineCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EngineCore {
        &mut self.core
    }

    fn calculate_unit_range(&mut self) -> Result<(), NsError> {
        Ok(())
    }
}

/// Moves the nearest neighbour of a random node next to it in the tour.
///
/// Only the nodes at fit-index positions take part. Every trial rotates them
/// by a random offset, finds the node closest to the new first node, and moves
/// it to the last position, which closes the loop next to the first node. When
/// the nearest node is already adjacent the trial is rejected without
/// evaluating the likelihood.
#[derive(Debug)]
pub struct NearMove {
    core: EngineCore,
}

impl NearMove {
    /// Creates a nearest-neighbour engine over `population`.
    pub fn new(
        population: Arc<dyn Population>,
        errdis: Arc<dyn ErrorDistribution>,
        config: &EngineConfig,
    ) -> Result<Self, NsError> {
        Ok(Self {
            core: EngineCore::new(population, errdis, config)?,
        })
    }

    fn attempt(
        &mut self,
        walker: &Walker,
        low_log_l: f64,
    ) -> Result<Option<(Vec<f64>, f64)>, NsError> {
        let problem = walker.problem().as_ref();
        let mut order = gather_free(walker.allpars(), walker.fit_index());
        let np = order.len();
        let ks = self.core.rng_mut().gen_range(0..np);
        order.rotate_left(ks);

        let nodes = order_indices(&order, problem.npars()).map_err(|err| {
            NsError::Contract(err.info().clone().with_context("walker", walker.id()))
        })?;
        let first = nodes[0];
        let mut kmin = 1;
        let mut dmin = node_distance(problem, first, nodes[1])?;
        for (k, &node) in nodes.iter().enumerate().skip(2) {
            let dist = node_distance(problem, first, node)?;
            if dist < dmin {
                dmin = dist;
                kmin = k;
            }
        }
        if kmin == 1 || kmin == np - 1 {
            if self.core.verbose() > 4 {
                log::trace!(
                    "near walker={} node {first} already next to its neighbour",
                    walker.id()
                );
            }
            return Ok(None);
        }

        let nearest = order.remove(kmin);
        order.push(nearest);
        order.rotate_right(ks);
        let ptry = scatter_free(walker.allpars(), walker.fit_index(), &order);

        let log_l = self.core.evaluate(problem, &ptry);
        if self.core.verbose() > 4 {
            log::trace!(
                "near walker={} ks={ks} kmin={kmin} dmin={dmin} floor={low_log_l} logL={log_l:?}",
                walker.id()
            );
        }
        Ok(match Trial::judge(log_l, low_log_l) {
            Trial::Accepted(value) => Some((ptry, value)),
            Trial::Rejected => None,
        })
    }
}

fn node_distance(problem: &dyn Problem, a: usize, b: usize) -> Result<f64, NsError> {
    problem.node_distance(a, b).ok_or_else(|| {
        NsError::Contract(
            ErrorInfo::new("no-node-distance", "problem does not define node distances")
                .with_context("problem", problem.describe())
                .with_hint("use a SalesmanProblem with the near move"),
        )
    })
}

impl Engine for NearMove {
    fn name(&self) -> &'static str {
        "near"
    }

    fn execute(&mut self, walker_id: usize, low_log_l: f64) -> Result<usize, NsError> {
        self.core.report_call();
        let _claim = self.core.claim(walker_id)?;

        let walker = self.core.population().get(walker_id)?;
        // with fewer than 4 free nodes every node is adjacent to every other
        if walker.fit_index().len() < 4 {
            return Ok(0);
        }

        let max_trials = self.core.max_trials();
        for trial in 1..=max_trials {
            if let Some((order, value)) = self.attempt(&walker, low_log_l)? {
                self.core.set_walker(
                    walker_id,
                    walker.problem(),
                    order,
                    value,
                    walker.fit_index().to_vec(),
                )?;
                self.core.report_success();
                return Ok(1);
            }
            if trial < max_trials {
                self.core.report_reject();
            } else {
                self.core.report_failed();
            }
        }

        if self.core.verbose() > 0 {
            log::debug!("near walker={walker_id} exhausted {max_trials} trials");
        }
        Ok(0)
    }

    fn copy(&self) -> Self {
        Self {
            core: self.core.copy(),
        }
    }

    fn core(&self) -> &EngineCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EngineCore {
        &mut self.core
    }

    fn calculate_unit_range(&mut self) -> Result<(), NsError> {
        Ok(())
    }
}
