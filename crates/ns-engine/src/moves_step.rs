use std::sync::Arc;

use ns_core::{ErrorDistribution, ErrorInfo, NsError, Population, RngHandle};
use rand::Rng;

use crate::config::EngineConfig;
use crate::engine::{Engine, EngineCore, Trial};
use crate::mapper::CoordinateMapper;

/// Moves all free parameters of a walker by one random step in unit space.
///
/// The step of parameter `k` is uniform in `[-r_k, r_k]` with
/// `r_k = u_k + 2 u_k / N`, where `u_k` is the cached unit range and `N` the
/// population size. Components that leave `[0, 1]` are redrawn, never clamped
/// or reflected.
#[derive(Debug)]
pub struct StepMove {
    core: EngineCore,
    step_scale: f64,
}

impl StepMove {
    /// Creates a step engine over `population`.
    pub fn new(
        population: Arc<dyn Population>,
        errdis: Arc<dyn ErrorDistribution>,
        config: &EngineConfig,
    ) -> Result<Self, NsError> {
        Ok(Self {
            core: EngineCore::new(population, errdis, config)?,
            step_scale: 1.0,
        })
    }

    /// Trial-size scalar of the last call; halved on every rejected trial.
    pub fn step_scale(&self) -> f64 {
        self.step_scale
    }

    fn half_ranges(&self, fit_index: &[usize]) -> Result<Vec<f64>, NsError> {
        let unit_range = self.core.unit_range();
        let nwalkers = self.core.population().len() as f64;
        fit_index
            .iter()
            .map(|&k| {
                let range = unit_range.get(k).copied().ok_or_else(|| {
                    NsError::Contract(
                        ErrorInfo::new("unit-range", "no unit range cached for parameter")
                            .with_context("parameter", k)
                            .with_context("cached", unit_range.len()),
                    )
                })?;
                Ok(range + 2.0 * range / nwalkers)
            })
            .collect()
    }
}

/// Draws a unit-space candidate around `origin` whose components all lie in `[0, 1]`.
///
/// Out-of-range components are redrawn: first those below 0, then, once none
/// are below, those above 1.
pub fn propose_step(rng: &mut RngHandle, origin: &[f64], half_range: &[f64]) -> Vec<f64> {
    let mut step: Vec<f64> = half_range
        .iter()
        .map(|&range| draw_step(rng, range))
        .collect();
    loop {
        let candidate: Vec<f64> = origin.iter().zip(&step).map(|(u, s)| u + s).collect();
        let below: Vec<usize> = out_of_range(&candidate, |u| u < 0.0);
        if !below.is_empty() {
            for k in below {
                step[k] = draw_step(rng, half_range[k]);
            }
            continue;
        }
        let above: Vec<usize> = out_of_range(&candidate, |u| u > 1.0);
        if !above.is_empty() {
            for k in above {
                step[k] = draw_step(rng, half_range[k]);
            }
            continue;
        }
        return candidate;
    }
}

fn draw_step(rng: &mut RngHandle, range: f64) -> f64 {
    (2.0 * rng.gen::<f64>() - 1.0) * range
}

fn out_of_range(candidate: &[f64], test: impl Fn(f64) -> bool) -> Vec<usize> {
    candidate
        .iter()
        .enumerate()
        .filter(|(_, u)| test(**u))
        .map(|(k, _)| k)
        .collect()
}

impl Engine for StepMove {
    fn name(&self) -> &'static str {
        "step"
    }

    fn execute(&mut self, walker_id: usize, low_log_l: f64) -> Result<usize, NsError> {
        self.core.report_call();
        let _claim = self.core.claim(walker_id)?;

        let walker = self.core.population().get(walker_id)?;
        let problem = Arc::clone(walker.problem());
        let fit_index = walker.fit_index().to_vec();
        let np = fit_index.len();
        if np == 0 {
            return Ok(0);
        }

        let half_range = self.half_ranges(&fit_index)?;
        let current: Vec<f64> = fit_index.iter().map(|&k| walker.allpars()[k]).collect();
        let origin = CoordinateMapper::domain_to_unit(problem.as_ref(), &current, &fit_index)?;

        self.step_scale = 1.0;
        let mut ptry = walker.allpars().to_vec();
        let max_trials = self.core.max_trials();
        for trial in 1..=max_trials {
            let utry = propose_step(self.core.rng_mut(), &origin, &half_range);
            let values = CoordinateMapper::unit_to_domain(problem.as_ref(), &utry, &fit_index)?;
            for (&k, value) in fit_index.iter().zip(values) {
                ptry[k] = value;
            }

            let log_l = self.core.evaluate(problem.as_ref(), &ptry);
            if self.core.verbose() > 4 {
                log::trace!(
                    "step walker={walker_id} trial={trial} floor={low_log_l} logL={log_l:?}"
                );
            }
            match Trial::judge(log_l, low_log_l) {
                Trial::Accepted(value) => {
                    self.core
                        .set_walker(walker_id, &problem, ptry, value, fit_index)?;
                    self.core.report_success();
                    return Ok(np);
                }
                Trial::Rejected if trial < max_trials => {
                    self.step_scale *= 0.5;
                    self.core.report_reject();
                }
                Trial::Rejected => self.core.report_failed(),
            }
        }

        if self.core.verbose() > 0 {
            log::debug!("step walker={walker_id} exhausted {max_trials} trials");
        }
        Ok(0)
    }

    fn copy(&self) -> Self {
        Self {
            core: self.core.copy(),
            step_scale: 1.0,
        }
    }

    fn core(&self) -> &EngineCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EngineCore {
        &mut self.core
    }
}
