use std::sync::Arc;

use ns_core::{ErrorDistribution, NsError, Population};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::EngineConfig;
use crate::engine::{gather_free, scatter_free, Engine, EngineCore, Trial};
use crate::mapper::CoordinateMapper;

/// Redraws every free parameter uniformly in unit space.
///
/// Called with a floor of `-inf` this initialises a walker from its priors.
#[derive(Debug)]
pub struct StartMove {
    core: EngineCore,
}

impl StartMove {
    /// Creates a start engine over `population`.
    pub fn new(
        population: Arc<dyn Population>,
        errdis: Arc<dyn ErrorDistribution>,
        config: &EngineConfig,
    ) -> Result<Self, NsError> {
        Ok(Self {
            core: EngineCore::new(population, errdis, config)?,
        })
    }
}

impl Engine for StartMove {
    fn name(&self) -> &'static str {
        "start"
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

        let mut ptry = walker.allpars().to_vec();
        let max_trials = self.core.max_trials();
        for trial in 1..=max_trials {
            let rng = self.core.rng_mut();
            let units: Vec<f64> = (0..np).map(|_| rng.gen::<f64>()).collect();
            let values = CoordinateMapper::unit_to_domain(problem.as_ref(), &units, &fit_index)?;
            for (&k, value) in fit_index.iter().zip(values) {
                ptry[k] = value;
            }
            match Trial::judge(self.core.evaluate(problem.as_ref(), &ptry), low_log_l) {
                Trial::Accepted(value) => {
                    self.core
                        .set_walker(walker_id, &problem, ptry, value, fit_index)?;
                    self.core.report_success();
                    return Ok(np);
                }
                Trial::Rejected if trial < max_trials => self.core.report_reject(),
                Trial::Rejected => self.core.report_failed(),
            }
        }

        if self.core.verbose() > 0 {
            log::debug!("start walker={walker_id} found no point above {low_log_l}");
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
}

/// Replaces the free part of the order vector by a uniform random permutation of itself.
#[derive(Debug)]
pub struct StartOrderMove {
    core: EngineCore,
}

impl StartOrderMove {
    /// Creates an order start engine over `population`.
    pub fn new(
        population: Arc<dyn Population>,
        errdis: Arc<dyn ErrorDistribution>,
        config: &EngineConfig,
    ) -> Result<Self, NsError> {
        Ok(Self {
            core: EngineCore::new(population, errdis, config)?,
        })
    }
}

impl Engine for StartOrderMove {
    fn name(&self) -> &'static str {
        "start-order"
    }

    fn execute(&mut self, walker_id: usize, low_log_l: f64) -> Result<usize, NsError> {
        self.core.report_call();
        let _claim = self.core.claim(walker_id)?;

        let walker = self.core.population().get(walker_id)?;
        let fit_index = walker.fit_index();
        let np = fit_index.len();
        if np == 0 {
            return Ok(0);
        }

        let max_trials = self.core.max_trials();
        for trial in 1..=max_trials {
            let mut free = gather_free(walker.allpars(), fit_index);
            free.shuffle(self.core.rng_mut());
            let ptry = scatter_free(walker.allpars(), fit_index, &free);
            match Trial::judge(self.core.evaluate(walker.problem().as_ref(), &ptry), low_log_l) {
                Trial::Accepted(value) => {
                    self.core.set_walker(
                        walker_id,
                        walker.problem(),
                        ptry,
                        value,
                        fit_index.to_vec(),
                    )?;
                    self.core.report_success();
                    return Ok(np);
                }
                Trial::Rejected if trial < max_trials => self.core.report_reject(),
                Trial::Rejected => self.core.report_failed(),
            }
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
