//! Problem descriptions and the per-parameter priors used for unit mapping.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, NsError};

/// Bounds and scale of a single parameter.
///
/// A prior defines the bijection between the physical ("domain") value of a
/// parameter and its position in the unit interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Prior {
    /// Linear map of `[low, high]` onto `[0, 1]`.
    Uniform {
        /// Lower bound of the physical range.
        low: f64,
        /// Upper bound of the physical range.
        high: f64,
    },
    /// Logarithmic (Jeffreys) map of `[low, high]` onto `[0, 1]`; requires `0 < low`.
    LogUniform {
        /// Lower bound of the physical range.
        low: f64,
        /// Upper bound of the physical range.
        high: f64,
    },
}

impl Prior {
    /// Creates a uniform prior, validating the bounds.
    pub fn uniform(low: f64, high: f64) -> Result<Self, NsError> {
        let prior = Prior::Uniform { low, high };
        prior.validate()?;
        Ok(prior)
    }

    /// Creates a log-uniform prior, validating the bounds.
    pub fn log_uniform(low: f64, high: f64) -> Result<Self, NsError> {
        let prior = Prior::LogUniform { low, high };
        prior.validate()?;
        Ok(prior)
    }

    /// Lower and upper physical bound.
    pub fn bounds(&self) -> (f64, f64) {
        match *self {
            Prior::Uniform { low, high } | Prior::LogUniform { low, high } => (low, high),
        }
    }

    /// Checks that the bounds describe a non-empty, finite range.
    pub fn validate(&self) -> Result<(), NsError> {
        let (low, high) = self.bounds();
        if !(low.is_finite() && high.is_finite() && low < high) {
            return Err(NsError::Problem(
                ErrorInfo::new("invalid-bounds", "prior bounds must be finite with low < high")
                    .with_context("low", low)
                    .with_context("high", high),
            ));
        }
        if matches!(self, Prior::LogUniform { .. }) && low <= 0.0 {
            return Err(NsError::Problem(
                ErrorInfo::new("invalid-bounds", "log-uniform prior needs a positive low bound")
                    .with_context("low", low),
            ));
        }
        Ok(())
    }

    /// Maps a physical value into `[0, 1]`. Values outside the bounds are clamped.
    pub fn domain_to_unit(&self, value: f64) -> f64 {
        let (low, high) = self.bounds();
        let value = value.clamp(low, high);
        let unit = match self {
            Prior::Uniform { .. } => (value - low) / (high - low),
            Prior::LogUniform { .. } => (value / low).ln() / (high / low).ln(),
        };
        unit.clamp(0.0, 1.0)
    }

    /// Maps a unit value back into the physical range.
    pub fn unit_to_domain(&self, unit: f64) -> f64 {
        let (low, high) = self.bounds();
        let unit = unit.clamp(0.0, 1.0);
        let value = match self {
            Prior::Uniform { .. } => low + unit * (high - low),
            Prior::LogUniform { .. } => low * (high / low).powf(unit),
        };
        value.clamp(low, high)
    }
}

/// Read-only description of the problem a walker belongs to.
///
/// Problems are shared between walkers and engines without synchronisation.
pub trait Problem: Debug + Send + Sync {
    /// Number of parameters in a full parameter vector.
    fn npars(&self) -> usize;

    /// Prior of parameter `k`, or `None` when the parameter has no unit mapping
    /// (order problems).
    fn prior(&self, k: usize) -> Option<&Prior>;

    /// Distance between two nodes of an order problem, when defined.
    fn node_distance(&self, _a: usize, _b: usize) -> Option<f64> {
        None
    }

    /// True when the parameters encode an ordering rather than values.
    fn is_order_problem(&self) -> bool {
        false
    }

    /// Short human readable description.
    fn describe(&self) -> String {
        format!("problem with {} parameters", self.npars())
    }
}

/// Problem whose parameters are real values with individual priors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterProblem {
    priors: Vec<Prior>,
}

impl ParameterProblem {
    /// Creates a problem from one prior per parameter.
    pub fn new(priors: Vec<Prior>) -> Result<Self, NsError> {
        for (k, prior) in priors.iter().enumerate() {
            prior.validate().map_err(|err| match err {
                NsError::Problem(info) => NsError::Problem(info.with_context("parameter", k)),
                other => other,
            })?;
        }
        Ok(Self { priors })
    }

    /// Creates a problem of `npars` parameters sharing the same uniform bounds.
    pub fn uniform(npars: usize, low: f64, high: f64) -> Result<Self, NsError> {
        let prior = Prior::uniform(low, high)?;
        Ok(Self {
            priors: vec![prior; npars],
        })
    }

    /// All priors in parameter order.
    pub fn priors(&self) -> &[Prior] {
        &self.priors
    }
}

impl Problem for ParameterProblem {
    fn npars(&self) -> usize {
        self.priors.len()
    }

    fn prior(&self, k: usize) -> Option<&Prior> {
        self.priors.get(k)
    }
}
