//! Likelihood collaborators consumed by the proposal engines.

use std::fmt;

use crate::errors::{ErrorInfo, NsError};
use crate::problem::Problem;
use crate::salesman::{order_indices, SalesmanProblem};

/// Scores a full parameter vector for a problem.
///
/// Implementations must be pure. An `Err` or a non-finite value marks the
/// point as invalid; engines treat either as a rejection.
pub trait ErrorDistribution: Send + Sync {
    /// Log-likelihood of `params` under `problem`.
    fn log_likelihood(&self, problem: &dyn Problem, params: &[f64]) -> Result<f64, NsError>;
}

/// Adapter turning a closure into an [`ErrorDistribution`].
pub struct FnLikelihood<F> {
    func: F,
}

impl<F> FnLikelihood<F>
where
    F: Fn(&[f64]) -> f64 + Send + Sync,
{
    /// Wraps a closure of the parameter vector.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> fmt::Debug for FnLikelihood<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnLikelihood")
    }
}

impl<F> ErrorDistribution for FnLikelihood<F>
where
    F: Fn(&[f64]) -> f64 + Send + Sync,
{
    fn log_likelihood(&self, problem: &dyn Problem, params: &[f64]) -> Result<f64, NsError> {
        if params.len() != problem.npars() {
            return Err(NsError::Likelihood(
                ErrorInfo::new("parameter-length", "parameter vector does not match problem")
                    .with_context("npars", problem.npars())
                    .with_context("len", params.len()),
            ));
        }
        Ok((self.func)(params))
    }
}

/// Negative closed-tour length of a [`SalesmanProblem`].
#[derive(Debug, Clone)]
pub struct TourLength {
    problem: SalesmanProblem,
}

impl TourLength {
    /// Scores tours over the nodes of `problem`.
    pub fn new(problem: SalesmanProblem) -> Self {
        Self { problem }
    }

    /// Problem whose legs are measured.
    pub fn problem(&self) -> &SalesmanProblem {
        &self.problem
    }
}

impl ErrorDistribution for TourLength {
    fn log_likelihood(&self, _problem: &dyn Problem, params: &[f64]) -> Result<f64, NsError> {
        let nodes = self.problem.npars();
        if params.len() != nodes {
            return Err(NsError::Likelihood(
                ErrorInfo::new("tour-length", "tour must visit every node")
                    .with_context("nodes", nodes)
                    .with_context("len", params.len()),
            ));
        }
        let order = order_indices(params, nodes)?;
        let mut visited = vec![false; nodes];
        for &node in &order {
            if std::mem::replace(&mut visited[node], true) {
                return Err(NsError::Likelihood(
                    ErrorInfo::new("tour-revisit", "tour visits a node twice")
                        .with_context("node", node),
                ));
            }
        }
        let legs = self.problem.leg_lengths(&order)?;
        Ok(-legs.iter().sum::<f64>())
    }
}
