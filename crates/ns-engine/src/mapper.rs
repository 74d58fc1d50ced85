use std::sync::Arc;

use ns_core::{ErrorInfo, NsError, Prior, Problem, Walker};

/// Stateless transform between physical parameter values and unit coordinates.
///
/// `indices[i]` names the parameter whose prior maps `values[i]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoordinateMapper;

impl CoordinateMapper {
    /// Maps physical values of the parameters `indices` into `[0, 1]`.
    pub fn domain_to_unit(
        problem: &dyn Problem,
        values: &[f64],
        indices: &[usize],
    ) -> Result<Vec<f64>, NsError> {
        check_lengths(values.len(), indices.len())?;
        values
            .iter()
            .zip(indices)
            .map(|(&value, &k)| Ok(prior_of(problem, k)?.domain_to_unit(value)))
            .collect()
    }

    /// Maps unit coordinates of the parameters `indices` back to physical values.
    pub fn unit_to_domain(
        problem: &dyn Problem,
        units: &[f64],
        indices: &[usize],
    ) -> Result<Vec<f64>, NsError> {
        check_lengths(units.len(), indices.len())?;
        units
            .iter()
            .zip(indices)
            .map(|(&unit, &k)| Ok(prior_of(problem, k)?.unit_to_domain(unit)))
            .collect()
    }

    /// Spread (`max - min`) of every parameter's unit coordinate over `walkers`.
    ///
    /// Only parameters listed in some walker's fit index contribute; the others
    /// keep a zero range. The result has `npars` entries.
    pub fn unit_range(walkers: &[Arc<Walker>], npars: usize) -> Result<Vec<f64>, NsError> {
        let mut low = vec![f64::INFINITY; npars];
        let mut high = vec![f64::NEG_INFINITY; npars];
        for walker in walkers {
            let fit_index = walker.fit_index();
            let values: Vec<f64> = fit_index.iter().map(|&k| walker.allpars()[k]).collect();
            let units = Self::domain_to_unit(walker.problem().as_ref(), &values, fit_index)?;
            for (&k, unit) in fit_index.iter().zip(units) {
                if k >= npars {
                    return Err(NsError::Contract(
                        ErrorInfo::new("fit-index-range", "fit index exceeds parameter count")
                            .with_context("index", k)
                            .with_context("npars", npars),
                    ));
                }
                low[k] = low[k].min(unit);
                high[k] = high[k].max(unit);
            }
        }
        Ok(low
            .into_iter()
            .zip(high)
            .map(|(lo, hi)| if hi >= lo { hi - lo } else { 0.0 })
            .collect())
    }
}

fn prior_of(problem: &dyn Problem, k: usize) -> Result<&Prior, NsError> {
    problem.prior(k).ok_or_else(|| {
        NsError::Contract(
            ErrorInfo::new("no-unit-mapping", "parameter has no prior to map through")
                .with_context("parameter", k)
                .with_context("problem", problem.describe()),
        )
    })
}

fn check_lengths(values: usize, indices: usize) -> Result<(), NsError> {
    if values != indices {
        return Err(NsError::Contract(
            ErrorInfo::new("index-length", "values and parameter indices differ in length")
                .with_context("values", values)
                .with_context("indices", indices),
        ));
    }
    Ok(())
}
