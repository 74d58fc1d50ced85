//! Travelling-salesman style order problem.

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, NsError};
use crate::problem::{Prior, Problem};

/// Smallest usable distance scale; below it the scale falls back to one.
const MIN_SCALE: f64 = 1e-10;

/// Metric used to measure the distance between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DistanceMetric {
    /// 1-norm over all dimensions.
    Manhattan,
    /// 2-norm over all dimensions.
    Euclidean,
    /// Great-circle distance in radians; nodes are `[longitude, latitude]` in degrees.
    Spherical,
}

impl DistanceMetric {
    fn measure(&self, a: &[f64], b: &[f64]) -> f64 {
        match self {
            DistanceMetric::Manhattan => a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum(),
            DistanceMetric::Euclidean => a
                .iter()
                .zip(b)
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f64>()
                .sqrt(),
            DistanceMetric::Spherical => {
                let (lon1, lat1) = (a[0].to_radians(), a[1].to_radians());
                let (lon2, lat2) = (b[0].to_radians(), b[1].to_radians());
                let dlat = (lat2 - lat1) / 2.0;
                let dlon = (lon2 - lon1) / 2.0;
                let h = dlat.sin().powi(2) + lat1.cos() * lat2.cos() * dlon.sin().powi(2);
                // round-off can push h just above 1
                let h = h.min(1.0);
                2.0 * h.sqrt().atan2((1.0 - h).sqrt())
            }
        }
    }
}

/// Order problem over a set of nodes: the parameters give the visiting order.
///
/// Parameters are node indices stored as floats, so `npars` equals the number
/// of nodes. The tour is closed: the last node connects back to the first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesmanProblem {
    nodes: Vec<Vec<f64>>,
    weights: Option<Vec<f64>>,
    metric: DistanceMetric,
    scale: f64,
}

impl SalesmanProblem {
    /// Creates a problem over `nodes`. When `scale` is `None` the minimum pairwise
    /// distance is used.
    pub fn new(
        nodes: Vec<Vec<f64>>,
        weights: Option<Vec<f64>>,
        metric: DistanceMetric,
        scale: Option<f64>,
    ) -> Result<Self, NsError> {
        let Some(first) = nodes.first() else {
            return Err(NsError::Problem(ErrorInfo::new(
                "no-nodes",
                "salesman problem needs at least one node",
            )));
        };
        let ndim = first.len();
        if ndim == 0 || nodes.iter().any(|node| node.len() != ndim) {
            return Err(NsError::Problem(
                ErrorInfo::new("ragged-nodes", "all nodes need the same non-zero dimension")
                    .with_context("ndim", ndim),
            ));
        }
        if metric == DistanceMetric::Spherical && ndim != 2 {
            return Err(NsError::Problem(
                ErrorInfo::new("unsupported-metric", "spherical distances need 2 dimensions")
                    .with_context("ndim", ndim),
            ));
        }
        if let Some(weights) = &weights {
            if weights.len() != nodes.len() {
                return Err(NsError::Problem(
                    ErrorInfo::new("weight-length", "one weight per node is required")
                        .with_context("nodes", nodes.len())
                        .with_context("weights", weights.len()),
                ));
            }
        }
        let mut problem = Self {
            nodes,
            weights,
            metric,
            scale: 1.0,
        };
        problem.scale = match scale {
            Some(scale) if scale > 0.0 && scale.is_finite() => scale,
            Some(scale) => {
                return Err(NsError::Problem(
                    ErrorInfo::new("invalid-scale", "scale must be positive and finite")
                        .with_context("scale", scale),
                ))
            }
            None => {
                let min = problem.minimum_distance();
                if !min.is_finite() || min < MIN_SCALE {
                    1.0
                } else {
                    min
                }
            }
        };
        Ok(problem)
    }

    /// Number of spatial dimensions of each node.
    pub fn ndim(&self) -> usize {
        self.nodes[0].len()
    }

    /// Distance scale every leg is divided by.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Metric in use.
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Unscaled distance between nodes `a` and `b`.
    pub fn distance(&self, a: usize, b: usize) -> Option<f64> {
        let (pa, pb) = (self.nodes.get(a)?, self.nodes.get(b)?);
        Some(self.metric.measure(pa, pb))
    }

    /// Smallest distance between two distinct nodes (infinite for a single node).
    pub fn minimum_distance(&self) -> f64 {
        let mut min = f64::INFINITY;
        for (i, a) in self.nodes.iter().enumerate() {
            for b in &self.nodes[i + 1..] {
                min = min.min(self.metric.measure(a, b));
            }
        }
        min
    }

    /// Length of every leg of the closed tour `order`.
    ///
    /// Leg `k` runs from `order[k]` to `order[k + 1]` (wrapping), divided by the
    /// scale and multiplied by the weight of its starting node.
    pub fn leg_lengths(&self, order: &[usize]) -> Result<Vec<f64>, NsError> {
        let n = order.len();
        let mut legs = Vec::with_capacity(n);
        for k in 0..n {
            let from = order[k];
            let to = order[(k + 1) % n];
            let dist = self.distance(from, to).ok_or_else(|| {
                NsError::Likelihood(
                    ErrorInfo::new("unknown-node", "tour references a node outside the problem")
                        .with_context("from", from)
                        .with_context("to", to),
                )
            })?;
            let weight = self
                .weights
                .as_ref()
                .map_or(1.0, |weights| weights[from]);
            legs.push(dist / self.scale * weight);
        }
        Ok(legs)
    }
}

impl Problem for SalesmanProblem {
    fn npars(&self) -> usize {
        self.nodes.len()
    }

    fn prior(&self, _k: usize) -> Option<&Prior> {
        None
    }

    fn node_distance(&self, a: usize, b: usize) -> Option<f64> {
        self.distance(a, b)
    }

    fn is_order_problem(&self) -> bool {
        true
    }

    fn describe(&self) -> String {
        format!(
            "travelling salesman in {} dimensions with {} nodes ({:?} distance)",
            self.ndim(),
            self.nodes.len(),
            self.metric
        )
    }
}

/// Converts a float-encoded order vector into node indices.
pub fn order_indices(params: &[f64], nodes: usize) -> Result<Vec<usize>, NsError> {
    params
        .iter()
        .enumerate()
        .map(|(pos, &value)| {
            if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && (value as usize) < nodes
            {
                Ok(value as usize)
            } else {
                Err(NsError::Likelihood(
                    ErrorInfo::new("invalid-order", "order entry is not a node index")
                        .with_context("position", pos)
                        .with_context("value", value),
                ))
            }
        })
        .collect()
}
