#![deny(missing_docs)]
#![doc = "Core vocabulary for the nested-sampling proposal kernel: errors, seeding, problems, walkers and likelihoods."]

pub mod errors;
pub mod likelihood;
pub mod problem;
pub mod rng;
pub mod salesman;
pub mod walker;

pub use errors::{ErrorInfo, NsError};
pub use likelihood::{ErrorDistribution, FnLikelihood, TourLength};
pub use problem::{ParameterProblem, Prior, Problem};
pub use rng::{derive_substream_seed, RngHandle};
pub use salesman::{order_indices, DistanceMetric, SalesmanProblem};
pub use walker::{validate_fit_index, Population, Walker, WalkerList};
