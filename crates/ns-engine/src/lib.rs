#![deny(missing_docs)]
#![doc = "Constrained proposal engines for nested sampling: step, shuffle, nearest-neighbour and start moves, plus the round driver that fans them out over a walker population."]

/// YAML configuration schema and defaults.
pub mod config;
/// Deterministic seed derivation for engine copies.
pub mod determinism;
/// Engine capability, shared core state and counters.
pub mod engine;
/// Strategy dispatch and the parallel round driver.
pub mod kernel;
/// Physical to unit coordinate mapping.
pub mod mapper;
/// Per-round counters and per-strategy summaries.
pub mod metrics;
/// Moves over order vectors.
pub mod moves_order;
/// Fresh-position moves.
pub mod moves_start;
/// Real-valued random step.
pub mod moves_step;

pub use config::{EngineConfig, EngineKind, RoundConfig, SeedPolicy};
pub use engine::{Engine, EngineCore, EngineCounters, WalkerClaim};
pub use kernel::{run_configured_round, run_round, MoveEngine, RoundSummary};
pub use mapper::CoordinateMapper;
pub use metrics::{EngineReport, MetricsRecorder, RoundSample};
pub use moves_order::{shuffle_window, NearMove, ShuffleMove};
pub use moves_start::{StartMove, StartOrderMove};
pub use moves_step::{propose_step, StepMove};
