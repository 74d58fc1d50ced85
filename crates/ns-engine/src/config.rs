use std::fs;
use std::path::Path;

use ns_core::{ErrorInfo, NsError};
use serde::{Deserialize, Serialize};

/// YAML-configurable parameters shared by every proposal engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of trials within one `execute` call.
    #[serde(default = "default_max_trials")]
    pub max_trials: usize,
    /// Diagnostic verbosity; above 4 every trial is logged.
    #[serde(default)]
    pub verbose: u8,
    /// Master seed and substream policy.
    #[serde(default)]
    pub seed_policy: SeedPolicy,
}

fn default_max_trials() -> usize {
    5
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_trials: default_max_trials(),
            verbose: 0,
            seed_policy: SeedPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Parses and validates a YAML document.
    pub fn from_yaml_str(text: &str) -> Result<Self, NsError> {
        let config: Self = serde_yaml::from_str(text).map_err(|err| {
            NsError::Config(ErrorInfo::new("config-yaml-parse", err.to_string()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a JSON document.
    pub fn from_json_str(text: &str) -> Result<Self, NsError> {
        let config: Self = serde_json::from_str(text).map_err(|err| {
            NsError::Config(ErrorInfo::new("config-json-parse", err.to_string()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file; `.json` files are read as JSON, anything else as YAML.
    pub fn load(path: &Path) -> Result<Self, NsError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            NsError::Config(
                ErrorInfo::new("config-read", err.to_string())
                    .with_context("path", path.display()),
            )
        })?;
        let parsed = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&contents),
            _ => Self::from_yaml_str(&contents),
        };
        parsed.map_err(|err| match err {
            NsError::Config(info) => NsError::Config(info.with_context("path", path.display())),
            other => other,
        })
    }

    /// Rejects settings that would make `execute` unable to try anything.
    pub fn validate(&self) -> Result<(), NsError> {
        if self.max_trials == 0 {
            return Err(NsError::Config(
                ErrorInfo::new("max-trials", "max_trials must be at least 1")
                    .with_hint("the default is 5"),
            ));
        }
        Ok(())
    }
}

/// Deterministic seeding configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedPolicy {
    /// Seed of the parent engine; copies derive their own from it.
    #[serde(default = "default_master_seed")]
    pub master_seed: u64,
    /// Optional label recorded alongside metrics.
    #[serde(default)]
    pub label: Option<String>,
}

fn default_master_seed() -> u64 {
    4213
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self {
            master_seed: default_master_seed(),
            label: None,
        }
    }
}

/// Move strategies known to the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineKind {
    /// Random real-valued step of all free parameters.
    Step,
    /// Random reordering of a window of the order vector.
    Shuffle,
    /// Nearest-neighbour insertion in the order vector.
    Near,
    /// Fresh draw of the free parameters from their priors.
    Start,
    /// Fresh random permutation of the order vector.
    StartOrder,
}

impl EngineKind {
    /// Stable name used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Step => "step",
            EngineKind::Shuffle => "shuffle",
            EngineKind::Near => "near",
            EngineKind::Start => "start",
            EngineKind::StartOrder => "start-order",
        }
    }

    /// True for strategies that treat the parameters as an ordering.
    pub fn is_order_move(&self) -> bool {
        matches!(
            self,
            EngineKind::Shuffle | EngineKind::Near | EngineKind::StartOrder
        )
    }
}

/// Description of one sampling round handed to the driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundConfig {
    /// Strategy used for every walker in the round.
    pub engine: EngineKind,
    /// Engine settings.
    #[serde(default)]
    pub config: EngineConfig,
    /// Fan walkers out over the rayon thread pool.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn default_parallel() -> bool {
    true
}
