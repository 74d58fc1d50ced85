use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use indexmap::IndexMap;
use ns_core::{ErrorInfo, NsError};
use serde::{Deserialize, Serialize};

use crate::engine::EngineCounters;
use crate::kernel::RoundSummary;

/// Counters of one round, stored for CSV export.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundSample {
    /// Round number supplied by the driver.
    pub round: usize,
    /// Strategy used in the round.
    pub engine: String,
    /// Likelihood floor of the round.
    pub floor: f64,
    /// Counters accumulated during the round.
    pub counters: EngineCounters,
}

/// Totals of one strategy over every recorded round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineReport {
    /// Strategy name.
    pub engine: String,
    /// Summed counters.
    pub counters: EngineCounters,
    /// Accepted fraction of all trials.
    pub acceptance_rate: f64,
    /// Fraction of calls that ran out of trials.
    pub failure_rate: f64,
}

/// Collects per-round counters and aggregates them per strategy.
#[derive(Debug, Default)]
pub struct MetricsRecorder {
    samples: Vec<RoundSample>,
}

impl MetricsRecorder {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome of round `round`.
    pub fn push_round(&mut self, round: usize, summary: &RoundSummary) {
        self.samples.push(RoundSample {
            round,
            engine: summary.engine.clone(),
            floor: summary.low_log_likelihood,
            counters: summary.counters,
        });
    }

    /// Recorded samples in insertion order.
    pub fn samples(&self) -> &[RoundSample] {
        &self.samples
    }

    /// Per-strategy totals, keyed in order of first appearance.
    pub fn summary(&self) -> IndexMap<String, EngineReport> {
        let mut totals: IndexMap<String, EngineCounters> = IndexMap::new();
        for sample in &self.samples {
            totals
                .entry(sample.engine.clone())
                .or_default()
                .merge(&sample.counters);
        }
        totals
            .into_iter()
            .map(|(engine, counters)| {
                let report = EngineReport {
                    engine: engine.clone(),
                    counters,
                    acceptance_rate: counters.acceptance_rate(),
                    failure_rate: counters.failure_rate(),
                };
                (engine, report)
            })
            .collect()
    }

    /// Writes one line per recorded round to a CSV file.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), NsError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|err| io_error(path, err))?;
        let mut writer = BufWriter::new(file);
        let mut write_all = || -> std::io::Result<()> {
            writeln!(
                writer,
                "round,engine,floor,calls,successes,rejects,failures,acceptance"
            )?;
            for sample in &self.samples {
                writeln!(
                    writer,
                    "{},{},{:.6},{},{},{},{},{:.6}",
                    sample.round,
                    sample.engine,
                    sample.floor,
                    sample.counters.calls,
                    sample.counters.successes,
                    sample.counters.rejects,
                    sample.counters.failures,
                    sample.counters.acceptance_rate()
                )?;
            }
            writer.flush()
        };
        write_all().map_err(|err| io_error(path, err))
    }

    /// Writes the per-strategy summary as pretty-printed JSON.
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), NsError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.summary()).map_err(|err| {
            NsError::Serde(
                ErrorInfo::new("metrics-serialize", err.to_string())
                    .with_context("path", path.display()),
            )
        })?;
        std::fs::write(path, json).map_err(|err| io_error(path, err))
    }
}

fn io_error(path: &Path, err: std::io::Error) -> NsError {
    NsError::Serde(
        ErrorInfo::new("metrics-write", err.to_string()).with_context("path", path.display()),
    )
}
