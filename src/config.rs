//! Runtime configuration for the reconciler

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::reconciliation::ExcessBoundary;
use crate::types::{ReconError, ReconResult};

/// Settings shared by the scheduler, the flat-file collaborators and the
/// submission API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Root of the per-day input directories
    pub data_dir: PathBuf,
    /// Where unmatched and summary reports are written
    pub report_dir: PathBuf,
    /// Bank names recognised in statement file names
    pub bank_names: Vec<String>,
    /// Idle time between scheduler scans, in milliseconds
    pub poll_interval_ms: u64,
    /// Upper bound on requested reduction workers
    pub max_concurrency: usize,
    /// Upper bound on the number of days a single job may cover
    pub max_range_days: i64,
    pub excess_boundary: ExcessBoundary,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("testdata"),
            report_dir: PathBuf::from("report"),
            bank_names: vec!["BCA".to_string(), "BRI".to_string()],
            poll_interval_ms: 1_000,
            max_concurrency: 64,
            max_range_days: 366,
            excess_boundary: ExcessBoundary::Exact,
        }
    }
}

impl ReconcilerConfig {
    /// Build a configuration from `RECONCILER_*` environment variables,
    /// falling back to defaults for anything unset
    pub fn from_env() -> ReconResult<Self> {
        let defaults = Self::default();

        let config = Self {
            data_dir: env::var("RECONCILER_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            report_dir: env::var("RECONCILER_REPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.report_dir),
            bank_names: env::var("RECONCILER_BANKS")
                .map(|banks| {
                    banks
                        .split(',')
                        .map(str::trim)
                        .filter(|bank| !bank.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or(defaults.bank_names),
            poll_interval_ms: parse_var("RECONCILER_POLL_INTERVAL_MS")?
                .unwrap_or(defaults.poll_interval_ms),
            max_concurrency: parse_var("RECONCILER_MAX_CONCURRENCY")?
                .unwrap_or(defaults.max_concurrency),
            max_range_days: parse_var("RECONCILER_MAX_RANGE_DAYS")?
                .unwrap_or(defaults.max_range_days),
            excess_boundary: parse_var("RECONCILER_EXCESS_BOUNDARY")?
                .unwrap_or(defaults.excess_boundary),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the scheduler cannot run with
    pub fn validate(&self) -> ReconResult<()> {
        if self.bank_names.is_empty() {
            return Err(ReconError::Config(
                "At least one bank name is required".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(ReconError::Config(
                "Poll interval must be greater than zero".to_string(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(ReconError::Config(
                "Max concurrency must be at least 1".to_string(),
            ));
        }
        if self.max_range_days < 1 {
            return Err(ReconError::Config(
                "Max range must cover at least one day".to_string(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn parse_var<T>(name: &str) -> ReconResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| ReconError::Config(format!("{name}: {e}"))),
        Err(_) => Ok(None),
    }
}
