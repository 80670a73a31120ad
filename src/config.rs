// Configuration for hypothesis test selection and reporting
//
// The decision tree itself has no tunable branches; what varies between runs
// is the design (paired or not), how much gets reported, and where results go.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default workbook file name, written inside the output directory
pub const DEFAULT_OUTPUT_FILE: &str = "data_mining_results.xlsx";

/// Configuration for one analysis run
///
/// # Example
/// ```
/// use statmine::config::AnalysisConfig;
///
/// let config = AnalysisConfig::default();
/// assert_eq!(config.significance_level, 0.05);
/// assert!(config.report_all);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Threshold for the recording rule (p <= level is recorded)
    ///
    /// Also gates post-hoc procedures in the multi-group path, since those
    /// only run for recorded primary results.
    pub significance_level: f64,

    /// Alpha for the per-sample Shapiro-Wilk check
    ///
    /// A sample with p < alpha fails normality.
    pub normality_alpha: f64,

    /// Observations are matched across groups (same subjects)
    pub paired: bool,

    /// Record every tested parameter, not only significant ones
    pub report_all: bool,

    /// Workbook file name inside the output directory
    pub output_file_name: String,

    /// Record failing tests as skipped rows and keep going
    ///
    /// Schema mismatches and I/O failures still abort the run.
    pub skip_failed_tests: bool,

    /// Print per-sample descriptive summaries in the console trace
    pub describe: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            significance_level: 0.05,
            normality_alpha: 0.05,
            paired: false,
            report_all: true,
            output_file_name: DEFAULT_OUTPUT_FILE.to_string(),
            skip_failed_tests: false,
            describe: false,
        }
    }
}

impl AnalysisConfig {
    /// Only significant results, stricter recording threshold
    pub fn strict() -> Self {
        Self {
            significance_level: 0.01,
            report_all: false,
            ..Self::default()
        }
    }

    /// Report everything and keep going past per-parameter failures
    pub fn permissive() -> Self {
        Self {
            significance_level: 0.10,
            report_all: true,
            skip_failed_tests: true,
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file
    ///
    /// Missing keys fall back to [`AnalysisConfig::default`].
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AnalysisConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML analysis config")?;
        config.validate().map_err(|e| anyhow::anyhow!(e))?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.significance_level) {
            return Err(format!(
                "significance_level must be in [0, 1], got {}",
                self.significance_level
            ));
        }

        if !(0.0..=1.0).contains(&self.normality_alpha) {
            return Err(format!(
                "normality_alpha must be in [0, 1], got {}",
                self.normality_alpha
            ));
        }

        if self.output_file_name.trim().is_empty() {
            return Err("output_file_name must not be empty".to_string());
        }

        if !self.output_file_name.ends_with(".xlsx") {
            return Err(format!(
                "output_file_name must end with .xlsx, got {}",
                self.output_file_name
            ));
        }

        Ok(())
    }
}
