//! statmine - automated statistical test selection for grouped behavioral data
//!
//! Given two or more groups of measurements organised as behavior ->
//! parameter -> sample, this library picks a hypothesis test per parameter
//! from the number of groups, normality (Shapiro-Wilk) and the pairing
//! design, runs post-hoc procedures after multi-group tests, and writes one
//! spreadsheet table per behavior.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod error;
pub mod report;
pub mod selection;
pub mod stats;
pub mod workbook;

pub use analysis::{AnalysisReport, Analyzer, BehaviorReport, ResultRow, RowOutcome};
pub use config::AnalysisConfig;
pub use dataset::{Behavior, Group, Sample};
pub use error::{AnalysisError, Result};
