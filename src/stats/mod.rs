// Statistical procedures behind the test selector
//
// Everything runs in f64 on top of statrs: its t and F distributions for the
// parametric tests, its special functions for the rest.

pub mod describe;
pub mod distributions;
pub mod nonparametric;
pub mod normality;
pub mod parametric;
pub mod posthoc;
pub mod ranks;

pub use describe::{summarize, SampleSummary};
pub use normality::{all_normal, shapiro_wilk, NormalityResult, NormalityTest, ShapiroWilk};
pub use posthoc::{PairwiseComparison, PostHocResult};

use serde::Serialize;

/// Statistic and two-sided p-value of a primary test
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TestStatistic {
    pub statistic: f64,
    pub pvalue: f64,
}
