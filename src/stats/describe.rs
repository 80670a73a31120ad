// Descriptive summaries for the console trace
//
// Uses trueno::Vector for SIMD mean/variance and aprender's DescriptiveStats
// for the median (R-7 quantile).

use crate::error::{AnalysisError, Result};
use aprender::stats::DescriptiveStats;
use serde::Serialize;
use std::fmt;
use trueno::Vector;

/// Summary of one sample after missing values were dropped
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleSummary {
    pub n: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator)
    pub stddev: f64,
    pub median: f64,
}

impl fmt::Display for SampleSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "n={} mean={:.4} sd={:.4} median={:.4}",
            self.n, self.mean, self.stddev, self.median
        )
    }
}

/// Summarise a sample
pub fn summarize(values: &[f64]) -> Result<SampleSummary> {
    if values.is_empty() {
        return Err(AnalysisError::insufficient("summary", "empty sample"));
    }

    let narrowed: Vec<f32> = values.iter().map(|&v| v as f32).collect();
    let vector = Vector::from_slice(&narrowed);

    let mean = vector
        .mean()
        .map_err(|e| AnalysisError::numerical("summary", format!("mean: {}", e)))?;

    // trueno reports population variance; rescale to the sample estimate
    let n = values.len();
    let stddev = if n > 1 {
        let population = vector
            .variance()
            .map_err(|e| AnalysisError::numerical("summary", format!("variance: {}", e)))?;
        (f64::from(population) * n as f64 / (n - 1) as f64).sqrt()
    } else {
        0.0
    };

    let median = DescriptiveStats::new(&vector)
        .quantile(0.5)
        .map_err(|e| AnalysisError::numerical("summary", format!("median: {}", e)))?;

    Ok(SampleSummary {
        n,
        mean: f64::from(mean),
        stddev,
        median: f64::from(median),
    })
}
