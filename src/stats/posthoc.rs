//! Post-hoc multiple-comparison procedures
//!
//! Run after a recorded omnibus result to localise which groups differ:
//!
//! - **Tukey HSD**: all pairs after ANOVA, studentized range p-values and
//!   95% simultaneous confidence intervals for the mean differences
//! - **Dunnett**: every group against the control (sample 0) after ANOVA,
//!   two-sided adjusted p-values
//! - **Dunn**: all pairs after Kruskal-Wallis or Friedman, z-tests on mean
//!   ranks with tie correction and no p-value adjustment

use crate::error::{AnalysisError, Result};
use crate::selection::PostHocProcedure;
use crate::stats::distributions::{
    dunnett_cdf, norm_sf, studentized_range_cdf, studentized_range_ppf,
};
use crate::stats::ranks::{average_ranks, tie_sum};
use serde::Serialize;
use std::fmt;

/// Confidence level of Tukey intervals
const TUKEY_CONFIDENCE: f64 = 0.95;

/// One comparison between two groups
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairwiseComparison {
    pub first: String,
    pub second: String,
    /// Mean difference (Tukey), t (Dunnett) or z (Dunn)
    pub statistic: f64,
    pub pvalue: f64,
    /// Simultaneous confidence interval, Tukey only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<(f64, f64)>,
}

/// Output of one post-hoc procedure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostHocResult {
    pub procedure: PostHocProcedure,
    /// Group labels in dataset order
    pub labels: Vec<String>,
    pub comparisons: Vec<PairwiseComparison>,
}

impl PostHocResult {
    /// p-value for a pair regardless of orientation
    pub fn pvalue(&self, a: &str, b: &str) -> Option<f64> {
        self.comparisons
            .iter()
            .find(|c| (c.first == a && c.second == b) || (c.first == b && c.second == a))
            .map(|c| c.pvalue)
    }
}

impl fmt::Display for PostHocResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.procedure {
            PostHocProcedure::Dunn => {
                // symmetric p-value matrix, 1 on the diagonal
                let width = self.labels.iter().map(String::len).max().unwrap_or(0).max(10);
                write!(f, "{:width$}", "", width = width)?;
                for label in &self.labels {
                    write!(f, " {:>width$}", label, width = width)?;
                }
                for row in &self.labels {
                    write!(f, "\n{:width$}", row, width = width)?;
                    for col in &self.labels {
                        let p = if row == col {
                            1.0
                        } else {
                            self.pvalue(row, col).unwrap_or(f64::NAN)
                        };
                        write!(f, " {:>width$.6}", p, width = width)?;
                    }
                }
                Ok(())
            }
            PostHocProcedure::TukeyHsd => {
                write!(
                    f,
                    "{:<24} {:>12} {:>10} {:>12} {:>12}",
                    "Comparison", "Statistic", "p-value", "Lower CI", "Upper CI"
                )?;
                for c in &self.comparisons {
                    let (lower, upper) = c.interval.unwrap_or((f64::NAN, f64::NAN));
                    write!(
                        f,
                        "\n{:<24} {:>12.3} {:>10.3} {:>12.3} {:>12.3}",
                        format!("({} - {})", c.first, c.second),
                        c.statistic,
                        c.pvalue,
                        lower,
                        upper
                    )?;
                }
                Ok(())
            }
            PostHocProcedure::Dunnett => {
                write!(f, "{:<24} {:>12} {:>10}", "Comparison", "Statistic", "p-value")?;
                for c in &self.comparisons {
                    write!(
                        f,
                        "\n{:<24} {:>12.3} {:>10.3}",
                        format!("({} vs {})", c.first, c.second),
                        c.statistic,
                        c.pvalue
                    )?;
                }
                Ok(())
            }
        }
    }
}

/// Group sizes, means and pooled within-group mean square
struct Pooled {
    sizes: Vec<f64>,
    means: Vec<f64>,
    mse: f64,
    df: f64,
}

fn pooled<S: AsRef<[f64]>>(test: &str, samples: &[S]) -> Result<Pooled> {
    if samples.iter().any(|s| s.as_ref().is_empty()) {
        return Err(AnalysisError::insufficient(test, "every group must be non-empty"));
    }

    let sizes: Vec<f64> = samples.iter().map(|s| s.as_ref().len() as f64).collect();
    let means: Vec<f64> = samples
        .iter()
        .zip(sizes.iter())
        .map(|(s, n)| s.as_ref().iter().sum::<f64>() / n)
        .collect();

    let total: f64 = sizes.iter().sum();
    let df = total - samples.len() as f64;
    if df < 1.0 {
        return Err(AnalysisError::insufficient(
            test,
            "no degrees of freedom left for the error term",
        ));
    }

    let ss_within: f64 = samples
        .iter()
        .zip(means.iter())
        .map(|(s, m)| s.as_ref().iter().map(|v| (v - m).powi(2)).sum::<f64>())
        .sum();
    let mse = ss_within / df;
    if mse <= 0.0 {
        return Err(AnalysisError::numerical(test, "zero within-group variance"));
    }

    Ok(Pooled {
        sizes,
        means,
        mse,
        df,
    })
}

fn check_labels<S>(test: &str, labels: &[String], samples: &[S]) -> Result<()> {
    if labels.len() != samples.len() {
        return Err(AnalysisError::InvalidInput(format!(
            "{}: {} labels for {} samples",
            test,
            labels.len(),
            samples.len()
        )));
    }
    Ok(())
}

/// Tukey's honestly significant difference test (Tukey-Kramer for unequal n)
pub fn tukey_hsd<S: AsRef<[f64]>>(labels: &[String], samples: &[S]) -> Result<PostHocResult> {
    const TEST: &str = "Tukey HSD";
    check_labels(TEST, labels, samples)?;
    let k = samples.len();
    if k < 2 {
        return Err(AnalysisError::insufficient(TEST, "need at least 2 groups"));
    }

    let pooled = pooled(TEST, samples)?;
    let q_crit = studentized_range_ppf(TUKEY_CONFIDENCE, k, pooled.df)?;

    let mut comparisons = Vec::with_capacity(k * (k - 1) / 2);
    for i in 0..k {
        for j in (i + 1)..k {
            let diff = pooled.means[i] - pooled.means[j];
            let se = (pooled.mse / 2.0 * (1.0 / pooled.sizes[i] + 1.0 / pooled.sizes[j])).sqrt();
            let q = diff.abs() / se;
            let pvalue = 1.0 - studentized_range_cdf(q, k, pooled.df)?;
            comparisons.push(PairwiseComparison {
                first: labels[i].clone(),
                second: labels[j].clone(),
                statistic: diff,
                pvalue: pvalue.clamp(0.0, 1.0),
                interval: Some((diff - q_crit * se, diff + q_crit * se)),
            });
        }
    }

    Ok(PostHocResult {
        procedure: PostHocProcedure::TukeyHsd,
        labels: labels.to_vec(),
        comparisons,
    })
}

/// Dunnett's many-to-one test; `samples[0]` is the control
pub fn dunnett<S: AsRef<[f64]>>(labels: &[String], samples: &[S]) -> Result<PostHocResult> {
    const TEST: &str = "Dunnett";
    check_labels(TEST, labels, samples)?;
    if samples.len() < 2 {
        return Err(AnalysisError::insufficient(
            TEST,
            "need a control and at least one treatment group",
        ));
    }

    let pooled = pooled(TEST, samples)?;
    let n_control = pooled.sizes[0];
    let lambdas: Vec<f64> = pooled.sizes[1..]
        .iter()
        .map(|n| (n / (n + n_control)).sqrt())
        .collect();

    let mut comparisons = Vec::with_capacity(samples.len() - 1);
    for i in 1..samples.len() {
        let se = (pooled.mse * (1.0 / pooled.sizes[i] + 1.0 / n_control)).sqrt();
        let t = (pooled.means[i] - pooled.means[0]) / se;
        let pvalue = 1.0 - dunnett_cdf(t.abs(), &lambdas, pooled.df)?;
        comparisons.push(PairwiseComparison {
            first: labels[i].clone(),
            second: labels[0].clone(),
            statistic: t,
            pvalue: pvalue.clamp(0.0, 1.0),
            interval: None,
        });
    }

    Ok(PostHocResult {
        procedure: PostHocProcedure::Dunnett,
        labels: labels.to_vec(),
        comparisons,
    })
}

/// Dunn's test on mean ranks of the pooled samples, unadjusted
pub fn dunn<S: AsRef<[f64]>>(labels: &[String], samples: &[S]) -> Result<PostHocResult> {
    const TEST: &str = "Dunn";
    check_labels(TEST, labels, samples)?;
    if samples.len() < 2 {
        return Err(AnalysisError::insufficient(TEST, "need at least 2 groups"));
    }
    if samples.iter().any(|s| s.as_ref().is_empty()) {
        return Err(AnalysisError::insufficient(TEST, "every group must be non-empty"));
    }

    let combined: Vec<f64> = samples
        .iter()
        .flat_map(|s| s.as_ref().iter().copied())
        .collect();
    let ranks = average_ranks(&combined);
    let n = combined.len() as f64;

    let mut offset = 0;
    let mut mean_ranks = Vec::with_capacity(samples.len());
    let mut sizes = Vec::with_capacity(samples.len());
    for sample in samples {
        let len = sample.as_ref().len();
        mean_ranks.push(ranks[offset..offset + len].iter().sum::<f64>() / len as f64);
        sizes.push(len as f64);
        offset += len;
    }

    let spread = n * (n + 1.0) / 12.0 - tie_sum(&combined) / (12.0 * (n - 1.0));
    if spread <= 0.0 {
        return Err(AnalysisError::numerical(TEST, "all values are tied"));
    }

    let k = samples.len();
    let mut comparisons = Vec::with_capacity(k * (k - 1) / 2);
    for i in 0..k {
        for j in (i + 1)..k {
            let se = (spread * (1.0 / sizes[i] + 1.0 / sizes[j])).sqrt();
            let z = (mean_ranks[i] - mean_ranks[j]) / se;
            comparisons.push(PairwiseComparison {
                first: labels[i].clone(),
                second: labels[j].clone(),
                statistic: z,
                pvalue: (2.0 * norm_sf(z.abs())).min(1.0),
                interval: None,
            });
        }
    }

    Ok(PostHocResult {
        procedure: PostHocProcedure::Dunn,
        labels: labels.to_vec(),
        comparisons,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn three_groups() -> Vec<Vec<f64>> {
        vec![
            vec![10.0, 11.0, 9.5, 10.5, 10.2],
            vec![10.3, 9.8, 10.9, 10.1, 10.4],
            vec![14.0, 15.2, 13.8, 14.6, 14.9],
        ]
    }

    #[test]
    fn test_tukey_separates_shifted_group() {
        let result = tukey_hsd(&labels(&["a", "b", "c"]), &three_groups()).unwrap();
        assert_eq!(result.procedure, PostHocProcedure::TukeyHsd);
        assert_eq!(result.comparisons.len(), 3);

        assert!(result.pvalue("a", "b").unwrap() > 0.5);
        assert!(result.pvalue("a", "c").unwrap() < 0.001);
        assert!(result.pvalue("c", "b").unwrap() < 0.001);

        let ac = &result.comparisons[1];
        assert_eq!((ac.first.as_str(), ac.second.as_str()), ("a", "c"));
        assert!(ac.statistic < 0.0);
        let (lower, upper) = ac.interval.unwrap();
        assert!(lower < ac.statistic && ac.statistic < upper);
        assert!(upper < 0.0);
    }

    #[test]
    fn test_dunnett_compares_against_first_sample() {
        let result = dunnett(&labels(&["control", "b", "c"]), &three_groups()).unwrap();
        assert_eq!(result.procedure, PostHocProcedure::Dunnett);
        assert_eq!(result.comparisons.len(), 2);
        assert!(result.comparisons.iter().all(|c| c.second == "control"));

        assert!(result.pvalue("b", "control").unwrap() > 0.3);
        let c = &result.comparisons[1];
        assert!(c.statistic > 0.0);
        assert!(c.pvalue < 0.001);
    }

    #[test]
    fn test_dunn_all_pairs() {
        let groups = vec![
            vec![1.0, 2.0, 3.0, 4.0, 5.0],
            vec![6.0, 7.0, 8.0, 9.0, 10.0],
            vec![11.0, 12.0, 13.0, 14.0, 15.0],
        ];
        let result = dunn(&labels(&["a", "b", "c"]), &groups).unwrap();
        assert_eq!(result.procedure, PostHocProcedure::Dunn);
        assert_eq!(result.comparisons.len(), 3);

        // mean ranks 3, 8, 13; se = sqrt(20 · 2/5) = sqrt(8)
        let z_ab = -5.0 / 8f64.sqrt();
        assert!((result.comparisons[0].statistic - z_ab).abs() < 1e-9);
        assert!((result.pvalue("a", "b").unwrap() - 2.0 * norm_sf(z_ab.abs())).abs() < 1e-12);
        assert!(result.pvalue("a", "c").unwrap() < result.pvalue("a", "b").unwrap());
    }

    #[test]
    fn test_dunn_matrix_display() {
        let groups = vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]];
        let result = dunn(&labels(&["low", "high"]), &groups).unwrap();
        let table = result.to_string();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("low") && lines[0].contains("high"));
        assert!(lines[1].contains("1.000000"));
    }

    #[test]
    fn test_tukey_display_lists_pairs() {
        let result = tukey_hsd(&labels(&["a", "b", "c"]), &three_groups()).unwrap();
        let table = result.to_string();
        assert!(table.contains("(a - b)"));
        assert!(table.contains("(b - c)"));
        assert!(table.contains("Lower CI"));
    }

    #[test]
    fn test_label_count_mismatch() {
        assert!(tukey_hsd(&labels(&["a"]), &three_groups()).is_err());
    }

    #[test]
    fn test_zero_variance_rejected() {
        let groups = vec![vec![1.0, 1.0], vec![2.0, 2.0]];
        assert!(tukey_hsd(&labels(&["a", "b"]), &groups).is_err());
        assert!(dunnett(&labels(&["a", "b"]), &groups).is_err());
    }
}
