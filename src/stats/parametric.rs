// Parametric tests: paired t, pooled-variance t and one-way ANOVA
//
// Statistics are computed in f64; two-sided t and upper-tail F p-values come
// from the exact statrs Student's t and Fisher-Snedecor distributions.

use crate::error::{AnalysisError, Result};
use crate::stats::TestStatistic;
use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};
use statrs::statistics::Statistics;

/// Paired t-test on matched observations; statistic is t for `a - b`
pub fn paired_t_test(a: &[f64], b: &[f64]) -> Result<TestStatistic> {
    const TEST: &str = "paired t-test";

    if a.len() != b.len() {
        return Err(AnalysisError::InvalidInput(format!(
            "{} needs equal sample sizes, got {} and {}",
            TEST,
            a.len(),
            b.len()
        )));
    }
    if a.len() < 2 {
        return Err(AnalysisError::insufficient(
            TEST,
            format!("need at least 2 pairs, got {}", a.len()),
        ));
    }

    let diffs: Vec<f64> = a.iter().zip(b.iter()).map(|(x, y)| x - y).collect();
    let n = diffs.len() as f64;
    let se = (diffs.iter().variance() / n).sqrt();
    if se <= 0.0 {
        return Err(AnalysisError::numerical(
            TEST,
            "paired differences have zero variance",
        ));
    }

    let t = diffs.iter().mean() / se;
    finite(TEST, t, t_two_sided(TEST, t, n - 1.0)?)
}

/// Independent two-sample Student t-test (pooled variance); statistic is t
/// for `a - b`
pub fn unpaired_t_test(a: &[f64], b: &[f64]) -> Result<TestStatistic> {
    const TEST: &str = "unpaired t-test";

    if a.len() < 2 || b.len() < 2 {
        return Err(AnalysisError::insufficient(
            TEST,
            format!(
                "need at least 2 observations per sample, got {} and {}",
                a.len(),
                b.len()
            ),
        ));
    }

    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let df = n1 + n2 - 2.0;
    let pooled = ((n1 - 1.0) * a.iter().variance() + (n2 - 1.0) * b.iter().variance()) / df;
    let se = (pooled * (1.0 / n1 + 1.0 / n2)).sqrt();
    if se <= 0.0 {
        return Err(AnalysisError::numerical(TEST, "both samples have zero variance"));
    }

    let t = (a.iter().mean() - b.iter().mean()) / se;
    finite(TEST, t, t_two_sided(TEST, t, df)?)
}

/// One-way ANOVA F-test across all samples
pub fn one_way_anova<S: AsRef<[f64]>>(samples: &[S]) -> Result<TestStatistic> {
    const TEST: &str = "ANOVA";

    let k = samples.len();
    if k < 2 {
        return Err(AnalysisError::insufficient(
            TEST,
            format!("need at least 2 groups, got {}", k),
        ));
    }
    if samples.iter().any(|s| s.as_ref().is_empty()) {
        return Err(AnalysisError::insufficient(TEST, "every group must be non-empty"));
    }

    let total: usize = samples.iter().map(|s| s.as_ref().len()).sum();
    if total <= k {
        return Err(AnalysisError::insufficient(
            TEST,
            "no degrees of freedom left for the error term",
        ));
    }

    let grand_mean = samples.iter().flat_map(|s| s.as_ref().iter()).mean();
    let (ss_between, ss_within) = samples.iter().fold((0.0, 0.0), |(between, within), s| {
        let s = s.as_ref();
        let mean = s.iter().mean();
        let spread: f64 = s.iter().map(|v| (v - mean).powi(2)).sum();
        (
            between + s.len() as f64 * (mean - grand_mean).powi(2),
            within + spread,
        )
    });

    let df_between = (k - 1) as f64;
    let df_within = (total - k) as f64;
    if ss_within <= 0.0 {
        return Err(AnalysisError::numerical(TEST, "zero within-group variance"));
    }

    let f = (ss_between / df_between) / (ss_within / df_within);
    let dist = FisherSnedecor::new(df_between, df_within)
        .map_err(|e| AnalysisError::numerical(TEST, format!("F distribution: {}", e)))?;
    finite(TEST, f, dist.sf(f))
}

/// Two-sided p-value of `t` under Student's t with `df` degrees of freedom
fn t_two_sided(test: &str, t: f64, df: f64) -> Result<f64> {
    let dist = StudentsT::new(0.0, 1.0, df)
        .map_err(|e| AnalysisError::numerical(test, format!("t distribution: {}", e)))?;
    Ok((2.0 * dist.sf(t.abs())).min(1.0))
}

/// Reject NaN results instead of letting them reach the table
fn finite(test: &str, statistic: f64, pvalue: f64) -> Result<TestStatistic> {
    if pvalue.is_nan() || statistic.is_nan() {
        return Err(AnalysisError::numerical(test, "undefined statistic"));
    }
    Ok(TestStatistic {
        statistic,
        pvalue: pvalue.clamp(0.0, 1.0),
    })
}
