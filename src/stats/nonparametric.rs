// Rank-based tests for samples that fail the normality gate
//
// Small untied samples use exact null distributions (subset-sum counting);
// everything else uses the tie-corrected normal or chi-square approximation.
//
// References:
// - Wilcoxon, F. (1945). Individual comparisons by ranking methods.
//   Biometrics Bulletin, 1(6), 80-83.
// - Mann, H. B., & Whitney, D. R. (1947). On a test of whether one of two
//   random variables is stochastically larger than the other.
// - Kruskal, W. H., & Wallis, W. A. (1952). Use of ranks in one-criterion
//   variance analysis. JASA, 47(260), 583-621.
// - Friedman, M. (1937). The use of ranks to avoid the assumption of
//   normality implicit in the analysis of variance. JASA, 32(200), 675-701.

use crate::error::{AnalysisError, Result};
use crate::stats::distributions::{chi2_sf, norm_sf};
use crate::stats::ranks::{average_ranks, tie_sum};
use crate::stats::TestStatistic;

/// Largest number of non-zero differences for the exact signed-rank distribution
const WILCOXON_EXACT_MAX: usize = 50;

/// Exact Mann-Whitney distribution is used when the smaller sample is this small
const MANN_WHITNEY_EXACT_MAX: usize = 8;

/// Upper bound on the larger sample for the exact Mann-Whitney distribution
const MANN_WHITNEY_EXACT_LARGER_MAX: usize = 50;

/// Wilcoxon signed-rank test on paired observations
///
/// Zero differences are discarded. The statistic is min(W+, W-).
pub fn wilcoxon_signed_rank(a: &[f64], b: &[f64]) -> Result<TestStatistic> {
    const TEST: &str = "Wilcoxon signed-rank test";

    if a.len() != b.len() {
        return Err(AnalysisError::InvalidInput(format!(
            "{} needs equal sample sizes, got {} and {}",
            TEST,
            a.len(),
            b.len()
        )));
    }

    let diffs: Vec<f64> = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| x - y)
        .filter(|d| *d != 0.0)
        .collect();
    let n = diffs.len();
    if n == 0 {
        return Err(AnalysisError::insufficient(
            TEST,
            "all paired differences are zero",
        ));
    }

    let magnitudes: Vec<f64> = diffs.iter().map(|d| d.abs()).collect();
    let ranks = average_ranks(&magnitudes);
    let w_plus: f64 = diffs
        .iter()
        .zip(ranks.iter())
        .filter(|(d, _)| **d > 0.0)
        .map(|(_, r)| r)
        .sum();
    let nf = n as f64;
    let w_minus = nf * (nf + 1.0) / 2.0 - w_plus;
    let statistic = w_plus.min(w_minus);

    let ties = tie_sum(&magnitudes);
    let pvalue = if ties == 0.0 && n <= WILCOXON_EXACT_MAX {
        let counts = signed_rank_counts(n);
        let total: f64 = counts.iter().sum();
        // statistic is integral without ties
        let upto = statistic.round() as usize;
        let lower: f64 = counts[..=upto].iter().sum();
        (2.0 * lower / total).min(1.0)
    } else {
        let mean = nf * (nf + 1.0) / 4.0;
        let variance = nf * (nf + 1.0) * (2.0 * nf + 1.0) / 24.0 - ties / 48.0;
        if variance <= 0.0 {
            return Err(AnalysisError::numerical(TEST, "zero variance"));
        }
        let z = (statistic - mean) / variance.sqrt();
        (2.0 * norm_sf(z.abs())).min(1.0)
    };

    Ok(TestStatistic { statistic, pvalue })
}

/// Number of subsets of {1..n} for each possible rank sum
fn signed_rank_counts(n: usize) -> Vec<f64> {
    let max_sum = n * (n + 1) / 2;
    let mut counts = vec![0.0; max_sum + 1];
    counts[0] = 1.0;
    for rank in 1..=n {
        for s in (rank..=max_sum).rev() {
            counts[s] += counts[s - rank];
        }
    }
    counts
}

/// Mann-Whitney U test on independent samples
///
/// The statistic is U for sample `a`.
pub fn mann_whitney_u(a: &[f64], b: &[f64]) -> Result<TestStatistic> {
    const TEST: &str = "Mann Whitney U test";

    let (n1, n2) = (a.len(), b.len());
    if n1 == 0 || n2 == 0 {
        return Err(AnalysisError::insufficient(TEST, "both samples must be non-empty"));
    }

    let combined: Vec<f64> = a.iter().chain(b.iter()).copied().collect();
    let ranks = average_ranks(&combined);
    let r1: f64 = ranks[..n1].iter().sum();

    let (n1f, n2f) = (n1 as f64, n2 as f64);
    let u1 = r1 - n1f * (n1f + 1.0) / 2.0;
    let u2 = n1f * n2f - u1;
    let u_max = u1.max(u2);

    let ties = tie_sum(&combined);
    let exact = n1.min(n2) <= MANN_WHITNEY_EXACT_MAX && n1.max(n2) <= MANN_WHITNEY_EXACT_LARGER_MAX;
    let pvalue = if ties == 0.0 && exact {
        let counts = rank_sum_counts(n1.min(n2), n1 + n2);
        let total: f64 = counts.iter().sum();
        // P(U >= u_max) by symmetry equals P(U <= u_min)
        let u_min = (n1f * n2f - u_max).round() as usize;
        let lower: f64 = counts[..=u_min].iter().sum();
        (2.0 * lower / total).min(1.0)
    } else {
        let n = n1f + n2f;
        let mean = n1f * n2f / 2.0;
        let variance = n1f * n2f / 12.0 * ((n + 1.0) - ties / (n * (n - 1.0)));
        if variance <= 0.0 {
            return Err(AnalysisError::numerical(TEST, "zero variance (all values tied)"));
        }
        let z = (u_max - mean - 0.5) / variance.sqrt();
        (2.0 * norm_sf(z)).min(1.0)
    };

    Ok(TestStatistic {
        statistic: u1,
        pvalue,
    })
}

/// Null distribution of U for a sample of size `m` out of `total` untied ranks
///
/// Index u holds the number of size-m subsets whose rank sum is u + m(m+1)/2.
fn rank_sum_counts(m: usize, total: usize) -> Vec<f64> {
    let max_u = m * (total - m);
    // counts[k][u]: subsets of size k from the ranks seen so far, U offset by k(k+1)/2
    let mut counts = vec![vec![0.0; max_u + 1]; m + 1];
    counts[0][0] = 1.0;
    for item in 0..total {
        // choosing element `item` (0-based) as the k-th member adds item - (k - 1) to U
        for k in (1..=m.min(item + 1)).rev() {
            let shift = item + 1 - k;
            for u in (shift..=max_u).rev() {
                counts[k][u] += counts[k - 1][u - shift];
            }
        }
    }
    counts.swap_remove(m)
}

/// Kruskal-Wallis H test on independent samples
pub fn kruskal_wallis<S: AsRef<[f64]>>(samples: &[S]) -> Result<TestStatistic> {
    const TEST: &str = "Kruskal Wallis";

    if samples.len() < 2 {
        return Err(AnalysisError::insufficient(
            TEST,
            format!("need at least 2 groups, got {}", samples.len()),
        ));
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
    let mut h = 0.0;
    for sample in samples {
        let len = sample.as_ref().len();
        let rank_sum: f64 = ranks[offset..offset + len].iter().sum();
        h += rank_sum * rank_sum / len as f64;
        offset += len;
    }
    h = 12.0 / (n * (n + 1.0)) * h - 3.0 * (n + 1.0);

    let correction = 1.0 - tie_sum(&combined) / (n * n * n - n);
    if correction <= 0.0 {
        return Err(AnalysisError::numerical(TEST, "all numbers are identical"));
    }
    let statistic = h / correction;
    let pvalue = chi2_sf(statistic, (samples.len() - 1) as f64)?;

    Ok(TestStatistic { statistic, pvalue })
}

/// Friedman test for repeated measures: each sample is one treatment,
/// position i across samples is block (subject) i
pub fn friedman<S: AsRef<[f64]>>(samples: &[S]) -> Result<TestStatistic> {
    const TEST: &str = "Friedman";

    let k = samples.len();
    if k < 3 {
        return Err(AnalysisError::insufficient(
            TEST,
            format!("need at least 3 groups, got {}", k),
        ));
    }
    let n = samples[0].as_ref().len();
    if samples.iter().any(|s| s.as_ref().len() != n) {
        return Err(AnalysisError::InvalidInput(format!(
            "{} needs equal sample sizes (one observation per subject and group)",
            TEST
        )));
    }
    if n == 0 {
        return Err(AnalysisError::insufficient(TEST, "no subjects"));
    }

    let mut rank_sums = vec![0.0; k];
    let mut ties = 0.0;
    for block in 0..n {
        let row: Vec<f64> = samples.iter().map(|s| s.as_ref()[block]).collect();
        for (sum, rank) in rank_sums.iter_mut().zip(average_ranks(&row)) {
            *sum += rank;
        }
        ties += tie_sum(&row);
    }

    let (kf, nf) = (k as f64, n as f64);
    let ssbn: f64 = rank_sums.iter().map(|r| r * r).sum();
    let correction = 1.0 - ties / (kf * (kf * kf - 1.0) * nf);
    if correction <= 0.0 {
        return Err(AnalysisError::numerical(TEST, "every block is fully tied"));
    }
    let statistic =
        (12.0 / (kf * nf * (kf + 1.0)) * ssbn - 3.0 * nf * (kf + 1.0)) / correction;
    let pvalue = chi2_sf(statistic, kf - 1.0)?;

    Ok(TestStatistic { statistic, pvalue })
}
