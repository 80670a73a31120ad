// Normality gate for parametric vs. non-parametric test selection
//
// Shapiro-Wilk W with Royston's polynomial approximations for the
// coefficients and the p-value (Algorithm AS R94, valid for 3 <= n <= 5000).
//
// References:
// - Shapiro, S. S., & Wilk, M. B. (1965). An analysis of variance test for
//   normality. Biometrika, 52(3-4), 591-611.
// - Royston, P. (1995). Remark AS R94: A remark on Algorithm AS 181.
//   Applied Statistics, 44(4), 547-551.

use crate::error::{AnalysisError, Result};
use crate::stats::distributions::{norm_ppf, norm_sf};
use std::cmp::Ordering;
use std::f64::consts::{FRAC_1_SQRT_2, PI};

const TEST_NAME: &str = "Shapiro-Wilk";

const C1: [f64; 6] = [0.0, 0.221157, -0.147981, -2.07119, 4.434685, -2.706056];
const C2: [f64; 6] = [0.0, 0.042981, -0.293762, -1.752461, 5.682633, -3.582633];
const C3: [f64; 4] = [0.544, -0.39978, 0.025054, -6.714e-4];
const C4: [f64; 4] = [1.3822, -0.77857, 0.062767, -0.0020322];
const C5: [f64; 4] = [-1.5861, -0.31082, -0.083751, 0.0038915];
const C6: [f64; 3] = [-0.4803, -0.082676, 0.0030302];
const G: [f64; 2] = [-2.273, 0.459];

/// Outcome of a single-sample normality test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalityResult {
    /// Test statistic (W for Shapiro-Wilk; NaN when undefined)
    pub statistic: f64,
    pub pvalue: f64,
}

impl NormalityResult {
    /// Whether the sample is consistent with normality at `alpha`
    pub fn passes(&self, alpha: f64) -> bool {
        self.pvalue >= alpha
    }
}

/// A per-sample normality test
pub trait NormalityTest {
    fn name(&self) -> &'static str;

    fn test(&self, sample: &[f64]) -> Result<NormalityResult>;
}

/// Shapiro-Wilk test
#[derive(Debug, Clone, Copy, Default)]
pub struct ShapiroWilk;

impl NormalityTest for ShapiroWilk {
    fn name(&self) -> &'static str {
        TEST_NAME
    }

    fn test(&self, sample: &[f64]) -> Result<NormalityResult> {
        shapiro_wilk(sample)
    }
}

/// Normality check over a collection of samples
///
/// Returns `false` at the first sample that fails at `alpha` without testing
/// the rest, and `true` only when every sample passes.
pub fn all_normal<T, S>(tester: &T, samples: &[S], alpha: f64) -> Result<bool>
where
    T: NormalityTest + ?Sized,
    S: AsRef<[f64]>,
{
    for (index, sample) in samples.iter().enumerate() {
        let result = tester.test(sample.as_ref())?;
        if !result.passes(alpha) {
            tracing::debug!(
                "{} rejects normality of sample {} (p={:.4})",
                tester.name(),
                index,
                result.pvalue
            );
            return Ok(false);
        }
    }
    Ok(true)
}

/// Shapiro-Wilk W statistic and p-value
///
/// A sample with zero range has no defined W; it is reported with p = 0 so
/// that it fails any normality gate.
pub fn shapiro_wilk(data: &[f64]) -> Result<NormalityResult> {
    let n = data.len();
    if n < 3 {
        return Err(AnalysisError::insufficient(
            TEST_NAME,
            format!("need at least 3 observations, got {}", n),
        ));
    }
    if data.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::InvalidInput(format!(
            "{} input contains non-finite values",
            TEST_NAME
        )));
    }
    if n > 5000 {
        tracing::warn!("{}: p-value may be inaccurate for n={} > 5000", TEST_NAME, n);
    }

    let mut x = data.to_vec();
    x.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    if x[n - 1] - x[0] <= f64::EPSILON * x[n - 1].abs().max(1.0) {
        return Ok(NormalityResult {
            statistic: f64::NAN,
            pvalue: 0.0,
        });
    }

    if n == 3 {
        let mean = x.iter().sum::<f64>() / 3.0;
        let ss: f64 = x.iter().map(|v| (v - mean).powi(2)).sum();
        let numerator = FRAC_1_SQRT_2 * (x[2] - x[0]);
        let w = (numerator * numerator / ss).clamp(0.75, 1.0);
        let p = 1.0 - (6.0 / PI) * w.sqrt().acos();
        return Ok(NormalityResult {
            statistic: w,
            pvalue: p.clamp(0.0, 1.0),
        });
    }

    let a = coefficients(n)?;

    let half = n / 2;
    let numerator: f64 = (0..half).map(|i| a[i] * (x[n - 1 - i] - x[i])).sum();
    let mean = x.iter().sum::<f64>() / n as f64;
    let ss: f64 = x.iter().map(|v| (v - mean).powi(2)).sum();
    let w = (numerator * numerator / ss).min(1.0);

    Ok(NormalityResult {
        statistic: w,
        pvalue: pvalue(w, n),
    })
}

/// Horner evaluation of c[0] + c[1]·x + c[2]·x² + …
fn poly(c: &[f64], x: f64) -> f64 {
    c.iter().rev().fold(0.0, |acc, &coef| acc * x + coef)
}

/// Royston's approximation of the Shapiro-Wilk coefficients (lower half)
fn coefficients(n: usize) -> Result<Vec<f64>> {
    let half = n / 2;
    let an = n as f64;

    let m: Vec<f64> = (1..=half)
        .map(|i| norm_ppf((i as f64 - 0.375) / (an + 0.25)))
        .collect();
    let summ2 = 2.0 * m.iter().map(|v| v * v).sum::<f64>();
    let ssumm2 = summ2.sqrt();
    let rsn = 1.0 / an.sqrt();

    let a1 = poly(&C1, rsn) - m[0] / ssumm2;

    let (corrected, fac_sq, one_minus) = if n > 5 {
        let a2 = -m[1] / ssumm2 + poly(&C2, rsn);
        (
            vec![a1, a2],
            summ2 - 2.0 * m[0] * m[0] - 2.0 * m[1] * m[1],
            1.0 - 2.0 * a1 * a1 - 2.0 * a2 * a2,
        )
    } else {
        (vec![a1], summ2 - 2.0 * m[0] * m[0], 1.0 - 2.0 * a1 * a1)
    };

    if fac_sq <= 0.0 || one_minus <= 0.0 {
        return Err(AnalysisError::numerical(
            TEST_NAME,
            format!("coefficient normalisation failed for n={}", n),
        ));
    }
    let fac = (fac_sq / one_minus).sqrt();

    let mut a: Vec<f64> = m.iter().map(|mi| -mi / fac).collect();
    a[..corrected.len()].copy_from_slice(&corrected);
    Ok(a)
}

fn pvalue(w: f64, n: usize) -> f64 {
    let w1 = 1.0 - w;
    if w1 <= 0.0 {
        return 1.0;
    }
    let y = w1.ln();
    let an = n as f64;

    let (z_input, m, s) = if n <= 11 {
        let gamma = poly(&G, an);
        if y >= gamma {
            return 0.0;
        }
        (-(gamma - y).ln(), poly(&C3, an), poly(&C4, an).exp())
    } else {
        let xx = an.ln();
        (y, poly(&C5, xx), poly(&C6, xx).exp())
    };

    norm_sf((z_input - m) / s).clamp(0.0, 1.0)
}
