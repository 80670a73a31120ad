// Distribution functions for the rank-based tests and post-hoc procedures
//
// Normal and chi-square tails come straight from statrs special functions.
// The studentized range (Tukey HSD) and the many-to-one multivariate t
// (Dunnett) have no closed form; both are computed as nested integrals over
// the standard normal and the scaled chi distribution of the pooled standard
// deviation, using composite Simpson quadrature.

use crate::error::{AnalysisError, Result};
use statrs::function::erf::{erfc, erfc_inv};
use statrs::function::gamma::{checked_gamma_ur, ln_gamma};
use std::f64::consts::{PI, SQRT_2};

const Z_LIMIT: f64 = 8.0;
const Z_INTERVALS: usize = 200;
const S_INTERVALS: usize = 200;

/// Standard normal CDF
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

/// Standard normal upper tail, accurate far into the tail
pub fn norm_sf(x: f64) -> f64 {
    0.5 * erfc(x / SQRT_2)
}

/// Standard normal quantile
pub fn norm_ppf(p: f64) -> f64 {
    -SQRT_2 * erfc_inv(2.0 * p)
}

fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// Upper tail of the chi-square distribution with `df` degrees of freedom
pub fn chi2_sf(x: f64, df: f64) -> Result<f64> {
    if x <= 0.0 {
        return Ok(1.0);
    }
    checked_gamma_ur(df / 2.0, x / 2.0)
        .map(|p| p.clamp(0.0, 1.0))
        .map_err(|e| AnalysisError::numerical("chi-square tail", e.to_string()))
}

/// Composite Simpson rule over [a, b]; `intervals` is rounded up to even
fn simpson<F: Fn(f64) -> f64>(f: F, a: f64, b: f64, intervals: usize) -> f64 {
    let n = intervals + intervals % 2;
    let h = (b - a) / n as f64;
    let mut sum = f(a) + f(b);
    for i in 1..n {
        let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
        sum += weight * f(a + i as f64 * h);
    }
    sum * h / 3.0
}

/// Density of s = sqrt(χ²_ν / ν)
fn scaled_chi_pdf(s: f64, nu: f64) -> f64 {
    if s < 0.0 || (s == 0.0 && nu > 1.0) {
        return 0.0;
    }
    let log_s_term = if nu == 1.0 { 0.0 } else { (nu - 1.0) * s.ln() };
    let log_density = 0.5 * nu * nu.ln() - ln_gamma(nu / 2.0) - (0.5 * nu - 1.0) * 2f64.ln()
        + log_s_term
        - 0.5 * nu * s * s;
    log_density.exp()
}

/// Average `inner(s)` over the scaled chi distribution with `df` degrees of freedom
///
/// Large `df` collapses the distribution onto s = 1.
fn integrate_over_scale<F: Fn(f64) -> f64>(inner: F, df: f64) -> f64 {
    if df > 5000.0 {
        return inner(1.0);
    }
    let spread = 12.0 / (2.0 * df).sqrt();
    let lower = (1.0 - spread).max(0.0);
    let upper = 1.0 + spread;
    simpson(|s| scaled_chi_pdf(s, df) * inner(s), lower, upper, S_INTERVALS)
}

/// CDF of the range of `k` independent standard normals
fn normal_range_cdf(q: f64, k: usize) -> f64 {
    if q <= 0.0 {
        return 0.0;
    }
    let others = (k - 1) as i32;
    let integral = simpson(
        |z| norm_pdf(z) * (norm_cdf(z) - norm_cdf(z - q)).powi(others),
        -Z_LIMIT,
        Z_LIMIT,
        Z_INTERVALS,
    );
    (k as f64 * integral).clamp(0.0, 1.0)
}

/// CDF of the studentized range distribution Q(k, df)
pub fn studentized_range_cdf(q: f64, k: usize, df: f64) -> Result<f64> {
    if k < 2 {
        return Err(AnalysisError::insufficient(
            "studentized range",
            format!("need at least 2 means, got {}", k),
        ));
    }
    if df < 1.0 {
        return Err(AnalysisError::insufficient(
            "studentized range",
            format!("need at least 1 degree of freedom, got {}", df),
        ));
    }
    if !q.is_finite() {
        return Ok(if q > 0.0 { 1.0 } else { 0.0 });
    }
    let p = integrate_over_scale(|s| normal_range_cdf(q * s, k), df);
    Ok(p.clamp(0.0, 1.0))
}

/// Upper quantile of the studentized range: q such that P(Q <= q) = `level`
pub fn studentized_range_ppf(level: f64, k: usize, df: f64) -> Result<f64> {
    let mut lo = 0.0;
    let mut hi = 1.0;
    while studentized_range_cdf(hi, k, df)? < level {
        hi *= 2.0;
        if hi > 1e6 {
            return Err(AnalysisError::numerical(
                "studentized range quantile",
                "search did not bracket the requested level",
            ));
        }
    }
    for _ in 0..40 {
        let mid = 0.5 * (lo + hi);
        if studentized_range_cdf(mid, k, df)? < level {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Ok(0.5 * (lo + hi))
}

/// P(max_j |T_j| < c) for Dunnett's many-to-one comparisons
///
/// `lambdas[j] = sqrt(n_j / (n_j + n_control))`; the correlation between
/// comparisons j and l is `lambdas[j] * lambdas[l]`.
pub fn dunnett_cdf(c: f64, lambdas: &[f64], df: f64) -> Result<f64> {
    if lambdas.is_empty() {
        return Err(AnalysisError::insufficient(
            "Dunnett",
            "need at least one comparison against the control",
        ));
    }
    if lambdas.iter().any(|&l| !(0.0..1.0).contains(&l)) {
        return Err(AnalysisError::numerical(
            "Dunnett",
            "correlation factors must lie in [0, 1)",
        ));
    }
    if c <= 0.0 {
        return Ok(0.0);
    }
    if !c.is_finite() {
        return Ok(1.0);
    }

    let scales: Vec<f64> = lambdas.iter().map(|&l| (1.0 - l * l).sqrt()).collect();
    let inner = |s: f64| {
        let bound = c * s;
        simpson(
            |z| {
                let product: f64 = lambdas
                    .iter()
                    .zip(scales.iter())
                    .map(|(&l, &scale)| {
                        norm_cdf((bound - l * z) / scale) - norm_cdf((-bound - l * z) / scale)
                    })
                    .product();
                norm_pdf(z) * product
            },
            -Z_LIMIT,
            Z_LIMIT,
            Z_INTERVALS,
        )
    };

    Ok(integrate_over_scale(inner, df).clamp(0.0, 1.0))
}
