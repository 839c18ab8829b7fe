//! Harmonic mixing-law estimation over type frequency distributions.
//!
//! Natural-language token frequencies roughly follow a power law: the
//! frequency at rank `r` behaves like `k1 * r^(-theta)`. Fitting that
//! law to a post's (or conversation's) type frequency distribution
//! yields a compact five-number summary of its vocabulary mixing:
//!
//! - `k1`: the fitted frequency of the top-ranked type
//! - `theta`: the decay exponent of the fit
//! - `entropy`: Shannon entropy of the empirical distribution,
//!   normalized to `[0, 1]` by the log vocabulary size
//! - `n_avg`: the rank at which the fitted frequency decays to one,
//!   clamped to the observed vocabulary, i.e. the effective number of
//!   active types
//! - `m_avg`: the token mass the fit predicts over those active ranks
//!
//! The fit is an ordinary least-squares line through the log-log
//! rank/frequency points. Distributions too small to constrain a
//! slope degrade instead of failing: a single type fits a flat line
//! through itself, an empty distribution yields all zeros.

use std::collections::BTreeMap;

/// Fitted mixing-law parameters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MixingParams {
    pub k1: f64,
    pub theta: f64,
    pub entropy: f64,
    pub n_avg: f64,
    pub m_avg: f64,
}

/// Fits the mixing law to a type frequency distribution.
pub fn mixing(dist: &BTreeMap<String, usize>) -> MixingParams {
    let freqs = rank_frequencies(dist);
    let n = freqs.len();
    if n == 0 {
        return MixingParams::default();
    }

    let (k1, theta) = fit_power_law(&freqs);
    let entropy = normalized_entropy(&freqs);

    // frequencies are rank-sorted, so a non-positive decay can only be
    // a flat fit; every observed rank counts as active
    let n_avg = if theta <= 0.0 {
        n as f64
    } else {
        k1.powf(1.0 / theta).clamp(1.0, n as f64)
    };
    let m_avg = (1..=n_avg.floor() as usize)
        .map(|r| k1 * (r as f64).powf(-theta))
        .sum();

    MixingParams {
        k1,
        theta,
        entropy,
        n_avg,
        m_avg,
    }
}

/// Per-type surprisal `-ln(f_r / M)` in rank order, where `M` is the
/// total token count. One entry per type; empty for an empty
/// distribution.
pub fn novelty(dist: &BTreeMap<String, usize>) -> Vec<f64> {
    let freqs = rank_frequencies(dist);
    let mass: f64 = freqs.iter().sum();
    if mass == 0.0 {
        return Vec::new();
    }
    freqs.iter().map(|f| -(f / mass).ln()).collect()
}

/// Frequencies in descending rank order.
fn rank_frequencies(dist: &BTreeMap<String, usize>) -> Vec<f64> {
    let mut freqs: Vec<f64> = dist.values().map(|&f| f as f64).collect();
    freqs.sort_unstable_by(|a, b| b.total_cmp(a));
    freqs
}

/// Least-squares line through the log-log rank/frequency points,
/// returned as `(k1, theta)`. A single point fits a flat line.
fn fit_power_law(freqs: &[f64]) -> (f64, f64) {
    let n = freqs.len();
    if n == 1 {
        return (freqs[0], 0.0);
    }

    let xs: Vec<f64> = (1..=n).map(|r| (r as f64).ln()).collect();
    let ys: Vec<f64> = freqs.iter().map(|f| f.ln()).collect();
    let mx = xs.iter().sum::<f64>() / n as f64;
    let my = ys.iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var = 0.0;
    for (x, y) in xs.iter().zip(&ys) {
        cov += (x - mx) * (y - my);
        var += (x - mx) * (x - mx);
    }
    let slope = if var == 0.0 { 0.0 } else { cov / var };
    let k1 = (my - slope * mx).exp();
    (k1, -slope)
}

/// Shannon entropy of the empirical distribution normalized by
/// `ln(N)`; 0 below two types.
fn normalized_entropy(freqs: &[f64]) -> f64 {
    let n = freqs.len();
    if n < 2 {
        return 0.0;
    }
    let mass: f64 = freqs.iter().sum();
    let raw: f64 = freqs
        .iter()
        .map(|f| {
            let p = f / mass;
            p * p.ln()
        })
        .sum();
    -raw / (n as f64).ln()
}
