//! Math kernels for variational inference.
//!
//! Three interchangeable accuracy modes drive every digamma, log-gamma,
//! exp, and pow evaluation on the hot paths:
//!
//! - [`MathMode::Precise`]: library-grade special functions (`statrs`).
//! - [`MathMode::FastApprox`]: closed-form binary32 approximations.
//! - [`MathMode::Simd`]: the fast-approx formulas over 4-wide lanes.
//!
//! On top of the kernels sit two array transforms, [`expdigammify`] and
//! [`expdigammify_2`], which turn Dirichlet pseudocounts into the
//! exponentiated expected-log geometry the inference loop works in.

pub mod fast;
pub mod precise;
pub mod simd;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TematicaError;

/// Values below this are clamped after the exp-digamma transforms.
pub const UNDERFLOW_THRESHOLD: f32 = 1.0e-10;

/// Kernel family used for digamma, log-gamma, exp, and pow.
///
/// Scalar calls under [`MathMode::Simd`] use the fast-approx kernels; the
/// vector kernels only exist for the array-wide transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MathMode {
    /// 4-wide lanes for array transforms, fast-approx for scalar calls.
    #[default]
    Simd,
    /// Library-grade accuracy (relative error below 1e-7).
    Precise,
    /// Closed-form binary32 approximations everywhere.
    FastApprox,
}

impl FromStr for MathMode {
    type Err = TematicaError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "simd" => Ok(Self::Simd),
            "accuracy" | "precise" => Ok(Self::Precise),
            "fast-approx" | "approx" => Ok(Self::FastApprox),
            _ => Err(TematicaError::invalid_config(
                "math-mode",
                token,
                "one of: simd, accuracy, precise, fast-approx, approx",
            )),
        }
    }
}

impl fmt::Display for MathMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simd => write!(f, "simd"),
            Self::Precise => write!(f, "precise"),
            Self::FastApprox => write!(f, "fast-approx"),
        }
    }
}

/// Digamma under the selected mode.
#[inline]
#[must_use]
pub fn digamma(mode: MathMode, x: f32) -> f32 {
    match mode {
        MathMode::Precise => precise::digamma(x),
        MathMode::FastApprox | MathMode::Simd => fast::fastdigamma(x),
    }
}

/// Log-gamma under the selected mode.
#[inline]
#[must_use]
pub fn log_gamma(mode: MathMode, x: f32) -> f32 {
    match mode {
        MathMode::Precise => precise::log_gamma(x),
        MathMode::FastApprox | MathMode::Simd => fast::fastlgamma(x),
    }
}

/// `exp(x)` under the selected mode.
#[inline]
#[must_use]
pub fn exponential(mode: MathMode, x: f32) -> f32 {
    match mode {
        MathMode::Precise => precise::exponential(x),
        MathMode::FastApprox | MathMode::Simd => fast::fastexp(x),
    }
}

/// `x^p` under the selected mode.
#[inline]
#[must_use]
pub fn powf(mode: MathMode, x: f32, p: f32) -> f32 {
    match mode {
        MathMode::Precise => precise::powf(x, p),
        MathMode::FastApprox | MathMode::Simd => fast::fastpow(x, p),
    }
}

fn expdigammify_scalar(
    gamma: &mut [f32],
    dg: impl Fn(f32) -> f32,
    ex: impl Fn(f32) -> f32,
) {
    let sum: f32 = gamma.iter().sum();
    let norm = dg(sum);
    for g in gamma.iter_mut() {
        *g = ex(dg(*g) - norm).max(UNDERFLOW_THRESHOLD);
    }
}

fn expdigammify_2_scalar(
    gamma: &mut [f32],
    norm: &[f32],
    dg: impl Fn(f32) -> f32,
    ex: impl Fn(f32) -> f32,
) {
    for (g, n) in gamma.iter_mut().zip(norm) {
        *g = ex(dg(*g) - n).max(UNDERFLOW_THRESHOLD);
    }
}

/// Replace each `gamma[i]` with
/// `max(eps, exp(digamma(gamma[i]) - digamma(sum gamma)))`.
pub fn expdigammify(mode: MathMode, gamma: &mut [f32]) {
    match mode {
        MathMode::Precise => {
            expdigammify_scalar(gamma, precise::digamma, precise::exponential);
        }
        MathMode::FastApprox => {
            expdigammify_scalar(gamma, fast::fastdigamma, fast::fastexp);
        }
        MathMode::Simd => simd::expdigammify(gamma, UNDERFLOW_THRESHOLD),
    }
}

/// Replace each `gamma[i]` with
/// `max(eps, exp(digamma(gamma[i]) - norm[i]))`.
pub fn expdigammify_2(mode: MathMode, gamma: &mut [f32], norm: &[f32]) {
    match mode {
        MathMode::Precise => {
            expdigammify_2_scalar(gamma, norm, precise::digamma, precise::exponential);
        }
        MathMode::FastApprox => {
            expdigammify_2_scalar(gamma, norm, fast::fastdigamma, fast::fastexp);
        }
        MathMode::Simd => simd::expdigammify_2(gamma, norm, UNDERFLOW_THRESHOLD),
    }
}


#[cfg(test)]
#[path = "tests_kernel_contract.rs"]
mod tests_kernel_contract;
