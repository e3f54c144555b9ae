//! Library-grade special functions for the precise math mode.
//!
//! Thin f32 shims over `statrs`' f64 gamma-family implementations. The
//! precision loss from the final f64 -> f32 narrowing is below one ulp of
//! the f32 result, so this path serves as the accuracy reference for the
//! approximate kernels.

use statrs::function::gamma::{digamma as digamma_f64, ln_gamma};

/// Digamma (psi) at library accuracy.
#[inline]
#[must_use]
pub fn digamma(x: f32) -> f32 {
    digamma_f64(f64::from(x)) as f32
}

/// Log-gamma at library accuracy.
#[inline]
#[must_use]
pub fn log_gamma(x: f32) -> f32 {
    ln_gamma(f64::from(x)) as f32
}

/// `exp(x)` via libm.
#[inline]
#[must_use]
pub fn exponential(x: f32) -> f32 {
    x.exp()
}

/// `x^p` via libm.
#[inline]
#[must_use]
pub fn powf(x: f32, p: f32) -> f32 {
    x.powf(p)
}
