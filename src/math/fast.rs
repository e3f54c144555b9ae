//! Fast closed-form approximations over IEEE-754 binary32.
//!
//! These are the bit-twiddling rational/log approximations popularised by
//! the fastapprox family. They trade roughly four decimal digits of
//! accuracy for a large constant-factor speedup over libm, which is the
//! right trade for the inner loops of variational inference where every
//! gamma element passes through digamma and exp several times per
//! document.
//!
//! The polynomial coefficients are load-bearing: the vector kernels in
//! [`super::simd`] apply the same formulas lane-wise and must agree with
//! these scalar versions to within float rounding.

/// Approximate `log2(x)` for positive finite `x`.
///
/// Splits the float into mantissa and exponent via its bit pattern, then
/// corrects the mantissa with a small rational term.
#[inline]
#[must_use]
pub fn fastlog2(x: f32) -> f32 {
    let vx = x.to_bits();
    // Mantissa bits with the biased exponent forced to 126, i.e. m in [0.5, 1).
    let mx = f32::from_bits((vx & 0x007F_FFFF) | 0x3F00_0000);
    let y = vx as f32 * (1.0 / (1 << 23) as f32);

    y - 124.22544637 - 1.498030302 * mx - 1.72587999 / (0.3520887068 + mx)
}

/// Approximate natural log via [`fastlog2`].
#[inline]
#[must_use]
pub fn fastlog(x: f32) -> f32 {
    0.69314718 * fastlog2(x)
}

/// Approximate `2^p`.
///
/// Builds the result's bit pattern directly from a rational correction of
/// the fractional part; `p` is clipped at the subnormal boundary.
#[inline]
#[must_use]
pub fn fastpow2(p: f32) -> f32 {
    let offset: f32 = if p < 0.0 { 1.0 } else { 0.0 };
    let clipp = if p < -126.0 { -126.0 } else { p };
    let w = clipp as i32;
    let z = clipp - w as f32 + offset;

    let approx = ((1u32 << 23) as f32
        * (clipp + 121.2740838 + 27.7280233 / (4.84252568 - z) - 1.49012907 * z))
        as u32;
    f32::from_bits(approx)
}

/// Approximate `exp(p)` as `2^(p / ln 2)`.
#[inline]
#[must_use]
pub fn fastexp(p: f32) -> f32 {
    fastpow2(1.442695040 * p)
}

/// Approximate `x^p` for positive `x`.
#[inline]
#[must_use]
pub fn fastpow(x: f32, p: f32) -> f32 {
    fastpow2(p * fastlog2(x))
}

/// Approximate digamma for positive `x`.
///
/// Two recurrence steps folded into a rational term, then the asymptotic
/// `log(2 + x)` leading behaviour.
#[inline]
#[must_use]
pub fn fastdigamma(x: f32) -> f32 {
    let twopx = 2.0 + x;
    let logterm = fastlog(twopx);

    -(1.0 + 2.0 * x) / (x * (1.0 + x)) - (13.0 + 6.0 * x) / (12.0 * twopx * twopx) + logterm
}

/// Approximate log-gamma for positive `x`.
#[inline]
#[must_use]
pub fn fastlgamma(x: f32) -> f32 {
    let logterm = fastlog(x * (1.0 + x) * (2.0 + x));
    let xp3 = 3.0 + x;

    -2.081061466 - x + 0.0833333 / xp3 - logterm + (2.5 + x) * fastlog(xp3)
}
