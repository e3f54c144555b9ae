//! Four-wide single-precision renditions of the fast kernels.
//!
//! Each vector kernel applies the scalar formula from [`super::fast`]
//! lane-wise over `wide::f32x4` groups, so the two paths agree to within
//! float rounding. The array transforms walk a scalar prologue until the
//! data reaches a 16-byte boundary, stream full 4-lane groups, then finish
//! any residual elements scalar; the per-index normaliser of
//! [`expdigammify_2`] is read with unaligned 4-wide loads.

use bytemuck::cast;
use wide::{f32x4, i32x4, u32x4, CmpLt};

use super::fast;

#[inline]
fn vfastlog2(x: f32x4) -> f32x4 {
    let vx: u32x4 = cast(x);
    let mx: f32x4 = cast((vx & u32x4::splat(0x007F_FFFF)) | u32x4::splat(0x3F00_0000));
    let y = cast::<u32x4, i32x4>(vx).round_float() * f32x4::splat(1.0 / (1 << 23) as f32);

    y - f32x4::splat(124.22544637)
        - f32x4::splat(1.498030302) * mx
        - f32x4::splat(1.72587999) / (f32x4::splat(0.3520887068) + mx)
}

#[inline]
fn vfastlog(x: f32x4) -> f32x4 {
    f32x4::splat(0.69314718) * vfastlog2(x)
}

#[inline]
fn vfastpow2(p: f32x4) -> f32x4 {
    let offset = p.cmp_lt(f32x4::ZERO).blend(f32x4::ONE, f32x4::ZERO);
    let clipp = p.max(f32x4::splat(-126.0));
    let w = clipp.trunc_int();
    let z = clipp - w.round_float() + offset;

    let approx = f32x4::splat((1u32 << 23) as f32)
        * (clipp + f32x4::splat(121.2740838) + f32x4::splat(27.7280233) / (f32x4::splat(4.84252568) - z)
            - f32x4::splat(1.49012907) * z);
    cast(approx.trunc_int())
}

/// Four-lane rendition of [`fast::fastexp`].
#[inline]
pub(crate) fn vfastexp(p: f32x4) -> f32x4 {
    vfastpow2(f32x4::splat(1.442695040) * p)
}

/// Four-lane rendition of [`fast::fastdigamma`].
#[inline]
pub(crate) fn vfastdigamma(x: f32x4) -> f32x4 {
    let twopx = f32x4::splat(2.0) + x;
    let logterm = vfastlog(twopx);

    -(f32x4::ONE + f32x4::splat(2.0) * x) / (x * (f32x4::ONE + x))
        - (f32x4::splat(13.0) + f32x4::splat(6.0) * x)
            / (f32x4::splat(12.0) * twopx * twopx)
        + logterm
}

/// Scalar-prologue length to the first 16-byte boundary, and the index one
/// past the last full 4-lane group. f32 slices are at least 4-byte aligned,
/// so the prologue is 0..=3 elements.
#[inline]
fn lane_bounds(g: &[f32]) -> (usize, usize) {
    let misalign = (g.as_ptr() as usize) & 0xf;
    let head = if misalign == 0 {
        0
    } else {
        ((16 - misalign) >> 2).min(g.len())
    };
    let body_end = head + (g.len() - head) / 4 * 4;
    (head, body_end)
}

/// Vectorised `g[i] <- max(threshold, exp(digamma(g[i]) - digamma(sum g)))`.
///
/// The reduction accumulates lane sums in a 4-lane register, adds the
/// scalar-edge contribution, and collapses with a horizontal add.
pub(crate) fn expdigammify(gamma: &mut [f32], threshold: f32) {
    let (head, body_end) = lane_bounds(gamma);
    let mut extra_sum = 0.0_f32;
    let mut sum = f32x4::ZERO;

    for g in &mut gamma[..head] {
        extra_sum += *g;
        *g = fast::fastdigamma(*g);
    }
    let mut i = head;
    while i < body_end {
        let arg = f32x4::from(&gamma[i..i + 4]);
        sum += arg;
        gamma[i..i + 4].copy_from_slice(&vfastdigamma(arg).to_array());
        i += 4;
    }
    for g in &mut gamma[body_end..] {
        extra_sum += *g;
        *g = fast::fastdigamma(*g);
    }

    extra_sum += sum.reduce_add();
    let norm = fast::fastdigamma(extra_sum);
    let vnorm = f32x4::splat(norm);
    let vthreshold = f32x4::splat(threshold);

    for g in &mut gamma[..head] {
        *g = fast::fastexp(*g - norm).max(threshold);
    }
    let mut i = head;
    while i < body_end {
        let arg = vfastexp(f32x4::from(&gamma[i..i + 4]) - vnorm).max(vthreshold);
        gamma[i..i + 4].copy_from_slice(&arg.to_array());
        i += 4;
    }
    for g in &mut gamma[body_end..] {
        *g = fast::fastexp(*g - norm).max(threshold);
    }
}

/// Vectorised `g[i] <- max(threshold, exp(digamma(g[i]) - norm[i]))`.
pub(crate) fn expdigammify_2(gamma: &mut [f32], norm: &[f32], threshold: f32) {
    debug_assert_eq!(gamma.len(), norm.len());
    let (head, body_end) = lane_bounds(gamma);
    let vthreshold = f32x4::splat(threshold);

    for (g, n) in gamma[..head].iter_mut().zip(&norm[..head]) {
        *g = fast::fastexp(fast::fastdigamma(*g) - n).max(threshold);
    }
    let mut i = head;
    while i < body_end {
        let arg = vfastdigamma(f32x4::from(&gamma[i..i + 4]));
        let vn = f32x4::from(&norm[i..i + 4]);
        let out = vfastexp(arg - vn).max(vthreshold);
        gamma[i..i + 4].copy_from_slice(&out.to_array());
        i += 4;
    }
    for (g, n) in gamma[body_end..].iter_mut().zip(&norm[body_end..]) {
        *g = fast::fastexp(fast::fastdigamma(*g) - n).max(threshold);
    }
}
