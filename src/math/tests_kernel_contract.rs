//! Math Kernel Contract Tests
//!
//! The approximation coefficients are part of the numeric contract: the
//! learner's outputs are only reproducible across builds if every kernel
//! evaluates exactly the published polynomials. Each FALSIFY test below
//! re-evaluates the closed form with the coefficients written out inline
//! and requires bit-identical agreement with the shipped kernels, then a
//! property pass checks the scalar and 4-lane paths agree elementwise.

use proptest::prelude::*;

use super::*;

const PINNED_INPUTS: [f32; 12] = [
    0.015, 0.1, 0.35, 0.5, 1.0, 1.5, 2.0, 3.25, 7.5, 42.0, 313.0, 9871.5,
];

// ============================================================================
// FALSIFY-KERNEL-001: fastlog2 coefficients
// ============================================================================

#[test]
fn falsify_kernel_001_fastlog2_pinned() {
    for &x in &PINNED_INPUTS {
        let vx = x.to_bits();
        let mx = f32::from_bits((vx & 0x007F_FFFF) | 0x3F00_0000);
        let y = vx as f32 * (1.0 / (1 << 23) as f32);
        let expect = y - 124.22544637 - 1.498030302 * mx - 1.72587999 / (0.3520887068 + mx);
        assert_eq!(
            fast::fastlog2(x).to_bits(),
            expect.to_bits(),
            "FALSIFIED KERNEL-001: fastlog2({x}) drifted from pinned coefficients"
        );
    }
}

// ============================================================================
// FALSIFY-KERNEL-002: fastpow2 coefficients (and fastexp's 1/ln2 scaling)
// ============================================================================

#[test]
fn falsify_kernel_002_fastpow2_pinned() {
    for &x in &PINNED_INPUTS {
        for p in [-x, x] {
            let offset: f32 = if p < 0.0 { 1.0 } else { 0.0 };
            let clipp = if p < -126.0 { -126.0 } else { p };
            let w = clipp as i32;
            let z = clipp - w as f32 + offset;
            let expect = f32::from_bits(
                (((1u32 << 23) as f32)
                    * (clipp + 121.2740838 + 27.7280233 / (4.84252568 - z) - 1.49012907 * z))
                    as u32,
            );
            assert_eq!(
                fast::fastpow2(p).to_bits(),
                expect.to_bits(),
                "FALSIFIED KERNEL-002: fastpow2({p}) drifted from pinned coefficients"
            );
        }
    }
}

#[test]
fn falsify_kernel_002_fastexp_scaling() {
    for &x in &PINNED_INPUTS {
        assert_eq!(
            fast::fastexp(-x).to_bits(),
            fast::fastpow2(1.442695040 * -x).to_bits(),
            "FALSIFIED KERNEL-002: fastexp({}) != fastpow2(p/ln2)",
            -x
        );
    }
}

// ============================================================================
// FALSIFY-KERNEL-003: fastdigamma closed form
// ============================================================================

#[test]
fn falsify_kernel_003_fastdigamma_pinned() {
    for &x in &PINNED_INPUTS {
        let t = 2.0 + x;
        let expect =
            -(1.0 + 2.0 * x) / (x * (1.0 + x)) - (13.0 + 6.0 * x) / (12.0 * t * t) + fast::fastlog(t);
        assert_eq!(
            fast::fastdigamma(x).to_bits(),
            expect.to_bits(),
            "FALSIFIED KERNEL-003: fastdigamma({x}) drifted from pinned closed form"
        );
    }
}

// ============================================================================
// FALSIFY-KERNEL-004: fastlgamma closed form
// ============================================================================

#[test]
fn falsify_kernel_004_fastlgamma_pinned() {
    for &x in &PINNED_INPUTS {
        let logterm = fast::fastlog(x * (1.0 + x) * (2.0 + x));
        let q = 3.0 + x;
        let expect = -2.081061466 - x + 0.0833333 / q - logterm + (2.5 + x) * fast::fastlog(q);
        assert_eq!(
            fast::fastlgamma(x).to_bits(),
            expect.to_bits(),
            "FALSIFIED KERNEL-004: fastlgamma({x}) drifted from pinned closed form"
        );
    }
}

// ============================================================================
// FALSIFY-KERNEL-005: lane equivalence of the array transforms
// ============================================================================

fn fast_reference_expdigammify(g: &[f32]) -> Vec<f32> {
    let mut out = g.to_vec();
    expdigammify(MathMode::FastApprox, &mut out);
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn falsify_kernel_005_prop_expdigammify_lane_equivalence(
        g in prop::collection::vec(0.01_f32..100.0, 1..33),
    ) {
        let scalar = fast_reference_expdigammify(&g);
        let mut lanes = g.clone();
        expdigammify(MathMode::Simd, &mut lanes);

        for k in 0..g.len() {
            let rel = ((lanes[k] - scalar[k]) / scalar[k]).abs();
            prop_assert!(
                rel < 1e-5,
                "FALSIFIED KERNEL-005: lane {k} diverged: {} vs {} (rel {rel})",
                lanes[k], scalar[k]
            );
        }
    }

    #[test]
    fn falsify_kernel_005_prop_expdigammify_2_lane_equivalence(
        pairs in prop::collection::vec((0.01_f32..100.0, -3.0_f32..3.0), 1..33),
    ) {
        let g: Vec<f32> = pairs.iter().map(|p| p.0).collect();
        let norm: Vec<f32> = pairs.iter().map(|p| p.1).collect();

        let mut scalar = g.clone();
        expdigammify_2(MathMode::FastApprox, &mut scalar, &norm);
        let mut lanes = g.clone();
        expdigammify_2(MathMode::Simd, &mut lanes, &norm);

        for k in 0..g.len() {
            let rel = ((lanes[k] - scalar[k]) / scalar[k]).abs();
            prop_assert!(
                rel < 1e-5,
                "FALSIFIED KERNEL-005: lane {k} diverged: {} vs {} (rel {rel})",
                lanes[k], scalar[k]
            );
        }
    }

    // ========================================================================
    // FALSIFY-KERNEL-006: approximations track the precise path
    // ========================================================================

    #[test]
    fn falsify_kernel_006_prop_fastdigamma_tracks_precise(x in 0.05_f32..200.0) {
        let approx = fast::fastdigamma(x);
        let exact = precise::digamma(x);
        prop_assert!(
            (approx - exact).abs() < 1e-2,
            "FALSIFIED KERNEL-006: fastdigamma({x}) = {approx}, precise = {exact}"
        );
    }

    #[test]
    fn falsify_kernel_006_prop_fastexp_tracks_precise(p in -80.0_f32..20.0) {
        let approx = fast::fastexp(p);
        let exact = p.exp();
        let rel = if exact > 1e-30 { ((approx - exact) / exact).abs() } else { 0.0 };
        prop_assert!(
            rel < 1e-3,
            "FALSIFIED KERNEL-006: fastexp({p}) = {approx}, precise = {exact} (rel {rel})"
        );
    }
}
