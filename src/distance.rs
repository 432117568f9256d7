//! Distance kernels over dense/sparse pairs (spec §4.2).
//!
//! The dense kernels keep the teacher's hand-unrolled accumulator pattern
//! (`abkve::dot_product_unrolled`) for the one hot loop every index shares:
//! the pairwise reduction over two equal-length `f32` slices. Metric-specific
//! behavior (squaring, negation, normalization) wraps that shared reduction.

use crate::error::{Error, Result};

/// The supported distance metrics. "Smaller is closer" holds uniformly,
/// including for dot product, which is returned negated. Round-trips through
/// persistence as a plain `u32` tag via `to_tag`/`from_tag`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Euclidean,
    Cosine,
    Dot,
    Manhattan,
}

impl Metric {
    pub fn to_tag(self) -> u32 {
        match self {
            Metric::Euclidean => 0,
            Metric::Cosine => 1,
            Metric::Dot => 2,
            Metric::Manhattan => 3,
        }
    }

    pub fn from_tag(tag: u32) -> Result<Self> {
        match tag {
            0 => Ok(Metric::Euclidean),
            1 => Ok(Metric::Cosine),
            2 => Ok(Metric::Dot),
            3 => Ok(Metric::Manhattan),
            other => Err(Error::corrupt(format!("unknown metric tag {other}"))),
        }
    }
}

/// Sum of elementwise products. Hand-unrolled 8-wide to mirror how the
/// teacher's hot loop maps to one `VFMADD231PS` per iteration; the unsafe
/// zone is the full-chunk loop only, bounds proven by the chunk count.
#[inline(always)]
fn dot_unrolled(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let len = a.len();
    let chunks = len / 8;

    let mut acc0 = 0.0f32;
    let mut acc1 = 0.0f32;
    let mut acc2 = 0.0f32;
    let mut acc3 = 0.0f32;
    let mut acc4 = 0.0f32;
    let mut acc5 = 0.0f32;
    let mut acc6 = 0.0f32;
    let mut acc7 = 0.0f32;

    // SAFETY: `i*8 + 7 < chunks*8 <= len == a.len() == b.len()`.
    unsafe {
        for i in 0..chunks {
            let base = i * 8;
            acc0 += a.get_unchecked(base) * b.get_unchecked(base);
            acc1 += a.get_unchecked(base + 1) * b.get_unchecked(base + 1);
            acc2 += a.get_unchecked(base + 2) * b.get_unchecked(base + 2);
            acc3 += a.get_unchecked(base + 3) * b.get_unchecked(base + 3);
            acc4 += a.get_unchecked(base + 4) * b.get_unchecked(base + 4);
            acc5 += a.get_unchecked(base + 5) * b.get_unchecked(base + 5);
            acc6 += a.get_unchecked(base + 6) * b.get_unchecked(base + 6);
            acc7 += a.get_unchecked(base + 7) * b.get_unchecked(base + 7);
        }
    }

    let mut result = acc0 + acc1 + acc2 + acc3 + acc4 + acc5 + acc6 + acc7;
    for i in (chunks * 8)..len {
        result += a[i] * b[i];
    }
    result
}

fn check_dims(a: &[f32], b: &[f32]) -> Result<()> {
    if a.len() != b.len() {
        return Err(Error::invalid(format!(
            "dimension mismatch: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    Ok(())
}

/// Squared-then-rooted L2 distance. Always non-negative.
pub fn euclidean(a: &[f32], b: &[f32]) -> Result<f32> {
    check_dims(a, b)?;
    let mut acc = 0.0f32;
    for i in 0..a.len() {
        let d = a[i] - b[i];
        acc += d * d;
    }
    Ok(acc.sqrt())
}

/// `1 - cos_sim`. A zero-norm operand (on either side) returns distance 0,
/// matching spec §4.2's explicit carve-out rather than dividing by zero.
pub fn cosine(a: &[f32], b: &[f32]) -> Result<f32> {
    check_dims(a, b)?;
    let dot = dot_unrolled(a, b);
    let norm_a = dot_unrolled(a, a).sqrt();
    let norm_b = dot_unrolled(b, b).sqrt();
    if norm_a <= 1e-12 || norm_b <= 1e-12 {
        return Ok(0.0);
    }
    let cos_sim = dot / (norm_a * norm_b);
    Ok(1.0 - cos_sim)
}

/// Negated dot product, so "smaller is closer" holds for top-k heaps that
/// otherwise compare raw distances.
pub fn dot(a: &[f32], b: &[f32]) -> Result<f32> {
    check_dims(a, b)?;
    Ok(-dot_unrolled(a, b))
}

/// Sum of absolute elementwise differences.
pub fn manhattan(a: &[f32], b: &[f32]) -> Result<f32> {
    check_dims(a, b)?;
    let mut acc = 0.0f32;
    for i in 0..a.len() {
        acc += (a[i] - b[i]).abs();
    }
    Ok(acc)
}

/// Dispatches to the kernel named by `metric`.
pub fn compute(metric: Metric, a: &[f32], b: &[f32]) -> Result<f32> {
    match metric {
        Metric::Euclidean => euclidean(a, b),
        Metric::Cosine => cosine(a, b),
        Metric::Dot => dot(a, b),
        Metric::Manhattan => manhattan(a, b),
    }
}

/// L2-normalizes `v` in place. A zero (or near-zero) vector is left
/// unchanged rather than divided, matching the cosine zero-norm carve-out.
pub fn normalize_in_place(v: &mut [f32]) {
    let norm = dot_unrolled(v, v).sqrt();
    if norm > 1e-12 {
        let inv = 1.0 / norm;
        for x in v.iter_mut() {
            *x *= inv;
        }
    }
}

/// Returns an owned, L2-normalized copy of `v`.
pub fn normalized(v: &[f32]) -> Vec<f32> {
    let mut out = v.to_vec();
    normalize_in_place(&mut out);
    out
}
