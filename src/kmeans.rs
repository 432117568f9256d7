//! Lloyd's-algorithm k-means shared by IVF-Flat training (§4.6) and
//! per-subspace PQ codebook training (§4.7).
//!
//! Initialization is "evenly spread": `centroid[k] = sample[k * n / k_count]`
//! per spec, not random restarts or k-means++. Empty clusters leave their
//! centroid unchanged for that iteration, rather than being re-seeded.

/// Runs Lloyd's algorithm over `samples` (each of length `dim`), producing
/// `k_count` centroids (each of length `dim`). `iters` is the exact number
/// of Lloyd iterations to run (no early-stopping on convergence, matching
/// spec's fixed `train_iters`).
pub fn train(samples: &[f32], dim: usize, n: usize, k_count: usize, iters: usize) -> Vec<f32> {
    assert!(k_count > 0 && n > 0 && dim > 0);
    let mut centroids = vec![0.0f32; k_count * dim];
    for k in 0..k_count {
        let src = (k * n) / k_count;
        let src = src.min(n - 1);
        centroids[k * dim..(k + 1) * dim]
            .copy_from_slice(&samples[src * dim..(src + 1) * dim]);
    }

    let mut assignment = vec![0usize; n];
    for _ in 0..iters {
        // Assignment step: nearest centroid by squared Euclidean distance.
        for i in 0..n {
            let point = &samples[i * dim..(i + 1) * dim];
            let mut best_k = 0usize;
            let mut best_dist = f32::INFINITY;
            for k in 0..k_count {
                let c = &centroids[k * dim..(k + 1) * dim];
                let d = squared_euclidean(point, c);
                if d < best_dist {
                    best_dist = d;
                    best_k = k;
                }
            }
            assignment[i] = best_k;
        }

        // Update step: mean of assigned points. Empty clusters keep their
        // previous centroid unchanged for this iteration (spec §4.6).
        let mut sums = vec![0.0f32; k_count * dim];
        let mut counts = vec![0u32; k_count];
        for i in 0..n {
            let k = assignment[i];
            counts[k] += 1;
            let point = &samples[i * dim..(i + 1) * dim];
            let sum = &mut sums[k * dim..(k + 1) * dim];
            for d in 0..dim {
                sum[d] += point[d];
            }
        }
        for k in 0..k_count {
            if counts[k] == 0 {
                continue;
            }
            let inv = 1.0 / counts[k] as f32;
            let dst = &mut centroids[k * dim..(k + 1) * dim];
            let src = &sums[k * dim..(k + 1) * dim];
            for d in 0..dim {
                dst[d] = src[d] * inv;
            }
        }
    }

    centroids
}

#[inline]
fn squared_euclidean(a: &[f32], b: &[f32]) -> f32 {
    let mut acc = 0.0f32;
    for i in 0..a.len() {
        let d = a[i] - b[i];
        acc += d * d;
    }
    acc
}

/// Finds the index of the nearest centroid to `point` by squared Euclidean
/// distance. `centroids` is `k_count * dim` flat.
pub fn nearest_centroid(point: &[f32], centroids: &[f32], dim: usize, k_count: usize) -> usize {
    let mut best_k = 0usize;
    let mut best_dist = f32::INFINITY;
    for k in 0..k_count {
        let c = &centroids[k * dim..(k + 1) * dim];
        let d = squared_euclidean(point, c);
        if d < best_dist {
            best_dist = d;
            best_k = k;
        }
    }
    best_k
}
