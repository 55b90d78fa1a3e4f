//! Deterministic k-means over embedding vectors.
//!
//! Centroids are seeded from the first `k` input vectors rather than at
//! random, so identical input always clusters identically.

/// Upper bound on assignment/update rounds.
const MAX_ROUNDS: usize = 20;

/// `ceil(sqrt(n / 2))`, clamped to `2..=5`.
pub fn cluster_count(n: usize) -> usize {
    ((n as f64 / 2.0).sqrt().ceil() as usize).clamp(2, 5)
}

/// Cluster `vectors` into at most `k` groups; returns a cluster index per vector.
///
/// With fewer vectors than `k`, each vector seeds its own cluster. A cluster
/// that loses all its members keeps its previous centroid.
pub fn kmeans(vectors: &[Vec<f32>], k: usize) -> Vec<usize> {
    let k = k.min(vectors.len());
    if k == 0 {
        return Vec::new();
    }

    let mut centroids: Vec<Vec<f32>> = vectors[..k].to_vec();
    let mut assignments: Vec<usize> = vec![usize::MAX; vectors.len()];

    for round in 0..MAX_ROUNDS {
        let mut changed = false;
        for (i, vector) in vectors.iter().enumerate() {
            let nearest = nearest_centroid(vector, &centroids);
            if nearest != assignments[i] {
                assignments[i] = nearest;
                changed = true;
            }
        }

        if !changed {
            tracing::trace!(round, "k-means converged");
            break;
        }

        recompute_centroids(vectors, &assignments, &mut centroids);
    }

    assignments
}

fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Index of the closest centroid; ties go to the lower index.
fn nearest_centroid(vector: &[f32], centroids: &[Vec<f32>]) -> usize {
    let mut best = 0;
    let mut best_dist = f32::INFINITY;
    for (c, centroid) in centroids.iter().enumerate() {
        let dist = squared_distance(vector, centroid);
        if dist < best_dist {
            best = c;
            best_dist = dist;
        }
    }
    best
}

fn recompute_centroids(vectors: &[Vec<f32>], assignments: &[usize], centroids: &mut [Vec<f32>]) {
    for (c, centroid) in centroids.iter_mut().enumerate() {
        let members: Vec<&Vec<f32>> = vectors
            .iter()
            .zip(assignments)
            .filter(|(_, a)| **a == c)
            .map(|(v, _)| v)
            .collect();
        if members.is_empty() {
            continue;
        }

        let dims = centroid.len();
        let mut sum = vec![0.0f32; dims];
        for member in &members {
            for (s, x) in sum.iter_mut().zip(member.iter()) {
                *s += x;
            }
        }
        let count = members.len() as f32;
        *centroid = sum.into_iter().map(|s| s / count).collect();
    }
}
