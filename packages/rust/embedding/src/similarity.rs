//! Cosine similarity over embedding vectors.

/// Cosine of the angle between `a` and `b`, in `[-1, 1]`.
///
/// Mismatched lengths and zero-magnitude vectors give `0.0`, never `NaN`.
/// Sums run in `f64` and the norms share one square root, so any non-zero
/// vector scores exactly `1.0` against itself.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let magnitude = (norm_a * norm_b).sqrt();
    if magnitude == 0.0 || !magnitude.is_finite() {
        return 0.0;
    }
    (dot / magnitude).clamp(-1.0, 1.0)
}

/// Symmetric N×N similarity matrix with a diagonal of exactly 1.
pub fn similarity_matrix(vectors: &[Vec<f32>]) -> Vec<Vec<f64>> {
    let n = vectors.len();
    let mut matrix = vec![vec![0.0f64; n]; n];
    for i in 0..n {
        matrix[i][i] = 1.0;
        for j in (i + 1)..n {
            let sim = cosine_similarity(&vectors[i], &vectors[j]);
            matrix[i][j] = sim;
            matrix[j][i] = sim;
        }
    }
    matrix
}
