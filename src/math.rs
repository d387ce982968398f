//! Shared numeric helpers for embedding vectors and pixel statistics.

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if vectors have different lengths, are empty, or have zero magnitude.
///
/// # Returns
/// Cosine similarity in range [-1.0, 1.0]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Normalize a vector in place (L2 normalization).
///
/// If the vector has zero magnitude, it remains unchanged.
pub fn normalize_in_place(v: &mut [f32]) {
    let norm = l2_norm(v);
    if norm > 0.0 {
        for x in v {
            *x /= norm;
        }
    }
}

/// Compute L2 norm (magnitude) of a vector.
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Element-wise mean of equally sized vectors.
///
/// Returns `None` when the input is empty or the lengths disagree.
pub fn mean_vector(vectors: &[Vec<f32>]) -> Option<Vec<f32>> {
    let first = vectors.first()?;
    let dim = first.len();
    if vectors.iter().any(|v| v.len() != dim) {
        return None;
    }

    let mut acc = vec![0.0f32; dim];
    for v in vectors {
        for (slot, x) in acc.iter_mut().zip(v) {
            *slot += x;
        }
    }
    let count = vectors.len() as f32;
    for slot in &mut acc {
        *slot /= count;
    }
    Some(acc)
}

/// Arithmetic mean. Returns 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance (divides by `n`).
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}
