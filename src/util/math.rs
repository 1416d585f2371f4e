//! Numeric helpers shared by the scoring and consensus stages.

/// Euclidean distance between two points.
pub(crate) fn euclidean(a: (f32, f32), b: (f32, f32)) -> f32 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    (dx * dx + dy * dy).sqrt()
}

/// Arithmetic mean of the values, or `None` for an empty iterator.
pub(crate) fn mean<I>(values: I) -> Option<f32>
where
    I: IntoIterator<Item = f32>,
{
    let mut sum = 0.0f64;
    let mut count = 0usize;
    for value in values {
        sum += f64::from(value);
        count += 1;
    }
    if count == 0 {
        return None;
    }
    Some((sum / count as f64) as f32)
}

/// Pearson correlation coefficient of two equally long sequences.
///
/// Returns `None` when the lengths differ, the input is empty, or either
/// sequence has zero variance.
pub(crate) fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;

    let mut cov = 0.0f64;
    let mut var_a = 0.0f64;
    let mut var_b = 0.0f64;
    for (&va, &vb) in a.iter().zip(b) {
        let da = va - mean_a;
        let db = vb - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }

    let denom = (var_a * var_b).sqrt();
    if denom <= f64::EPSILON {
        return None;
    }
    Some(cov / denom)
}

/// Clamps a score into `[0, 1]`, mapping NaN to zero.
pub(crate) fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}
