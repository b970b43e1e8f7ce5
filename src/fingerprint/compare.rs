//! Fingerprint similarity.

use super::Fingerprint;

/// Fingerprints whose durations differ by more than this never correlate.
pub const DURATION_TOLERANCE_SECS: f64 = 5.0;

const STD_EPSILON: f64 = 1e-10;

/// Similarity of two fingerprints in [0, 1].
///
/// Equal hashes short-circuit to 1.0 regardless of duration. Otherwise the
/// durations must agree within [`DURATION_TOLERANCE_SECS`] and the signatures
/// must have the same length; the score is the Pearson correlation of the
/// z-scored signatures mapped from [-1, 1] onto [0, 1].
pub fn compare(a: &Fingerprint, b: &Fingerprint) -> f64 {
    if a.hash == b.hash {
        return 1.0;
    }

    if (a.duration - b.duration).abs() > DURATION_TOLERANCE_SECS {
        return 0.0;
    }

    if a.signature.len() != b.signature.len() || a.signature.is_empty() {
        return 0.0;
    }

    let za = z_scores(&a.signature);
    let zb = z_scores(&b.signature);

    let n = za.len() as f64;
    let correlation = za.iter().zip(&zb).map(|(x, y)| x * y).sum::<f64>() / n;

    if !correlation.is_finite() {
        return 0.0;
    }

    ((correlation + 1.0) / 2.0).clamp(0.0, 1.0)
}

fn z_scores(values: &[f64]) -> Vec<f64> {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = variance.sqrt() + STD_EPSILON;
    values.iter().map(|v| (v - mean) / std).collect()
}
