//! Attention-matrix blending for heatmap display.
//!
//! Raw transformer attention is usually too diffuse to read: most rows sit
//! close to uniform and the heatmap washes out. Blending the raw scores
//! with a temperature-sharpened copy keeps the original magnitudes while
//! lifting the peaks enough to see.
//!
//! The blended rows deliberately do not sum to 1 — this is a display
//! matrix, not a probability distribution.

/// Multiplier applied to raw scores before the row softmax.
const SHARPEN_SCALE: f32 = 10.0;
/// Blend weights: most of the signal stays raw, the sharpened copy adds
/// contrast on top.
const RAW_WEIGHT: f32 = 0.7;
const SHARP_WEIGHT: f32 = 0.3;

/// Blend each row of `raw` with its temperature-sharpened softmax:
/// `0.7 * raw + 0.3 * softmax(10 * raw)`. Output shape equals input shape.
pub fn blend_attention(raw: &[Vec<f32>]) -> Vec<Vec<f32>> {
    raw.iter()
        .map(|row| {
            let sharpened = scaled_softmax(row, SHARPEN_SCALE);
            row.iter()
                .zip(sharpened.iter())
                .map(|(r, s)| RAW_WEIGHT * r + SHARP_WEIGHT * s)
                .collect()
        })
        .collect()
}

/// Numerically stable softmax of `scale * row`.
fn scaled_softmax(row: &[f32], scale: f32) -> Vec<f32> {
    if row.is_empty() {
        return Vec::new();
    }
    let max = row
        .iter()
        .map(|v| v * scale)
        .fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = row.iter().map(|v| (v * scale - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|v| v / sum).collect()
}
