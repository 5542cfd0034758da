//! Optimistic smoothing of per-sentence match scores
//!
//! A relation is often spread over neighbouring sentences, so a sentence
//! may borrow a discounted score from a strong match nearby. The smoothed
//! score at `index` is the largest `coeff[d] * scores[index ± d]` inside a
//! window centred on `index`.

use thiserror::Error;

const COEFFS_1: &[f32] = &[1.0];
const COEFFS_3: &[f32] = &[1.0, 0.5];
const COEFFS_5: &[f32] = &[1.0, 0.8, 0.5];
const COEFFS_7: &[f32] = &[1.0, 0.9, 0.75, 0.5];
const COEFFS_9: &[f32] = &[1.0, 0.95, 0.82, 0.70, 0.5];
const COEFFS_11: &[f32] = &[1.0, 0.98, 0.90, 0.82, 0.7, 0.5];

#[derive(Debug, Error, PartialEq)]
pub enum SmoothingError {
    #[error("Smoothing error: index {index} out of range for {len} scores")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Discount table for a window, `None` if the width is not supported
pub fn window_coefficients(window: usize) -> Option<&'static [f32]> {
    match window {
        1 => Some(COEFFS_1),
        3 => Some(COEFFS_3),
        5 => Some(COEFFS_5),
        7 => Some(COEFFS_7),
        9 => Some(COEFFS_9),
        11 => Some(COEFFS_11),
        _ => None,
    }
}

/// Smoothed score of sentence `index`
///
/// Supported windows are the odd widths 1 through 11. Any other width
/// falls back to 1, which returns `scores[index]` unchanged.
pub fn smoothed_score(scores: &[f32], index: usize, window: usize) -> Result<f32, SmoothingError> {
    if index >= scores.len() {
        return Err(SmoothingError::IndexOutOfRange {
            index,
            len: scores.len(),
        });
    }

    let (coeffs, window) = match window_coefficients(window) {
        Some(coeffs) => (coeffs, window),
        None => {
            log::info!("smoothing window {window} is not supported, using 1");
            (COEFFS_1, 1)
        }
    };

    let start = index.saturating_sub((window - 1) / 2);
    let end = scores.len().min(index + (window + 1) / 2);
    let best = (start..end)
        .map(|i| coeffs[index.abs_diff(i)] * scores[i])
        .fold(0.0, f32::max);
    Ok(best)
}

/// Smooth a whole document's scores at once
pub fn smooth_all(scores: &[f32], window: usize) -> Vec<f32> {
    (0..scores.len())
        .filter_map(|i| smoothed_score(scores, i, window).ok())
        .collect()
}
