//! Values handed to the renderer. The store keeps what the user entered;
//! clamping happens only here.

use tracing::warn;

use crate::constants::display::*;

/// Gaussian blur radius for a stored blurriness (0-100 scale -> 0-50 radius)
pub fn blur_radius(blurriness: f64) -> f64 {
    if !blurriness.is_finite() {
        warn!(blurriness, "Non-finite blurriness, rendering without blur");
        return 0.0;
    }
    blurriness.clamp(0.0, MAX_BLURRINESS) / BLUR_RADIUS_DIVISOR
}

pub fn clamp_text_size(size: f64) -> f64 {
    if size.is_nan() {
        return MIN_TEXT_SIZE;
    }
    size.clamp(MIN_TEXT_SIZE, MAX_TEXT_SIZE)
}

pub fn clamp_text_weight(weight: f64) -> f64 {
    if weight.is_nan() {
        return MIN_TEXT_WEIGHT;
    }
    weight.clamp(MIN_TEXT_WEIGHT, MAX_TEXT_WEIGHT)
}
