//! Brightness to step-index mapping.

use rand::Rng;

/// Neutral contrast: brightness passes through unchanged.
pub const NEUTRAL_CONTRAST: f32 = 1.0;

/// ITU-R BT.601 luminance of an RGB pixel, in `0.0..=255.0`.
///
/// Y = 0.299*R + 0.587*G + 0.114*B
#[inline]
pub fn luminance(r: u8, g: u8, b: u8) -> f32 {
    0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32
}

/// Stretch (or flatten) brightness around mid-gray.
///
/// `contrast` of 1.0 is neutral, larger values push brightness away from
/// 128, smaller values pull it toward 128. The result is clamped to
/// `0.0..=255.0`.
#[inline]
pub fn apply_contrast(brightness: f32, contrast: f32) -> f32 {
    ((brightness - 128.0) * contrast + 128.0).clamp(0.0, 255.0)
}

/// Map brightness to a step index in `0..steps`.
///
/// The `0..=255` range is split into `steps` equal segments; 255 itself
/// lands in the last one. `steps` of 0 is treated as 1.
#[inline]
pub fn map_to_step_index(brightness: f32, steps: usize) -> usize {
    let steps = steps.max(1);
    let segment = 255.0 / steps as f32;
    let index = (brightness / segment).floor();
    if index <= 0.0 {
        0
    } else {
        (index as usize).min(steps - 1)
    }
}

/// Randomly replace a step index for the color-flash effect.
///
/// With probability `amount / 100` the result is a uniformly random index
/// in `0..steps`; otherwise `index` comes back unchanged. Amounts of 100 or
/// more always flash.
pub fn apply_flash<R: Rng + ?Sized>(index: usize, amount: u8, steps: usize, rng: &mut R) -> usize {
    if amount == 0 || steps == 0 {
        return index;
    }
    let chance = f64::from(amount.min(100)) / 100.0;
    if rng.gen::<f64>() < chance {
        rng.gen_range(0..steps)
    } else {
        index
    }
}
