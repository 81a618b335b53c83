//! Conversions between hex, RGB and HSB color representations.
//!
//! HSB components are integers: hue in degrees `[0, 360)`, saturation and
//! brightness in percent `[0, 100]`. The editor sliders and the random palette
//! generator both work in HSB, while steps store plain RGB.

use palette::{FromColor, Hsv, Srgb};

/// An 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// A neutral gray with all three channels set to `level`.
    pub const fn gray(level: u8) -> Self {
        Self {
            r: level,
            g: level,
            b: level,
        }
    }

    /// Format as `#rrggbb` (lowercase).
    pub fn to_hex(self) -> String {
        format!("#{}", hex::encode([self.r, self.g, self.b]))
    }

    pub fn to_hsb(self) -> Hsb {
        rgb_to_hsb(self.r, self.g, self.b)
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Hue/saturation/brightness, rounded to whole units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Hsb {
    /// Hue in degrees, `0..360`
    pub h: u16,
    /// Saturation in percent, `0..=100`
    pub s: u8,
    /// Brightness in percent, `0..=100`
    pub b: u8,
}

impl Hsb {
    pub const fn new(h: u16, s: u8, b: u8) -> Self {
        Self { h, s, b }
    }

    pub fn to_rgb(self) -> Rgb {
        hsb_to_rgb(self.h as f32, self.s as f32, self.b as f32)
    }
}

/// Parse a 6-digit hex color, with or without a leading `#`.
///
/// Returns `None` for anything that is not exactly six hex digits
/// (3-digit shorthand is rejected).
pub fn hex_to_rgb(hex: &str) -> Option<Rgb> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 {
        return None;
    }

    let mut channels = [0u8; 3];
    hex::decode_to_slice(digits, &mut channels).ok()?;
    Some(Rgb::new(channels[0], channels[1], channels[2]))
}

/// Format channels as `#rrggbb`. Values outside `[0, 255]` are clamped.
pub fn rgb_to_hex(r: i32, g: i32, b: i32) -> String {
    Rgb::new(clamp_channel(r), clamp_channel(g), clamp_channel(b)).to_hex()
}

fn clamp_channel(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}

/// Convert RGB to HSB.
///
/// Grayscale input (no chroma) has hue 0, black has saturation 0.
pub fn rgb_to_hsb(r: u8, g: u8, b: u8) -> Hsb {
    let rgb: Srgb<f32> = Srgb::new(r, g, b).into_format();
    let hsv: Hsv = Hsv::from_color(rgb);

    let max = r.max(g).max(b);
    let hue = if max == r.min(g).min(b) {
        0.0
    } else {
        hsv.hue.into_positive_degrees()
    };
    let saturation = if max == 0 { 0.0 } else { hsv.saturation };

    Hsb {
        h: (hue.round() as u16) % 360,
        s: (saturation * 100.0).round().clamp(0.0, 100.0) as u8,
        b: (hsv.value * 100.0).round().clamp(0.0, 100.0) as u8,
    }
}

/// Convert HSB to RGB.
///
/// Hue wraps modulo 360 (negative values included); saturation and
/// brightness are clamped to `[0, 100]` first.
pub fn hsb_to_rgb(h: f32, s: f32, b: f32) -> Rgb {
    let hue = h.rem_euclid(360.0);
    let saturation = s.clamp(0.0, 100.0) / 100.0;
    let brightness = b.clamp(0.0, 100.0) / 100.0;

    let hsv: Hsv = Hsv::new(hue, saturation, brightness);
    let rgb: Srgb = Srgb::from_color(hsv);
    Rgb::new(to_channel(rgb.red), to_channel(rgb.green), to_channel(rgb.blue))
}

fn to_channel(component: f32) -> u8 {
    (component * 255.0).round().clamp(0.0, 255.0) as u8
}
