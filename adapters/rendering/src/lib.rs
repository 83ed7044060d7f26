#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Raster rendering adapter turning battle scenes into PNG frames.

mod canvas;
mod renderer;
mod sprites;

use image::Rgba;

pub use canvas::{Canvas, RasterCanvas};
pub use renderer::{load_font, Palette, SceneRenderer, CAPTION_SCALE};
pub use sprites::{SpriteAtlas, SpriteKey, ALL_SPRITE_KEYS};

/// RGBA color used when drawing frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates a new color from floating point channels.
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self::from_rgba_u8(red, green, blue, u8::MAX)
    }

    /// Creates a color from byte RGBA values.
    #[must_use]
    pub const fn from_rgba_u8(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: alpha as f32 / 255.0,
        }
    }

    /// Returns the same color with its alpha replaced.
    #[must_use]
    pub const fn with_alpha(self, alpha: f32) -> Self {
        Self { alpha, ..self }
    }

    /// Returns a new color lightened towards white by the provided amount.
    #[must_use]
    pub fn lighten(self, amount: f32) -> Self {
        let amount = amount.clamp(0.0, 1.0);

        Self {
            red: lighten_channel(self.red, amount),
            green: lighten_channel(self.green, amount),
            blue: lighten_channel(self.blue, amount),
            alpha: self.alpha,
        }
    }

    /// Converts the color into an 8-bit RGBA pixel.
    #[must_use]
    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([
            channel_to_u8(self.red),
            channel_to_u8(self.green),
            channel_to_u8(self.blue),
            channel_to_u8(self.alpha),
        ])
    }
}

fn lighten_channel(channel: f32, amount: f32) -> f32 {
    channel + (1.0 - channel) * amount
}

fn channel_to_u8(channel: f32) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_round_trip_is_lossless() {
        let color = Color::from_rgba_u8(0x35, 0x25, 0x3c, 0x80);
        assert_eq!(color.to_rgba().0, [0x35, 0x25, 0x3c, 0x80]);
    }

    #[test]
    fn lighten_moves_towards_white() {
        let color = Color::from_rgb_u8(0, 0, 0).lighten(0.5);
        assert!((color.red - 0.5).abs() < f32::EPSILON);
        assert_eq!(color.alpha, 1.0);
        assert_eq!(Color::from_rgb_u8(10, 20, 30).lighten(2.0).to_rgba().0, [255; 4]);
    }
}
