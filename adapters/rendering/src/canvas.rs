//! Drawing surface used by the scene renderer.

use std::io::Cursor;

use ab_glyph::{FontVec, PxScale};
use contraption_core::{Frame, RenderError};
use glam::Vec2;
use image::{imageops, ImageFormat, Rgba, RgbaImage};
use imageproc::{
    drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_text_mut, text_size},
    rect::Rect,
};

use crate::Color;

/// Raster drawing capability consumed by [`crate::SceneRenderer`].
///
/// Positions are canvas pixels with y pointing down. Rotations are radians
/// around the shape's centre.
pub trait Canvas {
    /// Canvas size in pixels.
    fn size(&self) -> (u32, u32);

    /// Fills a rectangle centred on `center`.
    fn fill_rect(&mut self, center: Vec2, size: Vec2, rotation: f32, color: Color);

    /// Fills a circle.
    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color);

    /// Draws `sprite` scaled to `size` and rotated around `center`.
    fn draw_sprite(&mut self, sprite: &RgbaImage, center: Vec2, size: Vec2, rotation: f32);

    /// Draws `text` centred on `center` with a pixel height of `scale`.
    fn draw_text(&mut self, text: &str, center: Vec2, scale: f32, color: Color, font: &FontVec);

    /// Copies a previously encoded frame onto the canvas, anchored at the top-left corner.
    fn draw_frame(&mut self, frame: &Frame) -> Result<(), RenderError>;

    /// Encodes the canvas as a PNG frame.
    fn export_png(&self) -> Result<Frame, RenderError>;
}

/// [`Canvas`] backed by an in-memory RGBA buffer.
#[derive(Clone, Debug)]
pub struct RasterCanvas {
    image: RgbaImage,
}

impl RasterCanvas {
    /// Creates a transparent canvas.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    /// Colour of a single pixel, if it lies on the canvas.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        self.image.get_pixel_checked(x, y).map(|pixel| {
            let [red, green, blue, alpha] = pixel.0;
            Color::from_rgba_u8(red, green, blue, alpha)
        })
    }

    /// Underlying image buffer.
    #[must_use]
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Visits every canvas pixel covered by a rotated rectangle and blends the
    /// colour returned by `sample` for its normalised sprite coordinates.
    fn blit(
        &mut self,
        center: Vec2,
        size: Vec2,
        rotation: f32,
        mut sample: impl FnMut(f32, f32) -> Option<Rgba<u8>>,
    ) {
        let half = size * 0.5;
        if half.x <= 0.0 || half.y <= 0.0 {
            return;
        }
        let reach = half.length();
        let (width, height) = self.image.dimensions();
        let min_x = (center.x - reach).floor().max(0.0) as u32;
        let min_y = (center.y - reach).floor().max(0.0) as u32;
        let max_x = ((center.x + reach).ceil().max(0.0) as u32).min(width);
        let max_y = ((center.y + reach).ceil().max(0.0) as u32).min(height);
        let (sin, cos) = rotation.sin_cos();

        for y in min_y..max_y {
            for x in min_x..max_x {
                let offset = Vec2::new(x as f32 + 0.5, y as f32 + 0.5) - center;
                let local = Vec2::new(
                    offset.x * cos + offset.y * sin,
                    -offset.x * sin + offset.y * cos,
                );
                if local.x.abs() > half.x || local.y.abs() > half.y {
                    continue;
                }
                let u = (local.x + half.x) / size.x;
                let v = (local.y + half.y) / size.y;
                if let Some(source) = sample(u, v) {
                    let target = self.image.get_pixel_mut(x, y);
                    *target = blend(*target, source);
                }
            }
        }
    }
}

impl Canvas for RasterCanvas {
    fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn fill_rect(&mut self, center: Vec2, size: Vec2, rotation: f32, color: Color) {
        let rgba = color.to_rgba();
        if rotation == 0.0 && rgba.0[3] == u8::MAX {
            let left = (center.x - size.x / 2.0).round() as i32;
            let top = (center.y - size.y / 2.0).round() as i32;
            let width = size.x.round() as u32;
            let height = size.y.round() as u32;
            if width > 0 && height > 0 {
                draw_filled_rect_mut(
                    &mut self.image,
                    Rect::at(left, top).of_size(width, height),
                    rgba,
                );
            }
            return;
        }
        self.blit(center, size, rotation, |_, _| Some(rgba));
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color) {
        draw_filled_circle_mut(
            &mut self.image,
            (center.x.round() as i32, center.y.round() as i32),
            radius.round() as i32,
            color.to_rgba(),
        );
    }

    fn draw_sprite(&mut self, sprite: &RgbaImage, center: Vec2, size: Vec2, rotation: f32) {
        let (sprite_width, sprite_height) = sprite.dimensions();
        if sprite_width == 0 || sprite_height == 0 {
            return;
        }
        self.blit(center, size, rotation, |u, v| {
            let x = ((u * sprite_width as f32) as u32).min(sprite_width - 1);
            let y = ((v * sprite_height as f32) as u32).min(sprite_height - 1);
            Some(*sprite.get_pixel(x, y))
        });
    }

    fn draw_text(&mut self, text: &str, center: Vec2, scale: f32, color: Color, font: &FontVec) {
        let scale = PxScale::from(scale);
        let (width, height) = text_size(scale, font, text);
        let x = (center.x - width as f32 / 2.0).round() as i32;
        let y = (center.y - height as f32 / 2.0).round() as i32;
        draw_text_mut(&mut self.image, color.to_rgba(), x, y, scale, font, text);
    }

    fn draw_frame(&mut self, frame: &Frame) -> Result<(), RenderError> {
        let decoded = image::load_from_memory_with_format(frame.png_bytes(), ImageFormat::Png)
            .map_err(|error| RenderError::Encoding(error.to_string()))?
            .to_rgba8();
        imageops::overlay(&mut self.image, &decoded, 0, 0);
        Ok(())
    }

    fn export_png(&self) -> Result<Frame, RenderError> {
        let mut bytes = Cursor::new(Vec::new());
        self.image
            .write_to(&mut bytes, ImageFormat::Png)
            .map_err(|error| RenderError::Encoding(error.to_string()))?;
        let (width, height) = self.image.dimensions();
        Ok(Frame::from_png(width, height, bytes.into_inner()))
    }
}

fn blend(target: Rgba<u8>, source: Rgba<u8>) -> Rgba<u8> {
    let alpha = u32::from(source.0[3]);
    if alpha == 255 {
        return source;
    }
    if alpha == 0 {
        return target;
    }
    let inverse = 255 - alpha;
    let mix = |s: u8, t: u8| ((u32::from(s) * alpha + u32::from(t) * inverse) / 255) as u8;
    let out_alpha = alpha + u32::from(target.0[3]) * inverse / 255;
    Rgba([
        mix(source.0[0], target.0[0]),
        mix(source.0[1], target.0[1]),
        mix(source.0[2], target.0[2]),
        out_alpha.min(255) as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Color = Color::from_rgb_u8(0xff, 0x00, 0x00);

    #[test]
    fn axis_aligned_fill_covers_exact_pixels() {
        let mut canvas = RasterCanvas::new(10, 10);
        canvas.fill_rect(Vec2::new(5.0, 5.0), Vec2::new(4.0, 2.0), 0.0, RED);

        assert_eq!(canvas.pixel(3, 4), Some(RED));
        assert_eq!(canvas.pixel(6, 5), Some(RED));
        assert_eq!(canvas.pixel(2, 4).map(|c| c.alpha), Some(0.0));
        assert_eq!(canvas.pixel(3, 6).map(|c| c.alpha), Some(0.0));
    }

    #[test]
    fn rotated_fill_turns_wide_rect_upright() {
        let mut canvas = RasterCanvas::new(20, 20);
        canvas.fill_rect(
            Vec2::new(10.0, 10.0),
            Vec2::new(12.0, 2.0),
            std::f32::consts::FRAC_PI_2,
            RED,
        );

        assert_eq!(canvas.pixel(10, 5), Some(RED), "covers vertical span");
        assert_eq!(canvas.pixel(5, 10).map(|c| c.alpha), Some(0.0));
    }

    #[test]
    fn translucent_fill_blends_with_background() {
        let mut canvas = RasterCanvas::new(4, 4);
        canvas.fill_rect(
            Vec2::new(2.0, 2.0),
            Vec2::new(4.0, 4.0),
            0.0,
            Color::from_rgb_u8(0, 0, 0),
        );
        canvas.fill_rect(
            Vec2::new(2.0, 2.0),
            Vec2::new(4.0, 4.0),
            0.0,
            Color::new(1.0, 1.0, 1.0, 0.5),
        );

        let pixel = canvas.image().get_pixel(1, 1).0;
        assert!((120..=135).contains(&pixel[0]), "got {pixel:?}");
        assert_eq!(pixel[3], 255);
    }

    #[test]
    fn sprites_are_scaled_to_requested_size() {
        let mut sprite = RgbaImage::new(2, 2);
        sprite.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        sprite.put_pixel(1, 0, Rgba([0, 255, 0, 255]));
        sprite.put_pixel(0, 1, Rgba([0, 0, 255, 255]));
        sprite.put_pixel(1, 1, Rgba([255, 255, 255, 255]));

        let mut canvas = RasterCanvas::new(8, 8);
        canvas.draw_sprite(&sprite, Vec2::new(4.0, 4.0), Vec2::new(8.0, 8.0), 0.0);

        assert_eq!(canvas.image().get_pixel(1, 1).0, [255, 0, 0, 255]);
        assert_eq!(canvas.image().get_pixel(6, 1).0, [0, 255, 0, 255]);
        assert_eq!(canvas.image().get_pixel(1, 6).0, [0, 0, 255, 255]);
        assert_eq!(canvas.image().get_pixel(6, 6).0, [255, 255, 255, 255]);
    }

    #[test]
    fn exported_frames_draw_back_identically() {
        let mut canvas = RasterCanvas::new(6, 6);
        canvas.fill_rect(
            Vec2::new(3.0, 3.0),
            Vec2::new(6.0, 6.0),
            0.0,
            Color::from_rgb_u8(0, 0, 0),
        );
        canvas.fill_rect(Vec2::new(3.0, 3.0), Vec2::new(2.0, 2.0), 0.0, RED);
        let frame = canvas.export_png().expect("canvas encodes");
        assert_eq!((frame.width(), frame.height()), (6, 6));

        let mut copy = RasterCanvas::new(6, 6);
        copy.draw_frame(&frame).expect("frame decodes");
        assert_eq!(copy.image(), canvas.image());
    }

    #[test]
    fn garbage_frames_are_rejected() {
        let mut canvas = RasterCanvas::new(2, 2);
        let frame = Frame::from_png(2, 2, b"not a png".to_vec());
        assert!(matches!(
            canvas.draw_frame(&frame),
            Err(RenderError::Encoding(_))
        ));
    }
}
