//! Scene composition on top of a [`Canvas`].

use std::{fmt, fs, path::Path};

use ab_glyph::FontVec;
use anyhow::{anyhow, Context, Result};
use contraption_core::{
    ArenaLayout, BodyCategory, Frame, FrameRenderer, RenderError, Scene, SceneBody, SceneSpring,
    Team,
};
use glam::Vec2;

use crate::{
    canvas::{Canvas, RasterCanvas},
    sprites::{SpriteAtlas, SpriteKey},
    Color,
};

/// Pixel height of the victory caption.
pub const CAPTION_SCALE: f32 = 80.0;

const SPRING_THICKNESS_RATIO: f32 = 0.15;
const SPOKE_THICKNESS: f32 = 3.0;

/// Colours used for the arena, placeholders and captions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Palette {
    /// Arena background.
    pub background: Color,
    /// Ground strip along the bottom edge.
    pub ground: Color,
    /// Falling debris.
    pub debris: Color,
    /// Box placeholder when no atlas is loaded.
    pub block: Color,
    /// Wheel placeholder when no atlas is loaded.
    pub wheel: Color,
    /// Spring placeholder when no atlas is loaded.
    pub spring: Color,
    /// Green team accents and caption.
    pub green: Color,
    /// Purple team accents and caption.
    pub purple: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: Color::from_rgb_u8(0x35, 0x25, 0x3c),
            ground: Color::from_rgb_u8(0x7f, 0x73, 0x84),
            debris: Color::from_rgb_u8(0xa1, 0x93, 0xa8),
            block: Color::from_rgb_u8(0xb0, 0x7a, 0x4f),
            wheel: Color::from_rgb_u8(0x2b, 0x2b, 0x2b),
            spring: Color::from_rgb_u8(0xc9, 0xc9, 0xc9),
            green: Color::from_rgb_u8(0x57, 0xf2, 0x87),
            purple: Color::from_rgb_u8(0x9b, 0x59, 0xb6),
        }
    }
}

impl Palette {
    /// Accent colour of `team`.
    #[must_use]
    pub const fn team(&self, team: Team) -> Color {
        match team {
            Team::Green => self.green,
            Team::Purple => self.purple,
        }
    }
}

/// Reads a TrueType or OpenType font for the victory caption.
pub fn load_font(path: impl AsRef<Path>) -> Result<FontVec> {
    let path = path.as_ref();
    let bytes =
        fs::read(path).with_context(|| format!("failed to read font at {}", path.display()))?;
    FontVec::try_from_vec(bytes)
        .map_err(|error| anyhow!("font at {} is not usable: {error}", path.display()))
}

/// [`FrameRenderer`] drawing scenes onto a fresh [`RasterCanvas`] per frame.
pub struct SceneRenderer {
    layout: ArenaLayout,
    palette: Palette,
    atlas: Option<SpriteAtlas>,
    font: Option<FontVec>,
}

impl fmt::Debug for SceneRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneRenderer")
            .field("layout", &self.layout)
            .field("palette", &self.palette)
            .field("atlas", &self.atlas.is_some())
            .field("font", &self.font.is_some())
            .finish()
    }
}

impl SceneRenderer {
    /// Creates a renderer drawing placeholders, with no caption font yet.
    #[must_use]
    pub fn new(layout: ArenaLayout) -> Self {
        Self {
            layout,
            palette: Palette::default(),
            atlas: None,
            font: None,
        }
    }

    /// Draws parts with the provided sprites instead of placeholders.
    #[must_use]
    pub fn with_atlas(mut self, atlas: SpriteAtlas) -> Self {
        self.atlas = Some(atlas);
        self
    }

    /// Uses `font` for the victory caption.
    #[must_use]
    pub fn with_font(mut self, font: FontVec) -> Self {
        self.font = Some(font);
        self
    }

    /// Frame size in pixels.
    #[must_use]
    pub fn frame_size(&self) -> (u32, u32) {
        (
            self.layout.width.round() as u32,
            self.layout.height.round() as u32,
        )
    }

    /// Draws `scene` onto `canvas`: background, ground, dynamic bodies in
    /// insertion order, then springs.
    pub fn paint(&self, canvas: &mut impl Canvas, scene: &Scene) {
        let (width, height) = canvas.size();
        let (width, height) = (width as f32, height as f32);
        canvas.fill_rect(
            Vec2::new(width / 2.0, height / 2.0),
            Vec2::new(width, height),
            0.0,
            self.palette.background,
        );
        let ground_height = self.layout.ground_height;
        canvas.fill_rect(
            Vec2::new(width / 2.0, height - ground_height / 2.0),
            Vec2::new(width, ground_height),
            0.0,
            self.palette.ground,
        );

        for body in scene.bodies.iter().filter(|body| !body.is_static()) {
            self.paint_body(canvas, body);
        }
        for spring in &scene.springs {
            self.paint_spring(canvas, spring);
        }
    }

    fn paint_body(&self, canvas: &mut impl Canvas, body: &SceneBody) {
        let extents = body.shape.extents();
        let center = body.pose.position;
        let angle = body.pose.angle;

        let sprite = SpriteKey::for_body(body.category, body.team)
            .and_then(|key| self.atlas.as_ref()?.image(key));
        if let Some(sprite) = sprite {
            let size = if body.category == BodyCategory::Player {
                Vec2::splat(extents.y)
            } else {
                extents
            };
            canvas.draw_sprite(sprite, center, size, angle);
            return;
        }

        match body.category {
            BodyCategory::Debris => canvas.fill_rect(center, extents, angle, self.palette.debris),
            BodyCategory::Box => canvas.fill_rect(center, extents, angle, self.palette.block),
            BodyCategory::Wheel => {
                let radius = extents.x / 2.0;
                canvas.fill_circle(center, radius, self.palette.wheel);
                let spoke = Vec2::from_angle(angle).rotate(Vec2::new(radius / 2.0, 0.0));
                canvas.fill_rect(
                    center + spoke,
                    Vec2::new(radius, SPOKE_THICKNESS),
                    angle,
                    self.palette.wheel.lighten(0.5),
                );
            }
            BodyCategory::Player => {
                let color = body
                    .team
                    .map_or(self.palette.ground, |team| self.palette.team(team));
                canvas.fill_rect(center, extents, angle, color);
            }
            BodyCategory::Ground | BodyCategory::Wall => {}
        }
    }

    fn paint_spring(&self, canvas: &mut impl Canvas, spring: &SceneSpring) {
        let cell = self.layout.cell_size;
        let center = spring.midpoint();
        let angle = spring.angle();
        match self.atlas.as_ref().and_then(|atlas| atlas.image(SpriteKey::Spring)) {
            Some(sprite) => canvas.draw_sprite(sprite, center, Vec2::splat(cell), angle),
            None => canvas.fill_rect(
                center,
                Vec2::new(spring.from.distance(spring.to), cell * SPRING_THICKNESS_RATIO),
                angle,
                self.palette.spring,
            ),
        }
    }

    /// Draws the victory caption for `winner` onto `canvas`.
    ///
    /// Fails without drawing when no font has been loaded.
    pub fn paint_caption(&self, canvas: &mut impl Canvas, winner: Team) -> Result<(), RenderError> {
        let Some(font) = &self.font else {
            return Err(RenderError::Canvas(format!(
                "no caption font loaded to announce the {} team",
                winner.label()
            )));
        };
        let (width, height) = canvas.size();
        let center = Vec2::new(width as f32 / 2.0, height as f32 / 2.0);
        let band = Vec2::new(width as f32 * 0.8, CAPTION_SCALE * 1.5);
        canvas.fill_rect(center, band, 0.0, self.palette.background.with_alpha(0.6));
        let caption = format!("{} Team Wins!", winner.label());
        let color = self.palette.team(winner);
        canvas.draw_text(&caption, center, CAPTION_SCALE, color, font);
        Ok(())
    }
}

impl FrameRenderer for SceneRenderer {
    fn render(&mut self, scene: &Scene) -> Result<Frame, RenderError> {
        let (width, height) = self.frame_size();
        let mut canvas = RasterCanvas::new(width, height);
        self.paint(&mut canvas, scene);
        canvas.export_png()
    }

    fn victory_overlay(&mut self, last: &Frame, winner: Team) -> Result<Frame, RenderError> {
        let mut canvas = RasterCanvas::new(last.width(), last.height());
        canvas.draw_frame(last)?;
        self.paint_caption(&mut canvas, winner)?;
        canvas.export_png()
    }
}
