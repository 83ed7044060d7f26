//! Render snapshots and the frame rendering port.

use glam::Vec2;
use thiserror::Error;

use crate::{BodyCategory, Pose, Shape, Team};

/// Immutable description of one body at the moment a frame is captured.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneBody {
    /// Role of the body, which selects its sprite.
    pub category: BodyCategory,
    /// Owning team, if any.
    pub team: Option<Team>,
    /// Collision shape, used to size the sprite.
    pub shape: Shape,
    /// Current world pose.
    pub pose: Pose,
}

impl SceneBody {
    /// Creates a new scene body descriptor.
    #[must_use]
    pub const fn new(category: BodyCategory, team: Option<Team>, shape: Shape, pose: Pose) -> Self {
        Self {
            category,
            team,
            shape,
            pose,
        }
    }

    /// Whether the body is part of the static arena.
    #[must_use]
    pub const fn is_static(&self) -> bool {
        self.category.is_static()
    }
}

/// Spring drawn between the current centres of its two endpoint bodies.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneSpring {
    /// Centre of the first endpoint body.
    pub from: Vec2,
    /// Centre of the second endpoint body.
    pub to: Vec2,
}

impl SceneSpring {
    /// Creates a new spring descriptor.
    #[must_use]
    pub const fn new(from: Vec2, to: Vec2) -> Self {
        Self { from, to }
    }

    /// Point halfway between both endpoints.
    #[must_use]
    pub fn midpoint(&self) -> Vec2 {
        (self.from + self.to) * 0.5
    }

    /// Angle of the segment from `from` to `to`, in radians.
    #[must_use]
    pub fn angle(&self) -> f32 {
        let delta = self.to - self.from;
        delta.y.atan2(delta.x)
    }
}

/// Snapshot of everything visible in one frame, in insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scene {
    /// Bodies in the order they were added to the world.
    pub bodies: Vec<SceneBody>,
    /// Springs that are still attached.
    pub springs: Vec<SceneSpring>,
}

/// Encoded raster image produced for one simulation step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    png: Vec<u8>,
}

impl Frame {
    /// Wraps PNG-encoded bytes with their pixel dimensions.
    #[must_use]
    pub fn from_png(width: u32, height: u32, png: Vec<u8>) -> Self {
        Self { width, height, png }
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// PNG-encoded image bytes.
    #[must_use]
    pub fn png_bytes(&self) -> &[u8] {
        &self.png
    }
}

/// printf-style pattern matching every persisted frame file.
pub const FRAME_FILE_PATTERN: &str = "frame_%d.png";

/// File name of the frame captured at `index`; indices are contiguous from zero.
#[must_use]
pub fn frame_file_name(index: u32) -> String {
    format!("frame_{index}.png")
}

/// Errors raised while composing frames.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The image could not be encoded or decoded.
    #[error("frame encoding failed: {0}")]
    Encoding(String),
    /// The canvas rejected a drawing request.
    #[error("canvas failure: {0}")]
    Canvas(String),
}

/// Port that turns scene snapshots into encoded frames.
pub trait FrameRenderer {
    /// Composes a frame from the provided snapshot.
    fn render(&mut self, scene: &Scene) -> Result<Frame, RenderError>;

    /// Returns `last` with a centred victory caption naming `winner`.
    fn victory_overlay(&mut self, last: &Frame, winner: Team) -> Result<Frame, RenderError>;
}
