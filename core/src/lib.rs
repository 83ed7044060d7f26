#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the contraption battle engine.
//!
//! This crate defines the value types that flow between the build grid, the
//! assembler, the simulator and the adapters, together with the narrow ports
//! the simulator drives: [`PhysicsWorld`] for rigid-body dynamics and
//! [`FrameRenderer`] for turning a [`Scene`] snapshot into an encoded
//! [`Frame`]. Systems depend only on these contracts; adapters implement them.

mod physics;
mod scene;

pub use physics::{
    BodyHandle, BodySpec, ConstraintHandle, ConstraintSpec, ContactStart, PhysicsError,
    PhysicsWorld,
};
pub use scene::{
    frame_file_name, Frame, FrameRenderer, RenderError, Scene, SceneBody, SceneSpring,
    FRAME_FILE_PATTERN,
};

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Number of columns in every build grid.
pub const GRID_WIDTH: usize = 5;

/// Number of rows in every build grid.
pub const GRID_HEIGHT: usize = 4;

/// Kinds of parts a player can place on the build grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PartKind {
    /// Unoccupied cell. Selecting it as a tool erases parts.
    Empty,
    /// Rigid square block that welds to neighbouring boxes.
    Box,
    /// Motorised wheel.
    Wheel,
    /// Elastic link between the two parts on its axis.
    Spring,
    /// The team's pilot; touching the ground loses the battle.
    Player,
}

impl PartKind {
    /// Every part kind that consumes budget, in toolbar order.
    pub const BUDGETED: [PartKind; 4] = [
        PartKind::Box,
        PartKind::Wheel,
        PartKind::Spring,
        PartKind::Player,
    ];
}

/// Orientation of a part, stored in quarter turns clockwise from up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    /// 0 degrees.
    #[default]
    Up,
    /// 90 degrees.
    Right,
    /// 180 degrees.
    Down,
    /// 270 degrees.
    Left,
}

impl Rotation {
    /// Rotation reached after one clockwise quarter turn.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Up => Self::Right,
            Self::Right => Self::Down,
            Self::Down => Self::Left,
            Self::Left => Self::Up,
        }
    }

    /// Whether a part with this rotation spans its column rather than its row.
    #[must_use]
    pub const fn is_vertical(self) -> bool {
        matches!(self, Self::Up | Self::Down)
    }
}

/// Content of a single build grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Part {
    /// Kind of part occupying the cell.
    pub kind: PartKind,
    /// Orientation of the part.
    pub rotation: Rotation,
}

impl Part {
    /// An unoccupied cell.
    pub const EMPTY: Part = Part::new(PartKind::Empty, Rotation::Up);

    /// Creates a new part descriptor.
    #[must_use]
    pub const fn new(kind: PartKind, rotation: Rotation) -> Self {
        Self { kind, rotation }
    }
}

impl Default for Part {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// The two sides of a battle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Team {
    /// Builds on the left and drives to the right.
    Green,
    /// Builds on the right and drives to the left.
    Purple,
}

impl Team {
    /// Both teams in simulation order.
    pub const ALL: [Team; 2] = [Team::Green, Team::Purple];

    /// The team on the other side of the arena.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Green => Self::Purple,
            Self::Purple => Self::Green,
        }
    }

    /// Human readable team name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Green => "Green",
            Self::Purple => "Purple",
        }
    }

    /// Dense index used for per-team tables.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Green => 0,
            Self::Purple => 1,
        }
    }
}

/// Cardinal directions between neighbouring grid cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Toward decreasing row indices.
    North,
    /// Toward increasing column indices.
    East,
    /// Toward increasing row indices.
    South,
    /// Toward decreasing column indices.
    West,
}

impl Direction {
    /// Unit offset of one cell in this direction, with rows growing downward.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::East => (1, 0),
            Self::South => (0, 1),
            Self::West => (-1, 0),
        }
    }
}

/// Location of a single build grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Whether the coordinate lies inside the fixed build grid.
    #[must_use]
    pub const fn in_grid(&self) -> bool {
        (self.column as usize) < GRID_WIDTH && (self.row as usize) < GRID_HEIGHT
    }

    /// Neighbouring cell in the provided direction, if it lies inside the grid.
    #[must_use]
    pub fn neighbor(self, direction: Direction) -> Option<CellCoord> {
        let (dx, dy) = direction.offset();
        let column = self.column.checked_add_signed(dx)?;
        let row = self.row.checked_add_signed(dy)?;
        let cell = CellCoord::new(column, row);
        cell.in_grid().then_some(cell)
    }

    /// Iterates every cell of the build grid in row-major order.
    pub fn all() -> impl Iterator<Item = CellCoord> {
        (0..GRID_HEIGHT as u32)
            .flat_map(|row| (0..GRID_WIDTH as u32).map(move |column| CellCoord::new(column, row)))
    }
}

/// Dimensions of the arena, expressed in world units (pixels, y pointing down).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaLayout {
    /// Width of the visible arena.
    pub width: f32,
    /// Height of the visible arena.
    pub height: f32,
    /// Edge length of one build grid cell once assembled.
    pub cell_size: f32,
    /// Vertical position of the first grid row.
    pub baseline: f32,
    /// Thickness of the ground strip at the bottom of the arena.
    pub ground_height: f32,
}

impl ArenaLayout {
    /// Horizontal centre of the arena.
    #[must_use]
    pub fn center_x(&self) -> f32 {
        self.width / 2.0
    }

    /// Top edge of the ground strip.
    #[must_use]
    pub fn ground_top(&self) -> f32 {
        self.height - self.ground_height
    }
}

impl Default for ArenaLayout {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            cell_size: 64.0,
            baseline: 200.0,
            ground_height: 50.0,
        }
    }
}

/// Role of a rigid body in the battle, which also decides what it collides with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BodyCategory {
    /// Structural block.
    Box,
    /// Motorised wheel.
    Wheel,
    /// A team's pilot.
    Player,
    /// Falling hazard.
    Debris,
    /// Static floor; a player touching it loses.
    Ground,
    /// Static side wall.
    Wall,
}

/// Membership and filter bit sets used for category-based collision filtering.
///
/// Two bodies collide when each one's `filter` contains the other's `membership`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CollisionFilter {
    /// Categories this body belongs to.
    pub membership: u32,
    /// Categories this body accepts contacts from.
    pub filter: u32,
}

impl CollisionFilter {
    const DEFAULT: u32 = 0x0001;
    const GROUND: u32 = 0x0002;
    const PLAYER: u32 = 0x0004;
    const DEBRIS: u32 = 0x0008;

    /// Whether two filters allow a contact between their bodies.
    #[must_use]
    pub const fn interacts_with(self, other: CollisionFilter) -> bool {
        self.filter & other.membership != 0 && other.filter & self.membership != 0
    }
}

impl BodyCategory {
    /// Collision filter applied to bodies of this category.
    #[must_use]
    pub const fn collision_filter(self) -> CollisionFilter {
        use CollisionFilter as F;
        match self {
            Self::Box | Self::Wheel => CollisionFilter {
                membership: F::DEFAULT,
                filter: F::DEFAULT | F::DEBRIS | F::GROUND | F::PLAYER,
            },
            Self::Player => CollisionFilter {
                membership: F::PLAYER,
                filter: F::GROUND | F::DEFAULT,
            },
            Self::Debris => CollisionFilter {
                membership: F::DEBRIS,
                filter: F::DEFAULT | F::GROUND | F::DEBRIS,
            },
            Self::Ground | Self::Wall => CollisionFilter {
                membership: F::GROUND,
                filter: F::PLAYER | F::DEFAULT | F::DEBRIS,
            },
        }
    }

    /// Whether bodies of this category never move.
    #[must_use]
    pub const fn is_static(self) -> bool {
        matches!(self, Self::Ground | Self::Wall)
    }
}

/// Collision shape of a rigid body, centred on the body origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    /// Axis-aligned rectangle in body space.
    Rect {
        /// Full width.
        width: f32,
        /// Full height.
        height: f32,
    },
    /// Circle.
    Circle {
        /// Radius.
        radius: f32,
    },
}

impl Shape {
    /// Size of the shape's bounding box in body space.
    #[must_use]
    pub fn extents(&self) -> Vec2 {
        match *self {
            Self::Rect { width, height } => Vec2::new(width, height),
            Self::Circle { radius } => Vec2::splat(radius * 2.0),
        }
    }
}

/// Position and orientation of a body in world space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pose {
    /// Centre of the body.
    pub position: Vec2,
    /// Clockwise rotation in radians (y points down).
    pub angle: f32,
}

impl Pose {
    /// Creates a new pose.
    #[must_use]
    pub const fn new(position: Vec2, angle: f32) -> Self {
        Self { position, angle }
    }

    /// Maps a point from body space into world space.
    #[must_use]
    pub fn transform_point(&self, local: Vec2) -> Vec2 {
        self.position + Vec2::from_angle(self.angle).rotate(local)
    }
}
