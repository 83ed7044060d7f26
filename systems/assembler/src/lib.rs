#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure translation of a finished build grid into a body/constraint graph.
//!
//! The graph is a plain description; the simulator instantiates it inside a
//! physics world. Assembly never fails because every reachable grid state is
//! well formed.

use contraption_core::{
    ArenaLayout, BodyCategory, CellCoord, Direction, PartKind, Shape, Team, GRID_HEIGHT,
    GRID_WIDTH,
};
use contraption_system_builder::BuildGrid;
use glam::Vec2;

/// Wheel radius as a fraction of the cell size.
pub const WHEEL_RADIUS_RATIO: f32 = 0.4;

/// Player width as a fraction of the cell size; players are one cell tall.
pub const PLAYER_WIDTH_RATIO: f32 = 0.5;

/// Neighbour scan order used when anchoring wheels.
const WHEEL_ANCHOR_ORDER: [Direction; 4] = [
    Direction::North,
    Direction::South,
    Direction::West,
    Direction::East,
];

/// Index of a body inside its [`BodyGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GraphBodyId(usize);

impl GraphBodyId {
    /// Position of the body in [`BodyGraph::bodies`].
    #[must_use]
    pub const fn index(&self) -> usize {
        self.0
    }
}

/// Rigid body produced from one structural grid cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GraphBody {
    /// Cell the body was built from.
    pub cell: CellCoord,
    /// Role of the body.
    pub category: BodyCategory,
    /// Team that built the body.
    pub team: Team,
    /// Collision shape.
    pub shape: Shape,
    /// Initial centre in world units.
    pub position: Vec2,
}

/// Breakable rigid joint between two adjacent boxes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GraphWeld {
    /// First box.
    pub a: GraphBodyId,
    /// Second box, to the right of or below `a`.
    pub b: GraphBodyId,
    /// Shared edge midpoint in `a`'s body space.
    pub anchor_a: Vec2,
    /// Shared edge midpoint in `b`'s body space.
    pub anchor_b: Vec2,
}

/// Elastic link created by a spring cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GraphSpring {
    /// Spring cell that produced the link.
    pub cell: CellCoord,
    /// Body above or left of the spring.
    pub a: GraphBodyId,
    /// Body below or right of the spring.
    pub b: GraphBodyId,
    /// Distance between both body centres at assembly time.
    pub rest_length: f32,
}

/// Pin holding a wheel to one neighbouring body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WheelAnchor {
    /// Neighbour the wheel hangs from.
    pub body: GraphBodyId,
    /// Wheel centre in the neighbour's body space.
    pub anchor: Vec2,
}

/// Motorised wheel and its optional anchor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WheelDrive {
    /// The wheel body.
    pub wheel: GraphBodyId,
    /// Anchor to a neighbour; `None` leaves the wheel free-floating.
    pub anchor: Option<WheelAnchor>,
}

/// Physics description of one team's contraption.
#[derive(Clone, Debug, PartialEq)]
pub struct BodyGraph {
    /// Team that built the contraption.
    pub team: Team,
    /// Bodies in row-major cell order.
    pub bodies: Vec<GraphBody>,
    /// Box-to-box welds, all of them breakable.
    pub welds: Vec<GraphWeld>,
    /// Spring links whose endpoints both exist.
    pub springs: Vec<GraphSpring>,
    /// Driven wheels.
    pub wheels: Vec<WheelDrive>,
}

impl BodyGraph {
    /// Body referenced by `id`.
    #[must_use]
    pub fn body(&self, id: GraphBodyId) -> &GraphBody {
        &self.bodies[id.0]
    }

    /// Body built from `cell`, if any.
    #[must_use]
    pub fn body_at(&self, cell: CellCoord) -> Option<GraphBodyId> {
        self.bodies
            .iter()
            .position(|body| body.cell == cell)
            .map(GraphBodyId)
    }

    /// The team's player body, if the grid had one.
    #[must_use]
    pub fn player(&self) -> Option<GraphBodyId> {
        self.bodies
            .iter()
            .position(|body| body.category == BodyCategory::Player)
            .map(GraphBodyId)
    }
}

/// Builds body graphs against a fixed arena layout.
#[derive(Clone, Copy, Debug, Default)]
pub struct Assembler {
    layout: ArenaLayout,
}

impl Assembler {
    /// Creates an assembler placing contraptions inside `layout`.
    #[must_use]
    pub const fn with_layout(layout: ArenaLayout) -> Self {
        Self { layout }
    }

    /// World-space centre of `cell` for a contraption shifted by `offset`.
    #[must_use]
    pub fn cell_position(&self, cell: CellCoord, offset: f32) -> Vec2 {
        let half_span = (GRID_WIDTH as f32 - 1.0) / 2.0;
        let size = self.layout.cell_size;
        Vec2::new(
            self.layout.center_x() + offset + (cell.column() as f32 - half_span) * size,
            self.layout.baseline + cell.row() as f32 * size,
        )
    }

    /// Translates `grid` into the body graph of `team`'s contraption.
    #[must_use]
    pub fn assemble(&self, grid: &BuildGrid, team: Team, offset: f32) -> BodyGraph {
        let size = self.layout.cell_size;
        let mut graph = BodyGraph {
            team,
            bodies: Vec::new(),
            welds: Vec::new(),
            springs: Vec::new(),
            wheels: Vec::new(),
        };
        let mut lookup = [[None; GRID_WIDTH]; GRID_HEIGHT];

        for (cell, part) in grid.parts() {
            let (category, shape) = match part.kind {
                PartKind::Box => (
                    BodyCategory::Box,
                    Shape::Rect {
                        width: size,
                        height: size,
                    },
                ),
                PartKind::Wheel => (
                    BodyCategory::Wheel,
                    Shape::Circle {
                        radius: size * WHEEL_RADIUS_RATIO,
                    },
                ),
                PartKind::Player => (
                    BodyCategory::Player,
                    Shape::Rect {
                        width: size * PLAYER_WIDTH_RATIO,
                        height: size,
                    },
                ),
                PartKind::Empty | PartKind::Spring => continue,
            };
            lookup[cell.row() as usize][cell.column() as usize] =
                Some(GraphBodyId(graph.bodies.len()));
            graph.bodies.push(GraphBody {
                cell,
                category,
                team,
                shape,
                position: self.cell_position(cell, offset),
            });
        }

        let body_at = |cell: Option<CellCoord>| {
            cell.and_then(|cell| lookup[cell.row() as usize][cell.column() as usize])
        };
        let is_box =
            |id: GraphBodyId, graph: &BodyGraph| graph.body(id).category == BodyCategory::Box;

        for (cell, part) in grid.parts() {
            match part.kind {
                PartKind::Spring => {
                    let (before, after) = if part.rotation.is_vertical() {
                        (Direction::North, Direction::South)
                    } else {
                        (Direction::West, Direction::East)
                    };
                    if let (Some(a), Some(b)) = (
                        body_at(cell.neighbor(before)),
                        body_at(cell.neighbor(after)),
                    ) {
                        graph.springs.push(GraphSpring {
                            cell,
                            a,
                            b,
                            rest_length: size * 2.0,
                        });
                    }
                }
                PartKind::Box => {
                    let Some(a) = body_at(Some(cell)) else {
                        continue;
                    };
                    let half = size / 2.0;
                    if let Some(b) = body_at(cell.neighbor(Direction::East)) {
                        if is_box(b, &graph) {
                            graph.welds.push(GraphWeld {
                                a,
                                b,
                                anchor_a: Vec2::new(half, 0.0),
                                anchor_b: Vec2::new(-half, 0.0),
                            });
                        }
                    }
                    if let Some(b) = body_at(cell.neighbor(Direction::South)) {
                        if is_box(b, &graph) {
                            graph.welds.push(GraphWeld {
                                a,
                                b,
                                anchor_a: Vec2::new(0.0, half),
                                anchor_b: Vec2::new(0.0, -half),
                            });
                        }
                    }
                }
                PartKind::Wheel => {
                    let Some(wheel) = body_at(Some(cell)) else {
                        continue;
                    };
                    let anchor = WHEEL_ANCHOR_ORDER.iter().find_map(|&direction| {
                        let body = body_at(cell.neighbor(direction))?;
                        let (dx, dy) = direction.offset();
                        // The wheel sits one cell opposite the scan direction
                        // as seen from the neighbour.
                        let anchor = Vec2::new(-dx as f32, -dy as f32) * size;
                        Some(WheelAnchor { body, anchor })
                    });
                    graph.wheels.push(WheelDrive { wheel, anchor });
                }
                PartKind::Empty | PartKind::Player => {}
            }
        }

        graph
    }
}

/// Assembles `grid` for `team` inside the default arena layout.
#[must_use]
pub fn assemble(grid: &BuildGrid, team: Team, offset: f32) -> BodyGraph {
    Assembler::default().assemble(grid, team, offset)
}
