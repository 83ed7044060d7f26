//! Contraption layouts as glyph grids and single-line share codes.
//!
//! Both forms are replayed through [`BuildGrid`] edits, so a layout can never
//! exceed the part budget.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use contraption_core::{CellCoord, Part, PartKind, Rotation, GRID_HEIGHT, GRID_WIDTH};
use contraption_system_builder::{BuildGrid, PartBudget};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const SHARE_DOMAIN: &str = "contraption";
const SHARE_VERSION: &str = "v1";

/// Identifier prefix emitted before the grid dimensions and payload.
pub(crate) const SHARE_CODE_HEADER: &str = "contraption:v1";
const FIELD_DELIMITER: char = ':';
const COMMENT_MARKER: char = '#';

/// Parts placed by a share code, in placement order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct SharePayload {
    parts: Vec<PlacedPart>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
struct PlacedPart {
    cell: CellCoord,
    part: Part,
}

/// Reasons a layout cannot be turned into a build grid.
#[derive(Debug, Error)]
pub(crate) enum LayoutError {
    #[error("layout is empty")]
    Empty,
    #[error("layout has {found} rows, expected {expected}", expected = GRID_HEIGHT)]
    RowCount { found: usize },
    #[error("layout row {row} has {found} cells, expected {expected}", expected = GRID_WIDTH)]
    RowWidth { row: usize, found: usize },
    #[error("unknown glyph '{glyph}' at column {column}, row {row}")]
    UnknownGlyph {
        glyph: char,
        column: usize,
        row: usize,
    },
    #[error(
        "cannot place {kind:?} at column {}, row {}: budget exhausted",
        .cell.column(),
        .cell.row()
    )]
    Unplaceable { kind: PartKind, cell: CellCoord },
    #[error("cell at column {}, row {} is listed twice", .cell.column(), .cell.row())]
    DuplicateCell { cell: CellCoord },
    #[error("cell at column {}, row {} lies outside the grid", .cell.column(), .cell.row())]
    OutOfGrid { cell: CellCoord },
    #[error("share code is missing the {0} segment")]
    MissingSegment(&'static str),
    #[error("share code prefix '{0}' is not supported")]
    InvalidPrefix(String),
    #[error("share code version '{0}' is not supported")]
    UnsupportedVersion(String),
    #[error("could not parse grid dimensions '{0}'")]
    InvalidDimensions(String),
    #[error(
        "share code is for a {columns}x{rows} grid, expected {}x{}",
        GRID_WIDTH,
        GRID_HEIGHT
    )]
    UnsupportedDimensions { columns: u32, rows: u32 },
    #[error("could not decode share code payload")]
    InvalidEncoding(#[source] base64::DecodeError),
    #[error("could not parse share code payload")]
    InvalidPayload(#[source] serde_json::Error),
}

/// Parses either a share code or a glyph grid.
pub(crate) fn parse_layout(text: &str) -> Result<BuildGrid, LayoutError> {
    let trimmed = text.trim();
    if trimmed.starts_with(SHARE_DOMAIN) && trimmed.contains(FIELD_DELIMITER) {
        decode_share_code(trimmed)
    } else {
        parse_glyphs(trimmed)
    }
}

/// Parses a glyph grid: one line per row, blank lines and `#` comments skipped.
///
/// `.` empty, `B` box, `W` wheel, `-` horizontal spring, `|` vertical spring,
/// `P` player. Whitespace between glyphs is ignored.
pub(crate) fn parse_glyphs(text: &str) -> Result<BuildGrid, LayoutError> {
    let rows = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(COMMENT_MARKER))
        .map(|line| line.chars().filter(|glyph| !glyph.is_whitespace()).collect::<Vec<_>>())
        .collect::<Vec<_>>();
    if rows.is_empty() {
        return Err(LayoutError::Empty);
    }
    if rows.len() != GRID_HEIGHT {
        return Err(LayoutError::RowCount { found: rows.len() });
    }

    let mut placements = Vec::new();
    for (row, glyphs) in rows.iter().enumerate() {
        if glyphs.len() != GRID_WIDTH {
            return Err(LayoutError::RowWidth {
                row,
                found: glyphs.len(),
            });
        }
        for (column, &glyph) in glyphs.iter().enumerate() {
            let part = part_for_glyph(glyph).ok_or(LayoutError::UnknownGlyph {
                glyph,
                column,
                row,
            })?;
            placements.push(PlacedPart {
                cell: CellCoord::new(column as u32, row as u32),
                part,
            });
        }
    }
    replay(placements)
}

/// Renders the grid as glyph rows.
pub(crate) fn render_glyphs(grid: &BuildGrid) -> String {
    let mut text = String::with_capacity((GRID_WIDTH + 1) * GRID_HEIGHT);
    for (cell, part) in grid.parts() {
        if cell.column() == 0 && cell.row() > 0 {
            text.push('\n');
        }
        text.push(glyph_for_part(part));
    }
    text
}

/// One line listing the remaining budget of every part kind.
pub(crate) fn budget_summary(grid: &BuildGrid) -> String {
    PartKind::BUDGETED
        .iter()
        .map(|&kind| {
            let remaining = grid.remaining(kind).unwrap_or_default();
            let initial = PartBudget::INITIAL.remaining(kind).unwrap_or_default();
            format!("{kind:?} {remaining}/{initial}")
        })
        .collect::<Vec<_>>()
        .join("  ")
}

/// Encodes the grid into a single-line share code.
pub(crate) fn encode_share_code(grid: &BuildGrid) -> Result<String, LayoutError> {
    let payload = SharePayload {
        parts: grid
            .parts()
            .filter(|(_, part)| part.kind != PartKind::Empty)
            .map(|(cell, part)| PlacedPart { cell, part })
            .collect(),
    };
    let json = serde_json::to_vec(&payload).map_err(LayoutError::InvalidPayload)?;
    let encoded = STANDARD_NO_PAD.encode(json);
    Ok(format!(
        "{SHARE_CODE_HEADER}{FIELD_DELIMITER}{GRID_WIDTH}x{GRID_HEIGHT}{FIELD_DELIMITER}{encoded}"
    ))
}

/// Decodes a share code produced by [`encode_share_code`].
pub(crate) fn decode_share_code(code: &str) -> Result<BuildGrid, LayoutError> {
    let mut fields = code.trim().split(FIELD_DELIMITER);
    let domain = fields.next().ok_or(LayoutError::MissingSegment("prefix"))?;
    let version = fields.next().ok_or(LayoutError::MissingSegment("version"))?;
    let dimensions = fields
        .next()
        .ok_or(LayoutError::MissingSegment("dimensions"))?;
    let payload = fields.next().ok_or(LayoutError::MissingSegment("payload"))?;

    if domain != SHARE_DOMAIN {
        return Err(LayoutError::InvalidPrefix(domain.to_owned()));
    }
    if version != SHARE_VERSION {
        return Err(LayoutError::UnsupportedVersion(version.to_owned()));
    }
    let (columns, rows) = parse_dimensions(dimensions)?;
    if columns as usize != GRID_WIDTH || rows as usize != GRID_HEIGHT {
        return Err(LayoutError::UnsupportedDimensions { columns, rows });
    }

    let bytes = STANDARD_NO_PAD
        .decode(payload.as_bytes())
        .map_err(LayoutError::InvalidEncoding)?;
    let decoded: SharePayload =
        serde_json::from_slice(&bytes).map_err(LayoutError::InvalidPayload)?;
    replay(decoded.parts)
}

fn parse_dimensions(dimensions: &str) -> Result<(u32, u32), LayoutError> {
    let invalid = || LayoutError::InvalidDimensions(dimensions.to_owned());
    let (columns, rows) = dimensions.split_once(['x', 'X']).ok_or_else(invalid)?;
    let columns = columns.trim().parse::<u32>().map_err(|_| invalid())?;
    let rows = rows.trim().parse::<u32>().map_err(|_| invalid())?;
    Ok((columns, rows))
}

/// Rebuilds a grid by performing the edits a player would make.
fn replay(placements: impl IntoIterator<Item = PlacedPart>) -> Result<BuildGrid, LayoutError> {
    let mut grid = BuildGrid::new();
    for PlacedPart { cell, part } in placements {
        if part.kind == PartKind::Empty {
            continue;
        }
        match grid.part_at(cell) {
            None => return Err(LayoutError::OutOfGrid { cell }),
            Some(existing) if existing.kind != PartKind::Empty => {
                return Err(LayoutError::DuplicateCell { cell });
            }
            Some(_) => {}
        }

        grid.place(part.kind, cell);
        if part.kind == PartKind::Spring {
            for _ in 0..3 {
                if grid.part_at(cell).map(|placed| placed.rotation) == Some(part.rotation) {
                    break;
                }
                grid.click(cell);
            }
        }
        if grid.part_at(cell).map(|placed| placed.kind) != Some(part.kind) {
            return Err(LayoutError::Unplaceable {
                kind: part.kind,
                cell,
            });
        }
    }
    Ok(grid)
}

fn part_for_glyph(glyph: char) -> Option<Part> {
    let part = match glyph.to_ascii_uppercase() {
        '.' => Part::EMPTY,
        'B' => Part::new(PartKind::Box, Rotation::Up),
        'W' => Part::new(PartKind::Wheel, Rotation::Up),
        '-' => Part::new(PartKind::Spring, Rotation::Right),
        '|' => Part::new(PartKind::Spring, Rotation::Down),
        'P' => Part::new(PartKind::Player, Rotation::Up),
        _ => return None,
    };
    Some(part)
}

fn glyph_for_part(part: Part) -> char {
    match part.kind {
        PartKind::Empty => '.',
        PartKind::Box => 'B',
        PartKind::Wheel => 'W',
        PartKind::Spring if part.rotation.is_vertical() => '|',
        PartKind::Spring => '-',
        PartKind::Player => 'P',
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CART: &str = "\
        # a small cart\n\
        ..P..\n\
        .BB-B\n\
        .|...\n\
        .W.W.\n";

    #[test]
    fn glyph_layout_is_replayed_through_the_grid() {
        let grid = parse_glyphs(CART).expect("cart parses");
        assert_eq!(
            grid.part_at(CellCoord::new(2, 0)).map(|part| part.kind),
            Some(PartKind::Player)
        );
        assert_eq!(
            grid.part_at(CellCoord::new(3, 1)),
            Some(Part::new(PartKind::Spring, Rotation::Right))
        );
        assert_eq!(
            grid.part_at(CellCoord::new(1, 2)),
            Some(Part::new(PartKind::Spring, Rotation::Down))
        );
        assert_eq!(grid.remaining(PartKind::Box), Some(1));
        assert_eq!(grid.remaining(PartKind::Wheel), Some(8));
        assert_eq!(grid.remaining(PartKind::Spring), Some(8));
        assert_eq!(grid.remaining(PartKind::Player), Some(0));
    }

    #[test]
    fn rendering_reproduces_the_glyphs() {
        let grid = parse_glyphs(CART).expect("cart parses");
        assert_eq!(render_glyphs(&grid), "..P..\n.BB-B\n.|...\n.W.W.");
        assert_eq!(
            budget_summary(&grid),
            "Box 1/4  Wheel 8/10  Spring 8/10  Player 0/1"
        );
    }

    #[test]
    fn glyphs_beyond_the_budget_are_rejected() {
        let error = parse_glyphs("BBBBB\n.....\n.....\n..P..").expect_err("fifth box rejected");
        match error {
            LayoutError::Unplaceable { kind, cell } => {
                assert_eq!(kind, PartKind::Box);
                assert_eq!(cell, CellCoord::new(4, 0));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(
            parse_glyphs("P....\n.....\n.....\nP...."),
            Err(LayoutError::Unplaceable { .. })
        ));
    }

    #[test]
    fn malformed_glyph_grids_are_rejected() {
        assert!(matches!(parse_glyphs(" \n# nothing\n"), Err(LayoutError::Empty)));
        assert!(matches!(
            parse_glyphs(".....\n....."),
            Err(LayoutError::RowCount { found: 2 })
        ));
        assert!(matches!(
            parse_glyphs(".....\n....\n.....\n....."),
            Err(LayoutError::RowWidth { row: 1, found: 4 })
        ));
        assert!(matches!(
            parse_glyphs(".....\n..X..\n.....\n....."),
            Err(LayoutError::UnknownGlyph {
                glyph: 'X',
                column: 2,
                row: 1
            })
        ));
    }

    #[test]
    fn share_code_restores_the_same_grid() {
        let grid = parse_glyphs(CART).expect("cart parses");
        let code = encode_share_code(&grid).expect("grid encodes");
        assert!(code.starts_with("contraption:v1:5x4:"));
        assert!(!code.contains('\n'));

        let decoded = parse_layout(&code).expect("share code decodes");
        assert_eq!(decoded, grid);
    }

    #[test]
    fn share_codes_for_other_grids_are_rejected() {
        let grid = parse_glyphs(CART).expect("cart parses");
        let code = encode_share_code(&grid).expect("grid encodes");
        let resized = code.replacen("5x4", "6x4", 1);
        assert!(matches!(
            decode_share_code(&resized),
            Err(LayoutError::UnsupportedDimensions { columns: 6, rows: 4 })
        ));
        assert!(matches!(
            decode_share_code(&code.replacen("v1", "v9", 1)),
            Err(LayoutError::UnsupportedVersion(_))
        ));
        assert!(matches!(
            decode_share_code("contraption:v1:5x4"),
            Err(LayoutError::MissingSegment("payload"))
        ));
        assert!(matches!(
            decode_share_code("contraption:v1:5x4:!!!"),
            Err(LayoutError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn share_code_cells_must_be_unique_and_inside_the_grid() {
        let encode = |parts: Vec<PlacedPart>| {
            let json = serde_json::to_vec(&SharePayload { parts }).expect("payload encodes");
            format!("{SHARE_CODE_HEADER}:5x4:{}", STANDARD_NO_PAD.encode(json))
        };
        let boxed = Part::new(PartKind::Box, Rotation::Up);

        let twice = encode(vec![
            PlacedPart {
                cell: CellCoord::new(0, 0),
                part: boxed,
            },
            PlacedPart {
                cell: CellCoord::new(0, 0),
                part: boxed,
            },
        ]);
        assert!(matches!(
            decode_share_code(&twice),
            Err(LayoutError::DuplicateCell { .. })
        ));

        let outside = encode(vec![PlacedPart {
            cell: CellCoord::new(5, 0),
            part: boxed,
        }]);
        assert!(matches!(
            decode_share_code(&outside),
            Err(LayoutError::OutOfGrid { .. })
        ));
    }
}
