#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure build-grid system that tracks part placement against per-kind budgets.
//!
//! Disallowed edits (selecting an exhausted tool, placing past the budget,
//! clicking outside the grid) are silent no-ops rather than errors, so a
//! presentation layer can forward raw input without pre-validating it.

use contraption_core::{CellCoord, Part, PartKind, Rotation, GRID_HEIGHT, GRID_WIDTH};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Remaining placements for every budgeted part kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartBudget {
    boxes: u32,
    wheels: u32,
    springs: u32,
    players: u32,
}

impl PartBudget {
    /// Budget every team starts a match with.
    pub const INITIAL: PartBudget = PartBudget::new(4, 10, 10, 1);

    /// Creates a budget table with explicit counts.
    #[must_use]
    pub const fn new(boxes: u32, wheels: u32, springs: u32, players: u32) -> Self {
        Self {
            boxes,
            wheels,
            springs,
            players,
        }
    }

    /// Remaining count for `kind`; `None` means unlimited (only [`PartKind::Empty`]).
    #[must_use]
    pub const fn remaining(&self, kind: PartKind) -> Option<u32> {
        match kind {
            PartKind::Empty => None,
            PartKind::Box => Some(self.boxes),
            PartKind::Wheel => Some(self.wheels),
            PartKind::Spring => Some(self.springs),
            PartKind::Player => Some(self.players),
        }
    }

    /// Whether at least one more part of `kind` may be placed.
    #[must_use]
    pub const fn allows(&self, kind: PartKind) -> bool {
        match self.remaining(kind) {
            None => true,
            Some(count) => count > 0,
        }
    }

    fn slot(&mut self, kind: PartKind) -> Option<&mut u32> {
        match kind {
            PartKind::Empty => None,
            PartKind::Box => Some(&mut self.boxes),
            PartKind::Wheel => Some(&mut self.wheels),
            PartKind::Spring => Some(&mut self.springs),
            PartKind::Player => Some(&mut self.players),
        }
    }

    fn consume(&mut self, kind: PartKind) {
        if let Some(slot) = self.slot(kind) {
            *slot = slot.saturating_sub(1);
        }
    }

    fn refund(&mut self, kind: PartKind) {
        if let Some(slot) = self.slot(kind) {
            *slot += 1;
        }
    }
}

impl Default for PartBudget {
    fn default() -> Self {
        Self::INITIAL
    }
}

/// Reasons a finished grid cannot be sent into battle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum BuildError {
    /// The grid holds no player part.
    #[error("contraption has no player part")]
    MissingPlayer,
}

/// Editable part-placement grid owned by one team for one match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildGrid {
    cells: [[Part; GRID_WIDTH]; GRID_HEIGHT],
    selected: PartKind,
    budget: PartBudget,
}

impl Default for BuildGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildGrid {
    /// Creates an empty grid with the initial budget and the box tool selected.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cells: [[Part::EMPTY; GRID_WIDTH]; GRID_HEIGHT],
            selected: PartKind::Box,
            budget: PartBudget::INITIAL,
        }
    }

    /// Currently selected tool.
    #[must_use]
    pub const fn selected_tool(&self) -> PartKind {
        self.selected
    }

    /// Remaining budget table.
    #[must_use]
    pub const fn budget(&self) -> PartBudget {
        self.budget
    }

    /// Remaining placements for `kind`; `None` for the unlimited empty tool.
    #[must_use]
    pub const fn remaining(&self, kind: PartKind) -> Option<u32> {
        self.budget.remaining(kind)
    }

    /// Part stored at `cell`, or `None` outside the grid.
    #[must_use]
    pub fn part_at(&self, cell: CellCoord) -> Option<Part> {
        if !cell.in_grid() {
            return None;
        }
        Some(self.cells[cell.row() as usize][cell.column() as usize])
    }

    /// Number of cells currently holding `kind`.
    #[must_use]
    pub fn placed_count(&self, kind: PartKind) -> u32 {
        self.cells
            .iter()
            .flatten()
            .filter(|part| part.kind == kind)
            .count() as u32
    }

    /// Every cell with its content in row-major order.
    pub fn parts(&self) -> impl Iterator<Item = (CellCoord, Part)> + '_ {
        CellCoord::all().map(move |cell| {
            (
                cell,
                self.cells[cell.row() as usize][cell.column() as usize],
            )
        })
    }

    /// Whether exactly one cell holds the team's player.
    #[must_use]
    pub fn has_player(&self) -> bool {
        self.placed_count(PartKind::Player) == 1
    }

    /// Checks that the grid may be confirmed for battle.
    pub fn validate_for_battle(&self) -> Result<(), BuildError> {
        if self.has_player() {
            Ok(())
        } else {
            Err(BuildError::MissingPlayer)
        }
    }

    /// Selects `kind` as the active tool unless its budget is exhausted.
    pub fn select_tool(&mut self, kind: PartKind) {
        if self.budget.allows(kind) {
            self.selected = kind;
        }
    }

    /// Applies the selected tool to `cell`.
    ///
    /// Clicking a cell that already holds the selected kind rotates springs
    /// and removes anything else. Otherwise the existing part is refunded and
    /// replaced, unless the selected tool has no budget left, in which case
    /// nothing changes.
    pub fn click(&mut self, cell: CellCoord) {
        if !cell.in_grid() {
            return;
        }
        let (row, column) = (cell.row() as usize, cell.column() as usize);
        let current = self.cells[row][column];
        let tool = self.selected;

        if current.kind == tool {
            match tool {
                PartKind::Empty => {}
                PartKind::Spring => {
                    self.cells[row][column].rotation = current.rotation.next();
                }
                PartKind::Box | PartKind::Wheel | PartKind::Player => {
                    self.budget.refund(tool);
                    self.cells[row][column] = Part::EMPTY;
                }
            }
            return;
        }

        if !self.budget.allows(tool) {
            return;
        }
        self.budget.refund(current.kind);
        self.budget.consume(tool);
        let rotation = if tool == PartKind::Spring {
            Rotation::Right
        } else {
            Rotation::Up
        };
        self.cells[row][column] = Part::new(tool, rotation);
    }

    /// Selects `kind` and clicks `cell`, the common "place this here" gesture.
    ///
    /// Does nothing when `kind` cannot be selected, so the previous tool is
    /// never applied in its place.
    pub fn place(&mut self, kind: PartKind, cell: CellCoord) {
        self.select_tool(kind);
        if self.selected == kind {
            self.click(cell);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tool_is_always_selectable() {
        let mut grid = BuildGrid::new();
        grid.select_tool(PartKind::Empty);
        assert_eq!(grid.selected_tool(), PartKind::Empty);
        assert_eq!(grid.remaining(PartKind::Empty), None);
    }

    #[test]
    fn consume_never_underflows() {
        let mut budget = PartBudget::new(0, 0, 0, 0);
        budget.consume(PartKind::Box);
        assert_eq!(budget.remaining(PartKind::Box), Some(0));
    }
}
