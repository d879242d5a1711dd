//! Single-state ownership invariants.

use super::Invariant;
use crate::board::Board;

/// Invariant: an owned cell always records its first solver.
pub struct OwnerHasFirstSolver;

impl Invariant<Board> for OwnerHasFirstSolver {
    fn holds(board: &Board) -> bool {
        board
            .iter()
            .all(|(_, cell)| cell.owner().is_none() || cell.first_solver().is_some())
    }

    fn description() -> &'static str {
        "Owned cells record a first solver"
    }
}

/// Invariant: a locked cell was never solved.
///
/// Locks only happen on a failed attempt against an unowned cell, and a
/// locked cell admits no further attempts.
pub struct LockedCellsUnowned;

impl Invariant<Board> for LockedCellsUnowned {
    fn holds(board: &Board) -> bool {
        board.iter().all(|(_, cell)| {
            !cell.is_locked() || (cell.owner().is_none() && cell.first_solver().is_none())
        })
    }

    fn description() -> &'static str {
        "Locked cells are never owned"
    }
}
