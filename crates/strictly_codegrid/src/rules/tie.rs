//! Tie detection by alive windows.
//!
//! A window is K consecutive cells along a row, column or diagonal. It is
//! alive while none of its cells is locked, since only a lock takes a cell
//! out of play for good. The board is dead when no alive window remains,
//! which can happen long before the board fills up.

use crate::board::Board;
use tracing::{debug, instrument};

/// Number of windows of length `k` that could still hold a winning run.
#[instrument(skip(board), fields(size = board.size()))]
pub fn alive_windows(board: &Board, k: usize) -> usize {
    board
        .windows(k)
        .iter()
        .filter(|window| window.iter().all(|&pos| !board.is_locked(pos)))
        .count()
}

/// Checks whether no run of length `k` can ever be completed.
#[instrument(skip(board), fields(size = board.size()))]
pub fn is_dead(board: &Board, k: usize) -> bool {
    let alive = alive_windows(board, k);
    debug!(alive, "Counted alive windows");
    alive == 0
}
