//! Game rules for the capture grid.
//!
//! Pure functions over a [`Board`] and a run length. Rules are kept apart
//! from board storage so the session and the contracts can compose them.

pub mod tie;
pub mod win;

pub use tie::{alive_windows, is_dead};
pub use win::check_winner;

use crate::board::Board;
use crate::types::Outcome;
use tracing::instrument;

/// Outcome of the board, if the game is over.
///
/// A completed run takes precedence over a dead board.
#[instrument(skip(board), fields(size = board.size()))]
pub fn evaluate(board: &Board, k: usize) -> Option<Outcome> {
    if let Some(team) = check_winner(board, k) {
        return Some(Outcome::Winner(team));
    }
    is_dead(board, k).then_some(Outcome::Tie)
}

/// Whether the board admits no further play.
pub fn is_terminal(board: &Board, k: usize) -> bool {
    evaluate(board, k).is_some()
}
