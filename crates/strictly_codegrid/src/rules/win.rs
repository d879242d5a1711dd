//! Win detection: K or more consecutive cells owned by one team.

use crate::board::{Board, Direction};
use crate::types::Team;
use tracing::instrument;

/// Checks if any team holds a run of at least `k` cells.
///
/// Lines are scanned rows first, then columns, principal diagonals and
/// anti-diagonals; the first run found wins.
#[instrument(skip(board), fields(size = board.size()))]
pub fn check_winner(board: &Board, k: usize) -> Option<Team> {
    if k == 0 {
        return None;
    }

    for direction in Direction::ALL {
        for line in board.lines(direction) {
            if line.len() < k {
                continue;
            }

            let mut run_owner = None;
            let mut run = 0;
            for pos in line {
                match board.owner_at(pos) {
                    Some(team) if run_owner == Some(team) => run += 1,
                    Some(team) => {
                        run_owner = Some(team);
                        run = 1;
                    }
                    None => {
                        run_owner = None;
                        run = 0;
                    }
                }
                if run >= k {
                    return run_owner;
                }
            }
        }
    }

    None
}
