//! The per-cell capture state machine.
//!
//! An attempt first passes the legality gate, then is resolved with the
//! verdict for the submitted solution:
//!
//! | cell     | `Pass`                       | `Fail`                  |
//! |----------|------------------------------|-------------------------|
//! | unowned  | owner and first solver = team | cell locked for everyone |
//! | owned    | owner = team (steal)          | team added to `failed`   |

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::board::{Board, Cell};
use crate::challenge::Verdict;
use crate::contracts::{CaptureAttempt, CaptureContract, Contract};
use crate::error::{CaptureRejection, GameError, ValidationError};
use crate::types::{Position, Team};

/// Result of a resolved attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureOutcome {
    /// The team now owns the cell.
    Captured {
        /// Previous owner, when the capture was a steal.
        stolen_from: Option<Team>,
    },
    /// The submission was rejected.
    Failed {
        /// Verifier diagnostic.
        reason: String,
        /// Whether this failure locked the cell.
        locked: bool,
    },
}

impl std::fmt::Display for CaptureOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureOutcome::Captured { stolen_from: None } => {
                write!(f, "Correct answer, cell captured")
            }
            CaptureOutcome::Captured {
                stolen_from: Some(team),
            } => write!(f, "Correct answer, cell stolen from {}", team),
            CaptureOutcome::Failed { reason, locked: true } => {
                write!(f, "Wrong answer ({}), cell locked", reason)
            }
            CaptureOutcome::Failed {
                reason,
                locked: false,
            } => write!(f, "Wrong answer ({})", reason),
        }
    }
}

impl Cell {
    /// The legality gate, checked before any verifier runs.
    ///
    /// Checks in order: the team already failed here, the team solved the
    /// cell first, the cell is locked.
    pub fn check_attempt(&self, team: Team) -> Result<(), CaptureRejection> {
        if self.failed.contains(&team) {
            return Err(CaptureRejection::AlreadyFailed);
        }
        if self.owner.is_some() && self.first_solver == Some(team) {
            return Err(CaptureRejection::CannotRetryOwnWin);
        }
        if self.locked {
            return Err(CaptureRejection::CellLocked);
        }
        Ok(())
    }

    /// Applies a verdict for a team that passed the gate.
    pub(crate) fn resolve(&mut self, team: Team, verdict: Verdict) -> CaptureOutcome {
        match verdict {
            Verdict::Fail(reason) => {
                let locked = self.owner.is_none();
                if locked {
                    self.locked = true;
                } else {
                    self.failed.insert(team);
                }
                CaptureOutcome::Failed { reason, locked }
            }
            Verdict::Pass => {
                if self.owner.is_none() {
                    self.first_solver = Some(team);
                }
                let stolen_from = self.owner.replace(team).filter(|prev| *prev != team);
                CaptureOutcome::Captured { stolen_from }
            }
        }
    }
}

/// Runs one capture attempt against the board.
///
/// `verify` is called only when the gate passes, with the target cell, and
/// must return the verdict for the submitted solution. Gate rejections
/// leave the board untouched. Each call that reaches `verify` consumes one
/// attempt.
#[instrument(skip(board, verify))]
pub fn attempt_capture<F>(
    board: &mut Board,
    position: Position,
    team: Team,
    verify: F,
) -> Result<CaptureOutcome, GameError>
where
    F: FnOnce(&Cell) -> Verdict,
{
    let attempt = CaptureAttempt::new(position, team);
    CaptureContract::pre(board, &attempt)?;

    #[cfg(debug_assertions)]
    let before = board.clone();

    let cell = board
        .get_mut(position)
        .ok_or(ValidationError::OutOfBounds(position))?;
    let verdict = verify(cell);
    debug!(pass = verdict.is_pass(), "Verdict received");
    let outcome = cell.resolve(team, verdict);

    #[cfg(debug_assertions)]
    CaptureContract::post(&before, board)?;

    info!(%position, %team, %outcome, "Capture attempt resolved");
    Ok(outcome)
}
