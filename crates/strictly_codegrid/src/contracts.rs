//! Contract-based validation for capture attempts.
//!
//! Contracts formalize Hoare-style reasoning: {P} action {Q}. The
//! precondition is the legality gate; the postcondition re-checks the cell
//! invariants against the board before the attempt.

use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::board::Board;
use crate::error::{GameError, ValidationError};
use crate::invariants::{
    BoardInvariants, InvariantSet, InvariantViolation, Transition, TransitionInvariants,
};
use crate::types::{Position, Team};

/// A contract defines preconditions and postconditions for state transitions.
pub trait Contract<S, A> {
    /// Checks preconditions before applying the action.
    fn pre(state: &S, action: &A) -> Result<(), GameError>;

    /// Checks postconditions after applying the action.
    fn post(before: &S, after: &S) -> Result<(), GameError>;
}

/// A team trying to capture a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureAttempt {
    /// Target cell.
    pub position: Position,
    /// Attacking team.
    pub team: Team,
}

impl CaptureAttempt {
    /// Creates an attempt.
    pub fn new(position: Position, team: Team) -> Self {
        Self { position, team }
    }
}

/// Contract for capture attempts.
///
/// Preconditions:
/// - Position is on the board
/// - The team passes the cell's legality gate
///
/// Postconditions:
/// - Owned cells record a first solver; locked cells are unowned
/// - First solvers never change; failed teams never capture
pub struct CaptureContract;

impl Contract<Board, CaptureAttempt> for CaptureContract {
    #[instrument(skip(board))]
    fn pre(board: &Board, attempt: &CaptureAttempt) -> Result<(), GameError> {
        let cell = board
            .get(attempt.position)
            .ok_or(ValidationError::OutOfBounds(attempt.position))?;
        cell.check_attempt(attempt.team)?;
        Ok(())
    }

    #[instrument(skip_all)]
    fn post(before: &Board, after: &Board) -> Result<(), GameError> {
        let transition = Transition { before, after };
        let mut violations = Vec::new();
        if let Err(found) = BoardInvariants::check_all(after) {
            violations.extend(found);
        }
        if let Err(found) = TransitionInvariants::check_all(&transition) {
            violations.extend(found);
        }

        if violations.is_empty() {
            Ok(())
        } else {
            warn!(count = violations.len(), "Capture postcondition failed");
            Err(GameError::InvariantViolation(describe(&violations)))
        }
    }
}

fn describe(violations: &[InvariantViolation]) -> String {
    violations
        .iter()
        .map(|v| v.description.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}
