//! First-class invariants for the capture grid.
//!
//! Invariants are logical properties of cells that must hold throughout a
//! game. Board invariants hold for any single state; transition invariants
//! relate the board before and after a resolved attempt.

use crate::board::Board;

/// A logical property that must hold for a given state.
pub trait Invariant<S> {
    /// Checks if the invariant holds for the given state.
    fn holds(state: &S) -> bool;

    /// Human-readable description of the invariant.
    fn description() -> &'static str;
}

/// Violation of an invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub description: String,
}

impl InvariantViolation {
    /// Creates a new invariant violation.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// A set of invariants checked together. Implemented for pairs.
pub trait InvariantSet<S> {
    /// Checks all invariants in the set, collecting every violation.
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>>;
}

impl<S, I1, I2> InvariantSet<S> for (I1, I2)
where
    I1: Invariant<S>,
    I2: Invariant<S>,
{
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>> {
        let mut violations = Vec::new();

        if !I1::holds(state) {
            violations.push(InvariantViolation::new(I1::description()));
        }

        if !I2::holds(state) {
            violations.push(InvariantViolation::new(I2::description()));
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

/// A board before and after one resolved attempt.
#[derive(Debug, Clone, Copy)]
pub struct Transition<'a> {
    /// Board before the attempt.
    pub before: &'a Board,
    /// Board after the attempt.
    pub after: &'a Board,
}

pub mod ownership;
pub mod transition;

pub use ownership::{LockedCellsUnowned, OwnerHasFirstSolver};
pub use transition::{FailedTeamsNeverCapture, FirstSolverStable};

/// Invariants of a single board state.
pub type BoardInvariants = (OwnerHasFirstSolver, LockedCellsUnowned);

/// Invariants of a board transition.
pub type TransitionInvariants = (FirstSolverStable, FailedTeamsNeverCapture);
