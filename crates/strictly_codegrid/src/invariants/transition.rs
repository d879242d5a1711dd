//! Invariants relating the board before and after an attempt.

use super::{Invariant, Transition};

/// Invariant: a first solver, once recorded, never changes.
pub struct FirstSolverStable;

impl Invariant<Transition<'_>> for FirstSolverStable {
    fn holds(transition: &Transition<'_>) -> bool {
        transition
            .before
            .iter()
            .zip(transition.after.iter())
            .all(|((_, before), (_, after))| {
                before.first_solver().is_none() || before.first_solver() == after.first_solver()
            })
    }

    fn description() -> &'static str {
        "First solver never changes once set"
    }
}

/// Invariant: a team that failed on a cell never takes it over.
pub struct FailedTeamsNeverCapture;

impl Invariant<Transition<'_>> for FailedTeamsNeverCapture {
    fn holds(transition: &Transition<'_>) -> bool {
        transition
            .before
            .iter()
            .zip(transition.after.iter())
            .all(|((_, before), (_, after))| match after.owner() {
                Some(team) if after.owner() != before.owner() => !before.failed().contains(&team),
                _ => true,
            })
    }

    fn description() -> &'static str {
        "Teams that failed on a cell never capture it"
    }
}
