//! Strictly Codegrid - territorial grid game where cells are captured by
//! solving programming challenges.
//!
//! Two teams (Red and Blue) compete on an N×N board. Every cell carries a
//! challenge; a team that solves it captures the cell, may later steal it
//! from the other team, and loses the chance forever on a wrong answer.
//! The first team with K owned cells in a row, column or diagonal wins.
//! When no window of K cells is free of locked cells the game is a tie.
//!
//! # Architecture
//!
//! - **Board**: grid geometry, lines and windows
//! - **Capture**: per-cell state machine behind a legality gate
//! - **Rules**: win and dead-board evaluation
//! - **Turn**: roster, sequential turns and phased buffering
//! - **Game**: the session aggregate composing all of the above
//! - **Challenge**: verifier and provider seams plus a built-in catalog
//!
//! # Example
//!
//! ```
//! use strictly_codegrid::{ChallengeCatalog, GameSession, Position, Submission, Team};
//!
//! # fn main() -> Result<(), strictly_codegrid::GameError> {
//! let catalog = ChallengeCatalog::builtin();
//! let mut game = GameSession::new(2)?;
//! game.register("alice", Team::Red, None)?;
//! game.register("bob", Team::Blue, None)?;
//!
//! let origin = Position::new(0, 0);
//! let challenge = game.challenge_for(origin, &catalog)?;
//! assert_eq!(challenge.as_str(), "addition");
//!
//! game.submit_attempt("alice", origin, Submission::new("30"), &catalog, &catalog)?;
//! assert_eq!(game.board().owner_at(origin), Some(Team::Red));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod board;
mod capture;
mod challenge;
mod contracts;
mod error;
mod game;
pub mod invariants;
pub mod rules;
mod turn;
mod types;

pub use board::{Board, Cell, Direction};
pub use capture::{CaptureOutcome, attempt_capture};
pub use challenge::{
    CatalogError, Challenge, ChallengeCatalog, ChallengeProvider, ChallengeRef, ChallengeVerifier,
    Submission, Verdict, VerifierFault, judge,
};
pub use contracts::{CaptureAttempt, CaptureContract, Contract};
pub use error::{CaptureRejection, GameError, TurnViolation, ValidationError};
pub use game::{AttemptReport, GameSession, GameView, SubmitOutcome};
pub use rules::{alive_windows, check_winner, evaluate, is_dead, is_terminal};
pub use turn::{PendingMove, TurnController, TurnState};
pub use types::{Mode, Outcome, Player, Position, Role, Seat, Team};
