//! Error types for game operations.
//!
//! Every failure is a value. Validation and turn errors never mutate state;
//! capture rejections from the legality gate are no-ops as well.

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::types::{Mode, Position, Seat};

/// Bad input to session setup or registration.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum ValidationError {
    /// Only 2 and 4 players are supported.
    #[display("Invalid player count {} (must be 2 or 4)", _0)]
    InvalidPlayerCount(usize),

    /// Another player already uses this name.
    #[display("Name {:?} is already taken", _0)]
    DuplicateName(String),

    /// Another player already occupies this seat.
    #[display("Seat {} is already taken", _0)]
    SeatTaken(Seat),

    /// Every seat is occupied.
    #[display("Roster is full")]
    RosterFull,

    /// Role given in 2-team mode, or missing in 4-team mode.
    #[display("Seat {} is not valid in {:?} mode", seat, mode)]
    InvalidSeat {
        /// The requested seat.
        seat: Seat,
        /// Mode of the game.
        mode: Mode,
    },

    /// Position lies outside the board.
    #[display("Position {} is off the board", _0)]
    OutOfBounds(Position),

    /// No player with this name is registered.
    #[display("Unknown player {:?}", _0)]
    UnknownPlayer(String),
}

impl std::error::Error for ValidationError {}

/// Submission made at the wrong time.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum TurnViolation {
    /// The player does not hold an awaiting seat.
    #[display("It's not {}'s turn", _0)]
    NotYourTurn(String),

    /// An outcome has been recorded.
    #[display("Game is already finished")]
    GameAlreadyFinished,

    /// Play starts once every seat is taken.
    #[display("Waiting for players ({} of {} registered)", registered, needed)]
    RosterIncomplete {
        /// Players registered so far.
        registered: usize,
        /// Players required.
        needed: usize,
    },

    /// The seat already has a move buffered for this phase.
    #[display("Seat {} has already submitted this phase", _0)]
    AlreadySubmitted(Seat),
}

impl std::error::Error for TurnViolation {}

/// Legality gate rejection. Never mutates the cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum CaptureRejection {
    /// The team already failed a steal on this cell.
    #[display("Your team already failed to capture this cell")]
    AlreadyFailed,

    /// The team solved this cell first and may never retry it.
    #[display("You cannot retry a cell your team solved first")]
    CannotRetryOwnWin,

    /// The cell is blocked for everyone.
    #[display("Cell is locked, no further attempts are possible")]
    CellLocked,
}

impl std::error::Error for CaptureRejection {}

/// Any error returned by a game session.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum GameError {
    /// Bad input.
    #[display("{}", _0)]
    Validation(ValidationError),

    /// Out-of-turn or post-game submission.
    #[display("{}", _0)]
    Turn(TurnViolation),

    /// The legality gate refused the attempt.
    #[display("{}", _0)]
    Capture(CaptureRejection),

    /// A postcondition failed (a bug, not a player error).
    #[display("Invariant violation: {}", _0)]
    InvariantViolation(String),
}

impl std::error::Error for GameError {}

impl From<ValidationError> for GameError {
    fn from(err: ValidationError) -> Self {
        GameError::Validation(err)
    }
}

impl From<TurnViolation> for GameError {
    fn from(err: TurnViolation) -> Self {
        GameError::Turn(err)
    }
}

impl From<CaptureRejection> for GameError {
    fn from(err: CaptureRejection) -> Self {
        GameError::Capture(err)
    }
}
