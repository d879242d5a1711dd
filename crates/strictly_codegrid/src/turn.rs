//! Turn controller: roster, turn order and phase buffering.
//!
//! In 2-team mode one seat moves per turn and the counter advances by one
//! after every applied attempt. In 4-team mode the counter walks the phase
//! sequence `[red/p1, blue/p1, red/p2, blue/p2]` two seats at a time: both
//! seats sharing the active role submit, the first submission is buffered,
//! and the pair is resolved together when the second arrives. A seat
//! whose team has no legal cell sits the phase out, and the pair resolves
//! with the other seat's move alone.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::challenge::Submission;
use crate::error::{GameError, TurnViolation, ValidationError};
use crate::types::{Mode, Outcome, Player, Position, Role, Seat, Team};

/// A move held until the other seat of the phase submits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMove {
    /// Submitting player.
    pub player: String,
    /// Seat of the submitting player.
    pub seat: Seat,
    /// Target cell.
    pub position: Position,
    /// Solution text, verified at resolution time.
    pub submission: Submission,
}

/// Where the game stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    /// Seats remain open; nobody may move yet.
    AwaitingRoster {
        /// Players registered so far.
        registered: usize,
        /// Players required.
        needed: usize,
    },
    /// These seats may submit now.
    AwaitingMove(Vec<Seat>),
    /// An outcome is recorded; submissions are rejected.
    Finished(Outcome),
}

/// Roster and turn bookkeeping for one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnController {
    mode: Mode,
    roster: Vec<Player>,
    turn_index: usize,
    pending: Vec<PendingMove>,
    #[serde(default)]
    sitting_out: Vec<Seat>,
}

impl TurnController {
    /// Creates an empty controller.
    #[instrument]
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            roster: Vec::new(),
            turn_index: 0,
            pending: Vec::new(),
            sitting_out: Vec::new(),
        }
    }

    /// Game mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Registered players in join order.
    pub fn roster(&self) -> &[Player] {
        &self.roster
    }

    /// Turn counter.
    pub fn turn_index(&self) -> usize {
        self.turn_index
    }

    /// Moves buffered for the active phase, in submission order.
    pub fn pending(&self) -> &[PendingMove] {
        &self.pending
    }

    /// Seats excused from the active phase.
    pub fn sitting_out(&self) -> &[Seat] {
        &self.sitting_out
    }

    /// Whether every seat is taken.
    pub fn is_full(&self) -> bool {
        self.roster.len() >= self.mode.num_players()
    }

    /// Looks up a player by exact name.
    pub fn player(&self, name: &str) -> Option<&Player> {
        self.roster.iter().find(|p| p.name() == name)
    }

    /// Registers a player.
    ///
    /// Checks the seat shape for the mode, then duplicate names, a full
    /// roster and an occupied seat, in that order.
    #[instrument(skip(self), fields(mode = ?self.mode))]
    pub fn register(&mut self, name: &str, seat: Seat) -> Result<Player, ValidationError> {
        if self.mode.uses_roles() != seat.role.is_some() {
            warn!(%seat, "Seat does not match mode");
            return Err(ValidationError::InvalidSeat {
                seat,
                mode: self.mode,
            });
        }
        if self.player(name).is_some() {
            warn!(name, "Name already registered");
            return Err(ValidationError::DuplicateName(name.to_string()));
        }
        if self.is_full() {
            warn!(name, "Roster is full");
            return Err(ValidationError::RosterFull);
        }
        if self.roster.iter().any(|p| p.seat() == seat) {
            warn!(name, %seat, "Seat already taken");
            return Err(ValidationError::SeatTaken(seat));
        }

        let player = Player::new(name, seat);
        self.roster.push(player.clone());
        info!(name, %seat, registered = self.roster.len(), "Player registered");
        Ok(player)
    }

    /// Players in the order they take turns.
    ///
    /// 2-team: grouped by team (red first), join order within a team.
    /// 4-team: the fixed phase sequence, skipping open seats.
    pub fn turn_order(&self) -> Vec<&Player> {
        match self.mode {
            Mode::TwoTeam => [Team::Red, Team::Blue]
                .into_iter()
                .flat_map(|team| self.roster.iter().filter(move |p| p.team() == team))
                .collect(),
            Mode::FourTeam => Mode::phase_order()
                .iter()
                .filter_map(|seat| self.roster.iter().find(|p| p.seat() == *seat))
                .collect(),
        }
    }

    /// Active role in 4-team mode.
    pub fn phase(&self) -> Option<Role> {
        match self.mode {
            Mode::TwoTeam => None,
            Mode::FourTeam if self.turn_index % 4 < 2 => Some(Role::P1),
            Mode::FourTeam => Some(Role::P2),
        }
    }

    /// Seats allowed to submit now. Empty until the roster is full.
    pub fn awaiting(&self) -> Vec<Seat> {
        if !self.is_full() {
            return Vec::new();
        }
        match self.phase() {
            None => {
                let order = self.turn_order();
                order
                    .get(self.turn_index % order.len().max(1))
                    .map(|p| vec![p.seat()])
                    .unwrap_or_default()
            }
            Some(role) => Mode::phase_order()
                .iter()
                .filter(|seat| seat.role == Some(role))
                .filter(|seat| !self.pending.iter().any(|m| m.seat == **seat))
                .filter(|seat| !self.sitting_out.contains(seat))
                .copied()
                .collect(),
        }
    }

    /// The next player expected to move, if any.
    pub fn current_player(&self) -> Option<&Player> {
        let seat = self.awaiting().into_iter().next()?;
        self.roster.iter().find(|p| p.seat() == seat)
    }

    /// Turn state given the recorded outcome.
    pub fn state(&self, outcome: Option<Outcome>) -> TurnState {
        match outcome {
            Some(outcome) => TurnState::Finished(outcome),
            None if !self.is_full() => TurnState::AwaitingRoster {
                registered: self.roster.len(),
                needed: self.mode.num_players(),
            },
            None => TurnState::AwaitingMove(self.awaiting()),
        }
    }

    /// Checks that `name` may submit now and returns the player.
    #[instrument(skip(self))]
    pub fn authorize(&self, name: &str) -> Result<&Player, GameError> {
        let player = self
            .player(name)
            .ok_or_else(|| ValidationError::UnknownPlayer(name.to_string()))?;

        if !self.is_full() {
            return Err(TurnViolation::RosterIncomplete {
                registered: self.roster.len(),
                needed: self.mode.num_players(),
            }
            .into());
        }

        if self.pending.iter().any(|m| m.seat == player.seat()) {
            return Err(TurnViolation::AlreadySubmitted(player.seat()).into());
        }

        if !self.awaiting().contains(&player.seat()) {
            debug!(name, seat = %player.seat(), "Out-of-turn submission");
            return Err(TurnViolation::NotYourTurn(name.to_string()).into());
        }

        Ok(player)
    }

    /// Holds a phased move until its partner arrives.
    pub(crate) fn buffer(&mut self, pending: PendingMove) {
        debug!(seat = %pending.seat, position = %pending.position, "Move buffered");
        self.pending.push(pending);
    }

    /// Excuses a seat from the active phase.
    pub(crate) fn sit_out(&mut self, seat: Seat) {
        info!(%seat, "Seat sits out this phase");
        self.sitting_out.push(seat);
    }

    /// Whether every seat of the active phase has submitted or sits out.
    pub(crate) fn phase_complete(&self) -> bool {
        self.phase().is_some() && self.awaiting().is_empty()
    }

    /// Removes the buffered moves in submission order.
    pub(crate) fn take_pending(&mut self) -> Vec<PendingMove> {
        std::mem::take(&mut self.pending)
    }

    /// Advances the turn counter.
    pub(crate) fn advance(&mut self, steps: usize) {
        self.turn_index += steps;
        self.sitting_out.clear();
        debug!(turn_index = self.turn_index, phase = ?self.phase(), "Turn advanced");
    }
}
