//! The per-match aggregate and its public entry points.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::board::{Board, Cell};
use crate::capture::{CaptureOutcome, attempt_capture};
use crate::challenge::{
    ChallengeProvider, ChallengeRef, ChallengeVerifier, Submission, Verdict, judge,
};
use crate::contracts::{CaptureAttempt, CaptureContract, Contract};
use crate::error::{CaptureRejection, GameError, TurnViolation, ValidationError};
use crate::rules;
use crate::turn::{PendingMove, TurnController, TurnState};
use crate::types::{Mode, Outcome, Player, Position, Role, Seat, Team};

/// One resolved (or gate-rejected) attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptReport {
    /// Submitting player.
    pub player: String,
    /// Seat of the submitting player.
    pub seat: Seat,
    /// Target cell.
    pub position: Position,
    /// Capture outcome, or the gate rejection found at resolution time.
    pub result: Result<CaptureOutcome, CaptureRejection>,
}

impl std::fmt::Display for AttemptReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.result {
            Ok(outcome) => write!(
                f,
                "{} ({}) at {}: {}",
                self.player, self.seat, self.position, outcome
            ),
            Err(rejection) => write!(
                f,
                "{} ({}) at {}: rejected: {}",
                self.player, self.seat, self.position, rejection
            ),
        }
    }
}

/// What happened to a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Attempts were applied, in order. One in 2-team mode, two when a
    /// phase completes in 4-team mode.
    Resolved(Vec<AttemptReport>),
    /// The move is held until these seats submit.
    Buffered {
        /// Seats still expected this phase.
        waiting_for: Vec<Seat>,
    },
}

/// Read-only projection of a session for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameView {
    /// Game mode.
    pub mode: Mode,
    /// Board snapshot.
    pub board: Board,
    /// Recorded outcome.
    pub outcome: Option<Outcome>,
    /// Turn counter.
    pub turn_index: usize,
    /// Active role in 4-team mode.
    pub phase: Option<Role>,
    /// Next player expected to move.
    pub current_seat: Option<Player>,
    /// Turn state.
    pub turn: TurnState,
    /// Seats allowed to submit now.
    pub awaiting: Vec<Seat>,
    /// Seats with a buffered move this phase.
    pub pending: Vec<Seat>,
    /// Seats excused from this phase for lack of a legal cell.
    pub sitting_out: Vec<Seat>,
    /// Registered players in join order.
    pub roster: Vec<Player>,
}

/// One match: board, roster, turn bookkeeping and outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSession {
    mode: Mode,
    board: Board,
    turns: TurnController,
    outcome: Option<Outcome>,
}

impl GameSession {
    /// Creates a session for 2 or 4 players.
    #[instrument]
    pub fn new(num_players: usize) -> Result<Self, GameError> {
        let mode = Mode::from_player_count(num_players)
            .ok_or(ValidationError::InvalidPlayerCount(num_players))?;
        info!(?mode, size = mode.board_size(), "Creating game session");
        Ok(Self {
            mode,
            board: Board::new(mode.board_size()),
            turns: TurnController::new(mode),
            outcome: None,
        })
    }

    /// Game mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Roster and turn bookkeeping.
    pub fn turns(&self) -> &TurnController {
        &self.turns
    }

    /// Recorded outcome, if the game is over.
    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// Registers a player in a seat.
    #[instrument(skip(self))]
    pub fn register(
        &mut self,
        name: &str,
        team: Team,
        role: Option<Role>,
    ) -> Result<Player, GameError> {
        Ok(self.turns.register(name, Seat::new(team, role))?)
    }

    /// Next player expected to move; `None` before the roster fills and
    /// after the game ends.
    pub fn current_seat(&self) -> Option<&Player> {
        if self.outcome.is_some() {
            return None;
        }
        self.turns.current_player()
    }

    /// Challenge attached to a cell, assigned by `provider` on first visit.
    ///
    /// Locked cells and finished games offer no challenge.
    #[instrument(skip(self, provider))]
    pub fn challenge_for<P>(
        &mut self,
        position: Position,
        provider: &P,
    ) -> Result<ChallengeRef, GameError>
    where
        P: ChallengeProvider + ?Sized,
    {
        if self.outcome.is_some() {
            return Err(TurnViolation::GameAlreadyFinished.into());
        }
        let size = self.board.size();
        let cell = self
            .board
            .get_mut(position)
            .ok_or(ValidationError::OutOfBounds(position))?;
        if cell.is_locked() {
            return Err(CaptureRejection::CellLocked.into());
        }
        Ok(assign_challenge(cell, position, size, provider))
    }

    /// Submits a solution for a cell on behalf of a player.
    ///
    /// In 2-team mode the attempt resolves immediately and the turn
    /// advances by one, whether it captured the cell or not. In 4-team mode
    /// the first seat of a phase is buffered; the second triggers
    /// resolution of both moves in submission order against the board as
    /// updated by the first, then the turn advances by two.
    ///
    /// Gate rejections known at submission time are returned as errors and
    /// change nothing. After each resolution, seats whose team has no legal
    /// cell left are skipped, and the game ties when neither team has one.
    #[instrument(skip(self, submission, provider, verifier), fields(mode = ?self.mode))]
    pub fn submit_attempt<P, V>(
        &mut self,
        player: &str,
        position: Position,
        submission: Submission,
        provider: &P,
        verifier: &V,
    ) -> Result<SubmitOutcome, GameError>
    where
        P: ChallengeProvider + ?Sized,
        V: ChallengeVerifier + ?Sized,
    {
        if self.outcome.is_some() {
            return Err(TurnViolation::GameAlreadyFinished.into());
        }
        if !self.board.contains(position) {
            return Err(ValidationError::OutOfBounds(position).into());
        }
        let seat = self.turns.authorize(player)?.seat();
        CaptureContract::pre(&self.board, &CaptureAttempt::new(position, seat.team))?;

        let size = self.board.size();
        if let Some(cell) = self.board.get_mut(position) {
            assign_challenge(cell, position, size, provider);
        }

        let pending = PendingMove {
            player: player.to_string(),
            seat,
            position,
            submission,
        };

        match self.mode {
            Mode::TwoTeam => {
                let report = resolve(&mut self.board, &pending, verifier)?;
                self.turns.advance(1);
                self.update_outcome();
                self.settle_turn();
                Ok(SubmitOutcome::Resolved(vec![report]))
            }
            Mode::FourTeam => {
                self.turns.buffer(pending);
                if !self.turns.phase_complete() {
                    let waiting_for = self.turns.awaiting();
                    info!(?waiting_for, "Move buffered, waiting for partner seat");
                    return Ok(SubmitOutcome::Buffered { waiting_for });
                }
                match self.resolve_phase(verifier) {
                    Ok(reports) => Ok(SubmitOutcome::Resolved(reports)),
                    Err(err) => {
                        // Both seats may submit again.
                        let dropped = self.turns.take_pending();
                        warn!(%err, dropped = dropped.len(), "Phase resolution failed");
                        Err(err)
                    }
                }
            }
        }
    }

    /// Applies both buffered moves of the phase atomically.
    fn resolve_phase<V>(&mut self, verifier: &V) -> Result<Vec<AttemptReport>, GameError>
    where
        V: ChallengeVerifier + ?Sized,
    {
        let mut board = self.board.clone();
        let reports = self
            .turns
            .pending()
            .iter()
            .map(|pending| resolve(&mut board, pending, verifier))
            .collect::<Result<Vec<_>, _>>()?;

        self.board = board;
        self.turns.take_pending();
        self.turns.advance(2);
        info!(count = reports.len(), phase = ?self.turns.phase(), "Phase resolved");
        self.update_outcome();
        self.settle_turn();
        Ok(reports)
    }

    /// Records the outcome once the board is decided.
    fn update_outcome(&mut self) {
        if self.outcome.is_some() {
            return;
        }
        if let Some(outcome) = rules::evaluate(&self.board, self.mode.win_length()) {
            info!(%outcome, turn_index = self.turns.turn_index(), "Game finished");
            self.outcome = Some(outcome);
        }
    }

    /// Moves past seats that cannot play.
    ///
    /// A seat whose team fails the gate on every cell is skipped in 2-team
    /// mode and sits the phase out in 4-team mode. When neither team has a
    /// legal cell the board can never change again, so the game is a tie
    /// even if windows remain alive.
    fn settle_turn(&mut self) {
        if self.outcome.is_some() || !self.turns.is_full() {
            return;
        }
        let red = self.board.has_legal_move(Team::Red);
        let blue = self.board.has_legal_move(Team::Blue);
        if !red && !blue {
            info!(turn_index = self.turns.turn_index(), "No legal cell for either team");
            self.outcome = Some(Outcome::Tie);
            return;
        }

        match self.mode {
            Mode::TwoTeam => {
                // One team can move, so at most one skip per other seat.
                for _ in 0..self.turns.roster().len() {
                    let Some(seat) = self.turns.awaiting().first().copied() else {
                        return;
                    };
                    if self.board.has_legal_move(seat.team) {
                        return;
                    }
                    info!(%seat, "No legal cell, turn skipped");
                    self.turns.advance(1);
                }
            }
            Mode::FourTeam => {
                for seat in self.turns.awaiting() {
                    if !self.board.has_legal_move(seat.team) {
                        self.turns.sit_out(seat);
                    }
                }
            }
        }
    }

    /// Read-only projection for display.
    pub fn state(&self) -> GameView {
        GameView {
            mode: self.mode,
            board: self.board.clone(),
            outcome: self.outcome,
            turn_index: self.turns.turn_index(),
            phase: self.turns.phase(),
            current_seat: self.current_seat().cloned(),
            turn: self.turns.state(self.outcome),
            awaiting: if self.outcome.is_some() {
                Vec::new()
            } else {
                self.turns.awaiting()
            },
            pending: self.turns.pending().iter().map(|m| m.seat).collect(),
            sitting_out: self.turns.sitting_out().to_vec(),
            roster: self.turns.roster().to_vec(),
        }
    }

    /// Serializes the whole session as JSON.
    #[instrument(skip(self))]
    pub fn to_snapshot(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Restores a session from [`GameSession::to_snapshot`] output.
    #[instrument(skip(snapshot))]
    pub fn from_snapshot(snapshot: &str) -> Result<Self, serde_json::Error> {
        let session: Self = serde_json::from_str(snapshot)?;
        debug!(mode = ?session.mode, turn_index = session.turns.turn_index(), "Session restored");
        Ok(session)
    }
}

fn assign_challenge<P>(
    cell: &mut Cell,
    position: Position,
    size: usize,
    provider: &P,
) -> ChallengeRef
where
    P: ChallengeProvider + ?Sized,
{
    cell.challenge
        .get_or_insert_with(|| {
            let challenge = provider.challenge_for(position, size);
            debug!(%position, %challenge, "Challenge assigned");
            challenge
        })
        .clone()
}

/// Runs one move against `board`, turning gate rejections into reports.
fn resolve<V>(
    board: &mut Board,
    pending: &PendingMove,
    verifier: &V,
) -> Result<AttemptReport, GameError>
where
    V: ChallengeVerifier + ?Sized,
{
    let verify = |cell: &Cell| match cell.challenge() {
        Some(challenge) => judge(verifier, challenge, &pending.submission),
        None => Verdict::Fail("No challenge attached to this cell".to_string()),
    };

    let result = match attempt_capture(board, pending.position, pending.seat.team, verify) {
        Ok(outcome) => Ok(outcome),
        Err(GameError::Capture(rejection)) => {
            warn!(player = %pending.player, %rejection, "Buffered move rejected at resolution");
            Err(rejection)
        }
        Err(other) => return Err(other),
    };

    Ok(AttemptReport {
        player: pending.player.clone(),
        seat: pending.seat,
        position: pending.position,
        result,
    })
}
