//! Session-level tests driven by a scripted verifier.

use std::cell::RefCell;

use strictly_codegrid::{
    CaptureOutcome, CaptureRejection, ChallengeProvider, ChallengeRef, ChallengeVerifier,
    GameError, GameSession, Outcome, Player, Position, Role, Seat, Submission, SubmitOutcome,
    Team, TurnState, TurnViolation, ValidationError, Verdict, VerifierFault,
};

/// Accepts the submission "pass", faults on "timeout", fails everything
/// else, and records every call.
#[derive(Default)]
struct Scripted {
    calls: RefCell<Vec<(ChallengeRef, String)>>,
}

impl Scripted {
    fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl ChallengeVerifier for Scripted {
    fn verify(
        &self,
        challenge: &ChallengeRef,
        submission: &Submission,
    ) -> Result<Verdict, VerifierFault> {
        self.calls
            .borrow_mut()
            .push((challenge.clone(), submission.as_str().to_string()));
        match submission.as_str() {
            "pass" => Ok(Verdict::Pass),
            "timeout" => Err(VerifierFault::TimedOut),
            _ => Ok(Verdict::Fail("wrong answer".to_string())),
        }
    }
}

struct Grid;

impl ChallengeProvider for Grid {
    fn challenge_for(&self, position: Position, _: usize) -> ChallengeRef {
        ChallengeRef::new(format!("task-{}-{}", position.row, position.col))
    }
}

struct Table {
    game: GameSession,
    verifier: Scripted,
}

impl Table {
    fn two_team() -> Self {
        let mut game = GameSession::new(2).unwrap();
        game.register("alice", Team::Red, None).unwrap();
        game.register("bob", Team::Blue, None).unwrap();
        Self {
            game,
            verifier: Scripted::default(),
        }
    }

    fn four_team() -> Self {
        let mut game = GameSession::new(4).unwrap();
        game.register("ann", Team::Red, Some(Role::P1)).unwrap();
        game.register("ben", Team::Blue, Some(Role::P1)).unwrap();
        game.register("cat", Team::Red, Some(Role::P2)).unwrap();
        game.register("dan", Team::Blue, Some(Role::P2)).unwrap();
        Self {
            game,
            verifier: Scripted::default(),
        }
    }

    fn submit(
        &mut self,
        player: &str,
        row: usize,
        col: usize,
        text: &str,
    ) -> Result<SubmitOutcome, GameError> {
        self.game.submit_attempt(
            player,
            Position::new(row, col),
            Submission::new(text),
            &Grid,
            &self.verifier,
        )
    }

    fn resolved(
        &mut self,
        player: &str,
        row: usize,
        col: usize,
        text: &str,
    ) -> Vec<Result<CaptureOutcome, CaptureRejection>> {
        match self.submit(player, row, col, text) {
            Ok(SubmitOutcome::Resolved(reports)) => {
                reports.into_iter().map(|r| r.result).collect()
            }
            other => panic!("expected resolution, got {other:?}"),
        }
    }
}

const CAPTURED: Result<CaptureOutcome, CaptureRejection> =
    Ok(CaptureOutcome::Captured { stolen_from: None });

#[test]
fn test_two_team_capture_scenario() {
    let mut table = Table::two_team();
    let origin = Position::new(0, 0);

    assert_eq!(table.resolved("alice", 0, 0, "pass"), vec![CAPTURED]);
    let cell = table.game.board().get(origin).unwrap();
    assert_eq!(cell.owner(), Some(Team::Red));
    assert_eq!(cell.first_solver(), Some(Team::Red));

    let results = table.resolved("bob", 0, 0, "nope");
    assert!(matches!(results[0], Ok(CaptureOutcome::Failed { locked: false, .. })));
    let cell = table.game.board().get(origin).unwrap();
    assert_eq!(cell.owner(), Some(Team::Red));
    assert!(cell.failed().contains(&Team::Blue));
    assert!(!cell.is_locked());

    // Back to alice, who may not retry a cell her team solved first.
    let calls = table.verifier.call_count();
    assert_eq!(
        table.submit("alice", 0, 0, "pass").unwrap_err(),
        GameError::Capture(CaptureRejection::CannotRetryOwnWin)
    );
    assert_eq!(table.verifier.call_count(), calls);
    assert_eq!(table.game.current_seat().map(Player::name), Some("alice"));
    assert_eq!(table.game.turns().turn_index(), 2);
}

#[test]
fn test_failed_team_locked_out_for_good() {
    let mut table = Table::two_team();
    table.resolved("alice", 1, 1, "pass");
    table.resolved("bob", 1, 1, "nope");
    table.resolved("alice", 0, 0, "pass");

    let calls = table.verifier.call_count();
    assert_eq!(
        table.submit("bob", 1, 1, "pass").unwrap_err(),
        GameError::Capture(CaptureRejection::AlreadyFailed)
    );
    assert_eq!(table.verifier.call_count(), calls);
    assert_eq!(table.game.board().owner_at(Position::new(1, 1)), Some(Team::Red));
}

#[test]
fn test_first_solver_survives_steal() {
    let mut table = Table::two_team();
    table.resolved("alice", 2, 0, "pass");
    assert_eq!(
        table.resolved("bob", 2, 0, "pass"),
        vec![Ok(CaptureOutcome::Captured {
            stolen_from: Some(Team::Red)
        })]
    );

    let cell = table.game.board().get(Position::new(2, 0)).unwrap();
    assert_eq!(cell.owner(), Some(Team::Blue));
    assert_eq!(cell.first_solver(), Some(Team::Red));

    assert_eq!(
        table.submit("alice", 2, 0, "pass").unwrap_err(),
        GameError::Capture(CaptureRejection::CannotRetryOwnWin)
    );
}

#[test]
fn test_three_in_a_row_finishes_game() {
    let mut table = Table::two_team();
    table.resolved("alice", 0, 0, "pass");
    table.resolved("bob", 2, 2, "nope");
    table.resolved("alice", 0, 1, "pass");
    table.resolved("bob", 2, 1, "nope");
    assert_eq!(table.game.outcome(), None);
    table.resolved("alice", 0, 2, "pass");

    assert_eq!(table.game.outcome(), Some(Outcome::Winner(Team::Red)));
    assert_eq!(table.game.state().turn, TurnState::Finished(Outcome::Winner(Team::Red)));
    assert!(table.game.current_seat().is_none());

    assert_eq!(
        table.submit("bob", 1, 1, "pass").unwrap_err(),
        GameError::Turn(TurnViolation::GameAlreadyFinished)
    );
    assert_eq!(
        table.game.challenge_for(Position::new(1, 1), &Grid).unwrap_err(),
        GameError::Turn(TurnViolation::GameAlreadyFinished)
    );
}

#[test]
fn test_locked_diagonal_is_a_tie() {
    let mut table = Table::two_team();
    table.resolved("alice", 0, 0, "nope");
    table.resolved("bob", 1, 1, "nope");
    assert_eq!(table.game.outcome(), None);
    table.resolved("alice", 2, 2, "nope");

    assert_eq!(table.game.outcome(), Some(Outcome::Tie));
    assert_eq!(
        table.submit("bob", 0, 1, "pass").unwrap_err(),
        GameError::Turn(TurnViolation::GameAlreadyFinished)
    );
}

#[test]
fn test_verifier_fault_counts_as_failure() {
    let mut table = Table::two_team();
    let results = table.resolved("alice", 0, 0, "timeout");
    assert!(matches!(
        &results[0],
        Ok(CaptureOutcome::Failed { locked: true, reason }) if reason.contains("timed out")
    ));
    assert_eq!(table.game.current_seat().map(Player::name), Some("bob"));
}

#[test]
fn test_challenge_reused_across_visits() {
    let mut table = Table::two_team();
    let pos = Position::new(1, 0);
    let first = table.game.challenge_for(pos, &Grid).unwrap();
    table.resolved("alice", 1, 0, "pass");
    assert_eq!(table.game.challenge_for(pos, &Grid).unwrap(), first);
    assert_eq!(table.verifier.calls.borrow()[0].0, first);
}

#[test]
fn test_turn_and_roster_errors() {
    let mut game = GameSession::new(2).unwrap();
    game.register("alice", Team::Red, None).unwrap();
    let verifier = Scripted::default();
    let submit = |game: &mut GameSession, who: &str| {
        game.submit_attempt(who, Position::new(0, 0), Submission::new("pass"), &Grid, &verifier)
    };

    assert!(matches!(
        submit(&mut game, "alice"),
        Err(GameError::Turn(TurnViolation::RosterIncomplete { registered: 1, needed: 2 }))
    ));
    game.register("bob", Team::Blue, None).unwrap();
    assert_eq!(
        submit(&mut game, "bob").unwrap_err(),
        GameError::Turn(TurnViolation::NotYourTurn("bob".to_string()))
    );
    assert_eq!(
        submit(&mut game, "eve").unwrap_err(),
        GameError::Validation(ValidationError::UnknownPlayer("eve".to_string()))
    );
    assert_eq!(
        game.submit_attempt("alice", Position::new(3, 0), Submission::new("pass"), &Grid, &verifier)
            .unwrap_err(),
        GameError::Validation(ValidationError::OutOfBounds(Position::new(3, 0)))
    );
    assert_eq!(verifier.call_count(), 0);
    assert_eq!(game.turns().turn_index(), 0);
}

#[test]
fn test_four_team_pair_resolves_in_submission_order() {
    let mut table = Table::four_team();
    assert_eq!(table.game.board().size(), 5);

    let buffered = table.submit("ann", 0, 0, "pass").unwrap();
    assert_eq!(
        buffered,
        SubmitOutcome::Buffered {
            waiting_for: vec![Seat::new(Team::Blue, Some(Role::P1))]
        }
    );
    assert_eq!(table.game.board().owner_at(Position::new(0, 0)), None);
    assert_eq!(table.verifier.call_count(), 0);
    assert_eq!(
        table.submit("ann", 1, 1, "pass").unwrap_err(),
        GameError::Turn(TurnViolation::AlreadySubmitted(Seat::new(Team::Red, Some(Role::P1))))
    );
    assert_eq!(
        table.submit("cat", 1, 1, "pass").unwrap_err(),
        GameError::Turn(TurnViolation::NotYourTurn("cat".to_string()))
    );

    // Blue's steal sees red's capture from the same phase.
    assert_eq!(
        table.resolved("ben", 0, 0, "pass"),
        vec![
            CAPTURED,
            Ok(CaptureOutcome::Captured {
                stolen_from: Some(Team::Red)
            })
        ]
    );
    let cell = table.game.board().get(Position::new(0, 0)).unwrap();
    assert_eq!(cell.owner(), Some(Team::Blue));
    assert_eq!(cell.first_solver(), Some(Team::Red));

    let state = table.game.state();
    assert_eq!(state.turn_index, 2);
    assert_eq!(state.phase, Some(Role::P2));
    assert!(state.pending.is_empty());
    assert_eq!(
        state.awaiting,
        vec![
            Seat::new(Team::Red, Some(Role::P2)),
            Seat::new(Team::Blue, Some(Role::P2))
        ]
    );
}

#[test]
fn test_four_team_rejection_found_at_resolution_consumes_phase() {
    let mut table = Table::four_team();
    table.submit("ben", 4, 4, "pass").unwrap();
    table.resolved("ann", 3, 3, "pass");

    // Red/p2 locks (1,1); blue/p2 aimed at the same empty cell.
    table.submit("cat", 1, 1, "nope").unwrap();
    let results = table.resolved("dan", 1, 1, "pass");
    assert!(matches!(results[0], Ok(CaptureOutcome::Failed { locked: true, .. })));
    assert_eq!(results[1], Err(CaptureRejection::CellLocked));

    assert!(table.game.board().is_locked(Position::new(1, 1)));
    assert_eq!(table.game.turns().turn_index(), 4);
    assert_eq!(table.game.turns().phase(), Some(Role::P1));
}

#[test]
fn test_four_team_five_in_a_row() {
    let mut table = Table::four_team();
    let red_moves = [("ann", 0), ("cat", 1), ("ann", 2), ("cat", 3)];
    let blue_moves = [("ben", 0), ("dan", 1), ("ben", 2), ("dan", 3)];
    for ((red, col), (blue, blue_col)) in red_moves.into_iter().zip(blue_moves) {
        table.submit(red, 0, col, "pass").unwrap();
        table.resolved(blue, 2, blue_col, "pass");
    }
    assert_eq!(table.game.outcome(), None);

    table.submit("ann", 0, 4, "pass").unwrap();
    table.resolved("ben", 4, 4, "nope");
    assert_eq!(table.game.outcome(), Some(Outcome::Winner(Team::Red)));
    assert_eq!(table.game.turns().turn_index(), 10);
}

#[test]
fn test_snapshot_preserves_buffered_phase() {
    let mut table = Table::four_team();
    table.submit("ann", 2, 2, "pass").unwrap();

    let snapshot = table.game.to_snapshot().unwrap();
    let mut restored = Table {
        game: GameSession::from_snapshot(&snapshot).unwrap(),
        verifier: Scripted::default(),
    };
    assert_eq!(restored.game.state(), table.game.state());
    assert_eq!(restored.game.state().pending, vec![Seat::new(Team::Red, Some(Role::P1))]);

    assert_eq!(
        restored.submit("ann", 0, 0, "pass").unwrap_err(),
        table.submit("ann", 0, 0, "pass").unwrap_err()
    );
    assert_eq!(
        restored.resolved("ben", 2, 2, "nope"),
        table.resolved("ben", 2, 2, "nope")
    );
    assert_eq!(restored.game, table.game);
}

#[test]
fn test_invalid_snapshot_is_an_error() {
    assert!(GameSession::from_snapshot("{\"mode\": 7}").is_err());
}
