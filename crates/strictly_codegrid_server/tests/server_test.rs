//! Tests for the MCP tool surface, calling tool methods directly.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::CallToolResult;
use strictly_codegrid::{
    ChallengeCatalog, ChallengeRef, ChallengeVerifier, Outcome, Position, Role, Submission, Team,
    Verdict, VerifierFault,
};
use strictly_codegrid_server::{
    ChallengeRequest, CreateGameRequest, GameRequest, GameServer, GameStore,
    RegisterPlayerRequest, SubmitAttemptRequest,
};

fn text(result: &CallToolResult) -> String {
    result
        .content
        .iter()
        .filter_map(|content| content.as_text())
        .map(|t| t.text.clone())
        .collect::<Vec<_>>()
        .join("\n")
}

async fn create(server: &GameServer, game_id: &str, num_players: usize) {
    server
        .create_game(Parameters(CreateGameRequest {
            game_id: game_id.to_string(),
            num_players,
        }))
        .await
        .unwrap();
}

async fn join(server: &GameServer, game_id: &str, name: &str, team: Team, role: Option<Role>) {
    server
        .register_player(Parameters(RegisterPlayerRequest {
            game_id: game_id.to_string(),
            name: name.to_string(),
            team,
            role,
        }))
        .await
        .unwrap();
}

async fn submit(
    server: &GameServer,
    game_id: &str,
    player: &str,
    row: usize,
    col: usize,
    solution: &str,
) -> Result<CallToolResult, rmcp::ErrorData> {
    server
        .submit_attempt(Parameters(SubmitAttemptRequest {
            game_id: game_id.to_string(),
            player: player.to_string(),
            row,
            col,
            solution: solution.to_string(),
        }))
        .await
}

fn game(game_id: &str) -> Parameters<GameRequest> {
    Parameters(GameRequest {
        game_id: game_id.to_string(),
    })
}

#[tokio::test]
async fn test_two_team_game_through_tools() {
    let server = GameServer::new(ChallengeCatalog::builtin());
    create(&server, "g1", 2).await;
    join(&server, "g1", "alice", Team::Red, None).await;
    join(&server, "g1", "bob", Team::Blue, None).await;

    let challenge = server
        .get_challenge(Parameters(ChallengeRequest {
            game_id: "g1".to_string(),
            row: 0,
            col: 0,
        }))
        .await
        .unwrap();
    assert!(text(&challenge).contains("Addition"));

    // Builtin catalog assigns challenges by cell index: 0 addition,
    // 1 factorial, 2 reverse, 3 fizzbuzz, then repeats.
    submit(&server, "g1", "alice", 0, 0, "30").await.unwrap();
    submit(&server, "g1", "bob", 1, 1, "wrong").await.unwrap();
    submit(&server, "g1", "alice", 0, 1, "720").await.unwrap();
    submit(&server, "g1", "bob", 2, 2, "wrong").await.unwrap();
    let last = submit(&server, "g1", "alice", 0, 2, "dirg").await.unwrap();
    assert!(text(&last).contains("red wins"));

    let outcome = server
        .store()
        .with_game("g1", |g| g.outcome())
        .await
        .unwrap();
    assert_eq!(outcome, Some(Outcome::Winner(Team::Red)));
    let locked = server
        .store()
        .with_game("g1", |g| g.board().is_locked(Position::new(1, 1)))
        .await
        .unwrap();
    assert!(locked);

    let err = submit(&server, "g1", "bob", 2, 0, "anything").await.unwrap_err();
    assert!(err.message.contains("already finished"));

    let listing = server.list_games().await.unwrap();
    assert!(text(&listing).contains("g1: 2/2 players, red won"));
}

#[tokio::test]
async fn test_rejections_are_invalid_params() {
    let server = GameServer::new(ChallengeCatalog::builtin());
    create(&server, "g1", 2).await;

    let duplicate = server
        .create_game(Parameters(CreateGameRequest {
            game_id: "g1".to_string(),
            num_players: 2,
        }))
        .await
        .unwrap_err();
    assert!(duplicate.message.contains("already exists"));

    let bad_count = server
        .create_game(Parameters(CreateGameRequest {
            game_id: "g2".to_string(),
            num_players: 3,
        }))
        .await
        .unwrap_err();
    assert!(bad_count.message.contains("Invalid player count"));

    let unknown = server.get_state(game("nope")).await.unwrap_err();
    assert!(unknown.message.contains("not found"));

    join(&server, "g1", "alice", Team::Red, None).await;
    let early = submit(&server, "g1", "alice", 0, 0, "30").await.unwrap_err();
    assert!(early.message.contains("Waiting for players"));

    let wrong_seat = server
        .register_player(Parameters(RegisterPlayerRequest {
            game_id: "g1".to_string(),
            name: "bob".to_string(),
            team: Team::Blue,
            role: Some(Role::P1),
        }))
        .await
        .unwrap_err();
    assert!(wrong_seat.message.contains("not valid"));
}

#[tokio::test]
async fn test_four_team_buffering_through_tools() {
    let server = GameServer::new(ChallengeCatalog::builtin());
    create(&server, "big", 4).await;
    join(&server, "big", "ann", Team::Red, Some(Role::P1)).await;
    join(&server, "big", "ben", Team::Blue, Some(Role::P1)).await;
    join(&server, "big", "cat", Team::Red, Some(Role::P2)).await;
    join(&server, "big", "dan", Team::Blue, Some(Role::P2)).await;

    let buffered = submit(&server, "big", "ann", 0, 0, "30").await.unwrap();
    assert!(text(&buffered).contains("Move buffered"));
    let owner = server
        .store()
        .with_game("big", |g| g.board().owner_at(Position::new(0, 0)))
        .await
        .unwrap();
    assert_eq!(owner, None);

    submit(&server, "big", "ben", 0, 0, "30").await.unwrap();
    let (owner, turn_index) = server
        .store()
        .with_game("big", |g| {
            (g.board().owner_at(Position::new(0, 0)), g.turns().turn_index())
        })
        .await
        .unwrap();
    assert_eq!(owner, Some(Team::Blue));
    assert_eq!(turn_index, 2);

    let state = server.get_state(game("big")).await.unwrap();
    assert!(text(&state).contains("cat (red/p2) to move"));
}

#[tokio::test]
async fn test_remove_game() {
    let server = GameServer::new(ChallengeCatalog::builtin());
    create(&server, "g1", 2).await;
    server.remove_game(game("g1")).await.unwrap();
    assert!(server.store().is_empty().unwrap());
    assert!(server.remove_game(game("g1")).await.is_err());

    let listing = server.list_games().await.unwrap();
    assert!(text(&listing).contains("No active games"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_games_do_not_interfere() {
    let server = Arc::new(GameServer::new(ChallengeCatalog::builtin()));
    let mut handles = Vec::new();
    for i in 0..8 {
        let server = server.clone();
        handles.push(tokio::spawn(async move {
            let id = format!("game-{}", i);
            create(&server, &id, 2).await;
            join(&server, &id, "red", Team::Red, None).await;
            join(&server, &id, "blue", Team::Blue, None).await;
            submit(&server, &id, "red", 0, 0, "30").await.unwrap();
            submit(&server, &id, "blue", 0, 0, "30").await.unwrap();
            id
        }));
    }

    for handle in handles {
        let id = handle.await.unwrap();
        let owner = server
            .store()
            .with_game(&id, |g| g.board().owner_at(Position::new(0, 0)))
            .await
            .unwrap();
        assert_eq!(owner, Some(Team::Blue));
    }
    assert_eq!(server.store().len().unwrap(), 8);
}

/// Accepts every answer after a long pause, like a slow remote judge.
struct SlowJudge;

impl ChallengeVerifier for SlowJudge {
    fn verify(&self, _: &ChallengeRef, _: &Submission) -> Result<Verdict, VerifierFault> {
        std::thread::sleep(Duration::from_millis(1500));
        Ok(Verdict::Pass)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_slow_judge_does_not_stall_other_games() {
    let server = Arc::new(GameServer::with_store(
        GameStore::new(),
        Arc::new(ChallengeCatalog::builtin()),
        Arc::new(SlowJudge),
    ));
    for id in ["a", "b"] {
        create(&server, id, 2).await;
        join(&server, id, "red", Team::Red, None).await;
        join(&server, id, "blue", Team::Blue, None).await;
    }

    let slow = {
        let server = server.clone();
        tokio::spawn(async move { submit(&server, "a", "red", 0, 0, "30").await })
    };
    tokio::time::sleep(Duration::from_millis(200)).await;

    // Waits on game a's lock for the rest of the judging.
    let same_game = {
        let server = server.clone();
        tokio::spawn(async move { server.get_state(game("a")).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let started = Instant::now();
    let other_game = {
        let server = server.clone();
        tokio::spawn(async move { server.get_state(game("b")).await })
    };
    other_game.await.unwrap().unwrap();
    assert!(
        started.elapsed() < Duration::from_millis(700),
        "game b waited {:?} behind game a",
        started.elapsed()
    );

    slow.await.unwrap().unwrap();
    let state = same_game.await.unwrap().unwrap();
    assert!(text(&state).contains("blue (blue) to move"));
}
