//! MCP server exposing game sessions as tools.

use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, ServerCapabilities, ServerInfo};
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strictly_codegrid::{
    ChallengeCatalog, ChallengeVerifier, GameError, GameSession, GameView, Outcome, Position, Role,
    Submission, SubmitOutcome, Team, TurnState,
};
use tracing::{debug, info, instrument, warn};

use crate::store::{GameStore, StoreError, StoreErrorKind};

/// Verifier shared across requests and blocking tasks.
pub type SharedVerifier = Arc<dyn ChallengeVerifier + Send + Sync>;

/// Request for creating a game.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CreateGameRequest {
    /// Game ID chosen by the caller.
    pub game_id: String,
    /// Number of players: 2 (red vs blue) or 4 (two players per team).
    pub num_players: usize,
}

/// Request for registering a player.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RegisterPlayerRequest {
    /// Game ID to join.
    pub game_id: String,
    /// Player name, unique within the game.
    pub name: String,
    /// Team to join.
    pub team: Team,
    /// Seat within the team (4-player games only).
    #[serde(default)]
    pub role: Option<Role>,
}

/// Request naming a game.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GameRequest {
    /// Game ID.
    pub game_id: String,
}

/// Request for the challenge of a cell.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ChallengeRequest {
    /// Game ID.
    pub game_id: String,
    /// Zero-based row.
    pub row: usize,
    /// Zero-based column.
    pub col: usize,
}

/// Request for submitting a solution.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SubmitAttemptRequest {
    /// Game ID.
    pub game_id: String,
    /// Name of the submitting player.
    pub player: String,
    /// Zero-based row.
    pub row: usize,
    /// Zero-based column.
    pub col: usize,
    /// Solution text for the cell's challenge.
    pub solution: String,
}

/// Main server handler.
pub struct GameServer {
    store: GameStore,
    catalog: Arc<ChallengeCatalog>,
    verifier: SharedVerifier,
    tool_router: ToolRouter<Self>,
}

fn game_error(err: GameError) -> McpError {
    debug!(error = %err, "Game rejected request");
    McpError::invalid_params(err.to_string(), None)
}

fn store_error(err: StoreError) -> McpError {
    match err.kind {
        StoreErrorKind::Poisoned => McpError::internal_error(err.message, None),
        StoreErrorKind::NotFound | StoreErrorKind::AlreadyExists => {
            McpError::invalid_params(err.message, None)
        }
    }
}

fn describe_turn(view: &GameView) -> String {
    match &view.turn {
        TurnState::AwaitingRoster { registered, needed } => {
            format!("Waiting for players ({}/{})", registered, needed)
        }
        TurnState::AwaitingMove(_) => match &view.current_seat {
            Some(player) => format!("{} ({}) to move", player.name(), player.seat()),
            None => "Waiting for a move".to_string(),
        },
        TurnState::Finished(Outcome::Winner(team)) => format!("Game over: {} wins!", team),
        TurnState::Finished(Outcome::Tie) => "Game over: it's a tie".to_string(),
    }
}

#[tool_router]
impl GameServer {
    /// Creates a game server sharing an existing store.
    #[instrument(skip_all)]
    pub fn with_store(
        store: GameStore,
        catalog: Arc<ChallengeCatalog>,
        verifier: SharedVerifier,
    ) -> Self {
        info!(challenges = catalog.len(), "Creating game server");
        Self {
            store,
            catalog,
            verifier,
            tool_router: Self::tool_router(),
        }
    }

    /// Creates a server with an empty store, judging with the catalog's
    /// reference answers.
    pub fn new(catalog: ChallengeCatalog) -> Self {
        let catalog = Arc::new(catalog);
        let verifier: SharedVerifier = catalog.clone();
        Self::with_store(GameStore::new(), catalog, verifier)
    }

    /// The game store.
    pub fn store(&self) -> &GameStore {
        &self.store
    }

    /// Shared challenge catalog.
    pub fn catalog(&self) -> Arc<ChallengeCatalog> {
        self.catalog.clone()
    }

    /// Shared verifier.
    pub fn verifier(&self) -> SharedVerifier {
        self.verifier.clone()
    }

    /// Creates a new game.
    #[instrument(skip(self, req), fields(game_id = %req.game_id, num_players = req.num_players))]
    #[tool(description = "Create a new game. 2 players play on a 3x3 board (3 in a row wins); 4 players play on a 5x5 board (5 in a row wins).")]
    pub async fn create_game(
        &self,
        Parameters(req): Parameters<CreateGameRequest>,
    ) -> Result<CallToolResult, McpError> {
        let game = GameSession::new(req.num_players).map_err(game_error)?;
        let size = game.board().size();
        self.store.insert(&req.game_id, game).map_err(store_error)?;

        let message = format!(
            "Created game {} for {} players on a {}x{} board.",
            req.game_id, req.num_players, size, size
        );
        Ok(CallToolResult::success(vec![Content::text(message)]))
    }

    /// Registers a player in a game.
    #[instrument(skip(self, req), fields(game_id = %req.game_id, name = %req.name))]
    #[tool(description = "Join a game as a player. Pick a team (red or blue); in 4-player games also pick a role (p1 or p2).")]
    pub async fn register_player(
        &self,
        Parameters(req): Parameters<RegisterPlayerRequest>,
    ) -> Result<CallToolResult, McpError> {
        let (player, view) = self
            .store
            .with_game(&req.game_id, |game| {
                game.register(&req.name, req.team, req.role)
                    .map(|player| (player, game.state()))
            })
            .await
            .map_err(store_error)?
            .map_err(game_error)?;

        info!(seat = %player.seat(), "Player registered");
        let message = format!(
            "Registered {} as {} in game {}.\n{}",
            player.name(),
            player.seat(),
            req.game_id,
            describe_turn(&view)
        );
        Ok(CallToolResult::success(vec![Content::text(message)]))
    }

    /// Reports whose turn it is.
    #[instrument(skip(self, req), fields(game_id = %req.game_id))]
    #[tool(description = "Show which player is expected to move next")]
    pub async fn current_seat(
        &self,
        Parameters(req): Parameters<GameRequest>,
    ) -> Result<CallToolResult, McpError> {
        let view = self
            .store
            .with_game(&req.game_id, |game| game.state())
            .await
            .map_err(store_error)?;
        Ok(CallToolResult::success(vec![Content::text(describe_turn(&view))]))
    }

    /// Shows the challenge attached to a cell.
    #[instrument(skip(self, req), fields(game_id = %req.game_id, row = req.row, col = req.col))]
    #[tool(description = "Get the programming challenge for a cell. Locked cells have no challenge.")]
    pub async fn get_challenge(
        &self,
        Parameters(req): Parameters<ChallengeRequest>,
    ) -> Result<CallToolResult, McpError> {
        let position = Position::new(req.row, req.col);
        let catalog = self.catalog.clone();
        let challenge = self
            .store
            .with_game(&req.game_id, |game| {
                game.challenge_for(position, catalog.as_ref())
            })
            .await
            .map_err(store_error)?
            .map_err(game_error)?;

        let message = match self.catalog.get(&challenge) {
            Some(task) => format!(
                "Challenge at {}: {}\n\n{}",
                position,
                task.title(),
                task.prompt()
            ),
            None => {
                warn!(%challenge, "Challenge missing from catalog");
                format!("Challenge at {}: {}", position, challenge)
            }
        };
        Ok(CallToolResult::success(vec![Content::text(message)]))
    }

    /// Submits a solution for a cell.
    #[instrument(
        skip(self, req),
        fields(game_id = %req.game_id, player = %req.player, row = req.row, col = req.col)
    )]
    #[tool(description = "Submit a solution to capture a cell. A wrong answer on an empty cell locks it for everyone; a wrong answer on an owned cell bars your team from it.")]
    pub async fn submit_attempt(
        &self,
        Parameters(req): Parameters<SubmitAttemptRequest>,
    ) -> Result<CallToolResult, McpError> {
        let position = Position::new(req.row, req.col);
        let store = self.store.clone();
        let catalog = self.catalog.clone();
        let verifier = self.verifier.clone();
        let game_id = req.game_id.clone();

        // Verifiers block, so the attempt runs on the blocking pool. The
        // session lock is held for the whole attempt.
        let (outcome, view) = tokio::task::spawn_blocking(move || {
            store.blocking_with_game(&game_id, |game| {
                game.submit_attempt(
                    &req.player,
                    position,
                    Submission::new(req.solution),
                    catalog.as_ref(),
                    verifier.as_ref(),
                )
                .map(|outcome| (outcome, game.state()))
            })
        })
        .await
        .map_err(|e| McpError::internal_error(format!("Submission task failed: {}", e), None))?
        .map_err(store_error)?
        .map_err(game_error)?;

        let mut message = match &outcome {
            SubmitOutcome::Buffered { waiting_for } => {
                let seats: Vec<_> = waiting_for.iter().map(ToString::to_string).collect();
                format!("Move buffered. Waiting for {}.", seats.join(", "))
            }
            SubmitOutcome::Resolved(reports) => reports
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n"),
        };
        message.push_str(&format!("\n\n{}\n\n{}", describe_turn(&view), view.board.display()));

        info!(turn_index = view.turn_index, outcome = ?view.outcome, "Submission handled");
        Ok(CallToolResult::success(vec![Content::text(message)]))
    }

    /// Gets the full game state.
    #[instrument(skip(self, req), fields(game_id = %req.game_id))]
    #[tool(description = "Get the board, players, turn and outcome of a game")]
    pub async fn get_state(
        &self,
        Parameters(req): Parameters<GameRequest>,
    ) -> Result<CallToolResult, McpError> {
        let view = self
            .store
            .with_game(&req.game_id, |game| game.state())
            .await
            .map_err(store_error)?;

        let players: Vec<_> = view
            .roster
            .iter()
            .map(|p| format!("  - {} ({})", p.name(), p.seat()))
            .collect();
        let summary = format!(
            "Game: {}\nMode: {:?}\nTurn: {}\nStatus: {}\nPlayers:\n{}\n\n{}",
            req.game_id,
            view.mode,
            view.turn_index,
            describe_turn(&view),
            players.join("\n"),
            view.board.display()
        );
        let json = serde_json::to_string_pretty(&view)
            .map_err(|e| {
                McpError::internal_error(format!("Failed to serialize state: {}", e), None)
            })?;

        Ok(CallToolResult::success(vec![Content::text(summary), Content::text(json)]))
    }

    /// Lists all games.
    #[instrument(skip(self))]
    #[tool(description = "List all games and how many players each still needs")]
    pub async fn list_games(&self) -> Result<CallToolResult, McpError> {
        let summaries = self.store.summaries().await.map_err(store_error)?;
        if summaries.is_empty() {
            return Ok(CallToolResult::success(vec![Content::text("No active games")]));
        }

        let mut result = String::from("Games:\n\n");
        for game in &summaries {
            let status = match game.outcome() {
                Some(Outcome::Winner(team)) => format!("{} won", team),
                Some(Outcome::Tie) => "tie".to_string(),
                None if game.registered() < game.needed() => {
                    format!("waiting for {} more player(s)", game.needed() - game.registered())
                }
                None => "in progress".to_string(),
            };
            result.push_str(&format!(
                "{}: {}/{} players, {}\n",
                game.id(),
                game.registered(),
                game.needed(),
                status
            ));
        }
        Ok(CallToolResult::success(vec![Content::text(result)]))
    }

    /// Removes a game.
    #[instrument(skip(self, req), fields(game_id = %req.game_id))]
    #[tool(description = "Delete a game and its state")]
    pub async fn remove_game(
        &self,
        Parameters(req): Parameters<GameRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.store.remove(&req.game_id).map_err(store_error)?;
        Ok(CallToolResult::success(vec![Content::text(format!(
            "Removed game {}",
            req.game_id
        ))]))
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for GameServer {
    fn get_info(&self) -> ServerInfo {
        let mut info = ServerInfo::default();
        info.instructions = Some(
            "Strictly Codegrid: capture grid cells by solving programming challenges. \
             Create a game, register players, fetch a cell's challenge and submit solutions."
                .into(),
        );
        info.capabilities = ServerCapabilities::builder().enable_tools().build();
        info
    }
}
