//! Core domain types: teams, seats, players, positions and game modes.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// A team competing for territory.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
    strum::EnumIter,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Team {
    /// Red team (moves first).
    Red,
    /// Blue team.
    Blue,
}

impl Team {
    /// Single-letter board symbol.
    pub fn symbol(self) -> char {
        match self {
            Team::Red => 'R',
            Team::Blue => 'B',
        }
    }
}

/// Role of a teammate in 4-team mode.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
    strum::EnumIter,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    /// First teammate.
    P1,
    /// Second teammate.
    P2,
}

/// A playing slot: a team, plus a role in 4-team mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Seat {
    /// Team occupying the seat.
    pub team: Team,
    /// Role within the team (`None` in 2-team mode).
    pub role: Option<Role>,
}

impl Seat {
    /// Creates a seat.
    pub fn new(team: Team, role: Option<Role>) -> Self {
        Self { team, role }
    }
}

impl std::fmt::Display for Seat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.role {
            Some(role) => write!(f, "{}/{}", self.team, role),
            None => write!(f, "{}", self.team),
        }
    }
}

/// A registered player. Immutable after registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Player {
    name: String,
    seat: Seat,
}

impl Player {
    /// Creates a player.
    pub fn new(name: impl Into<String>, seat: Seat) -> Self {
        Self {
            name: name.into(),
            seat,
        }
    }

    /// Player name, unique within a game.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Seat occupied by the player.
    pub fn seat(&self) -> Seat {
        self.seat
    }

    /// Team of the player.
    pub fn team(&self) -> Team {
        self.seat.team
    }
}

/// A cell coordinate, zero-based.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub struct Position {
    /// Row index (0 at the top).
    pub row: usize,
    /// Column index (0 on the left).
    pub col: usize,
}

impl Position {
    /// Creates a position.
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Fixed phase sequence of 4-team mode.
const FOUR_TEAM_ORDER: [Seat; 4] = [
    Seat {
        team: Team::Red,
        role: Some(Role::P1),
    },
    Seat {
        team: Team::Blue,
        role: Some(Role::P1),
    },
    Seat {
        team: Team::Red,
        role: Some(Role::P2),
    },
    Seat {
        team: Team::Blue,
        role: Some(Role::P2),
    },
];

/// Competitive mode of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Two players, one per team, moving one after the other.
    TwoTeam,
    /// Four players; the two seats sharing a role submit as a pair.
    FourTeam,
}

impl Mode {
    /// Mode for a player count, if supported.
    #[instrument]
    pub fn from_player_count(num_players: usize) -> Option<Self> {
        match num_players {
            2 => Some(Mode::TwoTeam),
            4 => Some(Mode::FourTeam),
            _ => None,
        }
    }

    /// Number of players needed to start.
    pub fn num_players(self) -> usize {
        match self {
            Mode::TwoTeam => 2,
            Mode::FourTeam => 4,
        }
    }

    /// Board edge length.
    pub fn board_size(self) -> usize {
        match self {
            Mode::TwoTeam => 3,
            Mode::FourTeam => 5,
        }
    }

    /// Run length needed to win.
    pub fn win_length(self) -> usize {
        match self {
            Mode::TwoTeam => 3,
            Mode::FourTeam => 5,
        }
    }

    /// Whether seats in this mode carry a role.
    pub fn uses_roles(self) -> bool {
        matches!(self, Mode::FourTeam)
    }

    /// The phase sequence of 4-team mode.
    pub fn phase_order() -> &'static [Seat; 4] {
        &FOUR_TEAM_ORDER
    }
}

/// Final result of a game. Written once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// A team completed a run.
    Winner(Team),
    /// No window can produce a run any more.
    Tie,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Winner(team) => write!(f, "Team {} wins", team),
            Outcome::Tie => write!(f, "Tie"),
        }
    }
}
