//! Keyed store of live game sessions.
//!
//! The outer map lock is held only for lookup, insert and removal, never
//! across an await. Each session sits behind its own async lock, so work on
//! different games runs in parallel while operations on one game are
//! serialized, and a task waiting on a busy game yields its worker thread.

use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_new::new;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use strictly_codegrid::{GameSession, Mode, Outcome};
use tokio::sync::Mutex as SessionLock;
use tracing::{debug, info, instrument, warn};

/// Unique identifier for a game.
pub type GameId = String;

type SharedSession = Arc<SessionLock<GameSession>>;

/// One line of the game listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
pub struct GameSummary {
    id: GameId,
    mode: Mode,
    registered: usize,
    needed: usize,
    outcome: Option<Outcome>,
}

/// Manages all game sessions.
#[derive(Debug, Clone, Default)]
pub struct GameStore {
    games: Arc<Mutex<HashMap<GameId, SharedSession>>>,
}

impl GameStore {
    /// Creates an empty store.
    #[instrument]
    pub fn new() -> Self {
        info!("Creating game store");
        Self::default()
    }

    fn games(&self) -> Result<MutexGuard<'_, HashMap<GameId, SharedSession>>, StoreError> {
        self.games.lock().map_err(|_| {
            warn!("Game store lock poisoned");
            StoreError::new(StoreErrorKind::Poisoned, "Game store lock poisoned")
        })
    }

    /// Adds a session under a new id.
    #[instrument(skip(self, session))]
    pub fn insert(&self, id: &str, session: GameSession) -> Result<(), StoreError> {
        let mut games = self.games()?;
        if games.contains_key(id) {
            warn!(game_id = id, "Game already exists");
            return Err(StoreError::new(
                StoreErrorKind::AlreadyExists,
                format!("Game {} already exists", id),
            ));
        }
        games.insert(id.to_string(), Arc::new(SessionLock::new(session)));
        info!(game_id = id, count = games.len(), "Game created");
        Ok(())
    }

    /// Shared handle to a session.
    #[instrument(skip(self))]
    pub fn session(&self, id: &str) -> Result<SharedSession, StoreError> {
        self.games()?.get(id).cloned().ok_or_else(|| {
            debug!(game_id = id, "Game not found");
            StoreError::new(StoreErrorKind::NotFound, format!("Game {} not found", id))
        })
    }

    /// Runs `f` with exclusive access to one session.
    ///
    /// The store-wide lock is released before the session lock is awaited.
    pub async fn with_game<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut GameSession) -> T,
    ) -> Result<T, StoreError> {
        let session = self.session(id)?;
        let mut guard = session.lock().await;
        Ok(f(&mut guard))
    }

    /// Like [`GameStore::with_game`], for callers on the blocking pool.
    ///
    /// Must not be called from async code; it parks the thread until the
    /// session is free.
    pub fn blocking_with_game<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut GameSession) -> T,
    ) -> Result<T, StoreError> {
        let session = self.session(id)?;
        let mut guard = session.blocking_lock();
        Ok(f(&mut guard))
    }

    /// Removes a session.
    #[instrument(skip(self))]
    pub fn remove(&self, id: &str) -> Result<(), StoreError> {
        let mut games = self.games()?;
        match games.remove(id) {
            Some(_) => {
                info!(game_id = id, count = games.len(), "Game removed");
                Ok(())
            }
            None => Err(StoreError::new(
                StoreErrorKind::NotFound,
                format!("Game {} not found", id),
            )),
        }
    }

    /// Lists all game ids in sorted order.
    #[instrument(skip(self))]
    pub fn ids(&self) -> Result<Vec<GameId>, StoreError> {
        let mut ids: Vec<_> = self.games()?.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    /// Summaries of every game, sorted by id.
    ///
    /// Waits for each game in turn; a game busy with a submission delays
    /// the listing but not other requests.
    #[instrument(skip(self))]
    pub async fn summaries(&self) -> Result<Vec<GameSummary>, StoreError> {
        let ids = self.ids()?;
        let mut summaries = Vec::with_capacity(ids.len());
        for id in ids {
            // Removed between listing and lookup.
            let summary = match self
                .with_game(&id, |game| {
                    GameSummary::new(
                        id.clone(),
                        game.mode(),
                        game.turns().roster().len(),
                        game.mode().num_players(),
                        game.outcome(),
                    )
                })
                .await
            {
                Ok(summary) => summary,
                Err(e) if e.kind == StoreErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            };
            summaries.push(summary);
        }
        info!(count = summaries.len(), "Listed games");
        Ok(summaries)
    }

    /// Number of games.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.games()?.len())
    }

    /// Whether the store holds no games.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.games()?.is_empty())
    }
}

/// What went wrong in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum StoreErrorKind {
    /// No game with this id.
    #[display("not found")]
    NotFound,
    /// A game with this id exists.
    #[display("already exists")]
    AlreadyExists,
    /// A thread panicked while holding the store lock.
    #[display("poisoned")]
    Poisoned,
}

/// Game store error.
#[derive(Debug, Clone, Display, Error)]
#[display("Store error: {} at {}:{}", message, file, line)]
pub struct StoreError {
    /// Error category.
    pub kind: StoreErrorKind,
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl StoreError {
    /// Creates a new store error.
    #[track_caller]
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}
