//! Strictly Codegrid server - MCP host for the challenge grid game.
//!
//! # Architecture
//!
//! - **Store**: keyed registry of live game sessions, one lock per game
//! - **Server**: MCP tools (stdio or streamable HTTP) over the store
//! - **Judge**: verifiers for submissions (catalog answers or an LLM)
//! - **Config**: TOML server configuration and environment API keys

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod cli;
mod config;
mod judge;
mod llm_client;
mod server;
mod store;

pub use cli::{Cli, Command, ServerOptions};
pub use config::{ConfigError, ServerConfig, VerifierKind};
pub use judge::{LlmJudge, build_verifier, parse_reply};
pub use llm_client::{LlmClient, LlmConfig, LlmError, LlmProvider};
pub use server::{
    ChallengeRequest, CreateGameRequest, GameRequest, GameServer, RegisterPlayerRequest,
    SharedVerifier, SubmitAttemptRequest,
};
pub use store::{GameId, GameStore, GameSummary, StoreError, StoreErrorKind};
