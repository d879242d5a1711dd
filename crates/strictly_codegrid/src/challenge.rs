//! Challenges attached to cells and the verification seam.
//!
//! The game never inspects submission content itself. A
//! [`ChallengeProvider`] decides which challenge a cell carries, and a
//! [`ChallengeVerifier`] decides whether a submission solves it. Verifier
//! faults are folded into a failed verdict by [`judge`].

use derive_getters::Getters;
use derive_more::Display;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument, warn};

use crate::types::Position;

/// Opaque reference to a challenge, stored on the cell that carries it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Display)]
#[display("{}", _0)]
pub struct ChallengeRef(String);

impl ChallengeRef {
    /// Creates a reference from a challenge id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The referenced challenge id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Player-supplied solution text. Never interpreted by the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Submission(String);

impl Submission {
    /// Wraps solution text.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// The raw solution text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Result of checking a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The submission solves the challenge.
    Pass,
    /// The submission was rejected, with a diagnostic.
    Fail(String),
}

impl Verdict {
    /// Returns true for [`Verdict::Pass`].
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }
}

/// A verifier misbehaved. Treated exactly like a failed verdict.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum VerifierFault {
    /// The verifier could not be reached or errored.
    #[display("Verifier unavailable: {}", _0)]
    Unavailable(String),

    /// The verifier did not answer in time.
    #[display("Verifier timed out")]
    TimedOut,

    /// The verifier answered with something unparseable.
    #[display("Malformed verifier reply: {}", _0)]
    Malformed(String),

    /// The verifier does not know the challenge.
    #[display("Unknown challenge: {}", _0)]
    MissingChallenge(ChallengeRef),
}

impl std::error::Error for VerifierFault {}

/// Decides whether a submission solves a challenge.
///
/// Implementations range from a fixed reference-answer check to calls into
/// external judging services. Sandboxing, if any, is the implementation's
/// responsibility.
pub trait ChallengeVerifier {
    /// Checks a submission against a challenge.
    fn verify(
        &self,
        challenge: &ChallengeRef,
        submission: &Submission,
    ) -> Result<Verdict, VerifierFault>;
}

/// Supplies the challenge attached to a cell the first time it is visited.
pub trait ChallengeProvider {
    /// Challenge for the cell at `position` on a board of edge `board_size`.
    fn challenge_for(&self, position: Position, board_size: usize) -> ChallengeRef;
}

/// Runs a verifier, degrading any fault to [`Verdict::Fail`].
#[instrument(skip(verifier, submission), fields(challenge = %challenge))]
pub fn judge<V>(verifier: &V, challenge: &ChallengeRef, submission: &Submission) -> Verdict
where
    V: ChallengeVerifier + ?Sized,
{
    match verifier.verify(challenge, submission) {
        Ok(verdict) => {
            debug!(pass = verdict.is_pass(), "Verifier answered");
            verdict
        }
        Err(fault) => {
            warn!(error = %fault, "Verifier fault, rejecting submission");
            Verdict::Fail(fault.to_string())
        }
    }
}

/// A programming task with an optional reference answer.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct Challenge {
    /// Stable identifier, used as the [`ChallengeRef`].
    id: String,
    /// Short title.
    title: String,
    /// Task statement shown to the player.
    prompt: String,
    /// Expected answer for the fixed check.
    #[serde(default)]
    answer: Option<String>,
}

impl Challenge {
    /// Creates a challenge.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        prompt: impl Into<String>,
        answer: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            prompt: prompt.into(),
            answer,
        }
    }

    /// Reference to this challenge.
    pub fn reference(&self) -> ChallengeRef {
        ChallengeRef::new(self.id.clone())
    }
}

/// An ordered set of challenges, assigned to cells by index.
///
/// Doubles as a fixed-check verifier: a submission passes when it matches
/// the reference answer after whitespace normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeCatalog {
    challenges: Vec<Challenge>,
}

impl ChallengeCatalog {
    /// Creates a catalog. Fails when empty or when ids repeat.
    #[instrument(skip(challenges), fields(count = challenges.len()))]
    pub fn new(challenges: Vec<Challenge>) -> Result<Self, CatalogError> {
        if challenges.is_empty() {
            return Err(CatalogError::new("Catalog has no challenges"));
        }
        let mut seen = std::collections::HashSet::new();
        for challenge in &challenges {
            if !seen.insert(challenge.id.as_str()) {
                return Err(CatalogError::new(format!(
                    "Duplicate challenge id: {}",
                    challenge.id
                )));
            }
        }
        Ok(Self { challenges })
    }

    /// The catalog shipped with the game.
    pub fn builtin() -> Self {
        Self {
            challenges: vec![
                Challenge::new(
                    "addition",
                    "Addition",
                    "Write a function `addition` that takes two integers and returns their sum. \
                     Example: addition(2, 3) returns 5. Submit the value of addition(10, 20).",
                    Some("30".to_string()),
                ),
                Challenge::new(
                    "factorial",
                    "Factorial",
                    "Write a function `factorial(n)` returning n! for n >= 0. \
                     Submit the value of factorial(6).",
                    Some("720".to_string()),
                ),
                Challenge::new(
                    "reverse",
                    "Reverse a string",
                    "Write a function `reverse(s)` returning the characters of s in reverse order. \
                     Submit the value of reverse(\"grid\").",
                    Some("dirg".to_string()),
                ),
                Challenge::new(
                    "fizzbuzz",
                    "FizzBuzz",
                    "Write a function `fizzbuzz(n)` returning \"Fizz\" for multiples of 3, \"Buzz\" \
                     for multiples of 5, \"FizzBuzz\" for both and n otherwise. \
                     Submit the value of fizzbuzz(45).",
                    Some("FizzBuzz".to_string()),
                ),
            ],
        }
    }

    /// Parses a catalog from TOML (`[[challenges]]` tables).
    #[instrument(skip(content))]
    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        let catalog: Self = toml::from_str(content)
            .map_err(|e| CatalogError::new(format!("Failed to parse catalog: {}", e)))?;
        Self::new(catalog.challenges)
    }

    /// Loads a catalog from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        debug!("Loading challenge catalog");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| CatalogError::new(format!("Failed to read catalog file: {}", e)))?;
        let catalog = Self::from_toml_str(&content)?;
        info!(count = catalog.len(), "Challenge catalog loaded");
        Ok(catalog)
    }

    /// Looks up a challenge by reference.
    pub fn get(&self, reference: &ChallengeRef) -> Option<&Challenge> {
        self.challenges.iter().find(|c| c.id == reference.as_str())
    }

    /// All challenges, in assignment order.
    pub fn challenges(&self) -> &[Challenge] {
        &self.challenges
    }

    /// Number of challenges.
    pub fn len(&self) -> usize {
        self.challenges.len()
    }

    /// Always false for a constructed catalog.
    pub fn is_empty(&self) -> bool {
        self.challenges.is_empty()
    }
}

impl Default for ChallengeCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ChallengeProvider for ChallengeCatalog {
    fn challenge_for(&self, position: Position, board_size: usize) -> ChallengeRef {
        let cell_index = position.row * board_size + position.col;
        cell_index
            .checked_rem(self.challenges.len())
            .and_then(|index| self.challenges.get(index))
            .map(Challenge::reference)
            .unwrap_or_else(|| ChallengeRef::new(format!("cell-{}", cell_index)))
    }
}

impl ChallengeVerifier for ChallengeCatalog {
    fn verify(
        &self,
        challenge: &ChallengeRef,
        submission: &Submission,
    ) -> Result<Verdict, VerifierFault> {
        let expected = self
            .get(challenge)
            .and_then(|c| c.answer.as_deref())
            .ok_or_else(|| VerifierFault::MissingChallenge(challenge.clone()))?;

        if normalize(submission.as_str()) == normalize(expected) {
            Ok(Verdict::Pass)
        } else {
            Ok(Verdict::Fail("Submission does not match the expected answer".to_string()))
        }
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Catalog loading error.
#[derive(Debug, Clone, Display, derive_more::Error)]
#[display("Catalog error: {} at {}:{}", message, file, line)]
pub struct CatalogError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl CatalogError {
    /// Creates a new catalog error.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}
