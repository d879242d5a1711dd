//! LLM-backed challenge verifier.
//!
//! The game core calls verifiers synchronously. [`LlmJudge`] bridges to the
//! async LLM client through a captured runtime handle, so it must be called
//! from a blocking context (for example inside `spawn_blocking`), never
//! from an async task. The judge owns the deadline and the reading of the
//! reply; the client owns the request.

use std::sync::Arc;
use std::time::Duration;

use strictly_codegrid::{
    ChallengeCatalog, ChallengeRef, ChallengeVerifier, Submission, Verdict, VerifierFault,
};
use tokio::runtime::Handle;
use tracing::{debug, info, instrument, warn};

use crate::config::{ConfigError, ServerConfig, VerifierKind};
use crate::llm_client::LlmClient;
use crate::server::SharedVerifier;

/// Longest reply excerpt kept in a malformed-reply fault.
const EXCERPT_LEN: usize = 80;

/// Asks an LLM whether a submission solves its challenge.
pub struct LlmJudge {
    client: LlmClient,
    catalog: Arc<ChallengeCatalog>,
    runtime: Handle,
    timeout: Duration,
}

impl LlmJudge {
    /// Creates a judge bound to the given runtime.
    #[instrument(
        skip_all,
        fields(provider = %client.provider(), timeout_secs = timeout.as_secs())
    )]
    pub fn new(
        client: LlmClient,
        catalog: Arc<ChallengeCatalog>,
        runtime: Handle,
        timeout: Duration,
    ) -> Self {
        info!("Creating LLM judge");
        Self {
            client,
            catalog,
            runtime,
            timeout,
        }
    }
}

impl ChallengeVerifier for LlmJudge {
    #[instrument(skip(self, submission), fields(challenge = %challenge))]
    fn verify(
        &self,
        challenge: &ChallengeRef,
        submission: &Submission,
    ) -> Result<Verdict, VerifierFault> {
        let task = self
            .catalog
            .get(challenge)
            .ok_or_else(|| VerifierFault::MissingChallenge(challenge.clone()))?;

        let reply = self
            .runtime
            .block_on(async {
                tokio::time::timeout(self.timeout, self.client.verdict(task, submission)).await
            })
            .map_err(|_| {
                warn!(timeout_secs = self.timeout.as_secs(), "Judge timed out");
                VerifierFault::TimedOut
            })?
            .map_err(|e| VerifierFault::Unavailable(e.message))?;

        debug!(reply_length = reply.len(), "Judge replied");
        parse_reply(&reply)
    }
}

/// Builds the verifier selected by the configuration.
///
/// The LLM judge needs an API key in the environment; the catalog verifier
/// needs nothing beyond the catalog itself.
#[instrument(skip_all, fields(verifier = %config.verifier()))]
pub fn build_verifier(
    config: &ServerConfig,
    catalog: Arc<ChallengeCatalog>,
    runtime: Handle,
) -> Result<SharedVerifier, ConfigError> {
    match config.verifier() {
        VerifierKind::Catalog => Ok(catalog),
        VerifierKind::Llm => {
            let client = LlmClient::new(config.create_llm_config()?);
            Ok(Arc::new(LlmJudge::new(client, catalog, runtime, config.judge_timeout())))
        }
    }
}

/// Parses a judge reply of the form `PASS` or `FAIL: reason`.
///
/// Only the first non-empty line counts. Matching is case-insensitive and
/// tolerates surrounding punctuation such as `**PASS**`.
pub fn parse_reply(reply: &str) -> Result<Verdict, VerifierFault> {
    let line = reply
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or_else(|| VerifierFault::Malformed("empty reply".to_string()))?;
    let line = line.trim_matches(|c: char| c == '*' || c == '`' || c == '"');
    let upper = line.to_ascii_uppercase();

    if upper == "PASS" || upper == "PASS." {
        return Ok(Verdict::Pass);
    }
    if let Some(rest) = upper
        .strip_prefix("FAIL")
        .filter(|rest| rest.is_empty() || rest.starts_with([':', '-', ' ', '.']))
    {
        // Keep the original casing of the reason.
        let reason = line[line.len() - rest.len()..]
            .trim_start_matches([':', '-', ' ', '.'])
            .trim();
        let reason = if reason.is_empty() {
            "Rejected by judge".to_string()
        } else {
            reason.to_string()
        };
        return Ok(Verdict::Fail(reason));
    }

    Err(VerifierFault::Malformed(line.chars().take(EXCERPT_LEN).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass() {
        assert_eq!(parse_reply("PASS"), Ok(Verdict::Pass));
        assert_eq!(parse_reply("\n  pass\n"), Ok(Verdict::Pass));
        assert_eq!(parse_reply("**PASS**"), Ok(Verdict::Pass));
    }

    #[test]
    fn test_fail_keeps_reason() {
        assert_eq!(
            parse_reply("FAIL: Off by one in the loop bound"),
            Ok(Verdict::Fail("Off by one in the loop bound".to_string()))
        );
        assert_eq!(
            parse_reply("fail - Returns None"),
            Ok(Verdict::Fail("Returns None".to_string()))
        );
    }

    #[test]
    fn test_fail_without_reason() {
        assert_eq!(parse_reply("FAIL"), Ok(Verdict::Fail("Rejected by judge".to_string())));
    }

    #[test]
    fn test_only_first_line_counts() {
        assert_eq!(parse_reply("PASS\nFAIL: second thoughts"), Ok(Verdict::Pass));
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(parse_reply(""), Err(VerifierFault::Malformed(_))));
        assert!(matches!(
            parse_reply("The submission looks fine to me"),
            Err(VerifierFault::Malformed(_))
        ));
        assert!(matches!(parse_reply("PASSABLE"), Err(VerifierFault::Malformed(_))));
        assert!(matches!(parse_reply("FAILURE"), Err(VerifierFault::Malformed(_))));
    }

    #[test]
    fn test_unknown_challenge_is_fault_without_calling_llm() {
        use crate::llm_client::{LlmConfig, LlmProvider};

        let runtime = tokio::runtime::Runtime::new().unwrap();
        let client = LlmClient::new(LlmConfig::new(
            LlmProvider::OpenAI,
            "test-key".to_string(),
            "gpt-4o-mini".to_string(),
            50,
        ));
        let judge = LlmJudge::new(
            client,
            Arc::new(ChallengeCatalog::builtin()),
            runtime.handle().clone(),
            Duration::from_secs(1),
        );
        let missing = ChallengeRef::new("no-such-task");
        assert_eq!(
            judge.verify(&missing, &Submission::new("print(1)")),
            Err(VerifierFault::MissingChallenge(missing.clone()))
        );
    }
}
