//! Verdict requests against hosted LLMs.
//!
//! The client only ever asks one question: does this submission solve this
//! challenge? Requests carry the judging instructions and, when the catalog
//! has one, the reference answer. They run at temperature 0 so the same
//! submission gets the same verdict, and the reply is capped at a handful
//! of tokens. The reply is
//! returned as text for [`crate::parse_reply`].

use async_openai::{
    Client as OpenAIClient,
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
};
use derive_more::{Display, Error};
use derive_new::new;
use serde::{Deserialize, Serialize};
use strictly_codegrid::{Challenge, Submission};
use tracing::{debug, error, info, instrument};

const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

const JUDGE_INSTRUCTIONS: &str = "You are a strict judge for a programming contest. \
You receive a challenge, sometimes with a reference answer, and a contestant's submission. Decide \
whether the submission correctly solves the challenge. Reply with exactly one line: \
either PASS, or FAIL: followed by a one-sentence reason. Do not add anything else.";

/// LLM provider selection.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LlmProvider {
    /// OpenAI (GPT models).
    OpenAI,
    /// Anthropic (Claude models).
    Anthropic,
}

impl LlmProvider {
    /// Environment variable holding the API key.
    pub fn api_key_var(self) -> &'static str {
        match self {
            LlmProvider::OpenAI => "OPENAI_API_KEY",
            LlmProvider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

/// Model and credentials used for judging.
#[derive(Clone, new)]
pub struct LlmConfig {
    provider: LlmProvider,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

/// The user turn of a verdict request.
fn verdict_prompt(challenge: &Challenge, submission: &Submission) -> String {
    let reference = match challenge.answer() {
        Some(answer) => format!("Reference answer: {}\n\n", answer),
        None => String::new(),
    };
    format!(
        "Challenge: {}\n\n{}\n\n{}Submission:\n```\n{}\n```",
        challenge.title(),
        challenge.prompt(),
        reference,
        submission.as_str()
    )
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: [AnthropicMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicBlock>,
}

#[derive(Debug, Deserialize)]
struct AnthropicBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicResponse {
    /// Text of the first text block.
    fn into_text(self) -> Option<String> {
        self.content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
    }
}

enum Backend {
    OpenAI(OpenAIClient<OpenAIConfig>),
    Anthropic { http: reqwest::Client, api_key: String },
}

/// Asks a hosted model for verdicts.
pub struct LlmClient {
    provider: LlmProvider,
    model: String,
    max_tokens: u32,
    backend: Backend,
}

impl LlmClient {
    /// Creates a client for the configured provider.
    #[instrument(skip(config), fields(provider = %config.provider, model = %config.model))]
    pub fn new(config: LlmConfig) -> Self {
        info!("Creating LLM client");
        let backend = match config.provider {
            LlmProvider::OpenAI => Backend::OpenAI(OpenAIClient::with_config(
                OpenAIConfig::new().with_api_key(config.api_key),
            )),
            LlmProvider::Anthropic => Backend::Anthropic {
                http: reqwest::Client::new(),
                api_key: config.api_key,
            },
        };
        Self {
            provider: config.provider,
            model: config.model,
            max_tokens: config.max_tokens,
            backend,
        }
    }

    /// Provider answering the requests.
    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    /// Asks whether `submission` solves `challenge` and returns the raw reply.
    #[instrument(
        skip(self, challenge, submission),
        fields(provider = %self.provider, model = %self.model, challenge = %challenge.title())
    )]
    pub async fn verdict(
        &self,
        challenge: &Challenge,
        submission: &Submission,
    ) -> Result<String, LlmError> {
        let prompt = verdict_prompt(challenge, submission);
        let reply = match &self.backend {
            Backend::OpenAI(client) => self.ask_openai(client, &prompt).await?,
            Backend::Anthropic { http, api_key } => {
                self.ask_anthropic(http, api_key, &prompt).await?
            }
        };
        info!(reply_length = reply.len(), "Verdict received");
        Ok(reply)
    }

    async fn ask_anthropic(
        &self,
        http: &reqwest::Client,
        api_key: &str,
        prompt: &str,
    ) -> Result<String, LlmError> {
        let request = AnthropicRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: 0.0,
            system: JUDGE_INSTRUCTIONS,
            messages: [AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        debug!("Sending verdict request to Anthropic");
        let response = http
            .post(ANTHROPIC_MESSAGES_URL)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::new(format!("Anthropic request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::new(format!("Failed to read Anthropic response: {}", e)))?;
        if !status.is_success() {
            return Err(LlmError::new(format!("Anthropic returned {}: {}", status, body)));
        }

        serde_json::from_str::<AnthropicResponse>(&body)
            .map_err(|e| LlmError::new(format!("Unexpected Anthropic response: {}", e)))?
            .into_text()
            .ok_or_else(|| LlmError::new("Anthropic response has no text block"))
    }

    async fn ask_openai(
        &self,
        client: &OpenAIClient<OpenAIConfig>,
        prompt: &str,
    ) -> Result<String, LlmError> {
        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(JUDGE_INSTRUCTIONS)
                    .build()
                    .map_err(|e| LlmError::new(format!("Invalid system message: {}", e)))?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt)
                    .build()
                    .map_err(|e| LlmError::new(format!("Invalid user message: {}", e)))?,
            ),
        ];
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(0.0)
            .max_completion_tokens(self.max_tokens)
            .build()
            .map_err(|e| LlmError::new(format!("Invalid verdict request: {}", e)))?;

        debug!("Sending verdict request to OpenAI");
        let response = client
            .chat()
            .create(request)
            .await
            .map_err(|e| LlmError::new(format!("OpenAI request failed: {}", e)))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::new("OpenAI response has no content"))
    }
}

/// LLM client error.
#[derive(Debug, Clone, Display, Error)]
#[display("LLM error: {} at {}:{}", message, file, line)]
pub struct LlmError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl LlmError {
    /// Creates a new LLM error.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        let message = message.into();
        error!(error_message = %message, "LLM error created");
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
