//! HTTP generators for OpenAI-compatible chat completions and Anthropic
//! messages.

use crate::Generator;
use crate::error::GenerateError;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const USER_AGENT: &str = concat!("migrafix/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    OpenAi,
    Anthropic,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
        }
    }

    pub fn api_key_env(self) -> &'static str {
        match self {
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            Provider::OpenAi => "https://api.openai.com/v1",
            Provider::Anthropic => "https://api.anthropic.com/v1",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Provider::OpenAi => "gpt-4o",
            Provider::Anthropic => "claude-sonnet-4-5",
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "anthropic" => Ok(Provider::Anthropic),
            other => Err(format!("unknown provider `{other}` (expected openai or anthropic)")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub provider: Provider,
    pub model: String,
    pub base_url: String,
    pub api_key: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl HttpConfig {
    pub fn new(provider: Provider, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            model: provider.default_model().to_string(),
            base_url: provider.default_base_url().to_string(),
            api_key: api_key.into(),
            max_tokens: 8192,
            temperature: 0.1,
        }
    }
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

pub struct HttpGenerator {
    client: reqwest::Client,
    config: HttpConfig,
}

impl std::fmt::Debug for HttpGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGenerator")
            .field("provider", &self.config.provider)
            .field("model", &self.config.model)
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpGenerator {
    pub fn new(config: HttpConfig) -> Result<Self, GenerateError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| GenerateError::Permanent(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        match self.config.provider {
            Provider::OpenAi => format!("{base}/chat/completions"),
            Provider::Anthropic => format!("{base}/messages"),
        }
    }

    fn request(&self, prompt: &str, timeout: Duration) -> reqwest::RequestBuilder {
        let c = &self.config;
        let messages = vec![Message {
            role: "user",
            content: prompt,
        }];
        let builder = self.client.post(self.endpoint()).timeout(timeout);
        match c.provider {
            Provider::OpenAi => builder
                .header("Authorization", format!("Bearer {}", c.api_key))
                .json(&ChatRequest {
                    model: &c.model,
                    messages,
                    max_tokens: c.max_tokens,
                    temperature: c.temperature,
                }),
            Provider::Anthropic => builder
                .header("x-api-key", &c.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&MessagesRequest {
                    model: &c.model,
                    max_tokens: c.max_tokens,
                    temperature: c.temperature,
                    messages,
                }),
        }
    }
}

fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Map a non-success status to the error taxonomy.
pub fn status_error(status: StatusCode, retry_after: Option<Duration>, body: &str) -> GenerateError {
    let snippet: String = body.chars().take(300).collect();
    match status.as_u16() {
        429 => GenerateError::RateLimited { retry_after },
        408 => GenerateError::Transport(format!("HTTP {status}: {snippet}")),
        500..=599 => GenerateError::Transport(format!("HTTP {status}: {snippet}")),
        _ => GenerateError::Permanent(format!("HTTP {status}: {snippet}")),
    }
}

fn response_text(provider: Provider, body: &str) -> Result<String, GenerateError> {
    let text = match provider {
        Provider::OpenAi => serde_json::from_str::<ChatResponse>(body)
            .map_err(|e| GenerateError::Permanent(format!("failed to parse response: {e}")))?
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content),
        Provider::Anthropic => {
            let parsed: MessagesResponse = serde_json::from_str(body)
                .map_err(|e| GenerateError::Permanent(format!("failed to parse response: {e}")))?;
            let joined: String = parsed.content.into_iter().filter_map(|b| b.text).collect();
            (!joined.is_empty()).then_some(joined)
        }
    };
    // An empty answer is still an answer; the extractor falls back on it.
    Ok(text.unwrap_or_default())
}

#[async_trait]
impl Generator for HttpGenerator {
    async fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, GenerateError> {
        debug!(
            provider = self.config.provider.as_str(),
            model = %self.config.model,
            prompt_len = prompt.len(),
            timeout_secs = timeout.as_secs_f64(),
            "generation request"
        );
        let start = Instant::now();

        let resp = self.request(prompt, timeout).send().await.map_err(|e| {
            if e.is_timeout() {
                GenerateError::Timeout(timeout)
            } else {
                GenerateError::Transport(format!("request failed: {e}"))
            }
        })?;

        let status = resp.status();
        let wait = retry_after(resp.headers());
        let body = resp.text().await.map_err(|e| {
            if e.is_timeout() {
                GenerateError::Timeout(timeout)
            } else {
                GenerateError::Transport(format!("failed to read response: {e}"))
            }
        })?;

        debug!(
            status = status.as_u16(),
            elapsed_secs = start.elapsed().as_secs_f64(),
            bytes = body.len(),
            "generation response"
        );

        if !status.is_success() {
            return Err(status_error(status, wait, &body));
        }
        response_text(self.config.provider, &body)
    }
}
