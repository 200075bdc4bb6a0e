use std::time::Duration;

use async_trait::async_trait;
use qtube_protocol::ParsedAnswer;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::warn;

use crate::citations::parse_answer;
use crate::error::ApiError;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Anything that can turn a grounding prompt into a parsed answer.
#[async_trait]
pub trait AnswerEngine: Send + Sync {
    async fn ask(&self, prompt: &str) -> Result<ParsedAnswer, ApiError>;
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub request_timeout: Option<Duration>,
}

impl GeminiSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: api_key.into(),
            request_timeout: None,
        }
    }
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn into_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
    }
}

/// Single-shot client for `models/{model}:generateContent`. Retrying is left
/// to callers.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(settings: GeminiSettings) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = settings.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self::with_http_client(http, settings))
    }

    pub fn with_http_client(http: reqwest::Client, settings: GeminiSettings) -> Self {
        let base_url = settings.base_url.trim_end_matches('/');
        Self {
            http,
            endpoint: format!("{base_url}/models/{}:generateContent", settings.model),
            api_key: settings.api_key,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sends `prompt` and returns the raw text of the first candidate.
    pub async fn generate(&self, prompt: &str) -> Result<String, ApiError> {
        let request = GenerateContentRequest {
            contents: [Content {
                role: "user",
                parts: [RequestPart { text: prompt }],
            }],
        };

        debug!(endpoint = %self.endpoint, prompt_chars = prompt.len(), "sending generateContent request");
        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            warn!(%status, "generateContent returned an error status");
            return Err(ApiError::UnexpectedStatus { status, body });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|err| ApiError::MalformedResponse(format!("invalid JSON envelope: {err}")))?;
        parsed.into_text().ok_or_else(|| {
            ApiError::MalformedResponse("response has no candidate text".to_string())
        })
    }
}

#[async_trait]
impl AnswerEngine for GeminiClient {
    async fn ask(&self, prompt: &str) -> Result<ParsedAnswer, ApiError> {
        let raw = self.generate(prompt).await?;
        let parsed = parse_answer(&raw);
        debug!(citations = parsed.timestamps.len(), "parsed model answer");
        Ok(parsed)
    }
}
