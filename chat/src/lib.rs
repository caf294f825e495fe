//! Minimal chat-completions API client.
//!
//! This crate provides a focused client for OpenAI-style chat completion
//! endpoints with:
//! - Single-shot (non-streaming) completions with a fixed request timeout
//! - The [`Generate`] trait that content generators are written against
//! - Best-effort structured extraction from free model text

mod extract;

pub use extract::{extract_structured, Extracted};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_SYSTEM_PROMPT: &str = "You are a professional game story writing assistant.";

/// Every request is abandoned after this long. There is no retry.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors that can occur when using the chat client.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("API key not configured")]
    MissingCredential,

    #[error("Network error: {0}")]
    Transport(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("API error (status {status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Whether the request never got a usable answer from the endpoint.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Timeout(_))
    }
}

/// Anything that can turn a filled prompt into completion text.
///
/// The HTTP [`Client`] is the production implementation; tests script
/// their own.
#[async_trait]
pub trait Generate: Send + Sync {
    /// Complete a single prompt at the given sampling temperature.
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, Error>;
}

/// Endpoint settings shared by every request a client sends.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL, without the trailing `/chat/completions`.
    pub base_url: String,
    /// Model name sent with every request.
    pub model: String,
    /// System message placed ahead of every prompt.
    pub system_prompt: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl ClientConfig {
    /// Defaults, overridden by `STORY_API_BASE` and `STORY_MODEL` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(base_url) = std::env::var("STORY_API_BASE") {
            if !base_url.trim().is_empty() {
                config.base_url = base_url;
            }
        }
        if let Ok(model) = std::env::var("STORY_MODEL") {
            if !model.trim().is_empty() {
                config.model = model;
            }
        }
        config
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// Chat-completions client.
///
/// The credential is optional at construction so a client can exist before
/// the user supplies one; any request made without it fails with
/// [`Error::MissingCredential`] before touching the network.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    api_key: Option<String>,
    config: ClientConfig,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("has_credential", &self.has_credential())
            .finish()
    }
}

impl Client {
    /// Create a client without a credential.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            api_key: None,
            config,
        })
    }

    /// Create a client from `OPENAI_API_KEY` and [`ClientConfig::from_env`].
    pub fn from_env() -> Result<Self, Error> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| Error::MissingCredential)?;
        Ok(Self::new(ClientConfig::from_env())?.with_api_key(api_key))
    }

    /// Attach the credential. Blank keys count as missing.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        self.api_key = (!api_key.trim().is_empty()).then_some(api_key);
        self
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send a completion request and return the first choice.
    #[instrument(skip(self, request), fields(model = %self.config.model))]
    pub async fn send(&self, request: Request) -> Result<Response, Error> {
        let headers = self.build_headers()?;
        let api_request = self.build_api_request(request);

        debug!(messages = api_request.messages.len(), "Sending completion request");

        let response = self
            .http
            .post(self.config.endpoint())
            .headers(headers)
            .json(&api_request)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!(status, "Completion endpoint rejected the request");
            return Err(Error::Upstream { status, body });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        parse_response(api_response)
    }

    fn build_headers(&self) -> Result<HeaderMap, Error> {
        let api_key = self.api_key.as_deref().ok_or(Error::MissingCredential)?;
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| Error::Config(format!("Invalid API key: {e}")))?,
        );
        Ok(headers)
    }

    fn build_api_request(&self, request: Request) -> ApiRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if !self.config.system_prompt.is_empty() {
            messages.push(Message::system(self.config.system_prompt.clone()));
        }
        messages.extend(request.messages);

        ApiRequest {
            model: request.model.unwrap_or_else(|| self.config.model.clone()),
            messages,
            temperature: request.temperature,
        }
    }
}

#[async_trait]
impl Generate for Client {
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, Error> {
        let request = Request::new(vec![Message::user(prompt)]).with_temperature(temperature);
        Ok(self.send(request).await?.content)
    }
}

fn transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(REQUEST_TIMEOUT)
    } else {
        Error::Transport(e.to_string())
    }
}

fn parse_response(api_response: ApiResponse) -> Result<Response, Error> {
    let choice = api_response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::Parse("response contained no choices".to_string()))?;

    Ok(Response {
        id: api_response.id,
        model: api_response.model,
        content: choice.message.content.unwrap_or_default(),
        finish_reason: choice.finish_reason,
    })
}

// ============================================================================
// Public types
// ============================================================================

/// A completion request. The client's system prompt is prepended on send.
#[derive(Debug, Clone)]
pub struct Request {
    pub model: Option<String>,
    pub messages: Vec<Message>,
    pub temperature: Option<f32>,
}

impl Request {
    /// Create a new request with the given messages.
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            model: None,
            messages,
            temperature: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// A message in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: text.into(),
        }
    }
}

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// The first choice of a completion response.
#[derive(Debug, Clone)]
pub struct Response {
    pub id: String,
    pub model: String,
    pub content: String,
    pub finish_reason: Option<String>,
}

// ============================================================================
// Internal API types
// ============================================================================

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.endpoint(), "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let config = ClientConfig::default().with_base_url("http://localhost:8000/v1/");
        assert_eq!(config.endpoint(), "http://localhost:8000/v1/chat/completions");
    }

    #[test]
    fn test_blank_api_key_is_missing() {
        let client = Client::new(ClientConfig::default())
            .unwrap()
            .with_api_key("   ");
        assert!(!client.has_credential());
        assert!(matches!(
            client.build_headers(),
            Err(Error::MissingCredential)
        ));
    }

    #[test]
    fn test_system_prompt_is_prepended() {
        let client = Client::new(ClientConfig::default().with_system_prompt("be brief"))
            .unwrap()
            .with_api_key("sk-test");
        let request = Request::new(vec![Message::user("Hello")]).with_temperature(0.7);
        let api_request = client.build_api_request(request);

        assert_eq!(api_request.model, DEFAULT_MODEL);
        assert_eq!(api_request.messages.len(), 2);
        assert_eq!(api_request.messages[0], Message::system("be brief"));
        assert_eq!(api_request.messages[1].role, Role::User);
        assert_eq!(api_request.temperature, Some(0.7));
    }

    #[test]
    fn test_request_model_overrides_default() {
        let client = Client::new(ClientConfig::default()).unwrap();
        let api_request =
            client.build_api_request(Request::new(Vec::new()).with_model("gpt-4o"));
        assert_eq!(api_request.model, "gpt-4o");
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_value(Message::assistant("hi")).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["content"], "hi");
    }

    #[test]
    fn test_empty_choices_is_parse_error() {
        let response = ApiResponse {
            id: "x".into(),
            model: "m".into(),
            choices: Vec::new(),
        };
        assert!(matches!(parse_response(response), Err(Error::Parse(_))));
    }

    #[test]
    fn test_transport_classification() {
        assert!(Error::Timeout(REQUEST_TIMEOUT).is_transport());
        assert!(Error::Transport("refused".into()).is_transport());
        assert!(!Error::MissingCredential.is_transport());
    }
}
