//! Client for the two chat-completion providers the bot can talk to.
//!
//! Both xAI (Grok) and OpenAI expose an OpenAI-compatible
//! `/chat/completions` endpoint, so a single HTTP implementation serves both.
//! Callers pick a [`Provider`] per request; everything else (base URL, key,
//! model table) hangs off that enum.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::config::Config;

/// Timeout for a primary text completion.
pub const COMPLETION_TIMEOUT: Duration = Duration::from_secs(60);
/// Timeout for a full image analysis (download plus completion).
pub const IMAGE_TIMEOUT: Duration = Duration::from_secs(90);
/// Timeout for downloading the image itself.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);
/// Token budget for the commands' primary completions.
pub const DEFAULT_MAX_TOKENS: u32 = 200;

const DEFAULT_IMAGE_PROMPT: &str =
    "Form an opinion on this image. Try to be controversial or humorous.";

/// Errors that can occur while talking to a provider.
#[derive(Error, Debug)]
pub enum AiError {
    /// Error during HTTP request communication.
    #[error("API communication failure: {0}")]
    Api(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("{provider} API error (status {status}): {body}")]
    Status {
        provider: Provider,
        status: u16,
        body: String,
    },

    /// The provider answered successfully but without any choices.
    #[error("no response from {0}")]
    EmptyResponse(Provider),

    /// The response body could not be interpreted.
    #[error("invalid response format from {provider}: {reason}")]
    MalformedResponse { provider: Provider, reason: String },

    /// The requested provider has no API key configured.
    #[error("validation error for {var}: environment variable not set")]
    MissingCredential { var: &'static str },

    #[error("error downloading image: {0}")]
    ImageDownload(String),

    #[error("{0} request timed out")]
    Timeout(Provider),

    #[error("request cancelled")]
    Cancelled,
}

pub type AiResult<T> = Result<T, AiError>;

/// The closed set of completion providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    /// xAI's Grok: the fast, cheap default.
    Grok,
    OpenAi,
}

impl Provider {
    /// Normalizes a user-supplied token such as `grok` or `OpenAI`.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "grok" => Some(Self::Grok),
            "openai" => Some(Self::OpenAi),
            _ => None,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Grok => "Grok",
            Self::OpenAi => "OpenAI",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Self::Grok => "grok-3",
            Self::OpenAi => "gpt-4o",
        }
    }

    pub fn vision_model(self) -> &'static str {
        match self {
            Self::Grok => "grok-vision-beta",
            Self::OpenAi => "gpt-4o",
        }
    }

    /// Knowledge cutoff label shown in the "thinking" message, known only for
    /// the default models.
    pub fn model_version(self, model: &str) -> Option<&'static str> {
        match self {
            Self::Grok if model == self.default_model() => Some("2024-11-17"),
            Self::OpenAi if model == self.default_model() => Some("2024-05-13"),
            _ => None,
        }
    }

    fn key_var(self) -> &'static str {
        match self {
            Self::Grok => "XAI_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
        }
    }

    fn image_detail(self) -> Option<&'static str> {
        match self {
            Self::Grok => Some("high"),
            Self::OpenAi => None,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A system/user prompt pair sent to a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub model: String,
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// Builds a request for the provider's default model and the default budget.
    pub fn new(provider: Provider, system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            model: provider.default_model().to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// An image analysis request. `prompt` falls back to a stock question.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRequest {
    pub image_url: String,
    pub system: String,
    pub prompt: Option<String>,
    pub max_tokens: u32,
}

/// The capability every provider backend exposes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Completes a system/user prompt pair.
    async fn complete(&self, provider: Provider, request: CompletionRequest) -> AiResult<String>;

    /// Asks the provider's vision model about an image.
    async fn complete_with_image(&self, provider: Provider, request: ImageRequest)
    -> AiResult<String>;
}

/// Runs `fut` under its own timeout, nested inside the caller's cancellation.
/// Cancellation wins over both the timeout and the request itself.
pub async fn guarded<T, F>(
    cancel: &CancellationToken,
    limit: Duration,
    provider: Provider,
    fut: F,
) -> AiResult<T>
where
    F: Future<Output = AiResult<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AiError::Cancelled),
        result = tokio::time::timeout(limit, fut) => {
            result.unwrap_or(Err(AiError::Timeout(provider)))
        }
    }
}

/// Connection details for one provider.
#[derive(Clone)]
struct Endpoint {
    base_url: String,
    api_key: Option<String>,
}

impl Endpoint {
    fn new(base_url: &str, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }
}

/// HTTP client for Grok and OpenAI.
pub struct AiClient {
    http: Client,
    grok: Endpoint,
    openai: Endpoint,
}

impl AiClient {
    pub fn new(config: &Config) -> Self {
        Self::with_endpoints(
            (config.xai_base_url.as_str(), config.xai_api_key.clone()),
            (config.openai_base_url.as_str(), config.openai_api_key.clone()),
        )
    }

    /// Creates a client against explicit `(base_url, api_key)` pairs.
    pub fn with_endpoints(
        grok: (&str, Option<String>),
        openai: (&str, Option<String>),
    ) -> Self {
        Self {
            http: Client::new(),
            grok: Endpoint::new(grok.0, grok.1),
            openai: Endpoint::new(openai.0, openai.1),
        }
    }

    pub fn is_configured(&self, provider: Provider) -> bool {
        self.endpoint(provider).api_key.is_some()
    }

    fn endpoint(&self, provider: Provider) -> &Endpoint {
        match provider {
            Provider::Grok => &self.grok,
            Provider::OpenAi => &self.openai,
        }
    }

    /// Returns the endpoint and its key, or a validation error before any
    /// network traffic happens.
    fn credentials(&self, provider: Provider) -> AiResult<(&str, &str)> {
        let endpoint = self.endpoint(provider);
        match endpoint.api_key.as_deref() {
            Some(key) => Ok((endpoint.base_url.as_str(), key)),
            None => Err(AiError::MissingCredential {
                var: provider.key_var(),
            }),
        }
    }

    async fn post_chat(
        &self,
        provider: Provider,
        body: &ChatRequest<'_>,
        timeout: Duration,
    ) -> AiResult<String> {
        let (base_url, key) = self.credentials(provider)?;
        let url = format!("{base_url}/chat/completions");

        let response = self
            .http
            .post(&url)
            .bearer_auth(key)
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!("{} API request failed: {}", provider, e);
                if e.is_timeout() {
                    AiError::Timeout(provider)
                } else {
                    AiError::Api(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(
                provider = %provider,
                status_code = status.as_u16(),
                response_body = %body,
                "provider API error"
            );
            return Err(AiError::Status {
                provider,
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        let parsed: ChatResponse =
            serde_json::from_str(&text).map_err(|e| AiError::MalformedResponse {
                provider,
                reason: e.to_string(),
            })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(AiError::EmptyResponse(provider))?;
        let content = choice
            .message
            .content
            .ok_or_else(|| AiError::MalformedResponse {
                provider,
                reason: "choice has no text content".to_string(),
            })?;

        info!(
            provider = %provider,
            response_length = content.len(),
            finish_reason = choice.finish_reason.as_deref().unwrap_or("unknown"),
            "received provider response"
        );
        Ok(content)
    }

    /// Downloads an image and returns it as a `data:` URL.
    async fn fetch_image_data_url(&self, image_url: &str) -> AiResult<String> {
        let response = self
            .http
            .get(image_url)
            .timeout(DOWNLOAD_TIMEOUT)
            .send()
            .await
            .map_err(|e| AiError::ImageDownload(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AiError::ImageDownload(format!(
                "status {}",
                response.status().as_u16()
            )));
        }

        let mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::trim)
            .filter(|v| v.starts_with("image/"))
            .unwrap_or("image/jpeg")
            .to_string();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AiError::ImageDownload(e.to_string()))?;
        debug!("downloaded {} bytes of {}", bytes.len(), mime);

        Ok(format!("data:{mime};base64,{}", BASE64.encode(&bytes)))
    }
}

#[async_trait]
impl LanguageModel for AiClient {
    async fn complete(&self, provider: Provider, request: CompletionRequest) -> AiResult<String> {
        info!(
            provider = %provider,
            model = %request.model,
            max_tokens = request.max_tokens,
            prompt_length = request.prompt.len(),
            "sending AI request"
        );

        let body = ChatRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            messages: vec![
                ChatMessage::text("system", &request.system),
                ChatMessage::text("user", &request.prompt),
            ],
        };
        self.post_chat(provider, &body, COMPLETION_TIMEOUT).await
    }

    async fn complete_with_image(
        &self,
        provider: Provider,
        request: ImageRequest,
    ) -> AiResult<String> {
        self.credentials(provider)?;
        info!(provider = %provider, image_url = %request.image_url, "processing image");

        let data_url = self.fetch_image_data_url(&request.image_url).await?;
        let prompt = request
            .prompt
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(DEFAULT_IMAGE_PROMPT);

        let body = ChatRequest {
            model: provider.vision_model(),
            max_tokens: request.max_tokens,
            messages: vec![
                ChatMessage::text("system", &request.system),
                ChatMessage {
                    role: "user",
                    content: Content::Parts(vec![
                        ContentPart::Text { text: prompt },
                        ContentPart::ImageUrl {
                            image_url: ImageUrl {
                                url: &data_url,
                                detail: provider.image_detail(),
                            },
                        },
                    ]),
                },
            ],
        };
        self.post_chat(provider, &body, IMAGE_TIMEOUT).await
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: Content<'a>,
}

impl<'a> ChatMessage<'a> {
    fn text(role: &'static str, text: &'a str) -> Self {
        Self {
            role,
            content: Content::Text(text),
        }
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum Content<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<&'static str>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}
