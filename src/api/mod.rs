//! Client side of the game HTTP API.
//!
//! Each game talks to the server through its own async trait (`ChainApi`,
//! `SpellApi`, `PuzzleApi`). `HttpApi` implements all three over reqwest;
//! tests substitute scripted doubles.

mod chain;
mod puzzle;
mod spell;

pub use chain::{ChainApi, ChainMoveRequest, ChainMoveResponse, ChainStartRequest, ChainStartResponse};
pub use puzzle::{
    HintLine, PieceWire, PuzzleApi, PuzzleGenerateRequest, PuzzleGenerateResponse,
    PuzzleHintRequest, PuzzleHintResponse, PuzzleSkipRequest, PuzzleSkipResponse,
    PuzzleSubmitRequest, PuzzleSubmitResponse,
};
pub use spell::{SpellApi, SpellStartRequest, SpellStartResponse, SpellSubmitRequest, SpellSubmitResponse};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors that can occur while talking to the game server
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Server returned {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("Response parsing failed: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the game server, without trailing slash
    pub base_url: String,
    /// Timeout applied to every request
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let base_url = std::env::var("GAME_API_BASE_URL")
            .ok()
            .and_then(|url| {
                let trimmed = url.trim().trim_end_matches('/');
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .unwrap_or(defaults.base_url);

        let timeout = std::env::var("GAME_API_TIMEOUT")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);

        Self { base_url, timeout }
    }
}

/// FastAPI-style error body: `{"detail": ...}`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

/// reqwest-backed implementation of every game API
#[derive(Debug, Clone)]
pub struct HttpApi {
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpApi {
    pub fn new(config: &ApiConfig) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Config(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.clone(),
            timeout: config.timeout,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST a JSON body and decode a JSON reply
    pub(crate) async fn post<B, R>(&self, path: &str, body: &B) -> ApiResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.url(path);
        tracing::debug!("POST {}", url);

        self.bounded(async {
            let response = self
                .client
                .post(&url)
                .json(body)
                .send()
                .await
                .map_err(|e| ApiError::Transport(e.to_string()))?;
            Self::decode(response).await
        })
        .await
    }

    /// DELETE a resource, ignoring any reply body
    pub(crate) async fn delete(&self, path: &str) -> ApiResult<()> {
        let url = self.url(path);
        tracing::debug!("DELETE {}", url);

        self.bounded(async {
            let response = self
                .client
                .delete(&url)
                .send()
                .await
                .map_err(|e| ApiError::Transport(e.to_string()))?;
            if !response.status().is_success() {
                return Err(Self::status_error(response).await);
            }
            Ok(())
        })
        .await
    }

    /// Limit a whole exchange, body included, to the configured timeout
    async fn bounded<T>(&self, request: impl Future<Output = ApiResult<T>>) -> ApiResult<T> {
        tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| ApiError::Timeout(self.timeout))?
    }

    async fn decode<R: DeserializeOwned>(response: reqwest::Response) -> ApiResult<R> {
        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| ApiError::Parse(e.to_string()))
    }

    async fn status_error(response: reqwest::Response) -> ApiError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        ApiError::Status {
            status,
            detail: error_detail(&body),
        }
    }
}

/// Pull a readable message out of an error body
fn error_detail(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: serde_json::Value::String(detail),
        }) => detail,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) => body.trim().to_string(),
    }
}
