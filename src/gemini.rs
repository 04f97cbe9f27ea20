//! Gemini API client configuration with sensible defaults.

use crate::config::GeminiSettings;
use crate::error::{KenningError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Default timeout for Gemini API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Header carrying the API key, which keeps the key out of request URLs.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Shared HTTP client for the Generative Language API.
///
/// Cheap to clone; the embedder and the generator share one connection pool.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Create a client with the default timeout.
    pub fn new(api_key: &str, base_url: &str) -> Result<Self> {
        Self::with_timeout(api_key, base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a client with a custom timeout.
    pub fn with_timeout(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(KenningError::ClientInit(
                "Gemini API key is empty. Set GEMINI_API_KEY.".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KenningError::ClientInit(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_key: api_key.trim().to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a client from settings. Fails when no API key is configured.
    pub fn from_settings(settings: &GeminiSettings) -> Result<Self> {
        let api_key = settings.api_key.as_deref().ok_or_else(|| {
            KenningError::ClientInit("GEMINI_API_KEY is not set".to_string())
        })?;
        Self::with_timeout(
            api_key,
            &settings.base_url,
            Duration::from_secs(settings.timeout_seconds),
        )
    }

    /// URL of a model method, e.g. `.../v1beta/models/gemini-1.5-flash:generateContent`.
    pub fn model_url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/v1beta/models/{}:{}",
            self.base_url,
            bare_model_name(model),
            method
        )
    }

    /// POST a JSON body and decode the JSON reply.
    ///
    /// Transport errors, non-success statuses and undecodable bodies are all
    /// reported through `on_error`, so each caller keeps its own error kind.
    pub async fn post_json<B, R, E>(&self, url: &str, body: &B, on_error: E) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
        E: Fn(String) -> KenningError,
    {
        debug!("POST {}", url);

        let response = self
            .http
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| on_error(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(on_error(format!("API returned {}: {}", status, body.trim())));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| on_error(format!("failed to parse response: {}", e)))
    }
}

/// Strip the `models/` prefix the API uses in resource names.
pub fn bare_model_name(model: &str) -> &str {
    model.strip_prefix("models/").unwrap_or(model)
}

/// Fully qualified model resource name (`models/<name>`).
pub fn model_resource(model: &str) -> String {
    format!("models/{}", bare_model_name(model))
}
