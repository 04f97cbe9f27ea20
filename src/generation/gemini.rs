//! Gemini generateContent implementation.

use super::Generator;
use crate::config::GenerationSettings;
use crate::error::{KenningError, Result};
use crate::gemini::GeminiClient;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Gemini-based generator.
pub struct GeminiGenerator {
    client: GeminiClient,
    model: String,
    temperature: Option<f32>,
    max_output_tokens: Option<u32>,
}

impl GeminiGenerator {
    /// Create a generator for the given model with provider defaults.
    pub fn new(client: GeminiClient, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
            temperature: None,
            max_output_tokens: None,
        }
    }

    /// Create a generator from settings.
    pub fn from_settings(client: GeminiClient, settings: &GenerationSettings) -> Self {
        let mut generator = Self::new(client, &settings.model);
        generator.temperature = settings.temperature;
        generator.max_output_tokens = settings.max_output_tokens;
        generator
    }

    fn request<'a>(&self, prompt: &'a str) -> GenerateRequest<'a> {
        let generation_config = if self.temperature.is_some() || self.max_output_tokens.is_some() {
            Some(GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            })
        } else {
            None
        };

        GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Text of the first candidate, with all of its text parts joined.
    fn into_text(self) -> Option<String> {
        let parts = self.candidates.into_iter().next()?.content?.parts;
        let text: String = parts.into_iter().filter_map(|p| p.text).collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = self.client.model_url(&self.model, "generateContent");

        let response: GenerateResponse = self
            .client
            .post_json(&url, &self.request(prompt), KenningError::Generation)
            .await?;

        let text = response
            .into_text()
            .ok_or_else(|| KenningError::Generation("Empty response from model".to_string()))?;

        debug!("Generated {} characters", text.len());
        Ok(text)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GeminiClient {
        GeminiClient::new("test-key", "http://127.0.0.1:9").unwrap()
    }

    #[test]
    fn test_request_omits_unset_config() {
        let generator = GeminiGenerator::new(client(), "gemini-1.5-flash");
        let json = serde_json::to_value(generator.request("Hi")).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "Hi");
        assert!(json.get("generationConfig").is_none());
    }

    #[test]
    fn test_request_includes_configured_sampling() {
        let settings = GenerationSettings {
            model: "gemini-1.5-pro".to_string(),
            temperature: Some(0.2),
            max_output_tokens: None,
        };
        let generator = GeminiGenerator::from_settings(client(), &settings);
        assert_eq!(generator.model(), "gemini-1.5-pro");

        let json = serde_json::to_value(generator.request("Hi")).unwrap();
        assert!(json["generationConfig"]["temperature"].is_number());
        assert!(json["generationConfig"].get("maxOutputTokens").is_none());
    }

    #[test]
    fn test_response_text_joins_parts() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hello, "},{"text":"world"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(response.into_text().as_deref(), Some("Hello, world"));
    }

    #[test]
    fn test_response_without_text() {
        let response: GenerateResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap();
        assert!(response.into_text().is_none());

        let response: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(response.into_text().is_none());
    }
}
