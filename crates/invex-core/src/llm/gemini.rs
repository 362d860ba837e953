//! Google Gemini `generateContent` client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ServiceError;
use crate::models::config::LlmConfig;

use super::{GenerationRequest, TextGenerator};

/// Gemini REST client.
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    api_key_env: String,
    timeout: Duration,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GeminiClient {
    /// Create a client from configuration.
    ///
    /// A missing API key is not an error here; requests fail with
    /// [`ServiceError::MissingCredential`] instead.
    pub fn from_config(config: &LlmConfig) -> Result<Self, ServiceError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.resolve_api_key().ok(),
            api_key_env: config.api_key_env.clone(),
            timeout,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    fn request_body<'a>(request: &'a GenerationRequest) -> GenerateContentRequest<'a> {
        let generation_config = if request.response_mime_type.is_some() || request.temperature.is_some() {
            Some(GenerationConfig {
                response_mime_type: request.response_mime_type.as_deref(),
                temperature: request.temperature,
            })
        } else {
            None
        };

        GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: request.parts.iter().map(|p| RequestPart { text: p }).collect(),
            }],
            generation_config,
        }
    }

    fn response_text(response: GenerateContentResponse) -> Result<String, ServiceError> {
        let Some(candidate) = response.candidates.into_iter().next() else {
            let reason = response.prompt_feedback.and_then(|f| f.block_reason);
            return Err(ServiceError::EmptyResponse { reason });
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ServiceError::EmptyResponse {
                reason: candidate.finish_reason,
            });
        }
        Ok(text)
    }

    fn map_transport_error(&self, e: reqwest::Error) -> ServiceError {
        if e.is_timeout() {
            ServiceError::Timeout {
                secs: self.timeout.as_secs(),
            }
        } else {
            ServiceError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ServiceError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| ServiceError::MissingCredential {
            env_var: self.api_key_env.clone(),
        })?;

        let start = Instant::now();
        debug!(model = %self.model, parts = request.parts.len(), "Sending request to Gemini");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&Self::request_body(request))
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await.map_err(|e| self.map_transport_error(e))?;
        let decoded: GenerateContentResponse =
            serde_json::from_str(&body).map_err(|e| ServiceError::Decode(e.to_string()))?;
        let text = Self::response_text(decoded)?;

        debug!(
            model = %self.model,
            chars = text.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Gemini response received"
        );
        Ok(text)
    }
}
