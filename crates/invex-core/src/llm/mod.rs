//! Text-generation service seam.

mod gemini;

pub use gemini::GeminiClient;

use async_trait::async_trait;

use crate::error::ServiceError;

/// A single-turn generation request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationRequest {
    /// Text parts of the user turn, in order.
    pub parts: Vec<String>,
    /// MIME type the service should answer in, if it supports constraining it.
    pub response_mime_type: Option<String>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
}

/// A service that turns a prompt into free text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &str;

    /// Generate a single response.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ServiceError>;
}
