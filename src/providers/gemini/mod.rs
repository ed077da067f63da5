use crate::conversation::Part;
use crate::core::error::DochatError;
use crate::providers::{ModelProvider, ModelReply};
use async_trait::async_trait;

mod client;
mod types;

pub use client::GeminiClient;

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

#[derive(Clone)]
pub struct GeminiProvider {
    client: GeminiClient,
    streaming: bool,
}

impl GeminiProvider {
    pub fn new(api_key: Option<String>) -> Self {
        let base_url = "https://generativelanguage.googleapis.com".to_string();
        Self::with_endpoint(base_url, api_key)
    }

    pub fn with_endpoint(endpoint: String, api_key: Option<String>) -> Self {
        let api_key = api_key.unwrap_or_default();
        Self {
            client: GeminiClient::new(endpoint, api_key, None),
            streaming: true,
        }
    }

    /// Use the one-shot `generateContent` endpoint instead of streaming.
    pub fn without_streaming(mut self) -> Self {
        self.streaming = false;
        self
    }
}

#[async_trait]
impl ModelProvider for GeminiProvider {
    async fn submit(&self, parts: &[Part], model: &str) -> Result<ModelReply, DochatError> {
        if self.streaming {
            let stream = self.client.generate_content_stream(parts, model).await?;
            Ok(ModelReply::Stream(stream))
        } else {
            let text = self.client.generate_content(parts, model).await?;
            Ok(ModelReply::Complete(text))
        }
    }
}
