use crate::conversation::Part;
use crate::core::error::DochatError;
use async_trait::async_trait;
use futures::stream::BoxStream;

pub mod base_client;
pub mod gemini;

/// A provider's answer to one submitted request.
///
/// Providers may answer with the complete text at once or with a stream of
/// text deltas terminated by end-of-stream (or an error item).
pub enum ModelReply {
    Complete(String),
    Stream(BoxStream<'static, Result<String, DochatError>>),
}

/// A generative model endpoint that accepts an ordered part list.
///
/// Passed explicitly into each `StreamingSession` at construction; never held
/// as process-global state.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    async fn submit(&self, parts: &[Part], model: &str) -> Result<ModelReply, DochatError>;
}
