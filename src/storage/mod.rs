use crate::core::error::DochatError;
use async_trait::async_trait;

/// One entry returned by a repository listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentEntry {
    pub path: String,
    pub size: u64,
}

/// Byte source for attachment selection.
///
/// Implementations live outside this crate (object storage, local disk); the
/// core only reads through this boundary.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn read(&self, path: &str) -> Result<Vec<u8>, DochatError>;
    async fn list(&self, prefix: &str) -> Result<Vec<DocumentEntry>, DochatError>;
    async fn write(&self, path: &str, bytes: &[u8]) -> Result<(), DochatError>;
    async fn delete(&self, path: &str) -> Result<(), DochatError>;
}

/// Resolved preview location for a stored document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub url: String,
    pub content_type: String,
    pub size: u64,
}

/// Maps a document path to a fetchable preview URL.
///
/// Fails with [`DochatError::NotFound`] if the document does not exist.
#[async_trait]
pub trait PreviewResolver: Send + Sync {
    async fn resolve(&self, path: &str) -> Result<Preview, DochatError>;
}
