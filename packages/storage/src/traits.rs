use std::io::Cursor;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use super::asset::StoredAsset;
use super::error::StorageError;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Per-upload hints passed to a backend.
#[derive(Debug, Clone, Default)]
pub struct StoreOptions {
    /// Logical folder / namespace. Backends validate it with [`crate::folder::normalize`].
    pub folder: Option<String>,
    /// Original file name, forwarded where the provider accepts one.
    pub file_name: Option<String>,
    /// Exact length of the stream when known.
    pub content_length: Option<u64>,
}

/// Adapter over an external object-storage provider.
///
/// Implementations must be safe to share across concurrent requests. A failed
/// `store` must not leave an object that callers can observe.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stream an image to the provider and describe the stored object.
    async fn store(
        &self,
        reader: BoxReader,
        media_type: &str,
        options: &StoreOptions,
    ) -> Result<StoredAsset, StorageError>;

    /// Store an in-memory buffer.
    async fn store_bytes(
        &self,
        data: &[u8],
        media_type: &str,
        options: &StoreOptions,
    ) -> Result<StoredAsset, StorageError> {
        let reader: BoxReader = Box::new(Cursor::new(data.to_vec()));
        let options = StoreOptions {
            content_length: Some(data.len() as u64),
            ..options.clone()
        };
        self.store(reader, media_type, &options).await
    }

    /// Backend name used in logs.
    fn backend(&self) -> &'static str;
}
