use std::sync::Arc;

use storage::cloudinary::CloudinaryBlobStore;
use storage::local::LocalBlobStore;
use storage::s3::S3BlobStore;
use storage::{BlobStore, StorageError};

use crate::config::StorageConfig;

/// Build the configured blob store backend.
pub async fn build_blob_store(config: &StorageConfig) -> Result<Arc<dyn BlobStore>, StorageError> {
    let store: Arc<dyn BlobStore> = match config {
        StorageConfig::Local(local) => {
            Arc::new(LocalBlobStore::new(local.root.clone(), &local.public_url).await?)
        }
        StorageConfig::S3(settings) => Arc::new(S3BlobStore::new(settings)?),
        StorageConfig::Cloudinary(settings) => Arc::new(CloudinaryBlobStore::new(settings)?),
    };
    Ok(store)
}
