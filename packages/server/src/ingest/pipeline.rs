use std::fmt;
use std::sync::Arc;

use storage::{AssetMetadata, BlobStore, StorageError, StoreOptions, StoredAsset};
use thiserror::Error;
use tracing::{Instrument, info, info_span, warn};

use super::validator::{UploadPolicy, ValidationError};
use super::UploadRequest;
use crate::repository::{RepositoryError, UploadFields, UploadRecord, UploadRepository};
use crate::utils::filename::display_name;

/// Stage at which an ingestion failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validation,
    Storage,
    Metadata,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Validation => "validation",
            Stage::Storage => "storage",
            Stage::Metadata => "metadata",
        })
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("blob store rejected the upload: {0}")]
    Storage(#[source] StorageError),
    /// The blob exists but its record does not.
    #[error("failed to record {}: {source}", asset.identifier)]
    Metadata {
        asset: StoredAsset,
        #[source]
        source: RepositoryError,
    },
}

impl IngestError {
    pub fn stage(&self) -> Stage {
        match self {
            IngestError::Validation(_) => Stage::Validation,
            IngestError::Storage(_) => Stage::Storage,
            IngestError::Metadata { .. } => Stage::Metadata,
        }
    }
}

/// Result of a completed ingestion.
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    pub identifier: String,
    pub url: String,
    pub metadata: AssetMetadata,
    pub record: UploadRecord,
}

/// Sequences validation, blob storage and metadata persistence for one upload.
pub struct IngestionPipeline {
    policy: UploadPolicy,
    blob_store: Arc<dyn BlobStore>,
    uploads: Arc<dyn UploadRepository>,
    mirror_metadata: bool,
}

impl IngestionPipeline {
    pub fn new(
        policy: UploadPolicy,
        blob_store: Arc<dyn BlobStore>,
        uploads: Arc<dyn UploadRepository>,
    ) -> Self {
        Self {
            policy,
            blob_store,
            uploads,
            mirror_metadata: true,
        }
    }

    /// Persist only identifier and URL when `false`.
    pub fn with_mirror_metadata(mut self, mirror: bool) -> Self {
        self.mirror_metadata = mirror;
        self
    }

    /// Run one upload to completion and release its temporary resources.
    pub async fn ingest(&self, request: UploadRequest) -> Result<UploadReceipt, IngestError> {
        let span = info_span!(
            "ingest",
            file_name = request
                .file
                .as_ref()
                .and_then(|f| f.file_name.as_deref())
                .unwrap_or("-"),
            backend = self.blob_store.backend(),
        );

        let outcome = self.run(&request).instrument(span.clone()).await;
        request.release().await;

        if let Err(e) = &outcome {
            span.in_scope(|| warn!(stage = %e.stage(), "Upload failed: {}", e));
        }
        outcome
    }

    async fn run(&self, request: &UploadRequest) -> Result<UploadReceipt, IngestError> {
        let validated = self.policy.validate(request)?;
        let file = validated.file;

        let reader = file
            .body
            .reader()
            .await
            .map_err(|e| IngestError::Storage(e.into()))?;
        let original_name = file.file_name.as_deref().and_then(display_name);
        let options = StoreOptions {
            folder: validated.folder,
            file_name: original_name.clone(),
            content_length: Some(file.body.len()),
        };

        let asset = self
            .blob_store
            .store(reader, &validated.media_type, &options)
            .await
            .map_err(IngestError::Storage)?;
        info!(identifier = %asset.identifier, bytes = asset.metadata.bytes, "Stored blob");

        let fields = UploadFields {
            url: asset.url.clone(),
            metadata: self.mirror_metadata.then(|| asset.metadata.clone()),
            original_name,
        };
        let record = match self.uploads.upsert(&asset.identifier, fields).await {
            Ok(record) => record,
            Err(source) => return Err(IngestError::Metadata { asset, source }),
        };
        info!(identifier = %record.identifier, "Recorded upload");

        Ok(UploadReceipt {
            identifier: asset.identifier,
            url: asset.url,
            metadata: asset.metadata,
            record,
        })
    }
}
