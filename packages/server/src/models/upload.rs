use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storage::AssetMetadata;

use crate::ingest::UploadReceipt;
use crate::repository::{Page, UploadRecord};

/// Technical description of a stored image.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ImageMetadata {
    /// Short format tag.
    #[schema(example = "png")]
    pub format: String,
    /// Stored size in bytes.
    #[schema(example = 2048)]
    pub bytes: u64,
    #[schema(example = 640)]
    pub width: u32,
    #[schema(example = 480)]
    pub height: u32,
}

impl From<AssetMetadata> for ImageMetadata {
    fn from(m: AssetMetadata) -> Self {
        Self {
            format: m.format,
            bytes: m.bytes,
            width: m.width,
            height: m.height,
        }
    }
}

/// Response DTO for a completed upload.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UploadResponse {
    /// Canonical retrieval URL.
    #[schema(example = "https://res.cloudinary.com/demo/image/upload/v1/uploads/a1b2c3.png")]
    pub url: String,
    /// Identifier assigned by the blob store.
    #[schema(example = "uploads/a1b2c3")]
    pub identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ImageMetadata>,
}

impl From<UploadReceipt> for UploadResponse {
    fn from(receipt: UploadReceipt) -> Self {
        Self {
            url: receipt.url,
            identifier: receipt.identifier,
            metadata: Some(receipt.metadata.into()),
        }
    }
}

/// Response DTO for one listed upload.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UploadRecordResponse {
    #[schema(example = "uploads/a1b2c3")]
    pub identifier: String,
    pub url: String,
    /// Absent when the record was written without mirrored metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ImageMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "cat.png")]
    pub original_name: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

impl From<UploadRecord> for UploadRecordResponse {
    fn from(record: UploadRecord) -> Self {
        Self {
            identifier: record.identifier,
            url: record.url,
            metadata: record.metadata.map(ImageMetadata::from),
            original_name: record.original_name,
            uploaded_at: record.uploaded_at,
        }
    }
}

/// Query parameters for listing uploads.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct UploadListQuery {
    /// Page number (1-indexed).
    #[param(example = 1)]
    pub page: Option<u64>,
    /// Items per page (1-200, default 50).
    #[param(example = 50)]
    pub per_page: Option<u64>,
}

impl UploadListQuery {
    pub fn page(&self) -> Page {
        Page::new(self.page, self.per_page)
    }
}
