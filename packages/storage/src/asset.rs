use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Technical description of a stored image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetMetadata {
    /// Short format tag as reported by the provider (`png`, `jpg`, `gif`, `webp`).
    pub format: String,
    /// Stored size in bytes.
    pub bytes: u64,
    pub width: u32,
    pub height: u32,
}

/// An object confirmed to exist in the blob store.
///
/// The identifier is assigned by the provider. Two uploads of the same logical
/// asset may share an identifier, which is what keys the metadata record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAsset {
    pub identifier: String,
    /// Canonical retrieval URL.
    pub url: String,
    pub metadata: AssetMetadata,
    pub created_at: DateTime<Utc>,
}
