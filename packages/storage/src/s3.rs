use async_trait::async_trait;
use chrono::Utc;
use s3::creds::Credentials;
use s3::{Bucket, Region};
use serde::Deserialize;
use uuid::Uuid;

use super::asset::{AssetMetadata, StoredAsset};
use super::error::StorageError;
use super::folder;
use super::reader::{CountingReader, split_image_header};
use super::traits::{BlobStore, BoxReader, StoreOptions};

/// Connection settings for an S3-compatible bucket.
#[derive(Debug, Deserialize, Clone)]
pub struct S3Settings {
    pub bucket: String,
    /// Region name. Default: "us-east-1".
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint for MinIO, R2 and friends.
    pub endpoint: Option<String>,
    pub access_key: String,
    pub secret_key: String,
    /// Base URL objects are publicly served from, without trailing slash.
    pub public_url: String,
    /// Use path-style addressing (`endpoint/bucket/key`). Default: false.
    #[serde(default)]
    pub path_style: bool,
}

fn default_region() -> String {
    "us-east-1".into()
}

/// Blob store backed by an S3-compatible bucket.
///
/// Object keys are `{folder}/{uuidv7}.{ext}`; the key without extension is the
/// identifier. Format and dimensions are probed before the upload starts.
pub struct S3BlobStore {
    bucket: Box<Bucket>,
    public_url: String,
}

impl S3BlobStore {
    pub fn new(settings: &S3Settings) -> Result<Self, StorageError> {
        let region = match &settings.endpoint {
            Some(endpoint) => Region::Custom {
                region: settings.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => settings
                .region
                .parse()
                .map_err(|e| StorageError::Config(format!("invalid region: {e}")))?,
        };

        let credentials = Credentials::new(
            Some(&settings.access_key),
            Some(&settings.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Config(format!("invalid credentials: {e}")))?;

        let mut bucket = Bucket::new(&settings.bucket, region, credentials)?;
        if settings.path_style {
            bucket = bucket.with_path_style();
        }

        Ok(Self {
            bucket,
            public_url: settings.public_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn store(
        &self,
        reader: BoxReader,
        media_type: &str,
        options: &StoreOptions,
    ) -> Result<StoredAsset, StorageError> {
        let folder = folder::normalize(options.folder.as_deref())?;
        let (info, reader) = split_image_header(reader).await?;

        let identifier = folder::object_key(folder.as_deref(), &Uuid::now_v7().to_string());
        let key = format!("{identifier}.{}", info.format_tag());

        let mut reader = CountingReader::new(reader);
        let response = self
            .bucket
            .put_object_stream_with_content_type(&mut reader, &key, media_type)
            .await?;

        let status = response.status_code();
        if !(200..300).contains(&status) {
            return Err(StorageError::Rejected {
                status,
                message: format!("unexpected status storing {key}"),
            });
        }

        tracing::debug!(%identifier, bytes = reader.bytes_read(), "stored blob in bucket");

        Ok(StoredAsset {
            identifier,
            url: format!("{}/{key}", self.public_url),
            metadata: AssetMetadata {
                format: info.format_tag().to_string(),
                bytes: reader.bytes_read(),
                width: info.width,
                height: info.height,
            },
            created_at: Utc::now(),
        })
    }

    fn backend(&self) -> &'static str {
        "s3"
    }
}
