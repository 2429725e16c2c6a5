use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::asset::{AssetMetadata, StoredAsset};
use super::error::StorageError;
use super::folder;
use super::hash::ContentHash;
use super::reader::split_image_header;
use super::traits::{BlobStore, BoxReader, StoreOptions};

/// Content-addressed image store on local disk.
///
/// Objects live at `{root}/{folder}/{sha256}.{ext}` and are served from
/// `{public_url}/{folder}/{sha256}.{ext}`. The identifier is `{folder}/{sha256}`,
/// so re-uploading identical bytes yields the same identifier.
pub struct LocalBlobStore {
    root: PathBuf,
    public_url: String,
}

impl LocalBlobStore {
    /// Create the store, making sure the root and its temp directory exist.
    pub async fn new(root: PathBuf, public_url: &str) -> Result<Self, StorageError> {
        fs::create_dir_all(&root).await?;
        fs::create_dir_all(root.join(".tmp")).await?;
        Ok(Self {
            root,
            public_url: public_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.root
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }

    /// Copy the stream into a temp file, hashing as we go.
    async fn spill(
        &self,
        mut reader: BoxReader,
        temp_path: &Path,
    ) -> Result<(ContentHash, u64), StorageError> {
        let mut hasher = Sha256::new();
        let mut total_bytes: u64 = 0;
        let mut buf = vec![0u8; 64 * 1024];
        let mut temp_file = fs::File::create(temp_path).await?;

        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            total_bytes += n as u64;
            hasher.update(&buf[..n]);
            temp_file.write_all(&buf[..n]).await?;
        }

        temp_file.flush().await?;
        Ok((ContentHash::from_hasher(hasher), total_bytes))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn store(
        &self,
        reader: BoxReader,
        _media_type: &str,
        options: &StoreOptions,
    ) -> Result<StoredAsset, StorageError> {
        let folder = folder::normalize(options.folder.as_deref())?;
        let (info, reader) = split_image_header(reader).await?;

        let temp_path = self.temp_path();
        let (hash, bytes) = match self.spill(reader, &temp_path).await {
            Ok(spilled) => spilled,
            Err(e) => {
                let _ = fs::remove_file(&temp_path).await;
                return Err(e);
            }
        };

        let identifier = folder::object_key(folder.as_deref(), &hash.to_hex());
        let key = format!("{identifier}.{}", info.format_tag());
        let object_path = self.root.join(&key);

        let created_at = if fs::try_exists(&object_path).await? {
            let _ = fs::remove_file(&temp_path).await;
            let modified = fs::metadata(&object_path).await?.modified()?;
            DateTime::<Utc>::from(modified)
        } else {
            if let Some(parent) = object_path.parent() {
                fs::create_dir_all(parent).await?;
            }
            if let Err(e) = fs::rename(&temp_path, &object_path).await {
                let _ = fs::remove_file(&temp_path).await;
                return Err(e.into());
            }
            Utc::now()
        };

        tracing::debug!(%identifier, bytes, "stored blob on local disk");

        Ok(StoredAsset {
            identifier,
            url: format!("{}/{key}", self.public_url),
            metadata: AssetMetadata {
                format: info.format_tag().to_string(),
                bytes,
                width: info.width,
                height: info.height,
            },
            created_at,
        })
    }

    fn backend(&self) -> &'static str {
        "local"
    }
}
