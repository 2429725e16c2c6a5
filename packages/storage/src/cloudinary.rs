use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use tokio_util::io::ReaderStream;

use super::asset::{AssetMetadata, StoredAsset};
use super::error::StorageError;
use super::folder;
use super::traits::{BlobStore, BoxReader, StoreOptions};

/// Credentials for a Cloudinary account.
#[derive(Debug, Deserialize, Clone)]
pub struct CloudinarySettings {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    /// API root. Default: "https://api.cloudinary.com/v1_1".
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Digest the account verifies signatures with. Default: sha1.
    #[serde(default)]
    pub signature_algorithm: SignatureAlgorithm,
}

/// Request signing digest, set per account in the Cloudinary console.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SignatureAlgorithm {
    #[default]
    Sha1,
    Sha256,
}

fn default_api_base() -> String {
    "https://api.cloudinary.com/v1_1".into()
}

/// Subset of Cloudinary's upload response that describes the asset.
#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    secure_url: String,
    format: String,
    bytes: u64,
    width: u32,
    height: u32,
    created_at: DateTime<Utc>,
}

impl From<UploadResponse> for StoredAsset {
    fn from(res: UploadResponse) -> Self {
        Self {
            identifier: res.public_id,
            url: res.secure_url,
            metadata: AssetMetadata {
                format: res.format,
                bytes: res.bytes,
                width: res.width,
                height: res.height,
            },
            created_at: res.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    message: String,
}

/// Blob store that streams images to Cloudinary's signed upload API.
pub struct CloudinaryBlobStore {
    client: reqwest::Client,
    upload_url: String,
    api_key: String,
    api_secret: String,
    algorithm: SignatureAlgorithm,
}

impl CloudinaryBlobStore {
    pub fn new(settings: &CloudinarySettings) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("image-relay/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            upload_url: format!(
                "{}/{}/image/upload",
                settings.api_base.trim_end_matches('/'),
                settings.cloud_name
            ),
            api_key: settings.api_key.clone(),
            api_secret: settings.api_secret.clone(),
            algorithm: settings.signature_algorithm,
        })
    }

    /// Form parameters for one upload, `signature` included.
    ///
    /// Every other parameter is covered by the signature.
    fn upload_params(
        &self,
        folder: Option<String>,
        timestamp: i64,
    ) -> BTreeMap<&'static str, String> {
        let mut params = BTreeMap::new();
        params.insert("timestamp", timestamp.to_string());
        if let Some(folder) = folder {
            params.insert("folder", folder);
        }
        let signature = sign(&params, &self.api_secret, self.algorithm);
        params.insert("signature", signature);
        params
    }
}

/// Sign upload parameters: sorted `k=v` pairs joined by `&`, followed by the secret.
fn sign(params: &BTreeMap<&str, String>, secret: &str, algorithm: SignatureAlgorithm) -> String {
    let joined = params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    let payload = format!("{joined}{secret}");
    match algorithm {
        SignatureAlgorithm::Sha1 => hex::encode(Sha1::digest(payload.as_bytes())),
        SignatureAlgorithm::Sha256 => hex::encode(Sha256::digest(payload.as_bytes())),
    }
}

#[async_trait]
impl BlobStore for CloudinaryBlobStore {
    async fn store(
        &self,
        reader: BoxReader,
        media_type: &str,
        options: &StoreOptions,
    ) -> Result<StoredAsset, StorageError> {
        let folder = folder::normalize(options.folder.as_deref())?;

        let params = self.upload_params(folder, Utc::now().timestamp());

        let body = reqwest::Body::wrap_stream(ReaderStream::new(reader));
        let part = match options.content_length {
            Some(len) => Part::stream_with_length(body, len),
            None => Part::stream(body),
        }
        .file_name(options.file_name.clone().unwrap_or_else(|| "upload".into()))
        .mime_str(media_type)?;

        let mut form = Form::new()
            .part("file", part)
            .text("api_key", self.api_key.clone());
        for (key, value) in params {
            form = form.text(key, value);
        }

        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorResponse>().await {
                Ok(body) => body.error.message,
                Err(_) => status.to_string(),
            };
            return Err(StorageError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| StorageError::Transport(format!("unreadable upload response: {e}")))?;
        tracing::debug!(identifier = %uploaded.public_id, bytes = uploaded.bytes, "stored blob on cloudinary");

        Ok(uploaded.into())
    }

    fn backend(&self) -> &'static str {
        "cloudinary"
    }
}
