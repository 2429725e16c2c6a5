use storage::probe;
use thiserror::Error;

use super::{IncomingFile, UploadRequest};
use crate::config::UploadConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no file was provided in the `file` field")]
    MissingFile,
    #[error("file is {size} bytes, the limit is {limit} bytes")]
    TooLarge { size: u64, limit: u64 },
    #[error("media type `{media_type}` is not accepted")]
    UnsupportedType { media_type: String },
    #[error("declared length {declared} does not match the {received} bytes received")]
    LengthMismatch { declared: u64, received: u64 },
    #[error("declared as `{declared}` but the content looks like `{detected}`")]
    ContentMismatch { declared: String, detected: String },
    #[error("invalid folder: {0}")]
    InvalidFolder(String),
}

impl ValidationError {
    /// Stable code reported in the `error` field.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::MissingFile => "MissingFile",
            ValidationError::TooLarge { .. } => "TooLarge",
            ValidationError::UnsupportedType { .. } => "UnsupportedType",
            ValidationError::LengthMismatch { .. } => "LengthMismatch",
            ValidationError::ContentMismatch { .. } => "ContentMismatch",
            ValidationError::InvalidFolder(_) => "InvalidFolder",
        }
    }
}

/// A request that passed validation.
#[derive(Debug)]
pub struct Validated<'a> {
    pub file: &'a IncomingFile,
    /// Normalized media type.
    pub media_type: String,
    pub folder: Option<String>,
}

/// Admission rules for incoming files.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub max_size: u64,
    /// Normalized accepted media types.
    pub accepted_types: Vec<String>,
    pub verify_content: bool,
    pub default_folder: Option<String>,
}

impl UploadPolicy {
    pub fn from_config(config: &UploadConfig) -> Self {
        Self {
            max_size: config.max_size,
            accepted_types: config
                .accepted_types
                .iter()
                .map(|t| normalize_media_type(t))
                .collect(),
            verify_content: config.verify_content,
            default_folder: config.default_folder.clone(),
        }
    }

    /// Check a request against the policy. Rules run in a fixed order and the
    /// first failure wins. Touches nothing outside its arguments.
    pub fn validate<'a>(&self, request: &'a UploadRequest) -> Result<Validated<'a>, ValidationError> {
        let file = request.file.as_ref().ok_or(ValidationError::MissingFile)?;

        let received = file.body.len();
        let size = file.declared_len.max(received);
        if size > self.max_size {
            return Err(ValidationError::TooLarge {
                size,
                limit: self.max_size,
            });
        }

        let media_type = file
            .content_type
            .as_deref()
            .map(normalize_media_type)
            .unwrap_or_default();
        if !self.accepted_types.contains(&media_type) {
            return Err(ValidationError::UnsupportedType { media_type });
        }

        if file.declared_len != received {
            return Err(ValidationError::LengthMismatch {
                declared: file.declared_len,
                received,
            });
        }

        if self.verify_content {
            let detected = probe::sniff(file.body.head());
            if detected.is_none() || detected != probe::format_for_media_type(&media_type) {
                return Err(ValidationError::ContentMismatch {
                    declared: media_type,
                    detected: detected
                        .map(probe::format_tag)
                        .unwrap_or("unknown")
                        .to_string(),
                });
            }
        }

        let hint = request
            .folder
            .as_deref()
            .filter(|folder| !folder.trim().is_empty());
        let folder = storage::folder::normalize(hint.or(self.default_folder.as_deref()))
            .map_err(|e| ValidationError::InvalidFolder(e.to_string()))?;

        Ok(Validated {
            file,
            media_type,
            folder,
        })
    }
}

/// Lowercase, strip parameters, fold `image/jpg` into `image/jpeg`.
pub fn normalize_media_type(raw: &str) -> String {
    let essence = raw
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "image/jpg" | "image/pjpeg" => "image/jpeg".to_string(),
        _ => essence,
    }
}
