use std::fmt;

/// Errors that can occur while handing a blob to a storage provider.
#[derive(Debug)]
pub enum StorageError {
    /// The payload is not an image the backend can describe.
    Malformed(String),
    /// The folder hint cannot be used as a key prefix.
    InvalidFolder(String),
    /// The provider answered, but refused the upload.
    Rejected { status: u16, message: String },
    /// The provider could not be reached, or the exchange broke off.
    Transport(String),
    /// The backend is misconfigured (credentials, region, endpoint).
    Config(String),
    /// An I/O error occurred.
    Io(std::io::Error),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(msg) => write!(f, "malformed image payload: {msg}"),
            Self::InvalidFolder(msg) => write!(f, "invalid folder: {msg}"),
            Self::Rejected { status, message } => {
                write!(f, "provider rejected upload ({status}): {message}")
            }
            Self::Transport(msg) => write!(f, "storage transport error: {msg}"),
            Self::Config(msg) => write!(f, "storage misconfigured: {msg}"),
            Self::Io(err) => write!(f, "storage IO error: {err}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

#[cfg(feature = "object-storage")]
impl From<s3::error::S3Error> for StorageError {
    fn from(err: s3::error::S3Error) -> Self {
        match err {
            s3::error::S3Error::HttpFailWithBody(status, message) => Self::Rejected { status, message },
            other => Self::Transport(other.to_string()),
        }
    }
}

#[cfg(feature = "cloudinary")]
impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::Rejected {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => Self::Transport(err.to_string()),
        }
    }
}
