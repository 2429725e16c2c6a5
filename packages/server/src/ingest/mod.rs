//! Upload ingestion: validate, store the blob, persist its record.

pub mod pipeline;
pub mod spool;
pub mod validator;

pub use pipeline::{IngestError, IngestionPipeline, Stage, UploadReceipt};
pub use spool::{SpoolSettings, Spooler, TempUpload, UploadBody};
pub use validator::{UploadPolicy, Validated, ValidationError};

/// A file part received from the client.
#[derive(Debug)]
pub struct IncomingFile {
    pub body: UploadBody,
    /// Media type declared by the client.
    pub content_type: Option<String>,
    pub file_name: Option<String>,
    /// Length announced by the client, or the count of bytes received.
    pub declared_len: u64,
}

/// One upload attempt, owned by the pipeline until it finishes.
#[derive(Debug, Default)]
pub struct UploadRequest {
    pub file: Option<IncomingFile>,
    /// Optional folder hint.
    pub folder: Option<String>,
}

impl UploadRequest {
    /// Release temporary resources held by the request.
    pub async fn release(self) {
        if let Some(file) = self.file {
            file.body.release().await;
        }
    }
}
