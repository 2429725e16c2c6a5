use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use axum::body::Bytes;
use storage::BoxReader;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

/// Leading bytes kept in memory for content sniffing.
pub const SNIFF_LEN: usize = 512;

/// Where and when upload bodies leave memory.
#[derive(Debug, Clone)]
pub struct SpoolSettings {
    /// Bytes beyond this are counted but not kept.
    pub max_size: u64,
    /// Spill to disk once the body grows past this. `None` keeps it in memory.
    pub threshold: Option<u64>,
    pub dir: PathBuf,
}

/// A spooled temp file, removed exactly once.
///
/// [`TempUpload::release`] removes it asynchronously; if the owner is dropped
/// first (cancelled request) the drop guard removes it instead.
#[derive(Debug)]
pub struct TempUpload {
    path: PathBuf,
    released: bool,
}

impl TempUpload {
    async fn create(dir: &Path) -> io::Result<(Self, fs::File)> {
        let path = dir.join(format!("relay-upload-{}", Uuid::new_v4()));
        let file = fs::File::create(&path).await?;
        Ok((
            Self {
                path,
                released: false,
            },
            file,
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn release(mut self) {
        self.released = true;
        if let Err(e) = fs::remove_file(&self.path).await {
            warn!(path = %self.path.display(), "Failed to remove spooled upload: {}", e);
        }
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        if !self.released {
            // Best effort.
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Body of an uploaded file, held in memory or on disk.
#[derive(Debug)]
pub enum UploadBody {
    Memory(Bytes),
    Spooled {
        file: TempUpload,
        len: u64,
        head: Bytes,
    },
}

impl UploadBody {
    pub fn len(&self) -> u64 {
        match self {
            UploadBody::Memory(bytes) => bytes.len() as u64,
            UploadBody::Spooled { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Up to [`SNIFF_LEN`] leading bytes.
    pub fn head(&self) -> &[u8] {
        match self {
            UploadBody::Memory(bytes) => &bytes[..bytes.len().min(SNIFF_LEN)],
            UploadBody::Spooled { head, .. } => head,
        }
    }

    /// Open a fresh reader over the whole body.
    pub async fn reader(&self) -> io::Result<BoxReader> {
        match self {
            UploadBody::Memory(bytes) => Ok(Box::new(Cursor::new(bytes.clone()))),
            UploadBody::Spooled { file, .. } => Ok(Box::new(fs::File::open(file.path()).await?)),
        }
    }

    /// Free the temp file, if any.
    pub async fn release(self) {
        if let UploadBody::Spooled { file, .. } = self {
            file.release().await;
        }
    }
}

/// Accumulates a streamed body, spilling to disk past the threshold.
///
/// Every byte is counted, but nothing past `max_size` is kept: the caller
/// still learns the true length of an oversized body without buffering it.
pub struct Spooler {
    settings: SpoolSettings,
    received: u64,
    memory: Vec<u8>,
    head: Vec<u8>,
    disk: Option<(TempUpload, fs::File)>,
    kept: u64,
}

impl Spooler {
    pub fn new(settings: SpoolSettings) -> Self {
        Self {
            settings,
            received: 0,
            memory: Vec::new(),
            head: Vec::new(),
            disk: None,
            kept: 0,
        }
    }

    /// Total bytes seen, including discarded ones.
    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn overflowed(&self) -> bool {
        self.received > self.settings.max_size
    }

    pub async fn push(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.received += chunk.len() as u64;
        if self.overflowed() {
            return Ok(());
        }

        if self.head.len() < SNIFF_LEN {
            let take = (SNIFF_LEN - self.head.len()).min(chunk.len());
            self.head.extend_from_slice(&chunk[..take]);
        }
        self.kept += chunk.len() as u64;

        if let Some((_, file)) = &mut self.disk {
            return file.write_all(chunk).await;
        }

        self.memory.extend_from_slice(chunk);
        if let Some(threshold) = self.settings.threshold
            && self.kept > threshold
        {
            let (temp, mut file) = TempUpload::create(&self.settings.dir).await?;
            debug!(path = %temp.path().display(), bytes = self.kept, "Spooling upload to disk");
            file.write_all(&self.memory).await?;
            self.memory = Vec::new();
            self.disk = Some((temp, file));
        }
        Ok(())
    }

    pub async fn finish(self) -> io::Result<UploadBody> {
        match self.disk {
            Some((temp, mut file)) => {
                file.flush().await?;
                drop(file);
                Ok(UploadBody::Spooled {
                    file: temp,
                    len: self.kept,
                    head: Bytes::from(self.head),
                })
            }
            None => Ok(UploadBody::Memory(Bytes::from(self.memory))),
        }
    }
}
