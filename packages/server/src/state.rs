use std::sync::Arc;

use storage::BlobStore;

use crate::config::AppConfig;
use crate::ingest::{IngestionPipeline, SpoolSettings, UploadPolicy};
use crate::repository::UploadRepository;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub pipeline: Arc<IngestionPipeline>,
    pub uploads: Arc<dyn UploadRepository>,
    pub spool: SpoolSettings,
}

impl AppState {
    /// Wire the pipeline around injected storage and repository handles.
    pub fn new(
        config: AppConfig,
        blob_store: Arc<dyn BlobStore>,
        uploads: Arc<dyn UploadRepository>,
    ) -> Self {
        let pipeline = IngestionPipeline::new(
            UploadPolicy::from_config(&config.upload),
            blob_store,
            uploads.clone(),
        )
        .with_mirror_metadata(config.upload.mirror_metadata);

        let spool = SpoolSettings {
            max_size: config.upload.max_size,
            threshold: config.upload.spool_threshold,
            dir: config.upload.spool_dir.clone(),
        };

        Self {
            config,
            pipeline: Arc::new(pipeline),
            uploads,
            spool,
        }
    }
}
