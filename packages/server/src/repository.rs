use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, DbErr, EntityTrait, QueryOrder, QuerySelect, Set};
use storage::AssetMetadata;
use thiserror::Error;

use crate::entity::upload_record;

/// Largest page `list` will return.
pub const MAX_PER_PAGE: u64 = 200;
pub const DEFAULT_PER_PAGE: u64 = 50;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] DbErr),
    #[error("record {0} vanished after upsert")]
    MissingAfterUpsert(String),
}

/// Stored pointer to an uploaded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRecord {
    pub identifier: String,
    pub url: String,
    pub metadata: Option<AssetMetadata>,
    pub original_name: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

/// Everything an upsert writes besides the key.
#[derive(Debug, Clone, Default)]
pub struct UploadFields {
    pub url: String,
    pub metadata: Option<AssetMetadata>,
    pub original_name: Option<String>,
}

/// One page of a newest-first listing. Pages start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u64,
    pub per_page: u64,
}

impl Page {
    /// Clamp raw query values into a valid page.
    pub fn new(page: Option<u64>, per_page: Option<u64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page
                .unwrap_or(DEFAULT_PER_PAGE)
                .clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[async_trait]
pub trait UploadRepository: Send + Sync {
    /// Create or update the record keyed by `identifier`, refreshing its timestamp.
    async fn upsert(
        &self,
        identifier: &str,
        fields: UploadFields,
    ) -> Result<UploadRecord, RepositoryError>;

    /// Records ordered by upload timestamp, newest first.
    async fn list(&self, page: Page) -> Result<Vec<UploadRecord>, RepositoryError>;
}

pub struct SeaOrmUploadRepository {
    db: DatabaseConnection,
}

impl SeaOrmUploadRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UploadRepository for SeaOrmUploadRepository {
    async fn upsert(
        &self,
        identifier: &str,
        fields: UploadFields,
    ) -> Result<UploadRecord, RepositoryError> {
        let meta = fields.metadata.as_ref();
        let model = upload_record::ActiveModel {
            identifier: Set(identifier.to_string()),
            url: Set(fields.url),
            format: Set(meta.map(|m| m.format.clone())),
            bytes: Set(meta.map(|m| i64::try_from(m.bytes).unwrap_or(i64::MAX))),
            width: Set(meta.map(|m| i32::try_from(m.width).unwrap_or(i32::MAX))),
            height: Set(meta.map(|m| i32::try_from(m.height).unwrap_or(i32::MAX))),
            original_name: Set(fields.original_name),
            uploaded_at: Set(Utc::now()),
        };

        upload_record::Entity::insert(model)
            .on_conflict(
                OnConflict::column(upload_record::Column::Identifier)
                    .update_columns([
                        upload_record::Column::Url,
                        upload_record::Column::Format,
                        upload_record::Column::Bytes,
                        upload_record::Column::Width,
                        upload_record::Column::Height,
                        upload_record::Column::OriginalName,
                        upload_record::Column::UploadedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        let saved = upload_record::Entity::find_by_id(identifier.to_string())
            .one(&self.db)
            .await?
            .ok_or_else(|| RepositoryError::MissingAfterUpsert(identifier.to_string()))?;

        Ok(saved.into())
    }

    async fn list(&self, page: Page) -> Result<Vec<UploadRecord>, RepositoryError> {
        let models = upload_record::Entity::find()
            .order_by_desc(upload_record::Column::UploadedAt)
            .order_by_asc(upload_record::Column::Identifier)
            .offset(Some(page.offset()))
            .limit(Some(page.per_page))
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(UploadRecord::from).collect())
    }
}

impl From<upload_record::Model> for UploadRecord {
    fn from(m: upload_record::Model) -> Self {
        let metadata = match (m.format, m.bytes, m.width, m.height) {
            (Some(format), Some(bytes), Some(width), Some(height)) => Some(AssetMetadata {
                format,
                bytes: u64::try_from(bytes).unwrap_or(0),
                width: u32::try_from(width).unwrap_or(0),
                height: u32::try_from(height).unwrap_or(0),
            }),
            _ => None,
        };

        Self {
            identifier: m.identifier,
            url: m.url,
            metadata,
            original_name: m.original_name,
            uploaded_at: m.uploaded_at,
        }
    }
}
