use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Pointer to an image held by the blob store.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "upload_record")]
pub struct Model {
    /// Identifier assigned by the blob store.
    #[sea_orm(primary_key, auto_increment = false)]
    pub identifier: String,

    pub url: String,

    /// Mirrored technical metadata; all four are null when mirroring is off.
    pub format: Option<String>,
    pub bytes: Option<i64>,
    pub width: Option<i32>,
    pub height: Option<i32>,

    /// Sanitized client-side file name.
    pub original_name: Option<String>,

    /// Refreshed on every upsert.
    pub uploaded_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
