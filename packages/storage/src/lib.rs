mod asset;
mod error;
mod hash;
mod reader;
mod traits;

pub mod folder;
pub mod local;
pub mod probe;

#[cfg(feature = "cloudinary")]
pub mod cloudinary;
#[cfg(feature = "object-storage")]
pub mod s3;

pub use asset::{AssetMetadata, StoredAsset};
pub use error::StorageError;
pub use hash::ContentHash;
pub use reader::{CountingReader, split_image_header};
pub use traits::{BlobStore, BoxReader, StoreOptions};
