//! Skintegrity Storage Library
//!
//! Object storage for uploaded videos: the [`Storage`] trait plus S3 and local
//! filesystem backends.
//!
//! # Storage key format
//!
//! Every submission gets its own key, `{prefix}/{uuid}.{ext}` (prefix defaults to
//! `skintegrityvideos`), so concurrent uploads of same-named files never
//! collide. Keys must not contain `..` or a leading `/`.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::{generate_video_key, video_extension};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use skintegrity_core::StorageBackend;
pub use traits::{Storage, StorageError, StorageResult};
