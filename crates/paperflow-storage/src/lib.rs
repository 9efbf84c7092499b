//! Paperflow Storage Library
//!
//! Storage abstraction and backends for uploaded documents. The Storage
//! trait plus S3 and local filesystem implementations.
//!
//! # Storage key format
//!
//! Every document is stored under `uploads/{timestamp}-{filename}` where the
//! timestamp is upload-time milliseconds and the filename has whitespace runs
//! collapsed to underscores. The prefix makes keys collision resistant without
//! renaming collisions away from the original filename. Keys must not contain
//! `..` or a leading `/`. Key generation is centralized in the `keys` module
//! so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

pub use factory::create_storage;
pub use keys::{normalize_filename, storage_key, stored_filename, stored_filename_now};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use paperflow_core::StorageBackend;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
