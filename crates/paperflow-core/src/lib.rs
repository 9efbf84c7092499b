//! Core types for the Paperflow intake pipeline.
//!
//! This crate holds the domain models (upload jobs, document records,
//! invoices), the unified error type, configuration, upload validation,
//! and the record linker. It has no HTTP or database connectivity of its
//! own; the `sqlx` feature only adds row mappings for the repository crate.

pub mod config;
pub mod constants;
pub mod error;
pub mod linker;
pub mod models;
pub mod validation;

pub use config::{Config, StorageBackend};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use linker::{link_document, LinkResult};
pub use validation::{UploadValidator, ValidationError};
