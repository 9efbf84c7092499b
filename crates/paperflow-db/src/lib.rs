//! Paperflow database layer
//!
//! sqlx/Postgres repositories for documents and invoices, behind store
//! traits so services can be exercised without a live database. Queries
//! are plain `query_as` over the shared pool; row mapping lives on the
//! core models.

pub mod document;
pub mod invoice;

pub use document::{DocumentRepository, DocumentStore};
pub use invoice::{InvoiceRepository, InvoiceStore};
