pub mod document;
pub mod invoice;
pub mod job;

pub use document::{DocumentRecord, NewDocument};
pub use invoice::{Invoice, InvoiceUpsert};
pub use job::{FailureCause, JobStatus, UploadJob};
