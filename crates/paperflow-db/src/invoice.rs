//! Invoice repository: callback upsert and document linking.

use async_trait::async_trait;
use paperflow_core::models::{Invoice, InvoiceUpsert};
use paperflow_core::AppError;
use sqlx::{PgPool, Postgres};

const INVOICE_COLUMNS: &str = "id, doc_num, customer_name, total_amount, doc_date, status, \
     uploader_username, document_url, document_filename, created_at, updated_at";

/// Persistence seam for invoices, mirroring [`crate::DocumentStore`].
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Upsert by document number: create the invoice if absent, otherwise
    /// update only the fields the payload carries.
    async fn upsert(&self, payload: &InvoiceUpsert) -> Result<Invoice, AppError>;

    /// Record the linker's association on the invoice. Returns None when no
    /// invoice with that document number exists anymore.
    async fn attach_document(
        &self,
        doc_num: &str,
        document_url: &str,
        document_filename: &str,
    ) -> Result<Option<Invoice>, AppError>;
}

/// Repository for the invoices table.
#[derive(Clone)]
pub struct InvoiceRepository {
    pool: PgPool,
}

impl InvoiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InvoiceStore for InvoiceRepository {
    #[tracing::instrument(skip(self, payload), fields(db.table = "invoices", doc_num = %payload.doc_num))]
    async fn upsert(&self, payload: &InvoiceUpsert) -> Result<Invoice, AppError> {
        let row = sqlx::query_as::<Postgres, Invoice>(&format!(
            r#"
            INSERT INTO invoices (doc_num, customer_name, total_amount, doc_date, status, uploader_username)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (doc_num) DO UPDATE SET
                customer_name = COALESCE(EXCLUDED.customer_name, invoices.customer_name),
                total_amount = COALESCE(EXCLUDED.total_amount, invoices.total_amount),
                doc_date = COALESCE(EXCLUDED.doc_date, invoices.doc_date),
                status = COALESCE(EXCLUDED.status, invoices.status),
                uploader_username = COALESCE(EXCLUDED.uploader_username, invoices.uploader_username),
                updated_at = NOW()
            RETURNING {}
            "#,
            INVOICE_COLUMNS
        ))
        .bind(&payload.doc_num)
        .bind(&payload.customer_name)
        .bind(payload.total_amount)
        .bind(payload.doc_date)
        .bind(&payload.status)
        .bind(&payload.username)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "invoices", doc_num = %doc_num))]
    async fn attach_document(
        &self,
        doc_num: &str,
        document_url: &str,
        document_filename: &str,
    ) -> Result<Option<Invoice>, AppError> {
        let row = sqlx::query_as::<Postgres, Invoice>(&format!(
            r#"
            UPDATE invoices
            SET document_url = $2, document_filename = $3, updated_at = NOW()
            WHERE doc_num = $1
            RETURNING {}
            "#,
            INVOICE_COLUMNS
        ))
        .bind(doc_num)
        .bind(document_url)
        .bind(document_filename)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}
