use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Invoice row keyed by its document number. Only the linker and the engine
/// completion callback mutate these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub doc_num: String,
    pub customer_name: Option<String>,
    pub total_amount: Option<f64>,
    pub doc_date: Option<NaiveDate>,
    pub status: Option<String>,
    pub uploader_username: Option<String>,
    pub document_url: Option<String>,
    pub document_filename: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(feature = "sqlx")]
impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for Invoice {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Invoice {
            id: row.get("id"),
            doc_num: row.get("doc_num"),
            customer_name: row.get("customer_name"),
            total_amount: row.get("total_amount"),
            doc_date: row.get("doc_date"),
            status: row.get("status"),
            uploader_username: row.get("uploader_username"),
            document_url: row.get("document_url"),
            document_filename: row.get("document_filename"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

impl Invoice {
    pub fn is_linked(&self) -> bool {
        self.document_url.is_some() || self.document_filename.is_some()
    }
}

/// Upsert payload delivered by the engine completion callback.
/// `doc_num` is the natural key; everything else is optional and only
/// overwrites when present.
#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceUpsert {
    pub doc_num: String,
    pub customer_name: Option<String>,
    pub total_amount: Option<f64>,
    pub doc_date: Option<NaiveDate>,
    pub status: Option<String>,
    #[serde(alias = "uploader_username")]
    pub username: Option<String>,
}
