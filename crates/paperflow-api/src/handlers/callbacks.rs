//! Engine completion callback.
//!
//! The extraction workflow posts its result here: invoice fields keyed by
//! `doc_num`. The invoice is upserted, then the linker tries to associate a
//! recently stored document with it. No match is a valid quiet outcome.

use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, response::Json};
use chrono::NaiveDate;
use paperflow_core::link_document;
use paperflow_core::models::InvoiceUpsert;
use paperflow_db::{DocumentStore, InvoiceStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// How many recent documents the linker considers per callback.
const LINK_SCAN_LIMIT: i64 = 25;

#[derive(Debug, Deserialize, ToSchema)]
pub struct InvoiceCallbackRequest {
    pub doc_num: String,
    pub customer_name: Option<String>,
    pub total_amount: Option<f64>,
    pub doc_date: Option<NaiveDate>,
    pub status: Option<String>,
    #[serde(alias = "uploader_username")]
    pub username: Option<String>,
}

impl From<InvoiceCallbackRequest> for InvoiceUpsert {
    fn from(request: InvoiceCallbackRequest) -> Self {
        InvoiceUpsert {
            doc_num: request.doc_num,
            customer_name: request.customer_name,
            total_amount: request.total_amount,
            doc_date: request.doc_date,
            status: request.status,
            username: request.username,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InvoiceCallbackResponse {
    pub doc_num: String,
    pub invoice_id: Uuid,
    pub linked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<Uuid>,
}

/// Upsert an invoice from the engine and attempt document linking.
#[utoipa::path(
    post,
    path = "/api/v0/callbacks/invoice",
    tag = "callbacks",
    request_body = InvoiceCallbackRequest,
    responses(
        (status = 200, description = "Invoice stored; linked reports the association outcome", body = InvoiceCallbackResponse),
        (status = 400, description = "Malformed payload", body = crate::error::ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(doc_num = %request.doc_num))]
pub async fn invoice_callback(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<InvoiceCallbackRequest>,
) -> Result<Json<InvoiceCallbackResponse>, HttpAppError> {
    let payload = InvoiceUpsert::from(request);
    let invoice = state.invoices.upsert(&payload).await?;
    tracing::info!(invoice_id = %invoice.id, "Invoice upserted from engine callback");

    let mut linked = invoice.is_linked();
    let mut document_id = None;

    if !linked {
        let documents = state.documents.list(LINK_SCAN_LIMIT, 0).await?;
        let candidates = [invoice.clone()];
        for document in &documents {
            let Some(result) = link_document(document, &candidates) else {
                continue;
            };
            let attached = state
                .invoices
                .attach_document(&result.doc_num, &document.storage_url, &document.filename)
                .await?;
            if attached.is_some() {
                tracing::info!(
                    invoice_id = %invoice.id,
                    document_id = %result.document_id,
                    "Invoice linked to document"
                );
                linked = true;
                document_id = Some(result.document_id);
            }
            break;
        }
    }

    Ok(Json(InvoiceCallbackResponse {
        doc_num: invoice.doc_num,
        invoice_id: invoice.id,
        linked,
        document_id,
    }))
}
