//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use crate::services::ingest;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Paperflow API",
        version = "0.1.0",
        description = "Invoice document intake pipeline: multipart ingestion, automation engine dispatch, execution progress tracking, and invoice linking. All endpoints are versioned under /api/v0/."
    ),
    paths(
        handlers::documents::upload_documents,
        handlers::documents::list_documents,
        handlers::jobs::list_jobs,
        handlers::jobs::get_job,
        handlers::jobs::delete_job,
        handlers::executions::get_execution,
        handlers::callbacks::invoice_callback,
    ),
    components(schemas(
        ingest::FileUploadResult,
        handlers::documents::UploadBatchResponse,
        handlers::documents::DocumentResponse,
        handlers::jobs::JobResponse,
        handlers::executions::ExecutionResponse,
        handlers::callbacks::InvoiceCallbackRequest,
        handlers::callbacks::InvoiceCallbackResponse,
        error::ErrorResponse,
    )),
    tags(
        (name = "documents", description = "Document ingestion and listing"),
        (name = "jobs", description = "Upload job progress"),
        (name = "executions", description = "Engine execution status proxy"),
        (name = "callbacks", description = "Engine completion callbacks")
    )
)]
struct ApiDoc;
