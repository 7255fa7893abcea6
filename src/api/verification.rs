//! REST API endpoint for document verification

use actix_web::http::header::CONTENT_TYPE;
use actix_web::{HttpRequest, HttpResponse, post, web};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use utoipa::{IntoParams, ToSchema};

use crate::api::error::{ApiError, ErrorResponse};
use crate::app::AppState;
use crate::model::{ApplicantClaim, DocumentType, Report};
use crate::service::VerificationRequest;

/// Largest accepted document body
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Query parameters describing the applicant's claim
#[derive(Debug, Deserialize, IntoParams)]
pub struct VerificationParams {
    /// Applicant full name as entered in the request form
    pub applicant_name: String,
    /// Declared document type (sick_leave, order, certificate)
    pub document_type: DocumentType,
    /// Original file name of the uploaded document
    pub file_name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VerificationResponse {
    /// Object store key of the persisted report
    pub report_key: String,
    pub report: Report,
}

/// Verify one supporting document against the applicant's claim
///
/// The request body is the raw document (PDF, JPEG or PNG) with its
/// `Content-Type`. Business-rule failures are part of a 200 response; only
/// run-level failures produce an error status.
#[utoipa::path(
    post,
    path = "/v1/verifications",
    params(VerificationParams),
    request_body(content = Vec<u8>, description = "Raw document bytes", content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "Verification completed", body = VerificationResponse),
        (status = 400, description = "Invalid request or unsupported media", body = ErrorResponse),
        (status = 502, description = "OCR or language model failure", body = ErrorResponse),
        (status = 503, description = "Run cancelled", body = ErrorResponse),
        (status = 504, description = "Run exceeded its deadline", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    tag = "verifications"
)]
#[post("/v1/verifications")]
pub async fn create_verification(
    state: web::Data<AppState>,
    query: web::Query<VerificationParams>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let params = query.into_inner();

    if params.applicant_name.trim().is_empty() {
        return Err(ApiError::BadRequest("applicant_name must not be empty".to_string()));
    }
    if params.file_name.trim().is_empty() {
        return Err(ApiError::BadRequest("file_name must not be empty".to_string()));
    }
    if body.is_empty() {
        return Err(ApiError::BadRequest("request body is empty".to_string()));
    }

    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    tracing::info!(
        file_name = %params.file_name,
        content_type = %content_type,
        document_type = %params.document_type,
        bytes = body.len(),
        "Received verification request"
    );

    let request = VerificationRequest {
        claim: ApplicantClaim {
            full_name: params.applicant_name,
            document_type: params.document_type,
        },
        file_name: params.file_name,
        content_type,
        content: body.to_vec(),
    };

    // Dropping the handler (client gone) cancels the run as well
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let outcome = match tokio::time::timeout(state.run_timeout, state.pipeline.run(request, &cancel)).await {
        Ok(result) => result?,
        Err(_) => {
            cancel.cancel();
            return Err(ApiError::Timeout(state.run_timeout.as_secs()));
        }
    };

    Ok(HttpResponse::Ok().json(VerificationResponse {
        report_key: outcome.report_key,
        report: outcome.report,
    }))
}

/// Configure verification routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::PayloadConfig::new(MAX_UPLOAD_BYTES))
        .app_data(
            web::QueryConfig::default()
                .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into()),
        )
        .service(create_verification);
}
