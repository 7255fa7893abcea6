//! OpenAPI specification endpoints

use actix_web::{HttpResponse, Responder, get};
use utoipa::OpenApi;

use crate::api::error::ErrorResponse;
use crate::api::health::HealthStatus;
use crate::api::verification::VerificationResponse;
use crate::model::report::{DocumentSummary, SignatureSection, StampSection};
use crate::model::{
    ApplicantClaim, ArtifactSignal, BoundingBox, CheckResult, DocumentType, ErrorCode, ExtractedFields,
    MediaKind, NormalizedFields, ReconciliationCheck, Report, RuleName, SignatureHit, Tristate,
    VerdictError,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Loan Deferment Document Verification",
        description = "Verifies supporting documents for loan deferment requests"
    ),
    paths(
        crate::api::verification::create_verification,
        crate::api::health::liveness,
    ),
    components(schemas(
        VerificationResponse,
        ErrorResponse,
        HealthStatus,
        Report,
        DocumentSummary,
        SignatureSection,
        StampSection,
        ApplicantClaim,
        DocumentType,
        MediaKind,
        ExtractedFields,
        NormalizedFields,
        SignatureHit,
        BoundingBox,
        ArtifactSignal,
        Tristate,
        ReconciliationCheck,
        RuleName,
        CheckResult,
        ErrorCode,
        VerdictError,
    )),
    tags(
        (name = "verifications", description = "Document verification"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

/// Serve OpenAPI JSON specification
#[get("/openapi.json")]
pub async fn openapi_json() -> impl Responder {
    HttpResponse::Ok().json(ApiDoc::openapi())
}

/// Serve OpenAPI YAML specification
#[get("/openapi.yaml")]
pub async fn openapi_yaml() -> impl Responder {
    match ApiDoc::openapi().to_yaml() {
        Ok(yaml) => HttpResponse::Ok().content_type("text/yaml").body(yaml),
        Err(e) => {
            tracing::error!(error = %e, "Failed to render OpenAPI YAML");
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// Configure OpenAPI routes
pub fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.service(openapi_json).service(openapi_yaml);
}
