//! Route handlers

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use tracing::{info, warn};

use crate::api::error::{ApiError, START_JOB_INVALID};
use crate::api::types::{
    ApiContext, AvailabilityResponse, HealthResponse, InputField, InputSchemaResponse,
    StartJobRequest, StartJobResponse, StatusQuery, StatusResponse,
};

/// `POST /start_job` - open a payment hold for a new audit job
pub async fn start_job(
    State(ctx): State<ApiContext>,
    payload: Result<Json<StartJobRequest>, JsonRejection>,
) -> Result<Json<StartJobResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| {
        warn!("⚠️ Rejected start_job body: {}", e);
        ApiError::BadRequest(START_JOB_INVALID.to_string())
    })?;

    info!(
        "Received job request, standard: {}, evidence: {}",
        request.input_data.get("standard_url").map_or("-", String::as_str),
        request.input_data.get("source_url").map_or("-", String::as_str)
    );

    let started = ctx
        .manager
        .start_job(&request.identifier_from_purchaser, request.input_data)
        .await?;

    Ok(Json(StartJobResponse::new(started, &ctx.config)))
}

/// `GET /status?job_id=...` - job state, refreshing payment state while it waits
pub async fn status(
    State(ctx): State<ApiContext>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<StatusResponse>, ApiError> {
    let job_id = query
        .job_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("job_id query parameter is required".to_string()))?;

    let job = ctx.manager.job_status(&job_id).await?;
    Ok(Json(job.into()))
}

/// `GET /availability`
pub async fn availability() -> Json<AvailabilityResponse> {
    Json(AvailabilityResponse {
        status: "available",
        agent_type: "audit-sense",
        message: "Server operational.",
    })
}

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

/// `GET /input_schema` - the four fields the HTTP bag recognizes
pub async fn input_schema() -> Json<InputSchemaResponse> {
    Json(InputSchemaResponse {
        input_data: vec![
            InputField::string(
                "standard_url",
                "Compliance Standard URL",
                "URL containing a compliance standard (ISO, SOC2, PCI, GDPR, RBI...)",
                "https://example.com/iso27001.txt",
            ),
            InputField::string(
                "source_url",
                "Evidence Document URL",
                "URL of the policy/procedure document to evaluate",
                "https://example.com/policy.txt",
            ),
            InputField::string(
                "doc_id",
                "Evidence Document ID",
                "Logical name for the evidence document",
                "policy_doc",
            ),
            InputField::string(
                "scope",
                "Audit Scope",
                "Scope of the audit (e.g., IT Security, HR Controls, Finance)",
                "IT Security",
            ),
        ],
    })
}
