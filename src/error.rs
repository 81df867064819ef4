use thiserror::Error;
use uuid::Uuid;

/// Application error type
///
/// One variant per concern; the HTTP layer and the job manager decide what
/// each concern means for the caller.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed caller input (bad start_job payload, bad parameter bag)
    #[error("invalid input: {0}")]
    Input(#[from] InputValidationError),
    /// Document retrieval failure
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),
    /// LLM reasoning collaborator failure
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
    /// A stage produced output that breaks its structural contract
    #[error("shape violation in {stage}: {detail}")]
    Shape { stage: &'static str, detail: String },
    /// Payment gateway failure
    #[error("payment error: {0}")]
    Payment(#[from] PaymentError),
    /// Job store failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    /// Configuration error
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    /// Unknown job id
    #[error("job {job_id} not found")]
    JobNotFound { job_id: String },
}

/// Malformed caller input
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InputValidationError {
    #[error("input_data is empty")]
    EmptyInput,
    #[error("identifier_from_purchaser is empty")]
    EmptyPurchaserIdentifier,
    #[error("missing required field `{field}`")]
    MissingField { field: String },
    #[error("field `{field}` is invalid: {reason}")]
    InvalidField { field: String, reason: String },
    #[error("duplicate evidence document id `{doc_id}`")]
    DuplicateDocId { doc_id: String },
}

/// Document retrieval failure
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("empty source locator")]
    EmptySource,
    #[error("source {source_url} is unreachable: {reason}")]
    Unreachable { source_url: String, reason: String },
    #[error("source {source_url} answered HTTP {status}")]
    BadStatus { source_url: String, status: u16 },
    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: String, reason: String },
    #[error("source {source_url} is not valid UTF-8 text")]
    Decode { source_url: String },
}

/// LLM reasoning collaborator failure
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM API call failed (model: {model}): {reason}")]
    ApiCallFailed { model: String, reason: String },
    #[error("LLM returned empty content (model: {model})")]
    EmptyContent { model: String },
    #[error("LLM output is not valid JSON: {reason}")]
    InvalidJson { reason: String },
}

/// Payment gateway failure
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment service request to {endpoint} failed: {reason}")]
    RequestFailed { endpoint: String, reason: String },
    #[error("payment service rejected {endpoint} (HTTP {status}): {body}")]
    Rejected { endpoint: String, status: u16, body: String },
    #[error("payment service response from {endpoint} is missing `{field}`")]
    MalformedResponse { endpoint: String, field: String },
    #[error("no payment found for {blockchain_identifier}")]
    UnknownPayment { blockchain_identifier: String },
}

/// Job store failure
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job {0} already exists")]
    DuplicateJob(Uuid),
    #[error("job {0} not found")]
    MissingJob(Uuid),
    #[error("job store lock poisoned")]
    LockPoisoned,
}

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required setting {var_name} is not set")]
    Missing { var_name: String },
    #[error("failed to read parameter file {path}: {reason}")]
    BagFile { path: String, reason: String },
}

// ========== Conversions from common error types ==========

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Llm(LlmError::InvalidJson {
            reason: err.to_string(),
        })
    }
}

// ========== Convenience constructors ==========

impl AppError {
    /// Shape violation raised by a stage contract check
    pub fn shape(stage: &'static str, detail: impl Into<String>) -> Self {
        AppError::Shape {
            stage,
            detail: detail.into(),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        AppError::Input(InputValidationError::MissingField {
            field: field.into(),
        })
    }

    pub fn job_not_found(job_id: impl Into<String>) -> Self {
        AppError::JobNotFound {
            job_id: job_id.into(),
        }
    }

    pub fn llm_api_failed(model: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        AppError::Llm(LlmError::ApiCallFailed {
            model: model.into(),
            reason: reason.to_string(),
        })
    }
}

// ========== Result alias ==========

/// Application result type
pub type AppResult<T> = Result<T, AppError>;
