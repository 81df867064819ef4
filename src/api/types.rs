//! Shared types for the HTTP layer: router state and wire DTOs

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clients::Amount;
use crate::config::Config;
use crate::models::{AuditReport, Job, JobStatus};
use crate::orchestrator::{JobManager, StartedJob};

// ========== Router state ==========

/// Shared context for every route
#[derive(Clone)]
pub struct ApiContext {
    pub manager: Arc<JobManager>,
    pub config: Arc<Config>,
}

impl ApiContext {
    pub fn new(manager: Arc<JobManager>, config: Arc<Config>) -> Self {
        Self { manager, config }
    }
}

// ========== POST /start_job ==========

#[derive(Debug, Deserialize)]
pub struct StartJobRequest {
    pub identifier_from_purchaser: String,
    pub input_data: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct StartJobResponse {
    pub status: &'static str,
    pub job_id: String,
    #[serde(rename = "blockchainIdentifier")]
    pub blockchain_identifier: String,
    #[serde(rename = "submitResultTime")]
    pub submit_result_time: String,
    #[serde(rename = "unlockTime")]
    pub unlock_time: String,
    #[serde(rename = "externalDisputeUnlockTime")]
    pub external_dispute_unlock_time: String,
    #[serde(rename = "agentIdentifier")]
    pub agent_identifier: String,
    #[serde(rename = "sellerVKey")]
    pub seller_vkey: String,
    #[serde(rename = "identifierFromPurchaser")]
    pub identifier_from_purchaser: String,
    pub amounts: Vec<Amount>,
    pub input_hash: String,
    #[serde(rename = "payByTime")]
    pub pay_by_time: String,
}

impl StartJobResponse {
    pub fn new(started: StartedJob, config: &Config) -> Self {
        Self {
            status: "success",
            job_id: started.job_id.to_string(),
            blockchain_identifier: started.payment.blockchain_identifier,
            submit_result_time: started.payment.submit_result_time,
            unlock_time: started.payment.unlock_time,
            external_dispute_unlock_time: started.payment.external_dispute_unlock_time,
            agent_identifier: config.agent_identifier.clone(),
            seller_vkey: config.seller_vkey.clone(),
            identifier_from_purchaser: started.identifier_from_purchaser,
            amounts: vec![Amount {
                amount: config.payment_amount.clone(),
                unit: config.payment_unit.clone(),
            }],
            input_hash: started.input_hash,
            pay_by_time: started.payment.pay_by_time,
        }
    }
}

// ========== GET /status ==========

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub job_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub payment_status: String,
    pub result: Option<AuditReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Job> for StatusResponse {
    fn from(job: Job) -> Self {
        Self {
            job_id: job.job_id.to_string(),
            status: job.status,
            payment_status: job.payment_status,
            result: job.result,
            error: job.error,
        }
    }
}

// ========== Static endpoints ==========

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub status: &'static str,
    #[serde(rename = "type")]
    pub agent_type: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct InputSchemaResponse {
    pub input_data: Vec<InputField>,
}

#[derive(Debug, Serialize)]
pub struct InputField {
    pub id: &'static str,
    #[serde(rename = "type")]
    pub field_type: &'static str,
    pub name: &'static str,
    pub data: InputFieldData,
}

#[derive(Debug, Serialize)]
pub struct InputFieldData {
    pub description: &'static str,
    pub placeholder: &'static str,
}

impl InputField {
    pub const fn string(
        id: &'static str,
        name: &'static str,
        description: &'static str,
        placeholder: &'static str,
    ) -> Self {
        Self {
            id,
            field_type: "string",
            name,
            data: InputFieldData {
                description,
                placeholder,
            },
        }
    }
}
