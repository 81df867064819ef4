use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::report::AuditReport;

/// Job status machine: `awaiting_payment → running → {completed | failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    AwaitingPayment,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::AwaitingPayment => "awaiting_payment",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One end-to-end, payment-gated run of the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub payment_status: String,
    pub blockchain_identifier: String,
    pub identifier_from_purchaser: String,
    pub input_data: BTreeMap<String, String>,
    pub result: Option<AuditReport>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// New job waiting for its payment to be locked
    pub fn awaiting_payment(
        job_id: Uuid,
        blockchain_identifier: String,
        identifier_from_purchaser: String,
        input_data: BTreeMap<String, String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            job_id,
            status: JobStatus::AwaitingPayment,
            payment_status: "pending".to_string(),
            blockchain_identifier,
            identifier_from_purchaser,
            input_data,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}
