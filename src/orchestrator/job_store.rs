//! Job store
//!
//! Process-lifetime record of every job, keyed by job id. All state
//! transitions go through here so each one is atomic with respect to the
//! others.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::clients::PAYMENT_COMPLETED;
use crate::error::StoreError;
use crate::models::{AuditReport, Job, JobStatus};

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn insert(&self, job: Job) -> Result<(), StoreError>;

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>, StoreError>;

    /// Move `awaiting_payment → running`
    ///
    /// Returns `false` when the job is in any other state, which makes the
    /// transition the single-fire guard for the pipeline.
    async fn try_begin_run(&self, job_id: Uuid) -> Result<bool, StoreError>;

    /// Record the report; the job's payment is settled along with it
    async fn complete(&self, job_id: Uuid, report: AuditReport) -> Result<(), StoreError>;

    async fn fail(&self, job_id: Uuid, error: String) -> Result<(), StoreError>;

    async fn set_payment_status(&self, job_id: Uuid, payment_status: String) -> Result<(), StoreError>;

    /// Record a polled payment status only while the job still awaits payment
    ///
    /// Returns `false`, writing nothing, once a run has started.
    async fn refresh_payment_status(&self, job_id: Uuid, payment_status: String) -> Result<bool, StoreError>;
}

/// In-memory store; jobs live as long as the process
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: Mutex<HashMap<Uuid, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Uuid, Job>>, StoreError> {
        self.jobs.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn update<F>(&self, job_id: Uuid, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Job),
    {
        let mut jobs = self.lock()?;
        let job = jobs.get_mut(&job_id).ok_or(StoreError::MissingJob(job_id))?;
        apply(job);
        job.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn insert(&self, job: Job) -> Result<(), StoreError> {
        let mut jobs = self.lock()?;
        if jobs.contains_key(&job.job_id) {
            return Err(StoreError::DuplicateJob(job.job_id));
        }
        jobs.insert(job.job_id, job);
        Ok(())
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>, StoreError> {
        Ok(self.lock()?.get(&job_id).cloned())
    }

    async fn try_begin_run(&self, job_id: Uuid) -> Result<bool, StoreError> {
        let mut jobs = self.lock()?;
        let job = jobs.get_mut(&job_id).ok_or(StoreError::MissingJob(job_id))?;
        if job.status != JobStatus::AwaitingPayment {
            return Ok(false);
        }
        job.status = JobStatus::Running;
        job.updated_at = Utc::now();
        Ok(true)
    }

    async fn complete(&self, job_id: Uuid, report: AuditReport) -> Result<(), StoreError> {
        self.update(job_id, |job| {
            job.status = JobStatus::Completed;
            job.payment_status = PAYMENT_COMPLETED.to_string();
            job.result = Some(report);
            job.error = None;
        })
    }

    async fn fail(&self, job_id: Uuid, error: String) -> Result<(), StoreError> {
        self.update(job_id, |job| {
            job.status = JobStatus::Failed;
            job.error = Some(error);
        })
    }

    async fn set_payment_status(&self, job_id: Uuid, payment_status: String) -> Result<(), StoreError> {
        self.update(job_id, |job| job.payment_status = payment_status)
    }

    async fn refresh_payment_status(&self, job_id: Uuid, payment_status: String) -> Result<bool, StoreError> {
        let mut jobs = self.lock()?;
        let job = jobs.get_mut(&job_id).ok_or(StoreError::MissingJob(job_id))?;
        if job.status != JobStatus::AwaitingPayment {
            return Ok(false);
        }
        job.payment_status = payment_status;
        job.updated_at = Utc::now();
        Ok(true)
    }
}
