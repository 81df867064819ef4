//! Job manager - orchestration layer
//!
//! Owns the job lifecycle: `awaiting_payment → running → {completed | failed}`.
//!
//! - `start_job` validates input, opens a payment hold and registers a watch;
//!   it never runs the pipeline.
//! - Watches report confirmed payments over a channel; a dispatcher task turns
//!   each message into a pipeline run on its own task.
//! - The store's `awaiting_payment → running` transition is the single-fire
//!   guard, so a watch and a status check racing each other still yield one run.
//! - A watch whose pay-by window closes unpaid is released; the job keeps
//!   its `awaiting_payment` status.
//! - Pipeline failures are recorded on the job, never raised to the caller.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::clients::{compute_input_hash, is_funds_locked, PaymentGateway, PaymentRequest, PaymentRequestParams};
use crate::config::Config;
use crate::error::{AppError, AppResult, InputValidationError, StoreError};
use crate::models::{AuditReport, Job, JobStatus, PipelineInputs};
use crate::orchestrator::job_store::JobStore;
use crate::orchestrator::payment_watch::{PaymentEvent, PaymentWatch};
use crate::workflow::{AuditFlow, RunCtx};

/// Timing knobs for payment holds and watches
#[derive(Debug, Clone)]
pub struct JobSettings {
    pub poll_interval: Duration,
    pub pay_by: chrono::Duration,
    pub submit_result: chrono::Duration,
    pub unlock: chrono::Duration,
    pub external_dispute_unlock: chrono::Duration,
}

impl JobSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: Duration::from_secs(config.payment_poll_interval_secs.max(1)),
            pay_by: chrono::Duration::seconds(config.pay_by_secs),
            submit_result: chrono::Duration::seconds(config.submit_result_secs),
            unlock: chrono::Duration::seconds(config.unlock_secs),
            external_dispute_unlock: chrono::Duration::seconds(config.dispute_secs),
        }
    }
}

/// What `start_job` hands back: the new job plus its payment hold
#[derive(Debug, Clone)]
pub struct StartedJob {
    pub job_id: Uuid,
    pub identifier_from_purchaser: String,
    pub input_hash: String,
    pub payment: PaymentRequest,
}

pub struct JobManager {
    store: Arc<dyn JobStore>,
    gateway: Arc<dyn PaymentGateway>,
    flow: Arc<AuditFlow>,
    settings: JobSettings,
    watches: Mutex<HashMap<Uuid, PaymentWatch>>,
    events: mpsc::UnboundedSender<PaymentEvent>,
}

impl JobManager {
    /// Create the manager and its payment-event dispatcher
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        store: Arc<dyn JobStore>,
        gateway: Arc<dyn PaymentGateway>,
        flow: Arc<AuditFlow>,
        settings: JobSettings,
    ) -> Arc<Self> {
        let (events, receiver) = mpsc::unbounded_channel();
        let manager = Arc::new(Self {
            store,
            gateway,
            flow,
            settings,
            watches: Mutex::new(HashMap::new()),
            events,
        });
        tokio::spawn(dispatch(Arc::downgrade(&manager), receiver));
        manager
    }

    // ========== Submission ==========

    /// Validate input, open a payment hold and start watching it
    ///
    /// # Arguments
    /// * `identifier_from_purchaser` - opaque purchaser reference
    /// * `input_data` - the flat parameter bag
    pub async fn start_job(
        &self,
        identifier_from_purchaser: &str,
        input_data: BTreeMap<String, String>,
    ) -> AppResult<StartedJob> {
        let identifier_from_purchaser = identifier_from_purchaser.trim();
        if identifier_from_purchaser.is_empty() {
            return Err(InputValidationError::EmptyPurchaserIdentifier.into());
        }
        PipelineInputs::from_input_data(&input_data)?;

        let job_id = Uuid::new_v4();
        let input_hash = compute_input_hash(&input_data);
        let now = Utc::now();
        let params = PaymentRequestParams {
            identifier_from_purchaser: identifier_from_purchaser.to_string(),
            input_hash: input_hash.clone(),
            pay_by_time: now + self.settings.pay_by,
            submit_result_time: now + self.settings.submit_result,
            unlock_time: now + self.settings.unlock,
            external_dispute_unlock_time: now + self.settings.external_dispute_unlock,
        };

        info!("[job {}] Requesting payment hold", job_id);
        let payment = self.gateway.create_request(&params).await.inspect_err(|e| {
            error!("[job {}] ❌ Payment request failed: {}", job_id, e);
        })?;

        self.store
            .insert(Job::awaiting_payment(
                job_id,
                payment.blockchain_identifier.clone(),
                identifier_from_purchaser.to_string(),
                input_data,
            ))
            .await?;

        // The watch must be recorded before its first confirmation is handled
        {
            let mut watches = self.watches()?;
            let watch = PaymentWatch::spawn(
                self.gateway.clone(),
                job_id,
                payment.blockchain_identifier.clone(),
                self.settings.poll_interval,
                self.settings.pay_by.to_std().unwrap_or(Duration::ZERO),
                self.events.clone(),
            );
            watches.insert(job_id, watch);
        }

        info!(
            "[job {}] ✓ Awaiting payment {}",
            job_id, payment.blockchain_identifier
        );

        Ok(StartedJob {
            job_id,
            identifier_from_purchaser: identifier_from_purchaser.to_string(),
            input_hash,
            payment,
        })
    }

    // ========== Completion ==========

    /// Run the pipeline for a job whose payment is confirmed
    ///
    /// Safe to call any number of times: only the first call for a job that
    /// is still awaiting payment does anything. The job's watch is always
    /// deregistered once the run ends, whatever the outcome.
    pub async fn on_payment_confirmed(&self, job_id: Uuid, payment_id: &str) {
        match self.store.try_begin_run(job_id).await {
            Ok(true) => {}
            Ok(false) => {
                debug!("[job {}] Already past awaiting_payment, ignoring confirmation", job_id);
                return;
            }
            Err(e) => {
                error!("[job {}] ❌ Cannot start run: {}", job_id, e);
                return;
            }
        }

        if let Err(e) = self
            .store
            .set_payment_status(job_id, crate::clients::FUNDS_LOCKED.to_string())
            .await
        {
            warn!("[job {}] ⚠️ Could not record payment status: {}", job_id, e);
        }

        let outcome = match self.run_job(job_id, payment_id).await {
            Ok(report) => self.store.complete(job_id, report).await,
            Err(e) => {
                error!("[job {}] ❌ Job failed: {}", job_id, e);
                self.store.fail(job_id, e.to_string()).await
            }
        };
        if let Err(e) = outcome {
            error!("[job {}] ❌ Could not record job outcome: {}", job_id, e);
        }

        self.stop_watch(job_id);
    }

    async fn run_job(&self, job_id: Uuid, payment_id: &str) -> AppResult<AuditReport> {
        let job = self
            .store
            .get(job_id)
            .await?
            .ok_or(StoreError::MissingJob(job_id))?;

        let inputs = PipelineInputs::from_input_data(&job.input_data)?;
        let report = self.flow.kickoff(&inputs, &RunCtx::for_job(job_id)).await?;

        let proof = serde_json::to_string(&report)?;
        self.gateway.complete(payment_id, &proof).await?;
        info!("[job {}] ✓ Result submitted for payment {}", job_id, payment_id);

        Ok(report)
    }

    // ========== Status ==========

    /// Current view of a job, refreshing its payment state while it waits
    ///
    /// A refresh that sees locked funds emits the same confirmation a watch
    /// would; the single-fire guard keeps it to one run.
    pub async fn job_status(&self, job_id: &str) -> AppResult<Job> {
        let id = Uuid::parse_str(job_id.trim()).map_err(|_| AppError::job_not_found(job_id))?;
        let job = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| AppError::job_not_found(job_id))?;

        if job.status != JobStatus::AwaitingPayment || !self.has_watch(id) {
            return Ok(job);
        }

        let payment_status = match self.gateway.check_status(&job.blockchain_identifier).await {
            Ok(state) => state,
            Err(e) => {
                warn!("[job {}] ⚠️ Payment status check failed: {}", id, e);
                "unknown".to_string()
            }
        };
        let funds_locked = is_funds_locked(&payment_status);

        if !self.store.refresh_payment_status(id, payment_status).await? {
            debug!("[job {}] Run started during the poll, keeping its payment status", id);
        } else if funds_locked {
            let _ = self.events.send(PaymentEvent::Confirmed {
                job_id: id,
                payment_id: job.blockchain_identifier.clone(),
            });
        }

        self.store
            .get(id)
            .await?
            .ok_or_else(|| AppError::job_not_found(job_id))
    }

    /// Drop the watch of a job whose pay-by window closed unpaid
    ///
    /// The job itself stays `awaiting_payment`; a later status check no
    /// longer polls the gateway for it.
    pub fn on_payment_expired(&self, job_id: Uuid) {
        warn!("[job {}] ⚠️ No payment before the pay-by time, watch released", job_id);
        self.stop_watch(job_id);
    }

    // ========== Watches ==========

    fn watches(&self) -> Result<MutexGuard<'_, HashMap<Uuid, PaymentWatch>>, StoreError> {
        self.watches.lock().map_err(|_| StoreError::LockPoisoned)
    }

    pub fn has_watch(&self, job_id: Uuid) -> bool {
        self.watches().map(|w| w.contains_key(&job_id)).unwrap_or(false)
    }

    fn stop_watch(&self, job_id: Uuid) {
        match self.watches() {
            Ok(mut watches) => {
                if let Some(watch) = watches.remove(&job_id) {
                    watch.stop();
                    debug!("[job {}] Payment watch deregistered", job_id);
                }
            }
            Err(e) => error!("[job {}] ❌ Cannot deregister watch: {}", job_id, e),
        }
    }

    /// Cancel every outstanding watch
    pub fn shutdown(&self) {
        if let Ok(mut watches) = self.watches() {
            let count = watches.len();
            for (_, watch) in watches.drain() {
                watch.stop();
            }
            info!("Stopped {} payment watch(es)", count);
        }
    }
}

/// Turn payment events into pipeline runs until the manager goes away
async fn dispatch(weak: Weak<JobManager>, mut receiver: mpsc::UnboundedReceiver<PaymentEvent>) {
    while let Some(event) = receiver.recv().await {
        let Some(manager) = weak.upgrade() else {
            break;
        };
        match event {
            PaymentEvent::Confirmed { job_id, payment_id } => {
                tokio::spawn(async move {
                    manager.on_payment_confirmed(job_id, &payment_id).await;
                });
            }
            PaymentEvent::Expired { job_id } => manager.on_payment_expired(job_id),
        }
    }
    debug!("Payment event dispatcher stopped");
}
