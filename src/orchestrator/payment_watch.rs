//! Payment watch
//!
//! One background task per job polls the gateway until the purchaser's
//! funds are locked, reports that once over a channel, and exits. A watch
//! whose pay-by window closes first reports `Expired` and exits. Dropping
//! the watch does not stop it; `stop` does.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clients::{is_funds_locked, PaymentGateway};

/// Message from a watch (or a status check) to the job manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEvent {
    Confirmed { job_id: Uuid, payment_id: String },
    /// The pay-by window closed with no funds locked
    Expired { job_id: Uuid },
}

pub struct PaymentWatch {
    handle: JoinHandle<()>,
}

impl PaymentWatch {
    /// Start polling `payment_id` every `interval` until `pay_within` elapses
    pub fn spawn(
        gateway: Arc<dyn PaymentGateway>,
        job_id: Uuid,
        payment_id: String,
        interval: Duration,
        pay_within: Duration,
        events: mpsc::UnboundedSender<PaymentEvent>,
    ) -> Self {
        let handle = tokio::spawn(async move {
            debug!("[job {}] Payment watch started for {}", job_id, payment_id);
            let expiry = tokio::time::sleep(pay_within);
            tokio::pin!(expiry);
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = &mut expiry => {
                        info!("[job {}] ⌛ Pay-by window closed for {}", job_id, payment_id);
                        let _ = events.send(PaymentEvent::Expired { job_id });
                        break;
                    }
                    _ = ticker.tick() => {}
                }
                match gateway.check_status(&payment_id).await {
                    Ok(state) if is_funds_locked(&state) => {
                        info!("[job {}] 💰 Funds locked for {}", job_id, payment_id);
                        let _ = events.send(PaymentEvent::Confirmed { job_id, payment_id });
                        break;
                    }
                    Ok(state) => debug!("[job {}] Payment state: {}", job_id, state),
                    Err(e) => warn!("[job {}] ⚠️ Payment poll failed: {}", job_id, e),
                }
            }
        });
        Self { handle }
    }

    pub fn stop(&self) {
        self.handle.abort();
    }
}
