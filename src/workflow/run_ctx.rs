//! Run context
//!
//! Which run a log line belongs to: a payment-gated job or a standalone run.

use std::fmt::Display;

use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunCtx {
    /// Job the run belongs to; `None` for standalone runs
    pub job_id: Option<Uuid>,
}

impl RunCtx {
    pub fn for_job(job_id: Uuid) -> Self {
        Self { job_id: Some(job_id) }
    }

    pub fn standalone() -> Self {
        Self { job_id: None }
    }
}

impl Display for RunCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.job_id {
            Some(id) => write!(f, "[job {}]", id),
            None => f.write_str("[standalone]"),
        }
    }
}
