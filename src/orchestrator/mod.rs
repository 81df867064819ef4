//! Orchestration layer
//!
//! Owns job lifecycles on top of the workflow layer:
//!
//! ```text
//! api (HTTP)
//!     ↓
//! job_manager (Job lifecycle, payment gating)
//!     ↓               ↘
//! workflow::AuditFlow   payment_watch (one task per job)
//!     ↓
//! services (stages: extractor / loader / mapper / reporter)
//!     ↓
//! clients (LLM, fetcher, payment gateway)
//! ```
//!
//! `job_store` holds every job for the life of the process.

pub mod job_manager;
pub mod job_store;
pub mod payment_watch;

pub use job_manager::{JobManager, JobSettings, StartedJob};
pub use job_store::{JobStore, MemoryJobStore};
pub use payment_watch::{PaymentEvent, PaymentWatch};
