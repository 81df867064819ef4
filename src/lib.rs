//! # AuditSense
//!
//! Compliance readiness audits: a standard and a set of evidence documents go
//! in, a scored readiness report comes out. Runs are gated by payment when
//! served over HTTP.
//!
//! ## Architecture
//!
//! The crate is split into four layers, each depending only on the ones below:
//!
//! ### ① Clients (infrastructure)
//! - `clients/` - the external collaborators, each behind a trait
//! - `DocumentFetcher` - raw text from a URL or a local file
//! - `Reasoner` - structured JSON from an OpenAI-compatible LLM
//! - `PaymentGateway` - payment holds on the Masumi payment service
//!
//! ### ② Stage capabilities (services)
//! - `services/` - one type per pipeline stage, each handling one concern
//! - `StandardExtractor` - standard text → controls
//! - `EvidenceLoader` - locators → tagged documents
//! - `EvidenceMapper` - controls × documents → evaluations
//! - `ReportGenerator` - evaluations → scored report (`scoring` is pure)
//!
//! ### ③ Workflow
//! - `workflow/` - the fixed flow of one run
//! - `AuditFlow` - runs the four stages in order and checks each stage's output
//! - `RunCtx` - which run a log line belongs to
//!
//! ### ④ Orchestration
//! - `orchestrator/` - job lifecycle on top of the workflow
//! - `JobManager` - submission, payment gating, single-fire runs, status
//! - `PaymentWatch` - one polling task per job
//! - `JobStore` - process-lifetime job records
//!
//! `api/` exposes the orchestration layer over HTTP; `app` wires everything
//! from `Config`.

pub mod api;
pub mod app;
pub mod clients;
pub mod config;
pub mod error;
pub mod fakes;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

pub use app::App;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{AuditReport, PipelineInputs};
pub use orchestrator::JobManager;
pub use workflow::{AuditFlow, RunCtx};
