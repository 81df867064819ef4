pub mod audit_flow;
pub mod run_ctx;
pub mod validation;

pub use audit_flow::AuditFlow;
pub use run_ctx::RunCtx;
