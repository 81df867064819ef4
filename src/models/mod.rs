pub mod control;
pub mod evaluation;
pub mod inputs;
pub mod job;
pub mod loaders;
pub mod report;

pub use control::{Control, LoadedDocument};
pub use evaluation::{Coverage, Evaluation, EvidenceSnippet};
pub use inputs::{EvidenceSource, PipelineInputs, DEFAULT_DOC_ID};
pub use job::{Job, JobStatus};
pub use loaders::load_bag_from_toml;
pub use report::{AuditReport, DomainScore};
