pub mod evidence_loader;
pub mod evidence_mapper;
pub mod prompts;
pub mod report_generator;
pub mod scoring;
pub mod standard_extractor;

pub use evidence_loader::EvidenceLoader;
pub use evidence_mapper::EvidenceMapper;
pub use report_generator::ReportGenerator;
pub use standard_extractor::StandardExtractor;
