use serde::{Deserialize, Serialize};

use crate::models::evaluation::Evaluation;

/// Readiness of one domain of the standard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainScore {
    pub domain: String,
    pub score: f64,
    pub covered: usize,
    pub partial: usize,
    pub missing: usize,
    pub key_gaps: Vec<String>,
}

impl DomainScore {
    pub fn total(&self) -> usize {
        self.covered + self.partial + self.missing
    }
}

/// Terminal artifact of a pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub standard_name: String,
    pub scope: String,
    pub overall_readiness: f64,
    pub overall_summary: String,
    pub domain_scores: Vec<DomainScore>,
    pub evaluations: Vec<Evaluation>,
    pub global_recommendations: Vec<String>,
}
