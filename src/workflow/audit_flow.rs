//! Audit flow - workflow layer
//!
//! Defines the complete flow of one audit run:
//! 1. Standard extractor (skipped when the caller supplies `controls`)
//! 2. Evidence loader (fetched sources plus caller-supplied `documents`)
//! 3. Evidence mapper (skipped when the caller supplies `evaluations`)
//! 4. Report generator
//!
//! Each stage's output is checked before the next stage sees it. The first
//! failure aborts the run; no partial report is ever returned.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{error, info};

use crate::clients::{DocumentFetcher, Reasoner};
use crate::error::{AppError, AppResult};
use crate::models::{AuditReport, Control, Evaluation, LoadedDocument, PipelineInputs};
use crate::services::{EvidenceLoader, EvidenceMapper, ReportGenerator, StandardExtractor};
use crate::utils::truncate_text;
use crate::workflow::run_ctx::RunCtx;
use crate::workflow::validation::{check_controls, check_evaluations};

/// Pipeline orchestrator
///
/// - owns one instance of each stage
/// - threads each stage's output into the slot the next stage reads
/// - holds no per-run state, so one flow serves every job
pub struct AuditFlow {
    fetcher: Arc<dyn DocumentFetcher>,
    extractor: StandardExtractor,
    loader: EvidenceLoader,
    mapper: EvidenceMapper,
    reporter: ReportGenerator,
}

impl AuditFlow {
    pub fn new(reasoner: Arc<dyn Reasoner>, fetcher: Arc<dyn DocumentFetcher>, max_chunk_chars: usize) -> Self {
        Self {
            extractor: StandardExtractor::new(reasoner.clone(), max_chunk_chars),
            loader: EvidenceLoader::new(fetcher.clone()),
            mapper: EvidenceMapper::new(reasoner.clone()),
            reporter: ReportGenerator::new(reasoner),
            fetcher,
        }
    }

    /// Run all four stages in order over one parameter bag
    pub async fn kickoff(&self, inputs: &PipelineInputs, ctx: &RunCtx) -> AppResult<AuditReport> {
        inputs.validate()?;

        let standard_name = inputs.standard_display_name();
        let scope = inputs.scope_or_default();

        info!("{}", "=".repeat(60));
        info!("{} 🚀 Audit started: {} ({})", ctx, standard_name, scope);
        info!("{}", "=".repeat(60));

        let controls = self
            .extract_controls(inputs, &standard_name, ctx)
            .await
            .inspect_err(|e| error!("{} ❌ Standard extraction failed: {}", ctx, e))?;

        let documents = self
            .load_evidence(inputs, ctx)
            .await
            .inspect_err(|e| error!("{} ❌ Evidence loading failed: {}", ctx, e))?;

        let evaluations = self
            .evaluate(inputs, &controls, &documents, ctx)
            .await
            .inspect_err(|e| error!("{} ❌ Evidence mapping failed: {}", ctx, e))?;

        let report = self
            .reporter
            .generate(&standard_name, &scope, &controls, &evaluations)
            .await
            .inspect_err(|e| error!("{} ❌ Report generation failed: {}", ctx, e))?;

        info!(
            "{} ✓ Audit finished: readiness {:.2} over {} control(s)",
            ctx,
            report.overall_readiness,
            report.evaluations.len()
        );
        Ok(report)
    }

    // ========== Stage 1: standard extractor ==========

    async fn extract_controls(
        &self,
        inputs: &PipelineInputs,
        standard_name: &str,
        ctx: &RunCtx,
    ) -> AppResult<Vec<Control>> {
        if let Some(controls) = &inputs.controls {
            info!("{} Using {} caller-supplied control(s)", ctx, controls.len());
            check_controls(controls)?;
            return Ok(controls.clone());
        }

        let standard_text = match (&inputs.standard_text, &inputs.standard_url) {
            (Some(text), _) => text.clone(),
            (None, Some(url)) => {
                info!("{} 📥 Fetching standard from {}", ctx, url);
                self.fetcher.fetch(url).await?
            }
            (None, None) => return Err(AppError::missing_field("standard_url")),
        };

        info!(
            "{} Standard text: {}",
            ctx,
            truncate_text(standard_text.trim(), 80)
        );

        let controls = self.extractor.extract(standard_name, &standard_text).await?;
        check_controls(&controls)?;
        Ok(controls)
    }

    // ========== Stage 2: evidence loader ==========

    async fn load_evidence(&self, inputs: &PipelineInputs, ctx: &RunCtx) -> AppResult<Vec<LoadedDocument>> {
        let sources = inputs.evidence_sources();
        if !sources.is_empty() {
            info!("{} 📥 Loading {} evidence source(s)", ctx, sources.len());
        }

        let mut documents = self.loader.load_all(&sources).await?;
        if let Some(preloaded) = &inputs.documents {
            documents.extend(preloaded.iter().map(|(doc_id, text)| LoadedDocument {
                doc_id: doc_id.clone(),
                document_text: text.clone(),
            }));
        }
        Ok(documents)
    }

    // ========== Stage 3: evidence mapper ==========

    async fn evaluate(
        &self,
        inputs: &PipelineInputs,
        controls: &[Control],
        documents: &[LoadedDocument],
        ctx: &RunCtx,
    ) -> AppResult<Vec<Evaluation>> {
        let known_docs: HashSet<String> = documents.iter().map(|d| d.doc_id.clone()).collect();

        if let Some(evaluations) = &inputs.evaluations {
            info!("{} Using {} caller-supplied evaluation(s)", ctx, evaluations.len());
            // Pre-made evaluations may cite documents this run never loaded
            let docs = (!known_docs.is_empty()).then_some(&known_docs);
            return check_evaluations(controls, evaluations.clone(), docs);
        }

        let evaluations = self.mapper.map(controls, documents).await?;
        check_evaluations(controls, evaluations, Some(&known_docs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::Stage;
    use crate::error::FetchError;
    use crate::fakes::{MemoryFetcher, ScriptedReasoner};
    use serde_json::json;

    fn flow(reasoner: Arc<ScriptedReasoner>, fetcher: MemoryFetcher) -> AuditFlow {
        AuditFlow::new(reasoner, Arc::new(fetcher), 24_000)
    }

    #[tokio::test]
    async fn test_caller_supplied_slots_skip_llm_stages() {
        let reasoner = Arc::new(ScriptedReasoner::new().respond(
            Stage::ReportGenerator,
            json!({"overall_summary": "All good.", "global_recommendations": ["a", "b", "c"]}),
        ));
        let inputs = PipelineInputs {
            standard_name: Some("Mini".to_string()),
            controls: Some(vec![Control {
                id: "C1".to_string(),
                title: "Policy".to_string(),
                description: "Have a policy".to_string(),
                domain: None,
                priority: None,
            }]),
            evaluations: Some(vec![Evaluation {
                control_id: "C1".to_string(),
                coverage: crate::models::Coverage::Covered,
                evidence: vec![],
                missing_elements: vec![],
                notes: String::new(),
            }]),
            ..PipelineInputs::default()
        };

        let report = flow(reasoner.clone(), MemoryFetcher::new())
            .kickoff(&inputs, &RunCtx::standalone())
            .await
            .unwrap();

        assert_eq!(report.overall_readiness, 1.0);
        assert_eq!(reasoner.calls(Stage::StandardExtractor), 0);
        assert_eq!(reasoner.calls(Stage::EvidenceMapper), 0);
        assert_eq!(reasoner.calls(Stage::ReportGenerator), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts_before_mapping() {
        let reasoner = Arc::new(ScriptedReasoner::new().respond(
            Stage::StandardExtractor,
            json!([{"id": "A.5.1", "title": "Policy", "description": "Have a policy"}]),
        ));
        let fetcher = MemoryFetcher::new().with("mem://iso", "A.5.1 Policy");
        let inputs = PipelineInputs {
            standard_url: Some("mem://iso".to_string()),
            source_url: Some("mem://missing".to_string()),
            ..PipelineInputs::default()
        };

        let err = flow(reasoner.clone(), fetcher)
            .kickoff(&inputs, &RunCtx::standalone())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Fetch(FetchError::Unreachable { .. })));
        assert_eq!(reasoner.calls(Stage::EvidenceMapper), 0);
        assert_eq!(reasoner.calls(Stage::ReportGenerator), 0);
    }
}
