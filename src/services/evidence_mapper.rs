//! Evidence mapper - stage capability
//!
//! Asks the reasoner for one coverage verdict per control, judged against
//! every supplied document. The output is parsed here; its shape is checked
//! by the workflow before the report stage sees it.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use crate::clients::{llm_client::unwrap_array, Reasoner, Stage};
use crate::error::{AppError, AppResult};
use crate::models::{Control, Evaluation, LoadedDocument};
use crate::services::prompts;

const STAGE: &str = "evidence_mapper";

pub struct EvidenceMapper {
    reasoner: Arc<dyn Reasoner>,
}

impl EvidenceMapper {
    pub fn new(reasoner: Arc<dyn Reasoner>) -> Self {
        Self { reasoner }
    }

    /// Evaluate `controls` against `documents`
    ///
    /// # Arguments
    /// * `controls` - full control list, in the order evaluations must follow
    /// * `documents` - evidence keyed by logical doc id
    pub async fn map(&self, controls: &[Control], documents: &[LoadedDocument]) -> AppResult<Vec<Evaluation>> {
        if controls.is_empty() {
            debug!("No controls to evaluate, skipping evidence mapping");
            return Ok(Vec::new());
        }
        if documents.is_empty() {
            warn!("⚠️ Evaluating {} control(s) without any evidence document", controls.len());
        }

        let document_map: serde_json::Map<String, serde_json::Value> = documents
            .iter()
            .map(|d| (d.doc_id.clone(), json!(d.document_text)))
            .collect();
        let context = json!({
            "controls": controls,
            "documents": document_map,
        });

        let output = self.reasoner.reason(&prompts::evidence_mapping(), &context).await?;
        let items = unwrap_array(output, "evaluations").ok_or_else(|| {
            AppError::shape(STAGE, format!("{} output is not a list of evaluations", Stage::EvidenceMapper))
        })?;

        let evaluations = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                serde_json::from_value::<Evaluation>(item)
                    .map_err(|e| AppError::shape(STAGE, format!("evaluation #{} is malformed: {}", index + 1, e)))
            })
            .collect::<AppResult<Vec<_>>>()?;

        info!(
            "✓ Mapped {} control(s) against {} document(s)",
            evaluations.len(),
            documents.len()
        );
        Ok(evaluations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::ScriptedReasoner;
    use crate::models::Coverage;

    fn control(id: &str) -> Control {
        Control {
            id: id.to_string(),
            title: format!("Control {}", id),
            description: format!("Requirement {}", id),
            domain: None,
            priority: None,
        }
    }

    fn policy_doc() -> Vec<LoadedDocument> {
        vec![LoadedDocument {
            doc_id: "policy_doc".to_string(),
            document_text: "We maintain a security policy.".to_string(),
        }]
    }

    #[tokio::test]
    async fn test_empty_controls_skip_reasoner() {
        let reasoner = Arc::new(ScriptedReasoner::new());
        let mapper = EvidenceMapper::new(reasoner.clone());

        let evaluations = mapper.map(&[], &policy_doc()).await.unwrap();
        assert!(evaluations.is_empty());
        assert_eq!(reasoner.calls(Stage::EvidenceMapper), 0);
    }

    #[tokio::test]
    async fn test_wrapped_evaluations_are_parsed() {
        let reasoner = Arc::new(ScriptedReasoner::new().respond(
            Stage::EvidenceMapper,
            json!({"evaluations": [{
                "control_id": "A.5.1",
                "coverage": "covered",
                "evidence": [{"doc_id": "policy_doc", "snippet": "We maintain a security policy.", "score": 0.9}],
                "missing_elements": [],
                "notes": "Policy exists."
            }]}),
        ));
        let mapper = EvidenceMapper::new(reasoner);

        let evaluations = mapper.map(&[control("A.5.1")], &policy_doc()).await.unwrap();
        assert_eq!(evaluations.len(), 1);
        assert_eq!(evaluations[0].coverage, Coverage::Covered);
        assert_eq!(evaluations[0].evidence[0].doc_id, "policy_doc");
    }

    #[tokio::test]
    async fn test_unknown_coverage_is_a_shape_violation() {
        let reasoner = Arc::new(ScriptedReasoner::new().respond(
            Stage::EvidenceMapper,
            json!([{"control_id": "A.5.1", "coverage": "mostly"}]),
        ));
        let mapper = EvidenceMapper::new(reasoner);

        let err = mapper.map(&[control("A.5.1")], &policy_doc()).await.unwrap_err();
        assert!(matches!(err, AppError::Shape { stage: "evidence_mapper", .. }));
    }
}
