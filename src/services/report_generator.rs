//! Report generator - stage capability
//!
//! Numbers are computed here, never by the reasoner: overall readiness,
//! domain scores, counts and key gaps all come from [`scoring`]. The reasoner
//! only writes the summary and recommendations, and a narrative that breaks
//! the report contract is replaced with a deterministic one.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::clients::Reasoner;
use crate::error::{AppError, AppResult, LlmError};
use crate::models::{AuditReport, Control, DomainScore, Evaluation};
use crate::services::prompts;
use crate::services::scoring::{self, CoverageCounts};

pub const MIN_RECOMMENDATIONS: usize = 3;
pub const MAX_RECOMMENDATIONS: usize = 7;

const STRONG_PHRASES: &[&str] = &[
    "strong readiness",
    "high readiness",
    "fully compliant",
    "fully ready",
    "well prepared",
    "excellent",
];
const WEAK_PHRASES: &[&str] = &["poor readiness", "low readiness", "not ready", "weak readiness"];

const GENERIC_RECOMMENDATIONS: &[&str] = &[
    "Assign an accountable owner to every control in scope and track remediation to closure.",
    "Collect and retain objective evidence such as records, logs and approvals for each control.",
    "Schedule periodic internal reviews to confirm that implemented controls stay effective.",
    "Re-run this assessment after remediation to measure progress against the standard.",
];

/// Summary and recommendations as the reasoner returns them
#[derive(Debug, Default, Deserialize)]
struct Narrative {
    #[serde(default)]
    overall_summary: String,
    #[serde(default)]
    global_recommendations: Vec<String>,
}

pub struct ReportGenerator {
    reasoner: Arc<dyn Reasoner>,
}

impl ReportGenerator {
    pub fn new(reasoner: Arc<dyn Reasoner>) -> Self {
        Self { reasoner }
    }

    /// Aggregate evaluations into the final report
    ///
    /// # Arguments
    /// * `controls` - the run's controls, used to look up each evaluation's domain
    /// * `evaluations` - validated evaluations; copied into the report unchanged
    pub async fn generate(
        &self,
        standard_name: &str,
        scope: &str,
        controls: &[Control],
        evaluations: &[Evaluation],
    ) -> AppResult<AuditReport> {
        let overall_readiness = scoring::readiness_score(evaluations);
        let domain_scores = scoring::domain_scores(controls, evaluations);
        let counts = CoverageCounts::tally(evaluations);

        let narrative = if evaluations.is_empty() {
            debug!("No evaluations, using the deterministic narrative");
            None
        } else {
            let context = json!({
                "standard_name": standard_name,
                "scope": scope,
                "overall_readiness": overall_readiness,
                "counts": {
                    "covered": counts.covered,
                    "partial": counts.partial,
                    "missing": counts.missing,
                },
                "domain_scores": domain_scores,
                "evaluations": evaluations,
            });
            match self
                .reasoner
                .reason(&prompts::report_narrative(standard_name, scope), &context)
                .await
            {
                Ok(output) => accept_narrative(output, overall_readiness, evaluations),
                Err(AppError::Llm(LlmError::InvalidJson { reason })) => {
                    warn!("⚠️ Report narrative is not JSON ({}), using the deterministic narrative", reason);
                    None
                }
                Err(e) => return Err(e),
            }
        };

        let (overall_summary, global_recommendations) = match narrative {
            Some(n) => (
                n.overall_summary.trim().to_string(),
                n.global_recommendations
                    .iter()
                    .map(|r| r.trim().to_string())
                    .collect(),
            ),
            None => (
                fallback_summary(standard_name, scope, overall_readiness, counts),
                fallback_recommendations(&domain_scores, evaluations),
            ),
        };

        info!(
            "✓ Report ready: readiness {:.2}, {} domain(s), {} recommendation(s)",
            overall_readiness,
            domain_scores.len(),
            global_recommendations.len()
        );

        Ok(AuditReport {
            standard_name: standard_name.to_string(),
            scope: scope.to_string(),
            overall_readiness,
            overall_summary,
            domain_scores,
            evaluations: evaluations.to_vec(),
            global_recommendations,
        })
    }
}

// ========== Narrative contract ==========

fn accept_narrative(output: Value, readiness: f64, evaluations: &[Evaluation]) -> Option<Narrative> {
    match serde_json::from_value::<Narrative>(output) {
        Ok(narrative) => match narrative_violation(&narrative, readiness, evaluations) {
            None => Some(narrative),
            Some(reason) => {
                warn!("⚠️ Report narrative rejected ({}), using the deterministic narrative", reason);
                None
            }
        },
        Err(e) => {
            warn!("⚠️ Report narrative is malformed ({}), using the deterministic narrative", e);
            None
        }
    }
}

fn missing_element_set(evaluations: &[Evaluation]) -> HashSet<String> {
    evaluations
        .iter()
        .flat_map(|e| e.missing_elements.iter())
        .map(|m| m.trim().to_lowercase())
        .collect()
}

/// Why the narrative cannot be used, if it cannot
fn narrative_violation(narrative: &Narrative, readiness: f64, evaluations: &[Evaluation]) -> Option<String> {
    let summary = narrative.overall_summary.trim().to_lowercase();
    if summary.is_empty() {
        return Some("empty summary".to_string());
    }
    if readiness < 0.5 {
        if let Some(phrase) = STRONG_PHRASES.iter().find(|p| summary.contains(*p)) {
            return Some(format!("summary claims \"{}\" at readiness {:.2}", phrase, readiness));
        }
    }
    if readiness >= 0.8 {
        if let Some(phrase) = WEAK_PHRASES.iter().find(|p| summary.contains(*p)) {
            return Some(format!("summary claims \"{}\" at readiness {:.2}", phrase, readiness));
        }
    }

    let count = narrative.global_recommendations.len();
    if !(MIN_RECOMMENDATIONS..=MAX_RECOMMENDATIONS).contains(&count) {
        return Some(format!("{} recommendations", count));
    }

    let missing = missing_element_set(evaluations);
    for recommendation in &narrative.global_recommendations {
        let normalized = recommendation.trim().to_lowercase();
        if normalized.is_empty() {
            return Some("blank recommendation".to_string());
        }
        if missing.contains(&normalized) {
            return Some(format!("recommendation copies a missing element: {}", recommendation.trim()));
        }
    }
    None
}

// ========== Deterministic narrative ==========

fn readiness_band(readiness: f64) -> &'static str {
    if readiness >= 0.8 {
        "Strong"
    } else if readiness >= 0.5 {
        "Moderate"
    } else if readiness > 0.0 {
        "Low"
    } else {
        "No demonstrated"
    }
}

fn fallback_summary(standard_name: &str, scope: &str, readiness: f64, counts: CoverageCounts) -> String {
    if counts.total() == 0 {
        return format!(
            "No control evaluations were available for {} ({}), so readiness cannot be demonstrated and is scored 0%.",
            standard_name, scope
        );
    }
    format!(
        "{} readiness for {} ({}): {:.0}% overall, with {} of {} controls covered, {} partially covered and {} not covered.",
        readiness_band(readiness),
        standard_name,
        scope,
        readiness * 100.0,
        counts.covered,
        counts.total(),
        counts.partial,
        counts.missing
    )
}

/// Lowest-scoring domains first, padded with general guidance
fn fallback_recommendations(domain_scores: &[DomainScore], evaluations: &[Evaluation]) -> Vec<String> {
    let mut weakest: Vec<&DomainScore> = domain_scores.iter().filter(|d| d.score < 1.0).collect();
    weakest.sort_by(|a, b| a.score.total_cmp(&b.score));

    let mut recommendations: Vec<String> = weakest
        .into_iter()
        .take(MAX_RECOMMENDATIONS)
        .map(|d| {
            let open = d.partial + d.missing;
            format!(
                "Prioritise remediation in {} (readiness {:.0}%): close the {} open control gap{} and assign owners with target dates.",
                d.domain,
                d.score * 100.0,
                open,
                if open == 1 { "" } else { "s" }
            )
        })
        .collect();

    let missing = missing_element_set(evaluations);
    for generic in GENERIC_RECOMMENDATIONS {
        if recommendations.len() >= MIN_RECOMMENDATIONS {
            break;
        }
        if !missing.contains(&generic.to_lowercase()) {
            recommendations.push(generic.to_string());
        }
    }
    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::Stage;
    use crate::fakes::ScriptedReasoner;
    use crate::models::{Coverage, EvidenceSnippet};

    fn control(id: &str, domain: &str) -> Control {
        Control {
            id: id.to_string(),
            title: format!("Control {}", id),
            description: format!("Requirement {}", id),
            domain: Some(domain.to_string()),
            priority: None,
        }
    }

    fn evaluation(id: &str, coverage: Coverage, missing: &[&str]) -> Evaluation {
        Evaluation {
            control_id: id.to_string(),
            coverage,
            evidence: vec![EvidenceSnippet {
                doc_id: "policy_doc".to_string(),
                snippet: "We maintain a security policy.".to_string(),
                score: 0.8,
            }],
            missing_elements: missing.iter().map(|m| m.to_string()).collect(),
            notes: String::new(),
        }
    }

    fn sample() -> (Vec<Control>, Vec<Evaluation>) {
        (
            vec![control("A.5.1", "A.5"), control("A.6.1", "A.6")],
            vec![
                evaluation("A.5.1", Coverage::Covered, &[]),
                evaluation("A.6.1", Coverage::NotCovered, &["No background screening"]),
            ],
        )
    }

    #[tokio::test]
    async fn test_empty_evaluations_yield_zero_report_without_reasoner() {
        let reasoner = Arc::new(ScriptedReasoner::new());
        let generator = ReportGenerator::new(reasoner.clone());

        let report = generator.generate("ISO 27001", "Full scope", &[], &[]).await.unwrap();
        assert_eq!(report.overall_readiness, 0.0);
        assert!(report.domain_scores.is_empty());
        assert!(report.evaluations.is_empty());
        assert_eq!(report.global_recommendations.len(), MIN_RECOMMENDATIONS);
        assert!(!report.overall_summary.is_empty());
        assert_eq!(reasoner.calls(Stage::ReportGenerator), 0);
    }

    #[tokio::test]
    async fn test_valid_narrative_is_used_and_numbers_are_computed() {
        let reasoner = Arc::new(ScriptedReasoner::new().respond(
            Stage::ReportGenerator,
            json!({
                "overall_summary": "Moderate readiness; personnel security needs work.",
                "global_recommendations": [
                    "Introduce pre-employment screening",
                    "Document the screening procedure",
                    "Train HR staff on screening"
                ],
                "overall_readiness": 0.99
            }),
        ));
        let generator = ReportGenerator::new(reasoner);
        let (controls, evaluations) = sample();

        let report = generator
            .generate("ISO 27001", "IT Security", &controls, &evaluations)
            .await
            .unwrap();
        assert_eq!(report.overall_readiness, 0.5);
        assert_eq!(report.overall_summary, "Moderate readiness; personnel security needs work.");
        assert_eq!(report.global_recommendations.len(), 3);
        assert_eq!(report.evaluations, evaluations);
        assert_eq!(report.domain_scores[1].key_gaps, vec!["No background screening"]);
    }

    #[tokio::test]
    async fn test_too_few_recommendations_fall_back() {
        let reasoner = Arc::new(ScriptedReasoner::new().respond(
            Stage::ReportGenerator,
            json!({"overall_summary": "Some gaps.", "global_recommendations": ["Fix it"]}),
        ));
        let generator = ReportGenerator::new(reasoner);
        let (controls, evaluations) = sample();

        let report = generator.generate("ISO 27001", "IT", &controls, &evaluations).await.unwrap();
        let count = report.global_recommendations.len();
        assert!((MIN_RECOMMENDATIONS..=MAX_RECOMMENDATIONS).contains(&count));
        assert!(report.global_recommendations[0].contains("A.6"));
        assert!(report.overall_summary.starts_with("Moderate readiness"));
    }

    #[tokio::test]
    async fn test_prose_narrative_falls_back() {
        let reasoner = Arc::new(
            ScriptedReasoner::new().respond_text(Stage::ReportGenerator, "Readiness is moderate. Fix screening."),
        );
        let generator = ReportGenerator::new(reasoner.clone());
        let (controls, evaluations) = sample();

        let report = generator.generate("ISO 27001", "IT", &controls, &evaluations).await.unwrap();
        assert_eq!(reasoner.calls(Stage::ReportGenerator), 1);
        assert_eq!(report.overall_readiness, 0.5);
        assert!(report.overall_summary.starts_with("Moderate readiness"));
        assert!(report.global_recommendations.len() >= MIN_RECOMMENDATIONS);
    }

    #[tokio::test]
    async fn test_reasoner_outage_still_fails_report() {
        let reasoner = Arc::new(ScriptedReasoner::new().fail(Stage::ReportGenerator, "connection reset"));
        let generator = ReportGenerator::new(reasoner);
        let (controls, evaluations) = sample();

        let err = generator
            .generate("ISO 27001", "IT", &controls, &evaluations)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Llm(LlmError::ApiCallFailed { .. })));
    }

    #[test]
    fn test_contradicting_summary_is_rejected() {
        let narrative = Narrative {
            overall_summary: "The organisation shows strong readiness.".to_string(),
            global_recommendations: vec!["a".into(), "b".into(), "c".into()],
        };
        let evaluations = vec![evaluation("A", Coverage::NotCovered, &[])];
        assert!(narrative_violation(&narrative, 0.0, &evaluations).is_some());
        assert!(narrative_violation(&narrative, 0.9, &evaluations).is_none());
    }

    #[test]
    fn test_verbatim_missing_element_is_rejected() {
        let narrative = Narrative {
            overall_summary: "Gaps remain.".to_string(),
            global_recommendations: vec![
                "no background screening".into(),
                "Adopt a screening policy".into(),
                "Review annually".into(),
            ],
        };
        let evaluations = vec![evaluation("A", Coverage::NotCovered, &["No background screening"])];
        let reason = narrative_violation(&narrative, 0.0, &evaluations).unwrap();
        assert!(reason.contains("missing element"));
    }

    #[test]
    fn test_fallback_orders_lowest_domain_first() {
        let scores = vec![
            DomainScore {
                domain: "A.5".to_string(),
                score: 0.5,
                covered: 1,
                partial: 0,
                missing: 1,
                key_gaps: vec![],
            },
            DomainScore {
                domain: "A.6".to_string(),
                score: 0.0,
                covered: 0,
                partial: 0,
                missing: 2,
                key_gaps: vec![],
            },
            DomainScore {
                domain: "A.7".to_string(),
                score: 1.0,
                covered: 2,
                partial: 0,
                missing: 0,
                key_gaps: vec![],
            },
        ];
        let recommendations = fallback_recommendations(&scores, &[]);
        assert_eq!(recommendations.len(), 3);
        assert!(recommendations[0].contains("A.6"));
        assert!(recommendations[1].contains("A.5"));
        assert_eq!(recommendations[2], GENERIC_RECOMMENDATIONS[0]);
    }
}
