use serde::{Deserialize, Serialize};

/// Degree to which evidence satisfies a control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coverage {
    Covered,
    PartiallyCovered,
    NotCovered,
}

impl Coverage {
    /// Weight used by the readiness score
    pub fn weight(self) -> f64 {
        match self {
            Coverage::Covered => 1.0,
            Coverage::PartiallyCovered => 0.5,
            Coverage::NotCovered => 0.0,
        }
    }

    /// Gap severity rank: lower is more severe
    pub fn severity_rank(self) -> u8 {
        match self {
            Coverage::NotCovered => 0,
            Coverage::PartiallyCovered => 1,
            Coverage::Covered => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Coverage::Covered => "covered",
            Coverage::PartiallyCovered => "partially_covered",
            Coverage::NotCovered => "not_covered",
        }
    }
}

/// A cited piece of evidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSnippet {
    pub doc_id: String,
    pub snippet: String,
    pub score: f64,
}

/// Per-control coverage verdict plus supporting evidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub control_id: String,
    pub coverage: Coverage,
    #[serde(default)]
    pub evidence: Vec<EvidenceSnippet>,
    #[serde(default)]
    pub missing_elements: Vec<String>,
    #[serde(default)]
    pub notes: String,
}

impl Evaluation {
    /// Highest evidence confidence, 0 when nothing was cited
    pub fn best_evidence_score(&self) -> f64 {
        self.evidence
            .iter()
            .map(|e| e.score)
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coverage_wire_names() {
        assert_eq!(
            serde_json::to_string(&Coverage::PartiallyCovered).unwrap(),
            "\"partially_covered\""
        );
        let parsed: Coverage = serde_json::from_str("\"not_covered\"").unwrap();
        assert_eq!(parsed, Coverage::NotCovered);
    }

    #[test]
    fn test_unknown_coverage_is_rejected() {
        assert!(serde_json::from_str::<Coverage>("\"mostly_covered\"").is_err());
    }

    #[test]
    fn test_best_evidence_score() {
        let evaluation = Evaluation {
            control_id: "A.6.1".to_string(),
            coverage: Coverage::PartiallyCovered,
            evidence: vec![
                EvidenceSnippet {
                    doc_id: "policy_doc".to_string(),
                    snippet: "Roles are defined.".to_string(),
                    score: 0.4,
                },
                EvidenceSnippet {
                    doc_id: "policy_doc".to_string(),
                    snippet: "Owners are assigned.".to_string(),
                    score: 0.75,
                },
            ],
            missing_elements: vec!["No periodic review".to_string()],
            notes: String::new(),
        };
        assert_eq!(evaluation.best_evidence_score(), 0.75);
    }
}
