//! The pipeline's named-parameter bag
//!
//! Holds the union of every stage's inputs. The slot fields (`standard_text`,
//! `controls`, `documents`, `evaluations`) start empty and are filled either by
//! the caller directly or by the upstream stage during a run.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::InputValidationError;
use crate::models::control::Control;
use crate::models::evaluation::Evaluation;

/// Logical id given to the evidence document when the caller names none
pub const DEFAULT_DOC_ID: &str = "evidence_doc";
const DEFAULT_STANDARD_NAME: &str = "Unnamed Standard";
const DEFAULT_SCOPE: &str = "Full scope";

/// Where to fetch one evidence document from and what to call it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceSource {
    pub locator: String,
    pub doc_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineInputs {
    #[serde(default)]
    pub standard_name: Option<String>,
    #[serde(default)]
    pub standard_url: Option<String>,
    #[serde(default)]
    pub standard_text: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub doc_id: Option<String>,
    /// Additional evidence sources beyond `source_url`
    #[serde(default)]
    pub sources: Vec<EvidenceSource>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub controls: Option<Vec<Control>>,
    #[serde(default)]
    pub documents: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub evaluations: Option<Vec<Evaluation>>,
}

impl PipelineInputs {
    /// Build the bag from the flat string map accepted by `POST /start_job`
    pub fn from_input_data(input_data: &BTreeMap<String, String>) -> Result<Self, InputValidationError> {
        if input_data.is_empty() {
            return Err(InputValidationError::EmptyInput);
        }

        let field = |key: &str| {
            input_data
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        for key in input_data.keys() {
            if !RECOGNIZED_KEYS.contains(&key.as_str()) {
                tracing::debug!("ignoring unrecognized input_data key `{}`", key);
            }
        }

        let inputs = Self {
            standard_name: field("standard_name"),
            standard_url: field("standard_url"),
            standard_text: input_data
                .get("standard_text")
                .filter(|v| !v.trim().is_empty())
                .cloned(),
            source_url: field("source_url"),
            doc_id: field("doc_id"),
            scope: field("scope"),
            ..Self::default()
        };

        // Local paths are for bags loaded on this machine, never for remote callers
        for (name, value) in [("standard_url", &inputs.standard_url), ("source_url", &inputs.source_url)] {
            if let Some(locator) = value.as_deref() {
                require_web_locator(name, locator)?;
            }
        }

        inputs.validate()?;
        Ok(inputs)
    }

    /// Check that every stage can be fed, either by the caller or upstream
    pub fn validate(&self) -> Result<(), InputValidationError> {
        let has_standard = self.standard_text.is_some()
            || self.standard_url.as_deref().is_some_and(|u| !u.trim().is_empty())
            || self.controls.is_some();
        if !has_standard {
            return Err(InputValidationError::MissingField {
                field: "standard_url".to_string(),
            });
        }

        let sources = self.evidence_sources();
        let has_evidence = !sources.is_empty() || self.documents.is_some() || self.evaluations.is_some();
        if !has_evidence {
            return Err(InputValidationError::MissingField {
                field: "source_url".to_string(),
            });
        }

        let mut seen = HashSet::new();
        let preloaded = self.documents.iter().flat_map(|docs| docs.keys());
        for doc_id in sources.iter().map(|s| &s.doc_id).chain(preloaded) {
            if doc_id.trim().is_empty() {
                return Err(InputValidationError::InvalidField {
                    field: "doc_id".to_string(),
                    reason: "must not be blank".to_string(),
                });
            }
            if !seen.insert(doc_id.as_str()) {
                return Err(InputValidationError::DuplicateDocId {
                    doc_id: doc_id.clone(),
                });
            }
        }

        for source in &sources {
            if source.locator.trim().is_empty() {
                return Err(InputValidationError::InvalidField {
                    field: "source_url".to_string(),
                    reason: format!("empty locator for document `{}`", source.doc_id),
                });
            }
        }

        Ok(())
    }

    /// Evidence sources in load order: `source_url` first, then `sources`
    pub fn evidence_sources(&self) -> Vec<EvidenceSource> {
        let mut sources = Vec::with_capacity(self.sources.len() + 1);
        if let Some(url) = self.source_url.as_deref().filter(|u| !u.trim().is_empty()) {
            sources.push(EvidenceSource {
                locator: url.to_string(),
                doc_id: self
                    .doc_id
                    .clone()
                    .unwrap_or_else(|| DEFAULT_DOC_ID.to_string()),
            });
        }
        sources.extend(self.sources.iter().cloned());
        sources
    }

    pub fn standard_display_name(&self) -> String {
        self.standard_name
            .clone()
            .or_else(|| self.standard_url.clone())
            .unwrap_or_else(|| DEFAULT_STANDARD_NAME.to_string())
    }

    pub fn scope_or_default(&self) -> String {
        self.scope.clone().unwrap_or_else(|| DEFAULT_SCOPE.to_string())
    }
}

fn require_web_locator(field: &str, locator: &str) -> Result<(), InputValidationError> {
    let lower = locator.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        Ok(())
    } else {
        Err(InputValidationError::InvalidField {
            field: field.to_string(),
            reason: "must be an http(s) URL".to_string(),
        })
    }
}

const RECOGNIZED_KEYS: &[&str] = &[
    "standard_name",
    "standard_url",
    "standard_text",
    "source_url",
    "doc_id",
    "scope",
];

#[cfg(test)]
mod tests {
    use super::*;

    fn input_data(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_from_input_data_full_bag() {
        let inputs = PipelineInputs::from_input_data(&input_data(&[
            ("standard_url", "https://example.com/iso.txt"),
            ("source_url", "https://example.com/policy.txt"),
            ("doc_id", "policy_doc"),
            ("scope", "IT Security"),
        ]))
        .unwrap();

        assert_eq!(inputs.standard_display_name(), "https://example.com/iso.txt");
        assert_eq!(inputs.scope_or_default(), "IT Security");
        assert_eq!(
            inputs.evidence_sources(),
            vec![EvidenceSource {
                locator: "https://example.com/policy.txt".to_string(),
                doc_id: "policy_doc".to_string(),
            }]
        );
    }

    #[test]
    fn test_empty_input_is_rejected() {
        assert_eq!(
            PipelineInputs::from_input_data(&BTreeMap::new()),
            Err(InputValidationError::EmptyInput)
        );
    }

    #[test]
    fn test_missing_source_is_rejected() {
        let err = PipelineInputs::from_input_data(&input_data(&[(
            "standard_url",
            "https://example.com/iso.txt",
        )]))
        .unwrap_err();
        assert_eq!(
            err,
            InputValidationError::MissingField {
                field: "source_url".to_string()
            }
        );
    }

    #[test]
    fn test_blank_standard_is_rejected() {
        let err = PipelineInputs::from_input_data(&input_data(&[
            ("standard_url", "   "),
            ("source_url", "https://example.com/policy.txt"),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            InputValidationError::MissingField {
                field: "standard_url".to_string()
            }
        );
    }

    #[test]
    fn test_local_paths_are_rejected_from_http_bag() {
        for (field, locator) in [
            ("source_url", "/etc/passwd"),
            ("source_url", "file:///etc/hostname"),
            ("standard_url", "../secrets.txt"),
        ] {
            let mut bag = input_data(&[
                ("standard_url", "https://example.com/iso.txt"),
                ("source_url", "https://example.com/policy.txt"),
            ]);
            bag.insert(field.to_string(), locator.to_string());

            assert_eq!(
                PipelineInputs::from_input_data(&bag),
                Err(InputValidationError::InvalidField {
                    field: field.to_string(),
                    reason: "must be an http(s) URL".to_string(),
                })
            );
        }
    }

    #[test]
    fn test_local_paths_are_allowed_in_loaded_bags() {
        let inputs = PipelineInputs {
            standard_text: Some("A.5 Security Policies".to_string()),
            source_url: Some("./evidence/policy.txt".to_string()),
            ..PipelineInputs::default()
        };
        assert!(inputs.validate().is_ok());
    }

    #[test]
    fn test_doc_id_defaults() {
        let inputs = PipelineInputs::from_input_data(&input_data(&[
            ("standard_url", "https://example.com/iso.txt"),
            ("source_url", "https://example.com/policy.txt"),
        ]))
        .unwrap();
        assert_eq!(inputs.evidence_sources()[0].doc_id, DEFAULT_DOC_ID);
        assert_eq!(inputs.scope_or_default(), "Full scope");
    }

    #[test]
    fn test_duplicate_doc_ids_are_rejected() {
        let inputs = PipelineInputs {
            standard_text: Some("A.5 Security Policies".to_string()),
            source_url: Some("https://example.com/policy.txt".to_string()),
            doc_id: Some("policy_doc".to_string()),
            documents: Some(BTreeMap::from([(
                "policy_doc".to_string(),
                "preloaded".to_string(),
            )])),
            ..PipelineInputs::default()
        };
        assert_eq!(
            inputs.validate(),
            Err(InputValidationError::DuplicateDocId {
                doc_id: "policy_doc".to_string()
            })
        );
    }

    #[test]
    fn test_standard_text_alone_satisfies_standard_slot() {
        let inputs = PipelineInputs {
            standard_text: Some("A.5 Security Policies".to_string()),
            documents: Some(BTreeMap::from([(
                "policy_doc".to_string(),
                "We maintain policies.".to_string(),
            )])),
            ..PipelineInputs::default()
        };
        assert!(inputs.validate().is_ok());
        assert_eq!(inputs.standard_display_name(), "Unnamed Standard");
    }
}
