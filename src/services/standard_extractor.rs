//! Standard extractor - stage capability
//!
//! Turns a standard's raw text into an ordered list of atomic controls.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::clients::{llm_client::unwrap_array, Reasoner, Stage};
use crate::error::{AppError, AppResult};
use crate::models::Control;
use crate::services::prompts;

const STAGE: &str = "standard_extractor";

/// Control as the reasoner returns it, before ids are settled
#[derive(Debug, Deserialize)]
struct RawControl {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    priority: Option<String>,
}

pub struct StandardExtractor {
    reasoner: Arc<dyn Reasoner>,
    max_chunk_chars: usize,
}

impl StandardExtractor {
    pub fn new(reasoner: Arc<dyn Reasoner>, max_chunk_chars: usize) -> Self {
        Self {
            reasoner,
            max_chunk_chars: max_chunk_chars.max(1),
        }
    }

    /// Extract controls in document order
    ///
    /// Empty text yields an empty list without consulting the reasoner.
    pub async fn extract(&self, standard_name: &str, standard_text: &str) -> AppResult<Vec<Control>> {
        if standard_text.trim().is_empty() {
            warn!("⚠️ Standard \"{}\" has no text; no controls extracted", standard_name);
            return Ok(Vec::new());
        }

        let chunks = split_into_chunks(standard_text, self.max_chunk_chars);
        debug!("Extracting controls from {} chunk(s)", chunks.len());

        let mut raw = Vec::new();
        for (index, chunk) in chunks.iter().enumerate() {
            let prompt = prompts::standard_extraction(standard_name, index, chunks.len());
            let context = json!({
                "standard_name": standard_name,
                "standard_text": chunk,
            });
            let output = self.reasoner.reason(&prompt, &context).await?;
            let items = unwrap_array(output, "controls").ok_or_else(|| {
                AppError::shape(STAGE, format!("{} output is not a list of controls", Stage::StandardExtractor))
            })?;
            for item in items {
                let control: RawControl = serde_json::from_value(item)
                    .map_err(|e| AppError::shape(STAGE, format!("malformed control: {}", e)))?;
                raw.push(control);
            }
        }

        let controls = assign_ids(raw)?;
        warn_on_unseen_ids(&controls, standard_text);

        info!("✓ Extracted {} control(s) from \"{}\"", controls.len(), standard_name);
        Ok(controls)
    }
}

/// Settle ids: keep the standard's own, synthesize `CTRL-NNN` for the rest
fn assign_ids(raw: Vec<RawControl>) -> AppResult<Vec<Control>> {
    let mut taken: HashSet<String> = raw
        .iter()
        .filter_map(|c| c.id.as_deref().map(str::trim))
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();

    let mut next_seq = 1usize;
    let mut seen = HashSet::new();
    let mut controls = Vec::with_capacity(raw.len());

    for (position, item) in raw.into_iter().enumerate() {
        let id = match item.id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => {
                let mut candidate = synthesized_id(next_seq);
                while taken.contains(&candidate) {
                    next_seq += 1;
                    candidate = synthesized_id(next_seq);
                }
                next_seq += 1;
                taken.insert(candidate.clone());
                candidate
            }
        };

        if item.title.trim().is_empty() || item.description.trim().is_empty() {
            return Err(AppError::shape(
                STAGE,
                format!("control #{} ({}) has an empty title or description", position + 1, id),
            ));
        }
        if !seen.insert(id.clone()) {
            return Err(AppError::shape(STAGE, format!("duplicate control id {}", id)));
        }

        controls.push(Control {
            id,
            title: item.title.trim().to_string(),
            description: item.description.trim().to_string(),
            domain: non_blank(item.domain),
            priority: non_blank(item.priority),
        });
    }

    Ok(controls)
}

fn synthesized_id(seq: usize) -> String {
    format!("CTRL-{:03}", seq)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub fn is_synthesized_id(id: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^CTRL-\d{3,}$").expect("id pattern is valid"))
        .is_match(id)
}

/// Ids claimed to come from the standard should appear in it verbatim
fn warn_on_unseen_ids(controls: &[Control], standard_text: &str) {
    for control in controls {
        if !is_synthesized_id(&control.id) && !standard_text.contains(&control.id) {
            warn!("⚠️ Control id {} does not appear verbatim in the standard text", control.id);
        }
    }
}

/// Split at paragraph boundaries so no chunk exceeds `max_chars` unless a
/// single paragraph does.
fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;
    for paragraph in text.split("\n\n") {
        let len = paragraph.chars().count();
        if current_len > 0 && current_len + 2 + len > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push_str("\n\n");
            current_len += 2;
        }
        current.push_str(paragraph);
        current_len += len;
    }
    if !current.trim().is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::ScriptedReasoner;

    fn raw(id: Option<&str>, title: &str) -> RawControl {
        RawControl {
            id: id.map(str::to_string),
            title: title.to_string(),
            description: format!("{} description", title),
            domain: None,
            priority: None,
        }
    }

    #[test]
    fn test_real_ids_are_preserved_and_others_synthesized() {
        let controls = assign_ids(vec![
            raw(Some("A.5.1"), "Policy"),
            raw(None, "Roles"),
            raw(Some("  "), "Screening"),
        ])
        .unwrap();
        let ids: Vec<&str> = controls.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["A.5.1", "CTRL-001", "CTRL-002"]);
    }

    #[test]
    fn test_synthesized_ids_skip_taken_ones() {
        let controls = assign_ids(vec![raw(None, "First"), raw(Some("CTRL-001"), "Second")]).unwrap();
        assert_eq!(controls[0].id, "CTRL-002");
        assert_eq!(controls[1].id, "CTRL-001");
    }

    #[test]
    fn test_duplicate_ids_are_a_shape_violation() {
        let err = assign_ids(vec![raw(Some("A.5.1"), "Policy"), raw(Some("A.5.1"), "Again")]).unwrap_err();
        assert!(matches!(err, AppError::Shape { stage: STAGE, .. }));
    }

    #[test]
    fn test_empty_title_is_a_shape_violation() {
        let err = assign_ids(vec![raw(Some("A.5.1"), " ")]).unwrap_err();
        assert!(matches!(err, AppError::Shape { .. }));
    }

    #[test]
    fn test_synthesized_id_format() {
        assert_eq!(synthesized_id(7), "CTRL-007");
        assert_eq!(synthesized_id(1234), "CTRL-1234");
        assert!(is_synthesized_id("CTRL-001"));
        assert!(!is_synthesized_id("A.5.1"));
    }

    #[test]
    fn test_split_into_chunks_respects_paragraphs() {
        let text = "aaaa\n\nbbbb\n\ncccc";
        assert_eq!(split_into_chunks(text, 100), vec![text.to_string()]);
        assert_eq!(split_into_chunks(text, 10), vec!["aaaa\n\nbbbb", "cccc"]);
    }

    #[tokio::test]
    async fn test_empty_text_skips_reasoner() {
        let reasoner = Arc::new(ScriptedReasoner::new());
        let extractor = StandardExtractor::new(reasoner.clone(), 1000);

        let controls = extractor.extract("Empty", "  \n ").await.unwrap();
        assert!(controls.is_empty());
        assert_eq!(reasoner.calls(Stage::StandardExtractor), 0);
    }

    #[tokio::test]
    async fn test_chunked_extraction_keeps_order_and_sequence() {
        let reasoner = Arc::new(
            ScriptedReasoner::new()
                .respond(
                    Stage::StandardExtractor,
                    json!([{"title": "Policy", "description": "Define a policy", "domain": "A.5"}]),
                )
                .respond(
                    Stage::StandardExtractor,
                    json!({"controls": [{"title": "Roles", "description": "Assign roles"}]}),
                ),
        );
        let extractor = StandardExtractor::new(reasoner.clone(), 12);

        let controls = extractor
            .extract("Mini", "Security pol\n\nRoles assign")
            .await
            .unwrap();

        assert_eq!(reasoner.calls(Stage::StandardExtractor), 2);
        assert_eq!(controls.len(), 2);
        assert_eq!(controls[0].id, "CTRL-001");
        assert_eq!(controls[0].domain.as_deref(), Some("A.5"));
        assert_eq!(controls[1].id, "CTRL-002");
    }

    #[tokio::test]
    async fn test_non_list_output_is_a_shape_violation() {
        let reasoner = Arc::new(
            ScriptedReasoner::new().respond(Stage::StandardExtractor, json!({"summary": "none"})),
        );
        let extractor = StandardExtractor::new(reasoner, 1000);
        let err = extractor.extract("Mini", "A.5 Policies").await.unwrap_err();
        assert!(matches!(err, AppError::Shape { .. }));
    }
}
