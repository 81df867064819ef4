//! Stage contract checks
//!
//! Applied by the flow between stages, to stage output and to slots the
//! caller filled in directly. Any failure is a shape violation that aborts
//! the run.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::{Control, Evaluation};

const EXTRACTOR: &str = "standard_extractor";
const MAPPER: &str = "evidence_mapper";

/// Every control has a non-empty id, title and description; ids are unique
pub fn check_controls(controls: &[Control]) -> AppResult<()> {
    let mut seen = HashSet::new();
    for (index, control) in controls.iter().enumerate() {
        if control.id.trim().is_empty() {
            return Err(AppError::shape(EXTRACTOR, format!("control #{} has an empty id", index + 1)));
        }
        if control.title.trim().is_empty() || control.description.trim().is_empty() {
            return Err(AppError::shape(
                EXTRACTOR,
                format!("control {} has an empty title or description", control.id),
            ));
        }
        if !seen.insert(control.id.as_str()) {
            return Err(AppError::shape(EXTRACTOR, format!("duplicate control id {}", control.id)));
        }
    }
    Ok(())
}

/// One evaluation per control, returned in control order
///
/// # Arguments
/// * `controls` - the run's controls
/// * `evaluations` - mapper output or caller-supplied evaluations
/// * `known_docs` - doc ids evidence may cite; `None` skips the citation check
pub fn check_evaluations(
    controls: &[Control],
    evaluations: Vec<Evaluation>,
    known_docs: Option<&HashSet<String>>,
) -> AppResult<Vec<Evaluation>> {
    if evaluations.len() != controls.len() {
        return Err(AppError::shape(
            MAPPER,
            format!("{} evaluations for {} controls", evaluations.len(), controls.len()),
        ));
    }

    let position: HashMap<&str, usize> = controls
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id.as_str(), i))
        .collect();

    let mut slots: Vec<Option<Evaluation>> = vec![None; controls.len()];
    let mut reordered = false;
    for (index, evaluation) in evaluations.into_iter().enumerate() {
        let Some(&at) = position.get(evaluation.control_id.as_str()) else {
            return Err(AppError::shape(
                MAPPER,
                format!("evaluation for unknown control {}", evaluation.control_id),
            ));
        };
        check_evidence(&evaluation, known_docs)?;
        if slots[at].is_some() {
            return Err(AppError::shape(
                MAPPER,
                format!("control {} evaluated more than once", evaluation.control_id),
            ));
        }
        reordered |= at != index;
        slots[at] = Some(evaluation);
    }

    if reordered {
        debug!("Evaluations arrived out of control order, realigned");
    }

    // Equal lengths plus no duplicates means every slot is filled
    Ok(slots.into_iter().flatten().collect())
}

fn check_evidence(evaluation: &Evaluation, known_docs: Option<&HashSet<String>>) -> AppResult<()> {
    for snippet in &evaluation.evidence {
        if !(0.0..=1.0).contains(&snippet.score) {
            return Err(AppError::shape(
                MAPPER,
                format!(
                    "evidence score {} for control {} is outside [0, 1]",
                    snippet.score, evaluation.control_id
                ),
            ));
        }
        if let Some(docs) = known_docs {
            if !docs.contains(&snippet.doc_id) {
                return Err(AppError::shape(
                    MAPPER,
                    format!(
                        "control {} cites unknown document {}",
                        evaluation.control_id, snippet.doc_id
                    ),
                ));
            }
        }
    }
    Ok(())
}
