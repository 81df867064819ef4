//! Prompt text for the LLM-backed stages

use crate::clients::{ReasoningPrompt, Stage};

const EXTRACTOR_SYSTEM: &str = "You are a compliance analyst. You break standards such as ISO 27001, \
SOC 2, NIST SP 800-53, PCI DSS, GDPR and DPDP into small, auditor-friendly requirements. \
You never invent requirements that are not in the text.";

const MAPPER_SYSTEM: &str = "You are an experienced compliance auditor. You match each control \
against the provided evidence documents, quote supporting evidence exactly as written, and \
identify gaps in plain auditor language.";

const REPORT_SYSTEM: &str = "You are a senior compliance auditor. You turn scored control \
evaluations into a concise readiness summary and practical next steps.";

pub fn standard_extraction(standard_name: &str, chunk_index: usize, chunk_count: usize) -> ReasoningPrompt {
    let part = if chunk_count > 1 {
        format!(" This is part {} of {} of the standard text.", chunk_index + 1, chunk_count)
    } else {
        String::new()
    };

    ReasoningPrompt {
        stage: Stage::StandardExtractor,
        system: EXTRACTOR_SYSTEM.to_string(),
        instruction: format!(
            r#"Extract the atomic compliance controls of the standard "{standard_name}".{part}

Rules:
- Keep the document order.
- If the text gives a control its own identifier (for example "A.5.1" or "AC-2"), copy it exactly into `id`.
- If it has no identifier, leave `id` empty; one will be assigned.
- `title` and `description` are required and must not be empty.
- `domain` (the section the control belongs to) and `priority` (high / medium / low) are optional.

Return a JSON array of objects with keys: id, title, description, domain, priority.
Return [] if the text contains no controls."#
        ),
    }
}

pub fn evidence_mapping() -> ReasoningPrompt {
    ReasoningPrompt {
        stage: Stage::EvidenceMapper,
        system: MAPPER_SYSTEM.to_string(),
        instruction: r#"For EACH control in `controls`, search ALL documents in `documents` and decide:

1. coverage: "covered" if the evidence substantially satisfies the requirement,
   "partially_covered" if some but not all required elements are present,
   "not_covered" otherwise.
2. evidence: list of {"doc_id": <key of the document>, "snippet": <verbatim quote>, "score": <confidence 0..1>}.
3. missing_elements: the specific requirements that were not found.
4. notes: short auditor-style reasoning.

Return a JSON array with exactly one object per control, in the same order as `controls`,
each with keys: control_id, coverage, evidence, missing_elements, notes."#
            .to_string(),
    }
}

pub fn report_narrative(standard_name: &str, scope: &str) -> ReasoningPrompt {
    ReasoningPrompt {
        stage: Stage::ReportGenerator,
        system: REPORT_SYSTEM.to_string(),
        instruction: format!(
            r#"The readiness of "{standard_name}" (scope: {scope}) has already been scored; the numbers are in the context.

Write:
1. overall_summary: two or three sentences that agree with `overall_readiness`
   (below 0.5 is weak readiness, never call it strong).
2. global_recommendations: 3 to 7 concrete, actionable recommendations, ordered by impact,
   starting with the lowest-scoring domains. Synthesize guidance; do not copy missing elements verbatim.

Return a JSON object with keys: overall_summary, global_recommendations."#
        ),
    }
}
