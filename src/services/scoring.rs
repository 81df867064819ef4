//! Deterministic readiness aggregation
//!
//! `score = (#covered * 1.0 + #partial * 0.5 + #missing * 0.0) / total`, the
//! same at domain level and overall level. An empty set scores 0.

use std::collections::{HashMap, HashSet};

use crate::models::{Control, Coverage, DomainScore, Evaluation};

/// Maximum key gaps listed per domain
pub const MAX_KEY_GAPS: usize = 5;
/// Covered evaluations whose best evidence is below this still count as gaps
pub const LOW_EVIDENCE_SCORE: f64 = 0.5;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CoverageCounts {
    pub covered: usize,
    pub partial: usize,
    pub missing: usize,
}

impl CoverageCounts {
    pub fn tally<'a>(evaluations: impl IntoIterator<Item = &'a Evaluation>) -> Self {
        let mut counts = Self::default();
        for evaluation in evaluations {
            match evaluation.coverage {
                Coverage::Covered => counts.covered += 1,
                Coverage::PartiallyCovered => counts.partial += 1,
                Coverage::NotCovered => counts.missing += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.covered + self.partial + self.missing
    }

    pub fn score(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let weighted = self.covered as f64 * Coverage::Covered.weight()
            + self.partial as f64 * Coverage::PartiallyCovered.weight()
            + self.missing as f64 * Coverage::NotCovered.weight();
        weighted / total as f64
    }
}

/// Overall readiness across every evaluation, regardless of domain
pub fn readiness_score(evaluations: &[Evaluation]) -> f64 {
    CoverageCounts::tally(evaluations).score()
}

/// Per-domain scores, in order of each domain's first control
///
/// Evaluations whose control has no domain are left out here; they still
/// count towards [`readiness_score`].
pub fn domain_scores(controls: &[Control], evaluations: &[Evaluation]) -> Vec<DomainScore> {
    let domain_of: HashMap<&str, &str> = controls
        .iter()
        .filter_map(|c| c.domain_key().map(|d| (c.id.as_str(), d)))
        .collect();

    let mut order: Vec<&str> = Vec::new();
    let mut grouped: HashMap<&str, Vec<&Evaluation>> = HashMap::new();
    for evaluation in evaluations {
        let Some(&domain) = domain_of.get(evaluation.control_id.as_str()) else {
            continue;
        };
        grouped
            .entry(domain)
            .or_insert_with(|| {
                order.push(domain);
                Vec::new()
            })
            .push(evaluation);
    }

    order
        .into_iter()
        .map(|domain| {
            let members = &grouped[domain];
            let counts = CoverageCounts::tally(members.iter().copied());
            DomainScore {
                domain: domain.to_string(),
                score: counts.score(),
                covered: counts.covered,
                partial: counts.partial,
                missing: counts.missing,
                key_gaps: key_gaps(members, controls),
            }
        })
        .collect()
}

/// Most severe gaps first: not covered, then partially covered, then covered
/// with weak evidence; within a tier, more missing elements first.
pub fn key_gaps(evaluations: &[&Evaluation], controls: &[Control]) -> Vec<String> {
    let mut gaps: Vec<&Evaluation> = evaluations
        .iter()
        .copied()
        .filter(|e| is_gap(e))
        .collect();

    gaps.sort_by(|a, b| {
        a.coverage
            .severity_rank()
            .cmp(&b.coverage.severity_rank())
            .then_with(|| b.missing_elements.len().cmp(&a.missing_elements.len()))
    });

    let mut seen = HashSet::new();
    let mut result = Vec::new();
    for evaluation in gaps {
        let entries: Vec<String> = if evaluation.missing_elements.is_empty() {
            vec![fallback_gap(evaluation, controls)]
        } else {
            evaluation
                .missing_elements
                .iter()
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect()
        };

        for entry in entries {
            if result.len() == MAX_KEY_GAPS {
                return result;
            }
            if seen.insert(entry.to_lowercase()) {
                result.push(entry);
            }
        }
    }
    result
}

fn is_gap(evaluation: &Evaluation) -> bool {
    match evaluation.coverage {
        Coverage::NotCovered | Coverage::PartiallyCovered => true,
        Coverage::Covered => evaluation.best_evidence_score() < LOW_EVIDENCE_SCORE,
    }
}

fn fallback_gap(evaluation: &Evaluation, controls: &[Control]) -> String {
    let title = controls
        .iter()
        .find(|c| c.id == evaluation.control_id)
        .map(|c| c.title.as_str())
        .unwrap_or("control");
    match evaluation.coverage {
        Coverage::Covered => format!("{} ({}): weak supporting evidence", title, evaluation.control_id),
        _ => format!("{} ({}): insufficient evidence", title, evaluation.control_id),
    }
}
