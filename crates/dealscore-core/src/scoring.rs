//! Deterministic scoring engine.
//!
//! Converts counted contract attributes and weights into a bounded score
//! with a reproducible breakdown. Pure; no I/O.

use serde::{Deserialize, Serialize};

use crate::types::{RiskFlag, RiskLevel, ScoreBreakdown, Severity};

/// Weights for the six score dimensions. All values are non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreWeights {
    pub clause: f64,
    pub disclosure: f64,
    pub addendum: f64,
    pub unusual_clause: f64,
    pub missing_document: f64,
    pub state_compliance: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            clause: 0.20,
            disclosure: 0.20,
            addendum: 0.10,
            unusual_clause: 0.20,
            missing_document: 0.20,
            state_compliance: 0.10,
        }
    }
}

/// Input to one scoring run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreInput {
    pub contract_id: String,
    pub clauses: Vec<String>,
    pub disclosures_provided: Vec<String>,
    pub addenda_included: Vec<String>,
    pub unusual_clauses: Vec<String>,
    pub missing_documents: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// Output of one scoring run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreOutput {
    pub contract_id: String,
    /// Integer in [0, 100]; higher is safer.
    pub total_score: u8,
    pub breakdown: ScoreBreakdown,
    pub weights: ScoreWeights,
    pub flagged: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

/// Score below which a contract is considered flagged.
pub const FLAGGED_THRESHOLD: u8 = 60;

/// Compute a score from counted attributes.
///
/// Each dimension contributes `count * weight`; the base score subtracts
/// the clause, unusual-clause, and missing-document contributions from 100
/// and clamps to [0, 100]. The state-compliance dimension is a placeholder
/// equal to its weight; state rule outcomes reach the score only through
/// flags.
pub fn compute(input: &ScoreInput, weights: &ScoreWeights) -> ScoreOutput {
    let breakdown = ScoreBreakdown {
        clause_score: input.clauses.len() as f64 * weights.clause,
        disclosure_score: input.disclosures_provided.len() as f64 * weights.disclosure,
        addendum_score: input.addenda_included.len() as f64 * weights.addendum,
        unusual_clause_score: input.unusual_clauses.len() as f64 * weights.unusual_clause,
        missing_document_score: input.missing_documents.len() as f64 * weights.missing_document,
        state_compliance_score: weights.state_compliance,
    };

    let base = 100.0
        - (breakdown.clause_score
            + breakdown.unusual_clause_score
            + breakdown.missing_document_score);
    let total_score = clamp_score(base);
    let flagged = total_score < FLAGGED_THRESHOLD;

    let notes = if flagged {
        vec!["High risk detected".to_string()]
    } else {
        Vec::new()
    };

    ScoreOutput {
        contract_id: input.contract_id.clone(),
        total_score,
        breakdown,
        weights: *weights,
        flagged,
        notes,
    }
}

/// Clamp and round a raw score into the stored [0, 100] integer.
pub fn clamp_score(raw: f64) -> u8 {
    raw.round().clamp(0.0, 100.0) as u8
}

/// Severity penalty applied per flag by the analysis path:
/// `{critical: 15, high: 10, medium: 5, low: 2}`.
///
/// Invoked by the analysis orchestrator after [`compute`]; the scan driver
/// uses [`scan_penalty`] instead.
pub fn flag_penalty(flags: &[RiskFlag]) -> u32 {
    flags
        .iter()
        .map(|flag| match flag.severity {
            Severity::Critical => 15,
            Severity::High => 10,
            Severity::Medium => 5,
            Severity::Low => 2,
        })
        .sum()
}

/// Severity penalty applied per flag by the scan summary step:
/// `{critical: 25, high: 15, medium: 5, low: 2}`.
///
/// Invoked only by the scan driver's score step; the analysis path uses
/// [`flag_penalty`].
pub fn scan_penalty(flags: &[RiskFlag]) -> u32 {
    flags
        .iter()
        .map(|flag| match flag.severity {
            Severity::Critical => 25,
            Severity::High => 15,
            Severity::Medium => 5,
            Severity::Low => 2,
        })
        .sum()
}

/// Subtract a penalty from a score, clamping at zero.
pub fn apply_penalty(score: u8, penalty: u32) -> u8 {
    (score as i64 - penalty as i64).clamp(0, 100) as u8
}

/// Risk label for a score, shared with the UI palette.
pub fn risk_level(score: u8) -> RiskLevel {
    RiskLevel::from_score(score)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input_with(clauses: usize, unusual: usize, missing: usize) -> ScoreInput {
        ScoreInput {
            contract_id: "c-1".to_string(),
            clauses: (0..clauses).map(|i| format!("clause {}", i)).collect(),
            unusual_clauses: (0..unusual).map(|i| format!("unusual {}", i)).collect(),
            missing_documents: (0..missing).map(|i| format!("doc {}", i)).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_weights() {
        let weights = ScoreWeights::default();
        assert_eq!(weights.clause, 0.20);
        assert_eq!(weights.state_compliance, 0.10);
    }

    #[test]
    fn test_clean_input_scores_high() {
        let output = compute(&input_with(3, 0, 0), &ScoreWeights::default());
        // 100 - 3 * 0.20 = 99.4, rounded to 99.
        assert_eq!(output.total_score, 99);
        assert!(!output.flagged);
        assert!(output.notes.is_empty());
    }

    #[test]
    fn test_breakdown_contributions() {
        let mut input = input_with(2, 1, 3);
        input.disclosures_provided = vec!["TDS".to_string()];
        input.addenda_included = vec!["A".to_string(), "B".to_string()];

        let output = compute(&input, &ScoreWeights::default());
        assert_eq!(output.breakdown.clause_score, 0.4);
        assert_eq!(output.breakdown.disclosure_score, 0.2);
        assert_eq!(output.breakdown.addendum_score, 0.2);
        assert_eq!(output.breakdown.unusual_clause_score, 0.2);
        assert_eq!(output.breakdown.missing_document_score, 0.6);
        assert_eq!(output.breakdown.state_compliance_score, 0.1);
    }

    #[test]
    fn test_score_clamped_low() {
        let weights = ScoreWeights {
            clause: 50.0,
            ..ScoreWeights::default()
        };
        let output = compute(&input_with(10, 0, 0), &weights);
        assert_eq!(output.total_score, 0);
        assert!(output.flagged);
        assert_eq!(output.notes, vec!["High risk detected".to_string()]);
    }

    #[test]
    fn test_flag_penalty_coefficients() {
        let flags = vec![
            RiskFlag::new("A", "a", Severity::Critical),
            RiskFlag::new("B", "b", Severity::High),
            RiskFlag::new("C", "c", Severity::Medium),
            RiskFlag::new("D", "d", Severity::Low),
        ];
        assert_eq!(flag_penalty(&flags), 15 + 10 + 5 + 2);
    }

    #[test]
    fn test_scan_penalty_coefficients() {
        let flags = vec![
            RiskFlag::new("A", "a", Severity::Critical),
            RiskFlag::new("B", "b", Severity::High),
            RiskFlag::new("C", "c", Severity::Medium),
            RiskFlag::new("D", "d", Severity::Low),
        ];
        assert_eq!(scan_penalty(&flags), 25 + 15 + 5 + 2);
    }

    #[test]
    fn test_penalty_monotonicity() {
        // Removing a flag never decreases the score.
        let mut flags = vec![
            RiskFlag::new("A", "a", Severity::Critical),
            RiskFlag::new("B", "b", Severity::Medium),
        ];
        let with_both = apply_penalty(90, flag_penalty(&flags));
        flags.pop();
        let with_one = apply_penalty(90, flag_penalty(&flags));
        assert!(with_one >= with_both);
    }

    #[test]
    fn test_apply_penalty_clamps_at_zero() {
        assert_eq!(apply_penalty(10, 500), 0);
        assert_eq!(apply_penalty(80, 15), 65);
    }

    #[test]
    fn test_compute_is_deterministic() {
        let input = input_with(5, 2, 1);
        let weights = ScoreWeights::default();
        assert_eq!(compute(&input, &weights), compute(&input, &weights));
    }
}
