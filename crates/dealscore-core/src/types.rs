//! Core data model for contract risk analysis.
//!
//! Everything here is a plain value type: contracts and their children as
//! loaded through a repository port, the flags and results produced by
//! rules, and the scores and analyses derived from them.

use std::borrow::Cow;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractStatus {
    Draft,
    Submitted,
    Reviewed,
    Archived,
}

/// Classification of a clause within a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClauseType {
    Standard,
    Unusual,
    Custom,
}

/// A semantically distinct provision in the contract text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    pub text: String,
    pub clause_type: ClauseType,
    pub flagged: bool,
}

impl Clause {
    /// A standard, unflagged clause with the given text.
    pub fn standard(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            clause_type: ClauseType::Standard,
            flagged: false,
        }
    }
}

/// A named disclosure form, required (often by state law) to be provided.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disclosure {
    pub name: String,
    pub required: bool,
    pub provided: bool,
}

impl Disclosure {
    pub fn new(name: impl Into<String>, required: bool, provided: bool) -> Self {
        Self {
            name: name.into(),
            required,
            provided,
        }
    }
}

/// A supplementary document attached to the main contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Addendum {
    pub name: String,
    pub included: bool,
}

impl Addendum {
    pub fn new(name: impl Into<String>, included: bool) -> Self {
        Self {
            name: name.into(),
            included,
        }
    }
}

/// Media type of an uploaded contract document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Pdf,
    Doc,
    Other,
}

/// Reference to an uploaded document backing the contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub url: String,
    pub media_type: MediaType,
    pub uploaded_at: DateTime<Utc>,
}

/// A residential purchase contract and its child collections.
///
/// The contract exclusively owns its clauses, disclosures, addenda, and
/// document references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: String,
    pub title: String,
    pub user_id: String,
    pub organization_id: String,
    /// U.S. state code governing the purchase, when known.
    pub state: Option<String>,
    pub status: ContractStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub clauses: Vec<Clause>,
    pub disclosures: Vec<Disclosure>,
    pub addenda: Vec<Addendum>,
    pub documents: Vec<DocumentRef>,
}

impl Contract {
    /// Disclosures that are required but not provided.
    pub fn missing_disclosures(&self) -> Vec<&Disclosure> {
        self.disclosures
            .iter()
            .filter(|d| d.required && !d.provided)
            .collect()
    }

    /// Names of disclosures that were provided.
    pub fn provided_disclosure_names(&self) -> Vec<&str> {
        self.disclosures
            .iter()
            .filter(|d| d.provided)
            .map(|d| d.name.as_str())
            .collect()
    }

    /// Names of addenda that are included.
    pub fn included_addenda_names(&self) -> Vec<&str> {
        self.addenda
            .iter()
            .filter(|a| a.included)
            .map(|a| a.name.as_str())
            .collect()
    }
}

/// Severity of a risk flag. Ordering is `Low < Medium < High < Critical`
/// and is used for filtering and recommendation priority.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// A coded, severity-tagged finding produced by a rule.
///
/// Codes are uppercase ASCII, namespaced `{RULE_ID}_{LOCAL_CODE}`, and
/// stable across versions. Two flags are the same finding iff their codes
/// match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFlag {
    pub code: String,
    pub description: String,
    pub severity: Severity,
}

impl RiskFlag {
    pub fn new(code: impl Into<String>, description: impl Into<String>, severity: Severity) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
            severity,
        }
    }
}

/// Outcome of evaluating one rule against a contract.
///
/// Invariant: `passed` iff `flags` is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleResult {
    pub rule_id: String,
    pub rule_name: String,
    pub passed: bool,
    pub flags: Vec<RiskFlag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl RuleResult {
    /// A passing result with no flags.
    pub fn pass(rule_id: impl Into<String>, rule_name: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.into(),
            rule_name: rule_name.into(),
            passed: true,
            flags: Vec::new(),
            details: None,
            suggestions: Vec::new(),
        }
    }

    /// A result derived from a flag list; passes iff the list is empty.
    pub fn from_flags(
        rule_id: impl Into<String>,
        rule_name: impl Into<String>,
        flags: Vec<RiskFlag>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            rule_name: rule_name.into(),
            passed: flags.is_empty(),
            flags,
            details: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }
}

/// The evaluation input handed to every rule: the contract, an optional
/// state code, and optional raw contract text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleContext {
    pub contract: Contract,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_text: Option<String>,
}

impl RuleContext {
    /// Build a context for a contract, inheriting its state code.
    pub fn new(contract: Contract) -> Self {
        let state = contract.state.clone();
        Self {
            contract,
            state,
            contract_text: None,
        }
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.contract_text = Some(text.into());
        self
    }

    /// The raw text rules scan: the supplied `contract_text` when present,
    /// otherwise the clause texts joined. Never both.
    pub fn text(&self) -> Cow<'_, str> {
        match &self.contract_text {
            Some(text) => Cow::Borrowed(text.as_str()),
            None => Cow::Owned(
                self.contract
                    .clauses
                    .iter()
                    .map(|c| c.text.as_str())
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
        }
    }

    pub fn state_code(&self) -> Option<&str> {
        self.state.as_deref()
    }
}

/// Per-dimension contributions to a risk score.
///
/// Field names serialize to the stable breakdown keys consumed by the
/// transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub clause_score: f64,
    pub disclosure_score: f64,
    pub addendum_score: f64,
    pub unusual_clause_score: f64,
    pub missing_document_score: f64,
    pub state_compliance_score: f64,
}

/// A computed risk score for one contract. Higher is safer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskScore {
    pub contract_id: String,
    /// Integer in [0, 100], clamped before storage.
    pub score: u8,
    pub calculated_at: DateTime<Utc>,
    pub flags: Vec<RiskFlag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<ScoreBreakdown>,
}

/// Five-level risk label derived from a score; also the UI palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    Elevated,
    High,
    Critical,
}

impl RiskLevel {
    /// Band a score: `>=80 Low, >=60 Moderate, >=40 Elevated, >=20 High,
    /// else Critical`.
    pub fn from_score(score: u8) -> Self {
        match score {
            80..=100 => RiskLevel::Low,
            60..=79 => RiskLevel::Moderate,
            40..=59 => RiskLevel::Elevated,
            20..=39 => RiskLevel::High,
            _ => RiskLevel::Critical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::Elevated => "Elevated",
            RiskLevel::High => "High",
            RiskLevel::Critical => "Critical",
        }
    }
}

/// One point in a contract's score time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskHistoryEntry {
    pub analyzed_at: DateTime<Utc>,
    pub score: u8,
    pub flags: Vec<RiskFlag>,
}

/// The full result of analyzing one contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAnalysis {
    pub contract_id: String,
    pub summary: String,
    pub score: RiskScore,
    pub explanations: Vec<String>,
}

/// Priority of a recommendation. Ordering is `Immediate < Soon < Optional`
/// (most urgent first).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationPriority {
    Immediate,
    Soon,
    Optional,
}

impl RecommendationPriority {
    /// Map a flag severity to the priority of its recommendation.
    pub fn from_severity(severity: Severity) -> Self {
        match severity {
            Severity::Critical | Severity::High => RecommendationPriority::Immediate,
            Severity::Medium => RecommendationPriority::Soon,
            Severity::Low => RecommendationPriority::Optional,
        }
    }
}

/// A prioritized action derived from a flag set and a score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: RecommendationPriority,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag_code: Option<String>,
}

/// Count flags per severity bucket.
pub fn count_by_severity(flags: &[RiskFlag]) -> HashMap<Severity, usize> {
    let mut counts = HashMap::new();
    for flag in flags {
        *counts.entry(flag.severity).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_contract() -> Contract {
        Contract {
            id: "c-1".to_string(),
            title: "Test".to_string(),
            user_id: "u-1".to_string(),
            organization_id: "o-1".to_string(),
            state: None,
            status: ContractStatus::Draft,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            clauses: vec![],
            disclosures: vec![],
            addenda: vec![],
            documents: vec![],
        }
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn test_risk_level_bands() {
        assert_eq!(RiskLevel::from_score(100), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(80), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(79), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_score(60), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_score(40), RiskLevel::Elevated);
        assert_eq!(RiskLevel::from_score(20), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(19), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_score(0), RiskLevel::Critical);
    }

    #[test]
    fn test_rule_result_pass_iff_no_flags() {
        let pass = RuleResult::from_flags("R", "Rule", vec![]);
        assert!(pass.passed);

        let fail = RuleResult::from_flags(
            "R",
            "Rule",
            vec![RiskFlag::new("R_X", "finding", Severity::Low)],
        );
        assert!(!fail.passed);
        assert_eq!(fail.flags.len(), 1);
    }

    #[test]
    fn test_context_text_prefers_supplied_text() {
        let mut contract = empty_contract();
        contract.clauses.push(Clause::standard("from clauses"));

        let derived = RuleContext::new(contract.clone());
        assert_eq!(derived.text(), "from clauses");

        let supplied = RuleContext::new(contract).with_text("raw text wins");
        assert_eq!(supplied.text(), "raw text wins");
    }

    #[test]
    fn test_context_text_joins_clauses() {
        let mut contract = empty_contract();
        contract.clauses.push(Clause::standard("first"));
        contract.clauses.push(Clause::standard("second"));

        let ctx = RuleContext::new(contract);
        assert_eq!(ctx.text(), "first\nsecond");
    }

    #[test]
    fn test_missing_disclosures() {
        let mut contract = empty_contract();
        contract
            .disclosures
            .push(Disclosure::new("TDS", true, false));
        contract
            .disclosures
            .push(Disclosure::new("NHD", true, true));
        contract
            .disclosures
            .push(Disclosure::new("Optional Extra", false, false));

        let missing = contract.missing_disclosures();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].name, "TDS");
    }

    #[test]
    fn test_recommendation_priority_from_severity() {
        assert_eq!(
            RecommendationPriority::from_severity(Severity::Critical),
            RecommendationPriority::Immediate
        );
        assert_eq!(
            RecommendationPriority::from_severity(Severity::High),
            RecommendationPriority::Immediate
        );
        assert_eq!(
            RecommendationPriority::from_severity(Severity::Medium),
            RecommendationPriority::Soon
        );
        assert_eq!(
            RecommendationPriority::from_severity(Severity::Low),
            RecommendationPriority::Optional
        );
    }

    #[test]
    fn test_breakdown_serializes_stable_keys() {
        let breakdown = ScoreBreakdown {
            clause_score: 0.6,
            ..Default::default()
        };
        let json = serde_json::to_value(&breakdown).unwrap();
        assert!(json.get("clauseScore").is_some());
        assert!(json.get("disclosureScore").is_some());
        assert!(json.get("addendumScore").is_some());
        assert!(json.get("unusualClauseScore").is_some());
        assert!(json.get("missingDocumentScore").is_some());
        assert!(json.get("stateComplianceScore").is_some());
    }
}
