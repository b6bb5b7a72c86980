//! Disclosure rules: missing required disclosures, completeness against a
//! required set, HOA document coverage, and disclosure age.

use chrono::{NaiveDate, Utc};

use crate::types::{RuleContext, RuleResult, Severity};

use super::helpers::{contains_any, DATED_PATTERN};
use super::{Rule, RuleCategory, RuleConfig};

/// Severity of a missing disclosure, derived from its name: standard
/// statutory forms are critical, property-condition forms high, the rest
/// medium.
fn severity_for_disclosure(name: &str) -> Severity {
    let lower = name.to_lowercase();
    if ["transfer disclosure", "tds", "seller disclosure", "seller's disclosure", "lead"]
        .iter()
        .any(|kw| lower.contains(kw))
    {
        Severity::Critical
    } else if ["property condition", "pcds", "natural hazard", "nhd"]
        .iter()
        .any(|kw| lower.contains(kw))
    {
        Severity::High
    } else {
        Severity::Medium
    }
}

/// One `MISSING` flag per disclosure that is required but not provided.
pub struct DisclosureMissingRule {
    config: RuleConfig,
}

impl DisclosureMissingRule {
    pub fn new() -> Self {
        Self {
            config: RuleConfig::new(Severity::Medium),
        }
    }
}

impl Default for DisclosureMissingRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for DisclosureMissingRule {
    fn id(&self) -> &'static str {
        "DISCLOSURE"
    }
    fn name(&self) -> &'static str {
        "Missing disclosures"
    }
    fn description(&self) -> &'static str {
        "Flags each disclosure marked required but not provided"
    }
    fn category(&self) -> RuleCategory {
        RuleCategory::Disclosure
    }
    fn config(&self) -> &RuleConfig {
        &self.config
    }
    fn configure(&mut self, config: RuleConfig) {
        self.config = config;
    }

    fn evaluate(&self, ctx: &RuleContext) -> RuleResult {
        let flags = ctx
            .contract
            .missing_disclosures()
            .into_iter()
            .map(|d| {
                self.flag(
                    "MISSING",
                    format!("Required disclosure not provided: {}", d.name),
                    severity_for_disclosure(&d.name),
                )
            })
            .collect();

        self.result(flags)
    }
}

/// Matches a configurable required-set against provided disclosure names,
/// case-insensitive substring in either direction.
pub struct DisclosureCompletenessRule {
    config: RuleConfig,
    required: Vec<String>,
}

impl DisclosureCompletenessRule {
    pub fn new() -> Self {
        Self {
            config: RuleConfig::new(Severity::High),
            required: vec!["lead-based paint disclosure".to_string()],
        }
    }

    /// Replace the required disclosure set.
    pub fn with_required(mut self, required: Vec<String>) -> Self {
        self.required = required;
        self
    }

    fn is_covered(provided: &[&str], required: &str) -> bool {
        let required = required.to_lowercase();
        provided.iter().any(|name| {
            let name = name.to_lowercase();
            name.contains(&required) || required.contains(&name)
        })
    }
}

impl Default for DisclosureCompletenessRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for DisclosureCompletenessRule {
    fn id(&self) -> &'static str {
        "DISCLOSURE_SET"
    }
    fn name(&self) -> &'static str {
        "Disclosure completeness"
    }
    fn description(&self) -> &'static str {
        "Checks the provided disclosures against the required set"
    }
    fn category(&self) -> RuleCategory {
        RuleCategory::Disclosure
    }
    fn config(&self) -> &RuleConfig {
        &self.config
    }
    fn configure(&mut self, config: RuleConfig) {
        self.config = config;
    }

    fn evaluate(&self, ctx: &RuleContext) -> RuleResult {
        let provided = ctx.contract.provided_disclosure_names();
        let severity = self.severity_for(ctx.state_code());

        let flags = self
            .required
            .iter()
            .filter(|required| !Self::is_covered(&provided, required))
            .map(|required| {
                self.flag(
                    "INCOMPLETE",
                    format!("Required disclosure set is missing: {}", required),
                    severity,
                )
            })
            .collect();

        self.result(flags)
    }
}

/// When the transaction involves an HOA, each of the standard HOA document
/// packages must appear among the provided disclosures.
pub struct HoaDisclosureRule {
    config: RuleConfig,
}

impl HoaDisclosureRule {
    /// (document label, match keyword) pairs checked once an HOA is
    /// detected.
    const REQUIRED_DOCS: &'static [(&'static str, &'static str)] = &[
        ("HOA documents", "hoa document"),
        ("CC&Rs", "cc&r"),
        ("HOA financial statements", "financial statement"),
        ("Special assessments", "special assessment"),
    ];

    pub fn new() -> Self {
        Self {
            config: RuleConfig::new(Severity::High),
        }
    }
}

impl Default for HoaDisclosureRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for HoaDisclosureRule {
    fn id(&self) -> &'static str {
        "HOA"
    }
    fn name(&self) -> &'static str {
        "HOA disclosures"
    }
    fn description(&self) -> &'static str {
        "Checks HOA document coverage when an HOA is involved"
    }
    fn category(&self) -> RuleCategory {
        RuleCategory::Disclosure
    }
    fn config(&self) -> &RuleConfig {
        &self.config
    }
    fn configure(&mut self, config: RuleConfig) {
        self.config = config;
    }

    fn evaluate(&self, ctx: &RuleContext) -> RuleResult {
        let text = ctx.text();
        let has_hoa = contains_any(&text, &["hoa", "homeowners association"])
            || ctx.contract.disclosures.iter().any(|d| {
                let name = d.name.to_lowercase();
                name.contains("hoa") || name.contains("association")
            });

        if !has_hoa {
            return self.pass();
        }

        let provided: Vec<String> = ctx
            .contract
            .provided_disclosure_names()
            .iter()
            .map(|name| name.to_lowercase())
            .collect();
        let severity = self.severity_for(ctx.state_code());

        let flags = Self::REQUIRED_DOCS
            .iter()
            .filter(|(_, keyword)| !provided.iter().any(|name| name.contains(keyword)))
            .map(|(label, _)| {
                self.flag(
                    "MISSING",
                    format!("HOA transaction is missing: {}", label),
                    severity,
                )
            })
            .collect();

        self.result(flags)
    }
}

/// Flags disclosures dated more than `max_age_days` ago; a disclosure more
/// than a year old escalates to high.
///
/// The one rule allowed to consult the wall clock.
pub struct DisclosureAgeRule {
    config: RuleConfig,
}

impl DisclosureAgeRule {
    pub const DEFAULT_MAX_AGE_DAYS: f64 = 180.0;

    pub fn new() -> Self {
        Self {
            config: RuleConfig::new(Severity::Medium),
        }
    }
}

impl Default for DisclosureAgeRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for DisclosureAgeRule {
    fn id(&self) -> &'static str {
        "DISCLOSURE_AGE"
    }
    fn name(&self) -> &'static str {
        "Disclosure age"
    }
    fn description(&self) -> &'static str {
        "Flags disclosures dated too far in the past"
    }
    fn category(&self) -> RuleCategory {
        RuleCategory::Disclosure
    }
    fn config(&self) -> &RuleConfig {
        &self.config
    }
    fn configure(&mut self, config: RuleConfig) {
        self.config = config;
    }

    fn evaluate(&self, ctx: &RuleContext) -> RuleResult {
        let text = ctx.text();
        let max_age_days = self
            .config
            .threshold("max_age_days", Self::DEFAULT_MAX_AGE_DAYS);
        let today = Utc::now().date_naive();

        let mut flags = Vec::new();
        for caps in DATED_PATTERN.captures_iter(&text) {
            let Ok(date) = NaiveDate::parse_from_str(&caps[1], "%m/%d/%Y") else {
                continue;
            };
            let age_days = (today - date).num_days();
            if (age_days as f64) > max_age_days {
                let severity = if age_days > 365 {
                    Severity::High
                } else {
                    self.severity_for(ctx.state_code())
                };
                flags.push(self.flag(
                    "OUTDATED",
                    format!("Disclosure dated {} is {} days old", &caps[1], age_days),
                    severity,
                ));
            }
        }

        self.result(flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Clause, Contract, ContractStatus, Disclosure};
    use chrono::Duration;

    fn contract_with(disclosures: Vec<Disclosure>, text: &str) -> RuleContext {
        let contract = Contract {
            id: "c-1".to_string(),
            title: "Test".to_string(),
            user_id: "u-1".to_string(),
            organization_id: "o-1".to_string(),
            state: None,
            status: ContractStatus::Submitted,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            clauses: vec![Clause::standard(text)],
            disclosures,
            addenda: vec![],
            documents: vec![],
        };
        RuleContext::new(contract)
    }

    #[test]
    fn test_missing_disclosure_severity_by_name() {
        let rule = DisclosureMissingRule::new();
        let ctx = contract_with(
            vec![
                Disclosure::new("Transfer Disclosure Statement", true, false),
                Disclosure::new("Property Condition Report", true, false),
                Disclosure::new("Well Water Report", true, false),
            ],
            "",
        );

        let result = rule.evaluate(&ctx);
        assert_eq!(result.flags.len(), 3);
        assert_eq!(result.flags[0].severity, Severity::Critical);
        assert_eq!(result.flags[1].severity, Severity::High);
        assert_eq!(result.flags[2].severity, Severity::Medium);
        assert!(result.flags.iter().all(|f| f.code == "DISCLOSURE_MISSING"));
    }

    #[test]
    fn test_all_provided_passes() {
        let rule = DisclosureMissingRule::new();
        let ctx = contract_with(vec![Disclosure::new("TDS", true, true)], "");
        assert!(rule.evaluate(&ctx).passed);
    }

    #[test]
    fn test_completeness_substring_both_ways() {
        let rule = DisclosureCompletenessRule::new();

        // Provided name is longer than the required entry.
        let ctx = contract_with(
            vec![Disclosure::new("Federal Lead-Based Paint Disclosure Form", true, true)],
            "",
        );
        assert!(rule.evaluate(&ctx).passed);

        // Provided name is shorter than the required entry.
        let ctx = contract_with(
            vec![Disclosure::new("Lead-Based Paint", true, true)],
            "",
        );
        assert!(rule.evaluate(&ctx).passed);
    }

    #[test]
    fn test_completeness_missing() {
        let rule = DisclosureCompletenessRule::new();
        let ctx = contract_with(vec![Disclosure::new("TDS", true, true)], "");
        let result = rule.evaluate(&ctx);
        assert_eq!(result.flags[0].code, "DISCLOSURE_SET_INCOMPLETE");
    }

    #[test]
    fn test_hoa_not_detected_passes() {
        let rule = HoaDisclosureRule::new();
        let ctx = contract_with(vec![], "Single family home, no shared amenities.");
        assert!(rule.evaluate(&ctx).passed);
    }

    #[test]
    fn test_hoa_detected_flags_missing_docs() {
        let rule = HoaDisclosureRule::new();
        let ctx = contract_with(
            vec![Disclosure::new("HOA documents", true, true)],
            "Property is subject to HOA rules.",
        );
        let result = rule.evaluate(&ctx);
        // HOA documents are covered; the other three packages are not.
        assert_eq!(result.flags.len(), 3);
        assert!(result.flags.iter().all(|f| f.code == "HOA_MISSING"));
    }

    #[test]
    fn test_hoa_detected_via_disclosure_name() {
        let rule = HoaDisclosureRule::new();
        let ctx = contract_with(
            vec![Disclosure::new("Homeowners Association Addendum", true, false)],
            "No relevant text.",
        );
        let result = rule.evaluate(&ctx);
        assert_eq!(result.flags.len(), 4);
    }

    #[test]
    fn test_disclosure_age_recent_passes() {
        let rule = DisclosureAgeRule::new();
        let recent = (Utc::now() - Duration::days(30)).format("%m/%d/%Y");
        let text = format!("Inspection report dated {}.", recent);
        let ctx = contract_with(vec![], &text);
        assert!(rule.evaluate(&ctx).passed);
    }

    #[test]
    fn test_disclosure_age_outdated() {
        let rule = DisclosureAgeRule::new();
        let old = (Utc::now() - Duration::days(200)).format("%m/%d/%Y");
        let text = format!("Report dated {}.", old);
        let ctx = contract_with(vec![], &text);
        let result = rule.evaluate(&ctx);
        assert_eq!(result.flags[0].code, "DISCLOSURE_AGE_OUTDATED");
        assert_eq!(result.flags[0].severity, Severity::Medium);
    }

    #[test]
    fn test_disclosure_age_escalates_past_a_year() {
        let rule = DisclosureAgeRule::new();
        let old = (Utc::now() - Duration::days(400)).format("%m/%d/%Y");
        let text = format!("Survey as of {}.", old);
        let ctx = contract_with(vec![], &text);
        let result = rule.evaluate(&ctx);
        assert_eq!(result.flags[0].severity, Severity::High);
    }
}
