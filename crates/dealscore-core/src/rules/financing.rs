//! Financing rules: contingency presence, timeline, loan terms,
//! pre-approval, and appraisal contingency.

use crate::types::{RuleContext, RuleResult, Severity};

use super::helpers::{contains_any, contains_keyword, days_near, is_cash_purchase, PERCENT_PATTERN};
use super::{Rule, RuleCategory, RuleConfig};

/// Window of characters scanned after a keyword for associated numbers.
const NEAR_WINDOW: usize = 120;

/// Fails `MISSING` unless the contract is an all-cash purchase; adds
/// `WAIVED` when waiver language co-occurs with financing language.
pub struct FinancingContingencyRule {
    config: RuleConfig,
}

impl FinancingContingencyRule {
    pub fn new() -> Self {
        Self {
            config: RuleConfig::new(Severity::Critical),
        }
    }
}

impl Default for FinancingContingencyRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for FinancingContingencyRule {
    fn id(&self) -> &'static str {
        "FIN_CONTINGENCY"
    }
    fn name(&self) -> &'static str {
        "Financing contingency"
    }
    fn description(&self) -> &'static str {
        "Checks that a financed purchase carries a financing contingency"
    }
    fn category(&self) -> RuleCategory {
        RuleCategory::Contingency
    }
    fn config(&self) -> &RuleConfig {
        &self.config
    }
    fn configure(&mut self, config: RuleConfig) {
        self.config = config;
    }

    fn evaluate(&self, ctx: &RuleContext) -> RuleResult {
        let text = ctx.text();
        if is_cash_purchase(&text) {
            return self.pass();
        }

        let mut flags = Vec::new();

        let present =
            contains_any(&text, &["financing contingency", "loan contingency"]);
        if !present {
            flags.push(self.flag(
                "MISSING",
                "No financing contingency found in a financed purchase",
                self.severity_for(ctx.state_code()),
            ));
        }

        if contains_keyword(&text, "waive") && contains_keyword(&text, "financing") {
            flags.push(self.flag(
                "WAIVED",
                "Financing contingency appears to be waived",
                Severity::High,
            ));
        }

        if flags.is_empty() {
            self.pass()
        } else {
            self.result(flags)
                .with_suggestion("Add or restore a financing contingency before removal deadlines")
        }
    }
}

/// Extracts the day count near "financing contingency" and checks it
/// against the typical range.
pub struct FinancingTimelineRule {
    config: RuleConfig,
}

impl FinancingTimelineRule {
    pub const DEFAULT_MIN_DAYS: f64 = 17.0;
    pub const DEFAULT_MAX_DAYS: f64 = 30.0;

    pub fn new() -> Self {
        Self {
            config: RuleConfig::new(Severity::Medium),
        }
    }
}

impl Default for FinancingTimelineRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for FinancingTimelineRule {
    fn id(&self) -> &'static str {
        "FIN_TIMELINE"
    }
    fn name(&self) -> &'static str {
        "Financing contingency timeline"
    }
    fn description(&self) -> &'static str {
        "Checks the financing contingency period against the typical range"
    }
    fn category(&self) -> RuleCategory {
        RuleCategory::Timeline
    }
    fn config(&self) -> &RuleConfig {
        &self.config
    }
    fn configure(&mut self, config: RuleConfig) {
        self.config = config;
    }

    fn evaluate(&self, ctx: &RuleContext) -> RuleResult {
        let text = ctx.text();

        // Nothing to time when no financing contingency period is stated;
        // FIN_CONTINGENCY owns the missing case.
        let days = match days_near(&text, "financing contingency", NEAR_WINDOW) {
            Some(days) => days,
            None => return self.pass(),
        };

        let min_days = self.config.threshold("min_days", Self::DEFAULT_MIN_DAYS);
        let max_days = self.config.threshold("max_days", Self::DEFAULT_MAX_DAYS);
        let severity = self.severity_for(ctx.state_code());

        let mut flags = Vec::new();
        if (days as f64) < min_days {
            flags.push(self.flag(
                "TOO_SHORT",
                format!(
                    "Financing contingency period of {} days is below the typical minimum of {} days",
                    days, min_days
                ),
                severity,
            ));
        } else if (days as f64) > max_days {
            flags.push(self.flag(
                "TOO_LONG",
                format!(
                    "Financing contingency period of {} days exceeds the typical maximum of {} days",
                    days, max_days
                ),
                severity,
            ));
        }

        self.result(flags)
    }
}

/// Loan-term red flags: high LTV, adjustable rate, interest-only, balloon
/// payment, negative amortization, hard-money lending.
pub struct LoanTermsRule {
    config: RuleConfig,
}

impl LoanTermsRule {
    pub const DEFAULT_MAX_LTV: f64 = 95.0;

    pub fn new() -> Self {
        Self {
            config: RuleConfig::new(Severity::Medium),
        }
    }

    fn ltv_percent(text: &str) -> Option<f64> {
        let lower = text.to_lowercase();
        let at = lower.find("ltv").or_else(|| lower.find("loan-to-value"))?;
        PERCENT_PATTERN
            .captures(super::helpers::window_around(text, at, 40))
            .and_then(|caps| caps[1].parse().ok())
    }
}

impl Default for LoanTermsRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for LoanTermsRule {
    fn id(&self) -> &'static str {
        "LOAN_TERMS"
    }
    fn name(&self) -> &'static str {
        "Loan terms"
    }
    fn description(&self) -> &'static str {
        "Flags high-risk loan structures referenced by the contract"
    }
    fn category(&self) -> RuleCategory {
        RuleCategory::Financing
    }
    fn config(&self) -> &RuleConfig {
        &self.config
    }
    fn configure(&mut self, config: RuleConfig) {
        self.config = config;
    }

    fn evaluate(&self, ctx: &RuleContext) -> RuleResult {
        let text = ctx.text();
        let mut flags = Vec::new();

        let max_ltv = self.config.threshold("max_ltv", Self::DEFAULT_MAX_LTV);
        if let Some(ltv) = Self::ltv_percent(&text) {
            if ltv > max_ltv {
                flags.push(self.flag(
                    "HIGH_LTV",
                    format!("Loan-to-value ratio of {}% exceeds {}%", ltv, max_ltv),
                    Severity::High,
                ));
            }
        }

        if contains_any(&text, &["adjustable-rate", "adjustable rate"]) {
            flags.push(self.flag(
                "ADJUSTABLE",
                "Adjustable-rate financing referenced",
                Severity::Medium,
            ));
        }
        if contains_any(&text, &["interest-only", "interest only"]) {
            flags.push(self.flag(
                "INTEREST_ONLY",
                "Interest-only financing referenced",
                Severity::Medium,
            ));
        }
        if contains_keyword(&text, "balloon") {
            flags.push(self.flag(
                "BALLOON",
                "Balloon payment referenced",
                Severity::High,
            ));
        }
        if contains_keyword(&text, "negative amortization") {
            flags.push(self.flag(
                "NEGATIVE_AMORTIZATION",
                "Negative amortization referenced",
                Severity::High,
            ));
        }
        if contains_keyword(&text, "hard money") {
            flags.push(self.flag(
                "HARD_MONEY",
                "Hard-money lending referenced",
                Severity::High,
            ));
        }

        self.result(flags)
    }
}

/// Checks whether the buyer documents pre-approval (or at least
/// pre-qualification) for a financed purchase.
pub struct PreApprovalRule {
    config: RuleConfig,
}

impl PreApprovalRule {
    pub fn new() -> Self {
        Self {
            config: RuleConfig::new(Severity::Medium),
        }
    }
}

impl Default for PreApprovalRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for PreApprovalRule {
    fn id(&self) -> &'static str {
        "PRE_APPROVAL"
    }
    fn name(&self) -> &'static str {
        "Loan pre-approval"
    }
    fn description(&self) -> &'static str {
        "Checks that a financed buyer is pre-approved, not merely pre-qualified"
    }
    fn category(&self) -> RuleCategory {
        RuleCategory::Financing
    }
    fn config(&self) -> &RuleConfig {
        &self.config
    }
    fn configure(&mut self, config: RuleConfig) {
        self.config = config;
    }

    fn evaluate(&self, ctx: &RuleContext) -> RuleResult {
        let text = ctx.text();
        if is_cash_purchase(&text) {
            return self.pass();
        }

        let preapproved = contains_any(
            &text,
            &["pre-approval", "pre-approved", "preapproval", "preapproved"],
        );
        let prequalified = contains_any(
            &text,
            &[
                "pre-qualification",
                "pre-qualified",
                "prequalification",
                "prequalified",
            ],
        );

        if preapproved {
            return self.pass();
        }

        let flags = if prequalified {
            vec![self.flag(
                "PREQUAL_ONLY",
                "Buyer is only pre-qualified, not pre-approved",
                Severity::Low,
            )]
        } else {
            vec![self.flag(
                "NO_PREAPPROVAL",
                "No pre-approval or pre-qualification referenced for a financed purchase",
                self.severity_for(ctx.state_code()),
            )]
        };

        self.result(flags)
            .with_suggestion("Obtain and attach a lender pre-approval letter")
    }
}

/// Appraisal contingency presence; waived appraisals carry real exposure
/// in a financed purchase.
pub struct AppraisalContingencyRule {
    config: RuleConfig,
}

impl AppraisalContingencyRule {
    pub fn new() -> Self {
        Self {
            config: RuleConfig::new(Severity::High),
        }
    }
}

impl Default for AppraisalContingencyRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for AppraisalContingencyRule {
    fn id(&self) -> &'static str {
        "APPRAISAL"
    }
    fn name(&self) -> &'static str {
        "Appraisal contingency"
    }
    fn description(&self) -> &'static str {
        "Checks that a financed purchase keeps an appraisal contingency"
    }
    fn category(&self) -> RuleCategory {
        RuleCategory::Contingency
    }
    fn config(&self) -> &RuleConfig {
        &self.config
    }
    fn configure(&mut self, config: RuleConfig) {
        self.config = config;
    }

    fn evaluate(&self, ctx: &RuleContext) -> RuleResult {
        let text = ctx.text();
        if is_cash_purchase(&text) {
            return self.pass();
        }

        let severity = self.severity_for(ctx.state_code());
        let mut flags = Vec::new();

        if !contains_keyword(&text, "appraisal") {
            flags.push(self.flag(
                "MISSING",
                "No appraisal contingency found in a financed purchase",
                severity,
            ));
        } else if contains_keyword(&text, "waive") && contains_keyword(&text, "appraisal") {
            flags.push(self.flag(
                "WAIVED",
                "Appraisal contingency appears to be waived",
                severity,
            ));
        }

        self.result(flags)
    }
}
