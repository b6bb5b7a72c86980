//! Earnest-money rules: deposit amount, deposit timeline, escrow holder,
//! and refund conditions.

use crate::types::{RuleContext, RuleResult, Severity};

use super::helpers::{contains_any, contains_keyword, days_near, dollar_amount_near};
use super::{Rule, RuleCategory, RuleConfig};

const NEAR_WINDOW: usize = 120;

/// Earnest-money deposit as a percentage of the purchase price, checked
/// against the typical 1-3% range.
pub struct EarnestMoneyAmountRule {
    config: RuleConfig,
}

impl EarnestMoneyAmountRule {
    pub const DEFAULT_MIN_PERCENT: f64 = 1.0;
    pub const DEFAULT_MAX_PERCENT: f64 = 3.0;

    pub fn new() -> Self {
        Self {
            config: RuleConfig::new(Severity::Medium),
        }
    }
}

impl Default for EarnestMoneyAmountRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for EarnestMoneyAmountRule {
    fn id(&self) -> &'static str {
        "EMD_AMOUNT"
    }
    fn name(&self) -> &'static str {
        "Earnest money amount"
    }
    fn description(&self) -> &'static str {
        "Checks the deposit amount against the typical share of purchase price"
    }
    fn category(&self) -> RuleCategory {
        RuleCategory::EarnestMoney
    }
    fn config(&self) -> &RuleConfig {
        &self.config
    }
    fn configure(&mut self, config: RuleConfig) {
        self.config = config;
    }

    fn evaluate(&self, ctx: &RuleContext) -> RuleResult {
        let text = ctx.text();

        let emd = dollar_amount_near(&text, "earnest money", NEAR_WINDOW);
        let price = dollar_amount_near(&text, "purchase price", NEAR_WINDOW);

        let (emd, price) = match (emd, price) {
            (Some(emd), Some(price)) if price > 0.0 => (emd, price),
            _ => return self.pass(),
        };

        let percentage = emd / price * 100.0;
        let min_percent = self
            .config
            .threshold("min_percent", Self::DEFAULT_MIN_PERCENT);
        let max_percent = self
            .config
            .threshold("max_percent", Self::DEFAULT_MAX_PERCENT);
        let severity = self.severity_for(ctx.state_code());

        let mut flags = Vec::new();
        if percentage < min_percent {
            flags.push(self.flag(
                "TOO_LOW",
                format!(
                    "Earnest money of {:.2}% is below the typical minimum of {}%",
                    percentage, min_percent
                ),
                severity,
            ));
        } else if percentage > max_percent {
            flags.push(self.flag(
                "TOO_HIGH",
                format!(
                    "Earnest money of {:.2}% exceeds the typical maximum of {}%",
                    percentage, max_percent
                ),
                severity,
            ));
        }

        self.result(flags)
            .with_details(format!("deposit {:.2}% of purchase price", percentage))
    }
}

/// Deposit delivery window. Canonical codes: `EMD_TIMELINE_LONG` and
/// `EMD_TIMELINE_MISSING`.
pub struct EarnestMoneyTimelineRule {
    config: RuleConfig,
}

impl EarnestMoneyTimelineRule {
    pub const DEFAULT_MAX_DAYS: f64 = 7.0;

    pub fn new() -> Self {
        Self {
            config: RuleConfig::new(Severity::Medium),
        }
    }
}

impl Default for EarnestMoneyTimelineRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for EarnestMoneyTimelineRule {
    fn id(&self) -> &'static str {
        "EMD"
    }
    fn name(&self) -> &'static str {
        "Earnest money timeline"
    }
    fn description(&self) -> &'static str {
        "Checks that the deposit is due within a typical window"
    }
    fn category(&self) -> RuleCategory {
        RuleCategory::EarnestMoney
    }
    fn config(&self) -> &RuleConfig {
        &self.config
    }
    fn configure(&mut self, config: RuleConfig) {
        self.config = config;
    }

    fn evaluate(&self, ctx: &RuleContext) -> RuleResult {
        let text = ctx.text();
        let severity = self.severity_for(ctx.state_code());

        let days = days_near(&text, "deposit", NEAR_WINDOW)
            .or_else(|| days_near(&text, "earnest money", NEAR_WINDOW));

        let flags = match days {
            Some(days) => {
                let max_days = self.config.threshold("max_days", Self::DEFAULT_MAX_DAYS);
                if (days as f64) > max_days {
                    vec![self.flag(
                        "TIMELINE_LONG",
                        format!(
                            "Earnest money deposit window of {} days exceeds the typical {} days",
                            days, max_days
                        ),
                        severity,
                    )]
                } else {
                    Vec::new()
                }
            }
            None => vec![self.flag(
                "TIMELINE_MISSING",
                "No deposit deadline stated for the earnest money",
                severity,
            )],
        };

        self.result(flags)
    }
}

/// Who holds the deposit. A neutral escrow or title company is expected;
/// seller- or agent-held deposits are flagged hard.
pub struct EscrowHolderRule {
    config: RuleConfig,
}

impl EscrowHolderRule {
    pub fn new() -> Self {
        Self {
            config: RuleConfig::new(Severity::High),
        }
    }
}

impl Default for EscrowHolderRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for EscrowHolderRule {
    fn id(&self) -> &'static str {
        "ESCROW"
    }
    fn name(&self) -> &'static str {
        "Escrow holder"
    }
    fn description(&self) -> &'static str {
        "Checks that a neutral party holds the earnest money"
    }
    fn category(&self) -> RuleCategory {
        RuleCategory::EarnestMoney
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

        if !contains_any(&text, &["escrow", "title company"]) {
            flags.push(self.flag(
                "NO_ESCROW_HOLDER",
                "No escrow or title company referenced to hold the deposit",
                self.severity_for(ctx.state_code()),
            ));
        }

        if contains_any(&text, &["seller holds", "direct to seller", "paid to seller"]) {
            flags.push(self.flag(
                "RISKY_ESCROW",
                "Deposit is held by or paid directly to the seller",
                Severity::Critical,
            ));
        } else if contains_keyword(&text, "agent holds") {
            flags.push(self.flag(
                "RISKY_ESCROW",
                "Deposit is held by an agent rather than a neutral escrow",
                Severity::High,
            ));
        }

        self.result(flags)
    }
}

/// Refundability of the deposit: missing refund terms, non-refundable
/// deposits, and liquidated-damages clauses.
pub struct RefundConditionsRule {
    config: RuleConfig,
}

impl RefundConditionsRule {
    pub fn new() -> Self {
        Self {
            config: RuleConfig::new(Severity::High),
        }
    }
}

impl Default for RefundConditionsRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for RefundConditionsRule {
    fn id(&self) -> &'static str {
        "EMD_REFUND"
    }
    fn name(&self) -> &'static str {
        "Earnest money refund conditions"
    }
    fn description(&self) -> &'static str {
        "Checks the conditions under which the deposit is returned"
    }
    fn category(&self) -> RuleCategory {
        RuleCategory::EarnestMoney
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

        if contains_any(&text, &["non-refundable", "nonrefundable", "non refundable"]) {
            flags.push(self.flag(
                "NON_REFUNDABLE",
                "Earnest money is stated to be non-refundable",
                Severity::Critical,
            ));
        } else if !contains_keyword(&text, "refund") {
            flags.push(self.flag(
                "NO_REFUND_TERMS",
                "No refund conditions stated for the earnest money",
                self.severity_for(ctx.state_code()),
            ));
        }

        if contains_keyword(&text, "liquidated damages") {
            flags.push(self.flag(
                "LIQUIDATED_DAMAGES",
                "Deposit is subject to a liquidated-damages clause",
                Severity::Medium,
            ));
        }

        self.result(flags)
    }
}
