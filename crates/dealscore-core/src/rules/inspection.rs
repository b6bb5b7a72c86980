//! Inspection rules: contingency presence, timeline, required inspection
//! types, and repair terms.

use crate::types::{RuleContext, RuleResult, Severity};

use super::helpers::{contains_any, contains_keyword, days_near, is_cash_purchase};
use super::{Rule, RuleCategory, RuleConfig};

const NEAR_WINDOW: usize = 120;

/// Fails `MISSING` unless an inspection contingency (or a cash purchase)
/// is present; `WAIVED` and `AS_IS` capture waiver and as-is language.
pub struct InspectionContingencyRule {
    config: RuleConfig,
}

impl InspectionContingencyRule {
    pub fn new() -> Self {
        Self {
            config: RuleConfig::new(Severity::Critical),
        }
    }
}

impl Default for InspectionContingencyRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for InspectionContingencyRule {
    fn id(&self) -> &'static str {
        "INSP_CONTINGENCY"
    }
    fn name(&self) -> &'static str {
        "Inspection contingency"
    }
    fn description(&self) -> &'static str {
        "Checks that the purchase keeps an inspection contingency"
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
        let severity = self.severity_for(ctx.state_code());
        let mut flags = Vec::new();

        let present = contains_keyword(&text, "inspection contingency");
        if !present && !is_cash_purchase(&text) {
            flags.push(self.flag(
                "MISSING",
                "No inspection contingency found",
                severity,
            ));
        }

        if contains_keyword(&text, "waive") && contains_keyword(&text, "inspection") {
            flags.push(self.flag(
                "WAIVED",
                "Inspection contingency appears to be waived",
                severity,
            ));
        } else if contains_any(&text, &["as-is", "as is"]) {
            flags.push(self.flag(
                "AS_IS",
                "Property is being sold as-is",
                Severity::High,
            ));
        }

        self.result(flags)
    }
}

/// Inspection period length against the typical range; `NO_TIMELINE` when
/// inspections are referenced without an extractable day count.
pub struct InspectionTimelineRule {
    config: RuleConfig,
}

impl InspectionTimelineRule {
    pub const DEFAULT_MIN_DAYS: f64 = 7.0;
    pub const DEFAULT_MAX_DAYS: f64 = 17.0;

    pub fn new() -> Self {
        Self {
            config: RuleConfig::new(Severity::Medium),
        }
    }
}

impl Default for InspectionTimelineRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for InspectionTimelineRule {
    fn id(&self) -> &'static str {
        "INSP_TIMELINE"
    }
    fn name(&self) -> &'static str {
        "Inspection timeline"
    }
    fn description(&self) -> &'static str {
        "Checks the inspection period against the typical range"
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

        // INSP_CONTINGENCY owns the wholly-missing case.
        if !contains_keyword(&text, "inspection") {
            return self.pass();
        }

        let severity = self.severity_for(ctx.state_code());
        let days = match days_near(&text, "inspection", NEAR_WINDOW) {
            Some(days) => days,
            None => {
                return self.result(vec![self.flag(
                    "NO_TIMELINE",
                    "Inspections are referenced without a stated period",
                    severity,
                )]);
            }
        };

        let min_days = self.config.threshold("min_days", Self::DEFAULT_MIN_DAYS);
        let max_days = self.config.threshold("max_days", Self::DEFAULT_MAX_DAYS);

        let mut flags = Vec::new();
        if (days as f64) < min_days {
            flags.push(self.flag(
                "TOO_SHORT",
                format!(
                    "Inspection period of {} days is below the typical minimum of {} days",
                    days, min_days
                ),
                severity,
            ));
        } else if (days as f64) > max_days {
            flags.push(self.flag(
                "TOO_LONG",
                format!(
                    "Inspection period of {} days exceeds the typical maximum of {} days",
                    days, max_days
                ),
                severity,
            ));
        }

        self.result(flags)
    }
}

/// Flags the absence of a home inspection and a pest inspection
/// independently.
pub struct RequiredInspectionsRule {
    config: RuleConfig,
}

impl RequiredInspectionsRule {
    pub fn new() -> Self {
        Self {
            config: RuleConfig::new(Severity::Medium),
        }
    }
}

impl Default for RequiredInspectionsRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for RequiredInspectionsRule {
    fn id(&self) -> &'static str {
        "INSP_REQUIRED"
    }
    fn name(&self) -> &'static str {
        "Required inspections"
    }
    fn description(&self) -> &'static str {
        "Checks that standard home and pest inspections are called for"
    }
    fn category(&self) -> RuleCategory {
        RuleCategory::Inspection
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
        let mut flags = Vec::new();

        if !contains_keyword(&text, "home inspection") {
            flags.push(self.flag(
                "NO_HOME_INSPECTION",
                "No home inspection referenced",
                severity,
            ));
        }
        if !contains_keyword(&text, "pest inspection") {
            flags.push(self.flag(
                "NO_PEST_INSPECTION",
                "No pest inspection referenced",
                severity,
            ));
        }

        self.result(flags)
    }
}

/// Repair-term review: repair caps, seller-favorable repair language, and
/// credit-in-lieu options.
pub struct InspectionRepairRule {
    config: RuleConfig,
}

impl InspectionRepairRule {
    pub fn new() -> Self {
        Self {
            config: RuleConfig::new(Severity::Medium),
        }
    }
}

impl Default for InspectionRepairRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for InspectionRepairRule {
    fn id(&self) -> &'static str {
        "INSP_REPAIR"
    }
    fn name(&self) -> &'static str {
        "Inspection repair terms"
    }
    fn description(&self) -> &'static str {
        "Reviews repair caps, risky repair language, and credit options"
    }
    fn category(&self) -> RuleCategory {
        RuleCategory::Inspection
    }
    fn config(&self) -> &RuleConfig {
        &self.config
    }
    fn configure(&mut self, config: RuleConfig) {
        self.config = config;
    }

    fn evaluate(&self, ctx: &RuleContext) -> RuleResult {
        let text = ctx.text();

        // Only meaningful when the contract talks about inspections at all.
        if !contains_keyword(&text, "inspection") {
            return self.pass();
        }

        let mut flags = Vec::new();

        if !contains_any(&text, &["repair cap", "repair limit", "repairs not to exceed"]) {
            flags.push(self.flag(
                "NO_REPAIR_CAP",
                "No cap on repair obligations stated",
                Severity::Low,
            ));
        }

        if contains_any(
            &text,
            &[
                "seller not responsible",
                "seller shall not be responsible",
                "no repairs will be made",
            ],
        ) {
            flags.push(self.flag(
                "RISKY_REPAIR_TERMS",
                "Seller disclaims repair responsibility",
                Severity::High,
            ));
        }

        if !contains_keyword(&text, "credit") {
            flags.push(self.flag(
                "NO_CREDIT_OPTION",
                "No credit-in-lieu-of-repairs option stated",
                Severity::Low,
            ));
        }

        self.result(flags)
    }
}
