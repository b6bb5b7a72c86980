//! New York state rules.

use crate::types::{RiskFlag, RuleContext, Severity};

use super::super::helpers::dollar_amount_near;
use super::super::{Rule, RuleConfig};
use super::{apply_config, has_disclosure, text_mentions, StateRule};

/// Purchase price at which the mansion tax attaches.
const MANSION_TAX_THRESHOLD: f64 = 1_000_000.0;

pub(super) fn rules(config: Option<&RuleConfig>) -> Vec<Box<dyn Rule>> {
    let rules: Vec<Box<dyn Rule>> = vec![
        Box::new(StateRule::new(
            "NY_PCDS",
            "Property Condition Disclosure Statement",
            "New York requires the PCDS or the statutory credit",
            Severity::High,
            check_pcds,
        )),
        Box::new(StateRule::new(
            "NY_LEAD_PAINT",
            "Lead paint disclosure",
            "Lead-based paint disclosure must be provided",
            Severity::Critical,
            check_lead_paint,
        )),
        Box::new(StateRule::new(
            "NY_ATTORNEY_REVIEW",
            "Attorney review",
            "New York purchases are customarily subject to attorney review",
            Severity::Medium,
            check_attorney_review,
        )),
        Box::new(StateRule::new(
            "NY_BOARD_APPROVAL",
            "Co-op board approval",
            "Co-op purchases must be contingent on board approval",
            Severity::Critical,
            check_board_approval,
        )),
        Box::new(StateRule::new(
            "NY_MANSION_TAX",
            "Mansion tax",
            "Purchases at or above $1,000,000 attract the mansion tax",
            Severity::Medium,
            check_mansion_tax,
        )),
        Box::new(StateRule::new(
            "NY_DETECTORS",
            "Detector affidavit",
            "Smoke and carbon monoxide detector affidavit",
            Severity::Low,
            check_detectors,
        )),
    ];
    apply_config(rules, config)
}

fn check_pcds(rule: &StateRule, ctx: &RuleContext) -> Vec<RiskFlag> {
    if has_disclosure(ctx, &["property condition", "pcds"])
        || text_mentions(ctx, &["$500 credit"])
    {
        return Vec::new();
    }
    vec![rule.flag(
        "MISSING",
        "Property Condition Disclosure Statement not provided",
        rule.severity_for(ctx.state_code()),
    )]
}

fn check_lead_paint(rule: &StateRule, ctx: &RuleContext) -> Vec<RiskFlag> {
    if has_disclosure(ctx, &["lead"]) {
        return Vec::new();
    }
    vec![rule.flag(
        "MISSING",
        "Lead-based paint disclosure not provided",
        rule.severity_for(ctx.state_code()),
    )]
}

fn check_attorney_review(rule: &StateRule, ctx: &RuleContext) -> Vec<RiskFlag> {
    if text_mentions(ctx, &["attorney review", "attorney approval"]) {
        return Vec::new();
    }
    vec![rule.flag(
        "NO_ATTORNEY_REVIEW",
        "No attorney review or approval period referenced",
        rule.severity_for(ctx.state_code()),
    )]
}

fn check_board_approval(rule: &StateRule, ctx: &RuleContext) -> Vec<RiskFlag> {
    let coop = text_mentions(ctx, &["co-op", "cooperative"]);
    if coop && !text_mentions(ctx, &["board approval"]) {
        return vec![rule.flag(
            "NO_BOARD_CONTINGENCY",
            "Co-op purchase without a board approval contingency",
            rule.severity_for(ctx.state_code()),
        )];
    }
    Vec::new()
}

fn check_mansion_tax(rule: &StateRule, ctx: &RuleContext) -> Vec<RiskFlag> {
    let text = ctx.text();
    let price = dollar_amount_near(&text, "purchase price", 120);
    if let Some(price) = price {
        if price >= MANSION_TAX_THRESHOLD && !text_mentions(ctx, &["mansion tax"]) {
            return vec![rule.flag(
                "NOT_ADDRESSED",
                format!(
                    "Purchase price of ${:.0} attracts the mansion tax, which the contract does not address",
                    price
                ),
                rule.severity_for(ctx.state_code()),
            )];
        }
    }
    Vec::new()
}

fn check_detectors(rule: &StateRule, ctx: &RuleContext) -> Vec<RiskFlag> {
    let mentioned = text_mentions(ctx, &["smoke detector", "carbon monoxide"]);
    if mentioned && !text_mentions(ctx, &["affidavit", "compliant", "compliance"]) {
        return vec![rule.flag(
            "NO_AFFIDAVIT",
            "Detectors referenced without the affidavit",
            rule.severity_for(ctx.state_code()),
        )];
    }
    Vec::new()
}
