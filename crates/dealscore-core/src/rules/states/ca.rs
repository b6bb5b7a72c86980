//! California state rules.

use crate::types::{RiskFlag, RuleContext, Severity};

use super::super::{Rule, RuleConfig};
use super::{apply_config, has_disclosure, text_mentions, StateRule};

pub(super) fn rules(config: Option<&RuleConfig>) -> Vec<Box<dyn Rule>> {
    let rules: Vec<Box<dyn Rule>> = vec![
        Box::new(StateRule::new(
            "CA_TDS",
            "Transfer Disclosure Statement",
            "California requires a Transfer Disclosure Statement",
            Severity::Critical,
            check_tds,
        )),
        Box::new(StateRule::new(
            "CA_NHD",
            "Natural Hazard Disclosure",
            "California requires a Natural Hazard Disclosure statement",
            Severity::High,
            check_nhd,
        )),
        Box::new(StateRule::new(
            "CA_MELLO_ROOS",
            "Mello-Roos disclosure",
            "Mello-Roos special tax districts must be disclosed",
            Severity::Medium,
            check_mello_roos,
        )),
        Box::new(StateRule::new(
            "CA_EARTHQUAKE",
            "Earthquake hazards report",
            "Earthquake hazard zones call for the hazards booklet",
            Severity::Medium,
            check_earthquake,
        )),
        Box::new(StateRule::new(
            "CA_DETECTORS",
            "Detector compliance",
            "Smoke and carbon monoxide detector compliance statement",
            Severity::Low,
            check_detectors,
        )),
    ];
    apply_config(rules, config)
}

fn check_tds(rule: &StateRule, ctx: &RuleContext) -> Vec<RiskFlag> {
    if has_disclosure(ctx, &["tds", "transfer disclosure"]) {
        return Vec::new();
    }
    vec![rule.flag(
        "MISSING",
        "Transfer Disclosure Statement (TDS) not provided",
        rule.severity_for(ctx.state_code()),
    )]
}

fn check_nhd(rule: &StateRule, ctx: &RuleContext) -> Vec<RiskFlag> {
    if has_disclosure(ctx, &["nhd", "natural hazard"]) {
        return Vec::new();
    }
    vec![rule.flag(
        "MISSING",
        "Natural Hazard Disclosure (NHD) statement not provided",
        rule.severity_for(ctx.state_code()),
    )]
}

fn check_mello_roos(rule: &StateRule, ctx: &RuleContext) -> Vec<RiskFlag> {
    let mentioned = text_mentions(ctx, &["mello-roos", "mello roos"]);
    if mentioned && !has_disclosure(ctx, &["mello"]) {
        return vec![rule.flag(
            "NOT_DISCLOSED",
            "Mello-Roos district referenced without a disclosure",
            rule.severity_for(ctx.state_code()),
        )];
    }
    Vec::new()
}

fn check_earthquake(rule: &StateRule, ctx: &RuleContext) -> Vec<RiskFlag> {
    let mentioned = text_mentions(ctx, &["earthquake"]);
    if mentioned && !has_disclosure(ctx, &["earthquake"]) {
        return vec![rule.flag(
            "NO_HAZARDS_REPORT",
            "Earthquake hazard referenced without the hazards report",
            rule.severity_for(ctx.state_code()),
        )];
    }
    Vec::new()
}

fn check_detectors(rule: &StateRule, ctx: &RuleContext) -> Vec<RiskFlag> {
    let mentioned = text_mentions(ctx, &["smoke detector", "carbon monoxide"]);
    if mentioned && !text_mentions(ctx, &["compliant", "compliance"]) {
        return vec![rule.flag(
            "NO_COMPLIANCE_STATEMENT",
            "Detectors referenced without a compliance statement",
            rule.severity_for(ctx.state_code()),
        )];
    }
    Vec::new()
}
