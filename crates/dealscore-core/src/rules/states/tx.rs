//! Texas state rules.

use crate::types::{RiskFlag, RuleContext, Severity};

use super::super::{Rule, RuleConfig};
use super::{apply_config, has_disclosure, text_mentions, StateRule};

pub(super) fn rules(config: Option<&RuleConfig>) -> Vec<Box<dyn Rule>> {
    let rules: Vec<Box<dyn Rule>> = vec![
        Box::new(StateRule::new(
            "TX_SELLER_DISCLOSURE",
            "Seller's disclosure notice",
            "Texas requires a seller's disclosure notice",
            Severity::Critical,
            check_seller_disclosure,
        )),
        Box::new(StateRule::new(
            "TX_OPTION_PERIOD",
            "Option period",
            "Texas contracts ordinarily carry an option period",
            Severity::Medium,
            check_option_period,
        )),
        Box::new(StateRule::new(
            "TX_MUD_PID",
            "MUD/PID notice",
            "Utility and improvement district notices must accompany the contract",
            Severity::High,
            check_mud_pid,
        )),
        Box::new(StateRule::new(
            "TX_HOA",
            "HOA resale certificate",
            "HOA transactions call for the resale certificate package",
            Severity::Medium,
            check_hoa,
        )),
        Box::new(StateRule::new(
            "TX_SURVEY",
            "Survey",
            "The contract should address an existing or new survey",
            Severity::Low,
            check_survey,
        )),
        Box::new(StateRule::new(
            "TX_TITLE",
            "Title commitment",
            "The contract should address the title commitment",
            Severity::Medium,
            check_title,
        )),
    ];
    apply_config(rules, config)
}

fn check_seller_disclosure(rule: &StateRule, ctx: &RuleContext) -> Vec<RiskFlag> {
    if has_disclosure(ctx, &["seller's disclosure", "seller disclosure"]) {
        return Vec::new();
    }
    vec![rule.flag(
        "MISSING",
        "Seller's disclosure notice not provided",
        rule.severity_for(ctx.state_code()),
    )]
}

fn check_option_period(rule: &StateRule, ctx: &RuleContext) -> Vec<RiskFlag> {
    if text_mentions(ctx, &["option period", "option fee"]) {
        return Vec::new();
    }
    vec![rule.flag(
        "NO_OPTION_PERIOD",
        "No option period or option fee referenced",
        rule.severity_for(ctx.state_code()),
    )]
}

fn check_mud_pid(rule: &StateRule, ctx: &RuleContext) -> Vec<RiskFlag> {
    let mentioned = text_mentions(
        ctx,
        &["municipal utility district", "public improvement district"],
    );
    if mentioned && !has_disclosure(ctx, &["mud", "pid", "utility district", "improvement district"])
    {
        return vec![rule.flag(
            "NOTICE_MISSING",
            "Utility or improvement district referenced without its statutory notice",
            rule.severity_for(ctx.state_code()),
        )];
    }
    Vec::new()
}

fn check_hoa(rule: &StateRule, ctx: &RuleContext) -> Vec<RiskFlag> {
    let involved = text_mentions(ctx, &["hoa", "homeowners association"])
        || has_disclosure(ctx, &["association"]);
    if involved && !has_disclosure(ctx, &["resale certificate"]) {
        return vec![rule.flag(
            "NO_RESALE_CERTIFICATE",
            "HOA transaction without the resale certificate package",
            rule.severity_for(ctx.state_code()),
        )];
    }
    Vec::new()
}

fn check_survey(rule: &StateRule, ctx: &RuleContext) -> Vec<RiskFlag> {
    if text_mentions(ctx, &["survey"]) {
        return Vec::new();
    }
    vec![rule.flag(
        "NO_SURVEY",
        "No survey addressed by the contract",
        rule.severity_for(ctx.state_code()),
    )]
}

fn check_title(rule: &StateRule, ctx: &RuleContext) -> Vec<RiskFlag> {
    if text_mentions(ctx, &["title commitment", "title policy", "title insurance"]) {
        return Vec::new();
    }
    vec![rule.flag(
        "NO_TITLE_COMMITMENT",
        "No title commitment or title policy addressed",
        rule.severity_for(ctx.state_code()),
    )]
}
