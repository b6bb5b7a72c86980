//! Florida state rules.

use crate::types::{RiskFlag, RuleContext, Severity};

use super::super::{Rule, RuleConfig};
use super::{apply_config, has_disclosure, text_mentions, StateRule};

pub(super) fn rules(config: Option<&RuleConfig>) -> Vec<Box<dyn Rule>> {
    let rules: Vec<Box<dyn Rule>> = vec![
        Box::new(StateRule::new(
            "FL_SELLER_DISCLOSURE",
            "Seller's property disclosure",
            "Florida practice calls for a seller's property disclosure",
            Severity::Critical,
            check_seller_disclosure,
        )),
        Box::new(StateRule::new(
            "FL_FLOOD_ZONE",
            "Flood zone disclosure",
            "Flood exposure must be disclosed to the buyer",
            Severity::High,
            check_flood_zone,
        )),
        Box::new(StateRule::new(
            "FL_HOA",
            "HOA disclosure",
            "Association transactions require the HOA disclosure summary",
            Severity::Medium,
            check_hoa,
        )),
        Box::new(StateRule::new(
            "FL_RADON",
            "Radon gas notice",
            "Florida contracts must carry the statutory radon gas notice",
            Severity::Medium,
            check_radon,
        )),
        Box::new(StateRule::new(
            "FL_ENERGY",
            "Energy-efficiency brochure",
            "Buyers must receive the energy-efficiency rating brochure",
            Severity::Low,
            check_energy,
        )),
        Box::new(StateRule::new(
            "FL_WIND",
            "Windstorm mitigation",
            "Windstorm exposure calls for mitigation documentation",
            Severity::Medium,
            check_wind,
        )),
    ];
    apply_config(rules, config)
}

fn check_seller_disclosure(rule: &StateRule, ctx: &RuleContext) -> Vec<RiskFlag> {
    if has_disclosure(
        ctx,
        &["seller's disclosure", "seller disclosure", "property disclosure"],
    ) {
        return Vec::new();
    }
    vec![rule.flag(
        "MISSING",
        "Seller's property disclosure not provided",
        rule.severity_for(ctx.state_code()),
    )]
}

fn check_flood_zone(rule: &StateRule, ctx: &RuleContext) -> Vec<RiskFlag> {
    if has_disclosure(ctx, &["flood"]) || text_mentions(ctx, &["flood zone", "flood disclosure"]) {
        return Vec::new();
    }
    vec![rule.flag(
        "NO_FLOOD_DISCLOSURE",
        "Flood zone status not disclosed",
        rule.severity_for(ctx.state_code()),
    )]
}

fn check_hoa(rule: &StateRule, ctx: &RuleContext) -> Vec<RiskFlag> {
    let involved = text_mentions(ctx, &["hoa", "homeowners association"])
        || has_disclosure(ctx, &["association"]);
    if involved && !has_disclosure(ctx, &["hoa disclosure", "association disclosure"]) {
        return vec![rule.flag(
            "DISCLOSURE_MISSING",
            "Association transaction without the HOA disclosure summary",
            rule.severity_for(ctx.state_code()),
        )];
    }
    Vec::new()
}

fn check_radon(rule: &StateRule, ctx: &RuleContext) -> Vec<RiskFlag> {
    if text_mentions(ctx, &["radon"]) {
        return Vec::new();
    }
    vec![rule.flag(
        "NO_RADON_NOTICE",
        "Statutory radon gas notice missing from the contract",
        rule.severity_for(ctx.state_code()),
    )]
}

fn check_energy(rule: &StateRule, ctx: &RuleContext) -> Vec<RiskFlag> {
    if text_mentions(ctx, &["energy"]) || has_disclosure(ctx, &["energy"]) {
        return Vec::new();
    }
    vec![rule.flag(
        "NO_ENERGY_BROCHURE",
        "Energy-efficiency rating brochure not referenced",
        rule.severity_for(ctx.state_code()),
    )]
}

fn check_wind(rule: &StateRule, ctx: &RuleContext) -> Vec<RiskFlag> {
    let mentioned = text_mentions(ctx, &["hurricane", "windstorm", "wind mitigation"]);
    if mentioned && !has_disclosure(ctx, &["wind"]) {
        return vec![rule.flag(
            "NO_MITIGATION_DISCLOSURE",
            "Windstorm exposure referenced without mitigation documentation",
            rule.severity_for(ctx.state_code()),
        )];
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Clause, Contract, ContractStatus, Disclosure};
    use chrono::Utc;

    fn ctx(disclosures: Vec<Disclosure>, text: &str) -> RuleContext {
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
        RuleContext::new(contract).with_state("FL")
    }

    #[test]
    fn test_complete_florida_contract_passes() {
        let ctx = ctx(
            vec![
                Disclosure::new("Seller's Property Disclosure", true, true),
                Disclosure::new("Flood Zone Disclosure", true, true),
            ],
            "Radon gas notice included as required by law. Energy-efficiency \
             rating brochure delivered to buyer.",
        );
        for rule in rules(None) {
            let result = rule.evaluate(&ctx);
            assert!(result.passed, "{} failed unexpectedly", result.rule_id);
        }
    }

    #[test]
    fn test_radon_notice_required_unconditionally() {
        let ctx = ctx(vec![], "No notices at all.");
        let results: Vec<_> = rules(None).iter().map(|r| r.evaluate(&ctx)).collect();
        let radon = results.iter().find(|r| r.rule_id == "FL_RADON").unwrap();
        assert_eq!(radon.flags[0].code, "FL_RADON_NO_RADON_NOTICE");
    }

    #[test]
    fn test_wind_conditional_on_mention() {
        let silent = ctx(vec![], "Radon notice. Energy brochure. Flood zone X.");
        let results: Vec<_> = rules(None).iter().map(|r| r.evaluate(&silent)).collect();
        assert!(results.iter().find(|r| r.rule_id == "FL_WIND").unwrap().passed);

        let exposed = ctx(vec![], "Property carries windstorm exposure.");
        let results: Vec<_> = rules(None).iter().map(|r| r.evaluate(&exposed)).collect();
        let wind = results.iter().find(|r| r.rule_id == "FL_WIND").unwrap();
        assert_eq!(wind.flags[0].code, "FL_WIND_NO_MITIGATION_DISCLOSURE");
    }
}
