//! State-specific rules and the registry mapping state codes to them.
//!
//! State rules are data-driven: one [`StateRule`] record per requirement,
//! carrying a check function. Adding a state means adding one table row
//! here and one factory module; nothing else changes.

use crate::types::{RiskFlag, RuleContext, RuleResult, Severity};

use super::{Rule, RuleCategory, RuleConfig};

mod ca;
mod fl;
mod ny;
mod tx;

/// A single state-specific requirement, expressed as a record with a
/// check function rather than a dedicated struct per requirement.
pub struct StateRule {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    config: RuleConfig,
    check: fn(&StateRule, &RuleContext) -> Vec<RiskFlag>,
}

impl StateRule {
    pub(crate) fn new(
        id: &'static str,
        name: &'static str,
        description: &'static str,
        severity: Severity,
        check: fn(&StateRule, &RuleContext) -> Vec<RiskFlag>,
    ) -> Self {
        Self {
            id,
            name,
            description,
            config: RuleConfig::new(severity),
            check,
        }
    }
}

impl Rule for StateRule {
    fn id(&self) -> &'static str {
        self.id
    }
    fn name(&self) -> &'static str {
        self.name
    }
    fn description(&self) -> &'static str {
        self.description
    }
    fn category(&self) -> RuleCategory {
        RuleCategory::StateSpecific
    }
    fn config(&self) -> &RuleConfig {
        &self.config
    }
    fn configure(&mut self, config: RuleConfig) {
        self.config = config;
    }

    fn evaluate(&self, ctx: &RuleContext) -> RuleResult {
        let flags = (self.check)(self, ctx);
        self.result(flags)
    }
}

/// Whether any provided disclosure name contains one of the keywords.
pub(crate) fn has_disclosure(ctx: &RuleContext, keywords: &[&str]) -> bool {
    ctx.contract.disclosures.iter().any(|d| {
        if !d.provided {
            return false;
        }
        let name = d.name.to_lowercase();
        keywords.iter().any(|kw| name.contains(kw))
    })
}

/// Whether the contract text mentions any of the keywords.
pub(crate) fn text_mentions(ctx: &RuleContext, keywords: &[&str]) -> bool {
    let text = ctx.text().to_lowercase();
    keywords.iter().any(|kw| text.contains(kw))
}

/// One row of the state registry.
pub struct StateInfo {
    pub code: &'static str,
    pub name: &'static str,
    factory: fn(Option<&RuleConfig>) -> Vec<Box<dyn Rule>>,
}

/// The supported states. Additions are purely additive: one row here, one
/// factory module.
static STATES: &[StateInfo] = &[
    StateInfo {
        code: "CA",
        name: "California",
        factory: ca::rules,
    },
    StateInfo {
        code: "TX",
        name: "Texas",
        factory: tx::rules,
    },
    StateInfo {
        code: "FL",
        name: "Florida",
        factory: fl::rules,
    },
    StateInfo {
        code: "NY",
        name: "New York",
        factory: ny::rules,
    },
];

/// Static lookup of state codes to rule factories.
pub struct StateRegistry;

impl StateRegistry {
    pub fn is_supported(code: &str) -> bool {
        Self::info(code).is_some()
    }

    pub fn supported_codes() -> Vec<&'static str> {
        STATES.iter().map(|s| s.code).collect()
    }

    pub fn info(code: &str) -> Option<&'static StateInfo> {
        STATES
            .iter()
            .find(|s| s.code.eq_ignore_ascii_case(code))
    }

    pub fn list() -> &'static [StateInfo] {
        STATES
    }

    /// Build the rules for one state, optionally replacing each rule's
    /// configuration. Returns `None` for unsupported codes.
    pub fn create_rules(
        code: &str,
        config: Option<&RuleConfig>,
    ) -> Option<Vec<Box<dyn Rule>>> {
        Self::info(code).map(|info| (info.factory)(config))
    }

    /// Build the union of rules for several states, skipping unsupported
    /// codes.
    pub fn create_multi_state_rules(
        codes: &[&str],
        config: Option<&RuleConfig>,
    ) -> Vec<Box<dyn Rule>> {
        codes
            .iter()
            .filter_map(|code| Self::create_rules(code, config))
            .flatten()
            .collect()
    }
}

/// Apply an optional caller-supplied config to a freshly built rule set.
pub(crate) fn apply_config(
    mut rules: Vec<Box<dyn Rule>>,
    config: Option<&RuleConfig>,
) -> Vec<Box<dyn Rule>> {
    if let Some(config) = config {
        for rule in &mut rules {
            rule.configure(config.clone());
        }
    }
    rules
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_codes() {
        let codes = StateRegistry::supported_codes();
        assert_eq!(codes, vec!["CA", "TX", "FL", "NY"]);
        assert!(StateRegistry::is_supported("CA"));
        assert!(StateRegistry::is_supported("ca"));
        assert!(!StateRegistry::is_supported("WA"));
    }

    #[test]
    fn test_create_rules_nonempty_and_deterministic() {
        for code in StateRegistry::supported_codes() {
            let first = StateRegistry::create_rules(code, None).unwrap();
            let second = StateRegistry::create_rules(code, None).unwrap();
            assert!(!first.is_empty(), "state {} produced no rules", code);

            let first_ids: Vec<&str> = first.iter().map(|r| r.id()).collect();
            let second_ids: Vec<&str> = second.iter().map(|r| r.id()).collect();
            assert_eq!(first_ids, second_ids);
        }
    }

    #[test]
    fn test_create_rules_unknown_state() {
        assert!(StateRegistry::create_rules("ZZ", None).is_none());
    }

    #[test]
    fn test_multi_state_union_skips_unknown() {
        let ca_len = StateRegistry::create_rules("CA", None).unwrap().len();
        let ny_len = StateRegistry::create_rules("NY", None).unwrap().len();
        let rules = StateRegistry::create_multi_state_rules(&["CA", "ZZ", "NY"], None);
        assert_eq!(rules.len(), ca_len + ny_len);
    }

    #[test]
    fn test_info_carries_human_name() {
        assert_eq!(StateRegistry::info("NY").unwrap().name, "New York");
    }
}
