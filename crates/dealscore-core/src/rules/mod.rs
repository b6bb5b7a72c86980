//! Rule primitives and the general rule library.
//!
//! A rule is a pure function of a [`RuleContext`]: no I/O, no wall-clock
//! (the disclosure-age rule is the one sanctioned exception), deterministic
//! modulo the context. Rules never hold state across evaluations, and
//! adding a rule never requires touching another.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{RiskFlag, RuleContext, RuleResult, Severity};

pub mod disclosure;
pub mod earnest_money;
pub mod financing;
pub mod helpers;
pub mod inspection;
pub mod states;
pub mod unusual;

pub use states::{StateInfo, StateRegistry};

/// The contract concern a rule evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    Contingency,
    Disclosure,
    Financing,
    Inspection,
    EarnestMoney,
    UnusualClause,
    Timeline,
    Legal,
    StateSpecific,
}

/// Per-state override of a rule's defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
}

/// Mutable configuration carried by every rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub enabled: bool,
    /// Default severity for the rule's primary flags.
    pub severity: Severity,
    /// Numeric thresholds keyed by name; absent keys fall back to the
    /// rule's built-in defaults.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub custom_thresholds: HashMap<String, f64>,
    /// Per-state overrides; an override's fields win over the defaults.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub state_overrides: HashMap<String, StateOverride>,
}

impl RuleConfig {
    pub fn new(severity: Severity) -> Self {
        Self {
            enabled: true,
            severity,
            custom_thresholds: HashMap::new(),
            state_overrides: HashMap::new(),
        }
    }

    /// Read a named threshold, falling back to the built-in default.
    pub fn threshold(&self, name: &str, default: f64) -> f64 {
        self.custom_thresholds.get(name).copied().unwrap_or(default)
    }

    pub fn with_threshold(mut self, name: impl Into<String>, value: f64) -> Self {
        self.custom_thresholds.insert(name.into(), value);
        self
    }

    pub fn with_state_override(
        mut self,
        state: impl Into<String>,
        over: StateOverride,
    ) -> Self {
        self.state_overrides.insert(state.into(), over);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// A deterministic contract rule.
///
/// Implementations are value objects: construct, optionally `configure`,
/// then `evaluate` any number of contexts.
pub trait Rule: Send + Sync {
    /// Stable identifier; flag codes are namespaced under it.
    fn id(&self) -> &'static str;

    /// Short human name.
    fn name(&self) -> &'static str;

    /// What the rule checks for.
    fn description(&self) -> &'static str;

    fn category(&self) -> RuleCategory;

    fn config(&self) -> &RuleConfig;

    /// Replace the rule's configuration.
    fn configure(&mut self, config: RuleConfig);

    /// Evaluate the rule against a context.
    fn evaluate(&self, ctx: &RuleContext) -> RuleResult;

    /// Whether this rule participates for the given state context.
    fn is_enabled(&self, state: Option<&str>) -> bool {
        let config = self.config();
        if let Some(over) = state.and_then(|s| config.state_overrides.get(s)) {
            if let Some(enabled) = over.enabled {
                return enabled;
            }
        }
        config.enabled
    }

    /// Effective default severity for the given state (overrides win).
    fn severity_for(&self, state: Option<&str>) -> Severity {
        let config = self.config();
        state
            .and_then(|s| config.state_overrides.get(s))
            .and_then(|over| over.severity)
            .unwrap_or(config.severity)
    }

    /// Build a flag namespaced under this rule's id.
    fn flag(
        &self,
        local_code: &str,
        description: impl Into<String>,
        severity: Severity,
    ) -> RiskFlag
    where
        Self: Sized,
    {
        RiskFlag::new(
            format!("{}_{}", self.id(), local_code),
            description,
            severity,
        )
    }

    /// A passing result for this rule.
    fn pass(&self) -> RuleResult {
        RuleResult::pass(self.id(), self.name())
    }

    /// A result derived from the given flags.
    fn result(&self, flags: Vec<RiskFlag>) -> RuleResult {
        RuleResult::from_flags(self.id(), self.name(), flags)
    }
}

/// All general (state-independent) rules, in canonical registration order.
pub fn general_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(financing::FinancingContingencyRule::new()),
        Box::new(financing::FinancingTimelineRule::new()),
        Box::new(financing::LoanTermsRule::new()),
        Box::new(financing::PreApprovalRule::new()),
        Box::new(financing::AppraisalContingencyRule::new()),
        Box::new(inspection::InspectionContingencyRule::new()),
        Box::new(inspection::InspectionTimelineRule::new()),
        Box::new(inspection::RequiredInspectionsRule::new()),
        Box::new(inspection::InspectionRepairRule::new()),
        Box::new(earnest_money::EarnestMoneyAmountRule::new()),
        Box::new(earnest_money::EarnestMoneyTimelineRule::new()),
        Box::new(earnest_money::EscrowHolderRule::new()),
        Box::new(earnest_money::RefundConditionsRule::new()),
        Box::new(disclosure::DisclosureMissingRule::new()),
        Box::new(disclosure::DisclosureCompletenessRule::new()),
        Box::new(disclosure::HoaDisclosureRule::new()),
        Box::new(disclosure::DisclosureAgeRule::new()),
        Box::new(unusual::UnusualPhrasesRule::new()),
        Box::new(unusual::UnusualTransactionRule::new()),
        Box::new(unusual::UnbalancedTermsRule::new()),
        Box::new(unusual::UnusualAddendaRule::new()),
        Box::new(unusual::UnusualClosingRule::new()),
    ]
}
