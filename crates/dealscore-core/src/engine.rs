//! Rule engine: registration and bulk evaluation.
//!
//! Evaluation order follows registration order, one rule at a time; the
//! result list is observable, so the engine never parallelizes internally.
//! Callers evaluate multiple contracts concurrently with one engine
//! instance per call context.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use serde::{Deserialize, Serialize};

use crate::rules::{Rule, RuleCategory};
use crate::types::{RiskFlag, RuleContext, RuleResult, Severity};

/// Registry plus bulk evaluation over a set of rules.
#[derive(Default)]
pub struct RuleEngine {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleEngine {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// An engine pre-loaded with the general rule library.
    pub fn with_general_rules() -> Self {
        let mut engine = Self::new();
        engine.register_all(crate::rules::general_rules());
        engine
    }

    pub fn register(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
    }

    pub fn register_all(&mut self, rules: Vec<Box<dyn Rule>>) {
        self.rules.extend(rules);
    }

    /// Evaluate every enabled rule against the context, in registration
    /// order. A rule that panics becomes a failing result with a single
    /// low-severity `{RULE_ID}_ERROR` flag; the other rules still run.
    pub fn evaluate(&self, ctx: &RuleContext) -> Vec<RuleResult> {
        self.rules
            .iter()
            .filter(|rule| rule.is_enabled(ctx.state_code()))
            .map(|rule| Self::evaluate_one(rule.as_ref(), ctx))
            .collect()
    }

    /// Evaluate only the enabled rules of one category.
    pub fn evaluate_category(
        &self,
        ctx: &RuleContext,
        category: RuleCategory,
    ) -> Vec<RuleResult> {
        self.rules
            .iter()
            .filter(|rule| rule.category() == category)
            .filter(|rule| rule.is_enabled(ctx.state_code()))
            .map(|rule| Self::evaluate_one(rule.as_ref(), ctx))
            .collect()
    }

    fn evaluate_one(rule: &dyn Rule, ctx: &RuleContext) -> RuleResult {
        match catch_unwind(AssertUnwindSafe(|| rule.evaluate(ctx))) {
            Ok(result) => result,
            Err(_) => RuleResult::from_flags(
                rule.id(),
                rule.name(),
                vec![RiskFlag::new(
                    format!("{}_ERROR", rule.id()),
                    format!("Rule '{}' failed during evaluation", rule.name()),
                    Severity::Low,
                )],
            ),
        }
    }

    pub fn rules(&self) -> &[Box<dyn Rule>] {
        &self.rules
    }

    pub fn rules_by_category(&self, category: RuleCategory) -> Vec<&dyn Rule> {
        self.rules
            .iter()
            .filter(|rule| rule.category() == category)
            .map(|rule| rule.as_ref())
            .collect()
    }
}

/// Flatten per-rule flag lists into one list, order preserved.
pub fn aggregate_flags(results: &[RuleResult]) -> Vec<RiskFlag> {
    results
        .iter()
        .flat_map(|result| result.flags.iter().cloned())
        .collect()
}

/// Share of rules that passed, as a percentage.
pub fn pass_rate(results: &[RuleResult]) -> f64 {
    if results.is_empty() {
        return 100.0;
    }
    let passed = results.iter().filter(|r| r.passed).count();
    passed as f64 / results.len() as f64 * 100.0
}

/// Summary statistics over a set of rule results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub pass_rate: f64,
    pub flags_by_severity: HashMap<Severity, usize>,
}

pub fn summarize(results: &[RuleResult]) -> EvaluationSummary {
    let passed = results.iter().filter(|r| r.passed).count();
    let mut flags_by_severity = HashMap::new();
    for result in results {
        for flag in &result.flags {
            *flags_by_severity.entry(flag.severity).or_insert(0) += 1;
        }
    }

    EvaluationSummary {
        total: results.len(),
        passed,
        failed: results.len() - passed,
        pass_rate: pass_rate(results),
        flags_by_severity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleConfig;
    use crate::types::{Clause, Contract, ContractStatus};
    use chrono::Utc;

    struct PanickingRule {
        config: RuleConfig,
    }

    impl Rule for PanickingRule {
        fn id(&self) -> &'static str {
            "PANIC"
        }
        fn name(&self) -> &'static str {
            "Panicking rule"
        }
        fn description(&self) -> &'static str {
            "Always panics"
        }
        fn category(&self) -> RuleCategory {
            RuleCategory::Legal
        }
        fn config(&self) -> &RuleConfig {
            &self.config
        }
        fn configure(&mut self, config: RuleConfig) {
            self.config = config;
        }
        fn evaluate(&self, _ctx: &RuleContext) -> RuleResult {
            panic!("boom");
        }
    }

    struct FlagOnceRule {
        config: RuleConfig,
    }

    impl Rule for FlagOnceRule {
        fn id(&self) -> &'static str {
            "ONCE"
        }
        fn name(&self) -> &'static str {
            "Flag once"
        }
        fn description(&self) -> &'static str {
            "Always emits one flag"
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
        fn evaluate(&self, _ctx: &RuleContext) -> RuleResult {
            let flag = self.flag("FOUND", "always present", Severity::Medium);
            self.result(vec![flag])
        }
    }

    fn empty_ctx() -> RuleContext {
        let contract = Contract {
            id: "c-1".to_string(),
            title: "Test".to_string(),
            user_id: "u-1".to_string(),
            organization_id: "o-1".to_string(),
            state: None,
            status: ContractStatus::Submitted,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            clauses: vec![Clause::standard("text")],
            disclosures: vec![],
            addenda: vec![],
            documents: vec![],
        };
        RuleContext::new(contract)
    }

    #[test]
    fn test_panicking_rule_contained() {
        let mut engine = RuleEngine::new();
        engine.register(Box::new(PanickingRule {
            config: RuleConfig::new(Severity::Medium),
        }));
        engine.register(Box::new(FlagOnceRule {
            config: RuleConfig::new(Severity::Medium),
        }));

        let results = engine.evaluate(&empty_ctx());
        assert_eq!(results.len(), 2);
        assert!(!results[0].passed);
        assert_eq!(results[0].flags[0].code, "PANIC_ERROR");
        assert_eq!(results[0].flags[0].severity, Severity::Low);
        // The rule after the panic still ran.
        assert_eq!(results[1].rule_id, "ONCE");
    }

    #[test]
    fn test_evaluation_follows_registration_order() {
        let mut engine = RuleEngine::new();
        engine.register(Box::new(FlagOnceRule {
            config: RuleConfig::new(Severity::Medium),
        }));
        engine.register(Box::new(PanickingRule {
            config: RuleConfig::new(Severity::Medium),
        }));

        let results = engine.evaluate(&empty_ctx());
        let ids: Vec<&str> = results.iter().map(|r| r.rule_id.as_str()).collect();
        assert_eq!(ids, vec!["ONCE", "PANIC"]);
    }

    #[test]
    fn test_disabled_rule_skipped() {
        let mut engine = RuleEngine::new();
        engine.register(Box::new(FlagOnceRule {
            config: RuleConfig::new(Severity::Medium).disabled(),
        }));

        let results = engine.evaluate(&empty_ctx());
        assert!(results.is_empty());
    }

    #[test]
    fn test_evaluate_category_filters() {
        let mut engine = RuleEngine::new();
        engine.register(Box::new(FlagOnceRule {
            config: RuleConfig::new(Severity::Medium),
        }));
        engine.register(Box::new(PanickingRule {
            config: RuleConfig::new(Severity::Medium),
        }));

        let results = engine.evaluate_category(&empty_ctx(), RuleCategory::Disclosure);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].rule_id, "ONCE");
    }

    #[test]
    fn test_aggregate_flags_preserves_order() {
        let results = vec![
            RuleResult::from_flags(
                "A",
                "A",
                vec![
                    RiskFlag::new("A_1", "first", Severity::Low),
                    RiskFlag::new("A_2", "second", Severity::Low),
                ],
            ),
            RuleResult::pass("B", "B"),
            RuleResult::from_flags(
                "C",
                "C",
                vec![RiskFlag::new("C_1", "third", Severity::High)],
            ),
        ];

        let flags = aggregate_flags(&results);
        let codes: Vec<&str> = flags.iter().map(|f| f.code.as_str()).collect();
        assert_eq!(codes, vec!["A_1", "A_2", "C_1"]);
    }

    #[test]
    fn test_summarize() {
        let results = vec![
            RuleResult::pass("A", "A"),
            RuleResult::from_flags(
                "B",
                "B",
                vec![
                    RiskFlag::new("B_1", "x", Severity::High),
                    RiskFlag::new("B_2", "y", Severity::High),
                ],
            ),
        ];

        let summary = summarize(&results);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.pass_rate, 50.0);
        assert_eq!(summary.flags_by_severity[&Severity::High], 2);
    }

    #[test]
    fn test_general_rules_engine_clean_contract() {
        let engine = RuleEngine::with_general_rules();
        let results = engine.evaluate(&empty_ctx());
        assert_eq!(results.len(), engine.rules().len());
    }
}
