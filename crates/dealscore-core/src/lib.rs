//! # dealscore-core
//!
//! Deterministic rule evaluation and risk scoring for residential
//! real-estate purchase contracts.
//!
//! This crate is the synchronous heart of DealScore, answering:
//! - Which contract terms deviate from safe practice?
//! - How risky is this deal, on a 0-100 scale?
//! - What does a given state's law expect the paperwork to contain?
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: same context always produces the same results
//! 2. **Pure**: rules perform no I/O (disclosure age is the one clock user)
//! 3. **Contained**: a rule that panics becomes one low-severity error flag
//! 4. **Ordered**: results follow registration order; flag aggregation is
//!    an order-preserving concatenation
//!
//! ## Example
//!
//! ```rust,ignore
//! use dealscore_core::{evaluate, RuleContext};
//!
//! let ctx = RuleContext::new(contract).with_state("CA");
//! let results = evaluate(&ctx);
//! for result in results.iter().filter(|r| !r.passed) {
//!     for flag in &result.flags {
//!         println!("{} [{}]: {}", flag.code, flag.severity.as_str(), flag.description);
//!     }
//! }
//! ```

pub mod engine;
pub mod rules;
pub mod scoring;
pub mod types;

pub use engine::{aggregate_flags, pass_rate, summarize, EvaluationSummary, RuleEngine};
pub use rules::{
    general_rules, Rule, RuleCategory, RuleConfig, StateInfo, StateOverride, StateRegistry,
};
pub use scoring::{
    apply_penalty, clamp_score, compute, flag_penalty, risk_level, scan_penalty, ScoreInput,
    ScoreOutput, ScoreWeights, FLAGGED_THRESHOLD,
};
pub use types::{
    count_by_severity, Addendum, Clause, ClauseType, Contract, ContractStatus, Disclosure,
    DocumentRef, MediaType, Recommendation, RecommendationPriority, RiskAnalysis, RiskFlag,
    RiskHistoryEntry, RiskLevel, RiskScore, RuleContext, RuleResult, ScoreBreakdown, Severity,
};

/// Code of the synthetic flag raised for contracts whose state is not in
/// the registry.
pub const UNSUPPORTED_STATE_CODE: &str = "UNSUPPORTED_STATE";

/// The synthetic medium-severity flag for an unsupported state. The
/// contract still scores; general rules run unchanged.
pub fn unsupported_state_flag(state: &str) -> RiskFlag {
    RiskFlag::new(
        UNSUPPORTED_STATE_CODE,
        format!("State '{}' is not covered by state-specific rules", state),
        Severity::Medium,
    )
}

/// Build an engine holding the general rules plus the rules for the
/// context's state, when supported.
pub fn build_engine(state: Option<&str>) -> RuleEngine {
    let mut engine = RuleEngine::with_general_rules();
    if let Some(state) = state {
        if let Some(state_rules) = StateRegistry::create_rules(state, None) {
            engine.register_all(state_rules);
        }
    }
    engine
}

/// Evaluate a context against the general rules plus its state's rules.
///
/// This is the main entry point for rule evaluation. Orchestration
/// concerns (caching, AI augmentation, persistence) live in the runtime
/// crate.
pub fn evaluate(ctx: &RuleContext) -> Vec<types::RuleResult> {
    build_engine(ctx.state_code()).evaluate(ctx)
}
