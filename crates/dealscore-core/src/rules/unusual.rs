//! Unusual-term rules: risky phrases, unusual transaction structures,
//! unbalanced terms, unusual addenda, and unusual closing arrangements.

use crate::types::{RuleContext, RuleResult, Severity};

use super::helpers::{contains_any, contains_keyword, days_near};
use super::{Rule, RuleCategory, RuleConfig};

/// The closed phrase table: (phrase, local code, severity).
const UNUSUAL_PHRASES: &[(&str, &str, Severity)] = &[
    ("waive all rights", "WAIVE_ALL_RIGHTS", Severity::Critical),
    ("hold harmless", "HOLD_HARMLESS", Severity::High),
    ("indemnify seller", "INDEMNIFY_SELLER", Severity::High),
    ("no recourse", "NO_RECOURSE", Severity::Critical),
    ("binding arbitration", "BINDING_ARBITRATION", Severity::Medium),
    ("waive jury trial", "WAIVE_JURY_TRIAL", Severity::High),
    ("automatic renewal", "AUTOMATIC_RENEWAL", Severity::Medium),
    ("penalty clause", "PENALTY_CLAUSE", Severity::High),
    ("sole discretion", "SOLE_DISCRETION", Severity::Medium),
    ("time is of the essence", "TIME_OF_ESSENCE", Severity::Low),
    ("as-is where-is", "AS_IS_WHERE_IS", Severity::High),
    ("sight unseen", "SIGHT_UNSEEN", Severity::Critical),
];

/// Transaction structures worth a second look: (keyword, local code).
const UNUSUAL_TRANSACTIONS: &[(&str, &str)] = &[
    ("leaseback", "LEASEBACK"),
    ("seller financing", "SELLER_FINANCING"),
    ("land contract", "LAND_CONTRACT"),
    ("subject to existing", "SUBJECT_TO_EXISTING"),
    ("wraparound", "WRAPAROUND"),
    ("assignment of contract", "ASSIGNMENT_OF_CONTRACT"),
];

/// Addenda that change the shape of the deal: (keyword, local code).
const UNUSUAL_ADDENDA: &[(&str, &str)] = &[
    ("kick-out", "KICK_OUT"),
    ("right of first refusal", "RIGHT_OF_FIRST_REFUSAL"),
    ("rent-back", "RENT_BACK"),
    ("personal property", "PERSONAL_PROPERTY"),
    ("contingent sale", "CONTINGENT_SALE"),
    ("short sale", "SHORT_SALE"),
    ("reo", "REO"),
    ("foreclosure", "FORECLOSURE"),
];

/// Scans the contract text for the closed set of risky phrases.
pub struct UnusualPhrasesRule {
    config: RuleConfig,
}

impl UnusualPhrasesRule {
    pub fn new() -> Self {
        Self {
            config: RuleConfig::new(Severity::Medium),
        }
    }
}

impl Default for UnusualPhrasesRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for UnusualPhrasesRule {
    fn id(&self) -> &'static str {
        "UNUSUAL_PHRASE"
    }
    fn name(&self) -> &'static str {
        "Unusual phrases"
    }
    fn description(&self) -> &'static str {
        "Flags known-risky phrases in the contract text"
    }
    fn category(&self) -> RuleCategory {
        RuleCategory::UnusualClause
    }
    fn config(&self) -> &RuleConfig {
        &self.config
    }
    fn configure(&mut self, config: RuleConfig) {
        self.config = config;
    }

    fn evaluate(&self, ctx: &RuleContext) -> RuleResult {
        let text = ctx.text().to_lowercase();

        let flags = UNUSUAL_PHRASES
            .iter()
            .filter(|(phrase, _, _)| text.contains(phrase))
            .map(|(phrase, code, severity)| {
                self.flag(code, format!("Contract contains \"{}\"", phrase), *severity)
            })
            .collect();

        self.result(flags)
    }
}

/// Flags unusual transaction structures.
pub struct UnusualTransactionRule {
    config: RuleConfig,
}

impl UnusualTransactionRule {
    pub fn new() -> Self {
        Self {
            config: RuleConfig::new(Severity::Medium),
        }
    }
}

impl Default for UnusualTransactionRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for UnusualTransactionRule {
    fn id(&self) -> &'static str {
        "UNUSUAL_TRANSACTION"
    }
    fn name(&self) -> &'static str {
        "Unusual transaction structure"
    }
    fn description(&self) -> &'static str {
        "Flags non-standard transaction structures"
    }
    fn category(&self) -> RuleCategory {
        RuleCategory::UnusualClause
    }
    fn config(&self) -> &RuleConfig {
        &self.config
    }
    fn configure(&mut self, config: RuleConfig) {
        self.config = config;
    }

    fn evaluate(&self, ctx: &RuleContext) -> RuleResult {
        let text = ctx.text().to_lowercase();
        let severity = self.severity_for(ctx.state_code());

        let flags = UNUSUAL_TRANSACTIONS
            .iter()
            .filter(|(keyword, _)| text.contains(keyword))
            .map(|(keyword, code)| {
                self.flag(
                    code,
                    format!("Transaction involves {}", keyword),
                    severity,
                )
            })
            .collect();

        self.result(flags)
    }
}

/// Detects one-sided contract mechanics: cancel rights, default
/// consequences, liability, and extension rights that run one way only.
pub struct UnbalancedTermsRule {
    config: RuleConfig,
}

impl UnbalancedTermsRule {
    pub fn new() -> Self {
        Self {
            config: RuleConfig::new(Severity::High),
        }
    }
}

impl Default for UnbalancedTermsRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for UnbalancedTermsRule {
    fn id(&self) -> &'static str {
        "UNBALANCED"
    }
    fn name(&self) -> &'static str {
        "Unbalanced terms"
    }
    fn description(&self) -> &'static str {
        "Flags rights and consequences that run in one direction only"
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

    fn evaluate(&self, ctx: &RuleContext) -> RuleResult {
        let text = ctx.text();
        let mut flags = Vec::new();

        let seller_cancel = contains_any(
            &text,
            &["seller may cancel", "seller reserves the right to cancel"],
        );
        if seller_cancel && !contains_keyword(&text, "buyer may cancel") {
            flags.push(self.flag(
                "ASYMMETRIC_CANCEL",
                "Seller holds a cancellation right the buyer lacks",
                Severity::High,
            ));
        }

        let buyer_default = contains_any(&text, &["buyer forfeits", "default by buyer"]);
        if buyer_default && !contains_keyword(&text, "default by seller") {
            flags.push(self.flag(
                "ASYMMETRIC_DEFAULT",
                "Default consequences fall on the buyer only",
                Severity::Critical,
            ));
        }

        if contains_keyword(&text, "unlimited liability") {
            flags.push(self.flag(
                "UNLIMITED_LIABILITY",
                "Contract exposes a party to unlimited liability",
                Severity::Critical,
            ));
        }

        if contains_any(
            &text,
            &["seller may extend", "unilaterally extend", "unilateral extension"],
        ) && !contains_keyword(&text, "buyer may extend")
        {
            flags.push(self.flag(
                "UNILATERAL_EXTENSION",
                "One party may extend deadlines unilaterally",
                Severity::High,
            ));
        }

        self.result(flags)
    }
}

/// Flags unusual addenda by name and piles of addenda by count.
pub struct UnusualAddendaRule {
    config: RuleConfig,
}

impl UnusualAddendaRule {
    pub const DEFAULT_MAX_ADDENDA: f64 = 5.0;

    pub fn new() -> Self {
        Self {
            config: RuleConfig::new(Severity::Medium),
        }
    }
}

impl Default for UnusualAddendaRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for UnusualAddendaRule {
    fn id(&self) -> &'static str {
        "ADDENDA"
    }
    fn name(&self) -> &'static str {
        "Unusual addenda"
    }
    fn description(&self) -> &'static str {
        "Flags deal-shaping addenda and an unusually large addendum count"
    }
    fn category(&self) -> RuleCategory {
        RuleCategory::UnusualClause
    }
    fn config(&self) -> &RuleConfig {
        &self.config
    }
    fn configure(&mut self, config: RuleConfig) {
        self.config = config;
    }

    fn evaluate(&self, ctx: &RuleContext) -> RuleResult {
        let included = ctx.contract.included_addenda_names();
        let severity = self.severity_for(ctx.state_code());
        let mut flags = Vec::new();

        for name in &included {
            let lower = name.to_lowercase();
            for (keyword, code) in UNUSUAL_ADDENDA {
                if lower.contains(keyword) {
                    flags.push(self.flag(
                        code,
                        format!("Unusual addendum included: {}", name),
                        severity,
                    ));
                }
            }
        }

        let max_addenda = self
            .config
            .threshold("max_addenda", Self::DEFAULT_MAX_ADDENDA);
        if (included.len() as f64) > max_addenda {
            flags.push(self.flag(
                "MANY_ADDENDA",
                format!("{} addenda attached to one contract", included.len()),
                Severity::Low,
            ));
        }

        self.result(flags)
    }
}

/// Unusual closing arrangements: possession transfers out of step with
/// closing, very long escrows, and simultaneous closes.
pub struct UnusualClosingRule {
    config: RuleConfig,
}

impl UnusualClosingRule {
    pub const DEFAULT_MAX_CLOSE_DAYS: f64 = 60.0;

    pub fn new() -> Self {
        Self {
            config: RuleConfig::new(Severity::Medium),
        }
    }
}

impl Default for UnusualClosingRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for UnusualClosingRule {
    fn id(&self) -> &'static str {
        "CLOSING"
    }
    fn name(&self) -> &'static str {
        "Unusual closing terms"
    }
    fn description(&self) -> &'static str {
        "Flags possession and escrow arrangements outside the norm"
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
        let severity = self.severity_for(ctx.state_code());
        let mut flags = Vec::new();

        if contains_any(
            &text,
            &["possession before closing", "possession prior to closing", "early possession"],
        ) {
            flags.push(self.flag(
                "EARLY_POSSESSION",
                "Buyer takes possession before closing",
                Severity::High,
            ));
        }

        if contains_any(&text, &["possession after closing", "delayed possession"]) {
            flags.push(self.flag(
                "DELAYED_POSSESSION",
                "Possession is delivered after closing",
                severity,
            ));
        }

        let close_days = days_near(&text, "close of escrow", 120)
            .or_else(|| days_near(&text, "closing", 120));
        if let Some(days) = close_days {
            let max_days = self
                .config
                .threshold("max_close_days", Self::DEFAULT_MAX_CLOSE_DAYS);
            if (days as f64) > max_days {
                flags.push(self.flag(
                    "LONG_CLOSE",
                    format!("Closing set {} days out", days),
                    severity,
                ));
            }
        }

        if contains_any(&text, &["simultaneous close", "simultaneous closing"]) {
            flags.push(self.flag(
                "SIMULTANEOUS_CLOSE",
                "Purchase depends on a simultaneous closing",
                severity,
            ));
        }

        self.result(flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Addendum, Clause, Contract, ContractStatus};
    use chrono::Utc;

    fn ctx_with(text: &str, addenda: Vec<Addendum>) -> RuleContext {
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
            disclosures: vec![],
            addenda,
            documents: vec![],
        };
        RuleContext::new(contract)
    }

    #[test]
    fn test_phrase_table_severities() {
        let rule = UnusualPhrasesRule::new();
        let result = rule.evaluate(&ctx_with(
            "Buyer shall waive all rights and accept binding arbitration. Time is of the essence.",
            vec![],
        ));

        let by_code = |code: &str| {
            result
                .flags
                .iter()
                .find(|f| f.code == format!("UNUSUAL_PHRASE_{}", code))
                .unwrap()
                .severity
        };
        assert_eq!(by_code("WAIVE_ALL_RIGHTS"), Severity::Critical);
        assert_eq!(by_code("BINDING_ARBITRATION"), Severity::Medium);
        assert_eq!(by_code("TIME_OF_ESSENCE"), Severity::Low);
    }

    #[test]
    fn test_clean_text_passes_phrases() {
        let rule = UnusualPhrasesRule::new();
        let result = rule.evaluate(&ctx_with("A perfectly ordinary purchase.", vec![]));
        assert!(result.passed);
    }

    #[test]
    fn test_unusual_transaction() {
        let rule = UnusualTransactionRule::new();
        let result = rule.evaluate(&ctx_with(
            "Purchase subject to existing mortgage via a wraparound note.",
            vec![],
        ));
        let codes: Vec<&str> = result.flags.iter().map(|f| f.code.as_str()).collect();
        assert!(codes.contains(&"UNUSUAL_TRANSACTION_SUBJECT_TO_EXISTING"));
        assert!(codes.contains(&"UNUSUAL_TRANSACTION_WRAPAROUND"));
    }

    #[test]
    fn test_asymmetric_cancel() {
        let rule = UnbalancedTermsRule::new();
        let result = rule.evaluate(&ctx_with(
            "Seller may cancel this agreement at any time without penalty.",
            vec![],
        ));
        assert_eq!(result.flags[0].code, "UNBALANCED_ASYMMETRIC_CANCEL");
    }

    #[test]
    fn test_symmetric_cancel_passes() {
        let rule = UnbalancedTermsRule::new();
        let result = rule.evaluate(&ctx_with(
            "Seller may cancel and buyer may cancel upon written notice.",
            vec![],
        ));
        assert!(result.passed);
    }

    #[test]
    fn test_unlimited_liability_is_critical() {
        let rule = UnbalancedTermsRule::new();
        let result = rule.evaluate(&ctx_with(
            "Buyer accepts unlimited liability for any damage during escrow.",
            vec![],
        ));
        let flag = result
            .flags
            .iter()
            .find(|f| f.code == "UNBALANCED_UNLIMITED_LIABILITY")
            .unwrap();
        assert_eq!(flag.severity, Severity::Critical);
    }

    #[test]
    fn test_unusual_addenda_by_name() {
        let rule = UnusualAddendaRule::new();
        let result = rule.evaluate(&ctx_with(
            "",
            vec![
                Addendum::new("Kick-Out Clause Addendum", true),
                Addendum::new("Standard Financing Addendum", true),
                Addendum::new("Short Sale Addendum", false),
            ],
        ));
        let codes: Vec<&str> = result.flags.iter().map(|f| f.code.as_str()).collect();
        assert!(codes.contains(&"ADDENDA_KICK_OUT"));
        // Short sale addendum is not included, so it does not flag.
        assert!(!codes.contains(&"ADDENDA_SHORT_SALE"));
    }

    #[test]
    fn test_many_addenda() {
        let rule = UnusualAddendaRule::new();
        let addenda = (0..6)
            .map(|i| Addendum::new(format!("Addendum {}", i), true))
            .collect();
        let result = rule.evaluate(&ctx_with("", addenda));
        let flag = result
            .flags
            .iter()
            .find(|f| f.code == "ADDENDA_MANY_ADDENDA")
            .unwrap();
        assert_eq!(flag.severity, Severity::Low);
    }

    #[test]
    fn test_early_possession_is_high() {
        let rule = UnusualClosingRule::new();
        let result = rule.evaluate(&ctx_with(
            "Buyer granted early possession upon acceptance.",
            vec![],
        ));
        let flag = result
            .flags
            .iter()
            .find(|f| f.code == "CLOSING_EARLY_POSSESSION")
            .unwrap();
        assert_eq!(flag.severity, Severity::High);
    }

    #[test]
    fn test_long_close() {
        let rule = UnusualClosingRule::new();
        let result = rule.evaluate(&ctx_with(
            "Close of escrow shall occur within 90 days of acceptance.",
            vec![],
        ));
        assert!(result.flags.iter().any(|f| f.code == "CLOSING_LONG_CLOSE"));
    }

    #[test]
    fn test_normal_close_passes() {
        let rule = UnusualClosingRule::new();
        let result = rule.evaluate(&ctx_with(
            "Close of escrow shall occur within 30 days of acceptance.",
            vec![],
        ));
        assert!(result.passed);
    }
}
