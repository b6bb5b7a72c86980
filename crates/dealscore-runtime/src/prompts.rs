//! Prompts and payload types for the two AI augmentation calls.
//!
//! Prompts demand JSON-only output matching the payload types below. A
//! response that fails to parse is an empty signal, never an error.

use dealscore_core::Severity;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Expected payload of the unusual-clauses call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnusualClausesPayload {
    pub items: Vec<UnusualClauseItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusualClauseItem {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Expected payload of the risk-explanations call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskExplanationsPayload {
    pub risks: Vec<RiskExplanation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskExplanation {
    pub code: String,
    pub description: String,
    pub severity: Severity,
}

/// Prompt asking the model to surface unusual clauses.
pub fn unusual_clauses_prompt(contract_text: &str) -> String {
    format!(
        r#"You are reviewing a United States residential real-estate purchase contract.

Identify clauses that are unusual, one-sided, or outside standard practice.

Respond with JSON only, in exactly this shape:
{{"items": [{{"text": "the clause text", "reason": "why it is unusual"}}]}}

Return {{"items": []}} if nothing is unusual. Do not add commentary.

Contract text:
{}"#,
        contract_text
    )
}

/// Prompt asking the model to explain contract risks.
pub fn risk_explanations_prompt(contract_text: &str) -> String {
    format!(
        r#"You are reviewing a United States residential real-estate purchase contract.

List concrete risks a buyer's agent should raise, each with a short stable
code, a one-sentence description, and a severity of "low", "medium",
"high", or "critical".

Respond with JSON only, in exactly this shape:
{{"risks": [{{"code": "RISK_CODE", "description": "what and why", "severity": "medium"}}]}}

Return {{"risks": []}} if there is nothing to raise. Do not add commentary.

Contract text:
{}"#,
        contract_text
    )
}

/// Parse a payload strictly, falling back to the first brace-delimited
/// substring
/// when the model wrapped its JSON in prose. `None` means "no signal".
pub fn parse_payload<T: DeserializeOwned>(raw: &str) -> Option<T> {
    if let Ok(payload) = serde_json::from_str(raw) {
        return Some(payload);
    }

    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&raw[start..=end]).ok()
}
