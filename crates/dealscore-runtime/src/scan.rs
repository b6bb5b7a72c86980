//! Scan driver: a multi-step job wrapper over rule evaluation.
//!
//! A scan runs a fixed sequence of skippable steps over raw contract
//! text, reporting progress per step. A step that fails is recorded in
//! the scan's error list and the job moves on; only cancellation stops a
//! scan. Scoring here uses the scan severity reducer (25/15/5/2), not the
//! analysis one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use dealscore_core::{
    clamp_score, scan_penalty, unsupported_state_flag, Clause, Contract, ContractStatus,
    RiskFlag, RuleCategory, RuleContext, RuleEngine, Severity, StateRegistry,
};

use crate::cancel::CancelToken;

/// Errors that stop a scan outright.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("scan cancelled")]
    Cancelled,

    #[error("unknown scan: {0}")]
    UnknownScan(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanType {
    Basic,
    Advanced,
    Custom,
}

/// A request to scan one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRequest {
    pub document_url: String,
    pub requested_by: String,
    pub scan_type: ScanType,
    #[serde(default)]
    pub options: ScanOptions,
}

/// Which steps to run. Every analysis step is individually skippable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanOptions {
    pub skip_clause_extraction: bool,
    pub skip_risk_detection: bool,
    pub skip_unusual_detection: bool,
    pub skip_state_rules: bool,
    /// State whose rules the "Apply state rules" step uses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip)]
    pub cancel: CancelToken,
}

/// Scan lifecycle: `Pending -> Running -> Completed | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Live progress of one scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanProgress {
    pub status: ScanStatus,
    pub percent: u8,
    pub step: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl ScanProgress {
    fn pending() -> Self {
        Self {
            status: ScanStatus::Pending,
            percent: 0,
            step: "Pending".to_string(),
            errors: Vec::new(),
        }
    }
}

/// Outcome of one completed scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub id: String,
    pub scan_id: String,
    pub findings: Vec<RiskFlag>,
    pub score: u8,
    pub completed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// One failed item in a scan batch.
#[derive(Debug, Clone)]
pub struct ScanBatchFailure {
    pub scan_id: String,
    pub error: String,
}

/// Batch outcome; `completed.len() + failed.len()` equals the input size.
#[derive(Debug, Clone, Default)]
pub struct ScanBatchResult {
    pub completed: Vec<ScanResult>,
    pub failed: Vec<ScanBatchFailure>,
    pub total_time: Duration,
}

/// Runs scans and tracks their progress.
#[derive(Default)]
pub struct ScanDriver {
    progress: RwLock<HashMap<String, ScanProgress>>,
    result_counter: AtomicU64,
}

impl ScanDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a scan in `Pending` state and return its id.
    pub fn submit(&self, request: &ScanRequest) -> String {
        let scan_id = format!(
            "scan-{}",
            self.result_counter.fetch_add(1, Ordering::SeqCst)
        );
        tracing::info!(scan_id = %scan_id, url = %request.document_url, "scan submitted");
        self.progress
            .write()
            .insert(scan_id.clone(), ScanProgress::pending());
        scan_id
    }

    /// Live progress for a scan.
    pub fn progress(&self, scan_id: &str) -> Option<ScanProgress> {
        self.progress.read().get(scan_id).cloned()
    }

    /// Run the scan steps over raw contract text.
    pub fn execute(
        &self,
        scan_id: &str,
        contract_text: &str,
        options: &ScanOptions,
    ) -> Result<ScanResult, ScanError> {
        let mut errors: Vec<String> = Vec::new();
        let mut findings: Vec<RiskFlag> = Vec::new();

        self.report(scan_id, ScanStatus::Running, 10, "Starting scan", &errors);

        // Extract clauses (20%).
        let clauses = if options.skip_clause_extraction {
            vec![contract_text.to_string()]
        } else {
            self.report(scan_id, ScanStatus::Running, 20, "Extract clauses", &errors);
            extract_clauses(contract_text)
        };
        self.check_cancel(scan_id, options, &errors)?;

        // Detect risks (40%).
        if !options.skip_risk_detection {
            self.report(scan_id, ScanStatus::Running, 40, "Detect risks", &errors);
            match run_general_rules(contract_text, &clauses, options.state.as_deref()) {
                Ok(flags) => findings.extend(flags),
                Err(e) => errors.push(format!("Detect risks: {}", e)),
            }
        }
        self.check_cancel(scan_id, options, &errors)?;

        // Detect unusual clauses (60%).
        if !options.skip_unusual_detection {
            self.report(
                scan_id,
                ScanStatus::Running,
                60,
                "Detect unusual clauses",
                &errors,
            );
            match detect_unusual_clauses(&clauses) {
                Ok(flags) => findings.extend(flags),
                Err(e) => errors.push(format!("Detect unusual clauses: {}", e)),
            }
        }
        self.check_cancel(scan_id, options, &errors)?;

        // Apply state rules (80%).
        if !options.skip_state_rules {
            self.report(scan_id, ScanStatus::Running, 80, "Apply state rules", &errors);
            if let Some(state) = options.state.as_deref() {
                match run_state_rules(contract_text, &clauses, state) {
                    Ok(flags) => findings.extend(flags),
                    Err(e) => errors.push(format!("Apply state rules: {}", e)),
                }
            }
        }
        self.check_cancel(scan_id, options, &errors)?;

        // Calculate risk score (90%).
        self.report(
            scan_id,
            ScanStatus::Running,
            90,
            "Calculate risk score",
            &errors,
        );
        let score = clamp_score(100.0 - scan_penalty(&findings) as f64);

        self.report(scan_id, ScanStatus::Completed, 100, "Scan complete", &errors);

        Ok(ScanResult {
            id: format!(
                "result-{}",
                self.result_counter.fetch_add(1, Ordering::SeqCst)
            ),
            scan_id: scan_id.to_string(),
            findings,
            score,
            completed_at: Utc::now(),
            errors,
        })
    }

    /// Reset a failed scan's progress and rerun it.
    pub fn retry_failed_scan(
        &self,
        scan_id: &str,
        contract_text: &str,
        options: &ScanOptions,
    ) -> Result<ScanResult, ScanError> {
        self.progress
            .write()
            .insert(scan_id.to_string(), ScanProgress::pending());
        self.execute(scan_id, contract_text, options)
    }

    /// Run several scans sequentially; failures are recorded, never
    /// propagated. Cancellation is honored between items.
    pub fn execute_batch(
        &self,
        items: &[(String, String)],
        options: &ScanOptions,
    ) -> ScanBatchResult {
        let started = Instant::now();
        let mut result = ScanBatchResult::default();

        for (scan_id, text) in items {
            if options.cancel.is_cancelled() {
                result.failed.push(ScanBatchFailure {
                    scan_id: scan_id.clone(),
                    error: ScanError::Cancelled.to_string(),
                });
                continue;
            }

            match self.execute(scan_id, text, options) {
                Ok(scan) => result.completed.push(scan),
                Err(e) => {
                    tracing::warn!(scan_id = %scan_id, error = %e, "scan batch item failed");
                    result.failed.push(ScanBatchFailure {
                        scan_id: scan_id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        result.total_time = started.elapsed();
        result
    }

    fn report(
        &self,
        scan_id: &str,
        status: ScanStatus,
        percent: u8,
        step: &str,
        errors: &[String],
    ) {
        tracing::debug!(scan_id = %scan_id, step = %step, percent = percent, "scan progress");
        self.progress.write().insert(
            scan_id.to_string(),
            ScanProgress {
                status,
                percent,
                step: step.to_string(),
                errors: errors.to_vec(),
            },
        );
    }

    fn check_cancel(
        &self,
        scan_id: &str,
        options: &ScanOptions,
        errors: &[String],
    ) -> Result<(), ScanError> {
        if options.cancel.is_cancelled() {
            self.report(scan_id, ScanStatus::Failed, 0, "Cancelled", errors);
            return Err(ScanError::Cancelled);
        }
        Ok(())
    }
}

/// Split raw text into clause candidates on blank lines and sentence
/// boundaries.
fn extract_clauses(text: &str) -> Vec<String> {
    text.split(|c| c == '\n' || c == ';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// A synthetic contract wrapping scanned text, so scan steps reuse the
/// rule engine unchanged.
fn synthetic_contract(text: &str, clauses: &[String], state: Option<&str>) -> RuleContext {
    let now = Utc::now();
    let contract = Contract {
        id: "scan".to_string(),
        title: "Scanned document".to_string(),
        user_id: String::new(),
        organization_id: String::new(),
        state: state.map(str::to_string),
        status: ContractStatus::Submitted,
        created_at: now,
        updated_at: now,
        clauses: clauses.iter().map(|c| Clause::standard(c.clone())).collect(),
        disclosures: vec![],
        addenda: vec![],
        documents: vec![],
    };
    RuleContext::new(contract).with_text(text)
}

fn run_general_rules(
    text: &str,
    clauses: &[String],
    state: Option<&str>,
) -> Result<Vec<RiskFlag>, String> {
    let ctx = synthetic_contract(text, clauses, state);
    let engine = RuleEngine::with_general_rules();
    let results = engine.evaluate(&ctx);
    Ok(dealscore_core::aggregate_flags(&results))
}

/// Per-clause unusual detection. Each clause that trips an unusual-clause
/// rule yields one `UNUSUAL_CLAUSE_{n}` flag, hard-coded medium.
fn detect_unusual_clauses(clauses: &[String]) -> Result<Vec<RiskFlag>, String> {
    let engine = RuleEngine::with_general_rules();
    let mut flags = Vec::new();

    for (index, clause) in clauses.iter().enumerate() {
        let ctx = synthetic_contract(clause, std::slice::from_ref(clause), None);
        let results = engine.evaluate_category(&ctx, RuleCategory::UnusualClause);
        if results.iter().any(|r| !r.passed) {
            flags.push(RiskFlag::new(
                format!("UNUSUAL_CLAUSE_{}", index + 1),
                format!("Unusual clause detected: {}", truncate(clause, 120)),
                Severity::Medium,
            ));
        }
    }

    Ok(flags)
}

fn run_state_rules(
    text: &str,
    clauses: &[String],
    state: &str,
) -> Result<Vec<RiskFlag>, String> {
    let Some(rules) = StateRegistry::create_rules(state, None) else {
        return Ok(vec![unsupported_state_flag(state)]);
    };

    let ctx = synthetic_contract(text, clauses, Some(state));
    let mut engine = RuleEngine::new();
    engine.register_all(rules);
    let results = engine.evaluate(&ctx);
    Ok(dealscore_core::aggregate_flags(&results))
}

fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
