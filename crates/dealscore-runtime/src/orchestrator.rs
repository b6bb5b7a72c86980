//! Analysis orchestrator: the end-to-end "analyze one contract" flow.
//!
//! Coordinates rule evaluation, optional AI augmentation, scoring with
//! severity penalties, score persistence, history append, recommendation
//! synthesis, and the per-contract cache with single-flight deduplication.
//!
//! Failure policy: degrade rather than fail for AI and individual rule
//! faults; fail fast for contract lookup and persistence writes.
//! Cancellation observed before the persist step leaves no partial state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use thiserror::Error;

use dealscore_core::{
    aggregate_flags, build_engine, compute, count_by_severity, flag_penalty, risk_level,
    unsupported_state_flag, Recommendation, RiskAnalysis, RiskFlag, RiskHistoryEntry, RiskScore,
    RuleContext, ScoreInput, Severity, StateRegistry,
};

use crate::cache::AnalysisCache;
use crate::cancel::CancelToken;
use crate::config::RuntimeConfig;
use crate::history::{RiskHistoryStore, TrendReport};
use crate::prompts::{
    parse_payload, risk_explanations_prompt, unusual_clauses_prompt, RiskExplanationsPayload,
    UnusualClausesPayload,
};
use crate::providers::{AiProvider, AiRequest};
use crate::recommend::recommendations_for;
use crate::repos::{ContractRepo, RepoError, RiskScoreRepo};

/// Errors surfaced by the orchestrator.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("contract not found: {0}")]
    ContractNotFound(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("persistence failure: {0}")]
    Persistence(String),

    #[error("analysis cancelled")]
    Cancelled,
}

impl From<RepoError> for AnalysisError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(what) => AnalysisError::ContractNotFound(what),
            RepoError::Storage(what) => AnalysisError::Persistence(what),
        }
    }
}

/// Per-call options for one analysis.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    /// Skip AI augmentation entirely.
    pub skip_ai: bool,

    /// Bypass the cache and compute fresh. An in-progress computation for
    /// the same contract finishes first; it is not cancelled.
    pub force_refresh: bool,

    /// Cache TTL for this call; defaults to the configured TTL.
    pub cache_ttl: Option<Duration>,

    /// Cooperative cancellation token, checked at step boundaries.
    pub cancel: CancelToken,
}

/// One failed item in a batch.
#[derive(Debug, Clone)]
pub struct BatchFailure {
    pub contract_id: String,
    pub error: String,
}

/// Outcome of a batch analysis. `completed.len() + failed.len()` always
/// equals the input length.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub completed: Vec<RiskAnalysis>,
    pub failed: Vec<BatchFailure>,
    pub total_time: Duration,
}

/// The analysis orchestrator. One instance serves many concurrent
/// callers; per-contract work is serialized by the cache's flight locks.
pub struct AnalysisOrchestrator {
    contracts: Arc<dyn ContractRepo>,
    scores: Arc<dyn RiskScoreRepo>,
    history: Arc<RiskHistoryStore>,
    provider: Option<Arc<dyn AiProvider>>,
    cache: AnalysisCache,
    config: RuntimeConfig,
}

impl AnalysisOrchestrator {
    pub fn new(
        contracts: Arc<dyn ContractRepo>,
        scores: Arc<dyn RiskScoreRepo>,
        history: Arc<RiskHistoryStore>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            contracts,
            scores,
            history,
            provider: None,
            cache: AnalysisCache::new(),
            config,
        }
    }

    /// Attach an AI provider for augmentation. Without one, analyses are
    /// rule-only.
    pub fn with_provider(mut self, provider: Arc<dyn AiProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Analyze one contract, honoring the cache and single-flight.
    pub async fn analyze(
        &self,
        contract_id: &str,
        options: &AnalysisOptions,
    ) -> Result<RiskAnalysis, AnalysisError> {
        if contract_id.is_empty() {
            return Err(AnalysisError::Validation("empty contract id".to_string()));
        }

        let ttl = options.cache_ttl.unwrap_or(self.config.default_cache_ttl);

        if !options.force_refresh {
            if let Some(hit) = self.cache.get(contract_id, ttl) {
                return Ok(hit);
            }
        }

        // Single-flight: one computation per contract id. A caller that
        // waited here joins the finished result via the re-probe below.
        let flight = self.cache.flight_lock(contract_id);
        let _guard = flight.lock().await;

        if !options.force_refresh {
            if let Some(hit) = self.cache.get(contract_id, ttl) {
                return Ok(hit);
            }
        }

        if options.cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }

        let contract = self
            .contracts
            .find_by_id(contract_id)
            .await?
            .ok_or_else(|| AnalysisError::ContractNotFound(contract_id.to_string()))?;

        let ctx = RuleContext::new(contract);
        let contract_text = ctx.text().into_owned();

        // Rule evaluation: general rules plus the state's, when supported.
        let engine = build_engine(ctx.state_code());
        let results = engine.evaluate(&ctx);
        let mut flags = aggregate_flags(&results);

        if let Some(state) = ctx.state_code() {
            if !StateRegistry::is_supported(state) {
                flags.push(unsupported_state_flag(state));
            }
        }

        let mut unusual_clauses: Vec<String> = ctx
            .contract
            .clauses
            .iter()
            .filter(|c| c.flagged || c.clause_type == dealscore_core::ClauseType::Unusual)
            .map(|c| c.text.clone())
            .collect();

        // AI augmentation: best effort, never fatal, skipped on empty text.
        if !options.skip_ai && !contract_text.is_empty() {
            if let Some(provider) = &self.provider {
                let (ai_flags, ai_unusual) = self
                    .ai_signals(provider.as_ref(), &contract_text)
                    .await;
                flags.extend(ai_flags);
                unusual_clauses.extend(ai_unusual);
            }
        }

        // Score, then subtract severity penalties and re-clamp.
        let input = ScoreInput {
            contract_id: contract_id.to_string(),
            clauses: ctx.contract.clauses.iter().map(|c| c.text.clone()).collect(),
            disclosures_provided: ctx
                .contract
                .provided_disclosure_names()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            addenda_included: ctx
                .contract
                .included_addenda_names()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            unusual_clauses: unusual_clauses.clone(),
            missing_documents: ctx
                .contract
                .missing_disclosures()
                .iter()
                .map(|d| d.name.clone())
                .collect(),
            state: ctx.state_code().map(str::to_string),
        };
        let output = compute(&input, &self.config.weights);
        let score = dealscore_core::apply_penalty(output.total_score, flag_penalty(&flags));

        // No partial state once cancellation is observed.
        if options.cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }

        let risk_score = RiskScore {
            contract_id: contract_id.to_string(),
            score,
            calculated_at: Utc::now(),
            flags: flags.clone(),
            breakdown: Some(output.breakdown),
        };

        // Persist the score, then append history (in that order).
        self.scores.upsert(risk_score.clone()).await?;
        self.history.append(
            contract_id,
            RiskHistoryEntry {
                analyzed_at: risk_score.calculated_at,
                score,
                flags: flags.clone(),
            },
        );

        let analysis = RiskAnalysis {
            contract_id: contract_id.to_string(),
            summary: Self::build_summary(score, &flags, unusual_clauses.len()),
            explanations: Self::build_explanations(&flags, unusual_clauses.len()),
            score: risk_score,
        };

        self.cache.insert(analysis.clone());
        Ok(analysis)
    }

    /// Analyze several contracts sequentially. Per-item failures are
    /// recorded, never propagated; cancellation is honored between items.
    pub async fn analyze_batch(
        &self,
        contract_ids: &[String],
        options: &AnalysisOptions,
    ) -> BatchResult {
        let started = Instant::now();
        let mut result = BatchResult::default();

        for contract_id in contract_ids {
            if options.cancel.is_cancelled() {
                result.failed.push(BatchFailure {
                    contract_id: contract_id.clone(),
                    error: AnalysisError::Cancelled.to_string(),
                });
                continue;
            }

            match self.analyze(contract_id, options).await {
                Ok(analysis) => result.completed.push(analysis),
                Err(e) => {
                    tracing::warn!(contract_id = %contract_id, error = %e, "batch item failed");
                    result.failed.push(BatchFailure {
                        contract_id: contract_id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        result.total_time = started.elapsed();
        result
    }

    /// Recommendations for a contract's current analysis (computed or
    /// cached).
    pub async fn recommendations(
        &self,
        contract_id: &str,
        options: &AnalysisOptions,
    ) -> Result<Vec<Recommendation>, AnalysisError> {
        let analysis = self.analyze(contract_id, options).await?;
        Ok(recommendations_for(&analysis))
    }

    /// Trend of the contract's current score against its history.
    pub async fn trend(&self, contract_id: &str) -> Result<TrendReport, AnalysisError> {
        let current = self
            .scores
            .find_by_contract_id(contract_id)
            .await?
            .map(|score| score.score);
        Ok(self.history.trend(contract_id, current))
    }

    /// Wipe one contract's cached analysis, or all of them.
    pub fn clear_analysis_cache(&self, contract_id: Option<&str>) {
        self.cache.clear(contract_id);
    }

    /// The history store backing this orchestrator.
    pub fn history(&self) -> &RiskHistoryStore {
        &self.history
    }

    /// Issue the two augmentation prompts. Failures are logged and
    /// reported as empty signals.
    async fn ai_signals(
        &self,
        provider: &dyn AiProvider,
        contract_text: &str,
    ) -> (Vec<RiskFlag>, Vec<String>) {
        let mut flags = Vec::new();
        let mut unusual = Vec::new();

        let request = AiRequest::new(risk_explanations_prompt(contract_text));
        match provider.call(&request).await {
            Ok(response) if response.is_usable() => {
                if let Some(payload) = parse_payload::<RiskExplanationsPayload>(&response.raw) {
                    flags.extend(payload.risks.into_iter().map(|risk| {
                        RiskFlag::new(risk.code, risk.description, risk.severity)
                    }));
                }
            }
            Ok(response) => {
                tracing::warn!(
                    provider = provider.name(),
                    error = response.error.as_deref().unwrap_or("empty response"),
                    "risk explanation call degraded"
                );
            }
            Err(e) => {
                tracing::warn!(provider = provider.name(), error = %e, "risk explanation call failed");
            }
        }

        let request = AiRequest::new(unusual_clauses_prompt(contract_text));
        match provider.call(&request).await {
            Ok(response) if response.is_usable() => {
                if let Some(payload) = parse_payload::<UnusualClausesPayload>(&response.raw) {
                    unusual.extend(payload.items.into_iter().map(|item| item.text));
                }
            }
            Ok(response) => {
                tracing::warn!(
                    provider = provider.name(),
                    error = response.error.as_deref().unwrap_or("empty response"),
                    "unusual clause call degraded"
                );
            }
            Err(e) => {
                tracing::warn!(provider = provider.name(), error = %e, "unusual clause call failed");
            }
        }

        (flags, unusual)
    }

    fn build_summary(score: u8, flags: &[RiskFlag], unusual_count: usize) -> String {
        let counts = count_by_severity(flags);
        format!(
            "{} risk ({}/100): {} critical, {} high, {} unusual clause(s)",
            risk_level(score).as_str(),
            score,
            counts.get(&Severity::Critical).copied().unwrap_or(0),
            counts.get(&Severity::High).copied().unwrap_or(0),
            unusual_count,
        )
    }

    fn build_explanations(flags: &[RiskFlag], unusual_count: usize) -> Vec<String> {
        let mut explanations: Vec<String> = flags
            .iter()
            .map(|flag| format!("{}: {}", flag.severity.as_str(), flag.description))
            .collect();
        if unusual_count > 0 {
            explanations.push(format!("{} unusual clause(s) identified", unusual_count));
        }
        explanations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::{InMemoryContractRepo, InMemoryRiskScoreRepo};
    use dealscore_core::{Clause, Contract, ContractStatus, Disclosure};

    fn contract(id: &str, state: Option<&str>) -> Contract {
        Contract {
            id: id.to_string(),
            title: "123 Main St".to_string(),
            user_id: "u-1".to_string(),
            organization_id: "o-1".to_string(),
            state: state.map(str::to_string),
            status: ContractStatus::Submitted,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            clauses: vec![Clause::standard(
                "Financing contingency of 21 days; buyer is pre-approved. \
                 Inspection contingency period is 10 days with a home inspection \
                 and pest inspection, repair cap and credit option. Earnest money \
                 of $10,000 deposited within 3 days with Pacific Escrow Company; \
                 purchase price is $500,000; deposit is refundable. Appraisal \
                 contingency applies.",
            )],
            disclosures: vec![
                Disclosure::new("TDS", true, true),
                Disclosure::new("NHD", true, true),
                Disclosure::new("Lead-Based Paint Disclosure", true, true),
            ],
            addenda: vec![],
            documents: vec![],
        }
    }

    async fn orchestrator_with(contracts: Vec<Contract>) -> AnalysisOrchestrator {
        let contract_repo = InMemoryContractRepo::new();
        for contract in contracts {
            contract_repo.create(contract).await.unwrap();
        }
        AnalysisOrchestrator::new(
            contract_repo,
            InMemoryRiskScoreRepo::new(),
            Arc::new(RiskHistoryStore::new()),
            RuntimeConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_missing_contract_fails_fast() {
        let orchestrator = orchestrator_with(vec![]).await;
        let err = orchestrator
            .analyze("missing", &AnalysisOptions::default())
            .await;
        assert!(matches!(err, Err(AnalysisError::ContractNotFound(_))));
    }

    #[tokio::test]
    async fn test_empty_id_is_validation_error() {
        let orchestrator = orchestrator_with(vec![]).await;
        let err = orchestrator.analyze("", &AnalysisOptions::default()).await;
        assert!(matches!(err, Err(AnalysisError::Validation(_))));
    }

    #[tokio::test]
    async fn test_clean_contract_scores_high_and_persists() {
        let orchestrator = orchestrator_with(vec![contract("c-1", Some("CA"))]).await;
        let analysis = orchestrator
            .analyze("c-1", &AnalysisOptions::default())
            .await
            .unwrap();

        assert!(analysis.score.flags.is_empty(), "{:?}", analysis.score.flags);
        assert!(analysis.score.score >= 80);
        assert_eq!(orchestrator.history().entry_count("c-1"), 1);
    }

    #[tokio::test]
    async fn test_cache_hit_returns_same_analysis() {
        let orchestrator = orchestrator_with(vec![contract("c-1", Some("CA"))]).await;
        let options = AnalysisOptions::default();

        let first = orchestrator.analyze("c-1", &options).await.unwrap();
        let second = orchestrator.analyze("c-1", &options).await.unwrap();

        assert_eq!(first, second);
        // The cached path did not re-persist or re-append history.
        assert_eq!(orchestrator.history().entry_count("c-1"), 1);
    }

    #[tokio::test]
    async fn test_force_refresh_appends_history() {
        let orchestrator = orchestrator_with(vec![contract("c-1", Some("CA"))]).await;

        orchestrator
            .analyze("c-1", &AnalysisOptions::default())
            .await
            .unwrap();
        orchestrator
            .analyze(
                "c-1",
                &AnalysisOptions {
                    force_refresh: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(orchestrator.history().entry_count("c-1"), 2);
    }

    #[tokio::test]
    async fn test_unsupported_state_still_scores() {
        let orchestrator = orchestrator_with(vec![contract("c-1", Some("WA"))]).await;
        let analysis = orchestrator
            .analyze("c-1", &AnalysisOptions::default())
            .await
            .unwrap();

        let unsupported: Vec<_> = analysis
            .score
            .flags
            .iter()
            .filter(|f| f.code == "UNSUPPORTED_STATE")
            .collect();
        assert_eq!(unsupported.len(), 1);
        assert_eq!(unsupported[0].severity, Severity::Medium);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_leaves_no_state() {
        let orchestrator = orchestrator_with(vec![contract("c-1", Some("CA"))]).await;
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = orchestrator
            .analyze(
                "c-1",
                &AnalysisOptions {
                    cancel,
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(err, Err(AnalysisError::Cancelled)));
        assert_eq!(orchestrator.history().entry_count("c-1"), 0);
    }

    #[tokio::test]
    async fn test_batch_records_failures_and_continues() {
        let orchestrator = orchestrator_with(vec![contract("c-1", Some("CA"))]).await;
        let ids = vec!["c-1".to_string(), "missing".to_string()];

        let result = orchestrator
            .analyze_batch(&ids, &AnalysisOptions::default())
            .await;

        assert_eq!(result.completed.len() + result.failed.len(), ids.len());
        assert_eq!(result.completed.len(), 1);
        assert_eq!(result.failed[0].contract_id, "missing");
    }

    #[tokio::test]
    async fn test_trend_after_analyses() {
        let orchestrator = orchestrator_with(vec![contract("c-1", Some("CA"))]).await;
        orchestrator
            .analyze("c-1", &AnalysisOptions::default())
            .await
            .unwrap();

        let trend = orchestrator.trend("c-1").await.unwrap();
        assert!(trend.current_score.is_some());
        assert_eq!(trend.history_count, 1);
    }

    #[tokio::test]
    async fn test_summary_mentions_risk_level() {
        let orchestrator = orchestrator_with(vec![contract("c-1", Some("CA"))]).await;
        let analysis = orchestrator
            .analyze("c-1", &AnalysisOptions::default())
            .await
            .unwrap();
        assert!(analysis.summary.starts_with("Low risk"));
    }
}
