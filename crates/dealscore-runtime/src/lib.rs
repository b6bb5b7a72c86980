//! # dealscore-runtime
//!
//! Async orchestration around the deterministic `dealscore-core` engine:
//! repositories, AI augmentation, per-contract caching with single-flight,
//! score history with trends, recommendation synthesis, and multi-step
//! scan jobs.
//!
//! ## Important
//!
//! The AI provider is optional and strictly advisory. Every analysis
//! completes with rule-derived results when the provider is absent,
//! errors, times out, or returns unparseable output.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use dealscore_runtime::{
//!     AnalysisOptions, AnalysisOrchestrator, InMemoryContractRepo,
//!     InMemoryRiskScoreRepo, RiskHistoryStore, RuntimeConfig,
//! };
//!
//! let orchestrator = AnalysisOrchestrator::new(
//!     InMemoryContractRepo::new(),
//!     InMemoryRiskScoreRepo::new(),
//!     Arc::new(RiskHistoryStore::new()),
//!     RuntimeConfig::default(),
//! );
//! let analysis = orchestrator.analyze("contract-1", &AnalysisOptions::default()).await?;
//! println!("{}", analysis.summary);
//! ```

pub mod cache;
pub mod cancel;
pub mod config;
pub mod envelope;
pub mod history;
pub mod orchestrator;
pub mod prompts;
pub mod providers;
pub mod recommend;
pub mod repos;
pub mod scan;

pub use cache::AnalysisCache;
pub use cancel::CancelToken;
pub use config::RuntimeConfig;
pub use envelope::{EnvelopeStatus, ResponseEnvelope};
pub use history::{
    FlagChanges, HistoryStatistics, RiskHistoryStore, TrendDirection, TrendReport,
    MAX_HISTORY_ENTRIES,
};
pub use orchestrator::{
    AnalysisError, AnalysisOptions, AnalysisOrchestrator, BatchFailure, BatchResult,
};
pub use prompts::{
    parse_payload, risk_explanations_prompt, unusual_clauses_prompt, RiskExplanation,
    RiskExplanationsPayload, UnusualClauseItem, UnusualClausesPayload,
};
pub use providers::{AiProvider, AiRequest, AiResponse, ProviderError, TokenUsage};
pub use recommend::recommendations_for;
pub use repos::{
    ContractPatch, ContractRepo, InMemoryContractRepo, InMemoryRiskScoreRepo, RepoError,
    RiskScoreRepo,
};
pub use scan::{
    ScanBatchFailure, ScanBatchResult, ScanDriver, ScanError, ScanOptions, ScanProgress,
    ScanRequest, ScanResult, ScanStatus, ScanType,
};

#[cfg(feature = "anthropic")]
pub use providers::AnthropicProvider;
