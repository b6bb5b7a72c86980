//! Repository ports and in-memory implementations.
//!
//! Persistence technology is external; the runtime only sees these
//! traits. The in-memory implementations back tests and embedded use, and
//! are safe for concurrent access.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dealscore_core::{Contract, ContractStatus, RiskScore};
use parking_lot::RwLock;
use thiserror::Error;

/// Errors from repository operations.
#[derive(Error, Debug)]
pub enum RepoError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

/// Partial update applied to a stored contract.
#[derive(Debug, Clone, Default)]
pub struct ContractPatch {
    pub title: Option<String>,
    pub status: Option<ContractStatus>,
    pub clauses: Option<Vec<dealscore_core::Clause>>,
    pub disclosures: Option<Vec<dealscore_core::Disclosure>>,
    pub addenda: Option<Vec<dealscore_core::Addendum>>,
}

/// Contract storage port.
#[async_trait]
pub trait ContractRepo: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Contract>, RepoError>;

    async fn find_all(&self) -> Result<Vec<Contract>, RepoError>;

    async fn create(&self, contract: Contract) -> Result<Contract, RepoError>;

    async fn update(&self, id: &str, patch: ContractPatch) -> Result<Contract, RepoError>;

    /// Returns whether a contract was deleted.
    async fn delete_by_id(&self, id: &str) -> Result<bool, RepoError>;
}

/// Risk-score storage port. A contract has at most one current score;
/// prior scores live in the history store.
#[async_trait]
pub trait RiskScoreRepo: Send + Sync {
    async fn find_by_contract_id(&self, contract_id: &str)
        -> Result<Option<RiskScore>, RepoError>;

    /// Create or replace the current score for a contract.
    async fn upsert(&self, score: RiskScore) -> Result<RiskScore, RepoError>;

    async fn delete_by_contract_id(&self, contract_id: &str) -> Result<bool, RepoError>;
}

/// In-memory contract repository.
#[derive(Default)]
pub struct InMemoryContractRepo {
    contracts: RwLock<HashMap<String, Contract>>,
}

impl InMemoryContractRepo {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl ContractRepo for InMemoryContractRepo {
    async fn find_by_id(&self, id: &str) -> Result<Option<Contract>, RepoError> {
        Ok(self.contracts.read().get(id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Contract>, RepoError> {
        Ok(self.contracts.read().values().cloned().collect())
    }

    async fn create(&self, contract: Contract) -> Result<Contract, RepoError> {
        self.contracts
            .write()
            .insert(contract.id.clone(), contract.clone());
        Ok(contract)
    }

    async fn update(&self, id: &str, patch: ContractPatch) -> Result<Contract, RepoError> {
        let mut contracts = self.contracts.write();
        let contract = contracts
            .get_mut(id)
            .ok_or_else(|| RepoError::NotFound(format!("contract {}", id)))?;

        if let Some(title) = patch.title {
            contract.title = title;
        }
        if let Some(status) = patch.status {
            contract.status = status;
        }
        if let Some(clauses) = patch.clauses {
            contract.clauses = clauses;
        }
        if let Some(disclosures) = patch.disclosures {
            contract.disclosures = disclosures;
        }
        if let Some(addenda) = patch.addenda {
            contract.addenda = addenda;
        }
        contract.updated_at = Utc::now();

        Ok(contract.clone())
    }

    async fn delete_by_id(&self, id: &str) -> Result<bool, RepoError> {
        Ok(self.contracts.write().remove(id).is_some())
    }
}

/// In-memory risk-score repository.
#[derive(Default)]
pub struct InMemoryRiskScoreRepo {
    scores: RwLock<HashMap<String, RiskScore>>,
}

impl InMemoryRiskScoreRepo {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl RiskScoreRepo for InMemoryRiskScoreRepo {
    async fn find_by_contract_id(
        &self,
        contract_id: &str,
    ) -> Result<Option<RiskScore>, RepoError> {
        Ok(self.scores.read().get(contract_id).cloned())
    }

    async fn upsert(&self, score: RiskScore) -> Result<RiskScore, RepoError> {
        self.scores
            .write()
            .insert(score.contract_id.clone(), score.clone());
        Ok(score)
    }

    async fn delete_by_contract_id(&self, contract_id: &str) -> Result<bool, RepoError> {
        Ok(self.scores.write().remove(contract_id).is_some())
    }
}
