//! Per-contract analysis cache with single-flight deduplication.
//!
//! The cache stores the full [`RiskAnalysis`] keyed by contract id, with a
//! monotonic timestamp; freshness is decided at read time against the
//! caller-supplied TTL. The flight locks serialize computations per
//! contract id: a caller that waited on the lock re-probes the cache and
//! adopts the result the first caller produced.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dealscore_core::RiskAnalysis;
use parking_lot::Mutex;

struct CachedAnalysis {
    analysis: RiskAnalysis,
    stored_at: Instant,
}

/// Process-wide analysis cache. Not a cross-process cache; a distributed
/// deployment would add an external cache collaborator.
#[derive(Default)]
pub struct AnalysisCache {
    entries: Mutex<HashMap<String, CachedAnalysis>>,
    flights: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl AnalysisCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cached analysis no older than `ttl`, if present. Stale entries
    /// are dropped on the way out.
    pub fn get(&self, contract_id: &str, ttl: Duration) -> Option<RiskAnalysis> {
        let mut entries = self.entries.lock();
        match entries.get(contract_id) {
            Some(cached) if cached.stored_at.elapsed() < ttl => Some(cached.analysis.clone()),
            Some(_) => {
                entries.remove(contract_id);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, analysis: RiskAnalysis) {
        self.entries.lock().insert(
            analysis.contract_id.clone(),
            CachedAnalysis {
                analysis,
                stored_at: Instant::now(),
            },
        );
    }

    /// Wipe one contract's entry, or all of them.
    pub fn clear(&self, contract_id: Option<&str>) {
        let mut entries = self.entries.lock();
        match contract_id {
            Some(id) => {
                entries.remove(id);
            }
            None => entries.clear(),
        }
    }

    pub fn entry_count(&self) -> usize {
        self.entries.lock().len()
    }

    /// The single-flight lock for a contract id, created lazily. Holding
    /// the guard means no other computation for that id runs.
    pub fn flight_lock(&self, contract_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.flights
            .lock()
            .entry(contract_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}
