//! Per-contract risk score history.
//!
//! An append-only, capped time series per contract. Writes for one
//! contract are serialized by the store lock, so the cap and append-order
//! invariants hold under concurrent use; reads see the last completed
//! write.

use std::collections::{HashMap, HashSet};

use chrono::{Duration, Utc};
use dealscore_core::{RiskFlag, RiskHistoryEntry};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Maximum entries retained per contract; the oldest are evicted first.
pub const MAX_HISTORY_ENTRIES: usize = 100;

/// Score-change threshold beyond which a trend counts as moving.
const TREND_THRESHOLD: i32 = 5;

/// Three-way trend classification, plus `New` for contracts with at most
/// one analysis behind them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Improving,
    Worsening,
    Stable,
    New,
}

/// Trend of the latest score against the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub current_score: Option<u8>,
    pub previous_score: Option<u8>,
    pub score_change: i32,
    pub direction: TrendDirection,
    pub history_count: usize,
}

impl TrendReport {
    /// The empty trend reported when a contract has no current score.
    fn empty(history_count: usize) -> Self {
        Self {
            current_score: None,
            previous_score: None,
            score_change: 0,
            direction: TrendDirection::New,
            history_count,
        }
    }
}

/// Flags entering and leaving between the last two entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlagChanges {
    pub new: Vec<RiskFlag>,
    pub resolved: Vec<RiskFlag>,
}

/// Aggregate statistics over a time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryStatistics {
    pub average_score: u8,
    pub min_score: u8,
    pub max_score: u8,
    /// Population standard deviation, rounded to two decimals.
    pub volatility: f64,
    pub entry_count: usize,
}

/// In-process history store, keyed by contract id.
#[derive(Default)]
pub struct RiskHistoryStore {
    entries: RwLock<HashMap<String, Vec<RiskHistoryEntry>>>,
}

impl RiskHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, evicting the oldest once the cap is exceeded.
    pub fn append(&self, contract_id: &str, entry: RiskHistoryEntry) {
        let mut entries = self.entries.write();
        let series = entries.entry(contract_id.to_string()).or_default();
        series.push(entry);
        if series.len() > MAX_HISTORY_ENTRIES {
            let excess = series.len() - MAX_HISTORY_ENTRIES;
            series.drain(..excess);
        }
    }

    /// The live window of entries for a contract, oldest first.
    pub fn get(&self, contract_id: &str) -> Option<Vec<RiskHistoryEntry>> {
        self.entries.read().get(contract_id).cloned()
    }

    pub fn entry_count(&self, contract_id: &str) -> usize {
        self.entries
            .read()
            .get(contract_id)
            .map_or(0, |series| series.len())
    }

    /// Classify the latest score against the previous history entry.
    ///
    /// `current_score` is the contract's current persisted score; with
    /// none, the trend is empty and labeled `New`. A history of at most
    /// one entry is also `New`.
    pub fn trend(&self, contract_id: &str, current_score: Option<u8>) -> TrendReport {
        let entries = self.entries.read();
        let series = entries.get(contract_id).map(Vec::as_slice).unwrap_or(&[]);

        let Some(current) = current_score else {
            return TrendReport::empty(series.len());
        };

        let previous = series
            .len()
            .checked_sub(2)
            .and_then(|i| series.get(i))
            .map(|entry| entry.score);
        let score_change = previous.map_or(0, |prev| current as i32 - prev as i32);

        let direction = if series.len() <= 1 {
            TrendDirection::New
        } else if score_change > TREND_THRESHOLD {
            TrendDirection::Improving
        } else if score_change < -TREND_THRESHOLD {
            TrendDirection::Worsening
        } else {
            TrendDirection::Stable
        };

        TrendReport {
            current_score: Some(current),
            previous_score: previous,
            score_change,
            direction,
            history_count: series.len(),
        }
    }

    /// Flags that entered and left between the last two entries, compared
    /// by code, preserving the original flag objects.
    pub fn flag_changes(&self, contract_id: &str) -> FlagChanges {
        let entries = self.entries.read();
        let series = entries.get(contract_id).map(Vec::as_slice).unwrap_or(&[]);

        let current = series.last().map(|e| e.flags.as_slice()).unwrap_or(&[]);
        let previous = series
            .len()
            .checked_sub(2)
            .and_then(|i| series.get(i))
            .map(|e| e.flags.as_slice())
            .unwrap_or(&[]);

        let current_codes: HashSet<&str> = current.iter().map(|f| f.code.as_str()).collect();
        let previous_codes: HashSet<&str> = previous.iter().map(|f| f.code.as_str()).collect();

        FlagChanges {
            new: current
                .iter()
                .filter(|f| !previous_codes.contains(f.code.as_str()))
                .cloned()
                .collect(),
            resolved: previous
                .iter()
                .filter(|f| !current_codes.contains(f.code.as_str()))
                .cloned()
                .collect(),
        }
    }

    /// Mean score over the last `days`, rounded to the nearest integer.
    /// Falls back to the latest entry's score when the window is empty,
    /// and to 0 when there are no entries at all.
    pub fn average_score_over_time(&self, contract_id: &str, days: i64) -> u8 {
        let entries = self.entries.read();
        let series = entries.get(contract_id).map(Vec::as_slice).unwrap_or(&[]);

        let scores = Self::window_scores(series, days);
        if scores.is_empty() {
            return series.last().map_or(0, |entry| entry.score);
        }

        let sum: u32 = scores.iter().map(|&s| s as u32).sum();
        (sum as f64 / scores.len() as f64).round() as u8
    }

    /// Aggregate statistics over the last `days`, with the same
    /// empty-window fallbacks as [`Self::average_score_over_time`].
    pub fn statistics(&self, contract_id: &str, days: i64) -> HistoryStatistics {
        let entries = self.entries.read();
        let series = entries.get(contract_id).map(Vec::as_slice).unwrap_or(&[]);

        let scores = Self::window_scores(series, days);
        if scores.is_empty() {
            let fallback = series.last().map_or(0, |entry| entry.score);
            return HistoryStatistics {
                average_score: fallback,
                min_score: fallback,
                max_score: fallback,
                volatility: 0.0,
                entry_count: 0,
            };
        }

        let sum: u32 = scores.iter().map(|&s| s as u32).sum();
        let mean = sum as f64 / scores.len() as f64;
        let variance = scores
            .iter()
            .map(|&s| (s as f64 - mean).powi(2))
            .sum::<f64>()
            / scores.len() as f64;
        let volatility = (variance.sqrt() * 100.0).round() / 100.0;

        HistoryStatistics {
            average_score: mean.round() as u8,
            min_score: scores.iter().copied().min().unwrap_or(0),
            max_score: scores.iter().copied().max().unwrap_or(0),
            volatility,
            entry_count: scores.len(),
        }
    }

    /// Remove a contract's history entirely.
    pub fn delete(&self, contract_id: &str) {
        self.entries.write().remove(contract_id);
    }

    fn window_scores(series: &[RiskHistoryEntry], days: i64) -> Vec<u8> {
        let cutoff = Utc::now() - Duration::days(days);
        series
            .iter()
            .filter(|entry| entry.analyzed_at >= cutoff)
            .map(|entry| entry.score)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealscore_core::Severity;

    fn entry(score: u8, days_ago: i64, flags: Vec<RiskFlag>) -> RiskHistoryEntry {
        RiskHistoryEntry {
            analyzed_at: Utc::now() - Duration::days(days_ago),
            score,
            flags,
        }
    }

    fn flag(code: &str) -> RiskFlag {
        RiskFlag::new(code, "test", Severity::Medium)
    }

    #[test]
    fn test_append_and_get() {
        let store = RiskHistoryStore::new();
        store.append("c-1", entry(80, 0, vec![]));

        let series = store.get("c-1").unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].score, 80);
    }

    #[test]
    fn test_cap_evicts_oldest_first() {
        let store = RiskHistoryStore::new();
        for i in 0..(MAX_HISTORY_ENTRIES + 10) {
            store.append("c-1", entry((i % 100) as u8, 0, vec![]));
        }

        let series = store.get("c-1").unwrap();
        assert_eq!(series.len(), MAX_HISTORY_ENTRIES);
        // The first 10 entries were evicted.
        assert_eq!(series[0].score, 10);
        // The latest entry is the last appended.
        assert_eq!(series.last().unwrap().score, ((MAX_HISTORY_ENTRIES + 9) % 100) as u8);
    }

    #[test]
    fn test_trend_improving() {
        let store = RiskHistoryStore::new();
        store.append("c-1", entry(60, 2, vec![]));
        store.append("c-1", entry(75, 0, vec![]));

        let trend = store.trend("c-1", Some(75));
        assert_eq!(trend.direction, TrendDirection::Improving);
        assert_eq!(trend.score_change, 15);
        assert_eq!(trend.previous_score, Some(60));
    }

    #[test]
    fn test_trend_worsening_and_stable() {
        let store = RiskHistoryStore::new();
        store.append("c-1", entry(80, 2, vec![]));
        store.append("c-1", entry(70, 0, vec![]));
        assert_eq!(
            store.trend("c-1", Some(70)).direction,
            TrendDirection::Worsening
        );

        let store = RiskHistoryStore::new();
        store.append("c-2", entry(80, 2, vec![]));
        store.append("c-2", entry(78, 0, vec![]));
        assert_eq!(
            store.trend("c-2", Some(78)).direction,
            TrendDirection::Stable
        );
    }

    #[test]
    fn test_trend_new_with_short_history() {
        let store = RiskHistoryStore::new();
        store.append("c-1", entry(80, 0, vec![]));

        let trend = store.trend("c-1", Some(80));
        assert_eq!(trend.direction, TrendDirection::New);
        assert_eq!(trend.score_change, 0);
    }

    #[test]
    fn test_trend_empty_without_current_score() {
        let store = RiskHistoryStore::new();
        let trend = store.trend("missing", None);
        assert_eq!(trend.direction, TrendDirection::New);
        assert_eq!(trend.current_score, None);
        assert_eq!(trend.history_count, 0);
    }

    #[test]
    fn test_flag_changes() {
        let store = RiskHistoryStore::new();
        store.append("c-1", entry(70, 2, vec![flag("A"), flag("B")]));
        store.append("c-1", entry(72, 0, vec![flag("B"), flag("C")]));

        let changes = store.flag_changes("c-1");
        assert_eq!(changes.new.len(), 1);
        assert_eq!(changes.new[0].code, "C");
        assert_eq!(changes.resolved.len(), 1);
        assert_eq!(changes.resolved[0].code, "A");
    }

    #[test]
    fn test_flag_changes_idempotent() {
        let store = RiskHistoryStore::new();
        store.append("c-1", entry(70, 2, vec![flag("A")]));
        store.append("c-1", entry(72, 0, vec![flag("B")]));

        let first = store.flag_changes("c-1");
        let second = store.flag_changes("c-1");
        assert_eq!(first, second);
    }

    #[test]
    fn test_flag_changes_single_entry_all_new() {
        let store = RiskHistoryStore::new();
        store.append("c-1", entry(70, 0, vec![flag("A")]));

        let changes = store.flag_changes("c-1");
        assert_eq!(changes.new.len(), 1);
        assert!(changes.resolved.is_empty());
    }

    #[test]
    fn test_average_over_window() {
        let store = RiskHistoryStore::new();
        store.append("c-1", entry(60, 40, vec![]));
        store.append("c-1", entry(70, 5, vec![]));
        store.append("c-1", entry(80, 1, vec![]));

        // Only the last two fall inside a 30-day window.
        assert_eq!(store.average_score_over_time("c-1", 30), 75);
    }

    #[test]
    fn test_average_empty_window_falls_back_to_latest() {
        let store = RiskHistoryStore::new();
        store.append("c-1", entry(66, 90, vec![]));
        assert_eq!(store.average_score_over_time("c-1", 7), 66);
    }

    #[test]
    fn test_average_no_entries_is_zero() {
        let store = RiskHistoryStore::new();
        assert_eq!(store.average_score_over_time("missing", 7), 0);
    }

    #[test]
    fn test_statistics() {
        let store = RiskHistoryStore::new();
        store.append("c-1", entry(70, 3, vec![]));
        store.append("c-1", entry(80, 2, vec![]));
        store.append("c-1", entry(90, 1, vec![]));

        let stats = store.statistics("c-1", 30);
        assert_eq!(stats.average_score, 80);
        assert_eq!(stats.min_score, 70);
        assert_eq!(stats.max_score, 90);
        assert_eq!(stats.entry_count, 3);
        // Population stddev of {70, 80, 90} is ~8.16.
        assert_eq!(stats.volatility, 8.16);
    }

    #[test]
    fn test_delete() {
        let store = RiskHistoryStore::new();
        store.append("c-1", entry(70, 0, vec![]));
        store.delete("c-1");
        assert!(store.get("c-1").is_none());
    }
}
