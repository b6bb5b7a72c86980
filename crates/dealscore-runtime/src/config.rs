//! Runtime configuration for the analysis orchestrator and AI adapter.

use std::time::Duration;

use dealscore_core::ScoreWeights;
use serde::{Deserialize, Serialize};

/// Configuration threaded through the orchestrator and provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Scoring weights; overridable per deployment.
    pub weights: ScoreWeights,

    /// Default analysis-cache TTL when the caller does not supply one.
    #[serde(with = "duration_secs")]
    pub default_cache_ttl: Duration,

    /// Model used for AI augmentation.
    pub ai_model: String,

    /// Maximum tokens per AI call.
    pub ai_max_tokens: u32,

    /// Temperature for AI calls (0.0 for deterministic output).
    pub ai_temperature: f32,

    /// Timeout for one AI call.
    #[serde(with = "duration_secs")]
    pub ai_timeout: Duration,
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            default_cache_ttl: Duration::from_secs(3600),
            ai_model: "claude-sonnet-4-5".to_string(),
            ai_max_tokens: 1024,
            ai_temperature: 0.0,
            ai_timeout: Duration::from_secs(15),
        }
    }
}
