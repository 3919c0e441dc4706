//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the disbursement engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How long a request stays open for votes after creation.
    pub voting_period: Duration,

    /// Maximum length of a request's purpose text.
    pub max_purpose_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            voting_period: Duration::from_secs(72 * 60 * 60),
            max_purpose_len: 280,
        }
    }
}

impl EngineConfig {
    /// Config with a short voting period, for tests and demos.
    pub fn with_voting_period(voting_period: Duration) -> Self {
        Self {
            voting_period,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_voting_period_is_72_hours() {
        let config = EngineConfig::default();
        assert_eq!(config.voting_period, Duration::from_secs(72 * 60 * 60));
        assert_eq!(config.max_purpose_len, 280);
    }

    #[test]
    fn config_serde_roundtrip() {
        let config = EngineConfig::with_voting_period(Duration::from_secs(60));
        let json = serde_json::to_string(&config).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.voting_period, Duration::from_secs(60));
    }
}
