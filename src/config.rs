use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_ORACLE_TTL_SECS: u64 = 600;
pub const DEFAULT_ORACLE_CACHE_CAPACITY: u64 = 10_000;

/// Configuration for a [`TokenResolver`](crate::TokenResolver).
///
/// Decoupled from any application-specific config so every project
/// can map its own config into this struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub chain_id: u64,
    /// Human-readable network label used in diagnostics.
    pub network: String,
    /// How long an oracle read, successful or not, is reused.
    pub oracle_ttl_secs: u64,
    pub oracle_cache_capacity: u64,
}

impl ResolverConfig {
    pub fn oracle_ttl(&self) -> Duration {
        Duration::from_secs(self.oracle_ttl_secs)
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            network: "Mainnet".to_string(),
            oracle_ttl_secs: DEFAULT_ORACLE_TTL_SECS,
            oracle_cache_capacity: DEFAULT_ORACLE_CACHE_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: ResolverConfig =
            serde_json::from_str(r#"{"chain_id": 137, "network": "Polygon"}"#).unwrap();
        assert_eq!(config.chain_id, 137);
        assert_eq!(config.network, "Polygon");
        assert_eq!(config.oracle_ttl(), Duration::from_secs(600));
        assert_eq!(config.oracle_cache_capacity, DEFAULT_ORACLE_CACHE_CAPACITY);
    }

    #[test]
    fn test_empty_object_is_mainnet() {
        let config: ResolverConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ResolverConfig::default());
    }
}
