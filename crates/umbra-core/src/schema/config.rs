//! Engine configuration (§6), deserializable from JSON/TOML and overlaid by
//! CLI flags in `umbra-cli`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Settlement network identifier.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NetworkKind {
    /// Production network.
    Mainnet,
    /// Developer-facing test network.
    Devnet,
}

/// Retry/backoff policy parameters (§4.K).
#[derive(Debug, Clone, Copy, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum retry attempts before surfacing `IndexerRateLimited`.
    pub max_retries: u32,
    /// Base delay, in milliseconds, before exponential growth.
    pub base_ms: u64,
    /// Maximum delay any single retry may wait, in milliseconds.
    pub cap_ms: u64,
    /// Jitter fraction applied on top of the exponential delay, `0.0..1.0`.
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_retries: 5, base_ms: 1_000, cap_ms: 30_000, jitter: 0.3 }
    }
}

/// Scanner tuning parameters (§4.I, §6).
#[derive(Debug, Clone, Copy, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct ScannerConfig {
    /// Trial-decryption concurrency.
    pub batch_size: u32,
    /// Optional lower bound on leaf creation slot.
    pub since_slot: Option<i64>,
    /// Optional cap on the number of accounts fetched per scan.
    pub max_accounts: Option<u32>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self { batch_size: 10, since_slot: None, max_accounts: None }
    }
}

/// Top-level engine configuration (§6).
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct Config {
    /// Base URL of the compressed-account indexer.
    pub indexer_url: String,
    /// Optional API key for the indexer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexer_key: Option<String>,
    /// Base URL of the settlement chain's RPC endpoint.
    pub settlement_rpc: String,
    /// The settlement program id commitments/nullifiers are addressed under.
    pub program_id: String,
    /// Target network.
    pub network: NetworkKind,
    /// Retry/backoff policy.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Scanner tuning.
    #[serde(default)]
    pub scanner: ScannerConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_values() {
        let retry = RetryConfig::default();
        assert_eq!(retry.max_retries, 5);
        assert_eq!(retry.base_ms, 1_000);
        assert_eq!(retry.cap_ms, 30_000);

        let scanner = ScannerConfig::default();
        assert_eq!(scanner.batch_size, 10);
        assert_eq!(scanner.since_slot, None);
    }

    #[test]
    fn deserializes_with_defaulted_sections() {
        let json = r#"{
            "indexer_url": "https://indexer.example",
            "settlement_rpc": "https://rpc.example",
            "program_id": "Prog1111111111111111111111111111111111111",
            "network": "devnet"
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.scanner.batch_size, 10);
    }
}
