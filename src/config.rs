//! Runtime configuration (spec §6): every setting is sourced from the
//! environment, with defaults matching the spec's stated defaults.
//! Per-provider API keys are read directly by each provider's
//! `from_env` constructor (spec §5); this module owns the settings
//! shared across the whole process — store, cache, and pool sizing.

use std::time::Duration;

use serde::Deserialize;

use crate::error::CoreError;
use crate::store::ir_mappings::IrMapping;
use crate::store::Store;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

pub struct AppConfig {
    pub database_path: String,
    pub db_pool_size: u32,
    pub db_recycle_secs: u64,
    pub redis_url: Option<String>,
    pub cache_enabled: bool,
    pub cache_ttl_secs: u64,
    pub l1_capacity: usize,
    pub ir_mappings_path: Option<String>,
    pub breaker_failure_threshold: u32,
    pub breaker_recovery_timeout: Duration,
    pub breaker_half_open_max_calls: u32,
    pub retry_max_attempts: u32,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
}

impl AppConfig {
    /// Load configuration from the environment (spec §6). Every field has
    /// a default; nothing is required to start the server except enough
    /// of a filesystem to hold the SQLite database.
    pub fn from_env() -> Self {
        Self {
            database_path: env_or("DATABASE_PATH", "./data/mcp.sqlite3"),
            db_pool_size: env_parse("DB_POOL_SIZE", 20),
            db_recycle_secs: env_parse("DB_POOL_RECYCLE_SECS", 3600),
            redis_url: crate::cache::redis::url_from_env(),
            cache_enabled: env_parse("CACHE_ENABLED", true),
            cache_ttl_secs: env_parse("CACHE_TTL_SECONDS", 3600),
            l1_capacity: env_parse("L1_CACHE_CAPACITY", 10_000),
            ir_mappings_path: std::env::var("IR_MAPPINGS_PATH").ok(),
            breaker_failure_threshold: env_parse("BREAKER_FAILURE_THRESHOLD", 5),
            breaker_recovery_timeout: Duration::from_secs(env_parse("BREAKER_RECOVERY_SECS", 60)),
            breaker_half_open_max_calls: env_parse("BREAKER_HALF_OPEN_MAX_CALLS", 3),
            retry_max_attempts: env_parse("RETRY_MAX_ATTEMPTS", 3),
            retry_base_delay: Duration::from_millis(env_parse("RETRY_BASE_DELAY_MS", 500)),
            retry_max_delay: Duration::from_secs(env_parse("RETRY_MAX_DELAY_SECS", 30)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct IrMappingsFile {
    companies: Vec<IrMappingEntry>,
}

#[derive(Debug, Deserialize)]
struct IrMappingEntry {
    ticker: String,
    company_name: String,
    ir_base_url: String,
    #[serde(default)]
    concall_url_pattern: Option<String>,
    #[serde(default)]
    concall_section_xpath: Option<String>,
    #[serde(default)]
    concall_section_css: Option<String>,
    market: String,
    country: String,
    #[serde(default = "default_true")]
    is_active: bool,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default = "default_verification_status")]
    verification_status: String,
}

fn default_true() -> bool {
    true
}

fn default_verification_status() -> String {
    "unverified".to_string()
}

/// Idempotently load the IR mappings seed file (spec §6 `{ companies: [...] }`
/// shape) into L2. Safe to call on every startup — each row is an upsert
/// keyed on `ticker`, so re-running with an unchanged file is a no-op.
pub fn load_ir_mappings(store: &Store, path: &str) -> Result<usize, CoreError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| CoreError::Fatal(format!("failed to read IR mappings file {path}: {e}")))?;
    let parsed: IrMappingsFile = serde_json::from_str(&raw)
        .map_err(|e| CoreError::Fatal(format!("failed to parse IR mappings file {path}: {e}")))?;

    let repo = store.ir_mappings()?;
    let count = parsed.companies.len();
    for entry in parsed.companies {
        repo.upsert(&IrMapping {
            ticker: entry.ticker,
            company_name: entry.company_name,
            ir_base_url: entry.ir_base_url,
            concall_url_pattern: entry.concall_url_pattern,
            concall_section_xpath: entry.concall_section_xpath,
            concall_section_css: entry.concall_section_css,
            market: entry.market,
            country: entry.country,
            is_active: entry.is_active,
            notes: entry.notes,
            verification_status: entry.verification_status,
        })?;
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_ir_mappings_file() {
        let json = r#"{
            "companies": [
                {
                    "ticker": "RELIANCE",
                    "company_name": "Reliance Industries",
                    "ir_base_url": "https://www.ril.com/ir",
                    "market": "NSE",
                    "country": "IN"
                }
            ]
        }"#;
        let parsed: IrMappingsFile = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.companies.len(), 1);
        assert!(parsed.companies[0].is_active);
        assert_eq!(parsed.companies[0].verification_status, "unverified");
    }
}
