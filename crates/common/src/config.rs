//! Typed TOML configuration for the gridplot services.
//!
//! Every section and field has a usable default so a missing file or a
//! partially written one still yields a working configuration; only a
//! present-but-unparsable file is an error.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::geometry::{GridBounds, ZoneBands};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub grid: GridConfig,

    #[serde(default)]
    pub gifts: GiftConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    /// Commission tier table seeded into a fresh ledger document.
    #[serde(default = "default_tiers")]
    pub tiers: Vec<TierConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            gifts: GiftConfig::default(),
            store: StoreConfig::default(),
            sync: SyncConfig::default(),
            tiers: default_tiers(),
        }
    }
}

/// Grid dimensions and pricing-zone row bands.
#[derive(Debug, Clone, Deserialize)]
pub struct GridConfig {
    #[serde(default = "default_grid_width")]
    pub width: u32,
    #[serde(default = "default_grid_height")]
    pub height: u32,
    #[serde(default)]
    pub zones: ZoneBands,
}

impl GridConfig {
    pub fn bounds(&self) -> GridBounds {
        GridBounds {
            width: self.width,
            height: self.height,
        }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: default_grid_width(),
            height: default_grid_height(),
            zones: ZoneBands::default(),
        }
    }
}

/// Gift values per zone, in minor currency units.
#[derive(Debug, Clone, Deserialize)]
pub struct GiftConfig {
    #[serde(default = "default_gold_value")]
    pub gold_value: u64,
    #[serde(default = "default_silver_value")]
    pub silver_value: u64,
    /// Days until an issued gift code expires. Absent = never.
    #[serde(default)]
    pub expiry_days: Option<u32>,
}

impl Default for GiftConfig {
    fn default() -> Self {
        Self {
            gold_value: default_gold_value(),
            silver_value: default_silver_value(),
            expiry_days: None,
        }
    }
}

/// Local persistence knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// How long a writer waits for the exclusive lock before giving up
    /// with a busy rejection.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    /// Attempts for a single atomic persist before the operation fails.
    #[serde(default = "default_persist_retries")]
    pub persist_retries: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            lock_timeout_ms: default_lock_timeout_ms(),
            persist_retries: default_persist_retries(),
        }
    }
}

/// Remote replication knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Burst-coalescing window before an upload is attempted.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// First retry delay; doubles each attempt.
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            max_attempts: default_max_attempts(),
            retry_base_ms: default_retry_base_ms(),
        }
    }
}

/// One commission tier: applies from `min_sales` cumulative sales upward.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct TierConfig {
    pub min_sales: u64,
    pub percent: u8,
}

fn default_grid_width() -> u32 {
    100
}
fn default_grid_height() -> u32 {
    100
}
fn default_gold_value() -> u64 {
    1_000_000_000
}
fn default_silver_value() -> u64 {
    500_000_000
}
fn default_data_dir() -> String {
    "./data".to_string()
}
fn default_lock_timeout_ms() -> u64 {
    5_000
}
fn default_persist_retries() -> u32 {
    3
}
fn default_debounce_ms() -> u64 {
    3_000
}
fn default_max_attempts() -> u32 {
    5
}
fn default_retry_base_ms() -> u64 {
    500
}

fn default_tiers() -> Vec<TierConfig> {
    vec![
        TierConfig {
            min_sales: 0,
            percent: 5,
        },
        TierConfig {
            min_sales: 10,
            percent: 7,
        },
        TierConfig {
            min_sales: 30,
            percent: 10,
        },
    ]
}

/// Load config from a TOML file path.
/// Missing file or parse failure is an error; use `Config::default()`
/// when no file is expected.
pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path.as_ref())?;
    let cfg: Config = toml::from_str(&s)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.grid.width, 100);
        assert_eq!(cfg.grid.height, 100);
        assert_eq!(cfg.grid.zones.gold_end, 9);
        assert_eq!(cfg.gifts.gold_value, 1_000_000_000);
        assert_eq!(cfg.gifts.silver_value, 500_000_000);
        assert_eq!(cfg.tiers.len(), 3);
        assert_eq!(cfg.tiers[1].percent, 7);
    }

    #[test]
    fn test_load_from_file_roundtrip() {
        let tmp = tempfile::NamedTempFile::new().expect("temp file");
        let toml = r#"
            [grid]
            width = 50
            height = 60

            [grid.zones]
            gold_end = 4
            silver_start = 5
            silver_end = 19

            [gifts]
            gold_value = 200
            silver_value = 100
            expiry_days = 30

            [store]
            data_dir = "./mydata"
            lock_timeout_ms = 250

            [sync]
            debounce_ms = 100

            [[tiers]]
            min_sales = 0
            percent = 3

            [[tiers]]
            min_sales = 5
            percent = 6
        "#;
        let mut f = tmp.reopen().expect("reopen");
        write!(f, "{}", toml).expect("write");
        let cfg = load_from_file(tmp.path()).expect("load");
        assert_eq!(cfg.grid.width, 50);
        assert_eq!(cfg.grid.zones.silver_end, 19);
        assert_eq!(cfg.gifts.expiry_days, Some(30));
        assert_eq!(cfg.store.data_dir, "./mydata");
        assert_eq!(cfg.store.lock_timeout_ms, 250);
        assert_eq!(cfg.sync.debounce_ms, 100);
        // persist_retries not given, falls back per-field
        assert_eq!(cfg.store.persist_retries, 3);
        assert_eq!(cfg.tiers.len(), 2);
        assert_eq!(cfg.tiers[1], TierConfig { min_sales: 5, percent: 6 });
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let tmp = tempfile::NamedTempFile::new().expect("temp file");
        let mut f = tmp.reopen().expect("reopen");
        write!(f, "[store]\ndata_dir = \"/var/lib/gridplot\"\n").expect("write");
        let cfg = load_from_file(tmp.path()).expect("load");
        assert_eq!(cfg.store.data_dir, "/var/lib/gridplot");
        assert_eq!(cfg.grid.width, 100);
        assert_eq!(cfg.tiers.len(), 3);
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(load_from_file("/nonexistent/gridplot.toml").is_err());
    }
}
