// src/config/watch.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{env, fs};

pub const ENV_CONFIG_PATH: &str = "WATCH_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/watch.toml";

fn default_poll_interval_secs() -> u64 {
    60
}
fn default_min_check_interval_secs() -> u64 {
    60
}
fn default_notifications_enabled() -> bool {
    true
}
fn default_items_per_source_limit() -> usize {
    5
}
fn default_fetch_timeout_secs() -> u64 {
    30
}
fn default_registry_path() -> PathBuf {
    PathBuf::from("state/sources.json")
}
fn default_ledger_path() -> PathBuf {
    PathBuf::from("state/seen.db")
}
fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Scheduler tick.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Triggers closer together than this are coalesced. Should be at least
    /// `poll_interval_secs` when an external trigger fires more often.
    #[serde(default = "default_min_check_interval_secs")]
    pub min_check_interval_secs: u64,
    #[serde(default = "default_notifications_enabled")]
    pub notifications_enabled: bool,
    /// Recency window per channel.
    #[serde(default = "default_items_per_source_limit")]
    pub items_per_source_limit: usize,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_registry_path")]
    pub registry_path: PathBuf,
    #[serde(default = "default_ledger_path")]
    pub ledger_path: PathBuf,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            min_check_interval_secs: default_min_check_interval_secs(),
            notifications_enabled: default_notifications_enabled(),
            items_per_source_limit: default_items_per_source_limit(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            registry_path: default_registry_path(),
            ledger_path: default_ledger_path(),
            listen_addr: default_listen_addr(),
        }
    }
}

impl WatchConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading watch config from {}", path.display()))?;
        Self::from_toml_str(&data)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: WatchConfig = toml::from_str(s).context("parsing watch config")?;
        cfg.sanitize();
        Ok(cfg)
    }

    /// Load using env var + fallbacks, then apply `WATCH_*` overrides:
    /// 1) $WATCH_CONFIG_PATH (must exist)
    /// 2) config/watch.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        let mut cfg = match env::var(ENV_CONFIG_PATH) {
            Ok(p) => {
                let pb = PathBuf::from(p);
                if !pb.exists() {
                    return Err(anyhow!(
                        "{ENV_CONFIG_PATH} points to non-existent path {}",
                        pb.display()
                    ));
                }
                Self::load_from_file(&pb)?
            }
            Err(_) => {
                let pb = PathBuf::from(DEFAULT_CONFIG_PATH);
                if pb.exists() {
                    Self::load_from_file(&pb)?
                } else {
                    Self::default()
                }
            }
        };
        cfg.apply_env_overrides()?;
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(v) = env_parse("WATCH_POLL_INTERVAL_SECS")? {
            self.poll_interval_secs = v;
        }
        if let Some(v) = env_parse("WATCH_MIN_CHECK_INTERVAL_SECS")? {
            self.min_check_interval_secs = v;
        }
        if let Some(v) = env_parse("WATCH_NOTIFICATIONS_ENABLED")? {
            self.notifications_enabled = v;
        }
        if let Some(v) = env_parse("WATCH_ITEMS_PER_SOURCE")? {
            self.items_per_source_limit = v;
        }
        if let Some(v) = env_parse("WATCH_FETCH_TIMEOUT_SECS")? {
            self.fetch_timeout_secs = v;
        }
        if let Ok(v) = env::var("WATCH_LISTEN_ADDR") {
            if !v.trim().is_empty() {
                self.listen_addr = v.trim().to_string();
            }
        }
        self.sanitize();
        Ok(())
    }

    /// Zero is never valid for the positive settings; fall back to defaults.
    fn sanitize(&mut self) {
        if self.poll_interval_secs == 0 {
            tracing::warn!("poll_interval_secs must be > 0; using default");
            self.poll_interval_secs = default_poll_interval_secs();
        }
        if self.items_per_source_limit == 0 {
            tracing::warn!("items_per_source_limit must be > 0; using default");
            self.items_per_source_limit = default_items_per_source_limit();
        }
        if self.fetch_timeout_secs == 0 {
            tracing::warn!("fetch_timeout_secs must be > 0; using default");
            self.fetch_timeout_secs = default_fetch_timeout_secs();
        }
    }
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow!("invalid {key}='{raw}': {e}")),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg = WatchConfig::from_toml_str("items_per_source_limit = 8").unwrap();
        assert_eq!(cfg.items_per_source_limit, 8);
        assert_eq!(cfg.poll_interval_secs, 60);
        assert_eq!(cfg.min_check_interval_secs, 60);
        assert!(cfg.notifications_enabled);
        assert_eq!(cfg.fetch_timeout_secs, 30);
    }

    #[test]
    fn zeroes_fall_back_to_defaults() {
        let cfg = WatchConfig::from_toml_str(
            "poll_interval_secs = 0\nitems_per_source_limit = 0\nmin_check_interval_secs = 0",
        )
        .unwrap();
        assert_eq!(cfg.poll_interval_secs, 60);
        assert_eq!(cfg.items_per_source_limit, 5);
        // 0 is a legal gate: it disables coalescing.
        assert_eq!(cfg.min_check_interval_secs, 0);
    }

    #[test]
    fn bad_types_are_rejected() {
        assert!(WatchConfig::from_toml_str("poll_interval_secs = \"soon\"").is_err());
    }
}
