// src/config/settings.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::{env, fs};

use crate::ledger::RangeOrder;

const ENV_PATH: &str = "LEDGER_CONFIG_PATH";
const DEFAULT_PATH: &str = "config/ledger.toml";

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("data/visits.json")
}
fn default_true() -> bool {
    true
}

/// Backing store selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Memory,
    File,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    /// How `from`/`to` are read by range queries. Defaults to the legacy order.
    #[serde(default)]
    pub range_order: RangeOrder,
    #[serde(default)]
    pub store: StoreKind,
    /// Snapshot file, only used with `store = "file"`.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
    /// Empty the store once during startup.
    #[serde(default = "default_true")]
    pub flush_on_start: bool,
    /// Expose `/debug/buckets` and `/metrics`.
    #[serde(default)]
    pub debug_routes: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            range_order: RangeOrder::default(),
            store: StoreKind::default(),
            snapshot_path: default_snapshot_path(),
            flush_on_start: true,
            debug_routes: false,
        }
    }
}

impl LedgerConfig {
    /// Load from an explicit TOML file. Environment overrides are not applied.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading ledger config from {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("parsing ledger config {}", path.display()))
    }

    /// Load using env var + fallbacks, then apply env overrides:
    /// 1) $LEDGER_CONFIG_PATH
    /// 2) config/ledger.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = env::var(ENV_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else if Path::new(DEFAULT_PATH).exists() {
            Self::load_from(Path::new(DEFAULT_PATH))?
        } else {
            Self::default()
        };
        cfg.apply_env()?;
        Ok(cfg)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(v) = env_var("LEDGER_RANGE_ORDER") {
            self.range_order = v.parse()?;
        }
        if let Some(v) = env_var("LEDGER_STORE") {
            self.store = match v.to_ascii_lowercase().as_str() {
                "memory" => StoreKind::Memory,
                "file" => StoreKind::File,
                other => {
                    return Err(anyhow!(
                        "unknown LEDGER_STORE '{other}' (expected memory|file)"
                    ))
                }
            };
        }
        if let Some(v) = env_var("LEDGER_SNAPSHOT_PATH") {
            self.snapshot_path = PathBuf::from(v);
        }
        if let Some(v) = env_var("LEDGER_FLUSH_ON_START") {
            self.flush_on_start = parse_flag("LEDGER_FLUSH_ON_START", &v)?;
        }
        if let Some(v) = env_var("DEBUG_ROUTES") {
            self.debug_routes = parse_flag("DEBUG_ROUTES", &v)?;
        }
        Ok(())
    }
}

fn env_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_flag(key: &str, v: &str) -> Result<bool> {
    match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow!("{key} must be a boolean flag, got '{other}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENV_KEYS: [&str; 6] = [
        ENV_PATH,
        "LEDGER_RANGE_ORDER",
        "LEDGER_STORE",
        "LEDGER_SNAPSHOT_PATH",
        "LEDGER_FLUSH_ON_START",
        "DEBUG_ROUTES",
    ];

    fn clear_env() {
        for k in ENV_KEYS {
            env::remove_var(k);
        }
    }

    #[test]
    fn toml_fields_and_defaults() {
        let cfg: LedgerConfig = toml::from_str(
            r#"
range_order = "chronological"
store = "file"
"#,
        )
        .unwrap();
        assert_eq!(cfg.range_order, RangeOrder::Chronological);
        assert_eq!(cfg.store, StoreKind::File);
        assert_eq!(cfg.snapshot_path, default_snapshot_path());
        assert!(cfg.flush_on_start);
        assert!(!cfg.debug_routes);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<LedgerConfig>("range = 1").is_err());
    }

    #[serial_test::serial]
    #[test]
    fn env_path_then_overrides() {
        clear_env();
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("ledger.toml");
        fs::write(&p, "store = \"file\"\ndebug_routes = true\n").unwrap();

        env::set_var(ENV_PATH, p.display().to_string());
        let cfg = LedgerConfig::load_default().unwrap();
        assert_eq!(cfg.store, StoreKind::File);
        assert!(cfg.debug_routes);

        env::set_var("DEBUG_ROUTES", "0");
        env::set_var("LEDGER_RANGE_ORDER", "chronological");
        env::set_var("LEDGER_FLUSH_ON_START", "false");
        let cfg = LedgerConfig::load_default().unwrap();
        assert!(!cfg.debug_routes);
        assert!(!cfg.flush_on_start);
        assert_eq!(cfg.range_order, RangeOrder::Chronological);

        env::set_var("LEDGER_STORE", "redis");
        assert!(LedgerConfig::load_default().is_err());

        env::set_var(ENV_PATH, tmp.path().join("missing.toml").display().to_string());
        assert!(LedgerConfig::load_default().is_err());

        clear_env();
    }
}
