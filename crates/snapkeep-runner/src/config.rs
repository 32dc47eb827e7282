use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use snapkeep_core::RetentionPolicy;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("snapshot prefix must not be empty")]
    EmptyPrefix,
    #[error("snapshot prefix must not contain '/': {0}")]
    PrefixHasSlash(String),
    #[error("live subvolume name must not be empty")]
    EmptyLiveSubvolume,
    #[error("live subvolume name must not contain '/': {0}")]
    LiveSubvolumeHasSlash(String),
    #[error("week anchor {0:?} is not a weekday (try \"monday\" or \"mon\")")]
    BadWeekAnchor(String),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub volume: VolumeConfig,
    pub retention: RetentionConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VolumeConfig {
    /// Mountpoint of the btrfs volume holding both the live subvolume and
    /// the snapshots. `~` is expanded.
    pub mountpoint: String,
    /// Name of the live subvolume under the mountpoint.
    pub live_subvolume: String,
    /// Snapshot name prefix; snapshots are `{prefix}-{YYYY-MM-DD}`.
    pub prefix: String,
    /// Take read-only snapshots (`btrfs subvolume snapshot -r`).
    #[serde(default = "default_read_only")]
    pub read_only: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetentionConfig {
    pub daily: u32,
    pub weekly: u32,
    pub monthly: u32,
    /// Weekday name ("monday", "mon", ...) anchoring the weekly/monthly tiers.
    pub week_anchor: String,
}

fn default_read_only() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        let policy = RetentionPolicy::default();
        Self {
            volume: VolumeConfig {
                mountpoint: "/mnt/pool".to_string(),
                live_subvolume: "@live".to_string(),
                prefix: "snap".to_string(),
                read_only: true,
            },
            retention: RetentionConfig {
                daily: policy.daily,
                weekly: policy.weekly,
                monthly: policy.monthly,
                week_anchor: "monday".to_string(),
            },
        }
    }
}

impl Config {
    pub fn load_from(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let cfg: Config = toml::from_str(&s).with_context(|| format!("parse {}", path.display()))?;
        Ok(cfg)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let s = toml::to_string_pretty(self).context("serialize config")?;
        std::fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    /// Check everything that can be checked without touching the volume.
    /// Runs before any provider call.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.volume.prefix.is_empty() {
            return Err(ConfigError::EmptyPrefix);
        }
        if self.volume.prefix.contains('/') {
            return Err(ConfigError::PrefixHasSlash(self.volume.prefix.clone()));
        }
        if self.volume.live_subvolume.is_empty() {
            return Err(ConfigError::EmptyLiveSubvolume);
        }
        if self.volume.live_subvolume.contains('/') {
            return Err(ConfigError::LiveSubvolumeHasSlash(self.volume.live_subvolume.clone()));
        }
        self.week_anchor()?;
        Ok(())
    }

    pub fn week_anchor(&self) -> Result<Weekday, ConfigError> {
        self.retention
            .week_anchor
            .parse::<Weekday>()
            .map_err(|_| ConfigError::BadWeekAnchor(self.retention.week_anchor.clone()))
    }

    pub fn policy(&self) -> Result<RetentionPolicy, ConfigError> {
        Ok(RetentionPolicy {
            daily: self.retention.daily,
            weekly: self.retention.weekly,
            monthly: self.retention.monthly,
            week_anchor: self.week_anchor()?,
        })
    }

    /// Mountpoint with `~` expanded to the user's home directory.
    pub fn mountpoint_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.volume.mountpoint).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_config_is_valid() {
        let cfg = Config::default();
        cfg.validate().unwrap();
        let policy = cfg.policy().unwrap();
        assert_eq!(policy, RetentionPolicy::default());
    }

    #[test]
    fn toml_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snapkeep.toml");
        let mut cfg = Config::default();
        cfg.volume.prefix = "root-snap".to_string();
        cfg.retention.weekly = 8;
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.volume.prefix, "root-snap");
        assert_eq!(loaded.retention.weekly, 8);
        assert!(loaded.volume.read_only);
    }

    #[test]
    fn read_only_defaults_to_true_when_absent() {
        let cfg: Config = toml::from_str(
            r#"
            [volume]
            mountpoint = "/mnt/pool"
            live_subvolume = "@live"
            prefix = "snap"

            [retention]
            daily = 7
            weekly = 4
            monthly = 12
            week_anchor = "monday"
            "#,
        )
        .unwrap();
        assert!(cfg.volume.read_only);
    }

    #[test]
    fn validation_rejects_bad_fields() {
        let mut cfg = Config::default();
        cfg.volume.prefix = String::new();
        assert_eq!(cfg.validate(), Err(ConfigError::EmptyPrefix));

        let mut cfg = Config::default();
        cfg.volume.prefix = "a/b".to_string();
        assert!(matches!(cfg.validate(), Err(ConfigError::PrefixHasSlash(_))));

        let mut cfg = Config::default();
        cfg.volume.live_subvolume = String::new();
        assert_eq!(cfg.validate(), Err(ConfigError::EmptyLiveSubvolume));

        let mut cfg = Config::default();
        cfg.retention.week_anchor = "someday".to_string();
        assert!(matches!(cfg.validate(), Err(ConfigError::BadWeekAnchor(_))));
    }

    #[test]
    fn week_anchor_accepts_short_names() {
        let mut cfg = Config::default();
        cfg.retention.week_anchor = "sun".to_string();
        assert_eq!(cfg.week_anchor().unwrap(), Weekday::Sun);
    }

    #[test]
    fn mountpoint_tilde_is_expanded() {
        let mut cfg = Config::default();
        cfg.volume.mountpoint = "/mnt/pool".to_string();
        assert_eq!(cfg.mountpoint_path(), PathBuf::from("/mnt/pool"));

        cfg.volume.mountpoint = "~/pool".to_string();
        let expanded = cfg.mountpoint_path();
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().ends_with("/pool"));
    }
}
