use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::Command;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use tracing::{debug, info};

use snapkeep_core::{parse_snapshot_name, snapshot_name};
use snapkeep_provider::SnapshotProvider;

/// Provider backed by the `btrfs` CLI. Snapshots live directly under the
/// mountpoint, named `{prefix}-{YYYY-MM-DD}`, taken from the live subvolume.
#[derive(Clone, Debug)]
pub struct BtrfsProvider {
    mountpoint: PathBuf,
    live_subvolume: String,
    prefix: String,
    read_only: bool,
}

impl BtrfsProvider {
    pub fn new(
        mountpoint: impl Into<PathBuf>,
        live_subvolume: impl Into<String>,
        prefix: impl Into<String>,
        read_only: bool,
    ) -> Self {
        Self {
            mountpoint: mountpoint.into(),
            live_subvolume: live_subvolume.into(),
            prefix: prefix.into(),
            read_only,
        }
    }

    pub fn live_path(&self) -> PathBuf {
        self.mountpoint.join(&self.live_subvolume)
    }

    pub fn snapshot_path(&self, date: NaiveDate) -> PathBuf {
        self.mountpoint.join(snapshot_name(&self.prefix, date))
    }

    fn run(args: &[&str]) -> Result<String> {
        let mut cmd = Command::new("btrfs");
        cmd.args(args);
        let out = cmd.output().with_context(|| format!("run btrfs {:?}", args))?;
        if !out.status.success() {
            return Err(anyhow!(
                "command failed: btrfs {:?}\nstdout:{}\nstderr:{}",
                args,
                String::from_utf8_lossy(&out.stdout),
                String::from_utf8_lossy(&out.stderr)
            ));
        }
        Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
    }
}

impl SnapshotProvider for BtrfsProvider {
    fn list(&self) -> Result<BTreeSet<NaiveDate>> {
        if !self.mountpoint.is_dir() {
            return Err(anyhow!(
                "mountpoint {} is not a directory",
                self.mountpoint.display()
            ));
        }
        let mountpoint = self
            .mountpoint
            .to_str()
            .ok_or_else(|| anyhow!("mountpoint path is not valid UTF-8"))?;
        let out = Self::run(&["subvolume", "list", "-o", mountpoint])?;
        Ok(parse_listing(&self.prefix, &out))
    }

    fn create(&self, date: NaiveDate) -> Result<()> {
        let src = self.live_path();
        if !src.exists() {
            return Err(anyhow!("live subvolume {} does not exist", src.display()));
        }
        let dest = self.snapshot_path(date);
        if dest.exists() {
            // btrfs would otherwise nest a new snapshot inside the old one
            return Err(anyhow!("snapshot {} already exists", dest.display()));
        }
        let src = src.to_str().ok_or_else(|| anyhow!("source path is not valid UTF-8"))?;
        let dest = dest.to_str().ok_or_else(|| anyhow!("target path is not valid UTF-8"))?;
        if self.read_only {
            Self::run(&["subvolume", "snapshot", "-r", src, dest])?;
        } else {
            Self::run(&["subvolume", "snapshot", src, dest])?;
        }
        info!("created snapshot {}", dest);
        Ok(())
    }

    fn delete(&self, date: NaiveDate) -> Result<()> {
        let path = self.snapshot_path(date);
        if !path.exists() {
            return Err(anyhow!("snapshot {} does not exist", path.display()));
        }
        let path = path.to_str().ok_or_else(|| anyhow!("snapshot path is not valid UTF-8"))?;
        Self::run(&["subvolume", "delete", path])?;
        info!("deleted snapshot {}", path);
        Ok(())
    }
}

/// Parse `btrfs subvolume list -o <mountpoint>` output into snapshot dates.
///
/// Lines look like `ID 257 gen 123 top level 5 path @snaps/snap-2024-03-01`;
/// only the final path component matters. Subvolumes that do not carry the
/// prefix (or whose tail is not a date) are someone else's and are skipped.
pub fn parse_listing(prefix: &str, output: &str) -> BTreeSet<NaiveDate> {
    let mut dates = BTreeSet::new();
    for line in output.lines() {
        let Some((_, path)) = line.split_once(" path ") else {
            continue;
        };
        let name = path.trim().rsplit('/').next().unwrap_or(path);
        match parse_snapshot_name(prefix, name) {
            Some(date) => {
                dates.insert(date);
            }
            None => debug!("skipping foreign subvolume {}", name),
        }
    }
    dates
}

/// Probe for the `btrfs` binary, for doctor checks.
pub fn btrfs_available() -> bool {
    Command::new("btrfs")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn listing_parses_prefixed_dates_only() {
        let out = "\
ID 256 gen 31 top level 5 path @live
ID 257 gen 40 top level 5 path snap-2024-03-01
ID 258 gen 41 top level 5 path @snaps/snap-2024-03-02
ID 259 gen 42 top level 5 path other-2024-03-03
ID 260 gen 43 top level 5 path snap-not-a-date";
        let dates = parse_listing("snap", out);
        assert_eq!(
            dates.into_iter().collect::<Vec<_>>(),
            vec![date(2024, 3, 1), date(2024, 3, 2)]
        );
    }

    #[test]
    fn listing_of_garbage_is_empty() {
        assert!(parse_listing("snap", "").is_empty());
        assert!(parse_listing("snap", "ERROR: cannot access mountpoint").is_empty());
    }

    #[test]
    fn list_rejects_missing_mountpoint() {
        let provider = BtrfsProvider::new("/definitely/not/a/mountpoint", "@live", "snap", true);
        let err = provider.list().unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }

    #[test]
    fn create_requires_live_subvolume() {
        let dir = tempdir().unwrap();
        let provider = BtrfsProvider::new(dir.path(), "@live", "snap", true);
        let err = provider.create(date(2024, 3, 1)).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn create_rejects_existing_target() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("@live")).unwrap();
        std::fs::create_dir(dir.path().join("snap-2024-03-01")).unwrap();
        let provider = BtrfsProvider::new(dir.path(), "@live", "snap", true);
        let err = provider.create(date(2024, 3, 1)).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn delete_requires_existing_snapshot() {
        let dir = tempdir().unwrap();
        let provider = BtrfsProvider::new(dir.path(), "@live", "snap", true);
        let err = provider.delete(date(2024, 3, 1)).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn paths_are_derived_from_prefix_and_date() {
        let provider = BtrfsProvider::new("/mnt/pool", "@live", "root-snap", false);
        assert_eq!(provider.live_path(), PathBuf::from("/mnt/pool/@live"));
        assert_eq!(
            provider.snapshot_path(date(2024, 3, 1)),
            PathBuf::from("/mnt/pool/root-snap-2024-03-01")
        );
    }
}
