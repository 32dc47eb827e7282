use anyhow::{anyhow, Result};

use snapkeep_btrfs::btrfs_available;

use crate::Config;

/// Environment checks before a real run. Everything here is about the
/// machine, not the config values; `Config::validate` runs first.
pub fn doctor(cfg: &Config) -> Result<()> {
    cfg.validate()?;

    let mountpoint = cfg.mountpoint_path();
    if !mountpoint.is_dir() {
        return Err(anyhow!(
            "mountpoint {} is not a directory; is the volume mounted?",
            mountpoint.display()
        ));
    }

    let live = mountpoint.join(&cfg.volume.live_subvolume);
    if !live.exists() {
        return Err(anyhow!(
            "live subvolume {} not found under {}",
            cfg.volume.live_subvolume,
            mountpoint.display()
        ));
    }

    if !btrfs_available() {
        return Err(anyhow!("btrfs not found on PATH; install btrfs-progs"));
    }

    Ok(())
}
