use anyhow::{anyhow, Result};
use chrono::NaiveDate;

use crate::traits::SnapshotProvider;

/// Shared adapter contract suite. Intentionally small; runs against both
/// the in-memory provider and the real btrfs adapter (on a btrfs fixture).
///
/// Uses a date far enough in the past that no live snapshot set should
/// contain it. The provider is left as it was found.
pub fn run_provider_contract_suite(provider: &dyn SnapshotProvider) -> Result<()> {
    let probe = NaiveDate::from_ymd_opt(1999, 12, 31).expect("valid probe date");

    let before = provider.list()?;
    if before.contains(&probe) {
        return Err(anyhow!("probe date {} already present; refusing to run", probe));
    }

    provider.create(probe)?;
    let listed = provider.list()?;
    if !listed.contains(&probe) {
        return Err(anyhow!("created snapshot for {} not visible in listing", probe));
    }

    if provider.create(probe).is_ok() {
        return Err(anyhow!("duplicate create for {} must fail", probe));
    }

    provider.delete(probe)?;
    let listed = provider.list()?;
    if listed.contains(&probe) {
        return Err(anyhow!("deleted snapshot for {} still visible in listing", probe));
    }

    if provider.delete(probe).is_ok() {
        return Err(anyhow!("delete of missing snapshot for {} must fail", probe));
    }

    let after = provider.list()?;
    if after != before {
        return Err(anyhow!("contract suite must leave the snapshot set unchanged"));
    }

    Ok(())
}
