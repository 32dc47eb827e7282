use std::collections::BTreeSet;

use chrono::NaiveDate;

/// Capability to create, delete, and enumerate snapshots keyed by date.
///
/// The engine never sees subvolume paths or names; mapping a date to the
/// on-disk snapshot (and back) is the adapter's concern.
pub trait SnapshotProvider: Send + Sync {
    /// Enumerate existing snapshot dates. Must fail loudly when the backing
    /// volume cannot be inspected, never silently return an empty set.
    fn list(&self) -> anyhow::Result<BTreeSet<NaiveDate>>;

    /// Create the snapshot for `date`. Must fail if one already exists for
    /// that date or the source volume is missing.
    fn create(&self, date: NaiveDate) -> anyhow::Result<()>;

    /// Delete the snapshot for `date`. Must fail if it does not exist.
    fn delete(&self, date: NaiveDate) -> anyhow::Result<()>;
}
