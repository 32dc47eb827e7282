use std::collections::BTreeSet;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;

use crate::traits::SnapshotProvider;

/// In-memory provider for tests. Not durable, but enforces the same
/// contract as the real adapter and can be told to fail specific calls.
#[derive(Default)]
pub struct MemoryProvider {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    snapshots: BTreeSet<NaiveDate>,
    fail_list: bool,
    fail_create: BTreeSet<NaiveDate>,
    fail_delete: BTreeSet<NaiveDate>,
    delete_attempts: Vec<NaiveDate>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dates(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        let provider = Self::default();
        provider.inner.lock().unwrap().snapshots = dates.into_iter().collect();
        provider
    }

    /// Current snapshot set, for assertions.
    pub fn dates(&self) -> BTreeSet<NaiveDate> {
        self.inner.lock().unwrap().snapshots.clone()
    }

    /// Every date a delete was attempted for, in call order, including
    /// attempts that were made to fail.
    pub fn delete_attempts(&self) -> Vec<NaiveDate> {
        self.inner.lock().unwrap().delete_attempts.clone()
    }

    pub fn fail_next_lists(&self) {
        self.inner.lock().unwrap().fail_list = true;
    }

    pub fn fail_create_of(&self, date: NaiveDate) {
        self.inner.lock().unwrap().fail_create.insert(date);
    }

    pub fn fail_delete_of(&self, date: NaiveDate) {
        self.inner.lock().unwrap().fail_delete.insert(date);
    }
}

impl SnapshotProvider for MemoryProvider {
    fn list(&self) -> Result<BTreeSet<NaiveDate>> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_list {
            return Err(anyhow!("listing failed (injected)"));
        }
        Ok(inner.snapshots.clone())
    }

    fn create(&self, date: NaiveDate) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_create.contains(&date) {
            return Err(anyhow!("create of {} failed (injected)", date));
        }
        if !inner.snapshots.insert(date) {
            return Err(anyhow!("snapshot for {} already exists", date));
        }
        Ok(())
    }

    fn delete(&self, date: NaiveDate) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.delete_attempts.push(date);
        if inner.fail_delete.contains(&date) {
            return Err(anyhow!("delete of {} failed (injected)", date));
        }
        if !inner.snapshots.remove(&date) {
            return Err(anyhow!("no snapshot exists for {}", date));
        }
        Ok(())
    }
}
