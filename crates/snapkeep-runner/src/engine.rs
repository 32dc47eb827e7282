use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use snapkeep_core::{compute_plan, RetentionPolicy};
use snapkeep_provider::SnapshotProvider;

/// Fatal run failures. Listing and creation abort the run; deletion
/// failures are per-date and live in [`RunReport::failed_deletions`].
#[derive(Debug, Error)]
pub enum RunError {
    #[error("listing snapshots failed")]
    ListFailed(#[source] anyhow::Error),
    #[error("creating snapshot for {date} failed")]
    CreateFailed {
        date: NaiveDate,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct DeletionFailure {
    pub date: NaiveDate,
    pub reason: String,
}

/// What one run did (or, under `--dry-run`, would have done).
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub today: NaiveDate,
    pub dry_run: bool,
    pub created: Option<NaiveDate>,
    /// Union of the tier sets this run kept snapshots for.
    pub retained: BTreeSet<NaiveDate>,
    pub deleted: BTreeSet<NaiveDate>,
    pub failed_deletions: Vec<DeletionFailure>,
}

impl RunReport {
    pub fn all_deletions_succeeded(&self) -> bool {
        self.failed_deletions.is_empty()
    }
}

/// One retention run: list existing snapshots, ensure today's exists,
/// compute the wanted set, delete everything outside it.
///
/// Phase order is the safety argument: today's snapshot is confirmed
/// before any deletion, so a failed run never shrinks recent history.
/// Re-running on the same day with unchanged provider state is a no-op.
pub fn run_once(
    today: NaiveDate,
    policy: &RetentionPolicy,
    provider: &dyn SnapshotProvider,
    dry_run: bool,
) -> Result<RunReport, RunError> {
    // Listing: without the current state there is no safe way to proceed.
    let existing = provider.list().map_err(RunError::ListFailed)?;
    debug!("found {} existing snapshots", existing.len());

    // Ensuring
    let mut created = None;
    if !existing.contains(&today) {
        if dry_run {
            info!("would create snapshot for {}", today);
        } else {
            provider
                .create(today)
                .map_err(|source| RunError::CreateFailed { date: today, source })?;
        }
        created = Some(today);
    }

    // Computing
    let plan = compute_plan(today, policy);
    let wanted = plan.wanted();

    // Reconciling: deletions are independent per date; one stuck snapshot
    // must not block cleanup of the rest.
    let mut candidates = existing;
    candidates.insert(today);
    let mut deleted = BTreeSet::new();
    let mut failed_deletions = Vec::new();
    for date in candidates.into_iter().filter(|d| !wanted.contains(d)) {
        if dry_run {
            info!("would delete snapshot for {}", date);
            deleted.insert(date);
            continue;
        }
        match provider.delete(date) {
            Ok(()) => {
                deleted.insert(date);
            }
            Err(err) => {
                warn!("deleting snapshot for {} failed: {:#}", date, err);
                failed_deletions.push(DeletionFailure {
                    date,
                    reason: format!("{:#}", err),
                });
            }
        }
    }

    if !failed_deletions.is_empty() {
        warn!(
            "{} of {} deletions failed",
            failed_deletions.len(),
            failed_deletions.len() + deleted.len()
        );
    }

    Ok(RunReport {
        today,
        dry_run,
        created,
        retained: wanted,
        deleted,
        failed_deletions,
    })
}
