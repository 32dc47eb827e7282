use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;

/// The dates each tier wants kept, computed by [`compute_plan`].
///
/// Purely derived from (today, policy); discarded after the run. Deletion
/// decisions are driven by membership in the union, never by which tier
/// claimed a date.
///
/// [`compute_plan`]: crate::compute_plan
#[derive(Clone, Debug, Default, Serialize)]
pub struct RetentionPlan {
    pub daily: BTreeSet<NaiveDate>,
    pub weekly: BTreeSet<NaiveDate>,
    pub monthly: BTreeSet<NaiveDate>,
}

impl RetentionPlan {
    /// Union of all three tiers.
    pub fn wanted(&self) -> BTreeSet<NaiveDate> {
        let mut all = self.daily.clone();
        all.extend(&self.weekly);
        all.extend(&self.monthly);
        all
    }

    pub fn is_retained(&self, date: NaiveDate) -> bool {
        self.daily.contains(&date) || self.weekly.contains(&date) || self.monthly.contains(&date)
    }

    /// Tier labels a date belongs to, for human-readable listings.
    pub fn tiers_for(&self, date: NaiveDate) -> Vec<&'static str> {
        let mut tiers = Vec::new();
        if self.daily.contains(&date) {
            tiers.push("daily");
        }
        if self.weekly.contains(&date) {
            tiers.push("weekly");
        }
        if self.monthly.contains(&date) {
            tiers.push("monthly");
        }
        tiers
    }
}
