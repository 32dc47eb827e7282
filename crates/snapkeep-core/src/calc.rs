use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::{RetentionPlan, RetentionPolicy};

/// Most recent date on or before `today` whose weekday is `anchor`.
/// If `today` already falls on the anchor weekday, that is `today` itself.
pub fn previous_anchor(today: NaiveDate, anchor: Weekday) -> NaiveDate {
    let back = (today.weekday().num_days_from_monday() + 7 - anchor.num_days_from_monday()) % 7;
    today - Duration::days(i64::from(back))
}

/// Compute the dates each retention tier wants kept, given today's date.
///
/// Pure and deterministic; the imperative shell diffs the result against
/// the provider's listing.
///
/// - daily: `today` and the `daily - 1` days before it.
/// - weekly: the last anchor weekday and `weekly - 1` weeks before it.
/// - monthly: 4-week strides back from the weekly anchor. A month is
///   approximated as 4 weeks; whenever a stride lands past the 7th of a
///   month the anchor is pulled back one extra week, so anchors drift
///   toward month-start and then stay within the first seven days. Not a
///   calendar-month walk, and callers must not treat it as one.
pub fn compute_plan(today: NaiveDate, policy: &RetentionPolicy) -> RetentionPlan {
    let mut plan = RetentionPlan::default();

    for k in 0..policy.daily {
        plan.daily.insert(today - Duration::days(i64::from(k)));
    }

    let last_anchor = previous_anchor(today, policy.week_anchor);
    for k in 0..policy.weekly {
        plan.weekly.insert(last_anchor - Duration::weeks(i64::from(k)));
    }

    let mut anchor = last_anchor;
    for _ in 0..policy.monthly {
        if anchor.day() > 7 {
            anchor = anchor - Duration::weeks(1);
        }
        plan.monthly.insert(anchor);
        anchor = anchor - Duration::weeks(4);
    }

    plan
}
