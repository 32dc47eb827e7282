use chrono::Weekday;

/// Tiered retention policy, fixed for the duration of one run.
///
/// Counts are how many dates each tier keeps; zero disables the tier.
/// `week_anchor` is the weekday that defines "start of week" for the
/// weekly and monthly tiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub daily: u32,
    pub weekly: u32,
    pub monthly: u32,
    pub week_anchor: Weekday,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            daily: 7,
            weekly: 4,
            monthly: 12,
            week_anchor: Weekday::Mon,
        }
    }
}

impl RetentionPolicy {
    /// Upper bound on how many dates the policy can retain. Tiers may
    /// overlap on the same date, so the real wanted set can be smaller.
    pub fn max_retained(&self) -> u32 {
        self.daily + self.weekly + self.monthly
    }
}
