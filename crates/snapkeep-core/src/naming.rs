use chrono::NaiveDate;

/// Date format used in snapshot names. Sorting names lexicographically
/// sorts them chronologically.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Deterministic snapshot name for a date: `{prefix}-{YYYY-MM-DD}`.
pub fn snapshot_name(prefix: &str, date: NaiveDate) -> String {
    format!("{}-{}", prefix, date.format(DATE_FORMAT))
}

/// Inverse of [`snapshot_name`]. Returns `None` for names that do not carry
/// this prefix or whose tail is not a valid calendar date, so listings can
/// skip foreign subvolumes without failing. Only the canonical zero-padded
/// form counts: chrono would happily parse `2024-3-5`, but no name we ever
/// wrote looks like that.
pub fn parse_snapshot_name(prefix: &str, name: &str) -> Option<NaiveDate> {
    let tail = name.strip_prefix(prefix)?.strip_prefix('-')?;
    let date = NaiveDate::parse_from_str(tail, DATE_FORMAT).ok()?;
    (snapshot_name(prefix, date) == name).then_some(date)
}
