use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Symmetric time tolerance around a transaction, inclusive at both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl fmt::Display for MatchWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

impl MatchWindow {
    /// `[at - tolerance, at + tolerance]`. A negative tolerance is treated as
    /// its magnitude; ends past the representable range clamp to it.
    pub fn around(at: DateTime<FixedOffset>, tolerance: Duration) -> Self {
        let tolerance = tolerance.abs();
        MatchWindow {
            start: at
                .checked_sub_signed(tolerance)
                .unwrap_or_else(|| DateTime::<Utc>::MIN_UTC.fixed_offset()),
            end: at
                .checked_add_signed(tolerance)
                .unwrap_or_else(|| DateTime::<Utc>::MAX_UTC.fixed_offset()),
        }
    }

    pub fn contains(self, at: DateTime<FixedOffset>) -> bool {
        at >= self.start && at <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn around_is_symmetric() {
        let w = MatchWindow::around(at("2021-02-16T10:00:00+10:00"), Duration::minutes(10));
        assert_eq!(w.start, at("2021-02-16T09:50:00+10:00"));
        assert_eq!(w.end, at("2021-02-16T10:10:00+10:00"));
    }

    #[test]
    fn contains_is_inclusive() {
        let w = MatchWindow::around(at("2021-02-16T10:00:00+10:00"), Duration::minutes(10));
        assert!(w.contains(at("2021-02-16T09:50:00+10:00")));
        assert!(w.contains(at("2021-02-16T10:10:00+10:00")));
        assert!(w.contains(at("2021-02-16T10:03:00+10:00")));
        assert!(!w.contains(at("2021-02-16T10:10:01+10:00")));
        assert!(!w.contains(at("2021-02-16T09:49:59+10:00")));
    }

    #[test]
    fn contains_compares_instants_across_offsets() {
        let w = MatchWindow::around(at("2021-02-16T10:00:00+10:00"), Duration::minutes(10));
        assert!(w.contains(at("2021-02-16T00:05:00+00:00")));
    }

    #[test]
    fn huge_tolerance_clamps_instead_of_overflowing() {
        let at = at("2021-02-16T10:00:00+10:00");
        let w = MatchWindow::around(at, Duration::MAX);
        assert!(w.contains(at));
        assert_eq!(w.start, DateTime::<Utc>::MIN_UTC.fixed_offset());
        assert_eq!(w.end, DateTime::<Utc>::MAX_UTC.fixed_offset());
    }

    #[test]
    fn negative_tolerance_uses_magnitude() {
        let w = MatchWindow::around(at("2021-02-16T10:00:00+10:00"), Duration::minutes(-5));
        assert!(w.start < w.end);
    }
}
