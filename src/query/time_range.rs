use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::date_util::days_inclusive;
use crate::error::{Error, Result};

/// Reporting window selectable on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    Week,
    Month,
    #[serde(rename = "3months")]
    ThreeMonths,
    #[serde(rename = "4months")]
    FourMonths,
    #[serde(rename = "6months")]
    SixMonths,
    Year,
}

/// Per-selector window length (days) and week count used to scale capacity.
///
/// Months count as 4 weeks; only the year uses the calendar figure.
pub const RANGE_TABLE: [(TimeRange, i64, u32); 6] = [
    (TimeRange::Week, 7, 1),
    (TimeRange::Month, 30, 4),
    (TimeRange::ThreeMonths, 90, 12),
    (TimeRange::FourMonths, 120, 16),
    (TimeRange::SixMonths, 180, 24),
    (TimeRange::Year, 365, 52),
];

/// A concrete interval for a selector. Both ends inclusive on `allocation_date`,
/// spanning exactly the selector's day count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedRange {
    pub range: TimeRange,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub week_multiplier: u32,
}

impl TimeRange {
    pub const ALL: [TimeRange; 6] = [
        TimeRange::Week,
        TimeRange::Month,
        TimeRange::ThreeMonths,
        TimeRange::FourMonths,
        TimeRange::SixMonths,
        TimeRange::Year,
    ];

    /// Parse a selector string.
    ///
    /// Supported values: `week`, `month`, `3months`, `4months`, `6months`, `year`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim().to_lowercase();
        TimeRange::ALL
            .into_iter()
            .find(|r| r.to_key() == s)
            .ok_or_else(|| Error::TimeRangeParse(format!("unrecognized time range: {s}")))
    }

    /// Canonical key string, also used as the AI-insight cache key.
    pub fn to_key(&self) -> &'static str {
        match self {
            TimeRange::Week => "week",
            TimeRange::Month => "month",
            TimeRange::ThreeMonths => "3months",
            TimeRange::FourMonths => "4months",
            TimeRange::SixMonths => "6months",
            TimeRange::Year => "year",
        }
    }

    fn table_entry(&self) -> (i64, u32) {
        RANGE_TABLE
            .iter()
            .find(|(r, _, _)| r == self)
            .map(|(_, days, weeks)| (*days, *weeks))
            .unwrap_or((7, 1))
    }

    /// Length of the rolling window in days.
    pub fn days(&self) -> i64 {
        self.table_entry().0
    }

    /// Approximate number of weeks in the window, used to scale weekly capacity.
    pub fn week_multiplier(&self) -> u32 {
        self.table_entry().1
    }

    /// Anchor the selector on `now`: `[now - (days - 1), now]`.
    pub fn resolve(&self, now: NaiveDate) -> ResolvedRange {
        ResolvedRange {
            range: *self,
            start: now - Duration::days(self.days() - 1),
            end: now,
            week_multiplier: self.week_multiplier(),
        }
    }

    /// Anchor the selector on today's local date.
    pub fn resolve_today(&self) -> ResolvedRange {
        self.resolve(chrono::Local::now().date_naive())
    }
}

impl ResolvedRange {
    pub fn contains(&self, d: NaiveDate) -> bool {
        d >= self.start && d <= self.end
    }

    /// Calendar days covered, counting both ends.
    pub fn day_count(&self) -> i64 {
        days_inclusive(self.start, self.end)
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_key())
    }
}

impl std::str::FromStr for TimeRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TimeRange::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_all_selectors() {
        assert_eq!(TimeRange::parse("week").unwrap(), TimeRange::Week);
        assert_eq!(TimeRange::parse("month").unwrap(), TimeRange::Month);
        assert_eq!(TimeRange::parse("3months").unwrap(), TimeRange::ThreeMonths);
        assert_eq!(TimeRange::parse("4months").unwrap(), TimeRange::FourMonths);
        assert_eq!(TimeRange::parse("6months").unwrap(), TimeRange::SixMonths);
        assert_eq!(TimeRange::parse(" YEAR ").unwrap(), TimeRange::Year);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(TimeRange::parse("fortnight").is_err());
        assert!(TimeRange::parse("").is_err());
        assert!(TimeRange::parse("5months").is_err());
    }

    #[test]
    fn test_week_multipliers() {
        assert_eq!(TimeRange::Week.week_multiplier(), 1);
        assert_eq!(TimeRange::Month.week_multiplier(), 4);
        assert_eq!(TimeRange::ThreeMonths.week_multiplier(), 12);
        assert_eq!(TimeRange::FourMonths.week_multiplier(), 16);
        assert_eq!(TimeRange::SixMonths.week_multiplier(), 24);
        assert_eq!(TimeRange::Year.week_multiplier(), 52);
    }

    #[test]
    fn test_resolve_week() {
        let r = TimeRange::Week.resolve(day(2025, 3, 15));
        assert_eq!(r.start, day(2025, 3, 9));
        assert_eq!(r.end, day(2025, 3, 15));
        assert_eq!(r.week_multiplier, 1);
        assert_eq!(r.day_count(), 7);
    }

    #[test]
    fn test_resolve_month_is_rolling() {
        let r = TimeRange::Month.resolve(day(2025, 3, 15));
        assert_eq!(r.start, day(2025, 2, 14));
        assert_eq!(r.end, day(2025, 3, 15));
    }

    #[test]
    fn test_resolve_quarter() {
        let r = TimeRange::ThreeMonths.resolve(day(2025, 4, 1));
        assert_eq!(r.day_count(), 90);
    }

    #[test]
    fn test_every_window_spans_its_day_count() {
        let now = day(2025, 3, 15);
        for (range, days, _) in RANGE_TABLE {
            let r = range.resolve(now);
            assert_eq!(r.day_count(), days, "{range}");
            let inside = (0..=days + 1)
                .map(|i| now - Duration::days(i))
                .filter(|d| r.contains(*d))
                .count() as i64;
            assert_eq!(inside, days, "{range}");
        }
    }

    #[test]
    fn test_contains_covers_seven_days_for_week() {
        let r = TimeRange::Week.resolve(day(2025, 3, 15));
        assert!(r.contains(day(2025, 3, 9)));
        assert!(r.contains(day(2025, 3, 15)));
        assert!(!r.contains(day(2025, 3, 8)));
        assert!(!r.contains(day(2025, 3, 16)));
    }

    #[test]
    fn test_key_round_trip() {
        for r in TimeRange::ALL {
            assert_eq!(TimeRange::parse(r.to_key()).unwrap(), r);
        }
    }
}
