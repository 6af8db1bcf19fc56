use std::sync::LazyLock;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use regex::Regex;

use crate::date_util::{last_day_of_month, quarter_of};
use crate::error::{Error, Result};
use serde::Serialize;

static RE_QUARTER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})-Q([1-4])$").unwrap());
static RE_WEEK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})-W(\d{1,2})$").unwrap());
static RE_MONTH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})$").unwrap());

/// The granularity of a metric rollup bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Week,
    Month,
    Quarter,
}

impl PeriodType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodType::Week => "week",
            PeriodType::Month => "month",
            PeriodType::Quarter => "quarter",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "week" | "w" => Ok(PeriodType::Week),
            "month" | "m" => Ok(PeriodType::Month),
            "quarter" | "q" => Ok(PeriodType::Quarter),
            other => Err(Error::PeriodParse(format!("unknown period type: {other}"))),
        }
    }
}

/// A concrete time bucket for metrics.
///
/// Weeks are ISO weeks (Monday through Sunday); the week year is the ISO
/// week-based year, so the key of a date near Jan 1 may carry the prior or
/// next calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    /// ISO week-based year + ISO week number.
    Week(i32, u32),
    Month(i32, u32),
    Quarter(i32, u8),
}

impl Period {
    /// Parse a period key string.
    ///
    /// Supported formats:
    /// - `2025-W05` — ISO week
    /// - `2025-01` — month
    /// - `2025-Q1` — quarter
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        if let Some(caps) = RE_QUARTER.captures(s) {
            let year: i32 = caps[1].parse().unwrap();
            let q: u8 = caps[2].parse().unwrap();
            return Ok(Period::Quarter(year, q));
        }

        if let Some(caps) = RE_WEEK.captures(s) {
            let year: i32 = caps[1].parse().unwrap();
            let week: u32 = caps[2].parse().unwrap();
            if (1..=53).contains(&week) {
                return Ok(Period::Week(year, week));
            }
        }

        if let Some(caps) = RE_MONTH.captures(s) {
            let year: i32 = caps[1].parse().unwrap();
            let month: u32 = caps[2].parse().unwrap();
            if (1..=12).contains(&month) {
                return Ok(Period::Month(year, month));
            }
        }

        Err(Error::PeriodParse(format!("unrecognized period: {s}")))
    }

    /// The bucket of the given type containing `date`.
    pub fn from_date(period_type: PeriodType, date: NaiveDate) -> Self {
        match period_type {
            PeriodType::Week => {
                let iw = date.iso_week();
                Period::Week(iw.year(), iw.week())
            }
            PeriodType::Month => Period::Month(date.year(), date.month()),
            PeriodType::Quarter => Period::Quarter(date.year(), quarter_of(date)),
        }
    }

    pub fn period_type(&self) -> PeriodType {
        match self {
            Period::Week(..) => PeriodType::Week,
            Period::Month(..) => PeriodType::Month,
            Period::Quarter(..) => PeriodType::Quarter,
        }
    }

    /// Convert to a canonical key string for storage/lookup.
    pub fn to_key(&self) -> String {
        match self {
            Period::Week(y, w) => format!("{y}-W{w:02}"),
            Period::Month(y, m) => format!("{y}-{m:02}"),
            Period::Quarter(y, q) => format!("{y}-Q{q}"),
        }
    }

    /// Get the date range (inclusive start, inclusive end) for this period.
    pub fn date_range(&self) -> (NaiveDate, NaiveDate) {
        match self {
            Period::Week(y, w) => {
                let start = NaiveDate::from_isoywd_opt(*y, *w, Weekday::Mon)
                    .unwrap_or(NaiveDate::from_isoywd_opt(*y, 52, Weekday::Mon).unwrap());
                (start, start + Duration::days(6))
            }
            Period::Month(y, m) => (
                NaiveDate::from_ymd_opt(*y, *m, 1).unwrap(),
                last_day_of_month(*y, *m),
            ),
            Period::Quarter(y, q) => {
                let start_month = (*q as u32 - 1) * 3 + 1;
                let end_month = *q as u32 * 3;
                (
                    NaiveDate::from_ymd_opt(*y, start_month, 1).unwrap(),
                    last_day_of_month(*y, end_month),
                )
            }
        }
    }

    /// The next period of the same type. Derived from the date range so week
    /// 52/53 rollovers come out of the calendar rather than arithmetic.
    pub fn next(&self) -> Self {
        let (_, end) = self.date_range();
        Period::from_date(self.period_type(), end + Duration::days(1))
    }

    /// The previous period of the same type.
    pub fn previous(&self) -> Self {
        let (start, _) = self.date_range();
        Period::from_date(self.period_type(), start - Duration::days(1))
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quarter() {
        assert_eq!(Period::parse("2025-Q1").unwrap(), Period::Quarter(2025, 1));
        assert_eq!(Period::parse("2025-Q4").unwrap(), Period::Quarter(2025, 4));
    }

    #[test]
    fn test_parse_month() {
        assert_eq!(Period::parse("2025-01").unwrap(), Period::Month(2025, 1));
        assert_eq!(Period::parse("2025-12").unwrap(), Period::Month(2025, 12));
    }

    #[test]
    fn test_parse_week() {
        assert_eq!(Period::parse("2025-W05").unwrap(), Period::Week(2025, 5));
        assert_eq!(Period::parse("2025-W1").unwrap(), Period::Week(2025, 1));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(Period::parse("garbage").is_err());
        assert!(Period::parse("2025-Q5").is_err());
        assert!(Period::parse("2025-13").is_err());
        assert!(Period::parse("2025-W54").is_err());
    }

    #[test]
    fn test_to_key() {
        assert_eq!(Period::Week(2025, 5).to_key(), "2025-W05");
        assert_eq!(Period::Month(2025, 1).to_key(), "2025-01");
        assert_eq!(Period::Quarter(2025, 1).to_key(), "2025-Q1");
    }

    #[test]
    fn test_date_range_week_starts_monday() {
        let (s, e) = Period::Week(2025, 1).date_range();
        assert_eq!(s.weekday(), Weekday::Mon);
        assert_eq!((e - s).num_days(), 6);
    }

    #[test]
    fn test_date_range_month() {
        let (s, e) = Period::Month(2025, 2).date_range();
        assert_eq!(s, NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
        assert_eq!(e, NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
    }

    #[test]
    fn test_date_range_quarter() {
        let (s, e) = Period::Quarter(2025, 2).date_range();
        assert_eq!(s, NaiveDate::from_ymd_opt(2025, 4, 1).unwrap());
        assert_eq!(e, NaiveDate::from_ymd_opt(2025, 6, 30).unwrap());
    }

    #[test]
    fn test_from_date_week_boundary() {
        // A Wednesday maps to the week whose Monday precedes it
        let wed = NaiveDate::from_ymd_opt(2025, 8, 6).unwrap();
        let p = Period::from_date(PeriodType::Week, wed);
        let (start, end) = p.date_range();
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 8, 4).unwrap());
        assert!(wed >= start && wed <= end);

        // A Monday maps to the week starting that same day, not the prior week
        let mon = NaiveDate::from_ymd_opt(2025, 8, 4).unwrap();
        let p = Period::from_date(PeriodType::Week, mon);
        assert_eq!(p.date_range().0, mon);
    }

    #[test]
    fn test_from_date_contains_date() {
        let d = NaiveDate::from_ymd_opt(2025, 5, 17).unwrap();
        for pt in [PeriodType::Week, PeriodType::Month, PeriodType::Quarter] {
            let p = Period::from_date(pt, d);
            let (s, e) = p.date_range();
            assert!(d >= s && d <= e, "{pt:?} range [{s}, {e}] misses {d}");
        }
    }

    #[test]
    fn test_next_and_previous() {
        assert_eq!(Period::Month(2025, 12).next(), Period::Month(2026, 1));
        assert_eq!(Period::Month(2026, 1).previous(), Period::Month(2025, 12));
        assert_eq!(Period::Quarter(2025, 4).next(), Period::Quarter(2026, 1));

        // ISO year 2026 week 53 does not exist; 2026-W01 starts Dec 29 2025
        let last_week_2025 = Period::from_date(
            PeriodType::Week,
            NaiveDate::from_ymd_opt(2025, 12, 28).unwrap(),
        );
        let next = last_week_2025.next();
        assert_eq!(next.to_key(), "2026-W01");
        assert_eq!(next.previous(), last_week_2025);
    }

    #[test]
    fn test_iso_week_year_near_january() {
        // 2026-01-01 falls in ISO week 2026-W01 which began 2025-12-29
        let p = Period::from_date(PeriodType::Week, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        assert_eq!(p, Period::Week(2026, 1));
        assert_eq!(
            p.date_range().0,
            NaiveDate::from_ymd_opt(2025, 12, 29).unwrap()
        );
    }

    #[test]
    fn test_period_type_parse() {
        assert_eq!(PeriodType::parse("week").unwrap(), PeriodType::Week);
        assert_eq!(PeriodType::parse("M").unwrap(), PeriodType::Month);
        assert_eq!(PeriodType::parse("quarter").unwrap(), PeriodType::Quarter);
        assert!(PeriodType::parse("fortnight").is_err());
    }
}
