//! # Period Module
//!
//! Calendar arithmetic for report buckets: date ranges, ISO weeks,
//! year-months, and the timestamp windows each bucket covers.
//!
//! ## Bucket Keys
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Period Keys                                       │
//! │                                                                         │
//! │  Granularity   Key            JSON label     Window                     │
//! │  ───────────   ────────────   ───────────    ──────────────────────     │
//! │  Day           NaiveDate      "2025-11-05"   00:00:00 → 23:59:59        │
//! │  Week          IsoWeekKey     "2025-W45"     Monday → Sunday 23:59:59   │
//! │  Month         YearMonth      "2025-11"      1st → last day 23:59:59    │
//! │                                                                         │
//! │  Windows are clipped to the requested range, so the last week/month    │
//! │  never reaches past date_to.                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Serialize, Serializer};
use std::fmt;

use crate::error::{CoreError, CoreResult};

/// Accepted format for `date_from` / `date_to` query parameters.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// How far past today `date_to` may reach.
pub const MAX_FUTURE_DAYS: u64 = 366;

/// Years a report may name. Beyond 9999 the `YYYY-MM-DD` rendering gains a
/// sign and no longer sorts as SQL TEXT.
const REPORTABLE_YEARS: std::ops::RangeInclusive<i32> = 1..=9999;

/// Returns the first instant of a calendar day.
pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Returns the last whole second of a calendar day (23:59:59).
pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(23, 59, 59)
        .unwrap_or_else(|| start_of_day(date))
}

/// Parses a `YYYY-MM-DD` string, returning `None` for anything else.
///
/// Blank strings and garbage are treated as "not provided" rather than as
/// errors: the dashboard sends empty pickers routinely.
pub fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT).ok()
}

// =============================================================================
// Date Range
// =============================================================================

/// An inclusive calendar date range `[from, to]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// Creates a range, rejecting `from > to`.
    pub fn new(from: NaiveDate, to: NaiveDate) -> CoreResult<Self> {
        if from > to {
            return Err(CoreError::InvertedDateRange {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        Ok(DateRange { from, to })
    }

    /// Resolves the range from raw query parameters.
    ///
    /// ## Defaulting Rules
    /// ```text
    /// date_to   missing/unparseable → today
    /// date_from missing/unparseable → date_to - default_days
    /// both present but inverted     → CoreError::InvertedDateRange
    /// date_to > today + 366 days    → CoreError::DateOutOfRange
    /// year outside 1..=9999         → CoreError::DateOutOfRange
    /// ```
    ///
    /// ## Example
    /// ```rust
    /// use chrono::NaiveDate;
    /// use tally_core::period::DateRange;
    ///
    /// let today = NaiveDate::from_ymd_opt(2025, 11, 30).unwrap();
    /// let range = DateRange::resolve(None, Some("garbage"), today, 90).unwrap();
    /// assert_eq!(range.to, today);
    /// assert_eq!(range.from, NaiveDate::from_ymd_opt(2025, 9, 1).unwrap());
    /// ```
    pub fn resolve(
        date_from: Option<&str>,
        date_to: Option<&str>,
        today: NaiveDate,
        default_days: u64,
    ) -> CoreResult<Self> {
        let latest = today
            .checked_add_days(Days::new(MAX_FUTURE_DAYS))
            .unwrap_or(today);

        let to = match parse_date(date_to) {
            Some(to) if to > latest || !REPORTABLE_YEARS.contains(&to.year()) => {
                return Err(out_of_range("date_to", to));
            }
            Some(to) => to,
            None => today,
        };
        let from = match parse_date(date_from) {
            Some(from) if !REPORTABLE_YEARS.contains(&from.year()) => {
                return Err(out_of_range("date_from", from));
            }
            Some(from) => from,
            None => to.checked_sub_days(Days::new(default_days)).unwrap_or(to),
        };
        DateRange::new(from, to)
    }

    /// First instant of the range.
    pub fn start_at(&self) -> NaiveDateTime {
        start_of_day(self.from)
    }

    /// Last second of the range (end-of-day inclusive).
    pub fn end_at(&self) -> NaiveDateTime {
        end_of_day(self.to)
    }

    /// Whether a calendar date falls inside the range.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && date <= self.to
    }

    /// The whole range as a single window.
    pub fn window(&self) -> BucketWindow {
        BucketWindow {
            start: self.start_at(),
            end: self.end_at(),
        }
    }
}

fn out_of_range(field: &str, date: NaiveDate) -> CoreError {
    CoreError::DateOutOfRange {
        field: field.to_string(),
        value: date.to_string(),
    }
}

// =============================================================================
// Bucket Window
// =============================================================================

/// A closed timestamp window `[start, end]` that one bucket covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl BucketWindow {
    /// Window spanning whole days from `first` through `last`.
    pub fn from_dates(first: NaiveDate, last: NaiveDate) -> Self {
        BucketWindow {
            start: start_of_day(first),
            end: end_of_day(last),
        }
    }

    /// Clips the window so it never extends past `range` on either side.
    pub fn clip(self, range: &DateRange) -> Self {
        BucketWindow {
            start: self.start.max(range.start_at()),
            end: self.end.min(range.end_at()),
        }
    }

    /// Clips only the upper bound (months run from first sale, not from date_from).
    pub fn clip_end(self, last: NaiveDate) -> Self {
        BucketWindow {
            start: self.start,
            end: self.end.min(end_of_day(last)),
        }
    }
}

// =============================================================================
// ISO Week
// =============================================================================

/// An ISO-8601 week, identified by its Monday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IsoWeekKey {
    monday: NaiveDate,
}

impl IsoWeekKey {
    /// The ISO week containing `date`.
    pub fn from_date(date: NaiveDate) -> Self {
        let offset = date.weekday().num_days_from_monday() as u64;
        IsoWeekKey {
            monday: date - Days::new(offset),
        }
    }

    /// Monday of this week.
    pub fn monday(&self) -> NaiveDate {
        self.monday
    }

    /// Sunday of this week.
    pub fn sunday(&self) -> NaiveDate {
        self.monday + Days::new(6)
    }

    /// ISO week-numbering year (may differ from the calendar year).
    pub fn year(&self) -> i32 {
        self.monday.iso_week().year()
    }

    /// ISO week number (1-53).
    pub fn week(&self) -> u32 {
        self.monday.iso_week().week()
    }
}

impl fmt::Display for IsoWeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year(), self.week())
    }
}

impl Serialize for IsoWeekKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// =============================================================================
// Year-Month
// =============================================================================

/// A calendar month, identified by its first day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    first: NaiveDate,
}

impl YearMonth {
    /// The month containing `date`.
    pub fn from_date(date: NaiveDate) -> Self {
        YearMonth {
            first: date.with_day(1).unwrap_or(date),
        }
    }

    /// Parses the `YYYY-MM` label produced by SQLite's `strftime('%Y-%m', ..)`.
    pub fn parse(label: &str) -> Option<Self> {
        let (year, month) = label.trim().split_once('-')?;
        let year: i32 = year.parse().ok()?;
        let month: u32 = month.parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, 1).map(|first| YearMonth { first })
    }

    /// First day of the month.
    pub fn first_day(&self) -> NaiveDate {
        self.first
    }

    /// Last day of the month.
    pub fn last_day(&self) -> NaiveDate {
        self.first + Months::new(1) - Days::new(1)
    }

    /// The following month.
    pub fn next(&self) -> Self {
        YearMonth {
            first: self.first + Months::new(1),
        }
    }

    pub fn year(&self) -> i32 {
        self.first.year()
    }

    pub fn month(&self) -> u32 {
        self.first.month()
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year(), self.month())
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Every month from the one containing `first` through the one containing
/// `last`, newest first. Empty when `first > last`.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use tally_core::period::month_span_desc;
///
/// let months = month_span_desc(
///     NaiveDate::from_ymd_opt(2025, 10, 20).unwrap(),
///     NaiveDate::from_ymd_opt(2025, 12, 2).unwrap(),
/// );
/// let labels: Vec<String> = months.iter().map(|m| m.to_string()).collect();
/// assert_eq!(labels, vec!["2025-12", "2025-11", "2025-10"]);
/// ```
pub fn month_span_desc(first: NaiveDate, last: NaiveDate) -> Vec<YearMonth> {
    if first > last {
        return Vec::new();
    }

    let end = YearMonth::from_date(last);
    let mut cursor = YearMonth::from_date(first);
    let mut months = Vec::new();
    while cursor <= end {
        months.push(cursor);
        cursor = cursor.next();
    }
    months.reverse();
    months
}

// =============================================================================
// Period Key
// =============================================================================

/// The key of one bucket row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PeriodKey {
    Day(NaiveDate),
    Week(IsoWeekKey),
    Month(YearMonth),
}

impl PeriodKey {
    /// JSON field name that carries the label (`date`, `week`, `month`).
    pub fn field_name(&self) -> &'static str {
        match self {
            PeriodKey::Day(_) => "date",
            PeriodKey::Week(_) => "week",
            PeriodKey::Month(_) => "month",
        }
    }

    /// Unclipped window of the period.
    pub fn window(&self) -> BucketWindow {
        match self {
            PeriodKey::Day(date) => BucketWindow::from_dates(*date, *date),
            PeriodKey::Week(week) => BucketWindow::from_dates(week.monday(), week.sunday()),
            PeriodKey::Month(month) => {
                BucketWindow::from_dates(month.first_day(), month.last_day())
            }
        }
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodKey::Day(date) => write!(f, "{}", date.format(DATE_FORMAT)),
            PeriodKey::Week(week) => week.fmt(f),
            PeriodKey::Month(month) => month.fmt(f),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_resolve_defaults_to_ninety_days() {
        let today = date(2025, 11, 30);
        let range = DateRange::resolve(None, None, today, 90).unwrap();
        assert_eq!(range.to, today);
        assert_eq!(range.from, date(2025, 9, 1));
    }

    #[test]
    fn test_resolve_ignores_unparseable_values() {
        let today = date(2025, 11, 30);
        let range = DateRange::resolve(Some("11/01/2025"), Some(""), today, 90).unwrap();
        assert_eq!(range, DateRange::resolve(None, None, today, 90).unwrap());
    }

    #[test]
    fn test_resolve_rejects_inverted_range() {
        let today = date(2025, 11, 30);
        let result = DateRange::resolve(Some("2025-11-10"), Some("2025-11-01"), today, 90);
        assert!(matches!(result, Err(CoreError::InvertedDateRange { .. })));
    }

    #[test]
    fn test_resolve_rejects_far_future_end() {
        let today = date(2025, 11, 30);
        let result = DateRange::resolve(Some("2025-11-01"), Some("9999-12-31"), today, 90);
        assert!(matches!(result, Err(CoreError::DateOutOfRange { .. })));

        // a year ahead is still allowed for forward-looking dashboards
        let range = DateRange::resolve(Some("2025-11-01"), Some("2026-11-30"), today, 90).unwrap();
        assert_eq!(range.to, date(2026, 11, 30));
    }

    #[test]
    fn test_resolve_rejects_unreportable_years() {
        let today = date(2025, 11, 30);
        let result = DateRange::resolve(Some("0000-06-15"), Some("2025-11-30"), today, 90);
        assert!(matches!(result, Err(CoreError::DateOutOfRange { .. })));
        let result = DateRange::resolve(None, Some("+262142-12-31"), today, 90);
        assert!(matches!(result, Err(CoreError::DateOutOfRange { .. })));
    }

    #[test]
    fn test_range_window_is_end_of_day_inclusive() {
        let range = DateRange::new(date(2025, 11, 1), date(2025, 11, 5)).unwrap();
        assert_eq!(range.start_at().to_string(), "2025-11-01 00:00:00");
        assert_eq!(range.end_at().to_string(), "2025-11-05 23:59:59");
    }

    #[test]
    fn test_iso_week_crosses_calendar_year() {
        // 2024-12-30 is a Monday in ISO week 2025-W01
        let week = IsoWeekKey::from_date(date(2025, 1, 2));
        assert_eq!(week.monday(), date(2024, 12, 30));
        assert_eq!(week.sunday(), date(2025, 1, 5));
        assert_eq!(week.to_string(), "2025-W01");
    }

    #[test]
    fn test_year_month_bounds() {
        let feb = YearMonth::from_date(date(2024, 2, 14));
        assert_eq!(feb.first_day(), date(2024, 2, 1));
        assert_eq!(feb.last_day(), date(2024, 2, 29));
        assert_eq!(feb.to_string(), "2024-02");
        assert_eq!(YearMonth::parse("2024-02"), Some(feb));
        assert_eq!(YearMonth::parse("nope"), None);
    }

    #[test]
    fn test_month_span_empty_when_inverted() {
        assert!(month_span_desc(date(2025, 12, 1), date(2025, 11, 1)).is_empty());
    }

    #[test]
    fn test_week_window_clipped_to_range() {
        let range = DateRange::new(date(2025, 11, 5), date(2025, 11, 7)).unwrap();
        let window = PeriodKey::Week(IsoWeekKey::from_date(date(2025, 11, 5))).window().clip(&range);
        assert_eq!(window.start, start_of_day(date(2025, 11, 5)));
        assert_eq!(window.end, end_of_day(date(2025, 11, 7)));
    }

    #[test]
    fn test_period_key_labels() {
        assert_eq!(PeriodKey::Day(date(2025, 11, 5)).to_string(), "2025-11-05");
        assert_eq!(PeriodKey::Month(YearMonth::from_date(date(2025, 11, 5))).field_name(), "month");
    }
}
