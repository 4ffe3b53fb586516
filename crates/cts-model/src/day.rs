//! Day offsets relative to a patient's anchor date.
//!
//! Offsets are whole days, floored: an event 36 hours before the anchor lies
//! on day -2, an event later the same calendar day lies on day 0. Offsets are
//! integers internally and only become string labels at the output boundary.

use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

const SECONDS_PER_DAY: i64 = 86_400;

/// Prefix used by older per-patient matrix files (`day-5` is day 5).
pub const LEGACY_DAY_PREFIX: &str = "day-";

/// Signed number of whole days between an event and the anchor date.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct DayOffset(i64);

impl DayOffset {
    pub const fn new(days: i64) -> Self {
        Self(days)
    }

    pub const fn get(self) -> i64 {
        self.0
    }

    /// Offset of `event` from `anchor`, floored to whole days.
    pub fn between(event: NaiveDateTime, anchor: NaiveDateTime) -> Self {
        let seconds = (event - anchor).num_seconds();
        Self(seconds.div_euclid(SECONDS_PER_DAY))
    }

    /// Absolute distance in days.
    pub fn distance(self, other: Self) -> u64 {
        self.0.abs_diff(other.0)
    }

    /// Parses a day column label: `-5`, `12`, `3.0` or the legacy `day-12`.
    pub fn parse_label(label: &str) -> Option<Self> {
        let trimmed = label.trim();
        let digits = trimmed.strip_prefix(LEGACY_DAY_PREFIX).unwrap_or(trimmed);
        if let Ok(days) = digits.parse::<i64>() {
            return Some(Self(days));
        }
        let days = digits.parse::<f64>().ok()?;
        if days.is_finite() && days.fract() == 0.0 {
            #[allow(clippy::cast_possible_truncation)]
            return Some(Self(days as i64));
        }
        None
    }
}

impl fmt::Display for DayOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for DayOffset {
    fn from(days: i64) -> Self {
        Self(days)
    }
}

/// Inclusive day window `[init_day, end_day]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawWindow", into = "RawWindow")]
pub struct DayWindow {
    init_day: DayOffset,
    end_day: DayOffset,
}

#[derive(Serialize, Deserialize)]
struct RawWindow {
    init_day: i64,
    end_day: i64,
}

impl DayWindow {
    pub fn new(init_day: i64, end_day: i64) -> Result<Self, ModelError> {
        if init_day > end_day {
            return Err(ModelError::InvalidWindow { init_day, end_day });
        }
        Ok(Self {
            init_day: DayOffset(init_day),
            end_day: DayOffset(end_day),
        })
    }

    pub fn init_day(&self) -> DayOffset {
        self.init_day
    }

    pub fn end_day(&self) -> DayOffset {
        self.end_day
    }

    pub fn contains(&self, day: DayOffset) -> bool {
        self.init_day <= day && day <= self.end_day
    }

    /// Every day of the window in ascending order.
    pub fn days(&self) -> impl Iterator<Item = DayOffset> + use<> {
        (self.init_day.0..=self.end_day.0).map(DayOffset)
    }

    /// Number of days covered, both bounds included.
    pub fn span_days(&self) -> u64 {
        self.init_day.distance(self.end_day).saturating_add(1)
    }
}

impl Default for DayWindow {
    fn default() -> Self {
        Self {
            init_day: DayOffset(0),
            end_day: DayOffset(60),
        }
    }
}

impl fmt::Display for DayWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.init_day, self.end_day)
    }
}

impl TryFrom<RawWindow> for DayWindow {
    type Error = ModelError;

    fn try_from(raw: RawWindow) -> Result<Self, Self::Error> {
        Self::new(raw.init_day, raw.end_day)
    }
}

impl From<DayWindow> for RawWindow {
    fn from(window: DayWindow) -> Self {
        Self {
            init_day: window.init_day.0,
            end_day: window.end_day.0,
        }
    }
}

/// Column label of a matrix file. Numeric labels sort numerically and come
/// before any non-numeric label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DayLabel {
    Offset(DayOffset),
    Other(String),
}

impl DayLabel {
    pub fn parse(label: &str) -> Self {
        match DayOffset::parse_label(label) {
            Some(day) => Self::Offset(day),
            None => Self::Other(label.trim().to_string()),
        }
    }

    pub fn offset(&self) -> Option<DayOffset> {
        match self {
            Self::Offset(day) => Some(*day),
            Self::Other(_) => None,
        }
    }
}

impl Ord for DayLabel {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Offset(a), Self::Offset(b)) => a.cmp(b),
            (Self::Offset(_), Self::Other(_)) => Ordering::Less,
            (Self::Other(_), Self::Offset(_)) => Ordering::Greater,
            (Self::Other(a), Self::Other(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for DayLabel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for DayLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offset(day) => write!(f, "{day}"),
            Self::Other(label) => f.write_str(label),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_offset_before_anchor_is_negative() {
        let anchor = at(2021, 1, 10, 0);
        let event = at(2021, 1, 5, 0);
        assert_eq!(DayOffset::between(event, anchor), DayOffset::new(-5));
    }

    #[test]
    fn test_offset_floors_partial_days() {
        let anchor = at(2021, 1, 10, 12);
        assert_eq!(DayOffset::between(at(2021, 1, 10, 18), anchor).get(), 0);
        assert_eq!(DayOffset::between(at(2021, 1, 10, 6), anchor).get(), -1);
        assert_eq!(DayOffset::between(at(2021, 1, 11, 11), anchor).get(), 0);
    }

    #[test]
    fn test_parse_label_variants() {
        assert_eq!(DayOffset::parse_label("-5"), Some(DayOffset::new(-5)));
        assert_eq!(DayOffset::parse_label(" 12 "), Some(DayOffset::new(12)));
        assert_eq!(DayOffset::parse_label("3.0"), Some(DayOffset::new(3)));
        assert_eq!(DayOffset::parse_label("day-7"), Some(DayOffset::new(7)));
        assert_eq!(DayOffset::parse_label("day--2"), Some(DayOffset::new(-2)));
        assert_eq!(DayOffset::parse_label("3.5"), None);
        assert_eq!(DayOffset::parse_label("lab_name"), None);
        assert_eq!(DayOffset::parse_label("nan"), None);
    }

    #[test]
    fn test_labels_sort_numerically_then_other() {
        let mut labels: Vec<DayLabel> = ["2", "notes", "-5", "10", "day-1"]
            .into_iter()
            .map(DayLabel::parse)
            .collect();
        labels.sort();
        let rendered: Vec<String> = labels.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["-5", "1", "2", "10", "notes"]);
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let window = DayWindow::new(0, 60).unwrap();
        assert!(window.contains(DayOffset::new(0)));
        assert!(window.contains(DayOffset::new(60)));
        assert!(!window.contains(DayOffset::new(61)));
        assert!(!window.contains(DayOffset::new(-1)));
        assert_eq!(window.span_days(), 61);
        assert_eq!(window.days().count(), 61);
    }

    #[test]
    fn test_span_of_the_full_range_saturates() {
        let window = DayWindow::new(i64::MIN, i64::MAX).unwrap();
        assert_eq!(window.span_days(), u64::MAX);
        assert_eq!(DayWindow::new(-3, -3).unwrap().span_days(), 1);
    }

    #[test]
    fn test_window_rejects_inverted_bounds() {
        assert!(DayWindow::new(5, 4).is_err());
        let parsed: Result<DayWindow, _> =
            serde_json::from_str(r#"{"init_day": 9, "end_day": 1}"#);
        assert!(parsed.is_err());
    }

    proptest! {
        #[test]
        fn prop_offset_matches_calendar_days(
            anchor_days in -20_000i64..20_000,
            delta in -2_000i64..2_000,
            hour in 0u32..24,
        ) {
            let epoch = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
            let anchor = (epoch + chrono::Duration::days(anchor_days)).and_hms_opt(0, 0, 0).unwrap();
            let event = (anchor.date() + chrono::Duration::days(delta)).and_hms_opt(hour, 0, 0).unwrap();
            prop_assert_eq!(DayOffset::between(event, anchor).get(), delta);
        }
    }
}
