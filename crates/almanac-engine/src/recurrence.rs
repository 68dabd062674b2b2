//! Recurrence patterns (RRULE / EXRULE values).
//!
//! A [`RecurrencePattern`] is the structured form of an RFC 5545 recurrence
//! rule. By-parts form a closed set ([`ByPart`]); every legality check lives
//! in [`RecurrencePattern::validate`], which the expander runs before it
//! yields anything.

use std::collections::HashSet;
use std::mem::discriminant;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::error::{AlmanacError, Result};
use crate::instant::Instant;

/// How far apart the base steps of a pattern are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Secondly,
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    /// Frequencies whose step is shorter than a day.
    pub fn is_sub_daily(self) -> bool {
        matches!(self, Self::Secondly | Self::Minutely | Self::Hourly)
    }
}

/// A weekday, optionally with an ordinal: `MO`, `2TU`, `-1FR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeekdayNum {
    #[serde(default)]
    pub ordinal: Option<i32>,
    pub weekday: Weekday,
}

impl WeekdayNum {
    /// Every `weekday` in the period.
    pub fn every(weekday: Weekday) -> Self {
        Self {
            ordinal: None,
            weekday,
        }
    }

    /// The `ordinal`-th `weekday` of the month or year; negative counts from the end.
    pub fn nth(ordinal: i32, weekday: Weekday) -> Self {
        Self {
            ordinal: Some(ordinal),
            weekday,
        }
    }
}

/// One by-part filter of a recurrence pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByPart {
    Second(Vec<u32>),
    Minute(Vec<u32>),
    Hour(Vec<u32>),
    Day(Vec<WeekdayNum>),
    MonthDay(Vec<i32>),
    YearDay(Vec<i32>),
    WeekNo(Vec<i32>),
    Month(Vec<u32>),
    SetPos(Vec<i32>),
}

impl ByPart {
    /// The RFC 5545 rule-part name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Second(_) => "BYSECOND",
            Self::Minute(_) => "BYMINUTE",
            Self::Hour(_) => "BYHOUR",
            Self::Day(_) => "BYDAY",
            Self::MonthDay(_) => "BYMONTHDAY",
            Self::YearDay(_) => "BYYEARDAY",
            Self::WeekNo(_) => "BYWEEKNO",
            Self::Month(_) => "BYMONTH",
            Self::SetPos(_) => "BYSETPOS",
        }
    }

    /// Whether this part fixes a time of day.
    pub fn is_time_of_day(&self) -> bool {
        matches!(self, Self::Second(_) | Self::Minute(_) | Self::Hour(_))
    }

    fn validate(&self, frequency: Frequency) -> Result<()> {
        let name = self.name();
        match self {
            Self::Second(values) => check_unsigned(name, values, 0, 60),
            Self::Minute(values) => check_unsigned(name, values, 0, 59),
            Self::Hour(values) => check_unsigned(name, values, 0, 23),
            Self::Month(values) => check_unsigned(name, values, 1, 12),
            Self::MonthDay(values) => {
                if frequency == Frequency::Weekly {
                    return Err(not_applicable(name, frequency));
                }
                check_signed(name, values, 31)
            }
            Self::YearDay(values) => {
                if matches!(
                    frequency,
                    Frequency::Daily | Frequency::Weekly | Frequency::Monthly
                ) {
                    return Err(not_applicable(name, frequency));
                }
                check_signed(name, values, 366)
            }
            Self::WeekNo(values) => {
                if frequency != Frequency::Yearly {
                    return Err(not_applicable(name, frequency));
                }
                check_signed(name, values, 53)
            }
            Self::SetPos(values) => check_signed(name, values, 366),
            Self::Day(values) => {
                if values.is_empty() {
                    return Err(empty_part(name));
                }
                for day in values {
                    let Some(ordinal) = day.ordinal else {
                        continue;
                    };
                    if !matches!(frequency, Frequency::Monthly | Frequency::Yearly) {
                        return Err(AlmanacError::Configuration(format!(
                            "{name} ordinal {ordinal}{:?} requires a monthly or yearly frequency, got {frequency:?}",
                            day.weekday
                        )));
                    }
                    if ordinal == 0 || !(-53..=53).contains(&ordinal) {
                        return Err(out_of_range(name, ordinal as i64));
                    }
                }
                Ok(())
            }
        }
    }
}

fn check_unsigned(name: &str, values: &[u32], min: u32, max: u32) -> Result<()> {
    if values.is_empty() {
        return Err(empty_part(name));
    }
    match values.iter().find(|v| !(min..=max).contains(*v)) {
        Some(v) => Err(out_of_range(name, *v as i64)),
        None => Ok(()),
    }
}

fn check_signed(name: &str, values: &[i32], max_abs: i32) -> Result<()> {
    if values.is_empty() {
        return Err(empty_part(name));
    }
    match values.iter().find(|v| **v == 0 || v.abs() > max_abs) {
        Some(v) => Err(out_of_range(name, *v as i64)),
        None => Ok(()),
    }
}

fn empty_part(name: &str) -> AlmanacError {
    AlmanacError::Configuration(format!("{name} has no values"))
}

fn out_of_range(name: &str, value: i64) -> AlmanacError {
    AlmanacError::Configuration(format!("{name} value {value} is out of range"))
}

fn not_applicable(name: &str, frequency: Frequency) -> AlmanacError {
    AlmanacError::Configuration(format!(
        "{name} is not allowed with a {frequency:?} frequency"
    ))
}

fn default_interval() -> i32 {
    1
}

fn default_week_start() -> Weekday {
    Weekday::Mon
}

// ── RecurrencePattern ───────────────────────────────────────────────────────

/// A recurrence rule: frequency, interval, termination and by-part filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrencePattern {
    pub frequency: Frequency,
    /// Steps of `frequency` between base periods. Must be at least 1.
    #[serde(default = "default_interval")]
    pub interval: i32,
    /// Stop after this many accepted instances. Exclusive with `until`.
    #[serde(default)]
    pub count: Option<u32>,
    /// Stop at the first instance after this instant. Exclusive with `count`.
    #[serde(default)]
    pub until: Option<Instant>,
    #[serde(default)]
    pub by_parts: Vec<ByPart>,
    /// First day of the week, for weekly steps and week numbers.
    #[serde(default = "default_week_start")]
    pub week_start: Weekday,
}

impl RecurrencePattern {
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: 1,
            count: None,
            until: None,
            by_parts: Vec::new(),
            week_start: Weekday::Mon,
        }
    }

    pub fn daily() -> Self {
        Self::new(Frequency::Daily)
    }

    pub fn weekly() -> Self {
        Self::new(Frequency::Weekly)
    }

    pub fn monthly() -> Self {
        Self::new(Frequency::Monthly)
    }

    pub fn yearly() -> Self {
        Self::new(Frequency::Yearly)
    }

    pub fn with_interval(mut self, interval: i32) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_until(mut self, until: Instant) -> Self {
        self.until = Some(until);
        self
    }

    pub fn with(mut self, part: ByPart) -> Self {
        self.by_parts.push(part);
        self
    }

    pub fn with_week_start(mut self, week_start: Weekday) -> Self {
        self.week_start = week_start;
        self
    }

    /// Check the pattern for inconsistent or out-of-range values.
    ///
    /// # Errors
    ///
    /// Returns [`AlmanacError::Configuration`] when the interval is not
    /// positive, both `count` and `until` are set, a by-part is repeated,
    /// empty, out of its legal range, or not applicable to the frequency.
    pub fn validate(&self) -> Result<()> {
        if self.interval < 1 {
            return Err(AlmanacError::Configuration(format!(
                "interval must be positive, got {}",
                self.interval
            )));
        }
        if self.count.is_some() && self.until.is_some() {
            return Err(AlmanacError::Configuration(
                "COUNT and UNTIL are mutually exclusive".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for part in &self.by_parts {
            if !seen.insert(discriminant(part)) {
                return Err(AlmanacError::Configuration(format!(
                    "{} is given more than once",
                    part.name()
                )));
            }
            part.validate(self.frequency)?;
        }
        Ok(())
    }

    /// Whether any by-part fixes a time of day.
    pub fn has_time_of_day_parts(&self) -> bool {
        self.by_parts.iter().any(ByPart::is_time_of_day)
    }

    /// Flatten the by-parts into per-kind filters. Call after [`Self::validate`].
    pub(crate) fn filters(&self) -> Filters {
        let mut filters = Filters::default();
        for part in &self.by_parts {
            match part {
                ByPart::Second(v) => filters.seconds = Some(sorted(v)),
                ByPart::Minute(v) => filters.minutes = Some(sorted(v)),
                ByPart::Hour(v) => filters.hours = Some(sorted(v)),
                ByPart::Day(v) => filters.weekdays = Some(v.clone()),
                ByPart::MonthDay(v) => filters.month_days = Some(v.clone()),
                ByPart::YearDay(v) => filters.year_days = Some(v.clone()),
                ByPart::WeekNo(v) => filters.week_numbers = Some(v.clone()),
                ByPart::Month(v) => filters.months = Some(sorted(v)),
                ByPart::SetPos(v) => filters.set_positions = Some(v.clone()),
            }
        }
        filters
    }
}

fn sorted(values: &[u32]) -> Vec<u32> {
    let mut values = values.to_vec();
    values.sort_unstable();
    values.dedup();
    values
}

/// By-parts of a validated pattern, one slot per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Filters {
    pub seconds: Option<Vec<u32>>,
    pub minutes: Option<Vec<u32>>,
    pub hours: Option<Vec<u32>>,
    pub weekdays: Option<Vec<WeekdayNum>>,
    pub month_days: Option<Vec<i32>>,
    pub year_days: Option<Vec<i32>>,
    pub week_numbers: Option<Vec<i32>>,
    pub months: Option<Vec<u32>>,
    pub set_positions: Option<Vec<i32>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn config_error(pattern: RecurrencePattern) -> String {
        match pattern.validate() {
            Err(AlmanacError::Configuration(msg)) => msg,
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_weekly_pattern() {
        let pattern = RecurrencePattern::weekly()
            .with_count(10)
            .with(ByPart::Day(vec![
                WeekdayNum::every(Weekday::Mon),
                WeekdayNum::every(Weekday::Wed),
            ]));
        assert!(pattern.validate().is_ok());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let msg = config_error(RecurrencePattern::daily().with_interval(0));
        assert!(msg.contains("interval"), "got: {msg}");
    }

    #[test]
    fn test_negative_interval_rejected() {
        config_error(RecurrencePattern::daily().with_interval(-2));
    }

    #[test]
    fn test_count_and_until_rejected() {
        let until = Instant::date(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        let msg = config_error(RecurrencePattern::daily().with_count(3).with_until(until));
        assert!(msg.contains("mutually exclusive"), "got: {msg}");
    }

    #[test]
    fn test_month_thirteen_rejected() {
        let msg = config_error(RecurrencePattern::yearly().with(ByPart::Month(vec![13])));
        assert!(msg.contains("BYMONTH value 13"), "got: {msg}");
    }

    #[test]
    fn test_zero_month_day_rejected() {
        config_error(RecurrencePattern::monthly().with(ByPart::MonthDay(vec![0])));
    }

    #[test]
    fn test_negative_month_day_accepted() {
        let pattern = RecurrencePattern::monthly().with(ByPart::MonthDay(vec![-1]));
        assert!(pattern.validate().is_ok());
    }

    #[test]
    fn test_week_number_requires_yearly() {
        let msg = config_error(RecurrencePattern::monthly().with(ByPart::WeekNo(vec![20])));
        assert!(msg.contains("BYWEEKNO"), "got: {msg}");
    }

    #[test]
    fn test_month_day_not_allowed_weekly() {
        config_error(RecurrencePattern::weekly().with(ByPart::MonthDay(vec![1])));
    }

    #[test]
    fn test_weekday_ordinal_requires_monthly_or_yearly() {
        let msg = config_error(
            RecurrencePattern::weekly().with(ByPart::Day(vec![WeekdayNum::nth(2, Weekday::Mon)])),
        );
        assert!(msg.contains("ordinal"), "got: {msg}");
    }

    #[test]
    fn test_duplicate_part_rejected() {
        let msg = config_error(
            RecurrencePattern::yearly()
                .with(ByPart::Month(vec![1]))
                .with(ByPart::Month(vec![2])),
        );
        assert!(msg.contains("more than once"), "got: {msg}");
    }

    #[test]
    fn test_empty_part_rejected() {
        config_error(RecurrencePattern::daily().with(ByPart::Hour(vec![])));
    }

    #[test]
    fn test_filters_sort_and_dedup_time_parts() {
        let pattern = RecurrencePattern::daily().with(ByPart::Hour(vec![17, 9, 9]));
        let filters = pattern.filters();
        assert_eq!(filters.hours, Some(vec![9, 17]));
        assert!(filters.minutes.is_none());
    }

    #[test]
    fn test_pattern_deserializes_with_defaults() {
        let json = r#"{"frequency":"weekly","by_parts":[{"day":[{"weekday":"Mon"},{"ordinal":null,"weekday":"Fri"}]}]}"#;
        let pattern: RecurrencePattern = serde_json::from_str(json).unwrap();
        assert_eq!(pattern.interval, 1);
        assert_eq!(pattern.week_start, Weekday::Mon);
        assert!(pattern.validate().is_ok());
    }
}
