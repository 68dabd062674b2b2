//! Time values: tagged instants, periods and query windows.
//!
//! An [`Instant`] is a wall-clock reading plus a [`ZoneTag`] saying how to
//! read it. Nothing here converts between zones; that is the job of
//! [`ZoneContext`](crate::zone::ZoneContext), which every conversion takes
//! explicitly.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AlmanacError, Result};
use crate::zone::ZoneContext;

// ── ZoneTag ─────────────────────────────────────────────────────────────────

/// How the wall-clock reading of an [`Instant`] is anchored to absolute time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneTag {
    /// No zone: interpreted in the caller-supplied default zone.
    #[default]
    Floating,
    /// Coordinated Universal Time.
    Utc,
    /// Qualified by a zone identifier, resolved through the calendar's
    /// zone definitions.
    Zoned(String),
}

// ── Instant ─────────────────────────────────────────────────────────────────

/// A point in time as written in a calendar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instant {
    /// Wall-clock reading. Date-only instants carry midnight.
    pub datetime: NaiveDateTime,
    #[serde(default)]
    pub zone: ZoneTag,
    /// A DATE value (all-day), with no time-of-day component.
    #[serde(default, skip_serializing_if = "is_false")]
    pub date_only: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Instant {
    pub fn floating(datetime: NaiveDateTime) -> Self {
        Self {
            datetime,
            zone: ZoneTag::Floating,
            date_only: false,
        }
    }

    pub fn utc(datetime: NaiveDateTime) -> Self {
        Self {
            datetime,
            zone: ZoneTag::Utc,
            date_only: false,
        }
    }

    pub fn zoned(datetime: NaiveDateTime, zone_id: impl Into<String>) -> Self {
        Self {
            datetime,
            zone: ZoneTag::Zoned(zone_id.into()),
            date_only: false,
        }
    }

    /// A floating DATE value.
    pub fn date(date: NaiveDate) -> Self {
        Self {
            datetime: date.and_time(NaiveTime::MIN),
            zone: ZoneTag::Floating,
            date_only: true,
        }
    }

    pub fn from_utc(datetime: DateTime<Utc>) -> Self {
        Self::utc(datetime.naive_utc())
    }

    /// The calendar date of the wall-clock reading.
    pub fn date_naive(&self) -> NaiveDate {
        self.datetime.date()
    }

    pub fn is_floating(&self) -> bool {
        self.zone == ZoneTag::Floating
    }

    /// Same zone tag and date-only flag, different wall-clock reading.
    pub fn with_datetime(&self, datetime: NaiveDateTime) -> Self {
        Self {
            datetime,
            zone: self.zone.clone(),
            date_only: self.date_only,
        }
    }

    /// Shift the wall-clock reading, keeping the representation.
    pub fn shifted(&self, by: Duration) -> Option<Self> {
        self.datetime
            .checked_add_signed(by)
            .map(|datetime| self.with_datetime(datetime))
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.date_only {
            return write!(f, "{}", self.datetime.format("%Y-%m-%d"));
        }
        let stamp = self.datetime.format("%Y-%m-%dT%H:%M:%S");
        match &self.zone {
            ZoneTag::Floating => write!(f, "{stamp}"),
            ZoneTag::Utc => write!(f, "{stamp}Z"),
            ZoneTag::Zoned(id) => write!(f, "{stamp}[{id}]"),
        }
    }
}

// ── Period ──────────────────────────────────────────────────────────────────

/// How a [`Period`] ends: at an explicit instant, or after a duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodEnd {
    End(Instant),
    /// Nominal wall-clock duration, serialized in seconds.
    Duration(#[serde(with = "duration_seconds")] Duration),
}

/// A half-open interval `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: Instant,
    pub end: PeriodEnd,
}

impl Period {
    pub fn new(start: Instant, end: Instant) -> Self {
        Self {
            start,
            end: PeriodEnd::End(end),
        }
    }

    pub fn with_duration(start: Instant, duration: Duration) -> Self {
        Self {
            start,
            end: PeriodEnd::Duration(duration),
        }
    }

    /// A zero-length period.
    pub fn at(start: Instant) -> Self {
        Self::with_duration(start, Duration::zero())
    }

    /// A single all-day period on `date`.
    pub fn all_day(date: NaiveDate) -> Self {
        Self::with_duration(Instant::date(date), Duration::days(1))
    }

    pub fn is_all_day(&self) -> bool {
        self.start.date_only
    }

    /// The wall-clock length of the period, measured in the start's frame.
    ///
    /// An explicit end in the same representation as the start is subtracted
    /// directly; any other end is compared after normalizing both to UTC.
    ///
    /// # Errors
    ///
    /// Returns [`AlmanacError::Configuration`] if the period ends before it
    /// starts, or [`AlmanacError::ZoneResolution`] if either bound names an
    /// unknown zone.
    pub fn wall_duration(&self, ctx: &ZoneContext<'_>) -> Result<Duration> {
        let duration = match &self.end {
            PeriodEnd::Duration(d) => *d,
            PeriodEnd::End(end) if end.zone == self.start.zone => end.datetime - self.start.datetime,
            PeriodEnd::End(end) => ctx.to_utc(end)? - ctx.to_utc(&self.start)?,
        };
        if duration < Duration::zero() {
            return Err(AlmanacError::Configuration(format!(
                "period starting {} ends before it starts",
                self.start
            )));
        }
        Ok(duration)
    }

    /// The explicit end instant, if the period was written with one.
    pub fn end_instant(&self) -> Option<&Instant> {
        match &self.end {
            PeriodEnd::End(end) => Some(end),
            PeriodEnd::Duration(_) => None,
        }
    }
}

// ── Windows ─────────────────────────────────────────────────────────────────

/// A half-open query range `[start, end)` as the caller writes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: Instant,
    pub end: Instant,
}

impl Window {
    pub fn new(start: Instant, end: Instant) -> Self {
        Self { start, end }
    }

    /// `[date 00:00, date+1 00:00)` in floating time.
    ///
    /// # Errors
    ///
    /// Returns [`AlmanacError::Window`] for the last representable date.
    pub fn day(date: NaiveDate) -> Result<Self> {
        Self::days(date, 1)
    }

    /// `days` whole floating days starting at `from`.
    ///
    /// # Errors
    ///
    /// Returns [`AlmanacError::Window`] if the end falls outside the
    /// representable date range.
    pub fn days(from: NaiveDate, days: i64) -> Result<Self> {
        let start = from.and_time(NaiveTime::MIN);
        let end = Duration::try_days(days)
            .and_then(|span| start.checked_add_signed(span))
            .ok_or_else(|| {
                AlmanacError::Window(format!("{days} days from {from} is out of range"))
            })?;
        Ok(Self {
            start: Instant::floating(start),
            end: Instant::floating(end),
        })
    }

    /// Reject windows whose bounds share a representation and are out of order.
    ///
    /// Bounds in different representations are checked once resolved, by
    /// [`ZoneContext::resolve_window`](crate::zone::ZoneContext::resolve_window).
    ///
    /// # Errors
    ///
    /// Returns [`AlmanacError::Window`] if `end <= start`.
    pub fn validate(&self) -> Result<()> {
        if self.start.zone == self.end.zone && self.end.datetime <= self.start.datetime {
            return Err(AlmanacError::Window(format!(
                "end {} is not after start {}",
                self.end, self.start
            )));
        }
        Ok(())
    }
}

/// A window resolved to absolute time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UtcWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl UtcWindow {
    /// # Errors
    ///
    /// Returns [`AlmanacError::Window`] if `end <= start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end <= start {
            return Err(AlmanacError::Window(format!(
                "end {} is not after start {}",
                end.to_rfc3339(),
                start.to_rfc3339()
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Whether `[start, end)` overlaps the window. A zero-length interval
    /// counts when it sits inside the window.
    pub fn intersects(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start < self.end && (end > self.start || start >= self.start)
    }

    /// The window extended by `before` at the start and `after` at the end,
    /// clamped to the representable range.
    pub fn widened(&self, before: Duration, after: Duration) -> Self {
        Self {
            start: self.start.checked_sub_signed(before).unwrap_or(DateTime::<Utc>::MIN_UTC),
            end: self.end.checked_add_signed(after).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }
}

mod duration_seconds {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(d.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let seconds = i64::deserialize(d)?;
        Duration::try_seconds(seconds)
            .ok_or_else(|| serde::de::Error::custom(format!("duration out of range: {seconds}s")))
    }
}
