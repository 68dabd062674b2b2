//! Time zone normalization.
//!
//! Instants are resolved through a [`ZoneContext`]: the calendar's embedded
//! zone definitions, the caller's default zone for floating values, and
//! optionally the IANA database. The context is an explicit value threaded
//! into every conversion, so queries stay pure and can run on any thread.
//!
//! A [`ZoneDefinition`] is a list of standard/daylight [`Observance`]s. Each
//! observance has onset rules that are themselves small recurrence patterns;
//! finding the governing observance runs the expander over those rules.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{
    DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{AlmanacError, Result};
use crate::expander::Expansion;
use crate::instant::{Instant, UtcWindow, Window, ZoneTag};
use crate::recurrence::RecurrencePattern;

// ── Zone definitions ────────────────────────────────────────────────────────

/// Whether an observance is standard time or daylight saving time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservanceKind {
    Standard,
    Daylight,
}

/// One sub-period of a zone definition (a STANDARD or DAYLIGHT block).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observance {
    pub kind: ObservanceKind,
    #[serde(default)]
    pub name: Option<String>,
    /// First onset, as wall-clock time in the `offset_from` frame.
    pub onset: NaiveDateTime,
    /// Seconds east of UTC in effect before an onset.
    pub offset_from: i32,
    /// Seconds east of UTC in effect from an onset on.
    pub offset_to: i32,
    /// Later onsets, generated from `onset`.
    #[serde(default)]
    pub rule: Option<RecurrencePattern>,
    /// Additional explicit onsets, in the `offset_from` frame.
    #[serde(default)]
    pub onset_dates: Vec<NaiveDateTime>,
}

/// How far back a windowed onset search looks before scanning every onset.
const ONSET_LOOKBACK_DAYS: i64 = 400;

impl Observance {
    fn validate(&self, zone_id: &str) -> Result<()> {
        for offset in [self.offset_from, self.offset_to] {
            if FixedOffset::east_opt(offset).is_none() {
                return Err(AlmanacError::Configuration(format!(
                    "zone '{zone_id}' has an out-of-range offset of {offset}s"
                )));
            }
        }
        if let Some(rule) = &self.rule {
            rule.validate().map_err(|e| {
                AlmanacError::Configuration(format!("zone '{zone_id}' onset rule: {e}"))
            })?;
        }
        Ok(())
    }

    fn from_frame(&self) -> Resolver<'static> {
        FixedOffset::east_opt(self.offset_from)
            .map(Resolver::Fixed)
            .unwrap_or(Resolver::Utc)
    }

    /// The latest onset at or before `bound`, both in the `offset_from` frame.
    fn latest_onset(&self, bound: NaiveDateTime) -> Option<NaiveDateTime> {
        let explicit = std::iter::once(self.onset)
            .chain(self.onset_dates.iter().copied())
            .filter(|onset| *onset <= bound)
            .max();
        let ruled = self.rule.as_ref().and_then(|rule| self.latest_ruled_onset(rule, bound));
        explicit.max(ruled)
    }

    fn latest_ruled_onset(&self, rule: &RecurrencePattern, bound: NaiveDateTime) -> Option<NaiveDateTime> {
        if bound < self.onset {
            return None;
        }
        let frame = self.from_frame();
        let anchor = Instant::floating(self.onset);
        let until_frame = rule.until.as_ref().and_then(|until| onset_until_frame(&until.zone));
        // Onset rules were validated when the resolver was built.
        let build = |window: Option<UtcWindow>| {
            Expansion::in_frame(rule, &anchor, frame, until_frame, window).ok()
        };

        let bound_utc = frame.to_utc(bound);
        let recent = bound_utc
            .checked_sub_signed(Duration::days(ONSET_LOOKBACK_DAYS))
            .zip(bound_utc.checked_add_signed(Duration::seconds(1)))
            .and_then(|(start, end)| UtcWindow::new(start, end).ok())
            .and_then(|window| build(Some(window)))
        .and_then(|onsets| onsets.map(|i| i.datetime).last());
        if recent.is_some() {
            return recent;
        }
        build(None)?
            .map(|i| i.datetime)
            .take_while(|onset| *onset <= bound)
            .last()
    }
}

/// Zone frame for an onset rule's UNTIL: UTC values stay UTC, anything else
/// is read in the observance's own frame.
fn onset_until_frame(tag: &ZoneTag) -> Option<Resolver<'static>> {
    match tag {
        ZoneTag::Utc => Some(Resolver::Utc),
        ZoneTag::Floating | ZoneTag::Zoned(_) => None,
    }
}

/// A calendar-embedded time zone (VTIMEZONE).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneDefinition {
    pub id: String,
    pub observances: Vec<Observance>,
}

impl ZoneDefinition {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            observances: Vec::new(),
        }
    }

    pub fn with_observance(mut self, observance: Observance) -> Self {
        self.observances.push(observance);
        self
    }

    /// # Errors
    ///
    /// Returns [`AlmanacError::Configuration`] if an offset is out of range or
    /// an onset rule is invalid.
    pub fn validate(&self) -> Result<()> {
        self.observances.iter().try_for_each(|o| o.validate(&self.id))
    }

    /// UTC offset in seconds in effect at `utc`.
    pub fn offset_at_utc(&self, utc: DateTime<Utc>) -> i32 {
        let governing = self
            .observances
            .iter()
            .filter_map(|o| {
                let bound = saturating_shift(utc.naive_utc(), o.offset_from.into());
                let onset = o.latest_onset(bound)?;
                Some((saturating_shift(onset, -i64::from(o.offset_from)), o.offset_to))
            })
            .max_by_key(|(onset_utc, _)| *onset_utc);
        governing
            .map(|(_, offset)| offset)
            .unwrap_or_else(|| self.offset_before_first_onset())
    }

    /// UTC offset in seconds for a wall-clock reading in this zone.
    ///
    /// An observance governs from its onset's wall-clock time. Readings
    /// inside the gap a forward onset opens keep the offset before it.
    pub fn offset_for_local(&self, local: NaiveDateTime) -> i32 {
        let governing = self
            .observances
            .iter()
            .filter_map(|o| Some((o.latest_onset(local)?, o)))
            .max_by_key(|(onset, _)| *onset);
        match governing {
            Some((onset, o)) => {
                let gap = Duration::seconds(i64::from(o.offset_to) - i64::from(o.offset_from));
                if onset.checked_add_signed(gap).is_some_and(|end| local < end) {
                    o.offset_from
                } else {
                    o.offset_to
                }
            }
            None => self.offset_before_first_onset(),
        }
    }

    fn offset_before_first_onset(&self) -> i32 {
        self.observances
            .iter()
            .min_by_key(|o| o.onset)
            .map(|o| o.offset_from)
            .unwrap_or(0)
    }
}

// ── Default zone ────────────────────────────────────────────────────────────

/// The zone floating instants are read in. Caller configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultZone {
    #[default]
    Utc,
    /// Seconds east of UTC.
    Fixed(i32),
    /// A zone id, looked up in the calendar first and then the IANA database.
    Named(String),
}

impl FromStr for DefaultZone {
    type Err = AlmanacError;

    /// Accepts `UTC`/`Z`, `+HH:MM`/`-HH:MM`, or a zone name.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("utc") || s == "Z" {
            return Ok(Self::Utc);
        }
        let sign = match s.as_bytes().first() {
            Some(b'+') => 1,
            Some(b'-') => -1,
            _ if s.is_empty() => {
                return Err(AlmanacError::Configuration("empty zone".to_string()));
            }
            _ => return Ok(Self::Named(s.to_string())),
        };
        let parse = |part: Option<&str>| {
            part.filter(|p| (1..=2).contains(&p.len()) && p.bytes().all(|b| b.is_ascii_digit()))
                .and_then(|p| p.parse::<i32>().ok())
        };
        let mut parts = s[1..].splitn(2, ':');
        let (Some(hours), Some(minutes)) = (parse(parts.next()), parse(parts.next())) else {
            return Err(AlmanacError::Configuration(format!(
                "offset must look like +HH:MM, got '{s}'"
            )));
        };
        let seconds = sign * (hours * 3600 + minutes * 60);
        if FixedOffset::east_opt(seconds).is_none() || minutes >= 60 {
            return Err(AlmanacError::Configuration(format!("offset out of range: '{s}'")));
        }
        Ok(Self::Fixed(seconds))
    }
}

impl fmt::Display for DefaultZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Utc => f.write_str("UTC"),
            Self::Fixed(seconds) => f.write_str(&format_utc_offset(*seconds)),
            Self::Named(id) => f.write_str(id),
        }
    }
}

/// Format a UTC offset as a string (e.g., "-05:00", "+09:00").
pub fn format_utc_offset(offset_secs: i32) -> String {
    let sign = if offset_secs >= 0 { "+" } else { "-" };
    let abs_secs = offset_secs.unsigned_abs();
    let hours = abs_secs / 3600;
    let minutes = (abs_secs % 3600) / 60;
    format!("{sign}{hours:02}:{minutes:02}")
}

// ── Resolver ────────────────────────────────────────────────────────────────

/// A zone, looked up once, that converts wall-clock readings without failing.
#[derive(Debug, Clone, Copy)]
pub enum Resolver<'a> {
    Utc,
    Fixed(FixedOffset),
    Defined(&'a ZoneDefinition),
    System(Tz),
}

impl Resolver<'_> {
    /// The absolute instant of a wall-clock reading in this zone.
    ///
    /// IANA readings inside a DST gap shift forward one hour; ambiguous
    /// readings take the earlier instant.
    pub fn to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        match self {
            Self::Utc => Utc.from_utc_datetime(&local),
            Self::Fixed(offset) => {
                Utc.from_utc_datetime(&saturating_shift(local, -i64::from(offset.local_minus_utc())))
            }
            Self::Defined(zone) => {
                let offset = zone.offset_for_local(local);
                Utc.from_utc_datetime(&saturating_shift(local, -i64::from(offset)))
            }
            Self::System(tz) => tz
                .from_local_datetime(&local)
                .earliest()
                .or_else(|| {
                    let later = local.checked_add_signed(Duration::hours(1))?;
                    tz.from_local_datetime(&later).earliest()
                })
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|| Utc.from_utc_datetime(&local)),
        }
    }

    /// The wall-clock reading of `utc` in this zone.
    pub fn from_utc(&self, utc: DateTime<Utc>) -> NaiveDateTime {
        match self {
            Self::Utc => utc.naive_utc(),
            Self::Fixed(offset) => saturating_shift(utc.naive_utc(), offset.local_minus_utc().into()),
            Self::Defined(zone) => saturating_shift(utc.naive_utc(), zone.offset_at_utc(utc).into()),
            Self::System(tz) => {
                let offset = tz.offset_from_utc_datetime(&utc.naive_utc()).fix();
                saturating_shift(utc.naive_utc(), offset.local_minus_utc().into())
            }
        }
    }
}

/// `at` moved by `seconds`, saturating at the ends of the representable range.
fn saturating_shift(at: NaiveDateTime, seconds: i64) -> NaiveDateTime {
    at.checked_add_signed(Duration::seconds(seconds)).unwrap_or(if seconds < 0 {
        NaiveDateTime::MIN
    } else {
        NaiveDateTime::MAX
    })
}

// ── ZoneContext ─────────────────────────────────────────────────────────────

static UTC_DEFAULT: DefaultZone = DefaultZone::Utc;

/// Everything needed to normalize instants of one calendar.
#[derive(Debug, Clone, Copy)]
pub struct ZoneContext<'a> {
    zones: &'a [ZoneDefinition],
    default_zone: &'a DefaultZone,
    system_zones: bool,
}

impl<'a> ZoneContext<'a> {
    /// # Arguments
    ///
    /// * `zones` — the calendar's embedded zone definitions
    /// * `default_zone` — the zone floating instants are read in
    /// * `system_zones` — fall back to the IANA database for ids the calendar
    ///   does not define
    pub fn new(zones: &'a [ZoneDefinition], default_zone: &'a DefaultZone, system_zones: bool) -> Self {
        Self {
            zones,
            default_zone,
            system_zones,
        }
    }

    /// No zone definitions, floating read as UTC.
    pub fn utc_only() -> ZoneContext<'static> {
        ZoneContext::new(&[], &UTC_DEFAULT, false)
    }

    pub fn default_zone(&self) -> &DefaultZone {
        self.default_zone
    }

    /// Look up the zone behind a tag once, for repeated conversions.
    ///
    /// # Errors
    ///
    /// Returns [`AlmanacError::ZoneResolution`] for an id that is neither
    /// defined by the calendar nor (when enabled) an IANA name, and
    /// [`AlmanacError::Configuration`] for an invalid zone definition.
    pub fn resolver(&self, tag: &ZoneTag) -> Result<Resolver<'a>> {
        match tag {
            ZoneTag::Utc => Ok(Resolver::Utc),
            ZoneTag::Zoned(id) => self.named(id, self.system_zones),
            ZoneTag::Floating => match self.default_zone {
                DefaultZone::Utc => Ok(Resolver::Utc),
                DefaultZone::Fixed(seconds) => FixedOffset::east_opt(*seconds)
                    .map(Resolver::Fixed)
                    .ok_or_else(|| {
                        AlmanacError::Configuration(format!("default offset out of range: {seconds}s"))
                    }),
                DefaultZone::Named(id) => self.named(id, true),
            },
        }
    }

    fn named(&self, id: &str, allow_system: bool) -> Result<Resolver<'a>> {
        if let Some(zone) = self.zones.iter().find(|z| z.id == id) {
            zone.validate()?;
            return Ok(Resolver::Defined(zone));
        }
        if allow_system {
            if let Ok(tz) = id.parse::<Tz>() {
                return Ok(Resolver::System(tz));
            }
        }
        Err(AlmanacError::ZoneResolution(format!("'{id}'")))
    }

    /// Normalize an instant to UTC.
    ///
    /// # Errors
    ///
    /// See [`Self::resolver`].
    pub fn to_utc(&self, instant: &Instant) -> Result<DateTime<Utc>> {
        Ok(self.resolver(&instant.zone)?.to_utc(instant.datetime))
    }

    /// The instant as a floating wall-clock reading in the default zone.
    /// Date-only values pass through unchanged.
    ///
    /// # Errors
    ///
    /// See [`Self::resolver`].
    pub fn to_local(&self, instant: &Instant) -> Result<Instant> {
        if instant.date_only {
            return Ok(instant.clone());
        }
        let utc = self.to_utc(instant)?;
        let local = self.resolver(&ZoneTag::Floating)?.from_utc(utc);
        Ok(Instant::floating(local))
    }

    /// Re-express an instant in another representation.
    ///
    /// # Errors
    ///
    /// See [`Self::resolver`].
    pub fn to_zone(&self, instant: &Instant, target: &ZoneTag) -> Result<Instant> {
        if &instant.zone == target {
            return Ok(instant.clone());
        }
        let utc = self.to_utc(instant)?;
        let datetime = self.resolver(target)?.from_utc(utc);
        Ok(Instant {
            datetime,
            zone: target.clone(),
            date_only: false,
        })
    }

    /// Order two instants. Differently represented instants are compared in UTC.
    ///
    /// # Errors
    ///
    /// See [`Self::resolver`].
    pub fn compare(&self, a: &Instant, b: &Instant) -> Result<Ordering> {
        if a.zone == b.zone {
            return Ok(a.datetime.cmp(&b.datetime));
        }
        Ok(self.to_utc(a)?.cmp(&self.to_utc(b)?))
    }

    /// Resolve a query window to absolute time.
    ///
    /// # Errors
    ///
    /// Returns [`AlmanacError::Window`] if the resolved end is not after the
    /// start, or a zone lookup error for either bound.
    pub fn resolve_window(&self, window: &Window) -> Result<UtcWindow> {
        UtcWindow::new(self.to_utc(&window.start)?, self.to_utc(&window.end)?)
    }

    /// The dates a window covers in the default zone, as `[first, end)`.
    /// A window ending after midnight covers its last date.
    ///
    /// # Errors
    ///
    /// See [`Self::resolver`].
    pub fn local_dates(&self, window: &UtcWindow) -> Result<(NaiveDate, NaiveDate)> {
        let floating = self.resolver(&ZoneTag::Floating)?;
        let first = floating.from_utc(window.start).date();
        let end = floating.from_utc(window.end);
        let end_date = if end.time() == NaiveTime::MIN {
            end.date()
        } else {
            end.date().succ_opt().unwrap_or(end.date())
        };
        Ok((first, end_date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recurrence::{ByPart, WeekdayNum};
    use chrono::Weekday;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    /// US Eastern since 2007: DST from the second Sunday of March to the
    /// first Sunday of November.
    fn us_eastern() -> ZoneDefinition {
        ZoneDefinition::new("US-Eastern")
            .with_observance(Observance {
                kind: ObservanceKind::Daylight,
                name: Some("EDT".to_string()),
                onset: dt(2007, 3, 11, 2, 0),
                offset_from: -5 * 3600,
                offset_to: -4 * 3600,
                rule: Some(
                    RecurrencePattern::yearly()
                        .with(ByPart::Month(vec![3]))
                        .with(ByPart::Day(vec![WeekdayNum::nth(2, Weekday::Sun)])),
                ),
                onset_dates: Vec::new(),
            })
            .with_observance(Observance {
                kind: ObservanceKind::Standard,
                name: Some("EST".to_string()),
                onset: dt(2007, 11, 4, 2, 0),
                offset_from: -4 * 3600,
                offset_to: -5 * 3600,
                rule: Some(
                    RecurrencePattern::yearly()
                        .with(ByPart::Month(vec![11]))
                        .with(ByPart::Day(vec![WeekdayNum::nth(1, Weekday::Sun)])),
                ),
                onset_dates: Vec::new(),
            })
    }

    #[test]
    fn test_defined_zone_summer_and_winter_offsets() {
        let zones = [us_eastern()];
        let ctx = ZoneContext::new(&zones, &UTC_DEFAULT, false);

        let summer = Instant::zoned(dt(2024, 7, 15, 9, 0), "US-Eastern");
        assert_eq!(ctx.to_utc(&summer).unwrap().naive_utc(), dt(2024, 7, 15, 13, 0));

        let winter = Instant::zoned(dt(2024, 1, 15, 9, 0), "US-Eastern");
        assert_eq!(ctx.to_utc(&winter).unwrap().naive_utc(), dt(2024, 1, 15, 14, 0));
    }

    #[test]
    fn test_defined_zone_transition_days() {
        let zone = us_eastern();
        // 2024-03-10 is the second Sunday of March.
        assert_eq!(zone.offset_for_local(dt(2024, 3, 10, 1, 59)), -5 * 3600);
        assert_eq!(zone.offset_for_local(dt(2024, 3, 10, 3, 0)), -4 * 3600);
        // 2024-11-03 06:00Z is 02:00 EDT, the fall-back onset.
        let before = Utc.from_utc_datetime(&dt(2024, 11, 3, 5, 59));
        let after = Utc.from_utc_datetime(&dt(2024, 11, 3, 6, 0));
        assert_eq!(zone.offset_at_utc(before), -4 * 3600);
        assert_eq!(zone.offset_at_utc(after), -5 * 3600);
    }

    #[test]
    fn test_defined_zone_gap_reading_keeps_earlier_offset() {
        let zones = [us_eastern()];
        let ctx = ZoneContext::new(&zones, &UTC_DEFAULT, false);
        let resolver = ctx.resolver(&ZoneTag::Zoned("US-Eastern".to_string())).unwrap();
        assert_eq!(resolver.to_utc(dt(2024, 3, 10, 2, 30)).naive_utc(), dt(2024, 3, 10, 7, 30));
        assert_eq!(resolver.to_utc(dt(2024, 3, 10, 3, 0)).naive_utc(), dt(2024, 3, 10, 7, 0));

        let default = DefaultZone::Utc;
        let iana = ZoneContext::new(&[], &default, true)
            .resolver(&ZoneTag::Zoned("America/New_York".to_string()))
            .unwrap();
        assert_eq!(
            resolver.to_utc(dt(2024, 3, 10, 2, 30)),
            iana.to_utc(dt(2024, 3, 10, 2, 30))
        );
    }

    #[test]
    fn test_defined_zone_before_first_onset_uses_offset_from() {
        let zone = us_eastern();
        // The earliest onset is the 2007 switch to daylight time, from -05:00.
        assert_eq!(zone.offset_for_local(dt(1990, 7, 1, 12, 0)), -5 * 3600);
    }

    #[test]
    fn test_round_trip_through_defined_zone() {
        let zones = [us_eastern()];
        let ctx = ZoneContext::new(&zones, &UTC_DEFAULT, false);
        let resolver = ctx.resolver(&ZoneTag::Zoned("US-Eastern".to_string())).unwrap();
        let local = dt(2025, 8, 1, 18, 30);
        assert_eq!(resolver.from_utc(resolver.to_utc(local)), local);
    }

    #[test]
    fn test_unknown_zone_is_resolution_error() {
        let ctx = ZoneContext::utc_only();
        let instant = Instant::zoned(dt(2024, 1, 1, 9, 0), "Mars/Olympus");
        let err = ctx.to_utc(&instant).unwrap_err();
        assert!(matches!(err, AlmanacError::ZoneResolution(_)), "got: {err}");
    }

    #[test]
    fn test_iana_id_requires_system_zones() {
        let instant = Instant::zoned(dt(2024, 7, 1, 9, 0), "America/New_York");
        assert!(ZoneContext::utc_only().to_utc(&instant).is_err());

        let ctx = ZoneContext::new(&[], &UTC_DEFAULT, true);
        assert_eq!(ctx.to_utc(&instant).unwrap().naive_utc(), dt(2024, 7, 1, 13, 0));
    }

    #[test]
    fn test_floating_uses_default_zone() {
        let default = DefaultZone::Fixed(2 * 3600);
        let ctx = ZoneContext::new(&[], &default, false);
        let floating = Instant::floating(dt(2024, 1, 1, 9, 0));
        assert_eq!(ctx.to_utc(&floating).unwrap().naive_utc(), dt(2024, 1, 1, 7, 0));
    }

    #[test]
    fn test_named_default_zone_uses_iana() {
        let default = DefaultZone::Named("Asia/Tokyo".to_string());
        let ctx = ZoneContext::new(&[], &default, false);
        let local = ctx.to_local(&Instant::utc(dt(2024, 1, 1, 0, 0))).unwrap();
        assert_eq!(local, Instant::floating(dt(2024, 1, 1, 9, 0)));
    }

    #[test]
    fn test_compare_normalizes_to_utc() {
        let default = DefaultZone::Fixed(-3600);
        let ctx = ZoneContext::new(&[], &default, false);
        let utc = Instant::utc(dt(2024, 1, 1, 10, 0));
        let floating = Instant::floating(dt(2024, 1, 1, 9, 30));
        // 09:30 at -01:00 is 10:30 UTC.
        assert_eq!(ctx.compare(&utc, &floating).unwrap(), Ordering::Less);
        assert_eq!(ctx.compare(&utc, &utc.clone()).unwrap(), Ordering::Equal);
    }

    #[test]
    fn test_to_zone_into_defined_zone() {
        let zones = [us_eastern()];
        let ctx = ZoneContext::new(&zones, &UTC_DEFAULT, false);
        let target = ZoneTag::Zoned("US-Eastern".to_string());
        let moved = ctx.to_zone(&Instant::utc(dt(2024, 7, 1, 16, 0)), &target).unwrap();
        assert_eq!(moved, Instant::zoned(dt(2024, 7, 1, 12, 0), "US-Eastern"));
    }

    #[test]
    fn test_invalid_observance_offset_is_configuration_error() {
        let mut zone = us_eastern();
        zone.observances[0].offset_to = 90_000;
        let zones = [zone];
        let ctx = ZoneContext::new(&zones, &UTC_DEFAULT, false);
        let err = ctx
            .to_utc(&Instant::zoned(dt(2024, 1, 1, 0, 0), "US-Eastern"))
            .unwrap_err();
        assert!(matches!(err, AlmanacError::Configuration(_)), "got: {err}");
    }

    #[test]
    fn test_system_zone_gap_shifts_forward() {
        let ctx = ZoneContext::new(&[], &UTC_DEFAULT, true);
        // 02:30 on 2024-03-10 does not exist in New York.
        let gap = Instant::zoned(dt(2024, 3, 10, 2, 30), "America/New_York");
        assert_eq!(ctx.to_utc(&gap).unwrap().naive_utc(), dt(2024, 3, 10, 7, 30));
    }

    #[test]
    fn test_default_zone_from_str() {
        assert_eq!("UTC".parse::<DefaultZone>().unwrap(), DefaultZone::Utc);
        assert_eq!("+02:00".parse::<DefaultZone>().unwrap(), DefaultZone::Fixed(7200));
        assert_eq!("-05:30".parse::<DefaultZone>().unwrap(), DefaultZone::Fixed(-19800));
        assert_eq!(
            "Europe/Warsaw".parse::<DefaultZone>().unwrap(),
            DefaultZone::Named("Europe/Warsaw".to_string())
        );
        assert!("+2".parse::<DefaultZone>().is_err());
        assert!("+25:00".parse::<DefaultZone>().is_err());
        assert!("+05:-30".parse::<DefaultZone>().is_err());
        assert!("+-5:00".parse::<DefaultZone>().is_err());
        assert!("-05:+30".parse::<DefaultZone>().is_err());
        assert!("+999999999:00".parse::<DefaultZone>().is_err());
    }

    #[test]
    fn test_default_zone_display_round_trips() {
        assert_eq!(DefaultZone::Fixed(-5 * 3600).to_string(), "-05:00");
        assert_eq!(DefaultZone::Fixed(9 * 3600).to_string(), "+09:00");
    }

    #[test]
    fn test_local_dates_of_window() {
        let ctx = ZoneContext::utc_only();
        let window = UtcWindow::new(
            Utc.from_utc_datetime(&dt(2024, 1, 1, 0, 0)),
            Utc.from_utc_datetime(&dt(2024, 1, 2, 0, 0)),
        )
        .unwrap();
        let (first, end) = ctx.local_dates(&window).unwrap();
        assert_eq!(first, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());

        let partial = UtcWindow::new(
            Utc.from_utc_datetime(&dt(2024, 1, 1, 10, 0)),
            Utc.from_utc_datetime(&dt(2024, 1, 1, 11, 0)),
        )
        .unwrap();
        let (first, end) = ctx.local_dates(&partial).unwrap();
        assert_eq!(first, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    }
}
