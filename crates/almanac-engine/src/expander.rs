//! Recurrence expansion: a pattern plus an anchor into ascending instants.
//!
//! A validated [`RecurrencePattern`] becomes an [`rrule::RRule`] that runs in
//! the anchor's wall-clock frame: wall times go through `rrule` as UTC values
//! and each result is placed in the real zone by a [`Resolver`]. The values
//! RFC 5545 takes from DTSTART (the anchor's day and time of day) are written
//! into the rule explicitly, so the rule's start can move forward by whole
//! interval steps without changing what it produces.
//!
//! Candidates are counted against `count` from the anchor, whatever the
//! window. Readings that a zone skips at a forward transition do not exist;
//! they are dropped and not counted. A window only hides candidates before its
//! start and ends the sequence at its end.
//!
//! [`Expansion`] is lazy and never caches: the same inputs always produce the
//! same sequence, and cloning it replays from the current position.

use chrono::{
    DateTime, Datelike, Duration, Month, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike,
    Utc,
};
use rrule::{NWeekday, RRule, RRuleError, RRuleSetIter, Tz, Unvalidated};
use tracing::trace;

use crate::error::{AlmanacError, Result};
use crate::instant::{Instant, UtcWindow};
use crate::recurrence::{Filters, Frequency, RecurrencePattern, WeekdayNum};
use crate::zone::{Resolver, ZoneContext};

/// Expansion gives up past this year.
pub(crate) const MAX_YEAR: i32 = 9999;

/// Expand `pattern` from `anchor`.
///
/// # Arguments
///
/// * `pattern` — the recurrence rule
/// * `anchor` — the component's start; its zone tag and date-only flag are
///   carried by every emitted instant
/// * `window` — when given, only instants in `[start, end)` are emitted
/// * `ctx` — zone context for the anchor and for an `until` in another zone
///
/// # Errors
///
/// Validation happens here, before any instant is produced:
/// [`AlmanacError::Configuration`] for an invalid pattern (see
/// [`RecurrencePattern::validate`]), a rule `rrule` rejects, or a time-of-day
/// pattern on a date-only anchor, and [`AlmanacError::ZoneResolution`] for an
/// unknown zone.
///
/// # Examples
///
/// ```
/// use almanac_engine::expander::expand;
/// use almanac_engine::recurrence::RecurrencePattern;
/// use almanac_engine::{Instant, ZoneContext};
/// use chrono::NaiveDate;
///
/// let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(9, 0, 0).unwrap();
/// let pattern = RecurrencePattern::daily().with_count(5);
/// let instants: Vec<_> =
///     expand(&pattern, &Instant::utc(start), None, &ZoneContext::utc_only()).unwrap().collect();
/// assert_eq!(instants.len(), 5);
/// assert_eq!(instants[4].to_string(), "2024-01-05T09:00:00Z");
/// ```
pub fn expand<'a>(
    pattern: &RecurrencePattern,
    anchor: &Instant,
    window: Option<UtcWindow>,
    ctx: &ZoneContext<'a>,
) -> Result<Expansion<'a>> {
    pattern.validate()?;
    let frame = ctx.resolver(&anchor.zone)?;
    let until_frame = match &pattern.until {
        Some(until) if until.zone != anchor.zone && !until.date_only => {
            Some(ctx.resolver(&until.zone)?)
        }
        _ => None,
    };
    Expansion::in_frame(pattern, anchor, frame, until_frame, window)
}

/// A lazy, ascending sequence of recurrence instants.
#[derive(Debug, Clone)]
pub struct Expansion<'a> {
    /// Wall-clock candidates; `None` once nothing more can be produced.
    dates: Option<RRuleSetIter>,
    anchor: NaiveDateTime,
    template: Instant,
    frame: Resolver<'a>,
    remaining: Option<u32>,
    window: Option<UtcWindow>,
}

impl<'a> Expansion<'a> {
    /// Build an expansion with already-resolved zones.
    ///
    /// `until_frame` converts an `until` written in another representation;
    /// without it `until` is read as a wall-clock time in the anchor's frame.
    pub(crate) fn in_frame(
        pattern: &RecurrencePattern,
        anchor: &Instant,
        frame: Resolver<'a>,
        until_frame: Option<Resolver<'a>>,
        window: Option<UtcWindow>,
    ) -> Result<Self> {
        pattern.validate()?;
        if anchor.date_only
            && (pattern.frequency.is_sub_daily() || pattern.has_time_of_day_parts())
        {
            return Err(AlmanacError::Configuration(format!(
                "{:?} recurrence with time-of-day parts cannot start on the date-only anchor {anchor}",
                pattern.frequency
            )));
        }

        let start = anchor.datetime.with_nanosecond(0).unwrap_or(anchor.datetime);
        let until = pattern
            .until
            .as_ref()
            .map(|until| until_in_frame(until, anchor, frame, until_frame));
        // The day of margin absorbs the zone offset.
        let window_end = window.and_then(|w| frame.from_utc(w.end).checked_add_signed(Duration::days(1)));
        let stop = until.into_iter().chain(window_end).min();

        // Without a count nothing before the window matters, so the rule may
        // start at the last whole step before it.
        let first = match (pattern.count, window) {
            (None, Some(w)) => frame
                .from_utc(w.start)
                .checked_sub_signed(Duration::days(1))
                .map_or(start, |target| {
                    fast_forward(pattern.frequency, pattern.interval, start, target)
                }),
            _ => start,
        };

        let dates = if stop.is_some_and(|stop| stop < first) {
            None
        } else {
            let set = to_rrule(pattern, start, stop)?
                .build(wall(first))
                .map_err(rejected)?
                .limit();
            Some(IntoIterator::into_iter(&set))
        };

        Ok(Self {
            dates,
            anchor: start,
            template: anchor.clone(),
            frame,
            remaining: pattern.count,
            window,
        })
    }

    /// The next instant together with its UTC normalization.
    pub(crate) fn next_candidate(&mut self) -> Option<(Instant, DateTime<Utc>)> {
        loop {
            if self.remaining == Some(0) {
                self.finish();
                return None;
            }
            let local = self.dates.as_mut()?.next()?.naive_utc();
            if local.year() > MAX_YEAR {
                self.finish();
                return None;
            }
            let utc = self.frame.to_utc(local);
            if local != self.anchor && self.frame.from_utc(utc) != local {
                trace!(%local, "skipping a wall-clock reading the zone does not show");
                continue;
            }
            if let Some(remaining) = self.remaining.as_mut() {
                *remaining -= 1;
            }
            if let Some(window) = &self.window {
                if utc >= window.end {
                    self.finish();
                    return None;
                }
                if utc < window.start {
                    continue;
                }
            }
            return Some((self.template.with_datetime(local), utc));
        }
    }

    fn finish(&mut self) {
        self.dates = None;
    }
}

impl Iterator for Expansion<'_> {
    type Item = Instant;

    fn next(&mut self) -> Option<Instant> {
        self.next_candidate().map(|(instant, _)| instant)
    }
}

// ── Rule construction ───────────────────────────────────────────────────────

/// The `rrule` form of `pattern`, with every default taken from `anchor`
/// spelled out. `count` stays with the [`Expansion`], which counts only
/// readings that exist.
fn to_rrule(
    pattern: &RecurrencePattern,
    anchor: NaiveDateTime,
    stop: Option<NaiveDateTime>,
) -> Result<RRule<Unvalidated>> {
    let interval = u16::try_from(pattern.interval).map_err(|_| {
        AlmanacError::Configuration(format!("interval {} is too large", pattern.interval))
    })?;
    let mut filters = pattern.filters();
    imply_from_anchor(&mut filters, pattern.frequency, anchor);

    let mut rule = RRule::new(rrule_frequency(pattern.frequency))
        .interval(interval)
        .week_start(pattern.week_start);
    if let Some(stop) = stop {
        rule = rule.until(wall(stop));
    }
    if let Some(months) = &filters.months {
        let months: Vec<Month> = months
            .iter()
            .filter_map(|m| u8::try_from(*m).ok())
            .filter_map(|m| Month::try_from(m).ok())
            .collect();
        rule = rule.by_month(&months);
    }
    if let Some(weekdays) = &filters.weekdays {
        rule = rule.by_weekday(weekdays.iter().map(nth_weekday).collect());
    }
    if let Some(days) = &filters.month_days {
        rule = rule.by_month_day(narrow(days));
    }
    if let Some(days) = &filters.year_days {
        rule = rule.by_year_day(narrow(days));
    }
    if let Some(weeks) = &filters.week_numbers {
        rule = rule.by_week_no(narrow(weeks));
    }
    if let Some(hours) = &filters.hours {
        rule = rule.by_hour(narrow(hours));
    }
    if let Some(minutes) = &filters.minutes {
        rule = rule.by_minute(narrow(minutes));
    }
    if let Some(seconds) = &filters.seconds {
        rule = rule.by_second(narrow(seconds));
    }
    if let Some(positions) = &filters.set_positions {
        rule = rule.by_set_pos(positions.clone());
    }
    Ok(rule)
}

fn rrule_frequency(frequency: Frequency) -> rrule::Frequency {
    match frequency {
        Frequency::Secondly => rrule::Frequency::Secondly,
        Frequency::Minutely => rrule::Frequency::Minutely,
        Frequency::Hourly => rrule::Frequency::Hourly,
        Frequency::Daily => rrule::Frequency::Daily,
        Frequency::Weekly => rrule::Frequency::Weekly,
        Frequency::Monthly => rrule::Frequency::Monthly,
        Frequency::Yearly => rrule::Frequency::Yearly,
    }
}

fn nth_weekday(day: &WeekdayNum) -> NWeekday {
    NWeekday::new(day.ordinal.and_then(|n| i16::try_from(n).ok()), day.weekday)
}

/// Validated by-part values in the integer width `rrule` stores them in.
fn narrow<T: Copy, U: TryFrom<T>>(values: &[T]) -> Vec<U> {
    values.iter().filter_map(|v| U::try_from(*v).ok()).collect()
}

/// A wall-clock reading in the frame `rrule` iterates in.
fn wall(local: NaiveDateTime) -> DateTime<Tz> {
    Tz::UTC.from_utc_datetime(&local)
}

fn rejected(err: RRuleError) -> AlmanacError {
    AlmanacError::Configuration(format!("recurrence rule rejected: {err}"))
}

/// RFC 5545 defaults: a rule without day parts repeats on the anchor's day,
/// and units finer than the frequency repeat the anchor's time of day.
fn imply_from_anchor(filters: &mut Filters, frequency: Frequency, anchor: NaiveDateTime) {
    let has_day_parts = filters.weekdays.is_some()
        || filters.month_days.is_some()
        || filters.year_days.is_some()
        || filters.week_numbers.is_some();
    match frequency {
        Frequency::Weekly if filters.weekdays.is_none() => {
            filters.weekdays = Some(vec![WeekdayNum::every(anchor.weekday())]);
        }
        Frequency::Monthly if !has_day_parts => {
            filters.month_days = Some(vec![anchor.day() as i32]);
        }
        Frequency::Yearly if !has_day_parts => {
            filters.months.get_or_insert_with(|| vec![anchor.month()]);
            filters.month_days = Some(vec![anchor.day() as i32]);
        }
        _ => {}
    }
    if frequency > Frequency::Hourly {
        filters.hours.get_or_insert_with(|| vec![anchor.hour()]);
    }
    if frequency > Frequency::Minutely {
        filters.minutes.get_or_insert_with(|| vec![anchor.minute()]);
    }
    if frequency > Frequency::Secondly {
        filters.seconds.get_or_insert_with(|| vec![anchor.second()]);
    }
}

/// `until` as a wall-clock time in the anchor's frame. A DATE `until`
/// includes its whole day.
fn until_in_frame(
    until: &Instant,
    anchor: &Instant,
    frame: Resolver<'_>,
    until_frame: Option<Resolver<'_>>,
) -> NaiveDateTime {
    if until.date_only {
        if anchor.date_only {
            return until.datetime;
        }
        let last_second = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
        return until.datetime.date().and_time(last_second);
    }
    match until_frame {
        Some(resolver) if until.zone != anchor.zone => frame.from_utc(resolver.to_utc(until.datetime)),
        _ => until.datetime,
    }
}

// ── Fast-forward ────────────────────────────────────────────────────────────

/// The latest rule start at or before `target` that is a whole number of
/// interval steps after `anchor`. Monthly and yearly starts snap to the first
/// day of their period so no candidate of that period is lost.
fn fast_forward(
    frequency: Frequency,
    interval: i32,
    anchor: NaiveDateTime,
    target: NaiveDateTime,
) -> NaiveDateTime {
    if target <= anchor || interval < 1 {
        return anchor;
    }
    let interval = i64::from(interval);
    let by_step = |unit: i64| {
        let step = unit * interval;
        let steps = (target - anchor).num_seconds() / step;
        anchor.checked_add_signed(Duration::seconds(steps * step))
    };
    let shifted = match frequency {
        Frequency::Secondly => by_step(1),
        Frequency::Minutely => by_step(60),
        Frequency::Hourly => by_step(3_600),
        Frequency::Daily => by_step(86_400),
        Frequency::Weekly => by_step(604_800),
        Frequency::Monthly => {
            let index = |at: NaiveDateTime| i64::from(at.year()) * 12 + i64::from(at.month0());
            let steps = (index(target) - index(anchor)) / interval;
            (steps > 0)
                .then(|| first_of_month(index(anchor) + steps * interval))
                .flatten()
        }
        Frequency::Yearly => {
            let steps = i64::from(target.year() - anchor.year()) / interval;
            let year = i64::from(anchor.year()) + steps * interval;
            (steps > 0).then(|| first_of_month(year * 12)).flatten()
        }
    };
    shifted.unwrap_or(anchor)
}

/// Midnight on the first of the month `index` months after January of year 0.
fn first_of_month(index: i64) -> Option<NaiveDateTime> {
    let year = i32::try_from(index.div_euclid(12)).ok()?;
    let month = u32::try_from(index.rem_euclid(12)).ok()? + 1;
    Some(NaiveDate::from_ymd_opt(year, month, 1)?.and_time(NaiveTime::MIN))
}
