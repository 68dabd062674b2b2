//! Occurrence materialization: recurrence instants into concrete periods.
//!
//! Every member of a component's recurrence set becomes a [`Period`]:
//!
//! - a plain instance is the anchor period moved to the instance's start,
//!   keeping the anchor's wall-clock duration;
//! - a period-valued added date is its own period;
//! - an override replaces the start and/or end of the instance it targets.
//!
//! Only periods intersecting the query window are produced. Timed periods
//! are tested in UTC against `[start, end)`; all-day periods are tested by
//! date against the window's dates in the default zone.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use tracing::trace;

use crate::component::{Override, RecurringComponent};
use crate::error::{AlmanacError, Result};
use crate::exceptions::{resolve, ExceptionSet, Resolution, ResolvedInstant};
use crate::expander::{expand, MAX_YEAR};
use crate::instant::{Instant, Period, PeriodEnd, UtcWindow, ZoneTag};
use crate::zone::{Resolver, ZoneContext};

/// One concrete occurrence of a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Materialized<'a> {
    /// Always in the explicit-end form.
    pub period: Period,
    /// The recurrence instant this occurrence realizes, for recurring components.
    pub recurrence_id: Option<Instant>,
    pub overridden_by: Option<&'a Override>,
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
}

/// Materialize the occurrences of `component` intersecting `window`.
///
/// The base expansion runs over the window widened backwards by the longest
/// instance duration, so instances starting before the window but still
/// running inside it are found. Overrides that move an instance from outside
/// that range into the window are checked for membership and included.
///
/// # Errors
///
/// All errors are raised here, before any occurrence is produced:
///
/// - [`AlmanacError::Configuration`](crate::AlmanacError::Configuration) for
///   an invalid rule, an anchor, added period or override ending before it
///   starts, or an instance whose end falls outside the representable range
/// - [`AlmanacError::ZoneResolution`](crate::AlmanacError::ZoneResolution)
///   for an unknown zone anywhere in the component
pub fn materialize<'a>(
    component: &'a RecurringComponent,
    window: &UtcWindow,
    ctx: &ZoneContext<'a>,
) -> Result<Occurrences<'a>> {
    let frames = Frames::collect(component, ctx)?;
    let duration = component.period.wall_duration(ctx)?;
    check_end(&component.period.start, duration)?;

    let mut spans = Vec::new();
    let mut reach = duration;
    for date in &component.recurrence_dates {
        match date.period() {
            Some(period) => {
                let span = period.wall_duration(ctx)?;
                if let PeriodEnd::Duration(_) = period.end {
                    check_end(&period.start, span)?;
                }
                reach = reach.max(span);
                spans.push((period, span));
            }
            None => check_end(date.start(), duration)?,
        }
    }

    let margin = if component.is_all_day() {
        Duration::days(1)
    } else {
        Duration::zero()
    };
    let search = window.widened(reach.checked_add(&margin).unwrap_or(reach), margin);

    for instance in &component.overrides {
        let start = instance.start.as_ref().unwrap_or(&instance.recurrence_id);
        match &instance.end {
            Some(PeriodEnd::End(end)) => {
                Period::new(start.clone(), end.clone()).wall_duration(ctx)?;
            }
            Some(PeriodEnd::Duration(span)) => check_end(start, *span)?,
            None => check_end(start, reach)?,
        }
    }
    if component.rule.is_some() {
        let latest = component.period.start.with_datetime(latest_rule_start(&search));
        check_end(&latest, duration)?;
    }

    let base = component
        .rule
        .as_ref()
        .map(|rule| expand(rule, &component.period.start, Some(search), ctx))
        .transpose()?;
    let resolution = resolve(base, &ExceptionSet::of(component), Some(search), ctx)?;

    let mut occurrences = Occurrences {
        component,
        resolution,
        frames,
        spans,
        duration,
        window: *window,
        dates: ctx.local_dates(window)?,
        moved_in: Vec::new().into_iter(),
    };
    occurrences.moved_in = occurrences.moved_into_window(&search, ctx)?.into_iter();
    Ok(occurrences)
}

/// Reject an instance whose end cannot be represented.
fn check_end(start: &Instant, span: Duration) -> Result<()> {
    match start.shifted(span) {
        Some(_) => Ok(()),
        None => Err(AlmanacError::Configuration(format!(
            "instance starting {start} and lasting {}s ends out of range",
            span.num_seconds()
        ))),
    }
}

/// The latest wall-clock start a rule instance can have within `search`.
/// Two days cover any zone offset.
fn latest_rule_start(search: &UtcWindow) -> NaiveDateTime {
    let last_year = NaiveDate::from_ymd_opt(MAX_YEAR, 12, 31).and_then(|d| d.and_hms_opt(23, 59, 59));
    let past_search = search.end.naive_utc().checked_add_signed(Duration::days(2));
    last_year
        .into_iter()
        .chain(past_search)
        .min()
        .unwrap_or(NaiveDateTime::MAX)
}

/// Whether the instance at `utc` belongs to the component's recurrence set.
fn membership<'a>(
    component: &'a RecurringComponent,
    utc: DateTime<Utc>,
    ctx: &ZoneContext<'a>,
) -> Result<Option<ResolvedInstant<'a>>> {
    let Some(after) = utc.checked_add_signed(Duration::seconds(1)) else {
        return Ok(None);
    };
    let lookup = UtcWindow::new(utc, after)?;
    let base = component
        .rule
        .as_ref()
        .map(|rule| expand(rule, &component.period.start, Some(lookup), ctx))
        .transpose()?;
    let mut members = resolve(base, &ExceptionSet::of(component), Some(lookup), ctx)?;
    Ok(members.find(|member| member.utc == utc))
}

// ── Frames ──────────────────────────────────────────────────────────────────

/// Resolvers for every zone tag used by one component.
#[derive(Debug, Clone)]
struct Frames<'a> {
    resolved: Vec<(ZoneTag, Resolver<'a>)>,
}

impl<'a> Frames<'a> {
    fn collect(component: &RecurringComponent, ctx: &ZoneContext<'a>) -> Result<Self> {
        let mut resolved: Vec<(ZoneTag, Resolver<'a>)> = Vec::new();
        let mut add = |instant: &Instant| -> Result<()> {
            if !resolved.iter().any(|(tag, _)| *tag == instant.zone) {
                resolved.push((instant.zone.clone(), ctx.resolver(&instant.zone)?));
            }
            Ok(())
        };

        add(&component.period.start)?;
        if let Some(end) = component.period.end_instant() {
            add(end)?;
        }
        for date in &component.recurrence_dates {
            add(date.start())?;
            if let Some(end) = date.period().and_then(Period::end_instant) {
                add(end)?;
            }
        }
        for instance in &component.overrides {
            add(&instance.recurrence_id)?;
            if let Some(start) = &instance.start {
                add(start)?;
            }
            if let Some(PeriodEnd::End(end)) = &instance.end {
                add(end)?;
            }
        }
        Ok(Self { resolved })
    }

    fn to_utc(&self, instant: &Instant) -> DateTime<Utc> {
        // Every tag of the component was collected up front.
        let resolver = self
            .resolved
            .iter()
            .find(|(tag, _)| *tag == instant.zone)
            .map_or(Resolver::Utc, |(_, resolver)| *resolver);
        resolver.to_utc(instant.datetime)
    }
}

// ── Occurrences ─────────────────────────────────────────────────────────────

enum End<'p> {
    At(&'p Instant),
    Lasting(Duration),
}

/// The lazy occurrences of one component: recurrence order, then overrides
/// moved into the window from outside it.
#[derive(Debug, Clone)]
pub struct Occurrences<'a> {
    component: &'a RecurringComponent,
    resolution: Resolution<'a>,
    frames: Frames<'a>,
    spans: Vec<(&'a Period, Duration)>,
    duration: Duration,
    window: UtcWindow,
    dates: (NaiveDate, NaiveDate),
    moved_in: std::vec::IntoIter<Materialized<'a>>,
}

impl<'a> Occurrences<'a> {
    fn moved_into_window(&self, search: &UtcWindow, ctx: &ZoneContext<'a>) -> Result<Vec<Materialized<'a>>> {
        let mut moved = Vec::new();
        for instance in self.component.overrides.iter().filter(|o| o.reschedules()) {
            let original = ctx.to_utc(&instance.recurrence_id)?;
            if search.contains(original) {
                continue;
            }
            let Some(member) = membership(self.component, original, ctx)? else {
                continue;
            };
            let occurrence = self.realize(member);
            if self.intersects(&occurrence) {
                moved.push(occurrence);
            }
        }
        moved.sort_by_key(|occurrence| occurrence.start_utc);
        Ok(moved)
    }

    fn span_of(&self, period: Option<&Period>) -> Duration {
        period
            .and_then(|period| {
                self.spans
                    .iter()
                    .find(|(candidate, _)| std::ptr::eq(*candidate, period))
                    .map(|(_, span)| *span)
            })
            .unwrap_or(self.duration)
    }

    fn realize(&self, resolved: ResolvedInstant<'a>) -> Materialized<'a> {
        let (start, start_utc, end) = match (resolved.overridden_by, resolved.period) {
            (Some(instance), period) => {
                trace!(uid = %self.component.uid, recurrence_id = %resolved.instant, "applying override");
                let (start, start_utc) = match &instance.start {
                    Some(start) => (start.clone(), self.frames.to_utc(start)),
                    None => (resolved.instant.clone(), resolved.utc),
                };
                let end = match &instance.end {
                    Some(PeriodEnd::End(end)) => End::At(end),
                    Some(PeriodEnd::Duration(duration)) => End::Lasting(*duration),
                    None => End::Lasting(self.span_of(period)),
                };
                (start, start_utc, end)
            }
            (None, Some(period)) => {
                let end = match &period.end {
                    PeriodEnd::End(end) => End::At(end),
                    PeriodEnd::Duration(duration) => End::Lasting(*duration),
                };
                (period.start.clone(), resolved.utc, end)
            }
            (None, None) => (resolved.instant.clone(), resolved.utc, End::Lasting(self.duration)),
        };

        let (end, end_utc) = match end {
            End::At(end) => (end.clone(), self.frames.to_utc(end)),
            End::Lasting(duration) => {
                // Ends were range-checked by `materialize`.
                let end = start.shifted(duration).unwrap_or_else(|| start.clone());
                let end_utc = self.frames.to_utc(&end);
                (end, end_utc)
            }
        };

        Materialized {
            period: Period::new(start, end),
            recurrence_id: self.component.is_recurring().then_some(resolved.instant),
            overridden_by: resolved.overridden_by,
            start_utc,
            end_utc,
        }
    }

    fn intersects(&self, occurrence: &Materialized<'_>) -> bool {
        let period = &occurrence.period;
        if period.is_all_day() {
            let (first, end) = self.dates;
            let start = period.start.date_naive();
            let stop = period.end_instant().map_or(start, Instant::date_naive);
            return start < end && (stop > first || start >= first);
        }
        self.window.intersects(occurrence.start_utc, occurrence.end_utc)
    }
}

impl<'a> Iterator for Occurrences<'a> {
    type Item = Materialized<'a>;

    fn next(&mut self) -> Option<Materialized<'a>> {
        while let Some(resolved) = self.resolution.next() {
            let occurrence = self.realize(resolved);
            if self.intersects(&occurrence) {
                return Some(occurrence);
            }
        }
        self.moved_in.next()
    }
}
