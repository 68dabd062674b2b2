//! Calendar collection queries.
//!
//! A query resolves the window once per calendar (each calendar brings its
//! own zone definitions), materializes every component of the requested kind,
//! and returns all occurrences in one chronological list. Nothing is
//! de-duplicated across calendars: the same event in two calendars is two
//! occurrences.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calendar::{Calendar, CalendarCollection};
use crate::component::{ComponentKind, Override, RecurringComponent};
use crate::error::Result;
use crate::instant::{Instant, Period, Window};
use crate::materializer::{materialize, Materialized};
use crate::zone::DefaultZone;

// ── Options ─────────────────────────────────────────────────────────────────

/// Configuration for occurrence queries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// The zone floating instants (and the default window bounds) are read in.
    #[serde(default)]
    pub default_zone: DefaultZone,
    /// Resolve zone ids the calendar does not define through the IANA database.
    #[serde(default)]
    pub system_zones: bool,
}

impl QueryOptions {
    pub fn with_default_zone(mut self, zone: DefaultZone) -> Self {
        self.default_zone = zone;
        self
    }

    pub fn with_system_zones(mut self, enabled: bool) -> Self {
        self.system_zones = enabled;
        self
    }
}

// ── Occurrence ──────────────────────────────────────────────────────────────

/// A concrete occurrence of a component, borrowed from the queried collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence<'a> {
    pub period: Period,
    pub source: &'a RecurringComponent,
    recurrence_id: Option<Instant>,
    override_index: Option<usize>,
    start_utc: DateTime<Utc>,
    end_utc: DateTime<Utc>,
    calendar_index: usize,
    component_index: usize,
}

impl<'a> Occurrence<'a> {
    fn new(
        source: &'a RecurringComponent,
        materialized: Materialized<'_>,
        calendar_index: usize,
        component_index: usize,
    ) -> Self {
        let override_index = materialized.overridden_by.and_then(|instance| {
            source
                .overrides
                .iter()
                .position(|candidate| std::ptr::eq(candidate, instance))
        });
        Self {
            period: materialized.period,
            source,
            recurrence_id: materialized.recurrence_id,
            override_index,
            start_utc: materialized.start_utc,
            end_utc: materialized.end_utc,
            calendar_index,
            component_index,
        }
    }

    /// The recurrence instant this occurrence realizes, for recurring components.
    pub fn recurrence_id(&self) -> Option<&Instant> {
        self.recurrence_id.as_ref()
    }

    /// The override that produced this occurrence, if any.
    pub fn overridden_by(&self) -> Option<&'a Override> {
        self.override_index.and_then(|i| self.source.overrides.get(i))
    }

    pub fn start_utc(&self) -> DateTime<Utc> {
        self.start_utc
    }

    pub fn end_utc(&self) -> DateTime<Utc> {
        self.end_utc
    }

    /// Position of the source calendar in the queried collection.
    pub fn calendar_index(&self) -> usize {
        self.calendar_index
    }

    pub fn kind(&self) -> ComponentKind {
        self.source.kind
    }

    pub fn is_all_day(&self) -> bool {
        self.period.is_all_day()
    }

    /// The override's summary, falling back to the component's.
    pub fn summary(&self) -> Option<&'a str> {
        self.overridden_by()
            .and_then(|instance| instance.summary.as_deref())
            .or(self.source.summary.as_deref())
    }

    pub fn description(&self) -> Option<&'a str> {
        self.overridden_by()
            .and_then(|instance| instance.description.as_deref())
            .or(self.source.description.as_deref())
    }

    pub fn location(&self) -> Option<&'a str> {
        self.overridden_by()
            .and_then(|instance| instance.location.as_deref())
            .or(self.source.location.as_deref())
    }
}

// ── get_occurrences ─────────────────────────────────────────────────────────

/// All occurrences in `window` across every calendar of `collection`.
///
/// # Arguments
///
/// * `collection` — the calendars to query, in insertion order
/// * `window` — the half-open range `[start, end)`; floating bounds are read
///   in the default zone
/// * `kind` — restrict to one component kind, or `None` for all
/// * `options` — default zone and IANA fallback
///
/// Occurrences are sorted by UTC start; ties keep calendar order, then
/// component order, then generation order.
///
/// # Errors
///
/// Returns [`AlmanacError::Window`](crate::AlmanacError::Window) if the
/// window end is not after its start, and propagates the first
/// configuration or zone error of any component.
///
/// # Examples
///
/// ```
/// use almanac_engine::{
///     get_occurrences, Calendar, CalendarCollection, Instant, Period, QueryOptions,
///     RecurrencePattern, RecurringComponent, Window,
/// };
/// use chrono::{Duration, NaiveDate};
///
/// let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(9, 0, 0).unwrap();
/// let standup = RecurringComponent::event("standup", Period::with_duration(Instant::utc(start), Duration::minutes(15)))
///     .with_summary("Standup")
///     .with_rule(RecurrencePattern::daily().with_count(5));
/// let collection: CalendarCollection = [Calendar::new().with_component(standup)].into_iter().collect();
///
/// let window = Window::days(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 9).unwrap();
/// let occurrences = get_occurrences(&collection, &window, None, &QueryOptions::default()).unwrap();
/// assert_eq!(occurrences.len(), 5);
/// assert_eq!(occurrences[0].summary(), Some("Standup"));
/// ```
pub fn get_occurrences<'a>(
    collection: &'a CalendarCollection,
    window: &Window,
    kind: Option<ComponentKind>,
    options: &QueryOptions,
) -> Result<Vec<Occurrence<'a>>> {
    occurrences_in(collection.as_slice(), window, kind, options)
}

pub(crate) fn occurrences_in<'a>(
    calendars: &'a [Calendar],
    window: &Window,
    kind: Option<ComponentKind>,
    options: &QueryOptions,
) -> Result<Vec<Occurrence<'a>>> {
    window.validate()?;
    debug!(
        calendars = calendars.len(),
        start = %window.start,
        end = %window.end,
        kind = kind.map(ComponentKind::as_str),
        "querying occurrences"
    );

    let mut occurrences = Vec::new();
    for (calendar_index, calendar) in calendars.iter().enumerate() {
        let ctx = calendar.zone_context(options);
        let resolved = ctx.resolve_window(window)?;
        let components = calendar
            .components
            .iter()
            .enumerate()
            .filter(|(_, component)| kind.is_none_or(|k| component.kind == k));
        for (component_index, component) in components {
            let before = occurrences.len();
            for materialized in materialize(component, &resolved, &ctx)? {
                occurrences.push(Occurrence::new(component, materialized, calendar_index, component_index));
            }
            debug!(
                uid = %component.uid,
                calendar = calendar_index,
                count = occurrences.len() - before,
                "materialized component"
            );
        }
    }

    occurrences.sort_by_key(|o| (o.start_utc, o.calendar_index, o.component_index));
    Ok(occurrences)
}
