//! # almanac-engine
//!
//! Deterministic occurrence computation for calendar collections.
//!
//! Given calendars of scheduled components (events, to-dos, journal entries)
//! and a time window, the engine answers "which concrete occurrences fall in
//! this window?", honoring recurrence rules, added and removed dates,
//! exception rules, per-instance overrides and time-zone definitions.
//!
//! ## Modules
//!
//! - [`expander`] — recurrence pattern + anchor → lazy ascending instants
//! - [`exceptions`] — union/subtract added dates, removed dates and exception rules; attach overrides
//! - [`materializer`] — recurrence instants → concrete periods intersecting a window
//! - [`zone`] — zone definitions, default zone and normalization of tagged instants
//! - [`query`] — occurrences across a whole calendar collection
//! - [`calendar`], [`component`], [`recurrence`], [`instant`] — the data model
//! - [`error`] — Error types
//!
//! Every stage is a pure function of its inputs. Zone information travels in
//! an explicit [`ZoneContext`]; there is no global state.

pub mod calendar;
pub mod component;
pub mod error;
pub mod exceptions;
pub mod expander;
pub mod instant;
pub mod materializer;
pub mod query;
pub mod recurrence;
pub mod zone;

pub use calendar::{Calendar, CalendarCollection};
pub use component::{ComponentKind, Override, RecurrenceDate, RecurringComponent};
pub use error::{AlmanacError, Result};
pub use expander::{expand, Expansion};
pub use instant::{Instant, Period, PeriodEnd, UtcWindow, Window, ZoneTag};
pub use query::{get_occurrences, Occurrence, QueryOptions};
pub use recurrence::{ByPart, Frequency, RecurrencePattern, WeekdayNum};
pub use zone::{
    format_utc_offset, DefaultZone, Observance, ObservanceKind, ZoneContext, ZoneDefinition,
};
