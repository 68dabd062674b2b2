//! Calendars and calendar collections.

use std::slice;

use serde::{Deserialize, Serialize};

use crate::component::{ComponentKind, RecurringComponent};
use crate::error::Result;
use crate::instant::{Instant, Window};
use crate::query::{occurrences_in, Occurrence, QueryOptions};
use crate::zone::{ZoneContext, ZoneDefinition};

/// One calendar: ordered components plus the zones they refer to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calendar {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub zones: Vec<ZoneDefinition>,
    #[serde(default)]
    pub components: Vec<RecurringComponent>,
}

impl Calendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_zone(mut self, zone: ZoneDefinition) -> Self {
        self.zones.push(zone);
        self
    }

    pub fn with_component(mut self, component: RecurringComponent) -> Self {
        self.components.push(component);
        self
    }

    /// The zone context for this calendar's instants.
    pub fn zone_context<'a>(&'a self, options: &'a QueryOptions) -> ZoneContext<'a> {
        ZoneContext::new(&self.zones, &options.default_zone, options.system_zones)
    }

    /// Occurrences in `[start, end)` with default options.
    ///
    /// # Errors
    ///
    /// See [`query::get_occurrences`](crate::query::get_occurrences).
    pub fn get_occurrences(
        &self,
        start: Instant,
        end: Instant,
        kind: Option<ComponentKind>,
    ) -> Result<Vec<Occurrence<'_>>> {
        self.get_occurrences_with(&Window::new(start, end), kind, &QueryOptions::default())
    }

    /// # Errors
    ///
    /// See [`query::get_occurrences`](crate::query::get_occurrences).
    pub fn get_occurrences_with(
        &self,
        window: &Window,
        kind: Option<ComponentKind>,
        options: &QueryOptions,
    ) -> Result<Vec<Occurrence<'_>>> {
        occurrences_in(slice::from_ref(self), window, kind, options)
    }
}

/// Calendars queried as a unit, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalendarCollection {
    calendars: Vec<Calendar>,
}

impl CalendarCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, calendar: Calendar) {
        self.calendars.push(calendar);
    }

    pub fn len(&self) -> usize {
        self.calendars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calendars.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, Calendar> {
        self.calendars.iter()
    }

    pub fn as_slice(&self) -> &[Calendar] {
        &self.calendars
    }

    /// Occurrences in `[start, end)` across all calendars, with default options.
    ///
    /// # Errors
    ///
    /// See [`query::get_occurrences`](crate::query::get_occurrences).
    pub fn get_occurrences(
        &self,
        start: Instant,
        end: Instant,
        kind: Option<ComponentKind>,
    ) -> Result<Vec<Occurrence<'_>>> {
        self.get_occurrences_with(&Window::new(start, end), kind, &QueryOptions::default())
    }

    /// # Errors
    ///
    /// See [`query::get_occurrences`](crate::query::get_occurrences).
    pub fn get_occurrences_with(
        &self,
        window: &Window,
        kind: Option<ComponentKind>,
        options: &QueryOptions,
    ) -> Result<Vec<Occurrence<'_>>> {
        occurrences_in(&self.calendars, window, kind, options)
    }
}

impl Extend<Calendar> for CalendarCollection {
    fn extend<I: IntoIterator<Item = Calendar>>(&mut self, iter: I) {
        self.calendars.extend(iter);
    }
}

impl FromIterator<Calendar> for CalendarCollection {
    fn from_iter<I: IntoIterator<Item = Calendar>>(iter: I) -> Self {
        Self {
            calendars: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a CalendarCollection {
    type Item = &'a Calendar;
    type IntoIter = slice::Iter<'a, Calendar>;

    fn into_iter(self) -> Self::IntoIter {
        self.calendars.iter()
    }
}
