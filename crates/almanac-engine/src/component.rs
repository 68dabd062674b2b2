//! Scheduled components: events, to-dos and journal entries.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::instant::{Instant, Period, PeriodEnd, UtcWindow};
use crate::materializer::{materialize, Occurrences};
use crate::recurrence::RecurrencePattern;
use crate::zone::ZoneContext;

/// The kind of a scheduled component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Event,
    Todo,
    Journal,
}

impl ComponentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Todo => "todo",
            Self::Journal => "journal",
        }
    }
}

/// A replacement for one instance of a recurring component, keyed by the
/// instant it replaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Override {
    /// The original recurrence instant this override replaces.
    pub recurrence_id: Instant,
    /// New start; without one the instance keeps its original start.
    #[serde(default)]
    pub start: Option<Instant>,
    /// New end; without one the instance keeps the anchor's duration.
    #[serde(default)]
    pub end: Option<PeriodEnd>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl Override {
    pub fn new(recurrence_id: Instant) -> Self {
        Self {
            recurrence_id,
            start: None,
            end: None,
            summary: None,
            description: None,
            location: None,
        }
    }

    pub fn with_start(mut self, start: Instant) -> Self {
        self.start = Some(start);
        self
    }

    pub fn with_end(mut self, end: PeriodEnd) -> Self {
        self.end = Some(end);
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Whether the override changes when the instance happens.
    pub fn reschedules(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }
}

/// An added recurrence date (RDATE): a bare instant or a full period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceDate {
    Instant(Instant),
    Period(Period),
}

impl RecurrenceDate {
    /// The instant the added date starts at.
    pub fn start(&self) -> &Instant {
        match self {
            Self::Instant(instant) => instant,
            Self::Period(period) => &period.start,
        }
    }

    pub fn period(&self) -> Option<&Period> {
        match self {
            Self::Instant(_) => None,
            Self::Period(period) => Some(period),
        }
    }
}

/// A scheduled component with its anchor period and recurrence data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringComponent {
    pub kind: ComponentKind,
    pub uid: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    /// The first instance (DTSTART with DTEND or DURATION).
    pub period: Period,
    #[serde(default)]
    pub rule: Option<RecurrencePattern>,
    #[serde(default)]
    pub exception_rules: Vec<RecurrencePattern>,
    #[serde(default)]
    pub recurrence_dates: Vec<RecurrenceDate>,
    #[serde(default)]
    pub exception_dates: Vec<Instant>,
    #[serde(default)]
    pub overrides: Vec<Override>,
}

impl RecurringComponent {
    pub fn new(kind: ComponentKind, uid: impl Into<String>, period: Period) -> Self {
        Self {
            kind,
            uid: uid.into(),
            summary: None,
            description: None,
            location: None,
            period,
            rule: None,
            exception_rules: Vec::new(),
            recurrence_dates: Vec::new(),
            exception_dates: Vec::new(),
            overrides: Vec::new(),
        }
    }

    pub fn event(uid: impl Into<String>, period: Period) -> Self {
        Self::new(ComponentKind::Event, uid, period)
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_rule(mut self, rule: RecurrencePattern) -> Self {
        self.rule = Some(rule);
        self
    }

    pub fn with_exception_rule(mut self, rule: RecurrencePattern) -> Self {
        self.exception_rules.push(rule);
        self
    }

    pub fn with_recurrence_date(mut self, date: RecurrenceDate) -> Self {
        self.recurrence_dates.push(date);
        self
    }

    pub fn with_exception_date(mut self, date: Instant) -> Self {
        self.exception_dates.push(date);
        self
    }

    pub fn with_override(mut self, instance: Override) -> Self {
        self.overrides.push(instance);
        self
    }

    /// Whether the component has more than its anchor instance.
    pub fn is_recurring(&self) -> bool {
        self.rule.is_some() || !self.recurrence_dates.is_empty()
    }

    pub fn is_all_day(&self) -> bool {
        self.period.is_all_day()
    }

    /// Materialize this component's occurrences within `window`.
    ///
    /// # Errors
    ///
    /// See [`materialize`].
    pub fn occurrences<'a>(
        &'a self,
        window: &UtcWindow,
        ctx: &ZoneContext<'a>,
    ) -> Result<Occurrences<'a>> {
        materialize(self, window, ctx)
    }
}
