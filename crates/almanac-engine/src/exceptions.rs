//! Exception resolution: turns a base expansion into the final recurrence set.
//!
//! The recurrence set of a component is
//!
//! ```text
//! (anchor ∪ rule instances ∪ added dates) − removed dates − exception-rule instances
//! ```
//!
//! with every comparison made on the UTC normalization of the instants, and
//! with per-instance overrides attached to the members they replace.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, NaiveDate, Utc};

use crate::component::{Override, RecurrenceDate, RecurringComponent};
use crate::error::{AlmanacError, Result};
use crate::expander::{expand, Expansion};
use crate::instant::{Instant, Period, UtcWindow};
use crate::recurrence::RecurrencePattern;
use crate::zone::ZoneContext;

/// The exception data of one component, borrowed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExceptionSet<'a> {
    /// The component's start, always a member of its own set.
    pub anchor: Option<&'a Instant>,
    pub added: &'a [RecurrenceDate],
    pub removed: &'a [Instant],
    pub exception_patterns: &'a [RecurrencePattern],
    pub overrides: &'a [Override],
}

impl<'a> ExceptionSet<'a> {
    pub fn of(component: &'a RecurringComponent) -> Self {
        Self {
            anchor: Some(&component.period.start),
            added: &component.recurrence_dates,
            removed: &component.exception_dates,
            exception_patterns: &component.exception_rules,
            overrides: &component.overrides,
        }
    }
}

/// A member of the recurrence set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInstant<'a> {
    pub instant: Instant,
    pub utc: DateTime<Utc>,
    /// The override replacing this instance, if any.
    pub overridden_by: Option<&'a Override>,
    /// The period of a period-valued added date.
    pub period: Option<&'a Period>,
}

#[derive(Debug, Clone)]
struct Added<'a> {
    instant: Instant,
    utc: DateTime<Utc>,
    period: Option<&'a Period>,
}

/// Instants of one exception pattern, consumed in step with the set.
#[derive(Debug, Clone)]
struct Exclusion<'a> {
    expansion: Expansion<'a>,
    head: Option<DateTime<Utc>>,
}

impl Exclusion<'_> {
    /// Whether `utc` is produced by the pattern. Calls must be ascending.
    fn excludes(&mut self, utc: DateTime<Utc>) -> bool {
        while self.head.is_some_and(|head| head < utc) {
            self.head = self.expansion.next_candidate().map(|(_, at)| at);
        }
        self.head == Some(utc)
    }
}

/// Resolve the recurrence set of `base` and `exceptions`.
///
/// `window` limits added dates and exception patterns the same way it
/// limited `base`. Only the anchor and added dates inside it are unioned in.
///
/// # Errors
///
/// Zone lookups for every input happen here: [`AlmanacError::ZoneResolution`]
/// for an unknown zone. Exception patterns are validated like the rule
/// ([`AlmanacError::Configuration`]), and need an anchor to expand from.
pub fn resolve<'a>(
    base: Option<Expansion<'a>>,
    exceptions: &ExceptionSet<'a>,
    window: Option<UtcWindow>,
    ctx: &ZoneContext<'a>,
) -> Result<Resolution<'a>> {
    let in_window = |utc: DateTime<Utc>| window.is_none_or(|w| w.contains(utc));

    let mut added = Vec::with_capacity(exceptions.added.len() + 1);
    if let Some(anchor) = exceptions.anchor {
        let utc = ctx.to_utc(anchor)?;
        if in_window(utc) {
            added.push(Added {
                instant: anchor.clone(),
                utc,
                period: None,
            });
        }
    }
    for date in exceptions.added {
        let utc = ctx.to_utc(date.start())?;
        if in_window(utc) {
            added.push(Added {
                instant: date.start().clone(),
                utc,
                period: date.period(),
            });
        }
    }
    // Stable: for equal instants the anchor stays ahead of added dates.
    added.sort_by_key(|a| a.utc);

    let mut removed_exact = HashSet::new();
    let mut removed_dates = HashSet::new();
    for removed in exceptions.removed {
        if removed.date_only {
            removed_dates.insert(removed.date_naive());
        } else {
            removed_exact.insert(ctx.to_utc(removed)?);
        }
    }

    let mut exclusions = Vec::with_capacity(exceptions.exception_patterns.len());
    for pattern in exceptions.exception_patterns {
        let anchor = exceptions.anchor.ok_or_else(|| {
            AlmanacError::Configuration("exception rule without a start to expand from".to_string())
        })?;
        let mut expansion = expand(pattern, anchor, window, ctx)?;
        let head = expansion.next_candidate().map(|(_, utc)| utc);
        exclusions.push(Exclusion { expansion, head });
    }

    let mut overrides = HashMap::with_capacity(exceptions.overrides.len());
    for instance in exceptions.overrides {
        overrides.insert(ctx.to_utc(&instance.recurrence_id)?, instance);
    }

    Ok(Resolution {
        base,
        base_head: None,
        added: added.into(),
        removed_exact,
        removed_dates,
        exclusions,
        overrides,
        last: None,
    })
}

/// The lazy recurrence set, ascending by UTC.
#[derive(Debug, Clone)]
pub struct Resolution<'a> {
    base: Option<Expansion<'a>>,
    base_head: Option<(Instant, DateTime<Utc>)>,
    added: VecDeque<Added<'a>>,
    removed_exact: HashSet<DateTime<Utc>>,
    removed_dates: HashSet<NaiveDate>,
    exclusions: Vec<Exclusion<'a>>,
    overrides: HashMap<DateTime<Utc>, &'a Override>,
    last: Option<DateTime<Utc>>,
}

impl<'a> Resolution<'a> {
    /// Next candidate from the union of base and added instants.
    fn pop_merged(&mut self) -> Option<Added<'a>> {
        if self.base_head.is_none() {
            self.base_head = self.base.as_mut().and_then(Expansion::next_candidate);
        }
        let take_added = match (self.added.front(), &self.base_head) {
            (Some(added), Some((_, base_utc))) => added.utc <= *base_utc,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => return None,
        };
        if take_added {
            self.added.pop_front()
        } else {
            self.base_head.take().map(|(instant, utc)| Added {
                instant,
                utc,
                period: None,
            })
        }
    }

    fn is_removed(&mut self, instant: &Instant, utc: DateTime<Utc>) -> bool {
        if self.removed_exact.contains(&utc) || self.removed_dates.contains(&instant.date_naive()) {
            return true;
        }
        self.exclusions.iter_mut().any(|stream| stream.excludes(utc))
    }
}

impl<'a> Iterator for Resolution<'a> {
    type Item = ResolvedInstant<'a>;

    fn next(&mut self) -> Option<ResolvedInstant<'a>> {
        loop {
            let candidate = self.pop_merged()?;
            if self.last == Some(candidate.utc) {
                continue;
            }
            self.last = Some(candidate.utc);
            if self.is_removed(&candidate.instant, candidate.utc) {
                continue;
            }
            return Some(ResolvedInstant {
                overridden_by: self.overrides.get(&candidate.utc).copied(),
                instant: candidate.instant,
                utc: candidate.utc,
                period: candidate.period,
            });
        }
    }
}
