use std::path::PathBuf;

use almanac_engine::{
    get_occurrences, CalendarCollection, ComponentKind, DefaultZone, Instant, Occurrence,
    QueryOptions, Window, ZoneContext, ZoneTag,
};
use anyhow::{bail, Context, Result};
use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Serialize;

use crate::load::load_collection;

/// Options shared by every subcommand.
pub struct Settings {
    pub zone: DefaultZone,
    pub system_zones: bool,
    pub kind: Option<ComponentKind>,
    pub today: Option<NaiveDate>,
    pub json: bool,
}

impl Settings {
    fn query_options(&self) -> QueryOptions {
        QueryOptions::default()
            .with_default_zone(self.zone.clone())
            .with_system_zones(self.system_zones)
    }

    /// `--today`, or the current date in the default zone.
    fn today(&self) -> Result<NaiveDate> {
        if let Some(today) = self.today {
            return Ok(today);
        }
        let ctx = ZoneContext::new(&[], &self.zone, self.system_zones);
        let local = ctx.resolver(&ZoneTag::Floating)?.from_utc(Utc::now());
        Ok(local.date())
    }
}

/// How a plain-text line shows the start time.
#[derive(Clone, Copy)]
enum TimeStyle {
    Clock,
    Dated,
}

pub fn today_command(settings: &Settings, paths: &[PathBuf]) -> Result<()> {
    let today = settings.today()?;
    let window = Window::day(today)?;
    run(settings, paths, &window, "Today's Events:", TimeStyle::Clock)
}

pub fn upcoming_command(settings: &Settings, paths: &[PathBuf], days: u32) -> Result<()> {
    if days < 2 {
        bail!("--days must be at least 2, got {days}");
    }
    let tomorrow = settings
        .today()?
        .checked_add_days(Days::new(1))
        .context("date out of range")?;
    let Ok(window) = Window::days(tomorrow, i64::from(days) - 1) else {
        bail!("--days {days} reaches past the last supported date");
    };
    run(settings, paths, &window, "Upcoming Events:", TimeStyle::Dated)
}

pub fn range_command(settings: &Settings, paths: &[PathBuf], from: &str, to: &str) -> Result<()> {
    let start = parse_bound(from).with_context(|| format!("invalid --from '{from}'"))?;
    let end = parse_bound(to).with_context(|| format!("invalid --to '{to}'"))?;
    let window = Window::new(start, end);
    run(settings, paths, &window, "Events:", TimeStyle::Dated)
}

fn run(
    settings: &Settings,
    paths: &[PathBuf],
    window: &Window,
    heading: &str,
    style: TimeStyle,
) -> Result<()> {
    let collection = load_collection(paths)?;
    let options = settings.query_options();
    let occurrences = get_occurrences(&collection, window, settings.kind, &options)
        .with_context(|| format!("failed to query {} calendars", collection.len()))?;

    if settings.json {
        let rows = occurrences
            .iter()
            .map(|occurrence| Row::new(occurrence, &collection, &options))
            .collect::<Result<Vec<_>>>()?;
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("{heading}");
    if occurrences.is_empty() {
        println!("  (none)");
    }
    for occurrence in &occurrences {
        let name = occurrence.summary().unwrap_or(&occurrence.source.uid);
        let when = if occurrence.is_all_day() {
            match style {
                TimeStyle::Clock => "All Day".to_string(),
                TimeStyle::Dated => format!("{} All Day", occurrence.period.start.date_naive()),
            }
        } else {
            let local = local_start(occurrence, &collection, &options)?;
            match style {
                TimeStyle::Clock => local.format("%H:%M").to_string(),
                TimeStyle::Dated => local.format("%Y-%m-%d %H:%M").to_string(),
            }
        };
        println!("{name}: {when}");
    }
    Ok(())
}

/// The occurrence start as a wall-clock reading in the default zone.
fn local_start(
    occurrence: &Occurrence<'_>,
    collection: &CalendarCollection,
    options: &QueryOptions,
) -> Result<NaiveDateTime> {
    let calendar = collection
        .as_slice()
        .get(occurrence.calendar_index())
        .context("occurrence refers to a missing calendar")?;
    let ctx = calendar.zone_context(options);
    Ok(ctx.resolver(&ZoneTag::Floating)?.from_utc(occurrence.start_utc()))
}

/// Accepts `YYYY-MM-DD` (floating midnight), `YYYY-MM-DDTHH:MM[:SS]`
/// (floating) or the same with a trailing `Z` (UTC).
fn parse_bound(text: &str) -> Result<Instant> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(Instant::floating(date.and_time(NaiveTime::MIN)));
    }
    let (body, utc) = match text.strip_suffix('Z') {
        Some(body) => (body, true),
        None => (text, false),
    };
    let datetime = NaiveDateTime::parse_from_str(body, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(body, "%Y-%m-%dT%H:%M"))
        .context("expected YYYY-MM-DD or YYYY-MM-DDTHH:MM[:SS][Z]")?;
    Ok(if utc {
        Instant::utc(datetime)
    } else {
        Instant::floating(datetime)
    })
}

/// One `--json` output row.
#[derive(Serialize)]
struct Row<'a> {
    summary: Option<&'a str>,
    uid: &'a str,
    kind: &'static str,
    start: String,
    end: String,
    start_utc: String,
    end_utc: String,
    all_day: bool,
    calendar: Option<&'a str>,
    recurrence_id: Option<String>,
    overridden: bool,
}

impl<'a> Row<'a> {
    fn new(
        occurrence: &Occurrence<'a>,
        collection: &'a CalendarCollection,
        options: &QueryOptions,
    ) -> Result<Self> {
        let calendar = collection
            .as_slice()
            .get(occurrence.calendar_index())
            .context("occurrence refers to a missing calendar")?;
        let ctx = calendar.zone_context(options);
        let start = ctx.to_local(&occurrence.period.start)?;
        let end = match occurrence.period.end_instant() {
            Some(end) => ctx.to_local(end)?.to_string(),
            None => {
                let floating = ctx.resolver(&ZoneTag::Floating)?;
                Instant::floating(floating.from_utc(occurrence.end_utc())).to_string()
            }
        };
        Ok(Self {
            summary: occurrence.summary(),
            uid: &occurrence.source.uid,
            kind: occurrence.kind().as_str(),
            start: start.to_string(),
            end,
            start_utc: occurrence.start_utc().to_rfc3339(),
            end_utc: occurrence.end_utc().to_rfc3339(),
            all_day: occurrence.is_all_day(),
            calendar: calendar.name.as_deref(),
            recurrence_id: occurrence.recurrence_id().map(ToString::to_string),
            overridden: occurrence.overridden_by().is_some(),
        })
    }
}
