use almanac_engine::{
    expand, get_occurrences, ByPart, Calendar, CalendarCollection, Instant, Period, QueryOptions,
    RecurrencePattern, RecurringComponent, UtcWindow, WeekdayNum, Window, ZoneContext,
};
use chrono::{Duration, NaiveDate, TimeZone, Utc, Weekday};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

fn bench_expand(c: &mut Criterion) {
    let anchor = Instant::utc(
        NaiveDate::from_ymd_opt(2000, 1, 3)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap(),
    );
    let weekdays = RecurrencePattern::weekly().with(ByPart::Day(
        [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri]
            .into_iter()
            .map(WeekdayNum::every)
            .collect(),
    ));
    let ctx = ZoneContext::utc_only();

    c.bench_function("expand_weekdays_count_1000", |b| {
        let pattern = weekdays.clone().with_count(1000);
        b.iter(|| expand(black_box(&pattern), &anchor, None, &ctx).unwrap().count())
    });

    // An old anchor with a one-month window: fast-forward keeps this cheap.
    let window = UtcWindow::new(
        Utc.with_ymd_and_hms(2030, 6, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2030, 7, 1, 0, 0, 0).unwrap(),
    )
    .unwrap();
    c.bench_function("expand_weekdays_windowed_2030", |b| {
        b.iter(|| {
            expand(black_box(&weekdays), &anchor, Some(window), &ctx)
                .unwrap()
                .count()
        })
    });
}

fn bench_query(c: &mut Criterion) {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let calendars: CalendarCollection = (0..10)
        .map(|i| {
            let anchor = Instant::utc(start.and_hms_opt(8 + i, 0, 0).unwrap());
            Calendar::new().with_component(
                RecurringComponent::event(format!("daily-{i}"), Period::with_duration(anchor, Duration::minutes(30)))
                    .with_rule(RecurrencePattern::daily()),
            )
        })
        .collect();
    let window = Window::days(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(), 31).unwrap();
    let options = QueryOptions::default();

    c.bench_function("query_ten_daily_calendars_one_month", |b| {
        b.iter(|| {
            get_occurrences(black_box(&calendars), &window, None, &options)
                .unwrap()
                .len()
        })
    });
}

criterion_group!(benches, bench_expand, bench_query);
criterion_main!(benches);
