//! Property tests for expansion and query invariants.

use almanac_engine::{
    expand, get_occurrences, ByPart, Calendar, CalendarCollection, Frequency, Instant, Period,
    QueryOptions, RecurrencePattern, RecurringComponent, UtcWindow, WeekdayNum, Window,
    ZoneContext,
};
use chrono::{Duration, NaiveDate, NaiveDateTime, TimeZone, Utc, Weekday};
use proptest::prelude::*;

fn anchor_strategy() -> impl Strategy<Value = NaiveDateTime> {
    (2000i32..2030, 1u32..=12, 1u32..=28, 0u32..24, 0u32..60).prop_map(|(y, m, d, h, min)| {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    })
}

fn frequency_strategy() -> impl Strategy<Value = Frequency> {
    prop_oneof![
        Just(Frequency::Hourly),
        Just(Frequency::Daily),
        Just(Frequency::Weekly),
        Just(Frequency::Monthly),
        Just(Frequency::Yearly),
    ]
}

fn weekday_strategy() -> impl Strategy<Value = Weekday> {
    prop::sample::select(vec![
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ])
}

fn pattern_strategy() -> impl Strategy<Value = RecurrencePattern> {
    (
        frequency_strategy(),
        1i32..4,
        prop::option::of(prop::collection::vec(weekday_strategy(), 1..4)),
    )
        .prop_map(|(frequency, interval, weekdays)| {
            let pattern = RecurrencePattern::new(frequency).with_interval(interval);
            match weekdays {
                Some(days) if frequency != Frequency::Hourly => {
                    pattern.with(ByPart::Day(days.into_iter().map(WeekdayNum::every).collect()))
                }
                _ => pattern,
            }
        })
}

proptest! {
    #[test]
    fn prop_count_bounded_yields_exactly_count(
        pattern in pattern_strategy(),
        anchor in anchor_strategy(),
        count in 0u32..40,
    ) {
        let pattern = pattern.with_count(count);
        let instants: Vec<_> = expand(&pattern, &Instant::utc(anchor), None, &ZoneContext::utc_only())
            .unwrap()
            .collect();
        prop_assert_eq!(instants.len(), count as usize);
    }

    #[test]
    fn prop_until_is_never_exceeded(
        pattern in pattern_strategy(),
        anchor in anchor_strategy(),
        days in 1i64..400,
    ) {
        let until = anchor + Duration::days(days);
        let pattern = pattern.with_until(Instant::utc(until));
        for instant in expand(&pattern, &Instant::utc(anchor), None, &ZoneContext::utc_only()).unwrap() {
            prop_assert!(instant.datetime <= until);
            prop_assert!(instant.datetime >= anchor);
        }
    }

    #[test]
    fn prop_expansion_is_strictly_ascending(
        pattern in pattern_strategy(),
        anchor in anchor_strategy(),
    ) {
        let instants: Vec<_> = expand(&pattern.with_count(30), &Instant::utc(anchor), None, &ZoneContext::utc_only())
            .unwrap()
            .map(|i| i.datetime)
            .collect();
        prop_assert!(instants.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn prop_windowed_expansion_matches_filtered_full_expansion(
        pattern in pattern_strategy(),
        anchor in anchor_strategy(),
        offset_days in 0i64..200,
        span_days in 1i64..60,
    ) {
        let start = anchor + Duration::days(offset_days);
        let end = start + Duration::days(span_days);
        let window = UtcWindow::new(Utc.from_utc_datetime(&start), Utc.from_utc_datetime(&end)).unwrap();
        let ctx = ZoneContext::utc_only();
        let anchor = Instant::utc(anchor);

        let windowed: Vec<_> = expand(&pattern, &anchor, Some(window), &ctx).unwrap().collect();
        let full: Vec<_> = expand(&pattern, &anchor, None, &ctx)
            .unwrap()
            .take_while(|i| i.datetime < end)
            .filter(|i| i.datetime >= start)
            .collect();
        prop_assert_eq!(windowed, full);
    }

    #[test]
    fn prop_query_is_idempotent_and_in_window(
        pattern in pattern_strategy(),
        anchor in anchor_strategy(),
        offset_days in 0i64..100,
    ) {
        let component = RecurringComponent::event(
            "p",
            Period::with_duration(Instant::utc(anchor), Duration::minutes(30)),
        )
        .with_rule(pattern);
        let collection: CalendarCollection = [Calendar::new().with_component(component)].into_iter().collect();
        let from = anchor.date() + Duration::days(offset_days);
        let window = Window::days(from, 14).unwrap();
        let options = QueryOptions::default();

        let first = get_occurrences(&collection, &window, None, &options).unwrap();
        let second = get_occurrences(&collection, &window, None, &options).unwrap();
        prop_assert_eq!(&first, &second);

        let window_start = Utc.from_utc_datetime(&from.and_hms_opt(0, 0, 0).unwrap());
        let window_end = window_start + Duration::days(14);
        for occurrence in &first {
            prop_assert!(occurrence.start_utc() < window_end);
            prop_assert!(occurrence.end_utc() > window_start || occurrence.start_utc() >= window_start);
        }
        prop_assert!(first.windows(2).all(|pair| pair[0].start_utc() <= pair[1].start_utc()));
    }
}
