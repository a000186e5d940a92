use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::Arc;

use storewatch_core::{BusinessHourRule, Observation, StoreId, StoreStatus, WeeklySchedule};
use storewatch_infra::sources::{InMemoryObservationSource, InMemoryScheduleSource};
use storewatch_reporting::{ReportWindow, UptimeCalculator, interpolate, window_activity};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 13, 23, 0, 0).unwrap()
}

/// One observation every `step_minutes` across the last week, flipping status every fifth poll.
fn synthetic_week(store: &str, step_minutes: i64) -> Vec<Observation> {
    let start = now() - Duration::weeks(1);
    (0..(7 * 24 * 60 / step_minutes))
        .map(|i| {
            let status = if i % 5 == 0 { StoreStatus::Inactive } else { StoreStatus::Active };
            Observation::new(store, start + Duration::minutes(i * step_minutes), status)
        })
        .collect()
}

fn nine_to_five(store: &str) -> Vec<BusinessHourRule> {
    (0..7)
        .map(|d| {
            BusinessHourRule::new(
                store,
                d,
                NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            )
        })
        .collect()
}

fn bench_interpolation(c: &mut Criterion) {
    let mut group = c.benchmark_group("interpolation");

    for step in [60, 15, 5] {
        let observations = synthetic_week("s1", step);
        group.throughput(Throughput::Elements(observations.len() as u64));
        group.bench_with_input(BenchmarkId::new("week", observations.len()), &observations, |b, obs| {
            b.iter(|| interpolate(now() - Duration::weeks(1), now(), black_box(obs)));
        });
    }

    group.finish();
}

fn bench_window_activity(c: &mut Criterion) {
    let mut group = c.benchmark_group("window_activity");
    let tz: Tz = "America/New_York".parse().unwrap();
    let rules = nine_to_five("s1");
    let schedule = WeeklySchedule::from_rules(&rules).unwrap();
    let observations = synthetic_week("s1", 15);

    for window in ReportWindow::ALL {
        group.bench_function(format!("{window:?}"), |b| {
            b.iter(|| window_activity(&schedule, tz, window, now(), black_box(&observations)));
        });
    }

    group.finish();
}

fn bench_full_report(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_report");
    group.sample_size(20);
    let runtime = tokio::runtime::Runtime::new().unwrap();

    for store_count in [10usize, 100] {
        let observations = Arc::new(InMemoryObservationSource::new());
        let schedules = Arc::new(InMemoryScheduleSource::new());
        for i in 0..store_count {
            let store = format!("store-{i:04}");
            observations.record_all(synthetic_week(&store, 60)).unwrap();
            schedules.set_timezone(store.as_str(), "America/Chicago").unwrap();
            for rule in nine_to_five(&store) {
                schedules.add_rule(rule).unwrap();
            }
        }
        let calculator = UptimeCalculator::new(observations, schedules);
        let stores: Vec<StoreId> = runtime.block_on(calculator.stores()).unwrap();

        group.throughput(Throughput::Elements(store_count as u64));
        group.bench_with_input(BenchmarkId::new("stores", store_count), &stores, |b, stores| {
            b.iter(|| runtime.block_on(calculator.compute_stores(black_box(stores), now())));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_interpolation, bench_window_activity, bench_full_report);
criterion_main!(benches);
