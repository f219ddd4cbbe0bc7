use crate::schedule::CheckSchedule;
use crate::spike::{evaluate, MetricKind, WindowVerdict};
use crate::thresholds::{ThresholdConfig, ThresholdOverride};
use crate::window::CheckWindow;
use vpsmon_common::types::{RawMetrics, VmSpecs};

fn make_specs(ram_mb: u64, disk_gb: u64) -> VmSpecs {
    VmSpecs {
        id: 100,
        account_name: "Default".to_string(),
        ram_mb,
        disk_gb,
        cpu_cores: 2,
        hostname: "web-01".to_string(),
        state: "running".to_string(),
        plan: "KVM 2".to_string(),
        bandwidth: 1000,
    }
}

fn raw_with_cpu(samples: &[(i64, f64)]) -> RawMetrics {
    let mut raw = RawMetrics::default();
    for (ts, val) in samples {
        raw.cpu_usage.usage.insert(ts.to_string(), *val);
    }
    raw
}

#[test]
fn single_interval_lookback_equals_interval() {
    let schedule: CheckSchedule = "15".parse().unwrap();
    assert_eq!(schedule, CheckSchedule::Every(15));
    assert_eq!(schedule.lookback_minutes(), 15);
}

#[test]
fn mark_lookback_includes_hour_wraparound() {
    let schedule: CheckSchedule = "15,45".parse().unwrap();
    assert_eq!(schedule.lookback_minutes(), 30);

    // Gaps 10, 30, 20; the wraparound gap is 50 -> 10 = 20.
    let schedule: CheckSchedule = "10,20,50".parse().unwrap();
    assert_eq!(schedule.lookback_minutes(), 30);

    // A single mark wraps to itself: a full hour.
    let schedule = CheckSchedule::Marks(vec![30]);
    assert_eq!(schedule.lookback_minutes(), 60);
}

#[test]
fn marks_are_sorted_and_deduplicated() {
    let schedule: CheckSchedule = "45, 15,45".parse().unwrap();
    assert_eq!(schedule, CheckSchedule::Marks(vec![15, 45]));
}

#[test]
fn schedule_rejects_bad_input() {
    assert!("".parse::<CheckSchedule>().is_err());
    assert!("0".parse::<CheckSchedule>().is_err());
    assert!("90".parse::<CheckSchedule>().is_err());
    assert!("15,61".parse::<CheckSchedule>().is_err());
    assert!("abc".parse::<CheckSchedule>().is_err());
}

#[test]
fn next_run_for_single_interval() {
    let schedule = CheckSchedule::Every(15);
    assert_eq!(schedule.minutes_until_next(0), 15);
    assert_eq!(schedule.minutes_until_next(44), 1);
    // Strictly greater than the current minute: at :45 the next slot is :00.
    assert_eq!(schedule.minutes_until_next(45), 15);
    assert_eq!(schedule.minutes_until_next(50), 10);
}

#[test]
fn next_run_for_marks_wraps_to_next_hour() {
    let schedule: CheckSchedule = "15,45".parse().unwrap();
    assert_eq!(schedule.minutes_until_next(10), 5);
    assert_eq!(schedule.minutes_until_next(15), 30);
    assert_eq!(schedule.minutes_until_next(50), 25); // 10 left + :15 next hour
}

#[test]
fn is_due_matches_cron_semantics() {
    let every = CheckSchedule::Every(15);
    assert!(every.is_due(0));
    assert!(every.is_due(45));
    assert!(!every.is_due(20));

    let hourly = CheckSchedule::Every(60);
    assert!(hourly.is_due(0));
    assert!(!hourly.is_due(30));

    let marks: CheckSchedule = "15,45".parse().unwrap();
    assert!(marks.is_due(15));
    assert!(!marks.is_due(0));
}

#[test]
fn override_takes_precedence_per_metric() {
    let mut config = ThresholdConfig::default();
    config.overrides.insert(
        "1030000".to_string(),
        ThresholdOverride {
            cpu: Some(95.0),
            ram: None,
            disk: None,
        },
    );

    let resolved = config.resolve(1030000);
    assert_eq!(resolved.cpu, 95.0);
    assert_eq!(resolved.ram, 80.0);
    assert_eq!(resolved.disk, 85.0);

    let other = config.resolve(42);
    assert_eq!(other.cpu, 80.0);
}

#[test]
fn cpu_threshold_is_strictly_greater_than() {
    let specs = make_specs(2048, 50);
    let thresholds = ThresholdConfig::default().resolve(specs.id);

    let raw = raw_with_cpu(&[(1000, 81.0)]);
    let window = CheckWindow::anchored(&raw, 15).unwrap();
    match evaluate(&raw, &specs, thresholds, window) {
        WindowVerdict::Evaluated(spikes) => {
            assert_eq!(spikes.len(), 1);
            assert_eq!(spikes[0].metric, MetricKind::Cpu);
            assert_eq!(spikes[0].observed_percent, 81.0);
        }
        other => panic!("expected evaluated verdict, got {other:?}"),
    }

    let raw = raw_with_cpu(&[(1000, 80.0)]);
    let window = CheckWindow::anchored(&raw, 15).unwrap();
    assert_eq!(
        evaluate(&raw, &specs, thresholds, window),
        WindowVerdict::Evaluated(vec![])
    );
}

#[test]
fn ram_and_disk_compare_against_capacity() {
    let specs = make_specs(2048, 50);
    let thresholds = ThresholdConfig::default().resolve(specs.id);

    let mut raw = RawMetrics::default();
    // 90% of 2048 MB and 90% of 50 GB, both above the 80/85 defaults.
    let ram_bytes = 2048.0 * 1024.0 * 1024.0 * 0.9;
    let disk_bytes = 50.0 * 1024.0 * 1024.0 * 1024.0 * 0.9;
    raw.ram_usage.usage.insert("1000".to_string(), ram_bytes);
    raw.disk_space.usage.insert("1000".to_string(), disk_bytes);

    let window = CheckWindow::anchored(&raw, 15).unwrap();
    match evaluate(&raw, &specs, thresholds, window) {
        WindowVerdict::Evaluated(spikes) => {
            let kinds: Vec<MetricKind> = spikes.iter().map(|s| s.metric).collect();
            assert_eq!(kinds, vec![MetricKind::Ram, MetricKind::Disk]);
            assert!((spikes[0].observed_percent - 90.0).abs() < 1e-9);
        }
        other => panic!("expected evaluated verdict, got {other:?}"),
    }
}

#[test]
fn missing_capacity_skips_metric_without_failing() {
    let specs = make_specs(0, 0);
    let thresholds = ThresholdConfig::default().resolve(specs.id);

    let mut raw = RawMetrics::default();
    raw.ram_usage
        .usage
        .insert("1000".to_string(), 8.0 * 1024.0 * 1024.0 * 1024.0);

    let window = CheckWindow::anchored(&raw, 15).unwrap();
    assert_eq!(
        evaluate(&raw, &specs, thresholds, window),
        WindowVerdict::Evaluated(vec![])
    );
}

#[test]
fn window_anchors_to_latest_data_not_wall_clock() {
    // Lagged data: latest sample is old, but the window follows it.
    let raw = raw_with_cpu(&[(10_000, 95.0), (10_600, 20.0)]);
    let window = CheckWindow::anchored(&raw, 15).unwrap();
    assert_eq!(window.latest_data_ts, 10_600);
    assert_eq!(window.anchor_ts, 10_600 - 900);

    let specs = make_specs(2048, 50);
    let thresholds = ThresholdConfig::default().resolve(specs.id);
    // The 95% spike at ts 10_000 is inside [9_700, 10_600] and still alerts.
    match evaluate(&raw, &specs, thresholds, window) {
        WindowVerdict::Evaluated(spikes) => assert_eq!(spikes.len(), 1),
        other => panic!("expected evaluated verdict, got {other:?}"),
    }
}

#[test]
fn spike_outside_new_window_is_not_realerted() {
    // First run: spike at ts 1000 with latest data 1500, lookback 15m.
    let raw = raw_with_cpu(&[(1000, 95.0), (1500, 20.0)]);
    let specs = make_specs(2048, 50);
    let thresholds = ThresholdConfig::default().resolve(specs.id);

    let window = CheckWindow::anchored(&raw, 15).unwrap();
    match evaluate(&raw, &specs, thresholds, window) {
        WindowVerdict::Evaluated(spikes) => assert_eq!(spikes.len(), 1),
        other => panic!("expected evaluated verdict, got {other:?}"),
    }

    // Next run: fresh samples moved the anchor past the old spike.
    let raw = raw_with_cpu(&[(1000, 95.0), (2500, 20.0), (2600, 25.0)]);
    let window = CheckWindow::anchored(&raw, 15).unwrap();
    assert!(window.anchor_ts > 1000);
    assert_eq!(
        evaluate(&raw, &specs, thresholds, window),
        WindowVerdict::Evaluated(vec![])
    );
}

#[test]
fn stale_data_yields_stale_verdict() {
    // Samples exist but all predate the anchored window.
    let mut raw = raw_with_cpu(&[(1000, 95.0)]);
    raw.disk_space.usage.insert("5000".to_string(), 1.0);
    let window = CheckWindow {
        anchor_ts: 6000,
        latest_data_ts: 7000,
    };

    let specs = make_specs(2048, 50);
    let thresholds = ThresholdConfig::default().resolve(specs.id);
    assert_eq!(
        evaluate(&raw, &specs, thresholds, window),
        WindowVerdict::Stale
    );
}

#[test]
fn spike_description_is_human_readable() {
    let spike = crate::spike::Spike {
        metric: MetricKind::Cpu,
        observed_percent: 93.0,
        threshold_percent: 80.0,
    };
    assert_eq!(spike.describe(), "CPU usage spiked to 93.0% (threshold: 80%)");
}
