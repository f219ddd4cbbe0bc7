use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use std::collections::HashSet;
use vpsmon_common::types::{MetricSeries, NormalizedPoint, RawMetrics, VmSpecs};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Merges the five sparse series into chart-ready points on a shared
/// timestamp axis.
///
/// Every distinct timestamp seen in any series produces exactly one point;
/// metrics missing at that timestamp default to 0. Output is sorted by
/// numeric timestamp value (a string sort would misorder mixed digit
/// lengths). RAM and disk percentages come from the VM's capacity in
/// `specs`; with no specs, or zero capacity, the percentage is 0 rather
/// than NaN or infinity.
pub fn transform(
    raw: &RawMetrics,
    specs: Option<&VmSpecs>,
    tz: FixedOffset,
) -> Vec<NormalizedPoint> {
    let mut keys: HashSet<&String> = HashSet::new();
    for series in [
        &raw.cpu_usage,
        &raw.ram_usage,
        &raw.disk_space,
        &raw.incoming_traffic,
        &raw.outgoing_traffic,
    ] {
        keys.extend(series.usage.keys());
    }

    let mut keys: Vec<&String> = keys.into_iter().collect();
    keys.sort_by_key(|key| key.parse::<i64>().unwrap_or(i64::MAX));

    let ram_total_bytes = specs.map_or(0.0, |s| s.ram_mb as f64 * BYTES_PER_MB);
    let disk_total_bytes = specs.map_or(0.0, |s| s.disk_gb as f64 * BYTES_PER_GB);

    keys.into_iter()
        .filter_map(|key| {
            let ts = key.parse::<i64>().ok()?;
            let date = DateTime::<Utc>::from_timestamp(ts, 0)?;

            let ram_bytes = sample(&raw.ram_usage, key);
            let disk_bytes = sample(&raw.disk_space, key);
            let net_out_bytes = sample(&raw.outgoing_traffic, key);

            let ram_percent = percent_of(ram_bytes, ram_total_bytes);
            let disk_percent = percent_of(disk_bytes, disk_total_bytes);

            Some(NormalizedPoint {
                time: date.with_timezone(&tz).format("%H:%M").to_string(),
                full_date: date.to_rfc3339_opts(SecondsFormat::Millis, true),
                cpu: sample(&raw.cpu_usage, key),
                ram: round_to(ram_percent, 1),
                disk: round_to(disk_percent, 1),
                ram_gb: round_to(ram_bytes / BYTES_PER_GB, 2),
                disk_gb: round_to(disk_bytes / BYTES_PER_GB, 2),
                net: round_to(net_out_bytes / BYTES_PER_MB, 2),
            })
        })
        .collect()
}

fn sample(series: &MetricSeries, key: &str) -> f64 {
    series.usage.get(key).copied().unwrap_or(0.0)
}

fn percent_of(bytes: f64, total_bytes: f64) -> f64 {
    if total_bytes > 0.0 {
        bytes / total_bytes * 100.0
    } else {
        0.0
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
