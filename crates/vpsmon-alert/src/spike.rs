use crate::thresholds::Thresholds;
use crate::window::CheckWindow;
use vpsmon_common::types::{RawMetrics, VmSpecs};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Cpu,
    Ram,
    Disk,
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricKind::Cpu => write!(f, "CPU"),
            MetricKind::Ram => write!(f, "RAM"),
            MetricKind::Disk => write!(f, "Disk"),
        }
    }
}

/// One metric that exceeded its threshold within the anchored window.
#[derive(Debug, Clone, PartialEq)]
pub struct Spike {
    pub metric: MetricKind,
    pub observed_percent: f64,
    pub threshold_percent: f64,
}

impl Spike {
    /// Human-readable alert line, e.g.
    /// `CPU usage spiked to 93.0% (threshold: 80%)`.
    pub fn describe(&self) -> String {
        format!(
            "{} usage spiked to {:.1}% (threshold: {}%)",
            self.metric, self.observed_percent, self.threshold_percent
        )
    }
}

/// Outcome of evaluating one VM's raw metrics against a check window.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowVerdict {
    /// Data exists but nothing falls inside the anchored window; the run
    /// skips the VM rather than alerting on old samples.
    Stale,
    /// Samples were evaluated. The spike list may be empty.
    Evaluated(Vec<Spike>),
}

/// Compares per-metric maxima within the window against resolved thresholds.
///
/// CPU maxima are percentages and compare directly; RAM and disk maxima are
/// bytes and are converted to percent of the VM's capacity first. A metric
/// whose capacity is unknown (zero in the specs) is skipped, not failed.
/// Comparison is strict greater-than: a sample exactly at the threshold does
/// not alert.
pub fn evaluate(
    raw: &RawMetrics,
    specs: &VmSpecs,
    thresholds: Thresholds,
    window: CheckWindow,
) -> WindowVerdict {
    let max_cpu = raw.cpu_usage.max_since(window.anchor_ts);
    let max_ram = raw.ram_usage.max_since(window.anchor_ts);
    let max_disk = raw.disk_space.max_since(window.anchor_ts);

    if max_cpu.is_none() && max_ram.is_none() && max_disk.is_none() {
        return WindowVerdict::Stale;
    }

    let mut spikes = Vec::new();

    if let Some(cpu) = max_cpu {
        if cpu > thresholds.cpu {
            spikes.push(Spike {
                metric: MetricKind::Cpu,
                observed_percent: cpu,
                threshold_percent: thresholds.cpu,
            });
        }
    }

    if let Some(ram_bytes) = max_ram {
        if specs.ram_mb > 0 {
            let ram_percent = ram_bytes / (specs.ram_mb as f64 * BYTES_PER_MB) * 100.0;
            if ram_percent > thresholds.ram {
                spikes.push(Spike {
                    metric: MetricKind::Ram,
                    observed_percent: ram_percent,
                    threshold_percent: thresholds.ram,
                });
            }
        }
    }

    if let Some(disk_bytes) = max_disk {
        if specs.disk_gb > 0 {
            let disk_percent = disk_bytes / (specs.disk_gb as f64 * BYTES_PER_GB) * 100.0;
            if disk_percent > thresholds.disk {
                spikes.push(Spike {
                    metric: MetricKind::Disk,
                    observed_percent: disk_percent,
                    threshold_percent: thresholds.disk,
                });
            }
        }
    }

    WindowVerdict::Evaluated(spikes)
}
