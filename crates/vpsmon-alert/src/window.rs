use vpsmon_common::types::RawMetrics;

/// Evaluation window anchored to the freshest data point rather than wall
/// clock, so provider reporting lag can neither hide a legitimate spike nor
/// roll the window past one that was never evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckWindow {
    /// Start of the window, unix seconds.
    pub anchor_ts: i64,
    /// Latest timestamp actually present in the cpu/ram/disk series.
    pub latest_data_ts: i64,
}

impl CheckWindow {
    /// Anchors a window of `lookback_minutes` to the latest sample in `raw`.
    /// Returns `None` when the cpu/ram/disk series carry no samples at all.
    pub fn anchored(raw: &RawMetrics, lookback_minutes: u32) -> Option<Self> {
        let latest = raw.latest_check_timestamp()?;
        Some(Self {
            anchor_ts: latest - i64::from(lookback_minutes) * 60,
            latest_data_ts: latest,
        })
    }
}
