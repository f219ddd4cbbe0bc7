use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A provider API credential scope. Every VM is owned by exactly one account
/// at a time; ownership is re-established on each discovery cycle.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub name: String,
    pub token: String,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("name", &self.name)
            .field("token", &"***")
            .finish()
    }
}

/// Static specification of a virtual machine as reported by the provider.
///
/// Cached for the process lifetime on first fetch and never refreshed: a
/// capacity change on the provider side is not visible until restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmSpecs {
    pub id: u64,
    pub account_name: String,
    pub ram_mb: u64,
    pub disk_gb: u64,
    pub cpu_cores: u32,
    pub hostname: String,
    pub state: String,
    pub plan: String,
    pub bandwidth: u64,
}

impl VmSpecs {
    /// Minimal placeholder used when an aggregate listing cannot fetch the
    /// real record for one VM.
    pub fn stub(id: u64) -> Self {
        Self {
            id,
            account_name: "Default".to_string(),
            ram_mb: 0,
            disk_gb: 0,
            cpu_cores: 0,
            hostname: format!("VPS {id}"),
            state: "Unknown".to_string(),
            plan: "Unknown".to_string(),
            bandwidth: 0,
        }
    }

    /// Display label used in alert subjects and bodies, e.g. `web-01 (KVM 2)`.
    pub fn label(&self) -> String {
        format!("{} ({})", self.hostname, self.plan)
    }
}

/// A sparse metric series keyed by unix-timestamp string, exactly as the
/// provider reports it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricSeries {
    #[serde(default)]
    pub usage: HashMap<String, f64>,
}

impl MetricSeries {
    /// Parsed timestamps of every sample. Keys that are not unix-second
    /// strings are ignored.
    pub fn timestamps(&self) -> impl Iterator<Item = i64> + '_ {
        self.usage.keys().filter_map(|ts| ts.parse::<i64>().ok())
    }

    /// Maximum sample at or after `min_ts`, or `None` when nothing in the
    /// series falls inside the range.
    pub fn max_since(&self, min_ts: i64) -> Option<f64> {
        self.usage
            .iter()
            .filter_map(|(ts, val)| ts.parse::<i64>().ok().map(|t| (t, *val)))
            .filter(|(t, _)| *t >= min_ts)
            .map(|(_, val)| val)
            .fold(None, |max: Option<f64>, val| {
                Some(max.map_or(val, |m| m.max(val)))
            })
    }

    pub fn is_empty(&self) -> bool {
        self.usage.is_empty()
    }
}

/// Raw multi-metric payload from `GET /virtual-machines/{id}/metrics`.
///
/// The five series are independent: timestamps need not align, and any of
/// them may be missing entirely from the response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMetrics {
    #[serde(default)]
    pub cpu_usage: MetricSeries,
    #[serde(default)]
    pub ram_usage: MetricSeries,
    #[serde(default)]
    pub disk_space: MetricSeries,
    #[serde(default)]
    pub incoming_traffic: MetricSeries,
    #[serde(default)]
    pub outgoing_traffic: MetricSeries,
}

impl RawMetrics {
    /// Latest timestamp across the cpu/ram/disk series. Traffic series do
    /// not participate in check-window anchoring.
    pub fn latest_check_timestamp(&self) -> Option<i64> {
        self.cpu_usage
            .timestamps()
            .chain(self.ram_usage.timestamps())
            .chain(self.disk_space.timestamps())
            .max()
    }
}

/// One chart-ready sample produced by the metrics normalizer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedPoint {
    /// `HH:MM` (24-hour) in the configured reference timezone.
    pub time: String,
    /// Full ISO-8601 timestamp in UTC.
    pub full_date: String,
    pub cpu: f64,
    /// Percent of the VM's RAM capacity.
    pub ram: f64,
    /// Percent of the VM's disk capacity.
    pub disk: f64,
    #[serde(rename = "ramGB")]
    pub ram_gb: f64,
    #[serde(rename = "diskGB")]
    pub disk_gb: f64,
    /// Outgoing traffic in MB.
    pub net: f64,
}

/// Template context handed to the alert dispatcher alongside the plain-text
/// body. The body is human-readable on its own; the context feeds optional
/// HTML template rendering downstream.
#[derive(Debug, Clone, Serialize)]
pub struct AlertContext {
    pub vps_name: String,
    pub plan: String,
    pub alert_items_html: String,
    pub latest_data_time: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_since_filters_older_samples() {
        let mut usage = HashMap::new();
        usage.insert("100".to_string(), 90.0);
        usage.insert("200".to_string(), 40.0);
        usage.insert("300".to_string(), 55.0);
        let series = MetricSeries { usage };

        assert_eq!(series.max_since(0), Some(90.0));
        assert_eq!(series.max_since(150), Some(55.0));
        assert_eq!(series.max_since(301), None);
    }

    #[test]
    fn latest_check_timestamp_ignores_traffic_series() {
        let mut raw = RawMetrics::default();
        raw.cpu_usage.usage.insert("100".to_string(), 10.0);
        raw.ram_usage.usage.insert("250".to_string(), 10.0);
        raw.outgoing_traffic.usage.insert("900".to_string(), 10.0);

        assert_eq!(raw.latest_check_timestamp(), Some(250));
    }

    #[test]
    fn latest_check_timestamp_none_without_samples() {
        let mut raw = RawMetrics::default();
        raw.incoming_traffic.usage.insert("100".to_string(), 1.0);

        assert_eq!(raw.latest_check_timestamp(), None);
    }

    #[test]
    fn normalized_point_serializes_dashboard_keys() {
        let point = NormalizedPoint {
            time: "12:45".to_string(),
            full_date: "2025-12-16T07:15:00+00:00".to_string(),
            cpu: 12.0,
            ram: 40.1,
            disk: 61.9,
            ram_gb: 1.61,
            disk_gb: 30.95,
            net: 12.44,
        };
        let json = serde_json::to_value(&point).unwrap();
        assert!(json.get("fullDate").is_some());
        assert!(json.get("ramGB").is_some());
        assert!(json.get("diskGB").is_some());
    }

    #[test]
    fn account_debug_redacts_token() {
        let account = Account {
            name: "Prod".to_string(),
            token: "secret-token".to_string(),
        };
        let rendered = format!("{account:?}");
        assert!(!rendered.contains("secret-token"));
    }
}
