use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Global threshold percentages with optional per-VM overrides.
///
/// Overrides are an explicit map keyed by VM id and resolved through
/// [`ThresholdConfig::resolve`], the single lookup point for effective
/// thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    #[serde(default = "default_cpu_threshold")]
    pub cpu: f64,
    #[serde(default = "default_ram_threshold")]
    pub ram: f64,
    #[serde(default = "default_disk_threshold")]
    pub disk: f64,
    #[serde(default)]
    pub overrides: HashMap<String, ThresholdOverride>,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            cpu: default_cpu_threshold(),
            ram: default_ram_threshold(),
            disk: default_disk_threshold(),
            overrides: HashMap::new(),
        }
    }
}

fn default_cpu_threshold() -> f64 {
    80.0
}

fn default_ram_threshold() -> f64 {
    80.0
}

fn default_disk_threshold() -> f64 {
    85.0
}

/// Per-VM threshold override. Unset metrics fall back to the global default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThresholdOverride {
    #[serde(default)]
    pub cpu: Option<f64>,
    #[serde(default)]
    pub ram: Option<f64>,
    #[serde(default)]
    pub disk: Option<f64>,
}

/// Effective thresholds for one VM, after override resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub cpu: f64,
    pub ram: f64,
    pub disk: f64,
}

impl ThresholdConfig {
    /// Per-VM override first, then the global default, independently for
    /// each metric.
    pub fn resolve(&self, vm_id: u64) -> Thresholds {
        let over = self.overrides.get(&vm_id.to_string());
        Thresholds {
            cpu: over.and_then(|o| o.cpu).unwrap_or(self.cpu),
            ram: over.and_then(|o| o.ram).unwrap_or(self.ram),
            disk: over.and_then(|o| o.disk).unwrap_or(self.disk),
        }
    }
}
