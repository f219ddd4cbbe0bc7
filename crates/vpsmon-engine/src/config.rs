use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use vpsmon_alert::schedule::CheckSchedule;
use vpsmon_alert::thresholds::ThresholdConfig;
use vpsmon_notify::email::EmailSettings;
use vpsmon_provider::client::DEFAULT_API_BASE_URL;

/// Environment variable overriding the `accounts` config value. Read fresh
/// on every discovery cycle so rotated credentials apply without a restart.
pub const ACCOUNTS_ENV: &str = "VPSMON_ACCOUNTS";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Multi-account token string: `[Name=Token],[Name2=Token2]`, or a
    /// single bare token for the implicit `Default` account.
    #[serde(default)]
    pub accounts: String,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Per-request timeout for provider calls.
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,

    /// Single interval in minutes (`"15"`) or minute-of-hour marks
    /// (`"15,45"`).
    #[serde(default = "default_check_interval")]
    pub check_interval: String,

    /// How far back each run fetches metrics. Wider than the lookback so
    /// provider reporting lag still leaves data to anchor on.
    #[serde(default = "default_fetch_window_minutes")]
    pub fetch_window_minutes: i64,

    /// Fixed UTC offset for display times and schedule computation, e.g.
    /// `"+05:30"`.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default)]
    pub thresholds: ThresholdConfig,

    #[serde(default)]
    pub email: EmailSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            accounts: String::new(),
            api_base_url: default_api_base_url(),
            provider_timeout_secs: default_provider_timeout_secs(),
            check_interval: default_check_interval(),
            fetch_window_minutes: default_fetch_window_minutes(),
            timezone: default_timezone(),
            thresholds: ThresholdConfig::default(),
            email: EmailSettings::default(),
        }
    }
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_provider_timeout_secs() -> u64 {
    30
}

fn default_check_interval() -> String {
    "15".to_string()
}

fn default_fetch_window_minutes() -> i64 {
    180
}

fn default_timezone() -> String {
    "+05:30".to_string()
}

impl EngineConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Loads the config file, or falls back to defaults (environment-driven
    /// operation) when the file does not exist.
    pub fn load_or_default(path: &str) -> anyhow::Result<Self> {
        if std::path::Path::new(path).exists() {
            Self::load(path)
        } else {
            tracing::warn!(path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Current account token string: the environment override when set,
    /// otherwise the config value.
    pub fn account_tokens(&self) -> String {
        std::env::var(ACCOUNTS_ENV).unwrap_or_else(|_| self.accounts.clone())
    }

    pub fn reference_tz(&self) -> anyhow::Result<FixedOffset> {
        self.timezone
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid timezone offset '{}': {}", self.timezone, e))
    }

    pub fn schedule(&self) -> anyhow::Result<CheckSchedule> {
        Ok(self.check_interval.parse()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_gets_defaults() {
        let config: EngineConfig = toml::from_str("accounts = \"tok\"").unwrap();
        assert_eq!(config.accounts, "tok");
        assert_eq!(config.check_interval, "15");
        assert_eq!(config.fetch_window_minutes, 180);
        assert_eq!(config.provider_timeout_secs, 30);
        assert_eq!(config.thresholds.cpu, 80.0);
        assert_eq!(config.thresholds.disk, 85.0);
        assert_eq!(config.reference_tz().unwrap().local_minus_utc(), 19800);
    }

    #[test]
    fn full_config_round_trips() {
        let config: EngineConfig = toml::from_str(
            r#"
            accounts = "[A=tok1],[B=tok2]"
            check_interval = "15,45"
            timezone = "+00:00"

            [thresholds]
            cpu = 90.0

            [thresholds.overrides.1030000]
            cpu = 95.0

            [email]
            smtp_host = "smtp.example.com"
            from = "vpsmon <noreply@example.com>"
            recipients = ["ops@example.com"]
            "#,
        )
        .unwrap();

        assert_eq!(
            config.schedule().unwrap(),
            vpsmon_alert::schedule::CheckSchedule::Marks(vec![15, 45])
        );
        assert_eq!(config.thresholds.resolve(1030000).cpu, 95.0);
        assert_eq!(config.thresholds.resolve(1030000).ram, 80.0);
        assert_eq!(config.email.recipients.len(), 1);
    }
}
