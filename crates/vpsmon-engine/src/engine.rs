use crate::config::EngineConfig;
use anyhow::Result;
use chrono::{DateTime, Duration, FixedOffset, SecondsFormat, Timelike, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use vpsmon_alert::schedule::CheckSchedule;
use vpsmon_alert::spike::{evaluate, Spike, WindowVerdict};
use vpsmon_alert::window::CheckWindow;
use vpsmon_common::types::{Account, AlertContext, NormalizedPoint, VmSpecs};
use vpsmon_notify::AlertDispatcher;
use vpsmon_provider::accounts::parse_accounts;
use vpsmon_provider::discovery::discover;
use vpsmon_provider::error::SpecFetchError;
use vpsmon_provider::metrics::fetch_metrics;
use vpsmon_provider::normalize::transform;
use vpsmon_provider::{OwnershipIndex, SpecCache, VpsApi};

/// Orchestrates one health-check run: discovery, per-VM fetch and spike
/// evaluation, alert dispatch, and the advisory next-run computation.
///
/// Also the dashboard's entry point for VM overviews and normalized metric
/// series; both paths share the same ownership index and spec cache.
pub struct HealthCheckEngine {
    api: Arc<dyn VpsApi>,
    ownership: Arc<OwnershipIndex>,
    specs: Arc<SpecCache>,
    dispatcher: Arc<dyn AlertDispatcher>,
    config: EngineConfig,
    schedule: CheckSchedule,
    tz: FixedOffset,
    running: AtomicBool,
}

impl HealthCheckEngine {
    pub fn new(
        api: Arc<dyn VpsApi>,
        dispatcher: Arc<dyn AlertDispatcher>,
        config: EngineConfig,
        schedule: CheckSchedule,
        tz: FixedOffset,
    ) -> Self {
        Self {
            api,
            ownership: Arc::new(OwnershipIndex::new()),
            specs: Arc::new(SpecCache::new()),
            dispatcher,
            config,
            schedule,
            tz,
            running: AtomicBool::new(false),
        }
    }

    /// Accounts are re-parsed from the live token string on every cycle so
    /// credential rotation takes effect without a restart.
    fn current_accounts(&self) -> Vec<Account> {
        parse_accounts(&self.config.account_tokens())
    }

    /// Startup warm-up: discover the fleet and prime the spec cache. Spec
    /// failures are logged and left for later lazy fetches.
    pub async fn initialize(&self) {
        tracing::info!("Initializing VM specifications");
        let accounts = self.current_accounts();
        let vm_ids = discover(self.api.as_ref(), &self.ownership, &accounts).await;

        if vm_ids.is_empty() {
            tracing::info!("No VMs discovered from provider");
            return;
        }
        tracing::info!(count = vm_ids.len(), ids = ?vm_ids, "Discovered VMs to monitor");

        for vm_id in vm_ids {
            if let Err(error) = self
                .specs
                .get_specs(self.api.as_ref(), &self.ownership, vm_id)
                .await
            {
                tracing::warn!(vm_id, error = %error, "Failed to initialize specs");
            }
        }
    }

    /// One health-check pass. A tick arriving while the previous run is
    /// still executing is skipped, not queued.
    pub async fn run_check(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::warn!("Previous health check still running, skipping this tick");
            return;
        }

        self.check_all_vms().await;
        self.log_next_run();

        self.running.store(false, Ordering::SeqCst);
    }

    async fn check_all_vms(&self) {
        tracing::info!("Running health check");

        let accounts = self.current_accounts();
        if accounts.is_empty() {
            tracing::warn!("No provider accounts configured");
            return;
        }

        // Fresh inventory every run: a VM created since startup must be
        // picked up without a restart.
        let vm_ids = discover(self.api.as_ref(), &self.ownership, &accounts).await;
        if vm_ids.is_empty() {
            tracing::info!("No VMs to check");
            return;
        }

        let lookback_minutes = self.schedule.lookback_minutes();
        let now = Utc::now();
        let date_from = (now - Duration::minutes(self.config.fetch_window_minutes))
            .to_rfc3339_opts(SecondsFormat::Secs, true);
        let date_to = now.to_rfc3339_opts(SecondsFormat::Secs, true);

        for vm_id in vm_ids {
            if let Err(error) = self
                .check_vm(vm_id, &date_from, &date_to, lookback_minutes)
                .await
            {
                tracing::warn!(vm_id, error = %error, "Health check failed for VM");
            }
        }
    }

    async fn check_vm(
        &self,
        vm_id: u64,
        date_from: &str,
        date_to: &str,
        lookback_minutes: u32,
    ) -> Result<()> {
        let thresholds = self.config.thresholds.resolve(vm_id);
        let specs = self
            .specs
            .get_specs(self.api.as_ref(), &self.ownership, vm_id)
            .await?;
        let raw = fetch_metrics(self.api.as_ref(), &self.ownership, vm_id, date_from, date_to)
            .await?;

        let Some(window) = CheckWindow::anchored(&raw, lookback_minutes) else {
            tracing::info!(vm_id, "No data returned from provider");
            return Ok(());
        };

        tracing::info!(
            vm_id,
            window_from = %self.format_ts(window.anchor_ts),
            window_to = %self.format_ts(window.latest_data_ts),
            latest_data_ts = window.latest_data_ts,
            "Checking data window"
        );

        match evaluate(&raw, &specs, thresholds, window) {
            WindowVerdict::Stale => {
                tracing::info!(
                    vm_id,
                    lookback_minutes,
                    fetch_window_minutes = self.config.fetch_window_minutes,
                    "No data points inside the lookback window"
                );
            }
            WindowVerdict::Evaluated(spikes) if spikes.is_empty() => {
                tracing::info!(vm_id, "Peak usage within normal range");
            }
            WindowVerdict::Evaluated(spikes) => {
                self.dispatch_alert(vm_id, &specs, &spikes, window).await;
            }
        }

        Ok(())
    }

    /// Exactly one email per VM per run, combining every exceeded metric.
    async fn dispatch_alert(
        &self,
        vm_id: u64,
        specs: &VmSpecs,
        spikes: &[Spike],
        window: CheckWindow,
    ) {
        let label = specs.label();
        let latest = self.format_ts(window.latest_data_ts);
        let lines: Vec<String> = spikes.iter().map(Spike::describe).collect();

        let body = format!(
            "VPS {label} alert (latest data: {latest}):\n{}",
            lines.join("\n")
        );
        tracing::warn!(vm_id, alert = %body, "Resource spike detected");

        let context = AlertContext {
            vps_name: specs.hostname.clone(),
            plan: specs.plan.clone(),
            alert_items_html: lines
                .iter()
                .map(|line| format!("<li>{line}</li>"))
                .collect::<String>(),
            latest_data_time: latest,
        };
        let subject = format!("vpsmon alert - {label}");

        if let Err(error) = self.dispatcher.send(&subject, &body, &context).await {
            tracing::error!(vm_id, error = %error, "Alert dispatch failed");
        }
    }

    fn format_ts(&self, ts: i64) -> String {
        match DateTime::<Utc>::from_timestamp(ts, 0) {
            Some(date) => date
                .with_timezone(&self.tz)
                .format("%d/%m/%Y, %H:%M %:z")
                .to_string(),
            None => ts.to_string(),
        }
    }

    /// Advisory: the minute tick drives scheduling independently, but
    /// operators read this log line to verify the configured cadence.
    fn log_next_run(&self) {
        let now = Utc::now().with_timezone(&self.tz);
        let ahead = self.schedule.minutes_until_next(now.minute());
        let next = now + Duration::minutes(i64::from(ahead));
        let next = next
            .with_second(0)
            .and_then(|d| d.with_nanosecond(0))
            .unwrap_or(next);

        tracing::info!(
            interval = %self.config.check_interval,
            next_check = %next.format("%d/%m/%Y, %H:%M"),
            "Next check scheduled"
        );
    }

    // Dashboard-facing data contract.

    /// VM list with specs; per-VM fetch failures yield stub entries.
    pub async fn vm_overview(&self) -> Vec<Arc<VmSpecs>> {
        let accounts = self.current_accounts();
        self.specs
            .get_all_specs(self.api.as_ref(), &self.ownership, &accounts)
            .await
    }

    /// Raw specs for one VM. Unlike the aggregate overview, a fetch failure
    /// here is surfaced to the caller.
    pub async fn vm_specs(&self, vm_id: u64) -> std::result::Result<Arc<VmSpecs>, SpecFetchError> {
        self.specs
            .get_specs(self.api.as_ref(), &self.ownership, vm_id)
            .await
    }

    /// Normalized metric points over the trailing `range_minutes`.
    pub async fn vm_metric_points(
        &self,
        vm_id: u64,
        range_minutes: i64,
    ) -> Result<Vec<NormalizedPoint>> {
        let now = Utc::now();
        let date_from =
            (now - Duration::minutes(range_minutes)).to_rfc3339_opts(SecondsFormat::Secs, true);
        let date_to = now.to_rfc3339_opts(SecondsFormat::Secs, true);

        let specs = self.vm_specs(vm_id).await?;
        let raw = fetch_metrics(
            self.api.as_ref(),
            &self.ownership,
            vm_id,
            &date_from,
            &date_to,
        )
        .await?;

        Ok(transform(&raw, Some(&specs), self.tz))
    }
}
