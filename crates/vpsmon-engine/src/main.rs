use anyhow::Result;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use vpsmon_engine::config::EngineConfig;
use vpsmon_engine::engine::HealthCheckEngine;
use vpsmon_engine::logbuf::LogBuffer;
use vpsmon_engine::scheduler::HealthCheckScheduler;
use vpsmon_notify::email::EmailDispatcher;
use vpsmon_notify::{AlertDispatcher, LogOnlyDispatcher};
use vpsmon_provider::ProviderClient;

const LOG_BUFFER_CAPACITY: usize = 512;

#[tokio::main]
async fn main() -> Result<()> {
    let log_buffer = LogBuffer::new(LOG_BUFFER_CAPACITY);
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .with(log_buffer.layer())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config_path = args
        .get(1)
        .map(|s| s.as_str())
        .unwrap_or("config/vpsmon.toml");

    let config = EngineConfig::load_or_default(config_path)?;
    let schedule = config.schedule()?;
    let tz = config.reference_tz()?;

    tracing::info!(
        interval = %config.check_interval,
        timezone = %config.timezone,
        cpu = config.thresholds.cpu,
        ram = config.thresholds.ram,
        disk = config.thresholds.disk,
        "Health checks configured"
    );

    let client = Arc::new(ProviderClient::new(
        &config.api_base_url,
        config.provider_timeout_secs,
    )?);
    let dispatcher: Arc<dyn AlertDispatcher> = if config.email.smtp_host.is_empty() {
        tracing::warn!("SMTP not configured, alerts will only be logged");
        Arc::new(LogOnlyDispatcher)
    } else {
        Arc::new(EmailDispatcher::new(&config.email)?)
    };

    let engine = Arc::new(HealthCheckEngine::new(
        client,
        dispatcher,
        config,
        schedule.clone(),
        tz,
    ));

    engine.initialize().await;
    engine.run_check().await;

    let scheduler = HealthCheckScheduler::new(engine.clone(), schedule, tz);
    tokio::select! {
        _ = scheduler.run() => {}
        _ = signal::ctrl_c() => {
            tracing::info!("Shutting down");
        }
    }

    Ok(())
}
