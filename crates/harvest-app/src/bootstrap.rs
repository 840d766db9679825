use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use harvest_config::{AppConfig, ChannelFilter, LogStyle};
use harvest_data::PgRequestStore;
use harvest_discord::{DiscordClient, DiscordConfig};
use harvest_fetch_core::RequestId;
use harvest_telemetry::{GlobalContextGuard, LogFormat, LoggingConfig, Metrics};
use harvest_transmission::{TransmissionClient, TransmissionConfig};
use sqlx::postgres::PgPoolOptions;
use tracing::{debug, info, warn};

use crate::cli::{Cli, CliCommand};
use crate::engine::FetchEngine;
use crate::error::{AppError, AppResult};
use crate::poller::PollLoop;

const DB_MAX_CONNECTIONS: u32 = 5;

/// Services assembled from configuration.
pub(crate) struct BootstrapDependencies {
    engine: Arc<FetchEngine>,
    poll_interval: Duration,
}

impl BootstrapDependencies {
    /// Connect the database and build the daemon and chat clients.
    pub(crate) async fn from_config(config: &AppConfig) -> AppResult<Self> {
        let metrics =
            Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;

        let pool = PgPoolOptions::new()
            .max_connections(DB_MAX_CONNECTIONS)
            .connect(&config.database_url)
            .await
            .map_err(|err| AppError::database("pool.connect", err))?;
        let store = PgRequestStore::new(pool)
            .await
            .map_err(|err| AppError::data("request_store.new", err))?;

        let endpoint = config
            .transmission
            .endpoint()
            .map_err(|err| AppError::config("transmission.endpoint", err))?;
        let daemon = TransmissionClient::new(TransmissionConfig {
            endpoint,
            username: config.transmission.username.clone(),
            password: config.transmission.password.clone(),
            download_dir: config.download_dir.path.clone(),
        })
        .map_err(|err| AppError::transmission("transmission_client.new", err))?;

        let sink = DiscordClient::new(DiscordConfig {
            api_base: config.discord.api_base.clone(),
            token: config.discord.token.clone(),
        })
        .map_err(|err| AppError::discord("discord_client.new", err))?;

        Ok(Self {
            engine: Arc::new(FetchEngine::new(
                Arc::new(store),
                Arc::new(daemon),
                Arc::new(sink),
                metrics,
            )),
            poll_interval: config.poll_interval,
        })
    }
}

/// Entry point for the `harvest` binary.
///
/// # Errors
///
/// Returns an error if configuration, logging, the database, or client construction
/// fails, or if the selected command fails.
pub async fn run_app(cli: Cli) -> AppResult<()> {
    let config =
        AppConfig::from_env().map_err(|err| AppError::config("config.from_env", err))?;
    let command = cli.command();

    let logging = LoggingConfig {
        level: &config.log_level,
        format: config.log_style.as_ref().map_or_else(LogFormat::infer, |style| match style {
            LogStyle::Json => LogFormat::Json,
            LogStyle::Pretty => LogFormat::Pretty,
        }),
        ..LoggingConfig::default()
    };
    harvest_telemetry::init_logging(&logging)
        .map_err(|err| AppError::telemetry("telemetry.init_logging", err))?;
    let _context = GlobalContextGuard::new(command.mode());
    log_startup(&config);

    let deps = BootstrapDependencies::from_config(&config).await?;
    match command {
        CliCommand::Run => run_until(deps.engine, deps.poll_interval, shutdown_signal()).await,
        CliCommand::Drive { request_id } => drive_once(&deps.engine, request_id).await,
    }
}

/// Run the poll loop until `shutdown` resolves, then wait for the current pass.
///
/// The result of `shutdown` is returned after the loop has stopped.
///
/// # Errors
///
/// Returns the error produced by `shutdown`, or [`AppError::Task`] if the loop panicked.
pub async fn run_until<F>(
    engine: Arc<FetchEngine>,
    poll_interval: Duration,
    shutdown: F,
) -> AppResult<()>
where
    F: Future<Output = AppResult<()>>,
{
    let (stop, handle) = PollLoop::new(Arc::clone(&engine), poll_interval).spawn();
    let signalled = shutdown.await;
    info!("shutdown requested; waiting for the current poll pass");
    if stop.send(true).is_err() {
        debug!("poll loop already stopped");
    }
    handle.await.map_err(|source| AppError::Task {
        task: "poll_loop",
        source,
    })?;
    log_metrics(engine.metrics());
    signalled
}

async fn drive_once(engine: &FetchEngine, request_id: RequestId) -> AppResult<()> {
    let outcome = engine
        .drive_one(request_id)
        .await
        .map_err(|err| AppError::fetch("engine.drive_one", err))?;
    info!(request_id = %request_id, ?outcome, "request driven");
    log_metrics(engine.metrics());
    Ok(())
}

fn log_startup(config: &AppConfig) {
    if config.discord.channel == ChannelFilter::Any {
        warn!("channel filter disabled; commands are accepted in every channel");
    }
    info!(
        environment = %config.environment,
        poll_interval = ?config.poll_interval,
        download_dir = %config.download_dir.path,
        download_dir_max_bytes = config.download_dir.max_bytes,
        "configuration loaded"
    );
}

fn log_metrics(metrics: &Metrics) {
    let snapshot = metrics.snapshot();
    info!(
        requests_in_progress = snapshot.requests_in_progress,
        completions = snapshot.completions_total,
        lookup_misses = snapshot.lookup_misses_total,
        "metrics summary"
    );
    match metrics.render() {
        Ok(rendered) => debug!(metrics = %rendered, "metrics exposition"),
        Err(err) => warn!(error = %err, "rendering metrics failed"),
    }
}

async fn shutdown_signal() -> AppResult<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate =
            signal(SignalKind::terminate()).map_err(|source| AppError::Signal { source })?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result.map_err(|source| AppError::Signal { source }),
            _ = terminate.recv() => Ok(()),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .map_err(|source| AppError::Signal { source })
    }
}
