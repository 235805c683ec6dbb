//! Accrual reconciliation worker.
//!
//! Loads settings, applies pending migrations, then runs the reconciliation
//! engine alongside the health probe server until Ctrl-C.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), forbid(clippy::expect_used))]

use std::sync::Arc;

use actix_web::web;
use color_eyre::eyre::{Context, Result, eyre};
use ortho_config::OrthoConfig;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[cfg(not(feature = "metrics"))]
use gophermart::domain::ports::NoOpReconciliationMetrics;
use gophermart::domain::ports::ReconciliationMetrics;
use gophermart::domain::{ReconciliationEngine, ReconciliationPorts};
use gophermart::inbound::http::{HealthState, ProbeServerConfig, probe_server};
use gophermart::outbound::accrual::AccrualHttpClient;
#[cfg(feature = "metrics")]
use gophermart::outbound::metrics::PrometheusReconciliationMetrics;
use gophermart::outbound::persistence::{
    DbPool, DieselOrderLedgerRepository, run_pending_migrations,
};
use gophermart::settings::ReconcilerSettings;

#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(error) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(%error, "tracing init failed");
    }

    let settings = ReconcilerSettings::load_from_iter(std::env::args_os())
        .map_err(|error| eyre!("failed to load settings: {error}"))?;
    let pool_config = settings.pool_config()?;

    let database_url = pool_config.database_url().to_owned();
    let applied = tokio::task::spawn_blocking(move || run_pending_migrations(&database_url))
        .await
        .wrap_err("migration task panicked")??;
    info!(applied, "database migrations applied");

    let pool = DbPool::new(pool_config)
        .await
        .wrap_err("failed to build database pool")?;
    pool.ping().await.wrap_err("database is unreachable")?;
    let source = AccrualHttpClient::new(settings.accrual_base_url()?, settings.request_timeout())?;

    let probe_config = ProbeServerConfig::new(settings.health_bind_addr()?);
    #[cfg(feature = "metrics")]
    let (metrics, probe_config) = {
        let registry = prometheus::Registry::new();
        let metrics: Arc<dyn ReconciliationMetrics> = Arc::new(
            PrometheusReconciliationMetrics::new(&registry)
                .wrap_err("failed to register reconciliation metrics")?,
        );
        (metrics, probe_config.with_registry(registry))
    };
    #[cfg(not(feature = "metrics"))]
    let metrics: Arc<dyn ReconciliationMetrics> = Arc::new(NoOpReconciliationMetrics);

    let ports = ReconciliationPorts::new(
        Arc::new(source),
        Arc::new(DieselOrderLedgerRepository::new(pool)),
        metrics,
    );
    let engine = ReconciliationEngine::new(ports, settings.reconciliation_config())?;

    let health_state = web::Data::new(HealthState::new());
    let bind_addr = probe_config.bind_addr;
    let server = probe_server(health_state.clone(), probe_config)
        .wrap_err_with(|| format!("failed to bind health probes on {bind_addr}"))?;
    let server_handle = server.handle();
    let server_task = actix_web::rt::spawn(server);
    info!(%bind_addr, "health probes listening");

    let shutdown = CancellationToken::new();
    let mut engine_task = tokio::spawn(engine.run(shutdown.clone()));
    health_state.mark_ready();

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.wrap_err("failed to listen for shutdown signal")?;
            info!("shutdown requested");
        }
        finished = &mut engine_task => {
            health_state.mark_unhealthy();
            server_handle.stop(true).await;
            finished.wrap_err("reconciliation engine panicked")?;
            return Err(eyre!("reconciliation engine stopped unexpectedly"));
        }
    }

    health_state.mark_unhealthy();
    shutdown.cancel();
    engine_task
        .await
        .wrap_err("reconciliation engine panicked")?;
    server_handle.stop(true).await;
    server_task
        .await
        .wrap_err("health probe server panicked")?
        .wrap_err("health probe server failed")?;
    Ok(())
}
