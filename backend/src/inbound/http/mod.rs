//! Operational HTTP surface for the reconciliation worker.

pub mod health;
#[cfg(feature = "metrics")]
pub mod metrics;

use actix_web::dev::Server;
use actix_web::{App, HttpServer, web};
use std::net::SocketAddr;

pub use health::{HealthState, live, ready};

/// Probe server settings.
#[derive(Clone)]
pub struct ProbeServerConfig {
    /// Listen address.
    pub bind_addr: SocketAddr,
    /// Registry served on `/metrics` when present.
    #[cfg(feature = "metrics")]
    pub registry: Option<prometheus::Registry>,
}

impl ProbeServerConfig {
    /// Serve only the health probes on `bind_addr`.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            #[cfg(feature = "metrics")]
            registry: None,
        }
    }

    /// Also expose `registry` on `/metrics`.
    #[cfg(feature = "metrics")]
    pub fn with_registry(mut self, registry: prometheus::Registry) -> Self {
        self.registry = Some(registry);
        self
    }
}

/// Bind the probe server.
///
/// The returned [`Server`] must be awaited (or spawned) to accept
/// connections; its handle stops it during shutdown. Signal handling is left
/// to the caller.
///
/// # Errors
///
/// Propagates [`std::io::Error`] when the socket cannot be bound.
pub fn probe_server(
    health_state: web::Data<HealthState>,
    config: ProbeServerConfig,
) -> std::io::Result<Server> {
    #[cfg(feature = "metrics")]
    let registry = config.registry.map(web::Data::new);

    let server = HttpServer::new(move || {
        let app = App::new()
            .app_data(health_state.clone())
            .service(ready)
            .service(live);

        #[cfg(feature = "metrics")]
        let app = match registry.clone() {
            Some(registry) => app.app_data(registry).service(metrics::export),
            None => app,
        };

        app
    })
    .workers(1)
    .disable_signals()
    .bind(config.bind_addr)?
    .run();

    Ok(server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[actix_rt::test]
    async fn binds_an_ephemeral_port_without_marking_ready() {
        let state = web::Data::new(HealthState::new());
        let config = ProbeServerConfig::new("127.0.0.1:0".parse().expect("socket addr"));

        let server = probe_server(state.clone(), config).expect("server binds");
        server.handle().stop(false).await;

        assert!(!state.is_ready(), "readiness follows the engine, not the socket");
    }
}
