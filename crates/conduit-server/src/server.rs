use std::time::Duration;

use axum::middleware;
use axum::response::Response;
use axum::Router;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use conduit_relay::RelayService;

use crate::error::ServeError;
use crate::origin::{self, OriginState};
use crate::relay;
use crate::sse;

/// How long [`ServerHandle::shutdown`] waits for connections to close.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Bind address for one service.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Loopback on a random port.
    pub fn ephemeral() -> Self {
        Self::new("127.0.0.1", 0)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Handle returned by the `start_*` functions. Dropping it leaves the
/// server running; call [`ServerHandle::shutdown`] to stop it.
pub struct ServerHandle {
    pub port: u16,
    name: &'static str,
    shutdown: CancellationToken,
    server: JoinHandle<()>,
}

impl ServerHandle {
    /// Stop accepting connections and end open event streams.
    pub async fn shutdown(self) {
        self.shutdown_within(SHUTDOWN_GRACE).await;
    }

    /// Like [`shutdown`](Self::shutdown), aborting the server task if
    /// connections are still open after `grace`.
    pub async fn shutdown_within(mut self, grace: Duration) {
        self.shutdown.cancel();
        match tokio::time::timeout(grace, &mut self.server).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(service = self.name, error = %e, "server task failed"),
            Err(_) => {
                warn!(service = self.name, ?grace, "shutdown grace elapsed, aborting");
                self.server.abort();
            }
        }
        info!(service = self.name, "server stopped");
    }

    /// A token that triggers shutdown when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}

/// Start the origin service.
pub async fn start_origin(config: ServerConfig, state: OriginState) -> Result<ServerHandle, ServeError> {
    serve("origin", &config, origin::build_router(state)).await
}

/// Start the relay service.
pub async fn start_relay(config: ServerConfig, relay: RelayService) -> Result<ServerHandle, ServeError> {
    serve("relay", &config, relay::build_router(relay)).await
}

async fn serve(name: &'static str, config: &ServerConfig, router: Router) -> Result<ServerHandle, ServeError> {
    let shutdown = CancellationToken::new();
    let streams_token = shutdown.clone();
    let router = router
        .layer(middleware::map_response(move |response: Response| {
            let token = streams_token.clone();
            async move { sse::until_shutdown(token, response) }
        }))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| ServeError::Bind {
            addr: addr.clone(),
            source,
        })?;
    let local_addr = listener.local_addr()?;

    info!(service = name, %local_addr, "server started");

    let signal = shutdown.clone().cancelled_owned();
    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router)
            .with_graceful_shutdown(signal)
            .await
        {
            warn!(service = name, error = %e, "server exited with error");
        }
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        name,
        shutdown,
        server,
    })
}
