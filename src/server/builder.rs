//! ServerBuilder for fluent API to build HTTP servers

use super::host::BillingHost;
use super::router::{build_health_routes, build_invoice_routes};
use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Builder for the ledger HTTP server
///
/// # Example
///
/// ```ignore
/// let host = BillingHost::from_config(config).await?;
/// ServerBuilder::new()
///     .with_host(host)
///     .serve("127.0.0.1:3000")
///     .await?;
/// ```
pub struct ServerBuilder {
    host: Option<Arc<BillingHost>>,
    custom_routes: Vec<Router>,
    permissive_cors: bool,
}

impl ServerBuilder {
    /// Create a new ServerBuilder
    pub fn new() -> Self {
        Self {
            host: None,
            custom_routes: Vec::new(),
            permissive_cors: false,
        }
    }

    /// Set the host (required)
    pub fn with_host(mut self, host: BillingHost) -> Self {
        self.host = Some(Arc::new(host));
        self
    }

    /// Add custom routes to the server
    ///
    /// Use this for routes owned by the surrounding application, such as the
    /// course catalog or the student directory.
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Allow any origin, for a browser admin UI served from elsewhere
    pub fn with_permissive_cors(mut self) -> Self {
        self.permissive_cors = true;
        self
    }

    /// Build the final router: health, invoice and custom routes plus request tracing
    pub fn build(self) -> Result<Router> {
        let host = self
            .host
            .ok_or_else(|| anyhow::anyhow!("BillingHost is required. Call .with_host()"))?;

        let mut app = build_health_routes().merge(build_invoice_routes(host.service.clone()));
        for custom_router in self.custom_routes {
            app = app.merge(custom_router);
        }

        let app = app.layer(TraceLayer::new_for_http());
        Ok(if self.permissive_cors {
            app.layer(CorsLayer::permissive())
        } else {
            app
        })
    }

    /// Serve the application with graceful shutdown
    ///
    /// This will:
    /// - Bind to the provided address
    /// - Start serving requests
    /// - Handle SIGTERM and SIGINT (Ctrl+C) for graceful shutdown
    pub async fn serve(self, addr: &str) -> Result<()> {
        let app = self.build()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
