//! Application startup and lifecycle management.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::anyhow;
use axum::middleware::from_fn;
use axum::{
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::request_id_middleware;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::handlers;
use crate::services::{InvoiceRepository, ZatcaClient};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub repository: InvoiceRepository,
    pub zatca: ZatcaClient,
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the given configuration. Binds the
    /// listener immediately (port 0 = random port for testing).
    pub async fn build(config: Config) -> Result<Self, AppError> {
        let repository = InvoiceRepository::new();
        let zatca = ZatcaClient::new(config.zatca.clone(), Arc::new(repository.clone()));
        if zatca.is_configured() {
            info!("ZATCA client initialized");
        } else {
            tracing::warn!(
                "ZATCA API key not configured - submissions will be rejected by the authority"
            );
        }

        let state = AppState {
            config: config.clone(),
            repository,
            zatca,
        };

        let router = Router::new()
            .route("/health", get(handlers::health_check))
            .route(
                "/companies",
                post(handlers::companies::create_company).get(handlers::companies::list_companies),
            )
            .route(
                "/companies/:id",
                get(handlers::companies::get_company)
                    .put(handlers::companies::update_company)
                    .delete(handlers::companies::delete_company),
            )
            .route(
                "/customers",
                post(handlers::customers::create_customer)
                    .get(handlers::customers::list_customers),
            )
            .route(
                "/customers/:id",
                get(handlers::customers::get_customer)
                    .put(handlers::customers::update_customer)
                    .delete(handlers::customers::delete_customer),
            )
            .route(
                "/invoices",
                post(handlers::invoices::create_invoice).get(handlers::invoices::list_invoices),
            )
            .route(
                "/invoices/:id",
                get(handlers::invoices::get_invoice)
                    .put(handlers::invoices::update_invoice)
                    .delete(handlers::invoices::delete_invoice),
            )
            .route("/invoices/:id/submit", post(handlers::invoices::submit_invoice))
            .route(
                "/invoices/:id/status",
                get(handlers::invoices::check_invoice_status),
            )
            .route("/invoices/:id/cancel", post(handlers::invoices::cancel_invoice))
            .route("/invoices/:id/qr", get(handlers::invoices::invoice_qr))
            .route(
                "/invoices/:id/logs",
                get(handlers::invoices::list_submission_logs),
            )
            .layer(from_fn(request_id_middleware))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or("-");

                    tracing::info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                        version = ?request.version(),
                    )
                }),
            )
            .with_state(state);

        let host = config
            .server
            .host
            .parse()
            .map_err(|e| AppError::ConfigError(anyhow!("Invalid server host: {}", e)))?;
        let addr = SocketAddr::new(host, config.server.port);
        let listener = TcpListener::bind(addr).await?;
        let port = listener.local_addr()?.port();

        info!("einvoicing-service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router).await
    }
}
