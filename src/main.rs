//! Certificate Registry Server
//!
//! Wallet-connected access layer for a course-certificate ledger: issue,
//! search, verify and share certificates, and manage users, courses and
//! teacher assignments through one registry client.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use tokio::time::{sleep, Duration};
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use certregistry_server::app_state::AppState;
use certregistry_server::config::RegistryConfig;
use certregistry_server::ledger::transport::JsonRpcLedger;
use certregistry_server::ledger::wallet::JsonRpcWallet;
use certregistry_server::registry::RegistryClient;
use certregistry_server::routes;
use certregistry_server::services::dashboard::DashboardService;
use certregistry_server::uploader;

const POLLER_SUPERVISOR_MAX_BACKOFF_SECONDS: u64 = 30;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = RegistryConfig::from_env();
    info!(
        contract = %config.contract_address,
        revision = ?config.contract_revision,
        "registry client configured"
    );

    let registry = Arc::new(RegistryClient::new(
        Arc::new(JsonRpcLedger::new(config.ledger_rpc_url.clone())),
        Arc::new(JsonRpcWallet::new(config.wallet_rpc_url.clone())),
        uploader::from_config(&config),
        config.clone(),
    ));
    let dashboard = Arc::new(DashboardService::new(
        Arc::clone(&registry),
        config.poll_interval_seconds,
    ));

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(routes::wallet_routes())
        .merge(routes::user_routes())
        .merge(routes::certificate_routes())
        .merge(routes::course_routes())
        .merge(routes::teacher_routes())
        .merge(routes::audit_routes())
        .merge(routes::stats_routes())
        .layer(build_cors_layer())
        .with_state(AppState::new(Arc::clone(&registry), Arc::clone(&dashboard)));

    // Start and supervise the background dashboard poller.
    tokio::spawn(async move {
        let mut restart_count: u32 = 0;
        loop {
            let poller = Arc::clone(&dashboard);
            let handle = tokio::spawn(async move { poller.start().await });

            match handle.await {
                Ok(Ok(())) => {
                    info!("dashboard poller exited cleanly; stopping supervisor");
                    break;
                }
                Ok(Err(err)) => {
                    error!(error = %err, "dashboard poller failed; restarting");
                }
                Err(join_error) => {
                    if join_error.is_panic() {
                        error!("dashboard poller panicked; restarting");
                    } else {
                        error!(error = %join_error, "dashboard poller task failed; restarting");
                    }
                }
            }

            restart_count = restart_count.saturating_add(1);
            let backoff_seconds = (2u64.saturating_pow(restart_count.min(5)))
                .min(POLLER_SUPERVISOR_MAX_BACKOFF_SECONDS);
            warn!(restart_count, backoff_seconds, "dashboard poller restart backoff");
            sleep(Duration::from_secs(backoff_seconds)).await;
        }
    });

    // Get port from environment or default to 3001
    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "3001".to_string())
        .parse()
        .expect("PORT must be a number");

    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    info!("Server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

async fn root() -> &'static str {
    "Certificate Registry API Server"
}

async fn health_check() -> &'static str {
    "OK"
}

fn build_cors_layer() -> CorsLayer {
    let allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000".to_string())
        .split(',')
        .filter_map(|origin| origin.trim().parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(false)
}
