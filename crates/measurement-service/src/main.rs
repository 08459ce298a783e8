//! Measurement Service
//!
//! Serves measurements of a target to callers the family service allows.

use common::credential_issuer::{LoginClient, LoginClientConfig};
use common::service_credential::ServiceCredentialCache;
use measurement_service::auth::TokenVerifier;
use measurement_service::config::Config;
use measurement_service::observability::metrics::init_metrics_recorder;
use measurement_service::repositories::PgMeasurementRepository;
use measurement_service::routes::{self, AppState};
use measurement_service::services::{Authorizer, FamilyAccessClient, MeasurementService};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing; LOG_FORMAT=json switches to structured output
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v == "json");
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "measurement_service=debug,common=info,tower_http=debug".into()
            }),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    info!("Starting Measurement Service");

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics recorder: {}", e);
        e
    })?;

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        login_url = %config.login_url,
        family_server_url = %config.family_server_url,
        "Configuration loaded successfully"
    );

    info!("Connecting to database...");
    let db_pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&config.database_url)
        .await
        .map_err(|e| {
            error!("Failed to connect to database: {}", e);
            e
        })?;

    sqlx::migrate!().run(&db_pool).await.map_err(|e| {
        error!("Failed to run migrations: {}", e);
        e
    })?;
    info!("Database ready");

    // Outbound credential: login client behind the single-flight cache
    let login_client = LoginClient::new(
        LoginClientConfig::new(
            config.login_url.clone(),
            config.auth_username.clone(),
            config.auth_password.clone(),
        )
        .with_http_timeout(config.upstream_timeout),
    )?;
    let credentials = Arc::new(ServiceCredentialCache::new(
        Arc::new(login_client),
        config.token_public_key.clone(),
    ));

    let access_gate = FamilyAccessClient::new(
        &config.family_server_url,
        credentials,
        config.upstream_timeout,
    )?;
    let authorizer = Authorizer::new(Arc::new(access_gate));

    let repository = Arc::new(PgMeasurementRepository::new(db_pool));
    let measurements = MeasurementService::new(repository.clone(), authorizer);

    let bind_address = config.bind_address.clone();
    let shutdown_drain = config.shutdown_drain;
    let token_verifier = Arc::new(TokenVerifier::new(config.token_public_key.clone()));

    let state = Arc::new(AppState {
        config,
        repository,
        measurements,
        token_verifier,
    });

    let app = routes::build_routes(state, metrics_handle);

    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Measurement Service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_drain))
        .await?;

    info!("Measurement Service shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
/// Returns when a shutdown signal is received and the drain period is over.
async fn shutdown_signal(drain: Duration) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    if drain.is_zero() {
        info!("Skipping drain period (SHUTDOWN_DRAIN_SECONDS=0)");
    } else {
        warn!("Draining connections for {:?}...", drain);
        tokio::time::sleep(drain).await;
        info!("Drain period complete");
    }
}
