//! Community incident reporting server.
//!
//! Loads configuration, opens the database and image stores, picks the
//! token verifier and serves the HTTP API until interrupted.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use chrono::Duration;
use namma_suraksha::{
    AuthManager, IdentityVerifier, ImageStore, SubmissionService,
    auth::JwksVerifier,
    db::{Database, PgNewsRepository, PgReportRepository, PgUserRepository, UserRepository},
    geocode::{Geocoder, NominatimGeocoder, NoopGeocoder},
};
use ns_server::{
    api::{self, error::set_detailed_errors},
    config::{AuthProvider, ServerConfig},
    logging, metrics,
};
use pico_args::Arguments;
use tracing::{info, warn};

const HELP: &str = "\
Run the Namma Suraksha incident reporting server

USAGE:
  ns_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:5000]
  --db-url     URL         Database connection string  [default: env DATABASE_URL or postgres://postgres@localhost/namma_suraksha]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  JWT_SECRET               JWT signing secret (required)
  PASSWORD_PEPPER          Password hashing pepper (required)
  AUTH_PROVIDER            local (default) or jwks
  EVIDENCE_DIR             Evidence image directory
  CORS_ALLOWED_ORIGIN      Web client origin
  (A .env file in the working directory is loaded at startup)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let bind: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;
    let database_url: Option<String> = pargs.opt_value_from_str("--db-url")?;

    logging::init();

    let config = ServerConfig::from_env(bind, database_url)?;
    config.validate()?;
    set_detailed_errors(config.development);

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(anyhow::Error::msg)?;
        info!("Prometheus metrics exposed on http://{}/metrics", addr);
    }

    info!("Starting incident reporting server at {}", config.bind);

    let db = Database::new(&config.database)
        .await
        .context("Failed to connect to database")?;
    db.migrate().await.context("Failed to apply migrations")?;
    info!("Database connected and migrated");

    let pool = db.pool().clone();
    let users: Arc<dyn UserRepository> = Arc::new(PgUserRepository::new(pool.clone()));
    let reports = Arc::new(PgReportRepository::new(pool.clone()));
    let news = Arc::new(PgNewsRepository::new(pool));

    let auth_manager = Arc::new(
        AuthManager::new(
            users.clone(),
            config.security.password_pepper.clone(),
            config.security.jwt_secret.clone(),
        )
        .with_token_duration(Duration::seconds(config.security.token_expiry_secs)),
    );

    let verifier: Arc<dyn IdentityVerifier> = match &config.auth_provider {
        AuthProvider::Local => {
            info!("Accepting locally issued access tokens");
            Arc::new(auth_manager.verifier())
        }
        AuthProvider::Jwks(jwks) => {
            info!("Accepting tokens from {}", jwks.issuer);
            let verifier = JwksVerifier::new(jwks.clone(), Some(users.clone()));
            // Keys are fetched again on the first unknown key id
            if let Err(e) = verifier.refresh_keys().await {
                warn!("Initial identity provider key fetch failed: {}", e);
            }
            Arc::new(verifier)
        }
    };

    let geocoder: Arc<dyn Geocoder> = match &config.geocoder {
        Some(geocoder) => Arc::new(
            NominatimGeocoder::new(geocoder.url.clone(), &geocoder.user_agent)
                .context("Failed to build geocoder client")?,
        ),
        None => {
            info!("Reverse geocoding disabled");
            Arc::new(NoopGeocoder)
        }
    };

    let evidence = Arc::new(
        ImageStore::open(&config.storage.evidence_dir, config.storage.max_image_bytes)
            .await
            .context("Failed to open evidence directory")?,
    );
    let photos = Arc::new(
        ImageStore::open(&config.storage.photo_dir, config.storage.max_image_bytes)
            .await
            .context("Failed to open photo directory")?,
    );

    let submissions = Arc::new(
        SubmissionService::new(reports.clone(), evidence.clone(), geocoder)
            .with_report_types(config.report_types.clone())
            .with_max_images(config.storage.max_evidence_images),
    );

    let state = api::AppState {
        auth_manager,
        verifier,
        reports,
        news,
        submissions,
        evidence,
        photos,
    };

    let cors = api::cors_layer(&config.cors_allowed_origin)?;
    let app = api::create_router(state, cors);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");
    db.close().await;

    Ok(())
}

/// Graceful shutdown signal (Ctrl+C, or SIGTERM on Unix)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
