//! HTTP API for community incident reporting.
//!
//! # Modules
//!
//! - [`auth`]: Registration and login
//! - [`reports`]: Report listing, submission, proximity search and evidence images
//! - [`news`]: Safety news feed
//! - [`users`]: Profile of the signed-in user and profile photos
//! - [`middleware`]: Bearer token verification for protected endpoints
//! - [`forms`]: JSON-or-multipart request bodies
//! - [`error`]: Mapping of failures to status codes and JSON bodies
//!
//! # Endpoints Overview
//!
//! ```text
//! GET   /health                          - Health check (public)
//! POST  /auth/register                   - Register (public)
//! POST  /auth/login                      - Login, returns a bearer token (public)
//! GET   /api/crime                       - List reports (public)
//! GET   /api/crime/{id}                  - Get report (public)
//! POST  /api/crime                       - Submit report (token optional)
//! GET   /api/crime/evidence/{filename}   - Evidence image (public)
//! GET   /api/incidents                   - Reports near a point (public)
//! POST  /api/incidents                   - Submit report (auth required)
//! PATCH /api/incidents/{id}              - Change report status (auth required)
//! GET   /api/news                        - News feed (public)
//! POST  /api/news                        - Publish news (auth required)
//! GET   /api/users/me                    - Current profile (auth required)
//! GET   /api/users/photos/{filename}     - Profile photo (public)
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use ns_server::api::{AppState, cors_layer, create_router};
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! # let state: AppState = unimplemented!();
//!
//! let app = create_router(state, cors_layer("http://localhost:3000")?);
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:5000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod error;
pub mod forms;
pub mod middleware;
pub mod news;
pub mod reports;
pub mod request_id;
pub mod users;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::{
        HeaderValue, Method, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE, InvalidHeaderValue},
    },
    response::{IntoResponse, Json},
    routing::{get, patch, post},
};
use namma_suraksha::{
    AuthManager, IdentityVerifier, ImageStore, SubmissionService,
    db::{NewsRepository, ReportRepository},
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Room for the text fields and multipart framing around the images
const BODY_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request (cheap due to Arc wrappers).
///
/// # Fields
///
/// - `auth_manager`: Registration, login and profiles
/// - `verifier`: Resolves bearer tokens on protected routes
/// - `reports`: Report reads and status changes
/// - `news`: News feed storage
/// - `submissions`: Validated report intake with evidence staging
/// - `evidence`: Evidence image store
/// - `photos`: Profile photo store
#[derive(Clone)]
pub struct AppState {
    pub auth_manager: Arc<AuthManager>,
    pub verifier: Arc<dyn IdentityVerifier>,
    pub reports: Arc<dyn ReportRepository>,
    pub news: Arc<dyn NewsRepository>,
    pub submissions: Arc<SubmissionService>,
    pub evidence: Arc<ImageStore>,
    pub photos: Arc<ImageStore>,
}

/// CORS policy admitting the configured web client origin
///
/// # Errors
///
/// Returns an error if `origin` is not a valid header value
pub fn cors_layer(origin: &str) -> Result<CorsLayer, InvalidHeaderValue> {
    Ok(CorsLayer::new()
        .allow_origin(HeaderValue::from_str(origin)?)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]))
}

/// Create the complete API router with all endpoints and middleware.
///
/// Public routes carry no authentication layer. `POST /api/crime` runs
/// [`middleware::optional_identity`]; the remaining write routes and the
/// profile run [`middleware::require_identity`].
pub fn create_router(state: AppState, cors: CorsLayer) -> Router {
    // A full submission: every image at the size ceiling, plus form fields
    let body_limit = state.evidence.max_bytes() * (state.submissions.max_images() + 1)
        + BODY_OVERHEAD_BYTES;

    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/api/crime", get(reports::list_reports))
        .route("/api/crime/{id}", get(reports::get_report))
        .route("/api/crime/evidence/{filename}", get(reports::get_evidence))
        .route("/api/incidents", get(reports::list_nearby))
        .route("/api/news", get(news::list_news))
        .route("/api/users/photos/{filename}", get(users::get_photo));

    // Anonymous reports are allowed; a token, when sent, must be valid
    let optional_auth_routes = Router::new()
        .route("/api/crime", post(reports::create_report))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::optional_identity,
        ));

    let protected_routes = Router::new()
        .route("/api/incidents", post(reports::create_incident))
        .route("/api/incidents/{id}", patch(reports::update_status))
        .route("/api/news", post(news::create_news))
        .route("/api/users/me", get(users::me))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_identity,
        ));

    Router::new()
        .merge(public_routes)
        .merge(optional_auth_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the database answers, `503 Service Unavailable`
/// otherwise.
///
/// ```bash
/// curl http://localhost:5000/health
/// # {"status":"healthy","version":"0.1.0","database":true,"timestamp":"2026-10-19T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = match state.reports.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            false
        }
    };

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
