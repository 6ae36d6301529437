//! Incident report handlers.
//!
//! # Endpoints
//!
//! - `GET /api/crime?type=&limit=&offset=` - Reports newest first (public)
//! - `GET /api/crime/{id}` - One report (public)
//! - `POST /api/crime` - Submit a report, JSON or multipart with evidence images (token optional)
//! - `GET /api/crime/evidence/{filename}` - Stored evidence image (public)
//! - `GET /api/incidents?latitude=&longitude=&radius=` - Reports near a point (public)
//! - `POST /api/incidents` - Submit a report as JSON (token required)
//! - `PATCH /api/incidents/{id}` - Change a report's status (token required)

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS},
    },
    response::{IntoResponse, Response},
};
use namma_suraksha::{
    Identity,
    evidence::content_type_for,
    geo::GeoPoint,
    reports::{
        IncidentReport, NearbyReport, ReportError, ReportFilter, ReportId, ReportStatus,
        ReportSubmission,
    },
};
use serde::{Deserialize, Serialize};

use super::{
    AppState,
    error::{ApiError, ApiResult},
    forms::SubmissionForm,
    middleware::{CurrentIdentity, MaybeIdentity},
};
use crate::metrics;

/// Radius used when a proximity query names none, in metres
pub const DEFAULT_RADIUS_M: f64 = 5_000.0;

/// Largest radius a proximity query may ask for, in metres
pub const MAX_RADIUS_M: f64 = 50_000.0;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(rename = "type")]
    pub report_type: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct NearQuery {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub success: bool,
    pub message: &'static str,
    pub id: ReportId,
    pub evidence_images: Vec<String>,
    pub report: IncidentReport,
}

/// List reports newest first, optionally filtered by type
///
/// An unknown `type` is a `400` rather than an empty list, so typos surface.
pub async fn list_reports(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<IncidentReport>>> {
    let Query(query) = query?;

    let report_type = match query.report_type.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(name) => Some(
            state
                .submissions
                .report_types()
                .parse(name)
                .ok_or_else(|| ApiError::validation("type", format!("Unknown report type {name:?}")))?,
        ),
    };

    let filter = ReportFilter {
        report_type,
        limit: query.limit,
        offset: query.offset,
    };

    Ok(Json(state.reports.list(&filter).await?))
}

/// Fetch one report
pub async fn get_report(
    State(state): State<AppState>,
    id: Result<Path<ReportId>, PathRejection>,
) -> ApiResult<Json<IncidentReport>> {
    let Path(id) = id?;
    let report = state
        .reports
        .get(id)
        .await?
        .ok_or(ReportError::NotFound(id))?;
    Ok(Json(report))
}

async fn submit(
    state: &AppState,
    submission: ReportSubmission,
    identity: Option<&Identity>,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    match state.submissions.submit(submission, identity).await {
        Ok(report) => {
            metrics::reports_submitted_total(identity.is_none());
            metrics::evidence_images_stored(report.evidence_images.len());
            tracing::info!(
                report_id = report.id,
                report_type = %report.report_type,
                images = report.evidence_images.len(),
                "Report submitted"
            );

            Ok((
                StatusCode::CREATED,
                Json(SubmitResponse {
                    success: true,
                    message: "Report submitted successfully",
                    id: report.id,
                    evidence_images: report.evidence_images.clone(),
                    report,
                }),
            ))
        }
        Err(e) => {
            metrics::reports_rejected_total(rejection_reason(&e));
            Err(e.into())
        }
    }
}

fn rejection_reason(err: &ReportError) -> &'static str {
    match err {
        ReportError::Validation { .. } | ReportError::TooManyImages { .. } => "validation",
        ReportError::Storage(_) => "storage",
        ReportError::NotFound(_) => "not_found",
        ReportError::Database(_) | ReportError::Timeout(_) => "internal",
    }
}

/// Submit a report, anonymously or as the signed-in user
///
/// # Response
///
/// `201 Created` with `{"success": true, "message": "...", "id": 1, "evidenceImages": [...], "report": {...}}`
///
/// # Errors
///
/// - `400 Bad Request`: Missing or invalid field, too many or unsupported images
/// - `401 Unauthorized`: A bearer token was sent but is invalid
/// - `500 Internal Server Error`: Storage failure; no images are left behind
pub async fn create_report(
    State(state): State<AppState>,
    MaybeIdentity(identity): MaybeIdentity,
    SubmissionForm(submission): SubmissionForm,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    submit(&state, submission, identity.as_ref()).await
}

/// Serve a stored evidence image
pub async fn get_evidence(
    State(state): State<AppState>,
    filename: Result<Path<String>, PathRejection>,
) -> ApiResult<Response> {
    let Path(filename) = filename?;
    let bytes = state.evidence.retrieve(&filename).await?;
    Ok(image_response(&filename, bytes))
}

/// Image bytes with headers that stop browsers sniffing another type
pub(crate) fn image_response(filename: &str, bytes: Vec<u8>) -> Response {
    (
        [
            (CONTENT_TYPE, HeaderValue::from_static(content_type_for(filename))),
            (X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
            (CACHE_CONTROL, HeaderValue::from_static("private, max-age=3600")),
        ],
        bytes,
    )
        .into_response()
}

/// Reports within `radius` metres of a point, nearest first
pub async fn list_nearby(
    State(state): State<AppState>,
    query: Result<Query<NearQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<NearbyReport>>> {
    let Query(query) = query?;

    let latitude = query
        .latitude
        .ok_or_else(|| ApiError::validation("latitude", "latitude is required"))?;
    let longitude = query
        .longitude
        .ok_or_else(|| ApiError::validation("longitude", "longitude is required"))?;
    let point = GeoPoint::new(latitude, longitude).map_err(ReportError::from)?;

    let radius = query.radius.unwrap_or(DEFAULT_RADIUS_M);
    if !(radius > 0.0 && radius <= MAX_RADIUS_M) {
        return Err(ApiError::validation(
            "radius",
            format!("radius must be between 0 and {MAX_RADIUS_M} metres"),
        ));
    }

    Ok(Json(state.reports.list_near(point, radius).await?))
}

/// Submit a report as the signed-in user (JSON only)
pub async fn create_incident(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    payload: Result<Json<ReportSubmission>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    let Json(submission) = payload?;
    submit(&state, submission, Some(&identity)).await
}

/// Change the review status of a report
pub async fn update_status(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    id: Result<Path<ReportId>, PathRejection>,
    payload: Result<Json<StatusUpdate>, JsonRejection>,
) -> ApiResult<Json<IncidentReport>> {
    let Path(id) = id?;
    let Json(update) = payload?;

    let status: ReportStatus = update
        .status
        .as_deref()
        .ok_or_else(|| ApiError::validation("status", "status is required"))?
        .parse()
        .map_err(|message: String| ApiError::validation("status", message))?;

    let report = state
        .reports
        .update_status(id, status)
        .await?
        .ok_or(ReportError::NotFound(id))?;

    tracing::info!(
        report_id = id,
        status = status.as_str(),
        by = %identity.subject,
        "Report status changed"
    );

    Ok(Json(report))
}
