//! Request body extractors accepting either JSON or `multipart/form-data`.
//!
//! The web form posts multipart (text fields plus file parts); API clients
//! post JSON. Both arrive at the handlers as the same typed value.

use axum::{
    Json,
    extract::{FromRequest, Multipart, Request, multipart::Field},
    http::header::CONTENT_TYPE,
};
use namma_suraksha::{evidence::ImageUpload, reports::ReportSubmission};
use serde::Deserialize;

use super::error::ApiError;

/// File part names that carry evidence images
const EVIDENCE_FIELDS: &[&str] = &["evidence_images", "evidence_images[]", "evidenceImages"];

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"))
}

/// Read a file part; `None` for the empty part browsers send when no file was chosen
async fn read_file(field: Field<'_>) -> Result<Option<ImageUpload>, ApiError> {
    let original_name = field.file_name().unwrap_or_default().to_string();
    let mime_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let bytes = field.bytes().await?;

    if bytes.is_empty() && original_name.is_empty() {
        return Ok(None);
    }

    Ok(Some(ImageUpload {
        bytes: bytes.to_vec(),
        original_name,
        mime_type,
    }))
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_coordinate(field: &'static str, value: &str) -> Result<Option<f64>, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| ApiError::validation(field, format!("{field} must be a number")))
}

/// HTML checkboxes and JS `FormData` send several spellings of true
fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "on" | "yes"
    )
}

/// A report submission from either body format
#[derive(Debug)]
pub struct SubmissionForm(pub ReportSubmission);

impl SubmissionForm {
    fn apply_text(
        submission: &mut ReportSubmission,
        name: &str,
        value: String,
    ) -> Result<(), ApiError> {
        match name {
            "type" | "crimeType" => submission.report_type = non_blank(value),
            "description" => submission.description = Some(value),
            "locationName" | "location_name" => submission.location_name = non_blank(value),
            "latitude" => submission.latitude = parse_coordinate("latitude", &value)?,
            "longitude" => submission.longitude = parse_coordinate("longitude", &value)?,
            "evidence" => submission.evidence = non_blank(value),
            "witnesses" => submission.witnesses = non_blank(value),
            "shareIdentity" | "share_identity" => submission.share_identity = parse_flag(&value),
            "victimName" | "contactName" => submission.contact_name = non_blank(value),
            "contactNumber" | "contactPhone" => submission.contact_phone = non_blank(value),
            other => tracing::debug!(field = other, "Ignoring unknown form field"),
        }
        Ok(())
    }
}

impl<S> FromRequest<S> for SubmissionForm
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_multipart(&request) {
            let Json(submission) = Json::<ReportSubmission>::from_request(request, state).await?;
            return Ok(SubmissionForm(submission));
        }

        let mut multipart = Multipart::from_request(request, state).await?;
        let mut submission = ReportSubmission::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            if EVIDENCE_FIELDS.contains(&name.as_str()) {
                if let Some(upload) = read_file(field).await? {
                    submission.images.push(upload);
                }
            } else {
                let value = field.text().await?;
                Self::apply_text(&mut submission, &name, value)?;
            }
        }

        Ok(SubmissionForm(submission))
    }
}

/// Registration fields as posted by a client
#[derive(Debug, Default, Deserialize)]
pub struct RegisterFields {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: String,
    pub phone: Option<String>,
    /// Profile photo; multipart only
    #[serde(skip)]
    pub photo: Option<ImageUpload>,
}

/// A registration from either body format
#[derive(Debug)]
pub struct RegisterForm(pub RegisterFields);

impl<S> FromRequest<S> for RegisterForm
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_multipart(&request) {
            let Json(fields) = Json::<RegisterFields>::from_request(request, state).await?;
            return Ok(RegisterForm(fields));
        }

        let mut multipart = Multipart::from_request(request, state).await?;
        let mut fields = RegisterFields::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            if name == "photo" {
                fields.photo = read_file(field).await?;
                continue;
            }

            let value = field.text().await?;
            match name.as_str() {
                "email" => fields.email = value,
                "username" => fields.username = value,
                "password" => fields.password = value,
                "name" => fields.name = value,
                "phone" => fields.phone = non_blank(value),
                other => tracing::debug!(field = other, "Ignoring unknown form field"),
            }
        }

        Ok(RegisterForm(fields))
    }
}
