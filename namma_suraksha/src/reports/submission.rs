//! Report submission: validate, name the place, stage evidence, persist.

use super::{
    errors::{ReportError, ReportResult},
    models::{IncidentReport, NewReport, ReportSubmission, ReportType, ReportTypes},
};
use crate::{
    auth::Identity,
    db::ReportRepository,
    evidence::{ImageStore, ImageUpload, StagedImages},
    geo::GeoPoint,
    geocode::{self, Geocoder},
};
use std::sync::Arc;

/// Most evidence images a single report may carry by default
pub const DEFAULT_MAX_IMAGES: usize = 5;

/// A submission that passed validation and is ready to write
#[derive(Debug)]
struct Draft {
    report_type: ReportType,
    description: String,
    location_name: Option<String>,
    point: GeoPoint,
    evidence: Option<String>,
    witnesses: Option<String>,
    share_identity: bool,
    contact_name: Option<String>,
    contact_phone: Option<String>,
    images: Vec<ImageUpload>,
}

/// Accepts incident reports from clients
pub struct SubmissionService {
    reports: Arc<dyn ReportRepository>,
    images: Arc<ImageStore>,
    geocoder: Arc<dyn Geocoder>,
    report_types: ReportTypes,
    max_images: usize,
}

impl SubmissionService {
    /// Create a service with the default report types and image limit
    pub fn new(
        reports: Arc<dyn ReportRepository>,
        images: Arc<ImageStore>,
        geocoder: Arc<dyn Geocoder>,
    ) -> Self {
        Self {
            reports,
            images,
            geocoder,
            report_types: ReportTypes::default(),
            max_images: DEFAULT_MAX_IMAGES,
        }
    }

    pub fn with_report_types(mut self, report_types: ReportTypes) -> Self {
        self.report_types = report_types;
        self
    }

    pub fn with_max_images(mut self, max_images: usize) -> Self {
        self.max_images = max_images;
        self
    }

    pub fn report_types(&self) -> &ReportTypes {
        &self.report_types
    }

    pub fn max_images(&self) -> usize {
        self.max_images
    }

    /// Validate and store a report with its evidence images
    ///
    /// Either the report row and all of its images are written, or nothing
    /// is: images staged before a failure are deleted before the error is
    /// returned.
    ///
    /// # Arguments
    ///
    /// * `submission` - Client payload
    /// * `identity` - Authenticated reporter, `None` for anonymous reports
    ///
    /// # Errors
    ///
    /// * `ReportError::Validation` - Missing field, unknown type or bad coordinate
    /// * `ReportError::TooManyImages` - More images than allowed
    /// * `ReportError::Storage` - Image rejected or not writable
    /// * `ReportError::Database` / `ReportError::Timeout` - Row write failed
    pub async fn submit(
        &self,
        submission: ReportSubmission,
        identity: Option<&Identity>,
    ) -> ReportResult<IncidentReport> {
        let draft = self.validate(submission)?;

        let location_name = match draft.location_name {
            Some(name) => name,
            None => geocode::place_name(self.geocoder.as_ref(), draft.point).await,
        };

        let mut staged = StagedImages::new(Arc::clone(&self.images));
        for upload in draft.images {
            if let Err(e) = staged.stage(upload).await {
                log::error!("Failed to store evidence image: {}", e);
                staged.rollback().await;
                return Err(e.into());
            }
        }

        let new_report = NewReport {
            report_type: draft.report_type,
            description: draft.description,
            location_name,
            point: draft.point,
            evidence: draft.evidence,
            witnesses: draft.witnesses,
            evidence_images: staged.filenames().to_vec(),
            user_id: identity.and_then(|i| i.user_id),
            share_identity: draft.share_identity,
            contact_name: draft.contact_name,
            contact_phone: draft.contact_phone,
        };

        match self.reports.create(new_report).await {
            Ok(report) => {
                let images = staged.commit();
                log::info!(
                    "Report {} ({}) submitted with {} evidence image(s)",
                    report.id,
                    report.report_type,
                    images.len()
                );
                Ok(report)
            }
            Err(e) => {
                log::error!("Failed to persist report: {}", e);
                staged.rollback().await;
                Err(e)
            }
        }
    }

    /// Check every field before anything is written
    fn validate(&self, submission: ReportSubmission) -> ReportResult<Draft> {
        let raw_type = non_blank(submission.report_type)
            .ok_or_else(|| ReportError::validation("type", "type is required"))?;
        let report_type = self.report_types.parse(&raw_type).ok_or_else(|| {
            ReportError::validation(
                "type",
                format!("type must be one of {}", self.report_types.names().join(", ")),
            )
        })?;

        let description = non_blank(submission.description)
            .ok_or_else(|| ReportError::validation("description", "description is required"))?;

        let latitude = submission
            .latitude
            .ok_or_else(|| ReportError::validation("latitude", "latitude is required"))?;
        let longitude = submission
            .longitude
            .ok_or_else(|| ReportError::validation("longitude", "longitude is required"))?;
        let point = GeoPoint::new(latitude, longitude)?;

        if submission.images.len() > self.max_images {
            return Err(ReportError::TooManyImages {
                count: submission.images.len(),
                max: self.max_images,
            });
        }
        for image in &submission.images {
            self.images.check(image)?;
        }

        let (contact_name, contact_phone) = if submission.share_identity {
            (
                non_blank(submission.contact_name),
                non_blank(submission.contact_phone),
            )
        } else {
            (None, None)
        };

        Ok(Draft {
            report_type,
            description,
            location_name: non_blank(submission.location_name),
            point,
            evidence: non_blank(submission.evidence),
            witnesses: non_blank(submission.witnesses),
            share_identity: submission.share_identity,
            contact_name,
            contact_phone,
            images: submission.images,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
