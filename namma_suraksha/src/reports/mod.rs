//! Incident reports: models, errors and the submission workflow.

pub mod errors;
pub mod models;
pub mod submission;

pub use errors::{ReportError, ReportResult};
pub use models::{
    DEFAULT_REPORT_TYPES, IncidentReport, NearbyReport, NewReport, ReportFilter, ReportId,
    ReportStatus, ReportSubmission, ReportType, ReportTypes,
};
pub use submission::{DEFAULT_MAX_IMAGES, SubmissionService};
