//! Incident report data models.

use crate::{auth::UserId, evidence::ImageUpload, geo::GeoPoint};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Report ID type
pub type ReportId = i64;

/// Report types accepted when no deployment list is configured
pub const DEFAULT_REPORT_TYPES: &[&str] = &[
    "Theft",
    "Assault",
    "Burglary",
    "Vandalism",
    "Fraud",
    "Harassment",
    "Other",
];

/// A report type drawn from the configured enumeration.
///
/// Only [`ReportTypes::parse`] constructs one, so every value in circulation
/// is spelled the way the deployment configured it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ReportType(String);

impl ReportType {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Rebuild a type read back from storage
    pub(crate) fn from_stored(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The deployment's set of report types
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTypes {
    names: Vec<String>,
}

impl ReportTypes {
    /// Build a set from names, dropping blanks and duplicates
    ///
    /// Falls back to [`DEFAULT_REPORT_TYPES`] when nothing usable is given.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique: Vec<String> = Vec::new();
        for name in names {
            let name = name.as_ref().trim();
            if !name.is_empty() && !unique.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                unique.push(name.to_string());
            }
        }
        if unique.is_empty() {
            return Self::default();
        }
        Self { names: unique }
    }

    /// Parse a comma separated list such as `"Theft,Assault,Other"`
    pub fn from_csv(list: &str) -> Self {
        Self::new(list.split(','))
    }

    /// Match a client value case-insensitively, returning the canonical spelling
    pub fn parse(&self, value: &str) -> Option<ReportType> {
        let value = value.trim();
        self.names
            .iter()
            .find(|name| name.eq_ignore_ascii_case(value))
            .map(|name| ReportType(name.clone()))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl Default for ReportTypes {
    fn default() -> Self {
        Self::new(DEFAULT_REPORT_TYPES)
    }
}

/// Review state of a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    #[default]
    Pending,
    Verified,
    Resolved,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Verified => "verified",
            ReportStatus::Resolved => "resolved",
        }
    }
}

impl FromStr for ReportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ReportStatus::Pending),
            "verified" => Ok(ReportStatus::Verified),
            "resolved" => Ok(ReportStatus::Resolved),
            other => Err(format!(
                "Unknown status {other:?}; expected pending, verified or resolved"
            )),
        }
    }
}

/// A stored incident report
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentReport {
    pub id: ReportId,
    #[serde(rename = "type")]
    pub report_type: ReportType,
    pub description: String,
    pub location_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub evidence: Option<String>,
    pub witnesses: Option<String>,
    pub evidence_images: Vec<String>,
    pub status: ReportStatus,
    pub user_id: Option<UserId>,
    pub share_identity: bool,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl IncidentReport {
    /// The report's coordinate
    ///
    /// Stored coordinates were validated on the way in, so this only fails
    /// on rows written outside this crate.
    pub fn point(&self) -> Option<GeoPoint> {
        GeoPoint::new(self.latitude, self.longitude).ok()
    }
}

/// A validated report ready for insertion
#[derive(Debug, Clone)]
pub struct NewReport {
    pub report_type: ReportType,
    pub description: String,
    pub location_name: String,
    pub point: GeoPoint,
    pub evidence: Option<String>,
    pub witnesses: Option<String>,
    pub evidence_images: Vec<String>,
    pub user_id: Option<UserId>,
    pub share_identity: bool,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
}

/// List query options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFilter {
    /// Only reports of this type
    pub report_type: Option<ReportType>,
    /// Page size; everything when absent
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// A report found by a proximity search
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyReport {
    #[serde(flatten)]
    pub report: IncidentReport,
    pub distance_meters: f64,
}

/// A report as submitted by a client, before validation.
///
/// Deserializes from the JSON body used by the web form; multipart
/// submissions are assembled field by field by the HTTP layer.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSubmission {
    #[serde(rename = "type", alias = "crimeType")]
    pub report_type: Option<String>,
    pub description: Option<String>,
    pub location_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub evidence: Option<String>,
    pub witnesses: Option<String>,
    #[serde(default)]
    pub share_identity: bool,
    #[serde(alias = "victimName")]
    pub contact_name: Option<String>,
    #[serde(alias = "contactNumber")]
    pub contact_phone: Option<String>,
    #[serde(skip)]
    pub images: Vec<ImageUpload>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_types_case_insensitive() {
        let types = ReportTypes::default();
        assert_eq!(types.parse("theft").unwrap().as_str(), "Theft");
        assert_eq!(types.parse("  HARASSMENT ").unwrap().as_str(), "Harassment");
        assert!(types.parse("Jaywalking").is_none());
        assert_eq!(types.names().len(), DEFAULT_REPORT_TYPES.len());
    }

    #[test]
    fn test_report_types_from_csv() {
        let types = ReportTypes::from_csv("Flooding, Pothole,,pothole");
        assert_eq!(types.names(), ["Flooding", "Pothole"]);
        assert!(types.parse("Theft").is_none());

        assert_eq!(ReportTypes::from_csv(" , "), ReportTypes::default());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("Verified".parse::<ReportStatus>(), Ok(ReportStatus::Verified));
        assert!("closed".parse::<ReportStatus>().is_err());
        assert_eq!(ReportStatus::default(), ReportStatus::Pending);
    }

    #[test]
    fn test_submission_accepts_form_aliases() {
        let submission: ReportSubmission = serde_json::from_str(
            r#"{"crimeType":"Theft","description":"bike stolen","locationName":"Lot 4",
                "latitude":12.97,"longitude":77.59,"shareIdentity":true,
                "victimName":"Asha","contactNumber":"98450"}"#,
        )
        .unwrap();
        assert_eq!(submission.report_type.as_deref(), Some("Theft"));
        assert_eq!(submission.location_name.as_deref(), Some("Lot 4"));
        assert_eq!(submission.contact_name.as_deref(), Some("Asha"));
        assert_eq!(submission.contact_phone.as_deref(), Some("98450"));
        assert!(submission.share_identity);
        assert!(submission.images.is_empty());
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = IncidentReport {
            id: 1,
            report_type: ReportTypes::default().parse("Theft").unwrap(),
            description: "bike stolen".to_string(),
            location_name: "Lot 4".to_string(),
            latitude: 12.97,
            longitude: 77.59,
            evidence: None,
            witnesses: None,
            evidence_images: vec![],
            status: ReportStatus::Pending,
            user_id: None,
            share_identity: false,
            contact_name: None,
            contact_phone: None,
            created_at: Utc::now(),
        };
        let nearby = NearbyReport {
            report,
            distance_meters: 12.5,
        };
        let json = serde_json::to_value(&nearby).unwrap();
        assert_eq!(json["type"], "Theft");
        assert_eq!(json["locationName"], "Lot 4");
        assert_eq!(json["evidenceImages"], serde_json::json!([]));
        assert_eq!(json["status"], "pending");
        assert_eq!(json["distanceMeters"], 12.5);
    }
}
