//! Integration tests for report submission.
//!
//! Verifies the evidence/row pairing: a submission either stores its report
//! and every image, or leaves nothing behind.

use namma_suraksha::db::{MemoryReportRepository, ReportRepository};
use namma_suraksha::evidence::{ImageStore, ImageUpload};
use namma_suraksha::geo::GeoPoint;
use namma_suraksha::geocode::{GeocodeError, Geocoder, NoopGeocoder};
use namma_suraksha::reports::{
    ReportError, ReportFilter, ReportSubmission, ReportTypes, SubmissionService,
};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    evidence_dir: std::path::PathBuf,
    reports: Arc<MemoryReportRepository>,
    service: SubmissionService,
}

async fn setup(geocoder: Arc<dyn Geocoder>) -> Fixture {
    let dir = TempDir::new().expect("temp dir");
    let evidence_dir = dir.path().join("evidence");
    let images = Arc::new(
        ImageStore::open(&evidence_dir, 5 * 1024 * 1024)
            .await
            .expect("open image store"),
    );
    let reports = Arc::new(MemoryReportRepository::new());
    let service = SubmissionService::new(reports.clone(), images, geocoder);

    Fixture {
        _dir: dir,
        evidence_dir,
        reports,
        service,
    }
}

fn files_in(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

fn jpeg(name: &str) -> ImageUpload {
    ImageUpload {
        bytes: vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3, 4],
        original_name: name.to_string(),
        mime_type: "image/jpeg".to_string(),
    }
}

fn submission(kind: &str) -> ReportSubmission {
    ReportSubmission {
        report_type: Some(kind.to_string()),
        description: Some("bike stolen".to_string()),
        location_name: Some("Lot 4".to_string()),
        latitude: Some(12.97),
        longitude: Some(77.59),
        ..Default::default()
    }
}

struct FixedGeocoder(&'static str);

#[async_trait::async_trait]
impl Geocoder for FixedGeocoder {
    async fn reverse(&self, _point: GeoPoint) -> Result<String, GeocodeError> {
        Ok(self.0.to_string())
    }
}

#[tokio::test]
async fn test_example_submission_round_trip() {
    let fx = setup(Arc::new(NoopGeocoder)).await;

    let report = fx.service.submit(submission("Theft"), None).await.unwrap();
    assert!(report.id > 0);
    assert!(report.evidence_images.is_empty());

    let fetched = fx.reports.get(report.id).await.unwrap().unwrap();
    assert_eq!(fetched.report_type.as_str(), "Theft");
    assert_eq!(fetched.description, "bike stolen");
    assert_eq!(fetched.location_name, "Lot 4");
    assert_eq!(fetched.latitude, 12.97);
    assert_eq!(fetched.longitude, 77.59);
    assert_eq!(fetched.created_at, report.created_at);
}

#[tokio::test]
async fn test_images_stored_and_referenced() {
    for n in 0..=5 {
        let fx = setup(Arc::new(NoopGeocoder)).await;
        let request = ReportSubmission {
            images: (0..n).map(|i| jpeg(&format!("photo{i}.JPG"))).collect(),
            ..submission("Burglary")
        };

        let report = fx.service.submit(request, None).await.unwrap();

        assert_eq!(report.evidence_images.len(), n);
        assert_eq!(files_in(&fx.evidence_dir), n);
        for name in &report.evidence_images {
            assert!(name.ends_with(".jpg"), "extension preserved: {name}");
            assert!(fx.evidence_dir.join(name).exists());
        }
    }
}

#[tokio::test]
async fn test_too_many_images_rejected() {
    let fx = setup(Arc::new(NoopGeocoder)).await;
    let request = ReportSubmission {
        images: (0..6).map(|i| jpeg(&format!("{i}.jpg"))).collect(),
        ..submission("Theft")
    };

    let err = fx.service.submit(request, None).await.unwrap_err();
    assert!(matches!(err, ReportError::TooManyImages { count: 6, max: 5 }));
    assert_eq!(files_in(&fx.evidence_dir), 0);
    assert!(fx.reports.is_empty());
}

#[tokio::test]
async fn test_failed_row_write_removes_images() {
    let fx = setup(Arc::new(NoopGeocoder)).await;
    fx.reports.set_fail_writes(true);

    let request = ReportSubmission {
        images: vec![jpeg("a.jpg"), jpeg("b.jpg"), jpeg("c.jpg")],
        ..submission("Vandalism")
    };

    let err = fx.service.submit(request, None).await.unwrap_err();
    assert!(matches!(err, ReportError::Database(_)));
    assert_eq!(files_in(&fx.evidence_dir), 0, "no orphan evidence files");
    assert!(fx.reports.is_empty());
}

#[tokio::test]
async fn test_unsupported_image_rejected_before_writing() {
    let fx = setup(Arc::new(NoopGeocoder)).await;
    let request = ReportSubmission {
        images: vec![
            jpeg("a.jpg"),
            ImageUpload {
                bytes: b"%PDF-1.7".to_vec(),
                original_name: "statement.pdf".to_string(),
                mime_type: "application/pdf".to_string(),
            },
        ],
        ..submission("Fraud")
    };

    let err = fx.service.submit(request, None).await.unwrap_err();
    assert!(err.client_message().contains("Unsupported media type"));
    assert_eq!(files_in(&fx.evidence_dir), 0);
}

#[tokio::test]
async fn test_out_of_range_coordinates_write_nothing() {
    let fx = setup(Arc::new(NoopGeocoder)).await;

    for (lat, lon, field) in [
        (90.5, 0.0, "latitude"),
        (-91.0, 0.0, "latitude"),
        (0.0, 180.01, "longitude"),
        (0.0, -200.0, "longitude"),
        (f64::NAN, 0.0, "latitude"),
    ] {
        let request = ReportSubmission {
            latitude: Some(lat),
            longitude: Some(lon),
            images: vec![jpeg("a.jpg")],
            ..submission("Theft")
        };
        let err = fx.service.submit(request, None).await.unwrap_err();
        assert_eq!(err.field(), Some(field), "{lat}, {lon}");
    }

    let missing = ReportSubmission {
        longitude: None,
        ..submission("Theft")
    };
    let err = fx.service.submit(missing, None).await.unwrap_err();
    assert_eq!(err.field(), Some("longitude"));

    assert!(fx.reports.is_empty());
    assert_eq!(files_in(&fx.evidence_dir), 0);
}

#[tokio::test]
async fn test_boundary_coordinates_accepted() {
    let fx = setup(Arc::new(NoopGeocoder)).await;
    for (lat, lon) in [(90.0, 180.0), (-90.0, -180.0)] {
        let request = ReportSubmission {
            latitude: Some(lat),
            longitude: Some(lon),
            ..submission("Other")
        };
        fx.service.submit(request, None).await.unwrap();
    }
    assert_eq!(fx.reports.len(), 2);
}

#[tokio::test]
async fn test_geocoder_names_location_when_missing() {
    let fx = setup(Arc::new(FixedGeocoder("MG Road, Bengaluru"))).await;

    let unnamed = ReportSubmission {
        location_name: None,
        ..submission("Theft")
    };
    let report = fx.service.submit(unnamed, None).await.unwrap();
    assert_eq!(report.location_name, "MG Road, Bengaluru");

    // A client-supplied name wins over the lookup
    let named = fx.service.submit(submission("Theft"), None).await.unwrap();
    assert_eq!(named.location_name, "Lot 4");
}

#[tokio::test]
async fn test_type_filters_partition_listing() {
    let fx = setup(Arc::new(NoopGeocoder)).await;
    for kind in ["Theft", "Assault", "theft", "Fraud", "Other", "Assault"] {
        fx.service.submit(submission(kind), None).await.unwrap();
    }

    let all = fx.reports.list(&ReportFilter::default()).await.unwrap();
    assert_eq!(all.len(), 6);
    assert!(
        all.windows(2)
            .all(|w| (w[0].created_at, w[0].id) >= (w[1].created_at, w[1].id)),
        "newest first"
    );

    let types = ReportTypes::default();
    let mut union = Vec::new();
    for name in types.names() {
        let report_type = types.parse(name);
        let filtered = fx
            .reports
            .list(&ReportFilter {
                report_type: report_type.clone(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(filtered.iter().all(|r| Some(&r.report_type) == report_type.as_ref()));
        union.extend(filtered.into_iter().map(|r| r.id));
    }
    union.sort_unstable();

    let mut ids: Vec<_> = all.iter().map(|r| r.id).collect();
    ids.sort_unstable();
    assert_eq!(union, ids);
}

#[tokio::test]
async fn test_custom_report_types() {
    let fx = setup(Arc::new(NoopGeocoder)).await;
    let service = SubmissionService::new(
        fx.reports.clone(),
        Arc::new(ImageStore::open(&fx.evidence_dir, 1024).await.unwrap()),
        Arc::new(NoopGeocoder),
    )
    .with_report_types(ReportTypes::from_csv("Pothole,Flooding"))
    .with_max_images(1);

    assert!(service.submit(submission("Theft"), None).await.is_err());
    let report = service.submit(submission("pothole"), None).await.unwrap();
    assert_eq!(report.report_type.as_str(), "Pothole");

    let two_images = ReportSubmission {
        images: vec![jpeg("a.jpg"), jpeg("b.jpg")],
        ..submission("Flooding")
    };
    assert!(matches!(
        service.submit(two_images, None).await,
        Err(ReportError::TooManyImages { max: 1, .. })
    ));
}
