//! Integration tests for the HTTP API.
//!
//! The router runs against in-memory repositories and temporary image
//! directories, so no database is needed.

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode, header};
use http_body_util::BodyExt;
use namma_suraksha::db::{MemoryNewsRepository, MemoryReportRepository, MemoryUserRepository};
use namma_suraksha::geocode::NoopGeocoder;
use namma_suraksha::{AuthManager, IdentityVerifier, ImageStore, SubmissionService};
use ns_server::api::{AppState, cors_layer, create_router};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt; // For `oneshot` method

const JWT_SECRET: &str = "test_secret_key_for_testing_only_32b";
const PEPPER: &str = "test_pepper_for_testing_only";
const BOUNDARY: &str = "----nammasurakshatestboundary";
const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

struct TestServer {
    app: Router,
    _dir: TempDir,
    evidence_dir: PathBuf,
    photo_dir: PathBuf,
    reports: Arc<MemoryReportRepository>,
}

/// Helper to create test server with in-memory state
async fn create_test_server() -> TestServer {
    let dir = TempDir::new().expect("temp dir");
    let evidence_dir = dir.path().join("evidence");
    let photo_dir = dir.path().join("photos");

    let users = Arc::new(MemoryUserRepository::new());
    let reports = Arc::new(MemoryReportRepository::new());
    let auth_manager = Arc::new(AuthManager::new(
        users,
        PEPPER.to_string(),
        JWT_SECRET.to_string(),
    ));
    let verifier: Arc<dyn IdentityVerifier> = Arc::new(auth_manager.verifier());

    let evidence = Arc::new(ImageStore::open(&evidence_dir, 64 * 1024).await.unwrap());
    let photos = Arc::new(ImageStore::open(&photo_dir, 64 * 1024).await.unwrap());
    let submissions = Arc::new(SubmissionService::new(
        reports.clone(),
        evidence.clone(),
        Arc::new(NoopGeocoder),
    ));

    let state = AppState {
        auth_manager,
        verifier,
        reports: reports.clone(),
        news: Arc::new(MemoryNewsRepository::new()),
        submissions,
        evidence,
        photos,
    };

    let app = create_router(state, cors_layer("http://localhost:3000").unwrap());

    TestServer {
        app,
        _dir: dir,
        evidence_dir,
        photo_dir,
        reports,
    }
}

fn files_in(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Reply {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("JSON body")
    }
}

async fn send(app: &Router, request: Request<Body>) -> Reply {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    Reply {
        status,
        headers,
        body,
    }
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// A file part of a multipart body
struct FilePart<'a> {
    field: &'a str,
    filename: &'a str,
    content_type: &'a str,
    bytes: &'a [u8],
}

fn multipart_request(
    uri: &str,
    token: Option<&str>,
    fields: &[(&str, &str)],
    files: &[FilePart<'_>],
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for file in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                file.field, file.filename, file.content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(file.bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body)).unwrap()
}

fn evidence(filename: &str) -> FilePart<'_> {
    FilePart {
        field: "evidence_images",
        filename,
        content_type: "image/jpeg",
        bytes: JPEG,
    }
}

const REPORT_FIELDS: &[(&str, &str)] = &[
    ("crimeType", "Theft"),
    ("description", "bike stolen"),
    ("locationName", "Lot 4"),
    ("latitude", "12.97"),
    ("longitude", "77.59"),
];

/// Register a user and return a bearer token for it
async fn sign_in(app: &Router, username: &str) -> String {
    let reply = send(
        app,
        json_request(
            "POST",
            "/auth/register",
            None,
            json!({
                "email": format!("{username}@example.org"),
                "username": username,
                "password": "correct horse",
                "name": "Test User",
            }),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{:?}", reply.body);

    let reply = send(
        app,
        json_request(
            "POST",
            "/auth/login",
            None,
            json!({"emailOrUsername": username, "password": "correct horse"}),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    reply.json()["token"].as_str().unwrap().to_string()
}

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check_endpoint() {
    let server = create_test_server().await;

    let reply = send(&server.app, get("/health", None)).await;

    assert_eq!(reply.status, StatusCode::OK);
    let json = reply.json();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["database"], true);
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_request_id_echoed() {
    let server = create_test_server().await;

    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "abc-123")
        .body(Body::empty())
        .unwrap();
    let reply = send(&server.app, request).await;
    assert_eq!(reply.headers["x-request-id"], "abc-123");

    let reply = send(&server.app, get("/health", None)).await;
    assert!(reply.headers.contains_key("x-request-id"));
}

// ============================================================================
// Authentication Tests
// ============================================================================

#[tokio::test]
async fn test_register_and_login() {
    let server = create_test_server().await;

    let reply = send(
        &server.app,
        json_request(
            "POST",
            "/auth/register",
            None,
            json!({
                "email": "Asha@Example.org",
                "username": "asha",
                "password": "correct horse",
                "name": "Asha",
                "phone": "9845012345",
            }),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    let json = reply.json();
    assert_eq!(json["message"], "User registered successfully");
    let id = json["id"].as_i64().unwrap();

    // Email login is case-insensitive
    let reply = send(
        &server.app,
        json_request(
            "POST",
            "/auth/login",
            None,
            json!({"emailOrUsername": "ASHA@example.org", "password": "correct horse"}),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    let json = reply.json();
    assert_eq!(json["message"], "Login successful");
    assert_eq!(json["user"]["id"], id);
    assert_eq!(json["user"]["email"], "asha@example.org");
    assert!(json["user"].get("passwordHash").is_none());
    assert!(json["expiresAt"].is_string());

    let token = json["token"].as_str().unwrap();
    let reply = send(&server.app, get("/api/users/me", Some(token))).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["username"], "asha");
    assert_eq!(reply.json()["phone"], "9845012345");
}

#[tokio::test]
async fn test_duplicate_registration_rejected() {
    let server = create_test_server().await;
    sign_in(&server.app, "ravi").await;

    for body in [
        json!({"email": "RAVI@example.org", "username": "ravi2", "password": "correct horse", "name": "R"}),
        json!({"email": "other@example.org", "username": "ravi", "password": "correct horse", "name": "R"}),
    ] {
        let reply = send(&server.app, json_request("POST", "/auth/register", None, body)).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert!(reply.json()["message"].as_str().unwrap().contains("already exists"));
    }
}

#[tokio::test]
async fn test_registration_validation() {
    let server = create_test_server().await;

    for (body, field) in [
        (json!({"email": "nope", "username": "meera", "password": "correct horse", "name": "M"}), "email"),
        (json!({"email": "m@example.org", "username": "m", "password": "correct horse", "name": "M"}), "username"),
        (json!({"email": "m@example.org", "username": "meera", "password": "short", "name": "M"}), "password"),
        (json!({"email": "m@example.org", "username": "meera", "password": "correct horse"}), "name"),
    ] {
        let reply = send(&server.app, json_request("POST", "/auth/register", None, body)).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.json()["field"], field);
    }
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let server = create_test_server().await;
    sign_in(&server.app, "kiran").await;

    let mut messages = Vec::new();
    for identifier in ["kiran", "nobody"] {
        let reply = send(
            &server.app,
            json_request(
                "POST",
                "/auth/login",
                None,
                json!({"emailOrUsername": identifier, "password": "wrong password"}),
            ),
        )
        .await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
        messages.push(reply.json()["message"].clone());
    }

    assert_eq!(messages[0], messages[1]);
    assert_eq!(messages[0], "Invalid username or password");
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let server = create_test_server().await;

    for token in [None, Some("not-a-jwt")] {
        let reply = send(&server.app, get("/api/users/me", token)).await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
        assert_eq!(reply.json()["message"], "Authentication required");

        let reply = send(
            &server.app,
            json_request("PATCH", "/api/incidents/1", token, json!({"status": "verified"})),
        )
        .await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    }

    let request = Request::builder()
        .uri("/api/users/me")
        .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&server.app, request).await.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_with_photo() {
    let server = create_test_server().await;

    let request = multipart_request(
        "/auth/register",
        None,
        &[
            ("email", "priya@example.org"),
            ("username", "priya"),
            ("password", "correct horse"),
            ("name", "Priya"),
        ],
        &[FilePart {
            field: "photo",
            filename: "me.png",
            content_type: "image/png",
            bytes: b"\x89PNG\r\n\x1a\n",
        }],
    );
    let reply = send(&server.app, request).await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(files_in(&server.photo_dir), 1);

    let reply = send(
        &server.app,
        json_request(
            "POST",
            "/auth/login",
            None,
            json!({"username": "priya", "password": "correct horse"}),
        ),
    )
    .await;
    let photo = reply.json()["user"]["photo"].as_str().unwrap().to_string();
    assert!(photo.ends_with(".png"));

    let reply = send(&server.app, get(&format!("/api/users/photos/{photo}"), None)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.headers[header::CONTENT_TYPE], "image/png");
}

#[tokio::test]
async fn test_failed_registration_discards_photo() {
    let server = create_test_server().await;
    sign_in(&server.app, "dev").await;

    let request = multipart_request(
        "/auth/register",
        None,
        &[
            ("email", "dev@example.org"),
            ("username", "dev_two"),
            ("password", "correct horse"),
            ("name", "Dev"),
        ],
        &[FilePart {
            field: "photo",
            filename: "me.jpg",
            content_type: "image/jpeg",
            bytes: JPEG,
        }],
    );
    let reply = send(&server.app, request).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(files_in(&server.photo_dir), 0);
}

#[tokio::test]
async fn test_invalid_registration_rejected_before_photo_write() {
    let server = create_test_server().await;
    // Any write to the photo store would now fail with an I/O error
    std::fs::remove_dir_all(&server.photo_dir).unwrap();

    let request = multipart_request(
        "/auth/register",
        None,
        &[
            ("email", "lata@example.org"),
            ("username", "l"),
            ("password", "correct horse"),
            ("name", "Lata"),
        ],
        &[FilePart {
            field: "photo",
            filename: "me.jpg",
            content_type: "image/jpeg",
            bytes: JPEG,
        }],
    );
    let reply = send(&server.app, request).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json()["field"], "username");
    assert!(!server.photo_dir.exists());
}

// ============================================================================
// Report Submission Tests
// ============================================================================

#[tokio::test]
async fn test_anonymous_multipart_submission() {
    let server = create_test_server().await;

    let request = multipart_request(
        "/api/crime",
        None,
        REPORT_FIELDS,
        &[evidence("one.jpg"), evidence("two.JPG")],
    );
    let reply = send(&server.app, request).await;
    assert_eq!(reply.status, StatusCode::CREATED, "{:?}", reply.body);

    let json = reply.json();
    assert_eq!(json["success"], true);
    assert_eq!(json["report"]["type"], "Theft");
    assert_eq!(json["report"]["locationName"], "Lot 4");
    assert_eq!(json["report"]["status"], "pending");
    assert!(json["report"]["userId"].is_null());

    let images: Vec<String> = serde_json::from_value(json["evidenceImages"].clone()).unwrap();
    assert_eq!(images.len(), 2);
    assert_eq!(files_in(&server.evidence_dir), 2);

    let reply = send(&server.app, get(&format!("/api/crime/evidence/{}", images[1]), None)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.headers[header::CONTENT_TYPE], "image/jpeg");
    assert_eq!(reply.headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(&reply.body[..], JPEG);

    let id = json["id"].as_i64().unwrap();
    let reply = send(&server.app, get(&format!("/api/crime/{id}"), None)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["evidenceImages"], json["evidenceImages"]);
}

#[tokio::test]
async fn test_signed_in_submission_records_user() {
    let server = create_test_server().await;
    let token = sign_in(&server.app, "latha").await;

    let request = json_request(
        "POST",
        "/api/crime",
        Some(&token),
        json!({
            "type": "assault",
            "description": "near the bus stop",
            "latitude": 12.9,
            "longitude": 77.6,
            "shareIdentity": true,
            "victimName": "Latha",
        }),
    );
    let reply = send(&server.app, request).await;
    assert_eq!(reply.status, StatusCode::CREATED);

    let json = reply.json();
    let report = &json["report"];
    assert_eq!(report["type"], "Assault");
    assert!(report["userId"].is_i64());
    assert_eq!(report["contactName"], "Latha");
    assert_eq!(report["locationName"], "12.9, 77.6");
}

#[tokio::test]
async fn test_invalid_token_on_submission_writes_nothing() {
    let server = create_test_server().await;

    let request = multipart_request(
        "/api/crime",
        Some("forged.token.value"),
        REPORT_FIELDS,
        &[evidence("one.jpg")],
    );
    let reply = send(&server.app, request).await;

    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(files_in(&server.evidence_dir), 0);
    assert!(server.reports.is_empty());
}

#[tokio::test]
async fn test_missing_coordinate_rejected() {
    let server = create_test_server().await;

    let request = multipart_request(
        "/api/crime",
        None,
        &[("crimeType", "Theft"), ("description", "bike stolen"), ("latitude", "12.97")],
        &[evidence("one.jpg")],
    );
    let reply = send(&server.app, request).await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json()["field"], "longitude");
    assert_eq!(files_in(&server.evidence_dir), 0);
    assert!(server.reports.is_empty());
}

#[tokio::test]
async fn test_out_of_range_coordinate_rejected() {
    let server = create_test_server().await;

    let reply = send(
        &server.app,
        json_request(
            "POST",
            "/api/crime",
            None,
            json!({"type": "Theft", "description": "x", "latitude": 91.0, "longitude": 0.0}),
        ),
    )
    .await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json()["field"], "latitude");
    assert!(server.reports.is_empty());
}

#[tokio::test]
async fn test_too_many_images_rejected() {
    let server = create_test_server().await;
    let names: Vec<String> = (0..6).map(|i| format!("{i}.jpg")).collect();
    let files: Vec<FilePart<'_>> = names.iter().map(|n| evidence(n)).collect();

    let reply = send(&server.app, multipart_request("/api/crime", None, REPORT_FIELDS, &files)).await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json()["field"], "evidence_images");
    assert_eq!(files_in(&server.evidence_dir), 0);
}

#[tokio::test]
async fn test_unsupported_image_rejected() {
    let server = create_test_server().await;

    let request = multipart_request(
        "/api/crime",
        None,
        REPORT_FIELDS,
        &[
            evidence("one.jpg"),
            FilePart {
                field: "evidence_images",
                filename: "notes.txt",
                content_type: "text/plain",
                bytes: b"hello",
            },
        ],
    );
    let reply = send(&server.app, request).await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.json()["message"].as_str().unwrap().contains("Unsupported media type"));
    assert_eq!(files_in(&server.evidence_dir), 0);
}

#[tokio::test]
async fn test_failed_row_write_leaves_no_files() {
    let server = create_test_server().await;
    server.reports.set_fail_writes(true);

    let request = multipart_request(
        "/api/crime",
        None,
        REPORT_FIELDS,
        &[evidence("one.jpg"), evidence("two.jpg")],
    );
    let reply = send(&server.app, request).await;

    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.json()["message"], "Internal server error");
    assert_eq!(files_in(&server.evidence_dir), 0);
}

// ============================================================================
// Report Listing Tests
// ============================================================================

#[tokio::test]
async fn test_list_and_filter_reports() {
    let server = create_test_server().await;
    for kind in ["Theft", "Fraud", "theft"] {
        let reply = send(
            &server.app,
            json_request(
                "POST",
                "/api/crime",
                None,
                json!({"type": kind, "description": "d", "latitude": 1.0, "longitude": 1.0}),
            ),
        )
        .await;
        assert_eq!(reply.status, StatusCode::CREATED);
    }

    let all = send(&server.app, get("/api/crime", None)).await.json();
    let ids: Vec<i64> = all.as_array().unwrap().iter().map(|r| r["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, [3, 2, 1], "newest first");

    let thefts = send(&server.app, get("/api/crime?type=THEFT", None)).await.json();
    assert_eq!(thefts.as_array().unwrap().len(), 2);
    assert!(thefts.as_array().unwrap().iter().all(|r| r["type"] == "Theft"));

    let page = send(&server.app, get("/api/crime?limit=1&offset=1", None)).await.json();
    assert_eq!(page[0]["id"], 2);

    let reply = send(&server.app, get("/api/crime?type=Jaywalking", None)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json()["field"], "type");
}

#[tokio::test]
async fn test_missing_report_and_image() {
    let server = create_test_server().await;

    assert_eq!(send(&server.app, get("/api/crime/42", None)).await.status, StatusCode::NOT_FOUND);
    assert_eq!(
        send(&server.app, get("/api/crime/evidence/missing.jpg", None)).await.status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        send(&server.app, get("/api/crime/evidence/..%2F..%2Fetc%2Fpasswd", None)).await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_nearby_reports_nearest_first() {
    let server = create_test_server().await;
    // About 11 m, 2.2 km, 3.3 km and 111 km from the query point
    for (latitude, description) in [(13.03, "far"), (12.98, "near"), (12.9999, "closest"), (14.0, "out")] {
        let reply = send(
            &server.app,
            json_request(
                "POST",
                "/api/crime",
                None,
                json!({"type": "Other", "description": description, "latitude": latitude, "longitude": 77.5}),
            ),
        )
        .await;
        assert_eq!(reply.status, StatusCode::CREATED);
    }

    let reply = send(
        &server.app,
        get("/api/incidents?latitude=13.0&longitude=77.5&radius=5000", None),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);

    let found = reply.json();
    let descriptions: Vec<&str> = found
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["description"].as_str().unwrap())
        .collect();
    assert_eq!(descriptions, ["closest", "near", "far"]);

    let distances: Vec<f64> = found
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["distanceMeters"].as_f64().unwrap())
        .collect();
    assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    assert!(distances.iter().all(|d| *d <= 5000.0));
}

#[tokio::test]
async fn test_nearby_query_validation() {
    let server = create_test_server().await;

    let reply = send(&server.app, get("/api/incidents?longitude=77.5", None)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json()["field"], "latitude");

    let reply = send(
        &server.app,
        get("/api/incidents?latitude=13&longitude=77.5&radius=60000", None),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json()["field"], "radius");

    let reply = send(&server.app, get("/api/incidents?latitude=95&longitude=77.5", None)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_incident_submission_and_status() {
    let server = create_test_server().await;
    let token = sign_in(&server.app, "officer").await;

    let body = json!({"type": "Vandalism", "description": "graffiti", "latitude": 12.0, "longitude": 77.0});
    let reply = send(&server.app, json_request("POST", "/api/incidents", None, body.clone())).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = send(&server.app, json_request("POST", "/api/incidents", Some(&token), body)).await;
    assert_eq!(reply.status, StatusCode::CREATED);
    let id = reply.json()["id"].as_i64().unwrap();

    let uri = format!("/api/incidents/{id}");
    let reply = send(
        &server.app,
        json_request("PATCH", &uri, Some(&token), json!({"status": "verified"})),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["status"], "verified");

    let reply = send(
        &server.app,
        json_request("PATCH", &uri, Some(&token), json!({"status": "closed"})),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json()["field"], "status");

    let reply = send(
        &server.app,
        json_request("PATCH", "/api/incidents/999", Some(&token), json!({"status": "resolved"})),
    )
    .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

// ============================================================================
// News Tests
// ============================================================================

#[tokio::test]
async fn test_news_feed() {
    let server = create_test_server().await;
    let token = sign_in(&server.app, "editor").await;

    let item = json!({
        "title": "Streetlights fixed",
        "description": "MG Road lights are back",
        "source": "BBMP",
        "category": "safety",
        "url": "https://example.org/lights",
    });
    let reply = send(&server.app, json_request("POST", "/api/news", None, item.clone())).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = send(&server.app, json_request("POST", "/api/news", Some(&token), item)).await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.json()["category"], "safety");

    let reply = send(
        &server.app,
        json_request(
            "POST",
            "/api/news",
            Some(&token),
            json!({"title": " ", "description": "d", "source": "s", "category": "crime", "url": "https://x"}),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json()["field"], "title");

    let safety = send(&server.app, get("/api/news?category=safety", None)).await.json();
    assert_eq!(safety.as_array().unwrap().len(), 1);
    let crime = send(&server.app, get("/api/news?category=crime", None)).await.json();
    assert!(crime.as_array().unwrap().is_empty());

    let reply = send(&server.app, get("/api/news?category=gossip", None)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}
