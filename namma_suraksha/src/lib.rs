//! # Namma Suraksha
//!
//! Core library for a community incident-reporting service.
//!
//! Residents register an account, sign in with a bearer token and submit
//! geotagged incident reports, optionally with photos as evidence. Reports
//! can be listed newest first, filtered by type, fetched by id, or queried
//! around a point on the map.
//!
//! ## Core Modules
//!
//! - [`auth`]: Registration, login, access tokens and identity verification
//! - [`reports`]: Incident report models and the submission workflow
//! - [`evidence`]: Disk-backed image storage with scoped rollback
//! - [`geo`]: Coordinates, distances and bounding boxes
//! - [`geocode`]: Best-effort reverse geocoding of report locations
//! - [`news`]: Safety news feed
//! - [`db`]: PostgreSQL pool, migrations and repositories
//!
//! ## Example
//!
//! ```
//! use namma_suraksha::geo::GeoPoint;
//!
//! let lot_four = GeoPoint::new(12.97, 77.59).unwrap();
//! let station = GeoPoint::new(12.98, 77.60).unwrap();
//! assert!(lot_four.distance_m(&station) < 2_000.0);
//! ```

/// Authentication: credentials, access tokens and identity verification.
pub mod auth;

/// PostgreSQL connection pool and repositories.
pub mod db;

/// Evidence image storage.
pub mod evidence;

/// Geographic primitives.
pub mod geo;

/// Reverse geocoding.
pub mod geocode;

/// Safety news feed.
pub mod news;

/// Incident reports and submission.
pub mod reports;

pub use auth::{AuthError, AuthManager, Identity, IdentityVerifier};
pub use evidence::{ImageStore, StagedImages, StorageError};
pub use geo::GeoPoint;
pub use reports::{IncidentReport, ReportError, SubmissionService};
