//! Reverse geocoding: turning coordinates into a place name.
//!
//! Lookups are best-effort. Callers fall back to [`GeoPoint::label`] when a
//! lookup fails or no geocoder is configured.

use crate::geo::GeoPoint;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Public OpenStreetMap reverse geocoding endpoint
pub const NOMINATIM_REVERSE_URL: &str = "https://nominatim.openstreetmap.org/reverse";

/// Identifies this service to the geocoding provider
pub const DEFAULT_USER_AGENT: &str = "NammaSuraksha/1.0";

/// Upper bound on a single lookup
pub const GEOCODE_TIMEOUT: Duration = Duration::from_secs(5);

/// Reverse geocoding errors
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Geocoding request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Geocoder returned status {0}")]
    Status(u16),

    #[error("Geocoder found no place name")]
    NoResult,
}

/// Resolves a human-readable name for a coordinate
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn reverse(&self, point: GeoPoint) -> Result<String, GeocodeError>;
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    display_name: Option<String>,
}

/// Nominatim (OpenStreetMap) reverse geocoder
pub struct NominatimGeocoder {
    base_url: String,
    client: reqwest::Client,
}

impl NominatimGeocoder {
    /// Create a geocoder for a Nominatim-compatible `/reverse` endpoint
    ///
    /// # Arguments
    ///
    /// * `base_url` - Full URL of the reverse endpoint
    /// * `user_agent` - Sent on every request, as the provider's usage policy requires
    pub fn new(base_url: impl Into<String>, user_agent: &str) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .timeout(GEOCODE_TIMEOUT)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn reverse(&self, point: GeoPoint) -> Result<String, GeocodeError> {
        log::debug!("Reverse geocoding {}", point.label());

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("format", "json".to_string()),
                ("lat", point.latitude().to_string()),
                ("lon", point.longitude().to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GeocodeError::Status(response.status().as_u16()));
        }

        let body: ReverseResponse = response.json().await?;
        body.display_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .ok_or(GeocodeError::NoResult)
    }
}

/// Geocoder used when lookups are disabled; always fails so callers fall back
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopGeocoder;

#[async_trait]
impl Geocoder for NoopGeocoder {
    async fn reverse(&self, _point: GeoPoint) -> Result<String, GeocodeError> {
        Err(GeocodeError::NoResult)
    }
}

/// Resolve a place name, falling back to the raw coordinates
pub async fn place_name(geocoder: &dyn Geocoder, point: GeoPoint) -> String {
    match geocoder.reverse(point).await {
        Ok(name) => name,
        Err(GeocodeError::NoResult) => point.label(),
        Err(e) => {
            log::warn!("Reverse geocoding failed, using coordinates: {}", e);
            point.label()
        }
    }
}
