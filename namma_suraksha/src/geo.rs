//! Coordinates, great-circle distances and search boxes.

use serde::Serialize;
use thiserror::Error;

/// Mean Earth radius in metres (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Coordinate validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    #[error("latitude must be between -90 and 90, got {0}")]
    LatitudeOutOfRange(f64),

    #[error("longitude must be between -180 and 180, got {0}")]
    LongitudeOutOfRange(f64),
}

impl GeoError {
    /// Name of the offending field, as it appears on the wire
    pub fn field(&self) -> &'static str {
        match self {
            GeoError::LatitudeOutOfRange(_) => "latitude",
            GeoError::LongitudeOutOfRange(_) => "longitude",
        }
    }
}

/// A validated WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

impl GeoPoint {
    /// Create a point, rejecting NaN and values outside the valid ranges.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
        // NaN fails both comparisons, so it is rejected here too
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(GeoError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(GeoError::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Great-circle distance in metres using the haversine formula.
    pub fn distance_m(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().min(1.0).asin();
        EARTH_RADIUS_M * c
    }

    /// Smallest lat/lon rectangle containing every point within `radius_m`.
    ///
    /// The box is a cheap prefilter; callers still check the exact distance.
    /// Near the poles, or when the box would cross the antimeridian, the
    /// longitude range widens to the whole globe.
    pub fn bounding_box(&self, radius_m: f64) -> BoundingBox {
        let dlat = (radius_m / EARTH_RADIUS_M).to_degrees();
        let min_lat = (self.latitude - dlat).max(-90.0);
        let max_lat = (self.latitude + dlat).min(90.0);

        // Widest longitude offset of the circle: asin(sin(r) / cos(lat))
        let ratio = (radius_m / EARTH_RADIUS_M).sin() / self.latitude.to_radians().cos();
        if min_lat <= -90.0 || max_lat >= 90.0 || !(0.0..1.0).contains(&ratio) {
            return BoundingBox {
                min_lat,
                max_lat,
                min_lon: -180.0,
                max_lon: 180.0,
            };
        }

        let dlon = ratio.asin().to_degrees();
        let min_lon = self.longitude - dlon;
        let max_lon = self.longitude + dlon;
        if min_lon < -180.0 || max_lon > 180.0 {
            return BoundingBox {
                min_lat,
                max_lat,
                min_lon: -180.0,
                max_lon: 180.0,
            };
        }

        BoundingBox {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        }
    }

    /// Human-readable `"lat, lon"` label used when no place name is known.
    pub fn label(&self) -> String {
        format!("{}, {}", self.latitude, self.longitude)
    }
}

/// Inclusive latitude/longitude rectangle in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn contains(&self, point: &GeoPoint) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.latitude)
            && (self.min_lon..=self.max_lon).contains(&point.longitude)
    }
}
