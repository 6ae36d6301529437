//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use axum::http::HeaderValue;
use namma_suraksha::{
    auth::{JwksConfig, jwks::FIREBASE_JWKS_URL, manager::DEFAULT_TOKEN_DURATION_SECS},
    db::DatabaseConfig,
    evidence::DEFAULT_MAX_IMAGE_BYTES,
    geocode::{DEFAULT_USER_AGENT, NOMINATIM_REVERSE_URL},
    reports::{DEFAULT_MAX_IMAGES, ReportTypes},
};
use std::{net::SocketAddr, path::PathBuf};

/// Default listen address
pub const DEFAULT_BIND: &str = "127.0.0.1:5000";

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Security configuration
    pub security: SecurityConfig,
    /// Who issues the bearer tokens protected routes accept
    pub auth_provider: AuthProvider,
    /// Evidence and profile photo storage
    pub storage: StorageConfig,
    /// Accepted report types
    pub report_types: ReportTypes,
    /// Reverse geocoding endpoint; `None` disables lookups
    pub geocoder: Option<GeocoderConfig>,
    /// Browser origin allowed to call the API
    pub cors_allowed_origin: String,
    /// Return detailed internal errors to clients
    pub development: bool,
    /// Prometheus exporter address, when enabled
    pub metrics_bind: Option<SocketAddr>,
}

/// Security-related configuration
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// JWT signing secret (required)
    pub jwt_secret: String,
    /// Password hashing pepper (required)
    pub password_pepper: String,
    /// Access token lifetime in seconds
    pub token_expiry_secs: i64,
}

/// Source of bearer tokens
#[derive(Debug, Clone)]
pub enum AuthProvider {
    /// Tokens signed by this server at login
    Local,
    /// Tokens issued by an external identity provider
    Jwks(JwksConfig),
}

/// Image storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub evidence_dir: PathBuf,
    pub photo_dir: PathBuf,
    /// Per-file size ceiling in bytes
    pub max_image_bytes: usize,
    /// Evidence images allowed per report
    pub max_evidence_images: usize,
}

/// Reverse geocoder configuration
#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    pub url: String,
    pub user_agent: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    ///
    /// # Returns
    ///
    /// * `Result<ServerConfig, ConfigError>` - Loaded configuration or error
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        // Bind address
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_addr("SERVER_BIND", &env_or("SERVER_BIND", DEFAULT_BIND))?,
        };

        // Database configuration
        let mut database = DatabaseConfig::from_env().map_err(|e| ConfigError::Invalid {
            var: e.var.to_string(),
            reason: format!("Must be a number, got {:?}", e.value),
        })?;
        if let Some(url) = database_url_override {
            database.database_url = url;
        }

        // Security configuration (REQUIRED)
        let jwt_secret = std::env::var("JWT_SECRET").map_err(|_| ConfigError::MissingRequired {
            var: "JWT_SECRET".to_string(),
            hint: "Generate with: openssl rand -hex 32".to_string(),
        })?;

        let password_pepper =
            std::env::var("PASSWORD_PEPPER").map_err(|_| ConfigError::MissingRequired {
                var: "PASSWORD_PEPPER".to_string(),
                hint: "Generate with: openssl rand -hex 16".to_string(),
            })?;

        let security = SecurityConfig {
            jwt_secret,
            password_pepper,
            token_expiry_secs: parse_env_or("JWT_EXPIRY_SECS", DEFAULT_TOKEN_DURATION_SECS),
        };

        let auth_provider = match env_or("AUTH_PROVIDER", "local").to_lowercase().as_str() {
            "local" => AuthProvider::Local,
            "jwks" | "firebase" => AuthProvider::Jwks(JwksConfig {
                jwks_url: env_or("AUTH_JWKS_URL", FIREBASE_JWKS_URL),
                issuer: required("AUTH_ISSUER", "e.g. https://securetoken.google.com/<project>")?,
                audience: required("AUTH_AUDIENCE", "e.g. the identity provider project id")?,
            }),
            other => {
                return Err(ConfigError::Invalid {
                    var: "AUTH_PROVIDER".to_string(),
                    reason: format!("Expected local or jwks, got {other:?}"),
                });
            }
        };

        let storage = StorageConfig {
            evidence_dir: env_or("EVIDENCE_DIR", "uploads/evidence").into(),
            photo_dir: env_or("PHOTO_DIR", "uploads/photos").into(),
            max_image_bytes: parse_env_or("MAX_IMAGE_BYTES", DEFAULT_MAX_IMAGE_BYTES),
            max_evidence_images: parse_env_or("MAX_EVIDENCE_IMAGES", DEFAULT_MAX_IMAGES),
        };

        let report_types = std::env::var("REPORT_TYPES")
            .map(|list| ReportTypes::from_csv(&list))
            .unwrap_or_default();

        // Empty GEOCODER_URL turns lookups off
        let geocoder_url = env_or("GEOCODER_URL", NOMINATIM_REVERSE_URL);
        let geocoder = (!geocoder_url.trim().is_empty()).then(|| GeocoderConfig {
            url: geocoder_url,
            user_agent: env_or("GEOCODER_USER_AGENT", DEFAULT_USER_AGENT),
        });

        let metrics_bind = match std::env::var("METRICS_BIND") {
            Ok(addr) if !addr.trim().is_empty() => Some(parse_addr("METRICS_BIND", &addr)?),
            _ => None,
        };

        Ok(ServerConfig {
            bind,
            database,
            security,
            auth_provider,
            storage,
            report_types,
            geocoder,
            cors_allowed_origin: env_or("CORS_ALLOWED_ORIGIN", "http://localhost:3000"),
            development: env_or("APP_ENV", "production").eq_ignore_ascii_case("development"),
            metrics_bind,
        })
    }

    /// Validate configuration after loading
    ///
    /// # Returns
    ///
    /// * `Result<(), ConfigError>` - Success or validation error
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate security params
        if self.security.jwt_secret.len() < 32 {
            return Err(ConfigError::Invalid {
                var: "JWT_SECRET".to_string(),
                reason: "Must be at least 32 characters (128-bit security)".to_string(),
            });
        }

        if self.security.password_pepper.len() < 16 {
            return Err(ConfigError::Invalid {
                var: "PASSWORD_PEPPER".to_string(),
                reason: "Must be at least 16 characters (64-bit security)".to_string(),
            });
        }

        if self.security.token_expiry_secs <= 0 {
            return Err(ConfigError::Invalid {
                var: "JWT_EXPIRY_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.storage.max_image_bytes == 0 {
            return Err(ConfigError::Invalid {
                var: "MAX_IMAGE_BYTES".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if !(1..=20).contains(&self.storage.max_evidence_images) {
            return Err(ConfigError::Invalid {
                var: "MAX_EVIDENCE_IMAGES".to_string(),
                reason: "Must be between 1 and 20".to_string(),
            });
        }

        if self.storage.evidence_dir == self.storage.photo_dir {
            return Err(ConfigError::Invalid {
                var: "PHOTO_DIR".to_string(),
                reason: "Must differ from EVIDENCE_DIR".to_string(),
            });
        }

        if HeaderValue::from_str(&self.cors_allowed_origin).is_err() {
            return Err(ConfigError::Invalid {
                var: "CORS_ALLOWED_ORIGIN".to_string(),
                reason: "Must be a valid origin such as https://example.org".to_string(),
            });
        }

        if let AuthProvider::Jwks(jwks) = &self.auth_provider {
            if !jwks.jwks_url.starts_with("https://") && !self.development {
                return Err(ConfigError::Invalid {
                    var: "AUTH_JWKS_URL".to_string(),
                    reason: "Must use https outside development".to_string(),
                });
            }
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn required(key: &str, hint: &str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingRequired {
            var: key.to_string(),
            hint: hint.to_string(),
        })
}

fn parse_addr(key: &str, value: &str) -> Result<SocketAddr, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        var: key.to_string(),
        reason: format!("Expected IP:PORT, got {value:?}"),
    })
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
