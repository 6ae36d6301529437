//! Safety news feed.

use crate::db::timeouts::TimeoutError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{str::FromStr, time::Duration};
use thiserror::Error;

/// Most items a single feed request returns
pub const NEWS_PAGE_SIZE: u32 = 50;

/// News item category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NewsCategory {
    Crime,
    Accident,
    Safety,
}

impl NewsCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NewsCategory::Crime => "crime",
            NewsCategory::Accident => "accident",
            NewsCategory::Safety => "safety",
        }
    }
}

impl FromStr for NewsCategory {
    type Err = NewsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "crime" => Ok(NewsCategory::Crime),
            "accident" => Ok(NewsCategory::Accident),
            "safety" => Ok(NewsCategory::Safety),
            _ => Err(NewsError::validation(
                "category",
                "category must be one of crime, accident or safety",
            )),
        }
    }
}

/// A published news item
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub source: String,
    pub category: NewsCategory,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// News item as posted by a client
#[derive(Debug, Clone, Deserialize)]
pub struct NewNewsItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub source: String,
    pub category: NewsCategory,
    #[serde(default)]
    pub url: String,
}

impl NewNewsItem {
    /// Trim every field and reject blanks
    pub fn validated(self) -> NewsResult<Self> {
        let title = required("title", self.title)?;
        let description = required("description", self.description)?;
        let source = required("source", self.source)?;
        let url = required("url", self.url)?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(NewsError::validation("url", "url must be an http(s) link"));
        }

        Ok(Self {
            title,
            description,
            source,
            category: self.category,
            url,
        })
    }
}

fn required(field: &'static str, value: String) -> NewsResult<String> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(NewsError::validation(field, format!("{field} is required")));
    }
    Ok(value)
}

/// News feed errors
#[derive(Debug, Error)]
pub enum NewsError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Database call exceeded its deadline
    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    /// A posted field is missing or malformed
    #[error("{message}")]
    Validation {
        field: &'static str,
        message: String,
    },
}

impl NewsError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        NewsError::Validation {
            field,
            message: message.into(),
        }
    }

    /// Get a client-safe error message
    pub fn client_message(&self) -> String {
        match self {
            NewsError::Database(_) | NewsError::Timeout(_) => "Internal server error".to_string(),
            NewsError::Validation { message, .. } => message.clone(),
        }
    }
}

impl From<TimeoutError> for NewsError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Timeout(d) => NewsError::Timeout(d),
            TimeoutError::Database(e) => NewsError::Database(e),
        }
    }
}

/// Result type for news operations
pub type NewsResult<T> = Result<T, NewsError>;
