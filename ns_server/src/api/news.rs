//! Safety news handlers.

use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use namma_suraksha::news::{NewNewsItem, NewsCategory, NewsItem};
use serde::Deserialize;

use super::{AppState, error::ApiResult, middleware::CurrentIdentity};

#[derive(Debug, Deserialize)]
pub struct NewsQuery {
    pub category: Option<String>,
}

/// Latest news, optionally for one category
pub async fn list_news(
    State(state): State<AppState>,
    query: Result<Query<NewsQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<NewsItem>>> {
    let Query(query) = query?;
    let category = match query.category.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(name) => Some(name.parse::<NewsCategory>()?),
    };

    Ok(Json(state.news.list(category).await?))
}

/// Publish a news item
pub async fn create_news(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    payload: Result<Json<NewNewsItem>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<NewsItem>)> {
    let Json(item) = payload?;
    let item = state.news.create(item.validated()?).await?;

    tracing::info!(news_id = item.id, by = %identity.subject, "News item published");
    Ok((StatusCode::CREATED, Json(item)))
}
