//! Repository trait definitions for testability and dependency injection.
//!
//! Services depend on these traits rather than on a pool, so tests can swap
//! in the in-memory implementations from [`super::memory`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};

use super::timeouts::{TimeoutError, with_default_timeout};
use crate::auth::{AuthError, AuthResult, NewUser, User, UserCredentials, UserId};
use crate::geo::GeoPoint;
use crate::news::{NEWS_PAGE_SIZE, NewNewsItem, NewsCategory, NewsItem, NewsResult};
use crate::reports::{
    IncidentReport, NearbyReport, NewReport, ReportFilter, ReportId, ReportResult, ReportStatus,
    ReportType,
};

/// Trait for user/credential repository operations
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user
    ///
    /// # Errors
    ///
    /// * `AuthError::EmailTaken` / `AuthError::UsernameTaken` - Uniqueness violated
    async fn create_user(&self, user: NewUser) -> AuthResult<UserId>;

    /// Find a user by username (exact) or email (case-insensitive)
    async fn find_by_identifier(&self, identifier: &str) -> AuthResult<Option<UserCredentials>>;

    /// Find user by ID
    async fn find_by_id(&self, user_id: UserId) -> AuthResult<Option<User>>;
}

/// Trait for incident report repository operations
#[async_trait]
pub trait ReportRepository: Send + Sync {
    /// Check the backing store is reachable
    async fn ping(&self) -> ReportResult<()>;

    /// Insert a report; id and timestamp are assigned by the store
    async fn create(&self, report: NewReport) -> ReportResult<IncidentReport>;

    /// Reports newest first
    async fn list(&self, filter: &ReportFilter) -> ReportResult<Vec<IncidentReport>>;

    /// Find report by ID
    async fn get(&self, id: ReportId) -> ReportResult<Option<IncidentReport>>;

    /// Reports within `radius_m` of `point`, nearest first
    async fn list_near(&self, point: GeoPoint, radius_m: f64) -> ReportResult<Vec<NearbyReport>>;

    /// Change a report's review status
    async fn update_status(
        &self,
        id: ReportId,
        status: ReportStatus,
    ) -> ReportResult<Option<IncidentReport>>;
}

/// Trait for news feed repository operations
#[async_trait]
pub trait NewsRepository: Send + Sync {
    /// Latest items, optionally restricted to one category
    async fn list(&self, category: Option<NewsCategory>) -> NewsResult<Vec<NewsItem>>;

    /// Publish an item
    async fn create(&self, item: NewNewsItem) -> NewsResult<NewsItem>;
}

/// Attach distances to candidate reports, drop those outside the radius and
/// order the rest nearest first (ties broken by recency).
pub fn rank_by_distance(
    point: &GeoPoint,
    radius_m: f64,
    candidates: impl IntoIterator<Item = IncidentReport>,
) -> Vec<NearbyReport> {
    let mut nearby: Vec<NearbyReport> = candidates
        .into_iter()
        .filter_map(|report| {
            let distance_meters = report.point()?.distance_m(point);
            (distance_meters <= radius_m).then_some(NearbyReport {
                report,
                distance_meters,
            })
        })
        .collect();

    nearby.sort_by(|a, b| {
        a.distance_meters
            .total_cmp(&b.distance_meters)
            .then_with(|| b.report.created_at.cmp(&a.report.created_at))
            .then_with(|| b.report.id.cmp(&a.report.id))
    });
    nearby
}

const USER_COLUMNS: &str = "id, email, username, name, phone, photo, created_at";

const REPORT_COLUMNS: &str = "id, report_type, description, location_name, latitude, longitude, \
     evidence, witnesses, evidence_images, status, user_id, share_identity, contact_name, \
     contact_phone, created_at";

fn user_from_row(r: &PgRow) -> User {
    User {
        id: r.get("id"),
        email: r.get("email"),
        username: r.get("username"),
        name: r.get("name"),
        phone: r.get("phone"),
        photo: r.get("photo"),
        created_at: r.get::<DateTime<Utc>, _>("created_at"),
    }
}

fn report_from_row(r: &PgRow) -> IncidentReport {
    let status: String = r.get("status");
    IncidentReport {
        id: r.get("id"),
        report_type: ReportType::from_stored(r.get("report_type")),
        description: r.get("description"),
        location_name: r.get("location_name"),
        latitude: r.get("latitude"),
        longitude: r.get("longitude"),
        evidence: r.get("evidence"),
        witnesses: r.get("witnesses"),
        evidence_images: r.get("evidence_images"),
        status: status.parse().unwrap_or_default(),
        user_id: r.get("user_id"),
        share_identity: r.get("share_identity"),
        contact_name: r.get("contact_name"),
        contact_phone: r.get("contact_phone"),
        created_at: r.get::<DateTime<Utc>, _>("created_at"),
    }
}

fn news_from_row(r: &PgRow) -> NewsItem {
    let category: String = r.get("category");
    NewsItem {
        id: r.get("id"),
        title: r.get("title"),
        description: r.get("description"),
        source: r.get("source"),
        category: category.parse().unwrap_or(NewsCategory::Safety),
        url: r.get("url"),
        created_at: r.get::<DateTime<Utc>, _>("created_at"),
    }
}

/// Map a unique-constraint violation on `users` to the matching conflict
fn user_conflict(err: sqlx::Error) -> AuthError {
    let conflict = match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            match db_err.constraint() {
                Some("users_email_key") => Some(AuthError::EmailTaken),
                Some("users_username_key") => Some(AuthError::UsernameTaken),
                _ => None,
            }
        }
        _ => None,
    };
    conflict.unwrap_or(AuthError::Database(err))
}

/// Default PostgreSQL implementation of `UserRepository`
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create_user(&self, user: NewUser) -> AuthResult<UserId> {
        let insert = sqlx::query(
            "INSERT INTO users (email, username, password_hash, name, phone, photo)
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
        )
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(&user.phone)
        .bind(&user.photo)
        .fetch_one(&self.pool);

        match with_default_timeout(insert).await {
            Ok(row) => Ok(row.get("id")),
            Err(TimeoutError::Database(e)) => Err(user_conflict(e)),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_identifier(&self, identifier: &str) -> AuthResult<Option<UserCredentials>> {
        let sql = format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users
             WHERE username = $1 OR email = lower($1)
             ORDER BY (username = $1) DESC
             LIMIT 1"
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(identifier)
                .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.map(|r| UserCredentials {
            user: user_from_row(&r),
            password_hash: r.get("password_hash"),
        }))
    }

    async fn find_by_id(&self, user_id: UserId) -> AuthResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(user_id)
                .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }
}

/// Default PostgreSQL implementation of `ReportRepository`
pub struct PgReportRepository {
    pool: PgPool,
}

impl PgReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportRepository for PgReportRepository {
    async fn ping(&self) -> ReportResult<()> {
        with_default_timeout(sqlx::query("SELECT 1").execute(&self.pool)).await?;
        Ok(())
    }

    async fn create(&self, report: NewReport) -> ReportResult<IncidentReport> {
        let sql = format!(
            "INSERT INTO crime_reports
                (report_type, description, location_name, latitude, longitude, evidence,
                 witnesses, evidence_images, status, user_id, share_identity, contact_name,
                 contact_phone)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             RETURNING {REPORT_COLUMNS}"
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(report.report_type.as_str())
                .bind(&report.description)
                .bind(&report.location_name)
                .bind(report.point.latitude())
                .bind(report.point.longitude())
                .bind(&report.evidence)
                .bind(&report.witnesses)
                .bind(&report.evidence_images)
                .bind(ReportStatus::Pending.as_str())
                .bind(report.user_id)
                .bind(report.share_identity)
                .bind(&report.contact_name)
                .bind(&report.contact_phone)
                .fetch_one(&self.pool),
        )
        .await?;

        Ok(report_from_row(&row))
    }

    async fn list(&self, filter: &ReportFilter) -> ReportResult<Vec<IncidentReport>> {
        // LIMIT NULL means no limit in PostgreSQL
        let sql = format!(
            "SELECT {REPORT_COLUMNS} FROM crime_reports
             WHERE ($1::TEXT IS NULL OR report_type = $1)
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        );
        let rows = with_default_timeout(
            sqlx::query(&sql)
                .bind(filter.report_type.as_ref().map(ReportType::as_str))
                .bind(filter.limit.map(i64::from))
                .bind(i64::from(filter.offset.unwrap_or(0)))
                .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows.iter().map(report_from_row).collect())
    }

    async fn get(&self, id: ReportId) -> ReportResult<Option<IncidentReport>> {
        let sql = format!("SELECT {REPORT_COLUMNS} FROM crime_reports WHERE id = $1");
        let row = with_default_timeout(sqlx::query(&sql).bind(id).fetch_optional(&self.pool))
            .await?;

        Ok(row.as_ref().map(report_from_row))
    }

    async fn list_near(&self, point: GeoPoint, radius_m: f64) -> ReportResult<Vec<NearbyReport>> {
        let bbox = point.bounding_box(radius_m);
        let sql = format!(
            "SELECT {REPORT_COLUMNS} FROM crime_reports
             WHERE latitude BETWEEN $1 AND $2 AND longitude BETWEEN $3 AND $4"
        );
        let rows = with_default_timeout(
            sqlx::query(&sql)
                .bind(bbox.min_lat)
                .bind(bbox.max_lat)
                .bind(bbox.min_lon)
                .bind(bbox.max_lon)
                .fetch_all(&self.pool),
        )
        .await?;

        Ok(rank_by_distance(
            &point,
            radius_m,
            rows.iter().map(report_from_row),
        ))
    }

    async fn update_status(
        &self,
        id: ReportId,
        status: ReportStatus,
    ) -> ReportResult<Option<IncidentReport>> {
        let sql = format!(
            "UPDATE crime_reports SET status = $2 WHERE id = $1 RETURNING {REPORT_COLUMNS}"
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(id)
                .bind(status.as_str())
                .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.as_ref().map(report_from_row))
    }
}

/// Default PostgreSQL implementation of `NewsRepository`
pub struct PgNewsRepository {
    pool: PgPool,
}

impl PgNewsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NewsRepository for PgNewsRepository {
    async fn list(&self, category: Option<NewsCategory>) -> NewsResult<Vec<NewsItem>> {
        let rows = with_default_timeout(
            sqlx::query(
                "SELECT id, title, description, source, category, url, created_at FROM news
                 WHERE ($1::TEXT IS NULL OR category = $1)
                 ORDER BY created_at DESC, id DESC
                 LIMIT $2",
            )
            .bind(category.map(|c| c.as_str()))
            .bind(i64::from(NEWS_PAGE_SIZE))
            .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows.iter().map(news_from_row).collect())
    }

    async fn create(&self, item: NewNewsItem) -> NewsResult<NewsItem> {
        let item = item.validated()?;
        let row = with_default_timeout(
            sqlx::query(
                "INSERT INTO news (title, description, source, category, url)
                 VALUES ($1, $2, $3, $4, $5)
                 RETURNING id, title, description, source, category, url, created_at",
            )
            .bind(&item.title)
            .bind(&item.description)
            .bind(&item.source)
            .bind(item.category.as_str())
            .bind(&item.url)
            .fetch_one(&self.pool),
        )
        .await?;

        Ok(news_from_row(&row))
    }
}
