//! In-memory repositories for tests that should not need PostgreSQL.
//!
//! Behaviour mirrors the PostgreSQL implementations closely enough for
//! service and HTTP tests: uniqueness is enforced on insert, ids are
//! assigned sequentially and lists come back in the same order.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::{
    Mutex, MutexGuard, PoisonError,
    atomic::{AtomicBool, Ordering},
};

use super::repository::{NewsRepository, ReportRepository, UserRepository, rank_by_distance};
use crate::auth::{AuthError, AuthResult, NewUser, User, UserCredentials, UserId};
use crate::geo::GeoPoint;
use crate::news::{NEWS_PAGE_SIZE, NewNewsItem, NewsCategory, NewsItem, NewsResult};
use crate::reports::{
    IncidentReport, NearbyReport, NewReport, ReportError, ReportFilter, ReportId, ReportResult,
    ReportStatus,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory `UserRepository`
#[derive(Default)]
pub struct MemoryUserRepository {
    users: Mutex<Vec<UserCredentials>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users
    pub fn len(&self) -> usize {
        lock(&self.users).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create_user(&self, user: NewUser) -> AuthResult<UserId> {
        let mut users = lock(&self.users);

        if users.iter().any(|u| u.user.email == user.email) {
            return Err(AuthError::EmailTaken);
        }
        if users.iter().any(|u| u.user.username == user.username) {
            return Err(AuthError::UsernameTaken);
        }

        let id = users.len() as UserId + 1;
        users.push(UserCredentials {
            user: User {
                id,
                email: user.email,
                username: user.username,
                name: user.name,
                phone: user.phone,
                photo: user.photo,
                created_at: Utc::now(),
            },
            password_hash: user.password_hash,
        });

        Ok(id)
    }

    async fn find_by_identifier(&self, identifier: &str) -> AuthResult<Option<UserCredentials>> {
        let users = lock(&self.users);
        let email = identifier.to_lowercase();

        Ok(users
            .iter()
            .find(|u| u.user.username == identifier)
            .or_else(|| users.iter().find(|u| u.user.email == email))
            .cloned())
    }

    async fn find_by_id(&self, user_id: UserId) -> AuthResult<Option<User>> {
        Ok(lock(&self.users)
            .iter()
            .find(|u| u.user.id == user_id)
            .map(|u| u.user.clone()))
    }
}

/// In-memory `ReportRepository`
#[derive(Default)]
pub struct MemoryReportRepository {
    reports: Mutex<Vec<IncidentReport>>,
    fail_writes: AtomicBool,
}

impl MemoryReportRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `create` fail as a lost database would
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of stored reports
    pub fn len(&self) -> usize {
        lock(&self.reports).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn newest_first(reports: &[IncidentReport]) -> Vec<IncidentReport> {
        let mut sorted = reports.to_vec();
        sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        sorted
    }
}

#[async_trait]
impl ReportRepository for MemoryReportRepository {
    async fn ping(&self) -> ReportResult<()> {
        Ok(())
    }

    async fn create(&self, report: NewReport) -> ReportResult<IncidentReport> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ReportError::Database(sqlx::Error::PoolClosed));
        }

        let mut reports = lock(&self.reports);
        let stored = IncidentReport {
            id: reports.len() as ReportId + 1,
            report_type: report.report_type,
            description: report.description,
            location_name: report.location_name,
            latitude: report.point.latitude(),
            longitude: report.point.longitude(),
            evidence: report.evidence,
            witnesses: report.witnesses,
            evidence_images: report.evidence_images,
            status: ReportStatus::Pending,
            user_id: report.user_id,
            share_identity: report.share_identity,
            contact_name: report.contact_name,
            contact_phone: report.contact_phone,
            created_at: Utc::now(),
        };
        reports.push(stored.clone());

        Ok(stored)
    }

    async fn list(&self, filter: &ReportFilter) -> ReportResult<Vec<IncidentReport>> {
        let reports = lock(&self.reports);
        let offset = filter.offset.unwrap_or(0) as usize;
        let limit = filter.limit.map_or(usize::MAX, |l| l as usize);

        Ok(Self::newest_first(&reports)
            .into_iter()
            .filter(|r| {
                filter
                    .report_type
                    .as_ref()
                    .is_none_or(|t| &r.report_type == t)
            })
            .skip(offset)
            .take(limit)
            .collect())
    }

    async fn get(&self, id: ReportId) -> ReportResult<Option<IncidentReport>> {
        Ok(lock(&self.reports).iter().find(|r| r.id == id).cloned())
    }

    async fn list_near(&self, point: GeoPoint, radius_m: f64) -> ReportResult<Vec<NearbyReport>> {
        let reports = lock(&self.reports);
        let bbox = point.bounding_box(radius_m);
        let candidates = reports
            .iter()
            .filter(|r| r.point().is_some_and(|p| bbox.contains(&p)))
            .cloned();

        Ok(rank_by_distance(&point, radius_m, candidates))
    }

    async fn update_status(
        &self,
        id: ReportId,
        status: ReportStatus,
    ) -> ReportResult<Option<IncidentReport>> {
        let mut reports = lock(&self.reports);
        Ok(reports.iter_mut().find(|r| r.id == id).map(|r| {
            r.status = status;
            r.clone()
        }))
    }
}

/// In-memory `NewsRepository`
#[derive(Default)]
pub struct MemoryNewsRepository {
    items: Mutex<Vec<NewsItem>>,
}

impl MemoryNewsRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NewsRepository for MemoryNewsRepository {
    async fn list(&self, category: Option<NewsCategory>) -> NewsResult<Vec<NewsItem>> {
        let items = lock(&self.items);
        Ok(items
            .iter()
            .rev()
            .filter(|item| category.is_none_or(|c| item.category == c))
            .take(NEWS_PAGE_SIZE as usize)
            .cloned()
            .collect())
    }

    async fn create(&self, item: NewNewsItem) -> NewsResult<NewsItem> {
        let item = item.validated()?;
        let mut items = lock(&self.items);
        let stored = NewsItem {
            id: items.len() as i64 + 1,
            title: item.title,
            description: item.description,
            source: item.source,
            category: item.category,
            url: item.url,
            created_at: Utc::now(),
        };
        items.push(stored.clone());
        Ok(stored)
    }
}
