//! Record store seam.
//!
//! Handlers and services only talk to [`LogStore`] and [`UserStore`]; the
//! backend behind them is chosen at startup (`STORE_BACKEND`). Both backends
//! enforce at most one log per `(user_id, date)` themselves, so a racing
//! pair of submits cannot both land.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::models::daily_log::{DailyLogRecord, LogFields, NewDailyLog};
use crate::models::user::{NewUser, User};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("a log for {0} already exists")]
    DuplicateDate(NaiveDate),

    #[error("email already registered")]
    DuplicateEmail,

    #[error("record not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Which of a user's logs to fetch.
#[derive(Debug, Clone, Copy)]
pub struct LogFilter {
    pub user_id: Uuid,
    pub date: Option<NaiveDate>,
}

impl LogFilter {
    pub fn user(user_id: Uuid) -> Self {
        Self {
            user_id,
            date: None,
        }
    }

    pub fn on_date(user_id: Uuid, date: NaiveDate) -> Self {
        Self {
            user_id,
            date: Some(date),
        }
    }

    fn matches(&self, record: &DailyLogRecord) -> bool {
        record.user_id == self.user_id && self.date.map_or(true, |d| record.date == d)
    }
}

#[async_trait]
pub trait LogStore: Send + Sync {
    async fn create(&self, log: NewDailyLog) -> StoreResult<DailyLogRecord>;

    async fn get(
        &self,
        filter: &LogFilter,
        order: Option<SortOrder>,
    ) -> StoreResult<Vec<DailyLogRecord>>;

    async fn get_by_id(&self, user_id: Uuid, id: Uuid) -> StoreResult<Option<DailyLogRecord>>;

    /// Overwrite every mutable column of a log. `id`, `user_id` and
    /// `created_at` are left alone.
    async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        date: NaiveDate,
        fields: &LogFields,
    ) -> StoreResult<DailyLogRecord>;

    /// Returns false when no log with that id belongs to the user.
    async fn delete(&self, user_id: Uuid, id: Uuid) -> StoreResult<bool>;

    async fn ping(&self) -> StoreResult<()>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
}
