//! In-process store, selected with `STORE_BACKEND=memory`. Also the store
//! double for tests.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{LogFilter, LogStore, SortOrder, StoreError, StoreResult, UserStore};
use crate::models::daily_log::{DailyLogRecord, LogFields, NewDailyLog};
use crate::models::user::{NewUser, User};

#[derive(Clone, Default)]
pub struct MemoryStore {
    logs: Arc<RwLock<HashMap<Uuid, DailyLogRecord>>>,
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LogStore for MemoryStore {
    async fn create(&self, log: NewDailyLog) -> StoreResult<DailyLogRecord> {
        // Check and insert under one write lock so the uniqueness rule holds.
        let mut logs = self.logs.write().await;
        if logs
            .values()
            .any(|r| r.user_id == log.user_id && r.date == log.date)
        {
            return Err(StoreError::DuplicateDate(log.date));
        }

        let now = Utc::now();
        let record = DailyLogRecord {
            id: Uuid::new_v4(),
            user_id: log.user_id,
            date: log.date,
            fields: log.fields,
            created_at: now,
            updated_at: now,
        };
        logs.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get(
        &self,
        filter: &LogFilter,
        order: Option<SortOrder>,
    ) -> StoreResult<Vec<DailyLogRecord>> {
        let logs = self.logs.read().await;
        let mut found: Vec<DailyLogRecord> =
            logs.values().filter(|r| filter.matches(r)).cloned().collect();

        match order {
            Some(SortOrder::Ascending) => {
                found.sort_by(|a, b| (a.date, a.created_at).cmp(&(b.date, b.created_at)))
            }
            Some(SortOrder::Descending) => {
                found.sort_by(|a, b| (b.date, b.created_at).cmp(&(a.date, a.created_at)))
            }
            None => {}
        }
        Ok(found)
    }

    async fn get_by_id(&self, user_id: Uuid, id: Uuid) -> StoreResult<Option<DailyLogRecord>> {
        let logs = self.logs.read().await;
        Ok(logs.get(&id).filter(|r| r.user_id == user_id).cloned())
    }

    async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        date: NaiveDate,
        fields: &LogFields,
    ) -> StoreResult<DailyLogRecord> {
        let mut logs = self.logs.write().await;
        if logs
            .values()
            .any(|r| r.user_id == user_id && r.date == date && r.id != id)
        {
            return Err(StoreError::DuplicateDate(date));
        }

        let record = logs
            .get_mut(&id)
            .filter(|r| r.user_id == user_id)
            .ok_or(StoreError::NotFound)?;
        record.date = date;
        record.fields = fields.clone();
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> StoreResult<bool> {
        let mut logs = self.logs.write().await;
        match logs.get(&id) {
            Some(r) if r.user_id == user_id => {
                logs.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail);
        }

        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            username: user.username,
            created_at: Utc::now(),
        };
        users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_log(user_id: Uuid, date: &str) -> NewDailyLog {
        NewDailyLog {
            user_id,
            date: date.parse().unwrap(),
            fields: LogFields::default(),
        }
    }

    #[tokio::test]
    async fn test_create_rejects_same_user_and_date() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();

        store.create(new_log(user, "2025-06-01")).await.unwrap();
        let second = store.create(new_log(user, "2025-06-01")).await;
        assert!(matches!(second, Err(StoreError::DuplicateDate(_))));

        let all = store.get(&LogFilter::user(user), None).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_same_date_allowed_for_different_users() {
        let store = MemoryStore::new();
        store.create(new_log(Uuid::new_v4(), "2025-06-01")).await.unwrap();
        assert!(store.create(new_log(Uuid::new_v4(), "2025-06-01")).await.is_ok());
    }

    #[tokio::test]
    async fn test_get_filters_and_orders() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        for date in ["2025-06-02", "2025-06-01", "2025-06-03"] {
            store.create(new_log(user, date)).await.unwrap();
        }
        store.create(new_log(Uuid::new_v4(), "2025-06-04")).await.unwrap();

        let desc = store
            .get(&LogFilter::user(user), Some(SortOrder::Descending))
            .await
            .unwrap();
        let dates: Vec<String> = desc.iter().map(|r| r.date.to_string()).collect();
        assert_eq!(dates, ["2025-06-03", "2025-06-02", "2025-06-01"]);

        let one = store
            .get(
                &LogFilter::on_date(user, "2025-06-02".parse().unwrap()),
                None,
            )
            .await
            .unwrap();
        assert_eq!(one.len(), 1);
    }

    #[tokio::test]
    async fn test_update_cannot_move_onto_taken_date() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        store.create(new_log(user, "2025-06-01")).await.unwrap();
        let other = store.create(new_log(user, "2025-06-02")).await.unwrap();

        let result = store
            .update(user, other.id, "2025-06-01".parse().unwrap(), &other.fields)
            .await;
        assert!(matches!(result, Err(StoreError::DuplicateDate(_))));
    }

    #[tokio::test]
    async fn test_delete_respects_ownership() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let record = store.create(new_log(owner, "2025-06-01")).await.unwrap();

        assert!(!store.delete(Uuid::new_v4(), record.id).await.unwrap());
        assert!(store.delete(owner, record.id).await.unwrap());
        assert!(store.get_by_id(owner, record.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemoryStore::new();
        let user = NewUser {
            email: "a@example.com".into(),
            password_hash: "x".into(),
            username: "a".into(),
        };
        store.create_user(user.clone()).await.unwrap();
        assert!(matches!(
            store.create_user(user).await,
            Err(StoreError::DuplicateEmail)
        ));
    }
}
