use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use super::{LogFilter, LogStore, SortOrder, StoreError, StoreResult, UserStore};
use crate::models::daily_log::{DailyLogRecord, LogFields, NewDailyLog};
use crate::models::user::{NewUser, User};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_unique(err: sqlx::Error, on_conflict: StoreError) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => on_conflict,
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl LogStore for PgStore {
    async fn create(&self, log: NewDailyLog) -> StoreResult<DailyLogRecord> {
        let f = &log.fields;
        sqlx::query_as::<_, DailyLogRecord>(
            r#"
            INSERT INTO daily_logs (
                id, user_id, log_date, variant,
                sleep_start, sleep_end, work_start, work_end, meals, exercised,
                exercise, sets, reps, weight, rest_time, workout_duration, rpe, note,
                fatigue_score, sleep_quality, stress_level, calories, training_volume,
                training_type, social_interaction
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                    $16, $17, $18, $19, $20, $21, $22, $23, $24, $25)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(log.user_id)
        .bind(log.date)
        .bind(f.variant)
        .bind(&f.sleep_start)
        .bind(&f.sleep_end)
        .bind(&f.work_start)
        .bind(&f.work_end)
        .bind(f.meals)
        .bind(f.exercised)
        .bind(&f.exercise)
        .bind(f.sets)
        .bind(f.reps)
        .bind(f.weight)
        .bind(f.rest_time)
        .bind(f.workout_duration)
        .bind(f.rpe)
        .bind(&f.note)
        .bind(f.fatigue_score)
        .bind(f.sleep_quality)
        .bind(f.stress_level)
        .bind(f.calories)
        .bind(f.training_volume)
        .bind(f.training_type)
        .bind(f.social_interaction)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique(e, StoreError::DuplicateDate(log.date)))
    }

    async fn get(
        &self,
        filter: &LogFilter,
        order: Option<SortOrder>,
    ) -> StoreResult<Vec<DailyLogRecord>> {
        let order_by = match order {
            Some(SortOrder::Ascending) => "ORDER BY log_date ASC, created_at ASC",
            Some(SortOrder::Descending) => "ORDER BY log_date DESC, created_at DESC",
            None => "",
        };
        let sql = format!(
            r#"
            SELECT * FROM daily_logs
            WHERE user_id = $1 AND ($2::date IS NULL OR log_date = $2)
            {order_by}
            "#
        );

        let logs = sqlx::query_as::<_, DailyLogRecord>(&sql)
            .bind(filter.user_id)
            .bind(filter.date)
            .fetch_all(&self.pool)
            .await?;

        Ok(logs)
    }

    async fn get_by_id(&self, user_id: Uuid, id: Uuid) -> StoreResult<Option<DailyLogRecord>> {
        let log = sqlx::query_as::<_, DailyLogRecord>(
            "SELECT * FROM daily_logs WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(log)
    }

    async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        date: NaiveDate,
        fields: &LogFields,
    ) -> StoreResult<DailyLogRecord> {
        let f = fields;
        sqlx::query_as::<_, DailyLogRecord>(
            r#"
            UPDATE daily_logs SET
                log_date = $3, variant = $4,
                sleep_start = $5, sleep_end = $6, work_start = $7, work_end = $8,
                meals = $9, exercised = $10,
                exercise = $11, sets = $12, reps = $13, weight = $14, rest_time = $15,
                workout_duration = $16, rpe = $17, note = $18,
                fatigue_score = $19, sleep_quality = $20, stress_level = $21,
                calories = $22, training_volume = $23, training_type = $24,
                social_interaction = $25,
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(date)
        .bind(f.variant)
        .bind(&f.sleep_start)
        .bind(&f.sleep_end)
        .bind(&f.work_start)
        .bind(&f.work_end)
        .bind(f.meals)
        .bind(f.exercised)
        .bind(&f.exercise)
        .bind(f.sets)
        .bind(f.reps)
        .bind(f.weight)
        .bind(f.rest_time)
        .bind(f.workout_duration)
        .bind(f.rpe)
        .bind(&f.note)
        .bind(f.fatigue_score)
        .bind(f.sleep_quality)
        .bind(f.stress_level)
        .bind(f.calories)
        .bind(f.training_volume)
        .bind(f.training_type)
        .bind(f.social_interaction)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_unique(e, StoreError::DuplicateDate(date)))?
        .ok_or(StoreError::NotFound)
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM daily_logs WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, password_hash, username)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.username)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique(e, StoreError::DuplicateEmail))
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}
