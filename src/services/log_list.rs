use chrono::{Duration, Months, NaiveDate};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::daily_log::DailyLogRecord;
use crate::services::duration::duration_hours;
use crate::services::log_form::LogFormController;
use crate::store::{LogFilter, LogStore, SortOrder};

/// Every list, chart and heatmap is served newest first.
pub const CANONICAL_ORDER: SortOrder = SortOrder::Descending;

/// A stored log plus the values derived from it at read time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRow {
    #[serde(flatten)]
    pub record: DailyLogRecord,
    pub sleep_hours: f64,
    pub work_hours: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workout_volume: Option<f64>,
}

impl LogRow {
    pub fn enrich(record: DailyLogRecord) -> Self {
        let f = &record.fields;
        let sleep_hours = duration_hours(f.sleep_start.as_deref(), f.sleep_end.as_deref());
        let work_hours = duration_hours(f.work_start.as_deref(), f.work_end.as_deref());
        let workout_volume = match (f.sets, f.reps, f.weight) {
            (Some(sets), Some(reps), Some(weight)) => Some(sets as f64 * reps as f64 * weight),
            _ => None,
        };
        Self {
            record,
            sleep_hours,
            work_hours,
            workout_volume,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub sleep_hours: f64,
    pub work_hours: f64,
    pub meals: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeatmapCell {
    pub date: NaiveDate,
    pub count: u8,
}

/// The heatmap window when none is asked for: two months back from today.
pub fn default_heatmap_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = today
        .checked_sub_months(Months::new(2))
        .unwrap_or_else(|| today - Duration::days(61));
    (start, today)
}

/// One user's logs as the table, chart and heatmap see them.
#[derive(Debug, Clone)]
pub struct LogListPresenter {
    user_id: Uuid,
    rows: Vec<LogRow>,
}

impl LogListPresenter {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            rows: Vec::new(),
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn rows(&self) -> &[LogRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<LogRow> {
        self.rows
    }

    pub fn row(&self, id: Uuid) -> Option<&LogRow> {
        self.rows.iter().find(|r| r.record.id == id)
    }

    /// Fetch the user's logs and replace the current rows.
    pub async fn load(&mut self, store: &dyn LogStore) -> AppResult<&[LogRow]> {
        let records = store
            .get(&LogFilter::user(self.user_id), Some(CANONICAL_ORDER))
            .await?;
        self.rows = records.into_iter().map(LogRow::enrich).collect();
        tracing::debug!(user_id = %self.user_id, count = self.rows.len(), "Daily logs loaded");
        Ok(&self.rows)
    }

    /// Copy a row into the form and put the form in edit mode.
    pub fn edit(&self, id: Uuid, form: &mut LogFormController) -> AppResult<()> {
        let row = self
            .row(id)
            .ok_or_else(|| AppError::NotFound("Log not found".into()))?;
        form.begin_edit(&row.record);
        Ok(())
    }

    /// Delete through the store and drop the row. If the store call fails
    /// the rows are re-fetched so they match the backend again.
    pub async fn remove(&mut self, store: &dyn LogStore, id: Uuid) -> AppResult<()> {
        match store.delete(self.user_id, id).await {
            Ok(true) => {
                self.forget(id);
                tracing::info!(user_id = %self.user_id, log_id = %id, "Daily log deleted");
                Ok(())
            }
            Ok(false) => {
                self.forget(id);
                Err(AppError::NotFound("Log not found".into()))
            }
            Err(err) => {
                tracing::error!(user_id = %self.user_id, log_id = %id, error = %err, "Delete failed, reloading logs");
                if let Err(reload) = self.load(store).await {
                    tracing::warn!(user_id = %self.user_id, error = %reload, "Reload after failed delete also failed");
                }
                Err(err.into())
            }
        }
    }

    /// Drop a row locally, e.g. after another session deleted it.
    pub fn forget(&mut self, id: Uuid) {
        self.rows.retain(|r| r.record.id != id);
    }

    pub fn trend(&self) -> Vec<TrendPoint> {
        self.rows
            .iter()
            .map(|r| TrendPoint {
                date: r.record.date,
                sleep_hours: r.sleep_hours,
                work_hours: r.work_hours,
                meals: r.record.fields.meals,
            })
            .collect()
    }

    /// One cell per day in `[start, end]`, newest first; 1 where the user
    /// logged exercise that day.
    pub fn heatmap(&self, start: NaiveDate, end: NaiveDate) -> Vec<HeatmapCell> {
        if end < start {
            return Vec::new();
        }
        let exercised: std::collections::HashSet<NaiveDate> = self
            .rows
            .iter()
            .filter(|r| r.record.fields.exercised)
            .map(|r| r.record.date)
            .collect();

        let mut cells = Vec::with_capacity((end - start).num_days() as usize + 1);
        let mut day = end;
        loop {
            cells.push(HeatmapCell {
                date: day,
                count: u8::from(exercised.contains(&day)),
            });
            if day == start {
                break;
            }
            day = day.pred_opt().unwrap_or(start);
        }
        cells
    }
}
