use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::daily_log::{
    DailyLogRecord, FlagInput, LogDraft, LogFields, LogVariant, NewDailyLog, NumericInput,
};
use crate::services::duration::parse_time_of_day;
use crate::store::{LogFilter, LogStore};

pub const DUPLICATE_ENTRY: &str = "Entry for this date already exists.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit { id: Uuid },
}

/// A draft that passed validation, ready to hand to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedLog {
    pub date: NaiveDate,
    pub fields: LogFields,
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOutcome {
    pub record: DailyLogRecord,
    pub created: bool,
    pub warnings: Vec<String>,
    /// Lists showing this user's logs are stale.
    pub refresh: bool,
}

/// Owns the draft behind the log form, for any of the log variants.
#[derive(Debug, Clone)]
pub struct LogFormController {
    variant: LogVariant,
    draft: LogDraft,
    mode: FormMode,
    today: NaiveDate,
}

impl LogFormController {
    pub fn new(variant: LogVariant, today: NaiveDate) -> Self {
        Self {
            variant,
            draft: LogDraft::blank(today, variant),
            mode: FormMode::Create,
            today,
        }
    }

    pub fn variant(&self) -> LogVariant {
        self.variant
    }

    pub fn draft(&self) -> &LogDraft {
        &self.draft
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    /// Load a stored log into the form and switch to editing it.
    pub fn begin_edit(&mut self, record: &DailyLogRecord) {
        self.variant = record.fields.variant;
        self.draft = LogDraft::from_record(record);
        self.mode = FormMode::Edit { id: record.id };
    }

    /// Replace the draft with submitted form values. A draft that names a
    /// variant switches the form to it.
    pub fn apply(&mut self, draft: LogDraft) {
        if let Some(variant) = draft.variant {
            self.variant = variant;
        }
        self.draft = draft;
    }

    /// Back to the blank form for today, out of edit mode.
    pub fn reset(&mut self) {
        self.draft = LogDraft::blank(self.today, self.variant);
        self.mode = FormMode::Create;
    }

    pub fn validate(&self) -> AppResult<ValidatedLog> {
        let d = &self.draft;

        let raw_date = d
            .date
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::Validation("Date is required".into()))?;
        let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d").map_err(|_| {
            AppError::Validation(format!("Date must be YYYY-MM-DD, got `{raw_date}`"))
        })?;

        let mut fields = LogFields {
            variant: self.variant,
            sleep_start: clock_time(&d.sleep_start, "Sleep start")?,
            sleep_end: clock_time(&d.sleep_end, "Sleep end")?,
            work_start: clock_time(&d.work_start, "Work start")?,
            work_end: clock_time(&d.work_end, "Work end")?,
            meals: count(&d.meals, "Meals")?,
            exercised: d.exercised.unwrap_or(false),
            exercise: text(&d.exercise),
            sets: count(&d.sets, "Sets")?,
            reps: count(&d.reps, "Reps")?,
            weight: real(&d.weight, "Weight")?,
            rest_time: count(&d.rest_time, "Rest time")?,
            workout_duration: count(&d.workout_duration, "Workout duration")?,
            rpe: scale(&d.rpe, "RPE")?,
            note: text(&d.note),
            fatigue_score: scale(&d.fatigue_score, "Fatigue score")?,
            sleep_quality: scale(&d.sleep_quality, "Sleep quality")?,
            stress_level: scale(&d.stress_level, "Stress level")?,
            calories: count(&d.calories, "Calories")?,
            training_volume: real(&d.training_volume, "Training volume")?,
            training_type: d.training_type,
            social_interaction: flag(&d.social_interaction, "Social interaction")?,
        };
        fields.retain_variant(self.variant);

        let mut warnings = Vec::new();
        if !has_variant_content(&fields) {
            warnings.push(format!(
                "No {} details were filled in",
                variant_label(self.variant)
            ));
        }

        Ok(ValidatedLog {
            date,
            fields,
            warnings,
        })
    }

    /// Validate and persist the draft. Creating checks for an existing log
    /// on the same date first; editing overwrites the record being edited.
    /// On success the form resets; on any error the draft is left as is.
    pub async fn submit(
        &mut self,
        store: &dyn LogStore,
        user_id: Uuid,
    ) -> AppResult<SubmitOutcome> {
        let valid = self.validate()?;

        let same_day = store
            .get(&LogFilter::on_date(user_id, valid.date), None)
            .await?;

        let record = match self.mode {
            FormMode::Create => {
                if !same_day.is_empty() {
                    return Err(AppError::Conflict(DUPLICATE_ENTRY.into()));
                }
                store
                    .create(NewDailyLog {
                        user_id,
                        date: valid.date,
                        fields: valid.fields,
                    })
                    .await?
            }
            FormMode::Edit { id } => {
                if same_day.iter().any(|r| r.id != id) {
                    return Err(AppError::Conflict(DUPLICATE_ENTRY.into()));
                }
                store.update(user_id, id, valid.date, &valid.fields).await?
            }
        };

        let created = self.mode == FormMode::Create;
        tracing::info!(
            user_id = %user_id,
            log_id = %record.id,
            date = %record.date,
            created,
            "Daily log saved"
        );

        self.reset();
        Ok(SubmitOutcome {
            record,
            created,
            warnings: valid.warnings,
            refresh: true,
        })
    }
}

fn text(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// A time of day as the form posts it; stored as entered once it parses.
fn clock_time(value: &Option<String>, field: &str) -> AppResult<Option<String>> {
    match text(value) {
        Some(raw) if parse_time_of_day(&raw).is_none() => Err(AppError::Validation(format!(
            "{field} must be a time as HH:MM, got `{raw}`"
        ))),
        other => Ok(other),
    }
}

fn flag(value: &Option<FlagInput>, field: &str) -> AppResult<Option<bool>> {
    value
        .as_ref()
        .map(|f| f.to_flag(field))
        .transpose()
        .map(Option::flatten)
        .map_err(AppError::Validation)
}

fn count(value: &Option<NumericInput>, field: &str) -> AppResult<Option<i32>> {
    value
        .as_ref()
        .map(|n| n.to_count(field))
        .transpose()
        .map(Option::flatten)
        .map_err(AppError::Validation)
}

fn real(value: &Option<NumericInput>, field: &str) -> AppResult<Option<f64>> {
    value
        .as_ref()
        .map(|n| n.to_real(field))
        .transpose()
        .map(Option::flatten)
        .map_err(AppError::Validation)
}

/// A 1–10 self-rating.
fn scale(value: &Option<NumericInput>, field: &str) -> AppResult<Option<i32>> {
    let rating = count(value, field)?;
    if let Some(r) = rating {
        if !(1..=10).contains(&r) {
            return Err(AppError::Validation(format!(
                "{field} must be between 1 and 10"
            )));
        }
    }
    Ok(rating)
}

fn has_variant_content(f: &LogFields) -> bool {
    match f.variant {
        LogVariant::Daily => {
            f.sleep_start.is_some()
                || f.sleep_end.is_some()
                || f.work_start.is_some()
                || f.work_end.is_some()
                || f.meals.is_some()
                || f.exercised
        }
        LogVariant::Workout => {
            f.exercise.is_some()
                || f.sets.is_some()
                || f.reps.is_some()
                || f.weight.is_some()
                || f.rest_time.is_some()
                || f.workout_duration.is_some()
                || f.rpe.is_some()
        }
        LogVariant::Recovery => {
            f.fatigue_score.is_some()
                || f.sleep_quality.is_some()
                || f.stress_level.is_some()
                || f.calories.is_some()
                || f.training_volume.is_some()
                || f.training_type.is_some()
                || f.rpe.is_some()
                || f.social_interaction.is_some()
        }
    }
}

fn variant_label(variant: LogVariant) -> &'static str {
    match variant {
        LogVariant::Daily => "daily",
        LogVariant::Workout => "workout",
        LogVariant::Recovery => "recovery",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::models::daily_log::TrainingType;
    use crate::store::{MemoryStore, SortOrder, StoreResult};

    /// Reads never see an existing log, as when two submits race past the
    /// same-day check; writes still hit the real uniqueness rule.
    struct BlindReadStore(MemoryStore);

    #[async_trait]
    impl LogStore for BlindReadStore {
        async fn create(&self, log: NewDailyLog) -> StoreResult<DailyLogRecord> {
            self.0.create(log).await
        }

        async fn get(
            &self,
            _filter: &LogFilter,
            _order: Option<SortOrder>,
        ) -> StoreResult<Vec<DailyLogRecord>> {
            Ok(Vec::new())
        }

        async fn get_by_id(&self, user_id: Uuid, id: Uuid) -> StoreResult<Option<DailyLogRecord>> {
            self.0.get_by_id(user_id, id).await
        }

        async fn update(
            &self,
            user_id: Uuid,
            id: Uuid,
            date: NaiveDate,
            fields: &LogFields,
        ) -> StoreResult<DailyLogRecord> {
            self.0.update(user_id, id, date, fields).await
        }

        async fn delete(&self, user_id: Uuid, id: Uuid) -> StoreResult<bool> {
            self.0.delete(user_id, id).await
        }

        async fn ping(&self) -> StoreResult<()> {
            Ok(())
        }
    }

    fn today() -> NaiveDate {
        "2025-06-10".parse().unwrap()
    }

    fn draft(date: &str) -> LogDraft {
        LogDraft {
            date: Some(date.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_new_form_starts_blank_for_today() {
        let form = LogFormController::new(LogVariant::Daily, today());
        assert_eq!(form.draft().date.as_deref(), Some("2025-06-10"));
        assert_eq!(form.draft().exercised, Some(false));
        assert_eq!(form.draft().meals, None);
        assert_eq!(form.mode(), FormMode::Create);
    }

    #[test]
    fn test_missing_date_rejected() {
        let mut form = LogFormController::new(LogVariant::Daily, today());
        form.apply(LogDraft {
            date: None,
            meals: Some(NumericInput::Int(3)),
            ..Default::default()
        });
        assert!(matches!(form.validate(), Err(AppError::Validation(_))));

        form.apply(draft("  "));
        assert!(matches!(form.validate(), Err(AppError::Validation(_))));

        form.apply(draft("10/06/2025"));
        assert!(matches!(form.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_negative_meals_rejected() {
        let mut form = LogFormController::new(LogVariant::Daily, today());
        form.apply(LogDraft {
            meals: Some(NumericInput::Text("-1".into())),
            ..draft("2025-06-01")
        });
        assert!(matches!(form.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_rpe_out_of_range_rejected() {
        let mut form = LogFormController::new(LogVariant::Workout, today());
        form.apply(LogDraft {
            rpe: Some(NumericInput::Int(11)),
            ..draft("2025-06-01")
        });
        assert!(matches!(form.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_date_only_draft_passes_with_warning() {
        let mut form = LogFormController::new(LogVariant::Daily, today());
        form.apply(draft("2025-06-01"));
        let valid = form.validate().unwrap();
        assert_eq!(valid.date, "2025-06-01".parse::<NaiveDate>().unwrap());
        assert_eq!(valid.warnings.len(), 1);
    }

    #[test]
    fn test_foreign_variant_fields_dropped() {
        let mut form = LogFormController::new(LogVariant::Recovery, today());
        form.apply(LogDraft {
            sets: Some(NumericInput::Int(5)),
            fatigue_score: Some(NumericInput::Text("6".into())),
            training_type: Some(TrainingType::Cardio),
            ..draft("2025-06-01")
        });
        let valid = form.validate().unwrap();
        assert_eq!(valid.fields.sets, None);
        assert_eq!(valid.fields.fatigue_score, Some(6));
        assert_eq!(valid.fields.variant, LogVariant::Recovery);
        assert!(valid.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_submit_creates_and_resets_draft() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let mut form = LogFormController::new(LogVariant::Daily, today());
        form.apply(LogDraft {
            sleep_start: Some("23:00".into()),
            sleep_end: Some("07:00".into()),
            meals: Some(NumericInput::Text("3".into())),
            exercised: Some(true),
            ..draft("2025-06-01")
        });

        let outcome = form.submit(&store, user).await.unwrap();
        assert!(outcome.created);
        assert!(outcome.refresh);
        assert_eq!(outcome.record.user_id, user);
        assert_eq!(outcome.record.fields.meals, Some(3));
        assert!(outcome.record.fields.exercised);

        assert_eq!(form.draft(), &LogDraft::blank(today(), LogVariant::Daily));
        assert_eq!(form.mode(), FormMode::Create);
    }

    #[tokio::test]
    async fn test_duplicate_date_rejected_and_draft_kept() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let mut form = LogFormController::new(LogVariant::Daily, today());

        form.apply(draft("2025-06-01"));
        form.submit(&store, user).await.unwrap();

        let second = LogDraft {
            meals: Some(NumericInput::Int(2)),
            ..draft("2025-06-01")
        };
        form.apply(second.clone());
        let err = form.submit(&store, user).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m == DUPLICATE_ENTRY));
        assert_eq!(form.draft(), &second);

        let all = store.get(&LogFilter::user(user), None).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_edit_preserves_identity_and_overwrites_fields() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let mut form = LogFormController::new(LogVariant::Daily, today());
        form.apply(LogDraft {
            meals: Some(NumericInput::Int(3)),
            work_start: Some("09:00".into()),
            ..draft("2025-06-01")
        });
        let original = form.submit(&store, user).await.unwrap().record;

        form.begin_edit(&original);
        assert_eq!(form.mode(), FormMode::Edit { id: original.id });
        form.apply(LogDraft {
            meals: Some(NumericInput::Int(4)),
            ..draft("2025-06-02")
        });
        let outcome = form.submit(&store, user).await.unwrap();

        assert!(!outcome.created);
        let edited = outcome.record;
        assert_eq!(edited.id, original.id);
        assert_eq!(edited.user_id, original.user_id);
        assert_eq!(edited.created_at, original.created_at);
        assert_eq!(edited.date.to_string(), "2025-06-02");
        assert_eq!(edited.fields.meals, Some(4));
        // Full overwrite: fields left out of the edit are cleared.
        assert_eq!(edited.fields.work_start, None);
        assert_eq!(form.mode(), FormMode::Create);
    }

    #[tokio::test]
    async fn test_unchanged_edit_is_a_no_op() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let mut form = LogFormController::new(LogVariant::Workout, today());
        form.apply(LogDraft {
            exercise: Some("Squat".into()),
            sets: Some(NumericInput::Int(5)),
            reps: Some(NumericInput::Int(5)),
            weight: Some(NumericInput::Float(102.5)),
            rpe: Some(NumericInput::Int(8)),
            note: Some("felt heavy".into()),
            sleep_start: Some("23:30".into()),
            sleep_end: Some("07:15".into()),
            exercised: Some(true),
            ..draft("2025-06-01")
        });
        let original = form.submit(&store, user).await.unwrap().record;

        form.begin_edit(&original);
        let edited = form.submit(&store, user).await.unwrap().record;

        assert_eq!(edited.id, original.id);
        assert_eq!(edited.date, original.date);
        assert_eq!(edited.fields, original.fields);
        assert_eq!(edited.created_at, original.created_at);
    }

    #[tokio::test]
    async fn test_edit_onto_another_logs_date_rejected() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let mut form = LogFormController::new(LogVariant::Daily, today());
        form.apply(draft("2025-06-01"));
        form.submit(&store, user).await.unwrap();
        form.apply(draft("2025-06-02"));
        let second = form.submit(&store, user).await.unwrap().record;

        form.begin_edit(&second);
        form.apply(draft("2025-06-01"));
        let err = form.submit(&store, user).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(form.mode(), FormMode::Edit { id: second.id });
    }

    #[tokio::test]
    async fn test_work_window_scenario() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let mut form = LogFormController::new(LogVariant::Daily, today());
        form.apply(LogDraft {
            work_start: Some("09:00".into()),
            work_end: Some("17:30".into()),
            ..draft("2025-01-10")
        });
        let record = form.submit(&store, user).await.unwrap().record;
        let hours = crate::services::duration::duration_hours(
            record.fields.work_start.as_deref(),
            record.fields.work_end.as_deref(),
        );
        assert_eq!(hours, 8.5);
    }

    #[tokio::test]
    async fn test_store_level_duplicate_reports_same_conflict() {
        let store = BlindReadStore(MemoryStore::new());
        let user = Uuid::new_v4();
        let mut form = LogFormController::new(LogVariant::Daily, today());

        form.apply(draft("2025-06-01"));
        form.submit(&store, user).await.unwrap();

        let second = LogDraft {
            meals: Some(NumericInput::Int(1)),
            ..draft("2025-06-01")
        };
        form.apply(second.clone());
        let err = form.submit(&store, user).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m == DUPLICATE_ENTRY));
        assert_eq!(form.draft(), &second);

        let all = store.0.get(&LogFilter::user(user), None).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn test_malformed_times_rejected() {
        let mut form = LogFormController::new(LogVariant::Daily, today());
        form.apply(LogDraft {
            sleep_start: Some("11pm".into()),
            sleep_end: Some("07:00".into()),
            ..draft("2025-06-01")
        });
        let err = form.validate().unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m.contains("Sleep start")));

        form.apply(LogDraft {
            work_end: Some("25:00".into()),
            ..draft("2025-06-01")
        });
        assert!(matches!(form.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_times_kept_as_entered() {
        let mut form = LogFormController::new(LogVariant::Daily, today());
        form.apply(LogDraft {
            sleep_start: Some(" 23:00 ".into()),
            sleep_end: Some("07:00:30".into()),
            work_start: Some("".into()),
            ..draft("2025-06-01")
        });
        let valid = form.validate().unwrap();
        assert_eq!(valid.fields.sleep_start.as_deref(), Some("23:00"));
        assert_eq!(valid.fields.sleep_end.as_deref(), Some("07:00:30"));
        assert_eq!(valid.fields.work_start, None);
    }

    #[test]
    fn test_social_interaction_posted_as_number() {
        let mut form = LogFormController::new(LogVariant::Recovery, today());
        form.apply(LogDraft {
            social_interaction: Some(FlagInput::Int(0)),
            ..draft("2025-06-01")
        });
        let valid = form.validate().unwrap();
        assert_eq!(valid.fields.social_interaction, Some(false));
        assert!(valid.warnings.is_empty());

        form.apply(LogDraft {
            social_interaction: Some(FlagInput::Int(3)),
            ..draft("2025-06-01")
        });
        assert!(matches!(form.validate(), Err(AppError::Validation(_))));
    }
}
