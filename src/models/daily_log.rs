use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Which log form produced a record. Every variant carries the daily core
/// (sleep window, work window, meals, exercised); the others add a group of
/// detail fields on top.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash,
)]
#[sqlx(type_name = "log_variant", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LogVariant {
    #[default]
    Daily,
    Workout,
    Recovery,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "training_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TrainingType {
    Strength,
    Cardio,
    #[serde(alias = "HIIT")]
    Hiit,
    Rest,
}

/// Every mutable column of a daily log. An edit overwrites all of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LogFields {
    pub variant: LogVariant,

    pub sleep_start: Option<String>,
    pub sleep_end: Option<String>,
    pub work_start: Option<String>,
    pub work_end: Option<String>,
    pub meals: Option<i32>,
    pub exercised: bool,

    // Workout details
    pub exercise: Option<String>,
    pub sets: Option<i32>,
    #[serde(alias = "repetitions")]
    pub reps: Option<i32>,
    pub weight: Option<f64>,
    pub rest_time: Option<i32>,
    pub workout_duration: Option<i32>,
    pub rpe: Option<i32>,
    pub note: Option<String>,

    // Recovery details
    pub fatigue_score: Option<i32>,
    pub sleep_quality: Option<i32>,
    pub stress_level: Option<i32>,
    pub calories: Option<i32>,
    pub training_volume: Option<f64>,
    pub training_type: Option<TrainingType>,
    pub social_interaction: Option<bool>,
}

impl LogFields {
    /// Clear the detail groups the given variant does not use.
    pub fn retain_variant(&mut self, variant: LogVariant) {
        self.variant = variant;
        if variant != LogVariant::Workout {
            self.exercise = None;
            self.sets = None;
            self.reps = None;
            self.weight = None;
            self.rest_time = None;
            self.workout_duration = None;
            self.note = None;
        }
        if variant != LogVariant::Recovery {
            self.fatigue_score = None;
            self.sleep_quality = None;
            self.stress_level = None;
            self.calories = None;
            self.training_volume = None;
            self.training_type = None;
            self.social_interaction = None;
        }
        // RPE is collected by both detail forms.
        if variant == LogVariant::Daily {
            self.rpe = None;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DailyLogRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(rename = "log_date")]
    pub date: NaiveDate,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub fields: LogFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for the record store; the store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewDailyLog {
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub fields: LogFields,
}

/// A number as an HTML form may post it: a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericInput {
    Int(i64),
    Float(f64),
    Text(String),
}

impl NumericInput {
    /// Parse as a non-negative whole number. Blank text counts as absent.
    pub fn to_count(&self, field: &str) -> Result<Option<i32>, String> {
        let value = match self {
            NumericInput::Int(n) => *n,
            NumericInput::Float(f) if f.fract() == 0.0 => *f as i64,
            NumericInput::Float(_) => return Err(format!("{field} must be a whole number")),
            NumericInput::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return Ok(None);
                }
                s.parse::<i64>()
                    .map_err(|_| format!("{field} must be a whole number"))?
            }
        };
        if value < 0 {
            return Err(format!("{field} must not be negative"));
        }
        i32::try_from(value)
            .map(Some)
            .map_err(|_| format!("{field} is too large"))
    }

    /// Parse as a non-negative real number. Blank text counts as absent.
    pub fn to_real(&self, field: &str) -> Result<Option<f64>, String> {
        let value = match self {
            NumericInput::Int(n) => *n as f64,
            NumericInput::Float(f) => *f,
            NumericInput::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return Ok(None);
                }
                s.parse::<f64>()
                    .map_err(|_| format!("{field} must be a number"))?
            }
        };
        if !value.is_finite() {
            return Err(format!("{field} must be a number"));
        }
        if value < 0.0 {
            return Err(format!("{field} must not be negative"));
        }
        Ok(Some(value))
    }
}

impl From<i32> for NumericInput {
    fn from(n: i32) -> Self {
        NumericInput::Int(n as i64)
    }
}

impl From<f64> for NumericInput {
    fn from(f: f64) -> Self {
        NumericInput::Float(f)
    }
}

/// A yes/no answer as a form may post it: a JSON bool, `1`/`0`, or the
/// same as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagInput {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl FlagInput {
    /// Blank text counts as absent.
    pub fn to_flag(&self, field: &str) -> Result<Option<bool>, String> {
        let invalid = || format!("{field} must be yes/no (true, false, 1 or 0)");
        match self {
            FlagInput::Bool(b) => Ok(Some(*b)),
            FlagInput::Int(1) => Ok(Some(true)),
            FlagInput::Int(0) => Ok(Some(false)),
            FlagInput::Int(_) => Err(invalid()),
            FlagInput::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "" => Ok(None),
                "1" | "true" => Ok(Some(true)),
                "0" | "false" => Ok(Some(false)),
                _ => Err(invalid()),
            },
        }
    }
}

impl From<bool> for FlagInput {
    fn from(b: bool) -> Self {
        FlagInput::Bool(b)
    }
}

/// Raw form values for one log entry, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogDraft {
    pub date: Option<String>,
    pub variant: Option<LogVariant>,

    pub sleep_start: Option<String>,
    pub sleep_end: Option<String>,
    pub work_start: Option<String>,
    pub work_end: Option<String>,
    pub meals: Option<NumericInput>,
    pub exercised: Option<bool>,

    pub exercise: Option<String>,
    pub sets: Option<NumericInput>,
    #[serde(alias = "repetitions")]
    pub reps: Option<NumericInput>,
    pub weight: Option<NumericInput>,
    pub rest_time: Option<NumericInput>,
    pub workout_duration: Option<NumericInput>,
    pub rpe: Option<NumericInput>,
    pub note: Option<String>,

    pub fatigue_score: Option<NumericInput>,
    pub sleep_quality: Option<NumericInput>,
    pub stress_level: Option<NumericInput>,
    pub calories: Option<NumericInput>,
    pub training_volume: Option<NumericInput>,
    pub training_type: Option<TrainingType>,
    pub social_interaction: Option<FlagInput>,
}

impl LogDraft {
    /// The default form shape: today's date and nothing else filled in.
    pub fn blank(today: NaiveDate, variant: LogVariant) -> Self {
        Self {
            date: Some(today.format("%Y-%m-%d").to_string()),
            variant: Some(variant),
            exercised: Some(false),
            ..Default::default()
        }
    }

    pub fn from_record(record: &DailyLogRecord) -> Self {
        let f = &record.fields;
        Self {
            date: Some(record.date.format("%Y-%m-%d").to_string()),
            variant: Some(f.variant),
            sleep_start: f.sleep_start.clone(),
            sleep_end: f.sleep_end.clone(),
            work_start: f.work_start.clone(),
            work_end: f.work_end.clone(),
            meals: f.meals.map(NumericInput::from),
            exercised: Some(f.exercised),
            exercise: f.exercise.clone(),
            sets: f.sets.map(NumericInput::from),
            reps: f.reps.map(NumericInput::from),
            weight: f.weight.map(NumericInput::from),
            rest_time: f.rest_time.map(NumericInput::from),
            workout_duration: f.workout_duration.map(NumericInput::from),
            rpe: f.rpe.map(NumericInput::from),
            note: f.note.clone(),
            fatigue_score: f.fatigue_score.map(NumericInput::from),
            sleep_quality: f.sleep_quality.map(NumericInput::from),
            stress_level: f.stress_level.map(NumericInput::from),
            calories: f.calories.map(NumericInput::from),
            training_volume: f.training_volume.map(NumericInput::from),
            training_type: f.training_type,
            social_interaction: f.social_interaction.map(FlagInput::from),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DraftQuery {
    pub variant: Option<LogVariant>,
}

#[derive(Debug, Deserialize)]
pub struct HeatmapQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}
