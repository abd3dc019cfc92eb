use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::handlers::ws::{publish, ChangeAction, LogChange};
use crate::models::daily_log::{DraftQuery, HeatmapQuery, LogDraft};
use crate::services::log_form::{LogFormController, SubmitOutcome};
use crate::services::log_list::{
    default_heatmap_window, HeatmapCell, LogListPresenter, LogRow, TrendPoint,
};
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub log: LogRow,
    pub created: bool,
    pub warnings: Vec<String>,
    pub refresh: bool,
    /// The form's next state: blank, dated today.
    pub draft: LogDraft,
}

impl SubmitResponse {
    fn new(outcome: SubmitOutcome, form: &LogFormController) -> Self {
        Self {
            log: LogRow::enrich(outcome.record),
            created: outcome.created,
            warnings: outcome.warnings,
            refresh: outcome.refresh,
            draft: form.draft().clone(),
        }
    }
}

/// The blank form for today.
pub async fn new_draft(Query(query): Query<DraftQuery>) -> Json<LogDraft> {
    let form = LogFormController::new(query.variant.unwrap_or_default(), Utc::now().date_naive());
    Json(form.draft().clone())
}

pub async fn list_logs(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Vec<LogRow>>> {
    let mut list = LogListPresenter::new(auth_user.id);
    list.load(state.logs.as_ref()).await?;
    Ok(Json(list.into_rows()))
}

pub async fn get_log(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(log_id): Path<Uuid>,
) -> AppResult<Json<LogRow>> {
    let record = state
        .logs
        .get_by_id(auth_user.id, log_id)
        .await?
        .ok_or(AppError::NotFound("Log not found".into()))?;

    Ok(Json(LogRow::enrich(record)))
}

pub async fn create_log(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<LogDraft>,
) -> AppResult<Json<SubmitResponse>> {
    let _permit = state.submit_guard.acquire(auth_user.id)?;

    let mut form =
        LogFormController::new(body.variant.unwrap_or_default(), Utc::now().date_naive());
    form.apply(body);
    let outcome = form.submit(state.logs.as_ref(), auth_user.id).await?;

    publish(
        &state,
        LogChange {
            user_id: auth_user.id,
            log_id: outcome.record.id,
            action: ChangeAction::Created,
        },
    );

    Ok(Json(SubmitResponse::new(outcome, &form)))
}

pub async fn update_log(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(log_id): Path<Uuid>,
    Json(body): Json<LogDraft>,
) -> AppResult<Json<SubmitResponse>> {
    let _permit = state.submit_guard.acquire(auth_user.id)?;

    let existing = state
        .logs
        .get_by_id(auth_user.id, log_id)
        .await?
        .ok_or(AppError::NotFound("Log not found".into()))?;

    let mut form = LogFormController::new(existing.fields.variant, Utc::now().date_naive());
    form.begin_edit(&existing);
    form.apply(body);
    let outcome = form.submit(state.logs.as_ref(), auth_user.id).await?;

    publish(
        &state,
        LogChange {
            user_id: auth_user.id,
            log_id,
            action: ChangeAction::Updated,
        },
    );

    Ok(Json(SubmitResponse::new(outcome, &form)))
}

pub async fn delete_log(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(log_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let _permit = state.submit_guard.acquire(auth_user.id)?;

    let mut list = LogListPresenter::new(auth_user.id);
    list.remove(state.logs.as_ref(), log_id).await?;

    publish(
        &state,
        LogChange {
            user_id: auth_user.id,
            log_id,
            action: ChangeAction::Deleted,
        },
    );

    Ok(Json(serde_json::json!({ "deleted": true, "id": log_id })))
}

/// Chart series: sleep hours, work hours and meals per logged day.
pub async fn get_trend(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Vec<TrendPoint>>> {
    let mut list = LogListPresenter::new(auth_user.id);
    list.load(state.logs.as_ref()).await?;
    Ok(Json(list.trend()))
}

pub async fn get_heatmap(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<HeatmapQuery>,
) -> AppResult<Json<Vec<HeatmapCell>>> {
    let end = query.end.unwrap_or_else(|| Utc::now().date_naive());
    let start = query
        .start
        .unwrap_or_else(|| default_heatmap_window(end).0);

    if end < start {
        return Err(AppError::Validation("start must not be after end".into()));
    }
    if (end - start).num_days() > 366 {
        return Err(AppError::Validation(
            "Heatmap range is limited to one year".into(),
        ));
    }

    let mut list = LogListPresenter::new(auth_user.id);
    list.load(state.logs.as_ref()).await?;
    Ok(Json(list.heatmap(start, end)))
}
