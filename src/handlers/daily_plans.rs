use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{Duration, Local, NaiveDate};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::daily_plan::{
    CreateDailyPlanRequest, CreateDailyTaskRequest, DailyPlan, DailyPlanList, DailyPlanQuery,
    DailyPlanWithStats, DailyTask, ScheduleTaskRequest, ScheduleTaskResponse,
    UpdateDailyPlanRequest, UpdateDailyTaskRequest,
};
use crate::models::task::{TaskPriority, TaskStatus, TaskStatusPatch};
use crate::planning::{dates, ordering};
use crate::AppState;

/// Optional (year, week) navigation parameters; when present they win
/// over an explicit start/end date pair.
#[derive(Debug, Deserialize)]
pub struct WeekQuery {
    pub year: Option<i32>,
    pub week: Option<u32>,
}

fn resolve_range(query: &DailyPlanQuery, week: &WeekQuery) -> AppResult<(NaiveDate, NaiveDate)> {
    let today = Local::now().date_naive();

    let (start, end) = match (week.year, week.week) {
        (Some(year), Some(week)) => {
            // Same bound the create DTOs enforce; keeps the year inside
            // chrono's calendar range before any date arithmetic runs.
            if !(2020..=2100).contains(&year) {
                return Err(AppError::Validation(
                    "year must be between 2020 and 2100".into(),
                ));
            }
            dates::WeekCursor::new(year, week).range()
        }
        _ => match (query.start_date, query.end_date) {
            (Some(start), Some(end)) => (start, end),
            // Default view is the current Monday-to-Sunday window.
            _ => dates::current_week_range(today),
        },
    };

    if start > end {
        return Err(AppError::Validation(
            "start_date must not be after end_date".into(),
        ));
    }
    Ok((start, end))
}

fn ensure_date_vacant(existing: i64, plan_date: NaiveDate) -> AppResult<()> {
    if existing > 0 {
        return Err(AppError::Conflict(format!(
            "A plan for {} already exists",
            plan_date
        )));
    }
    Ok(())
}

async fn load_tasks_for_plans(
    db: &sqlx::PgPool,
    plan_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, Vec<DailyTask>>> {
    let tasks = sqlx::query_as::<_, DailyTask>(
        r#"
        SELECT * FROM daily_tasks
        WHERE daily_plan_id = ANY($1)
        ORDER BY time_slot ASC NULLS LAST, priority DESC, created_at ASC
        "#,
    )
    .bind(plan_ids)
    .fetch_all(db)
    .await?;

    let mut by_plan: HashMap<Uuid, Vec<DailyTask>> = HashMap::new();
    for task in tasks {
        by_plan.entry(task.daily_plan_id).or_default().push(task);
    }
    Ok(by_plan)
}

pub async fn list_daily_plans(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<DailyPlanQuery>,
    Query(week): Query<WeekQuery>,
) -> AppResult<Json<DailyPlanList>> {
    let (start, end) = resolve_range(&query, &week)?;

    let plans = sqlx::query_as::<_, DailyPlan>(
        r#"
        SELECT * FROM daily_plans
        WHERE user_id = $1 AND plan_date BETWEEN $2 AND $3
        "#,
    )
    .bind(auth_user.id)
    .bind(start)
    .bind(end)
    .fetch_all(&state.db)
    .await?;

    let plan_ids: Vec<Uuid> = plans.iter().map(|p| p.id).collect();
    let mut tasks_by_plan = load_tasks_for_plans(&state.db, &plan_ids).await?;

    let mut plans: Vec<DailyPlanWithStats> = plans
        .into_iter()
        .map(|plan| {
            let tasks = tasks_by_plan.remove(&plan.id).unwrap_or_default();
            DailyPlanWithStats::new(plan, tasks)
        })
        .collect();

    // Display order: today first, then upcoming ascending, then past ascending.
    let today = Local::now().date_naive();
    plans.sort_by_key(|p| ordering::daily_sort_key(p.plan.plan_date, today));

    let total = plans.len();
    Ok(Json(DailyPlanList { plans, total }))
}

pub async fn get_daily_plan(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(plan_id): Path<Uuid>,
) -> AppResult<Json<DailyPlanWithStats>> {
    let plan = sqlx::query_as::<_, DailyPlan>(
        "SELECT * FROM daily_plans WHERE id = $1 AND user_id = $2",
    )
    .bind(plan_id)
    .bind(auth_user.id)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::NotFound("Daily plan not found".into()))?;

    let tasks = sqlx::query_as::<_, DailyTask>(
        r#"
        SELECT * FROM daily_tasks
        WHERE daily_plan_id = $1
        ORDER BY time_slot ASC NULLS LAST, priority DESC, created_at ASC
        "#,
    )
    .bind(plan_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(DailyPlanWithStats::new(plan, tasks)))
}

pub async fn create_daily_plan(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CreateDailyPlanRequest>,
) -> AppResult<Json<DailyPlanWithStats>> {
    body.validate()?;

    // One plan per (user, date); the unique index backstops this check.
    let existing = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM daily_plans WHERE user_id = $1 AND plan_date = $2",
    )
    .bind(auth_user.id)
    .bind(body.plan_date)
    .fetch_one(&state.db)
    .await?;

    ensure_date_vacant(existing, body.plan_date)?;

    let title = body
        .title
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| format!("Plan for {}", body.plan_date));

    let plan = sqlx::query_as::<_, DailyPlan>(
        r#"
        INSERT INTO daily_plans (id, user_id, monthly_plan_id, plan_date, title, busyness_level, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth_user.id)
    .bind(body.monthly_plan_id)
    .bind(body.plan_date)
    .bind(&title)
    .bind(body.busyness_level)
    .bind(&body.notes)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(DailyPlanWithStats::new(plan, Vec::new())))
}

pub async fn update_daily_plan(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(plan_id): Path<Uuid>,
    Json(body): Json<UpdateDailyPlanRequest>,
) -> AppResult<Json<DailyPlanWithStats>> {
    body.validate()?;

    let plan = sqlx::query_as::<_, DailyPlan>(
        r#"
        UPDATE daily_plans SET
            title = COALESCE($3, title),
            busyness_level = COALESCE($4, busyness_level),
            notes = COALESCE($5, notes),
            updated_at = NOW()
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(plan_id)
    .bind(auth_user.id)
    .bind(&body.title)
    .bind(body.busyness_level)
    .bind(&body.notes)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::NotFound("Daily plan not found".into()))?;

    let tasks = sqlx::query_as::<_, DailyTask>(
        "SELECT * FROM daily_tasks WHERE daily_plan_id = $1 ORDER BY created_at ASC",
    )
    .bind(plan_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(DailyPlanWithStats::new(plan, tasks)))
}

pub async fn delete_daily_plan(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(plan_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    // Tasks and the summary go with the plan (FK cascade).
    let result = sqlx::query("DELETE FROM daily_plans WHERE id = $1 AND user_id = $2")
        .bind(plan_id)
        .bind(auth_user.id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Daily plan not found".into()));
    }

    Ok(Json(serde_json::json!({ "deleted": true })))
}

// ===== Tasks =====

async fn plan_owned_by(
    db: &sqlx::PgPool,
    plan_id: Uuid,
    user_id: Uuid,
) -> AppResult<DailyPlan> {
    sqlx::query_as::<_, DailyPlan>("SELECT * FROM daily_plans WHERE id = $1 AND user_id = $2")
        .bind(plan_id)
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotFound("Daily plan not found".into()))
}

async fn task_owned_by(db: &sqlx::PgPool, task_id: Uuid, user_id: Uuid) -> AppResult<DailyTask> {
    sqlx::query_as::<_, DailyTask>(
        r#"
        SELECT t.* FROM daily_tasks t
        JOIN daily_plans p ON p.id = t.daily_plan_id
        WHERE t.id = $1 AND p.user_id = $2
        "#,
    )
    .bind(task_id)
    .bind(user_id)
    .fetch_optional(db)
    .await?
    .ok_or(AppError::NotFound("Daily task not found".into()))
}

pub async fn create_daily_task(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(plan_id): Path<Uuid>,
    Json(body): Json<CreateDailyTaskRequest>,
) -> AppResult<Json<DailyTask>> {
    body.validate()?;
    plan_owned_by(&state.db, plan_id, auth_user.id).await?;

    let task = sqlx::query_as::<_, DailyTask>(
        r#"
        INSERT INTO daily_tasks (id, daily_plan_id, title, description, priority, status, estimated_minutes, time_slot)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(plan_id)
    .bind(&body.title)
    .bind(&body.description)
    .bind(body.priority.unwrap_or_default())
    .bind(body.status.unwrap_or_default())
    .bind(body.estimated_minutes)
    .bind(&body.time_slot)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(task))
}

pub async fn update_daily_task(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
    Json(body): Json<UpdateDailyTaskRequest>,
) -> AppResult<Json<DailyTask>> {
    body.validate()?;
    task_owned_by(&state.db, task_id, auth_user.id).await?;

    let task = sqlx::query_as::<_, DailyTask>(
        r#"
        UPDATE daily_tasks SET
            title = COALESCE($2, title),
            description = COALESCE($3, description),
            priority = COALESCE($4, priority),
            status = COALESCE($5, status),
            estimated_minutes = COALESCE($6, estimated_minutes),
            actual_minutes = COALESCE($7, actual_minutes),
            time_slot = COALESCE($8, time_slot),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(task_id)
    .bind(&body.title)
    .bind(&body.description)
    .bind(body.priority)
    .bind(body.status)
    .bind(body.estimated_minutes)
    .bind(body.actual_minutes)
    .bind(&body.time_slot)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(task))
}

pub async fn delete_daily_task(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    task_owned_by(&state.db, task_id, auth_user.id).await?;

    sqlx::query("DELETE FROM daily_tasks WHERE id = $1")
        .bind(task_id)
        .execute(&state.db)
        .await?;

    Ok(Json(serde_json::json!({ "deleted": true })))
}

pub async fn update_daily_task_status(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
    Json(body): Json<TaskStatusPatch>,
) -> AppResult<Json<DailyTask>> {
    task_owned_by(&state.db, task_id, auth_user.id).await?;

    let task = sqlx::query_as::<_, DailyTask>(
        r#"
        UPDATE daily_tasks SET status = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(task_id)
    .bind(body.status)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(task))
}

/// Schedule one task on every day in [start_date, end_date], creating a
/// plan for any date that lacks one. Each date runs get-or-create-plan
/// plus create-task inside a single transaction, so two concurrent
/// schedules for the same new date cannot double-create the plan.
pub async fn schedule_task(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<ScheduleTaskRequest>,
) -> AppResult<Json<ScheduleTaskResponse>> {
    body.validate()?;

    if body.start_date > body.end_date {
        return Err(AppError::Validation(
            "start_date must not be after end_date".into(),
        ));
    }

    let priority = body.priority.unwrap_or(TaskPriority::Medium);
    let mut tasks_created = 0i64;
    let mut plans_created = 0i64;

    let mut date = body.start_date;
    while date <= body.end_date {
        let mut tx = state.db.begin().await?;

        // ON CONFLICT DO NOTHING keeps the insert race-free under the
        // (user_id, plan_date) unique index; the follow-up select picks
        // up whichever row won.
        let inserted = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO daily_plans (id, user_id, plan_date, title)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, plan_date) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(auth_user.id)
        .bind(date)
        .bind(format!("Plan for {}", date))
        .fetch_optional(&mut *tx)
        .await?;

        let plan_id = match inserted {
            Some(id) => {
                plans_created += 1;
                id
            }
            None => sqlx::query_scalar::<_, Uuid>(
                "SELECT id FROM daily_plans WHERE user_id = $1 AND plan_date = $2",
            )
            .bind(auth_user.id)
            .bind(date)
            .fetch_one(&mut *tx)
            .await?,
        };

        sqlx::query(
            r#"
            INSERT INTO daily_tasks (id, daily_plan_id, title, priority, status)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(plan_id)
        .bind(&body.title)
        .bind(priority)
        .bind(TaskStatus::Todo)
        .execute(&mut *tx)
        .await?;
        tasks_created += 1;

        tx.commit().await?;
        date += Duration::days(1);
    }

    tracing::info!(
        user_id = %auth_user.id,
        tasks_created,
        plans_created,
        "Scheduled task across date range"
    );

    Ok(Json(ScheduleTaskResponse {
        tasks_created,
        plans_created,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn week_query(year: i32, week: u32) -> WeekQuery {
        WeekQuery {
            year: Some(year),
            week: Some(week),
        }
    }

    fn no_dates() -> DailyPlanQuery {
        DailyPlanQuery {
            start_date: None,
            end_date: None,
        }
    }

    #[test]
    fn test_resolve_range_rejects_out_of_range_year() {
        let err = resolve_range(&no_dates(), &week_query(300000, 1)).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let err = resolve_range(&no_dates(), &week_query(1969, 1)).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_resolve_range_accepts_year_week_navigation() {
        // Week 1 of 2024 starts on Jan 1, a Monday.
        let (start, end) = resolve_range(&no_dates(), &week_query(2024, 1)).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(end, start + Duration::days(6));
    }

    #[test]
    fn test_second_plan_for_same_date_conflicts() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 12).unwrap();
        assert!(ensure_date_vacant(0, date).is_ok());
        let err = ensure_date_vacant(1, date).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
