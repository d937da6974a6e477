use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{Datelike, Local};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::monthly_plan::{
    CreateMonthlyPlanRequest, CreateMonthlyTaskRequest, MonthlyPlan, MonthlyPlanList,
    MonthlyPlanQuery, MonthlyPlanWithStats, MonthlyTask, UpdateMonthlyPlanRequest,
    UpdateMonthlyTaskRequest,
};
use crate::models::task::TaskStatusPatch;
use crate::planning::ordering;
use crate::AppState;

fn ensure_month_vacant(existing: i64, year: i32, month: i32) -> AppResult<()> {
    if existing > 0 {
        return Err(AppError::Conflict(format!(
            "A plan for {}-{:02} already exists",
            year, month
        )));
    }
    Ok(())
}

async fn load_tasks_for_plans(
    db: &sqlx::PgPool,
    plan_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, Vec<MonthlyTask>>> {
    let tasks = sqlx::query_as::<_, MonthlyTask>(
        r#"
        SELECT * FROM monthly_tasks
        WHERE monthly_plan_id = ANY($1)
        ORDER BY priority DESC, created_at ASC
        "#,
    )
    .bind(plan_ids)
    .fetch_all(db)
    .await?;

    let mut by_plan: HashMap<Uuid, Vec<MonthlyTask>> = HashMap::new();
    for task in tasks {
        by_plan.entry(task.monthly_plan_id).or_default().push(task);
    }
    Ok(by_plan)
}

pub async fn list_monthly_plans(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<MonthlyPlanQuery>,
) -> AppResult<Json<MonthlyPlanList>> {
    if let Some(month) = query.month {
        if !(1..=12).contains(&month) {
            return Err(AppError::Validation("month must be between 1 and 12".into()));
        }
    }

    let plans = sqlx::query_as::<_, MonthlyPlan>(
        r#"
        SELECT * FROM monthly_plans
        WHERE user_id = $1
          AND ($2::int IS NULL OR year = $2)
          AND ($3::int IS NULL OR month = $3)
        "#,
    )
    .bind(auth_user.id)
    .bind(query.year)
    .bind(query.month)
    .fetch_all(&state.db)
    .await?;

    let plan_ids: Vec<Uuid> = plans.iter().map(|p| p.id).collect();
    let mut tasks_by_plan = load_tasks_for_plans(&state.db, &plan_ids).await?;

    let mut plans: Vec<MonthlyPlanWithStats> = plans
        .into_iter()
        .map(|plan| {
            let tasks = tasks_by_plan.remove(&plan.id).unwrap_or_default();
            MonthlyPlanWithStats::new(plan, tasks)
        })
        .collect();

    // Current month first, then future ascending, then past ascending.
    let now = Local::now().date_naive();
    plans.sort_by_key(|p| {
        ordering::monthly_sort_key(p.plan.year, p.plan.month as u32, now.year(), now.month())
    });

    let total = plans.len();
    Ok(Json(MonthlyPlanList { plans, total }))
}

pub async fn get_monthly_plan(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(plan_id): Path<Uuid>,
) -> AppResult<Json<MonthlyPlanWithStats>> {
    let plan = plan_owned_by(&state.db, plan_id, auth_user.id).await?;

    let tasks = sqlx::query_as::<_, MonthlyTask>(
        r#"
        SELECT * FROM monthly_tasks
        WHERE monthly_plan_id = $1
        ORDER BY priority DESC, created_at ASC
        "#,
    )
    .bind(plan_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(MonthlyPlanWithStats::new(plan, tasks)))
}

pub async fn create_monthly_plan(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CreateMonthlyPlanRequest>,
) -> AppResult<Json<MonthlyPlanWithStats>> {
    body.validate()?;

    // One plan per (user, year, month); unique index backstops this.
    let existing = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM monthly_plans WHERE user_id = $1 AND year = $2 AND month = $3",
    )
    .bind(auth_user.id)
    .bind(body.year)
    .bind(body.month)
    .fetch_one(&state.db)
    .await?;

    ensure_month_vacant(existing, body.year, body.month)?;

    let title = body
        .title
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| format!("{}-{:02} plan", body.year, body.month));

    let plan = sqlx::query_as::<_, MonthlyPlan>(
        r#"
        INSERT INTO monthly_plans (id, user_id, yearly_goal_id, year, month, title, focus_areas, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth_user.id)
    .bind(body.yearly_goal_id)
    .bind(body.year)
    .bind(body.month)
    .bind(&title)
    .bind(body.focus_areas.unwrap_or_default())
    .bind(&body.notes)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(MonthlyPlanWithStats::new(plan, Vec::new())))
}

pub async fn update_monthly_plan(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(plan_id): Path<Uuid>,
    Json(body): Json<UpdateMonthlyPlanRequest>,
) -> AppResult<Json<MonthlyPlanWithStats>> {
    body.validate()?;

    let plan = sqlx::query_as::<_, MonthlyPlan>(
        r#"
        UPDATE monthly_plans SET
            title = COALESCE($3, title),
            focus_areas = COALESCE($4, focus_areas),
            notes = COALESCE($5, notes),
            updated_at = NOW()
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(plan_id)
    .bind(auth_user.id)
    .bind(&body.title)
    .bind(&body.focus_areas)
    .bind(&body.notes)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::NotFound("Monthly plan not found".into()))?;

    let tasks = sqlx::query_as::<_, MonthlyTask>(
        "SELECT * FROM monthly_tasks WHERE monthly_plan_id = $1 ORDER BY created_at ASC",
    )
    .bind(plan_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(MonthlyPlanWithStats::new(plan, tasks)))
}

pub async fn delete_monthly_plan(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(plan_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM monthly_plans WHERE id = $1 AND user_id = $2")
        .bind(plan_id)
        .bind(auth_user.id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Monthly plan not found".into()));
    }

    Ok(Json(serde_json::json!({ "deleted": true })))
}

// ===== Tasks =====

async fn plan_owned_by(
    db: &sqlx::PgPool,
    plan_id: Uuid,
    user_id: Uuid,
) -> AppResult<MonthlyPlan> {
    sqlx::query_as::<_, MonthlyPlan>(
        "SELECT * FROM monthly_plans WHERE id = $1 AND user_id = $2",
    )
    .bind(plan_id)
    .bind(user_id)
    .fetch_optional(db)
    .await?
    .ok_or(AppError::NotFound("Monthly plan not found".into()))
}

async fn task_owned_by(db: &sqlx::PgPool, task_id: Uuid, user_id: Uuid) -> AppResult<MonthlyTask> {
    sqlx::query_as::<_, MonthlyTask>(
        r#"
        SELECT t.* FROM monthly_tasks t
        JOIN monthly_plans p ON p.id = t.monthly_plan_id
        WHERE t.id = $1 AND p.user_id = $2
        "#,
    )
    .bind(task_id)
    .bind(user_id)
    .fetch_optional(db)
    .await?
    .ok_or(AppError::NotFound("Monthly task not found".into()))
}

pub async fn create_monthly_task(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(plan_id): Path<Uuid>,
    Json(body): Json<CreateMonthlyTaskRequest>,
) -> AppResult<Json<MonthlyTask>> {
    body.validate()?;
    plan_owned_by(&state.db, plan_id, auth_user.id).await?;

    let task = sqlx::query_as::<_, MonthlyTask>(
        r#"
        INSERT INTO monthly_tasks (id, monthly_plan_id, title, description, priority, status, due_date, estimated_hours)
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
    .bind(body.due_date)
    .bind(body.estimated_hours)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(task))
}

pub async fn update_monthly_task(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
    Json(body): Json<UpdateMonthlyTaskRequest>,
) -> AppResult<Json<MonthlyTask>> {
    body.validate()?;
    task_owned_by(&state.db, task_id, auth_user.id).await?;

    let task = sqlx::query_as::<_, MonthlyTask>(
        r#"
        UPDATE monthly_tasks SET
            title = COALESCE($2, title),
            description = COALESCE($3, description),
            priority = COALESCE($4, priority),
            status = COALESCE($5, status),
            due_date = COALESCE($6, due_date),
            estimated_hours = COALESCE($7, estimated_hours),
            actual_hours = COALESCE($8, actual_hours),
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
    .bind(body.due_date)
    .bind(body.estimated_hours)
    .bind(body.actual_hours)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(task))
}

pub async fn delete_monthly_task(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    task_owned_by(&state.db, task_id, auth_user.id).await?;

    sqlx::query("DELETE FROM monthly_tasks WHERE id = $1")
        .bind(task_id)
        .execute(&state.db)
        .await?;

    Ok(Json(serde_json::json!({ "deleted": true })))
}

pub async fn update_monthly_task_status(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
    Json(body): Json<TaskStatusPatch>,
) -> AppResult<Json<MonthlyTask>> {
    task_owned_by(&state.db, task_id, auth_user.id).await?;

    let task = sqlx::query_as::<_, MonthlyTask>(
        r#"
        UPDATE monthly_tasks SET status = $2, updated_at = NOW()
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_plan_for_same_month_conflicts() {
        assert!(ensure_month_vacant(0, 2024, 6).is_ok());
        let err = ensure_month_vacant(1, 2024, 6).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
