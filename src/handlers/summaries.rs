use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::daily_summary::{
    CreateDailySummaryRequest, DailySummary, UpdateDailySummaryRequest,
};
use crate::AppState;

async fn plan_exists(db: &sqlx::PgPool, plan_id: Uuid, user_id: Uuid) -> AppResult<()> {
    let found = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM daily_plans WHERE id = $1 AND user_id = $2",
    )
    .bind(plan_id)
    .bind(user_id)
    .fetch_one(db)
    .await?;

    if found == 0 {
        return Err(AppError::NotFound("Daily plan not found".into()));
    }
    Ok(())
}

/// A plan carries at most one summary, so the plan id addresses it.
pub async fn get_summary(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(plan_id): Path<Uuid>,
) -> AppResult<Json<DailySummary>> {
    plan_exists(&state.db, plan_id, auth_user.id).await?;

    let summary = sqlx::query_as::<_, DailySummary>(
        "SELECT * FROM daily_summaries WHERE daily_plan_id = $1 AND user_id = $2",
    )
    .bind(plan_id)
    .bind(auth_user.id)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::NotFound("Summary not found".into()))?;

    Ok(Json(summary))
}

pub async fn create_summary(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(plan_id): Path<Uuid>,
    Json(body): Json<CreateDailySummaryRequest>,
) -> AppResult<Json<DailySummary>> {
    body.validate()?;
    plan_exists(&state.db, plan_id, auth_user.id).await?;

    let existing = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM daily_summaries WHERE daily_plan_id = $1",
    )
    .bind(plan_id)
    .fetch_one(&state.db)
    .await?;

    if existing > 0 {
        return Err(AppError::Conflict(
            "A summary for this plan already exists".into(),
        ));
    }

    let summary = sqlx::query_as::<_, DailySummary>(
        r#"
        INSERT INTO daily_summaries (id, daily_plan_id, user_id, summary_type, content)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(plan_id)
    .bind(auth_user.id)
    .bind(body.summary_type)
    .bind(&body.content)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(summary))
}

pub async fn update_summary(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(plan_id): Path<Uuid>,
    Json(body): Json<UpdateDailySummaryRequest>,
) -> AppResult<Json<DailySummary>> {
    body.validate()?;
    plan_exists(&state.db, plan_id, auth_user.id).await?;

    let summary = sqlx::query_as::<_, DailySummary>(
        r#"
        UPDATE daily_summaries SET
            summary_type = COALESCE($3, summary_type),
            content = COALESCE($4, content),
            updated_at = NOW()
        WHERE daily_plan_id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(plan_id)
    .bind(auth_user.id)
    .bind(body.summary_type)
    .bind(&body.content)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::NotFound("Summary not found".into()))?;

    Ok(Json(summary))
}

pub async fn delete_summary(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(plan_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let result = sqlx::query(
        "DELETE FROM daily_summaries WHERE daily_plan_id = $1 AND user_id = $2",
    )
    .bind(plan_id)
    .bind(auth_user.id)
    .execute(&state.db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Summary not found".into()));
    }

    Ok(Json(serde_json::json!({ "deleted": true })))
}
