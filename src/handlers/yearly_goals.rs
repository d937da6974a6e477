use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::yearly_goal::{
    CreateYearlyGoalRequest, GoalStatus, Milestone, ProgressUpdateRequest,
    UpdateYearlyGoalRequest, YearlyGoal, YearlyGoalList, YearlyGoalQuery,
    YearlyGoalWithMilestones,
};
use crate::planning::stats::round2;
use crate::AppState;

/// Advance the addressed month's milestone in place, leaving every
/// other milestone untouched. Returns the updated milestone, or None
/// when no milestone exists for that month.
fn sync_milestone<'a>(
    milestones: &'a mut [Milestone],
    month: i32,
    progress: f64,
    note: Option<&str>,
) -> Option<&'a Milestone> {
    let milestone = milestones.iter_mut().find(|m| m.month == month)?;
    milestone.achieved_value += progress;
    if let Some(note) = note {
        milestone.note = Some(note.to_string());
    }
    Some(&*milestone)
}

async fn goal_owned_by(db: &sqlx::PgPool, goal_id: Uuid, user_id: Uuid) -> AppResult<YearlyGoal> {
    sqlx::query_as::<_, YearlyGoal>("SELECT * FROM yearly_goals WHERE id = $1 AND user_id = $2")
        .bind(goal_id)
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotFound("Yearly goal not found".into()))
}

async fn load_milestones(db: &sqlx::PgPool, goal_id: Uuid) -> AppResult<Vec<Milestone>> {
    let milestones = sqlx::query_as::<_, Milestone>(
        "SELECT * FROM monthly_milestones WHERE yearly_goal_id = $1 ORDER BY month ASC",
    )
    .bind(goal_id)
    .fetch_all(db)
    .await?;
    Ok(milestones)
}

pub async fn list_yearly_goals(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<YearlyGoalQuery>,
) -> AppResult<Json<YearlyGoalList>> {
    let goals = sqlx::query_as::<_, YearlyGoal>(
        r#"
        SELECT * FROM yearly_goals
        WHERE user_id = $1
          AND ($2::int IS NULL OR year = $2)
          AND ($3::goal_category IS NULL OR category = $3)
          AND ($4::goal_status IS NULL OR status = $4)
        ORDER BY year DESC, created_at ASC
        "#,
    )
    .bind(auth_user.id)
    .bind(query.year)
    .bind(query.category)
    .bind(query.status)
    .fetch_all(&state.db)
    .await?;

    let goal_ids: Vec<Uuid> = goals.iter().map(|g| g.id).collect();
    let milestones = sqlx::query_as::<_, Milestone>(
        "SELECT * FROM monthly_milestones WHERE yearly_goal_id = ANY($1) ORDER BY month ASC",
    )
    .bind(&goal_ids)
    .fetch_all(&state.db)
    .await?;

    let mut by_goal: HashMap<Uuid, Vec<Milestone>> = HashMap::new();
    for milestone in milestones {
        by_goal
            .entry(milestone.yearly_goal_id)
            .or_default()
            .push(milestone);
    }

    let goals: Vec<YearlyGoalWithMilestones> = goals
        .into_iter()
        .map(|goal| {
            let milestones = by_goal.remove(&goal.id).unwrap_or_default();
            YearlyGoalWithMilestones::new(goal, milestones)
        })
        .collect();

    let total = goals.len();
    Ok(Json(YearlyGoalList { goals, total }))
}

pub async fn get_yearly_goal(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(goal_id): Path<Uuid>,
) -> AppResult<Json<YearlyGoalWithMilestones>> {
    let goal = goal_owned_by(&state.db, goal_id, auth_user.id).await?;
    let milestones = load_milestones(&state.db, goal_id).await?;
    Ok(Json(YearlyGoalWithMilestones::new(goal, milestones)))
}

pub async fn create_yearly_goal(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CreateYearlyGoalRequest>,
) -> AppResult<Json<YearlyGoalWithMilestones>> {
    body.validate()?;

    if body.target_value <= 0.0 {
        return Err(AppError::Validation("target_value must be positive".into()));
    }

    let mut tx = state.db.begin().await?;

    let goal = sqlx::query_as::<_, YearlyGoal>(
        r#"
        INSERT INTO yearly_goals
            (id, user_id, year, title, description, category, color, target_value, current_value, unit, status, start_date, end_date)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0, $9, $10, $11, $12)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth_user.id)
    .bind(body.year)
    .bind(&body.title)
    .bind(&body.description)
    .bind(body.category)
    .bind(body.color.as_deref().unwrap_or("#3B82F6"))
    .bind(body.target_value)
    .bind(&body.unit)
    .bind(GoalStatus::InProgress)
    .bind(body.start_date)
    .bind(body.end_date)
    .fetch_one(&mut *tx)
    .await?;

    // Even split of the yearly target across twelve months.
    let mut milestones = Vec::new();
    if body.auto_generate_milestones.unwrap_or(true) {
        let monthly_target = round2(body.target_value / 12.0);
        for month in 1..=12 {
            let milestone = sqlx::query_as::<_, Milestone>(
                r#"
                INSERT INTO monthly_milestones (id, yearly_goal_id, month, target_value, achieved_value)
                VALUES ($1, $2, $3, $4, 0)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(goal.id)
            .bind(month)
            .bind(monthly_target)
            .fetch_one(&mut *tx)
            .await?;
            milestones.push(milestone);
        }
    }

    tx.commit().await?;

    Ok(Json(YearlyGoalWithMilestones::new(goal, milestones)))
}

pub async fn update_yearly_goal(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(goal_id): Path<Uuid>,
    Json(body): Json<UpdateYearlyGoalRequest>,
) -> AppResult<Json<YearlyGoalWithMilestones>> {
    body.validate()?;

    if let Some(target) = body.target_value {
        if target <= 0.0 {
            return Err(AppError::Validation("target_value must be positive".into()));
        }
    }

    goal_owned_by(&state.db, goal_id, auth_user.id).await?;

    // current_value is never writable here; progress flows only
    // through the progress-patch endpoint.
    let goal = sqlx::query_as::<_, YearlyGoal>(
        r#"
        UPDATE yearly_goals SET
            title = COALESCE($3, title),
            description = COALESCE($4, description),
            color = COALESCE($5, color),
            target_value = COALESCE($6, target_value),
            status = COALESCE($7, status),
            end_date = COALESCE($8, end_date),
            updated_at = NOW()
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(goal_id)
    .bind(auth_user.id)
    .bind(&body.title)
    .bind(&body.description)
    .bind(&body.color)
    .bind(body.target_value)
    .bind(body.status)
    .bind(body.end_date)
    .fetch_one(&state.db)
    .await?;

    // A lowered target can retroactively complete the goal.
    let goal = auto_update_status(&state.db, goal).await?;

    let milestones = load_milestones(&state.db, goal_id).await?;
    Ok(Json(YearlyGoalWithMilestones::new(goal, milestones)))
}

/// Apply an incremental progress update, optionally advancing one
/// month's milestone. The only mutator of `current_value`.
pub async fn update_progress(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(goal_id): Path<Uuid>,
    Json(body): Json<ProgressUpdateRequest>,
) -> AppResult<Json<YearlyGoalWithMilestones>> {
    body.validate()?;

    if body.progress < 0.0 {
        return Err(AppError::Validation("progress must not be negative".into()));
    }

    goal_owned_by(&state.db, goal_id, auth_user.id).await?;

    let mut tx = state.db.begin().await?;

    let goal = sqlx::query_as::<_, YearlyGoal>(
        r#"
        UPDATE yearly_goals
        SET current_value = current_value + $2, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(goal_id)
    .bind(body.progress)
    .fetch_one(&mut *tx)
    .await?;

    // Milestone sync touches only the addressed month; over-achievement
    // beyond the milestone's own target is allowed.
    if let Some(month) = body.month {
        let mut milestones = sqlx::query_as::<_, Milestone>(
            "SELECT * FROM monthly_milestones WHERE yearly_goal_id = $1 ORDER BY month ASC",
        )
        .bind(goal_id)
        .fetch_all(&mut *tx)
        .await?;

        if let Some(milestone) =
            sync_milestone(&mut milestones, month, body.progress, body.note.as_deref())
        {
            sqlx::query(
                "UPDATE monthly_milestones SET achieved_value = $2, note = $3 WHERE id = $1",
            )
            .bind(milestone.id)
            .bind(milestone.achieved_value)
            .bind(&milestone.note)
            .execute(&mut *tx)
            .await?;
        }
    }

    let status = if goal.current_value >= goal.target_value {
        Some(GoalStatus::Completed)
    } else if goal.current_value > 0.0 {
        Some(GoalStatus::InProgress)
    } else {
        None
    };

    let goal = if let Some(status) = status {
        sqlx::query_as::<_, YearlyGoal>(
            "UPDATE yearly_goals SET status = $2 WHERE id = $1 RETURNING *",
        )
        .bind(goal_id)
        .bind(status)
        .fetch_one(&mut *tx)
        .await?
    } else {
        goal
    };

    tx.commit().await?;

    let milestones = load_milestones(&state.db, goal_id).await?;
    Ok(Json(YearlyGoalWithMilestones::new(goal, milestones)))
}

pub async fn delete_yearly_goal(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(goal_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    // Milestones go with the goal (FK cascade).
    let result = sqlx::query("DELETE FROM yearly_goals WHERE id = $1 AND user_id = $2")
        .bind(goal_id)
        .bind(auth_user.id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Yearly goal not found".into()));
    }

    Ok(Json(serde_json::json!({ "deleted": true })))
}

async fn auto_update_status(db: &sqlx::PgPool, goal: YearlyGoal) -> AppResult<YearlyGoal> {
    if goal.current_value >= goal.target_value && goal.status != GoalStatus::Completed {
        let goal = sqlx::query_as::<_, YearlyGoal>(
            "UPDATE yearly_goals SET status = $2 WHERE id = $1 RETURNING *",
        )
        .bind(goal.id)
        .bind(GoalStatus::Completed)
        .fetch_one(db)
        .await?;
        return Ok(goal);
    }
    Ok(goal)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn milestones_for(goal_id: Uuid, target_value: f64) -> Vec<Milestone> {
        let monthly_target = round2(target_value / 12.0);
        (1..=12)
            .map(|month| Milestone {
                id: Uuid::new_v4(),
                yearly_goal_id: goal_id,
                month,
                target_value: monthly_target,
                achieved_value: 0.0,
                note: None,
            })
            .collect()
    }

    #[test]
    fn test_progress_touches_only_the_addressed_month() {
        let mut milestones = milestones_for(Uuid::new_v4(), 120.0);

        let updated =
            sync_milestone(&mut milestones, 5, 3.5, Some("two gym sessions")).expect("month 5");
        assert_eq!(updated.month, 5);
        assert_eq!(updated.achieved_value, 3.5);
        assert_eq!(updated.note.as_deref(), Some("two gym sessions"));

        for milestone in milestones.iter().filter(|m| m.month != 5) {
            assert_eq!(milestone.achieved_value, 0.0);
            assert!(milestone.note.is_none());
        }
    }

    #[test]
    fn test_progress_accumulates_across_updates() {
        let mut milestones = milestones_for(Uuid::new_v4(), 120.0);
        sync_milestone(&mut milestones, 5, 3.0, None).expect("month 5");
        let updated = sync_milestone(&mut milestones, 5, 4.0, None).expect("month 5");
        assert_eq!(updated.achieved_value, 7.0);
    }

    #[test]
    fn test_progress_without_matching_milestone_changes_nothing() {
        let mut milestones = vec![Milestone {
            id: Uuid::new_v4(),
            yearly_goal_id: Uuid::new_v4(),
            month: 1,
            target_value: 10.0,
            achieved_value: 0.0,
            note: None,
        }];
        assert!(sync_milestone(&mut milestones, 5, 2.0, None).is_none());
        assert_eq!(milestones[0].achieved_value, 0.0);
        assert!(milestones[0].note.is_none());
    }
}
