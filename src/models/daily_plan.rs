use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::task::{TaskPriority, TaskStatus};
use crate::planning::stats::TaskStats;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DailyPlan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub monthly_plan_id: Option<Uuid>,
    pub plan_date: NaiveDate,
    pub title: Option<String>,
    pub busyness_level: Option<BusynessLevel>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Self-reported daily workload. Display-only; nothing derives from it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "busyness_level", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum BusynessLevel {
    VeryFree,
    Free,
    Moderate,
    Busy,
    VeryBusy,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DailyTask {
    pub id: Uuid,
    pub daily_plan_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub estimated_minutes: Option<i32>,
    pub actual_minutes: Option<i32>,
    pub time_slot: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDailyPlanRequest {
    pub plan_date: NaiveDate,
    #[validate(length(max = 200))]
    pub title: Option<String>,
    pub busyness_level: Option<BusynessLevel>,
    pub notes: Option<String>,
    pub monthly_plan_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDailyPlanRequest {
    #[validate(length(max = 200))]
    pub title: Option<String>,
    pub busyness_level: Option<BusynessLevel>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDailyTaskRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    #[validate(range(min = 0))]
    pub estimated_minutes: Option<i32>,
    #[validate(length(max = 50))]
    pub time_slot: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDailyTaskRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    #[validate(range(min = 0))]
    pub estimated_minutes: Option<i32>,
    #[validate(range(min = 0))]
    pub actual_minutes: Option<i32>,
    #[validate(length(max = 50))]
    pub time_slot: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DailyPlanQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Batch "schedule this task on every day in the range" request.
/// Plans missing for a date are created implicitly.
#[derive(Debug, Deserialize, Validate)]
pub struct ScheduleTaskRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub priority: Option<TaskPriority>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct ScheduleTaskResponse {
    pub tasks_created: i64,
    pub plans_created: i64,
}

/// A plan together with its tasks and freshly derived statistics.
#[derive(Debug, Serialize)]
pub struct DailyPlanWithStats {
    #[serde(flatten)]
    pub plan: DailyPlan,
    pub daily_tasks: Vec<DailyTask>,
    #[serde(flatten)]
    pub stats: TaskStats,
}

impl DailyPlanWithStats {
    pub fn new(plan: DailyPlan, tasks: Vec<DailyTask>) -> Self {
        let stats = TaskStats::from_statuses(tasks.iter().map(|t| &t.status));
        Self {
            plan,
            daily_tasks: tasks,
            stats,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DailyPlanList {
    pub plans: Vec<DailyPlanWithStats>,
    pub total: usize,
}
