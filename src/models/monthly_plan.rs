use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::task::{TaskPriority, TaskStatus};
use crate::planning::stats::TaskStats;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MonthlyPlan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub yearly_goal_id: Option<Uuid>,
    pub year: i32,
    pub month: i32,
    pub title: Option<String>,
    pub focus_areas: Vec<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MonthlyTask {
    pub id: Uuid,
    pub monthly_plan_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub due_date: Option<NaiveDate>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMonthlyPlanRequest {
    #[validate(range(min = 2020, max = 2100))]
    pub year: i32,
    #[validate(range(min = 1, max = 12))]
    pub month: i32,
    #[validate(length(max = 200))]
    pub title: Option<String>,
    pub focus_areas: Option<Vec<String>>,
    pub notes: Option<String>,
    pub yearly_goal_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMonthlyPlanRequest {
    #[validate(length(max = 200))]
    pub title: Option<String>,
    pub focus_areas: Option<Vec<String>>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMonthlyTaskRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<NaiveDate>,
    #[validate(range(min = 0.0))]
    pub estimated_hours: Option<f64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMonthlyTaskRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<NaiveDate>,
    #[validate(range(min = 0.0))]
    pub estimated_hours: Option<f64>,
    #[validate(range(min = 0.0))]
    pub actual_hours: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct MonthlyPlanQuery {
    pub year: Option<i32>,
    pub month: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct MonthlyPlanWithStats {
    #[serde(flatten)]
    pub plan: MonthlyPlan,
    pub monthly_tasks: Vec<MonthlyTask>,
    #[serde(flatten)]
    pub stats: TaskStats,
}

impl MonthlyPlanWithStats {
    pub fn new(plan: MonthlyPlan, tasks: Vec<MonthlyTask>) -> Self {
        let stats = TaskStats::from_statuses(tasks.iter().map(|t| &t.status));
        Self {
            plan,
            monthly_tasks: tasks,
            stats,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MonthlyPlanList {
    pub plans: Vec<MonthlyPlanWithStats>,
    pub total: usize,
}
