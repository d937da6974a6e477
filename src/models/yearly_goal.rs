use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::planning::stats::goal_completion_rate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct YearlyGoal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub year: i32,
    pub title: String,
    pub description: Option<String>,
    pub category: GoalCategory,
    pub color: String,
    pub target_value: f64,
    pub current_value: f64,
    pub unit: Option<String>,
    pub status: GoalStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl YearlyGoal {
    pub fn completion_rate(&self) -> f64 {
        goal_completion_rate(self.current_value, self.target_value)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "goal_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum GoalStatus {
    Pending,
    InProgress,
    Completed,
    Paused,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "goal_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum GoalCategory {
    Health,
    Career,
    Learning,
    Finance,
    Relationship,
    Entertainment,
}

/// Per-month sub-target belonging to a goal. `achieved_value` advances
/// only through the progress-patch endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Milestone {
    pub id: Uuid,
    pub yearly_goal_id: Uuid,
    pub month: i32,
    pub target_value: f64,
    pub achieved_value: f64,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateYearlyGoalRequest {
    #[validate(range(min = 2020, max = 2100))]
    pub year: i32,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub category: GoalCategory,
    pub color: Option<String>,
    pub target_value: f64,
    #[validate(length(max = 20))]
    pub unit: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub auto_generate_milestones: Option<bool>,
}

/// Update never touches `current_value`; progress flows only through
/// the progress-patch endpoint.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateYearlyGoalRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub color: Option<String>,
    pub target_value: Option<f64>,
    pub status: Option<GoalStatus>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProgressUpdateRequest {
    pub progress: f64,
    #[validate(range(min = 1, max = 12))]
    pub month: Option<i32>,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct YearlyGoalQuery {
    pub year: Option<i32>,
    pub category: Option<GoalCategory>,
    pub status: Option<GoalStatus>,
}

#[derive(Debug, Serialize)]
pub struct YearlyGoalWithMilestones {
    #[serde(flatten)]
    pub goal: YearlyGoal,
    pub completion_rate: f64,
    pub milestones: Vec<Milestone>,
}

impl YearlyGoalWithMilestones {
    pub fn new(goal: YearlyGoal, milestones: Vec<Milestone>) -> Self {
        let completion_rate = goal.completion_rate();
        Self {
            goal,
            completion_rate,
            milestones,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct YearlyGoalList {
    pub goals: Vec<YearlyGoalWithMilestones>,
    pub total: usize,
}
