use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DailySummary {
    pub id: Uuid,
    pub daily_plan_id: Uuid,
    pub user_id: Uuid,
    pub summary_type: SummaryType,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "summary_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SummaryType {
    Daily,
    Small,
    Large,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDailySummaryRequest {
    pub summary_type: SummaryType,
    #[validate(length(min = 1))]
    pub content: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDailySummaryRequest {
    pub summary_type: Option<SummaryType>,
    #[validate(length(min = 1))]
    pub content: Option<String>,
}
