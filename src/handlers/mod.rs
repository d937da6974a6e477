pub mod analytics;
pub mod auth;
pub mod daily_plans;
pub mod health;
pub mod monthly_plans;
pub mod summaries;
pub mod yearly_goals;
