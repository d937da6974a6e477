pub mod daily_plan;
pub mod daily_summary;
pub mod monthly_plan;
pub mod task;
pub mod user;
pub mod yearly_goal;
