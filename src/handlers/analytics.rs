use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{Datelike, Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::task::{TaskPriority, TaskStatus};
use crate::models::yearly_goal::{GoalCategory, GoalStatus, YearlyGoal};
use crate::planning::stats::percentage;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_goals: i64,
    pub active_goals: i64,
    pub completed_goals: i64,
    pub total_monthly_plans: i64,
    pub total_daily_plans: i64,
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub overall_completion_rate: f64,
}

#[derive(Debug, Serialize)]
pub struct GoalCategoryStats {
    pub category: GoalCategory,
    pub count: i64,
    pub completed: i64,
    pub completion_rate: f64,
}

#[derive(Debug, Serialize)]
pub struct MonthlyProgress {
    pub month: i32,
    pub total: i64,
    pub completed: i64,
}

#[derive(Debug, Serialize)]
pub struct YearlyStats {
    pub year: i32,
    pub total_goals: i64,
    pub goal_completion_rate: f64,
    pub category_stats: Vec<GoalCategoryStats>,
    pub monthly_progress: Vec<MonthlyProgress>,
    pub total_plans: i64,
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub task_completion_rate: f64,
}

#[derive(Debug, Serialize)]
pub struct DayCompletion {
    pub day: u32,
    pub total: i64,
    pub completed: i64,
    pub rate: f64,
}

#[derive(Debug, Serialize)]
pub struct PriorityCount {
    pub priority: TaskPriority,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct WeekCompletion {
    pub week: u32,
    pub total: i64,
    pub completed: i64,
    pub rate: f64,
}

#[derive(Debug, Serialize)]
pub struct MonthlyStats {
    pub year: i32,
    pub month: i32,
    pub total_plans: i64,
    pub total_daily_plans: i64,
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub task_completion_rate: f64,
    pub daily_completion_data: Vec<DayCompletion>,
    pub priority_distribution: Vec<PriorityCount>,
    pub weekly_comparison: Vec<WeekCompletion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrendPeriod {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

#[derive(Debug, Serialize)]
pub struct TrendPoint {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub rate: f64,
}

#[derive(Debug, Serialize)]
pub struct CompletionRateTrend {
    pub period: TrendPeriod,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub data: Vec<TrendPoint>,
    pub average_rate: f64,
    pub trend: TrendDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    None,
    Low,
    Medium,
    High,
}

#[derive(Debug, Serialize)]
pub struct HeatmapCell {
    pub date: NaiveDate,
    pub value: f64,
    pub level: ActivityLevel,
    pub total: i64,
    pub completed: i64,
}

#[derive(Debug, Serialize)]
pub struct HeatmapData {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub data: Vec<HeatmapCell>,
}

#[derive(Debug, Deserialize)]
pub struct TrendQuery {
    pub period: Option<TrendPeriod>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub days: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct HeatmapQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub days: Option<i64>,
}

fn resolve_window(
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    fallback_days: i64,
) -> AppResult<(NaiveDate, NaiveDate)> {
    let today = Local::now().date_naive();
    let end = end_date.unwrap_or(today);
    let start = match start_date {
        Some(start) => start,
        None => {
            // Bound the look-back span before it reaches Duration math.
            if !(0..=3650).contains(&fallback_days) {
                return Err(AppError::Validation(
                    "days must be between 0 and 3650".into(),
                ));
            }
            today - Duration::days(fallback_days)
        }
    };
    if start > end {
        return Err(AppError::Validation(
            "start_date must not be after end_date".into(),
        ));
    }
    Ok((start, end))
}

/// Daily task rows joined with their plan's date, the raw material for
/// trend and heatmap bucketing.
async fn daily_task_dates(
    db: &sqlx::PgPool,
    user_id: uuid::Uuid,
    start: NaiveDate,
    end: NaiveDate,
) -> AppResult<Vec<(NaiveDate, TaskStatus)>> {
    let rows = sqlx::query_as::<_, (NaiveDate, TaskStatus)>(
        r#"
        SELECT p.plan_date, t.status
        FROM daily_tasks t
        JOIN daily_plans p ON p.id = t.daily_plan_id
        WHERE p.user_id = $1 AND p.plan_date BETWEEN $2 AND $3
        ORDER BY p.plan_date ASC
        "#,
    )
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

fn per_day_counts(rows: &[(NaiveDate, TaskStatus)]) -> BTreeMap<NaiveDate, (i64, i64)> {
    let mut by_day: BTreeMap<NaiveDate, (i64, i64)> = BTreeMap::new();
    for (date, status) in rows {
        let entry = by_day.entry(*date).or_default();
        entry.0 += 1;
        if *status == TaskStatus::Done {
            entry.1 += 1;
        }
    }
    by_day
}

fn trend_direction(rates: &[f64]) -> TrendDirection {
    if rates.len() < 2 {
        return TrendDirection::Stable;
    }
    let last = rates[rates.len() - 1];
    let prev = rates[rates.len() - 2];
    if last > prev {
        TrendDirection::Up
    } else if last < prev {
        TrendDirection::Down
    } else {
        TrendDirection::Stable
    }
}

fn activity_level(rate: f64, total: i64) -> ActivityLevel {
    if total == 0 || rate <= 0.0 {
        ActivityLevel::None
    } else if rate < 50.0 {
        ActivityLevel::Low
    } else if rate < 100.0 {
        ActivityLevel::Medium
    } else {
        ActivityLevel::High
    }
}

fn first_of_next_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    // First of any month always exists.
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(date)
}

pub async fn get_dashboard_stats(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<DashboardStats>> {
    let today = Local::now().date_naive();
    let year = today.year();
    let month = today.month() as i32;

    let (total_goals, active_goals, completed_goals) = sqlx::query_as::<_, (i64, i64, i64)>(
        r#"
        SELECT COUNT(*),
               COUNT(*) FILTER (WHERE status = 'in-progress'),
               COUNT(*) FILTER (WHERE status = 'completed')
        FROM yearly_goals
        WHERE user_id = $1 AND year = $2
        "#,
    )
    .bind(auth_user.id)
    .bind(year)
    .fetch_one(&state.db)
    .await?;

    let total_monthly_plans = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM monthly_plans WHERE user_id = $1 AND year = $2",
    )
    .bind(auth_user.id)
    .bind(year)
    .fetch_one(&state.db)
    .await?;

    let total_daily_plans = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM daily_plans
        WHERE user_id = $1
          AND EXTRACT(YEAR FROM plan_date)::int = $2
          AND EXTRACT(MONTH FROM plan_date)::int = $3
        "#,
    )
    .bind(auth_user.id)
    .bind(year)
    .bind(month)
    .fetch_one(&state.db)
    .await?;

    let (monthly_total, monthly_done) = sqlx::query_as::<_, (i64, i64)>(
        r#"
        SELECT COUNT(*), COUNT(*) FILTER (WHERE t.status = 'done')
        FROM monthly_tasks t
        JOIN monthly_plans p ON p.id = t.monthly_plan_id
        WHERE p.user_id = $1 AND p.year = $2 AND p.month = $3
        "#,
    )
    .bind(auth_user.id)
    .bind(year)
    .bind(month)
    .fetch_one(&state.db)
    .await?;

    let (daily_total, daily_done) = sqlx::query_as::<_, (i64, i64)>(
        r#"
        SELECT COUNT(*), COUNT(*) FILTER (WHERE t.status = 'done')
        FROM daily_tasks t
        JOIN daily_plans p ON p.id = t.daily_plan_id
        WHERE p.user_id = $1
          AND EXTRACT(YEAR FROM p.plan_date)::int = $2
          AND EXTRACT(MONTH FROM p.plan_date)::int = $3
        "#,
    )
    .bind(auth_user.id)
    .bind(year)
    .bind(month)
    .fetch_one(&state.db)
    .await?;

    let total_tasks = monthly_total + daily_total;
    let completed_tasks = monthly_done + daily_done;

    Ok(Json(DashboardStats {
        total_goals,
        active_goals,
        completed_goals,
        total_monthly_plans,
        total_daily_plans,
        total_tasks,
        completed_tasks,
        overall_completion_rate: percentage(completed_tasks, total_tasks),
    }))
}

pub async fn get_yearly_stats(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(year): Path<i32>,
) -> AppResult<Json<YearlyStats>> {
    let goals = sqlx::query_as::<_, YearlyGoal>(
        "SELECT * FROM yearly_goals WHERE user_id = $1 AND year = $2",
    )
    .bind(auth_user.id)
    .bind(year)
    .fetch_all(&state.db)
    .await?;

    let total_goals = goals.len() as i64;
    let completed_goals = goals
        .iter()
        .filter(|g| g.status == GoalStatus::Completed)
        .count() as i64;

    let mut categories: BTreeMap<&'static str, (GoalCategory, i64, i64)> = BTreeMap::new();
    for goal in &goals {
        let key = category_key(goal.category);
        let entry = categories.entry(key).or_insert((goal.category, 0, 0));
        entry.1 += 1;
        if goal.status == GoalStatus::Completed {
            entry.2 += 1;
        }
    }
    let category_stats = categories
        .into_values()
        .map(|(category, count, completed)| GoalCategoryStats {
            category,
            count,
            completed,
            completion_rate: percentage(completed, count),
        })
        .collect();

    // Goals grouped by the months their plans touch.
    let month_rows = sqlx::query_as::<_, (i32, i64, i64)>(
        r#"
        SELECT p.month, COUNT(*), COUNT(*) FILTER (WHERE g.status = 'completed')
        FROM yearly_goals g
        JOIN monthly_plans p ON p.yearly_goal_id = g.id
        WHERE g.user_id = $1 AND g.year = $2
        GROUP BY p.month
        "#,
    )
    .bind(auth_user.id)
    .bind(year)
    .fetch_all(&state.db)
    .await?;

    let monthly_progress = (1..=12)
        .map(|month| {
            let found = month_rows.iter().find(|(m, _, _)| *m == month);
            let (total, completed) = found.map(|(_, t, c)| (*t, *c)).unwrap_or((0, 0));
            MonthlyProgress {
                month,
                total,
                completed,
            }
        })
        .collect();

    let total_plans = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM monthly_plans WHERE user_id = $1 AND year = $2",
    )
    .bind(auth_user.id)
    .bind(year)
    .fetch_one(&state.db)
    .await?;

    let (monthly_total, monthly_done) = sqlx::query_as::<_, (i64, i64)>(
        r#"
        SELECT COUNT(*), COUNT(*) FILTER (WHERE t.status = 'done')
        FROM monthly_tasks t
        JOIN monthly_plans p ON p.id = t.monthly_plan_id
        WHERE p.user_id = $1 AND p.year = $2
        "#,
    )
    .bind(auth_user.id)
    .bind(year)
    .fetch_one(&state.db)
    .await?;

    let (daily_total, daily_done) = sqlx::query_as::<_, (i64, i64)>(
        r#"
        SELECT COUNT(*), COUNT(*) FILTER (WHERE t.status = 'done')
        FROM daily_tasks t
        JOIN daily_plans p ON p.id = t.daily_plan_id
        WHERE p.user_id = $1 AND EXTRACT(YEAR FROM p.plan_date)::int = $2
        "#,
    )
    .bind(auth_user.id)
    .bind(year)
    .fetch_one(&state.db)
    .await?;

    let total_tasks = monthly_total + daily_total;
    let completed_tasks = monthly_done + daily_done;

    Ok(Json(YearlyStats {
        year,
        total_goals,
        goal_completion_rate: percentage(completed_goals, total_goals),
        category_stats,
        monthly_progress,
        total_plans,
        total_tasks,
        completed_tasks,
        task_completion_rate: percentage(completed_tasks, total_tasks),
    }))
}

fn category_key(category: GoalCategory) -> &'static str {
    match category {
        GoalCategory::Health => "health",
        GoalCategory::Career => "career",
        GoalCategory::Learning => "learning",
        GoalCategory::Finance => "finance",
        GoalCategory::Relationship => "relationship",
        GoalCategory::Entertainment => "entertainment",
    }
}

pub async fn get_monthly_stats(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path((year, month)): Path<(i32, i32)>,
) -> AppResult<Json<MonthlyStats>> {
    if !(1..=12).contains(&month) {
        return Err(AppError::Validation("month must be between 1 and 12".into()));
    }

    let total_plans = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM monthly_plans WHERE user_id = $1 AND year = $2 AND month = $3",
    )
    .bind(auth_user.id)
    .bind(year)
    .bind(month)
    .fetch_one(&state.db)
    .await?;

    let total_daily_plans = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM daily_plans
        WHERE user_id = $1
          AND EXTRACT(YEAR FROM plan_date)::int = $2
          AND EXTRACT(MONTH FROM plan_date)::int = $3
        "#,
    )
    .bind(auth_user.id)
    .bind(year)
    .bind(month)
    .fetch_one(&state.db)
    .await?;

    let (monthly_total, monthly_done) = sqlx::query_as::<_, (i64, i64)>(
        r#"
        SELECT COUNT(*), COUNT(*) FILTER (WHERE t.status = 'done')
        FROM monthly_tasks t
        JOIN monthly_plans p ON p.id = t.monthly_plan_id
        WHERE p.user_id = $1 AND p.year = $2 AND p.month = $3
        "#,
    )
    .bind(auth_user.id)
    .bind(year)
    .bind(month)
    .fetch_one(&state.db)
    .await?;

    // One pass over the month's daily tasks covers day, week, and
    // priority breakdowns.
    let rows = sqlx::query_as::<_, (NaiveDate, TaskStatus, TaskPriority)>(
        r#"
        SELECT p.plan_date, t.status, t.priority
        FROM daily_tasks t
        JOIN daily_plans p ON p.id = t.daily_plan_id
        WHERE p.user_id = $1
          AND EXTRACT(YEAR FROM p.plan_date)::int = $2
          AND EXTRACT(MONTH FROM p.plan_date)::int = $3
        ORDER BY p.plan_date ASC
        "#,
    )
    .bind(auth_user.id)
    .bind(year)
    .bind(month)
    .fetch_all(&state.db)
    .await?;

    let daily_total = rows.len() as i64;
    let daily_done = rows
        .iter()
        .filter(|(_, status, _)| *status == TaskStatus::Done)
        .count() as i64;

    let mut by_day: BTreeMap<u32, (i64, i64)> = BTreeMap::new();
    let mut by_week: BTreeMap<u32, (i64, i64)> = BTreeMap::new();
    let mut by_priority: BTreeMap<u8, i64> = BTreeMap::new();
    for (date, status, priority) in &rows {
        let day = date.day();
        let week = (day - 1) / 7 + 1;
        let done = *status == TaskStatus::Done;
        let d = by_day.entry(day).or_default();
        d.0 += 1;
        if done {
            d.1 += 1;
        }
        let w = by_week.entry(week).or_default();
        w.0 += 1;
        if done {
            w.1 += 1;
        }
        *by_priority.entry(*priority as u8).or_default() += 1;
    }

    let daily_completion_data = by_day
        .into_iter()
        .map(|(day, (total, completed))| DayCompletion {
            day,
            total,
            completed,
            rate: percentage(completed, total),
        })
        .collect();

    let weekly_comparison = by_week
        .into_iter()
        .map(|(week, (total, completed))| WeekCompletion {
            week,
            total,
            completed,
            rate: percentage(completed, total),
        })
        .collect();

    let priority_distribution = [TaskPriority::Low, TaskPriority::Medium, TaskPriority::High]
        .into_iter()
        .map(|priority| PriorityCount {
            priority,
            count: by_priority.get(&(priority as u8)).copied().unwrap_or(0),
        })
        .collect();

    let total_tasks = monthly_total + daily_total;
    let completed_tasks = monthly_done + daily_done;

    Ok(Json(MonthlyStats {
        year,
        month,
        total_plans,
        total_daily_plans,
        total_tasks,
        completed_tasks,
        task_completion_rate: percentage(completed_tasks, total_tasks),
        daily_completion_data,
        priority_distribution,
        weekly_comparison,
    }))
}

pub async fn get_completion_rate_trend(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<TrendQuery>,
) -> AppResult<Json<CompletionRateTrend>> {
    let period = query.period.unwrap_or_default();
    let (start, end) = resolve_window(query.start_date, query.end_date, query.days.unwrap_or(30))?;

    let rows = daily_task_dates(&state.db, auth_user.id, start, end).await?;
    let by_day = per_day_counts(&rows);

    // Bucket boundaries depend on the period; days without tasks
    // produce no point.
    let mut data: Vec<TrendPoint> = Vec::new();
    match period {
        TrendPeriod::Daily => {
            for (date, (total, completed)) in &by_day {
                data.push(TrendPoint {
                    start_date: *date,
                    end_date: *date,
                    rate: percentage(*completed, *total),
                });
            }
        }
        TrendPeriod::Weekly => {
            let mut cursor = start;
            while cursor <= end {
                let week_end = (cursor + Duration::days(6)).min(end);
                let (total, completed) = by_day
                    .range(cursor..=week_end)
                    .fold((0, 0), |acc, (_, (t, c))| (acc.0 + t, acc.1 + c));
                if total > 0 {
                    data.push(TrendPoint {
                        start_date: cursor,
                        end_date: week_end,
                        rate: percentage(completed, total),
                    });
                }
                cursor = week_end + Duration::days(1);
            }
        }
        TrendPeriod::Monthly => {
            let mut cursor = start;
            while cursor <= end {
                let next = first_of_next_month(cursor);
                let month_end = (next - Duration::days(1)).min(end);
                let (total, completed) = by_day
                    .range(cursor..=month_end)
                    .fold((0, 0), |acc, (_, (t, c))| (acc.0 + t, acc.1 + c));
                if total > 0 {
                    data.push(TrendPoint {
                        start_date: cursor,
                        end_date: month_end,
                        rate: percentage(completed, total),
                    });
                }
                cursor = next;
            }
        }
    }

    let rates: Vec<f64> = data.iter().map(|p| p.rate).collect();
    let average_rate = if rates.is_empty() {
        0.0
    } else {
        crate::planning::stats::round2(rates.iter().sum::<f64>() / rates.len() as f64)
    };

    Ok(Json(CompletionRateTrend {
        period,
        start_date: start,
        end_date: end,
        trend: trend_direction(&rates),
        data,
        average_rate,
    }))
}

pub async fn get_heatmap(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<HeatmapQuery>,
) -> AppResult<Json<HeatmapData>> {
    let (start, end) = resolve_window(query.start_date, query.end_date, query.days.unwrap_or(90))?;

    let rows = daily_task_dates(&state.db, auth_user.id, start, end).await?;
    let by_day = per_day_counts(&rows);

    let mut data = Vec::new();
    let mut cursor = start;
    while cursor <= end {
        let (total, completed) = by_day.get(&cursor).copied().unwrap_or((0, 0));
        let value = percentage(completed, total);
        data.push(HeatmapCell {
            date: cursor,
            value,
            level: activity_level(value, total),
            total,
            completed,
        });
        cursor += Duration::days(1);
    }

    Ok(Json(HeatmapData {
        start_date: start,
        end_date: end,
        data,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn trend_needs_two_points() {
        assert_eq!(trend_direction(&[]), TrendDirection::Stable);
        assert_eq!(trend_direction(&[50.0]), TrendDirection::Stable);
    }

    #[test]
    fn trend_compares_last_two_points() {
        assert_eq!(trend_direction(&[10.0, 40.0, 80.0]), TrendDirection::Up);
        assert_eq!(trend_direction(&[80.0, 40.0]), TrendDirection::Down);
        assert_eq!(trend_direction(&[20.0, 50.0, 50.0]), TrendDirection::Stable);
    }

    #[test]
    fn activity_level_thresholds() {
        assert_eq!(activity_level(0.0, 0), ActivityLevel::None);
        assert_eq!(activity_level(0.0, 3), ActivityLevel::None);
        assert_eq!(activity_level(33.33, 3), ActivityLevel::Low);
        assert_eq!(activity_level(50.0, 2), ActivityLevel::Medium);
        assert_eq!(activity_level(99.99, 4), ActivityLevel::Medium);
        assert_eq!(activity_level(100.0, 4), ActivityLevel::High);
    }

    #[test]
    fn per_day_counts_totals_and_done() {
        let rows = vec![
            (date(2025, 3, 1), TaskStatus::Done),
            (date(2025, 3, 1), TaskStatus::Todo),
            (date(2025, 3, 2), TaskStatus::Done),
        ];
        let by_day = per_day_counts(&rows);
        assert_eq!(by_day[&date(2025, 3, 1)], (2, 1));
        assert_eq!(by_day[&date(2025, 3, 2)], (1, 1));
    }

    #[test]
    fn next_month_rolls_over_year() {
        assert_eq!(first_of_next_month(date(2025, 12, 15)), date(2026, 1, 1));
        assert_eq!(first_of_next_month(date(2025, 1, 31)), date(2025, 2, 1));
    }

    #[test]
    fn window_rejects_inverted_range() {
        let err = resolve_window(Some(date(2025, 5, 10)), Some(date(2025, 5, 1)), 30);
        assert!(err.is_err());
    }

    #[test]
    fn window_rejects_absurd_day_span() {
        assert!(matches!(
            resolve_window(None, None, i64::MAX),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            resolve_window(None, None, -1),
            Err(AppError::Validation(_))
        ));
        // Explicit dates never consult the fallback span.
        assert!(resolve_window(Some(date(2025, 5, 1)), Some(date(2025, 5, 10)), i64::MAX).is_ok());
    }
}
