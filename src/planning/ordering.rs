use chrono::{Datelike, NaiveDate};

/// Which display bucket a plan falls into relative to "now".
/// Buckets sort Current < Future < Past; within a bucket plans sort by
/// ascending date. Past entries ascending (oldest first) is a
/// deliberate policy, not an accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Bucket {
    Current,
    Future,
    Past,
}

fn bucket(ordinal: i64, now_ordinal: i64) -> Bucket {
    match ordinal.cmp(&now_ordinal) {
        std::cmp::Ordering::Equal => Bucket::Current,
        std::cmp::Ordering::Greater => Bucket::Future,
        std::cmp::Ordering::Less => Bucket::Past,
    }
}

/// Sort key for a daily plan dated `plan_date` when today is `today`.
/// Today's plan first, then future plans ascending, then past ascending.
pub fn daily_sort_key(plan_date: NaiveDate, today: NaiveDate) -> (u8, i64) {
    let ordinal = plan_date.num_days_from_ce() as i64;
    let now = today.num_days_from_ce() as i64;
    (bucket(ordinal, now) as u8, ordinal)
}

/// Combined month ordinal used for distance comparisons.
pub fn month_ordinal(year: i32, month: u32) -> i64 {
    year as i64 * 12 + month as i64
}

/// Sort key for a monthly plan; identical policy with the current
/// (year, month) as the first-priority bucket.
pub fn monthly_sort_key(year: i32, month: u32, now_year: i32, now_month: u32) -> (u8, i64) {
    let ordinal = month_ordinal(year, month);
    let now = month_ordinal(now_year, now_month);
    (bucket(ordinal, now) as u8, ordinal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_today_sorts_before_everything() {
        let today = date(2024, 6, 12);
        let yesterday = today - Duration::days(1);
        let tomorrow = today + Duration::days(1);
        let day_after = today + Duration::days(2);

        let mut dates = vec![yesterday, today, tomorrow, day_after];
        dates.sort_by_key(|d| daily_sort_key(*d, today));
        assert_eq!(dates, vec![today, tomorrow, day_after, yesterday]);
    }

    #[test]
    fn test_past_plans_sort_oldest_first() {
        let today = date(2024, 6, 12);
        let mut dates = vec![
            today - Duration::days(1),
            today - Duration::days(10),
            today - Duration::days(5),
        ];
        dates.sort_by_key(|d| daily_sort_key(*d, today));
        assert_eq!(
            dates,
            vec![
                today - Duration::days(10),
                today - Duration::days(5),
                today - Duration::days(1),
            ]
        );
    }

    #[test]
    fn test_monthly_current_month_first_then_future_then_past() {
        // now = 2024-06
        let mut plans = vec![(2024, 5), (2024, 8), (2024, 6), (2023, 12), (2024, 7)];
        plans.sort_by_key(|(y, m)| monthly_sort_key(*y, *m, 2024, 6));
        assert_eq!(
            plans,
            vec![(2024, 6), (2024, 7), (2024, 8), (2023, 12), (2024, 5)]
        );
    }

    #[test]
    fn test_month_ordinal_spans_year_boundary() {
        assert_eq!(month_ordinal(2024, 1) - month_ordinal(2023, 12), 1);
    }
}
