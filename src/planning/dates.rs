use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Inclusive [Monday, Sunday] range containing `today`.
///
/// All arithmetic is on calendar dates: a plan date is a day, not an
/// instant, so none of this goes through UTC timestamps.
pub fn current_week_range(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    // Mon=0 .. Sun=6, so Sunday shifts back six days.
    let offset = today.weekday().num_days_from_monday() as i64;
    let monday = today - Duration::days(offset);
    (monday, monday + Duration::days(6))
}

/// First Monday that anchors week 1 of `year`.
///
/// If Jan 1 is a Sunday the first Monday is Jan 2; otherwise Jan 1 is
/// shifted forward to the next Monday (zero shift when it already is
/// one). Mirrors the week numbering the plan views navigate by.
pub fn first_monday_of_year(year: i32) -> NaiveDate {
    // Jan 1 always exists for any in-range year.
    let jan1 = NaiveDate::from_ymd_opt(year, 1, 1).expect("valid year");
    let shift = match jan1.weekday() {
        Weekday::Sun => 1,
        // 0-based day-of-week with Sunday = 0; zero shift for a Monday.
        wd => (8 - wd.num_days_from_sunday() as i64) % 7,
    };
    jan1 + Duration::days(shift)
}

/// Inclusive [Monday, Sunday] range for week `week` (1-based) of `year`.
pub fn week_range(year: i32, week: u32) -> (NaiveDate, NaiveDate) {
    let monday = first_monday_of_year(year) + Duration::days((week as i64 - 1) * 7);
    (monday, monday + Duration::days(6))
}

/// A (year, week) position that navigates circularly: stepping below
/// week 1 wraps to week 53 of the previous year, stepping past week 53
/// wraps to week 1 of the next year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekCursor {
    pub year: i32,
    pub week: u32,
}

impl WeekCursor {
    pub const MAX_WEEK: u32 = 53;

    pub fn new(year: i32, week: u32) -> Self {
        Self {
            year,
            week: week.clamp(1, Self::MAX_WEEK),
        }
    }

    /// Cursor positioned on the week containing `today`.
    pub fn containing(today: NaiveDate) -> Self {
        let year = today.year();
        let first_monday = first_monday_of_year(year);
        let days = (today - first_monday).num_days();
        let week = (days.div_euclid(7) + 1).max(1) as u32;
        Self::new(year, week)
    }

    pub fn prev(self) -> Self {
        if self.week <= 1 {
            Self {
                year: self.year - 1,
                week: Self::MAX_WEEK,
            }
        } else {
            Self {
                year: self.year,
                week: self.week - 1,
            }
        }
    }

    pub fn next(self) -> Self {
        if self.week >= Self::MAX_WEEK {
            Self {
                year: self.year + 1,
                week: 1,
            }
        } else {
            Self {
                year: self.year,
                week: self.week + 1,
            }
        }
    }

    pub fn range(self) -> (NaiveDate, NaiveDate) {
        week_range(self.year, self.week)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_week_range_for_a_monday_starts_on_itself() {
        // 2024-06-10 is a Monday
        let monday = date(2024, 6, 10);
        let (start, end) = current_week_range(monday);
        assert_eq!(start, monday);
        assert_eq!(end, monday + Duration::days(6));
    }

    #[test]
    fn test_week_range_for_a_sunday_goes_back_six_days() {
        // 2024-06-16 is a Sunday
        let sunday = date(2024, 6, 16);
        let (start, end) = current_week_range(sunday);
        assert_eq!(start, date(2024, 6, 10));
        assert_eq!(end, sunday);
    }

    #[test]
    fn test_week_range_midweek() {
        // 2024-06-13 is a Thursday
        let (start, end) = current_week_range(date(2024, 6, 13));
        assert_eq!(start, date(2024, 6, 10));
        assert_eq!(end, date(2024, 6, 16));
    }

    #[test]
    fn test_first_monday_when_jan1_is_monday() {
        // Jan 1 2024 is a Monday
        assert_eq!(first_monday_of_year(2024), date(2024, 1, 1));
    }

    #[test]
    fn test_first_monday_when_jan1_is_sunday() {
        // Jan 1 2023 is a Sunday -> first Monday is Jan 2
        assert_eq!(first_monday_of_year(2023), date(2023, 1, 2));
    }

    #[test]
    fn test_first_monday_when_jan1_is_midweek() {
        // Jan 1 2025 is a Wednesday -> first Monday is Jan 6
        assert_eq!(first_monday_of_year(2025), date(2025, 1, 6));
    }

    #[test]
    fn test_week_one_of_2024_round_trip() {
        let (monday, sunday) = week_range(2024, 1);
        assert!(monday >= date(2023, 12, 26) && monday <= date(2024, 1, 8));
        assert_eq!(sunday, monday + Duration::days(6));
    }

    #[test]
    fn test_cursor_wraps_below_week_one() {
        let cursor = WeekCursor::new(2024, 1).prev();
        assert_eq!(cursor, WeekCursor::new(2023, 53));
    }

    #[test]
    fn test_cursor_wraps_past_week_fifty_three() {
        let cursor = WeekCursor::new(2024, 53).next();
        assert_eq!(cursor, WeekCursor::new(2025, 1));
    }

    #[test]
    fn test_cursor_prev_next_are_inverse() {
        let cursor = WeekCursor::new(2024, 20);
        assert_eq!(cursor.prev().next(), cursor);
        assert_eq!(cursor.next().prev(), cursor);
    }

    #[test]
    fn test_cursor_containing_today() {
        // Week 1 of 2024 starts Jan 1; Jan 10 is in week 2.
        assert_eq!(WeekCursor::containing(date(2024, 1, 3)), WeekCursor::new(2024, 1));
        assert_eq!(WeekCursor::containing(date(2024, 1, 10)), WeekCursor::new(2024, 2));
    }
}
