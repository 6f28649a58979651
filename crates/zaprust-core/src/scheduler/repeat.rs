//! Successor computation for repeating jobs

use chrono::{Datelike, Duration, NaiveDateTime};
use zaprust_storage::RepeatType;

/// Next occurrence after `fired_at`, preserving the time of day
///
/// Weekdays are numbered with Sunday as 0. Custom schedules scan the
/// seven days following the fired occurrence, so a job that fired on a
/// selected weekday moves to the next selected one, a week later at
/// most. An empty weekday set yields no successor.
pub fn next_occurrence(
    fired_at: NaiveDateTime,
    repeat: RepeatType,
    weekdays: &[u32],
) -> Option<NaiveDateTime> {
    match repeat {
        RepeatType::Daily => Some(fired_at + Duration::days(1)),
        RepeatType::Weekly => Some(fired_at + Duration::days(7)),
        RepeatType::Custom => {
            if weekdays.is_empty() {
                return None;
            }
            let mut candidate = fired_at + Duration::days(1);
            for _ in 0..7 {
                if weekdays.contains(&candidate.weekday().num_days_from_sunday()) {
                    return Some(candidate);
                }
                candidate = candidate + Duration::days(1);
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dt(s: &str) -> NaiveDateTime {
        s.parse().unwrap()
    }

    // 2024-01-03 is a Wednesday

    #[test]
    fn test_daily_advances_one_day() {
        assert_eq!(
            next_occurrence(dt("2024-01-03T10:30:00"), RepeatType::Daily, &[]),
            Some(dt("2024-01-04T10:30:00"))
        );
    }

    #[test]
    fn test_weekly_advances_seven_days() {
        assert_eq!(
            next_occurrence(dt("2024-01-03T10:30:00"), RepeatType::Weekly, &[]),
            Some(dt("2024-01-10T10:30:00"))
        );
    }

    #[test]
    fn test_custom_picks_next_selected_weekday() {
        // Friday is day 5
        assert_eq!(
            next_occurrence(dt("2024-01-03T10:30:00"), RepeatType::Custom, &[5]),
            Some(dt("2024-01-05T10:30:00"))
        );
        // Monday is day 1, so the scan crosses the weekend
        assert_eq!(
            next_occurrence(dt("2024-01-03T10:30:00"), RepeatType::Custom, &[1]),
            Some(dt("2024-01-08T10:30:00"))
        );
    }

    #[test]
    fn test_custom_same_weekday_lands_next_week() {
        // Wednesday only: the scan starts the day after firing
        assert_eq!(
            next_occurrence(dt("2024-01-03T10:30:00"), RepeatType::Custom, &[3]),
            Some(dt("2024-01-10T10:30:00"))
        );
    }

    #[test]
    fn test_custom_weekend_schedule() {
        assert_eq!(
            next_occurrence(dt("2024-01-03T10:30:00"), RepeatType::Custom, &[0, 6]),
            Some(dt("2024-01-06T10:30:00"))
        );
    }

    #[test]
    fn test_custom_without_weekdays_has_no_successor() {
        assert_eq!(
            next_occurrence(dt("2024-01-03T10:30:00"), RepeatType::Custom, &[]),
            None
        );
    }
}
