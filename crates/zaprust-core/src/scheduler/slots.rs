//! One-minute slot allocation for scheduled jobs
//!
//! Two posts firing inside the same calendar minute look robotic, so
//! job creation nudges the requested time forward, whole minutes at a
//! time, until the minute is free. Seconds are preserved.

use chrono::{DateTime, Duration, Timelike, Utc};
use std::future::Future;

/// Truncate a timestamp to the start of its calendar minute
pub fn minute_start(at: DateTime<Utc>) -> DateTime<Utc> {
    at.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(at)
}

/// First time at or after `requested` whose calendar minute is free
///
/// `occupied` reports whether any job already occupies the minute
/// starting at the given instant.
pub async fn find_free_slot<F, Fut>(
    requested: DateTime<Utc>,
    mut occupied: F,
) -> Result<DateTime<Utc>, sqlx::Error>
where
    F: FnMut(DateTime<Utc>) -> Fut,
    Fut: Future<Output = Result<bool, sqlx::Error>>,
{
    let mut candidate = requested;
    while occupied(minute_start(candidate)).await? {
        candidate = candidate + Duration::minutes(1);
    }
    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    fn dt(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn test_minute_start_truncates_seconds() {
        assert_eq!(
            minute_start(dt("2024-01-03T10:30:45Z")),
            dt("2024-01-03T10:30:00Z")
        );
        assert_eq!(
            minute_start(dt("2024-01-03T10:30:00Z")),
            dt("2024-01-03T10:30:00Z")
        );
    }

    #[tokio::test]
    async fn test_free_minute_passes_through() {
        let slot = find_free_slot(dt("2024-01-03T10:30:45Z"), |_| async { Ok(false) })
            .await
            .unwrap();
        assert_eq!(slot, dt("2024-01-03T10:30:45Z"));
    }

    #[tokio::test]
    async fn test_occupied_minutes_are_skipped_preserving_seconds() {
        let taken: HashSet<DateTime<Utc>> =
            [dt("2024-01-03T10:30:00Z"), dt("2024-01-03T10:31:00Z")]
                .into_iter()
                .collect();

        let slot = find_free_slot(dt("2024-01-03T10:30:45Z"), |minute| {
            let taken = taken.clone();
            async move { Ok(taken.contains(&minute)) }
        })
        .await
        .unwrap();

        assert_eq!(slot, dt("2024-01-03T10:32:45Z"));
    }
}
