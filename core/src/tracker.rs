use anyhow::{Result, bail};
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::{
    ActivityRecord, ActivitySummary, DEFAULT_CALORIE_GOAL, MAX_CALORIE_GOAL, MIN_CALORIE_GOAL,
};

/// Days of history shown on the dashboard and used by a sync.
pub const DEFAULT_HISTORY_DAYS: u32 = 7;

/// Longest history a dashboard may request.
pub const MAX_HISTORY_DAYS: u32 = 365;

/// A source of daily activity data.
///
/// The service only talks to trackers through this trait, so a real device
/// integration can replace [`MockFitnessTracker`] without touching callers.
pub trait FitnessTracker: Send {
    fn connect(&mut self) -> Result<()>;
    fn disconnect(&mut self);
    fn is_connected(&self) -> bool;
    /// Daily records from `end - days` through `end`, both inclusive.
    fn fetch_recent(&mut self, days: u32, end: NaiveDate) -> Result<Vec<ActivityRecord>>;
}

/// Generates plausible random activity instead of talking to a device.
pub struct MockFitnessTracker {
    connected: bool,
    rng: StdRng,
}

impl MockFitnessTracker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            connected: false,
            rng: StdRng::from_os_rng(),
        }
    }

    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            connected: false,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for MockFitnessTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl FitnessTracker for MockFitnessTracker {
    fn connect(&mut self) -> Result<()> {
        self.connected = true;
        tracing::info!("mock fitness tracker connected");
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
        tracing::info!("mock fitness tracker disconnected");
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn fetch_recent(&mut self, days: u32, end: NaiveDate) -> Result<Vec<ActivityRecord>> {
        if !self.connected {
            bail!("Fitness tracker is not connected");
        }
        let Some(start) = end.checked_sub_signed(Duration::days(i64::from(days))) else {
            bail!("History of {days} days before {end} is out of range");
        };
        Ok(start
            .iter_days()
            .take_while(|d| *d <= end)
            .map(|date| ActivityRecord {
                date,
                steps: self.rng.random_range(5000..=15000),
                calories_burned: self.rng.random_range(1800..=3000),
                active_minutes: self.rng.random_range(30..=120),
                heart_rate: self.rng.random_range(60..=100),
            })
            .collect())
    }
}

#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn summarize(records: &[ActivityRecord]) -> Option<ActivitySummary> {
    if records.is_empty() {
        return None;
    }
    let n = records.len() as f64;
    let mean = |f: fn(&ActivityRecord) -> u32| -> f64 {
        records.iter().map(|r| f64::from(f(r))).sum::<f64>() / n
    };
    Some(ActivitySummary {
        days: records.len(),
        avg_steps: mean(|r| r.steps),
        avg_calories_burned: mean(|r| r.calories_burned),
        avg_active_minutes: mean(|r| r.active_minutes),
        avg_heart_rate: mean(|r| r.heart_rate),
    })
}

/// New daily calorie goal after a sync: +200 kcal when the average burn is above
/// 2500, -100 when below 2000, unchanged otherwise. Starts from the default goal
/// and stays within the allowed goal range.
#[must_use]
pub fn adjust_calorie_goal(current: Option<u32>, avg_calories_burned: f64) -> u32 {
    let goal = current.unwrap_or(DEFAULT_CALORIE_GOAL);
    let adjusted = if avg_calories_burned > 2500.0 {
        goal.saturating_add(200)
    } else if avg_calories_burned < 2000.0 {
        goal.saturating_sub(100)
    } else {
        goal
    };
    adjusted.clamp(MIN_CALORIE_GOAL, MAX_CALORIE_GOAL)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 20).unwrap()
    }

    #[test]
    fn test_fetch_requires_connection() {
        let mut t = MockFitnessTracker::with_seed(1);
        assert!(!t.is_connected());
        assert!(t.fetch_recent(7, today()).is_err());

        t.connect().unwrap();
        assert!(t.is_connected());
        assert!(t.fetch_recent(7, today()).is_ok());

        t.disconnect();
        assert!(t.fetch_recent(7, today()).is_err());
    }

    #[test]
    fn test_fetch_returns_inclusive_range() {
        let mut t = MockFitnessTracker::with_seed(2);
        t.connect().unwrap();
        let records = t.fetch_recent(7, today()).unwrap();
        assert_eq!(records.len(), 8);
        assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2024, 5, 13).unwrap());
        assert_eq!(records[7].date, today());

        assert_eq!(t.fetch_recent(0, today()).unwrap().len(), 1);
    }

    #[test]
    fn test_fetch_before_calendar_start_is_error() {
        let mut t = MockFitnessTracker::with_seed(1);
        t.connect().unwrap();
        let err = t.fetch_recent(u32::MAX, today()).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_mock_values_in_range() {
        let mut t = MockFitnessTracker::with_seed(3);
        t.connect().unwrap();
        for _ in 0..20 {
            for r in t.fetch_recent(30, today()).unwrap() {
                assert!((5000..=15000).contains(&r.steps));
                assert!((1800..=3000).contains(&r.calories_burned));
                assert!((30..=120).contains(&r.active_minutes));
                assert!((60..=100).contains(&r.heart_rate));
            }
        }
    }

    #[test]
    fn test_seeded_trackers_agree() {
        let mut a = MockFitnessTracker::with_seed(42);
        let mut b = MockFitnessTracker::with_seed(42);
        a.connect().unwrap();
        b.connect().unwrap();
        assert_eq!(
            a.fetch_recent(7, today()).unwrap(),
            b.fetch_recent(7, today()).unwrap()
        );
    }

    #[test]
    fn test_summarize() {
        assert!(summarize(&[]).is_none());
        let records = vec![
            ActivityRecord {
                date: today(),
                steps: 6000,
                calories_burned: 2000,
                active_minutes: 40,
                heart_rate: 70,
            },
            ActivityRecord {
                date: today(),
                steps: 10000,
                calories_burned: 2600,
                active_minutes: 80,
                heart_rate: 90,
            },
        ];
        let s = summarize(&records).unwrap();
        assert_eq!(s.days, 2);
        assert!((s.avg_steps - 8000.0).abs() < f64::EPSILON);
        assert!((s.avg_calories_burned - 2300.0).abs() < f64::EPSILON);
        assert!((s.avg_active_minutes - 60.0).abs() < f64::EPSILON);
        assert!((s.avg_heart_rate - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_adjust_calorie_goal() {
        assert_eq!(adjust_calorie_goal(None, 2600.0), 2200);
        assert_eq!(adjust_calorie_goal(None, 1900.0), 1900);
        assert_eq!(adjust_calorie_goal(None, 2200.0), 2000);
        assert_eq!(adjust_calorie_goal(Some(2400), 2500.0), 2400);
        assert_eq!(adjust_calorie_goal(Some(2400), 2000.0), 2400);
        assert_eq!(adjust_calorie_goal(Some(2400), 2500.5), 2600);
    }

    #[test]
    fn test_adjust_calorie_goal_stays_in_range() {
        assert_eq!(adjust_calorie_goal(Some(4900), 2900.0), 5000);
        assert_eq!(adjust_calorie_goal(Some(1050), 1850.0), 1000);
    }
}
