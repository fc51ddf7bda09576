use std::io::{Read, Write};

use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, NaiveDateTime};
use rand::Rng;
use serde::Serialize;

use crate::meal_plan::MealPlan;
use crate::models::{
    ActivityRecord, ActivitySummary, DEFAULT_CALORIE_GOAL, Goals, GoalsUpdate, MealItem,
    MealPlanSummary, MetricChange, ProgressEntry, ProgressMetric, SyncOutcome,
    WeightGoalProgress, validate_calorie_goal, validate_goal_targets, validate_goals,
    validate_meal_type, validate_target_date,
};
use crate::progress::{ProgressLog, weight_goal_progress};
use crate::suggest::{SuggestedMeal, suggest_meal_plan};
use crate::tracker::{
    DEFAULT_HISTORY_DAYS, FitnessTracker, MAX_HISTORY_DAYS, MockFitnessTracker,
    adjust_calorie_goal, summarize,
};

#[derive(Debug, Clone, Serialize)]
pub struct ActivityDashboard {
    pub records: Vec<ActivityRecord>,
    pub summary: ActivitySummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct GoalsView {
    pub goals: Goals,
    pub is_set: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_progress: Option<WeightGoalProgress>,
}

/// One user's tracking session: meal plan, progress log, goals, and fitness tracker.
///
/// Nothing is persisted; dropping the service discards the session.
pub struct CalTrackService {
    session_id: String,
    meal_plan: MealPlan,
    progress: ProgressLog,
    goals: Option<Goals>,
    tracker: Box<dyn FitnessTracker>,
    calorie_goal: Option<u32>,
    last_sync: Option<NaiveDateTime>,
}

impl CalTrackService {
    #[must_use]
    pub fn new() -> Self {
        Self::with_tracker(Box::new(MockFitnessTracker::new()))
    }

    #[must_use]
    pub fn with_tracker(tracker: Box<dyn FitnessTracker>) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            meal_plan: MealPlan::new(),
            progress: ProgressLog::new(),
            goals: None,
            tracker,
            calorie_goal: None,
            last_sync: None,
        }
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    // --- Meal plan ---

    pub fn add_meal_item(&mut self, meal: &str, food: &str, amount_g: f64) -> Result<MealItem> {
        let meal = validate_meal_type(meal)?;
        self.meal_plan.add(meal, food, amount_g).cloned()
    }

    pub fn remove_meal_item(&mut self, meal: &str, index: usize) -> Result<MealItem> {
        let meal = validate_meal_type(meal)?;
        self.meal_plan.remove(meal, index)
    }

    pub fn clear_meal_plan(&mut self) {
        self.meal_plan.clear();
    }

    #[must_use]
    pub fn meal_plan(&self) -> &MealPlan {
        &self.meal_plan
    }

    /// Meal plan with progress against `calorie_goal`, or the session goal when omitted.
    pub fn meal_plan_summary(&self, calorie_goal: Option<u32>) -> Result<MealPlanSummary> {
        let goal = calorie_goal.unwrap_or_else(|| self.calorie_goal());
        validate_calorie_goal(goal)?;
        self.meal_plan.summary(Some(goal))
    }

    /// Synced or user-set daily goal, falling back to the default.
    #[must_use]
    pub fn calorie_goal(&self) -> u32 {
        self.calorie_goal.unwrap_or(DEFAULT_CALORIE_GOAL)
    }

    pub fn set_calorie_goal(&mut self, calorie_goal: u32) -> Result<()> {
        validate_calorie_goal(calorie_goal)?;
        self.calorie_goal = Some(calorie_goal);
        Ok(())
    }

    pub fn suggest_meals<R: Rng + ?Sized>(
        &self,
        calorie_goal: Option<u32>,
        rng: &mut R,
    ) -> Result<Vec<SuggestedMeal>> {
        suggest_meal_plan(calorie_goal.unwrap_or_else(|| self.calorie_goal()), rng)
    }

    /// Add every suggested item to the meal plan. Returns the number of items added.
    pub fn apply_suggestion(&mut self, suggestion: &[SuggestedMeal]) -> Result<usize> {
        let mut added = 0;
        for meal in suggestion {
            for item in &meal.items {
                self.meal_plan
                    .add(meal.meal, &item.food, item.amount_g)
                    .with_context(|| format!("Failed to add {} to {}", item.food, meal.meal))?;
                added += 1;
            }
        }
        Ok(added)
    }

    // --- Progress ---

    pub fn log_progress(&mut self, entry: ProgressEntry) -> Result<ProgressEntry> {
        self.progress.log(entry).cloned()
    }

    #[must_use]
    pub fn progress(&self) -> &ProgressLog {
        &self.progress
    }

    #[must_use]
    pub fn progress_entries(&self) -> Vec<ProgressEntry> {
        self.progress.entries_by_date()
    }

    #[must_use]
    pub fn progress_changes(&self) -> Option<Vec<MetricChange>> {
        self.progress.overall_changes()
    }

    #[must_use]
    pub fn metric_series(&self, metric: ProgressMetric) -> Vec<(NaiveDate, f64)> {
        self.progress.metric_series(metric)
    }

    pub fn export_progress_csv<W: Write>(&self, writer: W) -> Result<()> {
        self.progress.export_csv(writer)
    }

    pub fn import_progress_csv<R: Read>(&mut self, reader: R) -> Result<usize> {
        let count = self.progress.import_csv(reader)?;
        tracing::info!(session = %self.session_id, count, "imported progress entries");
        Ok(count)
    }

    // --- Goals ---

    pub fn set_goals(&mut self, goals: Goals, today: NaiveDate) -> Result<()> {
        validate_goals(&goals, today)?;
        self.goals = Some(goals);
        Ok(())
    }

    /// Merge `update` into the current goals. A stored target date that has since
    /// passed is kept as is; only a newly supplied date must not be in the past.
    pub fn update_goals(&mut self, update: &GoalsUpdate, today: NaiveDate) -> Result<()> {
        if let Some(date) = update.target_date {
            validate_target_date(date, today)?;
        }
        let goals = update.apply_to(&self.goals(today).goals);
        validate_goal_targets(&goals)?;
        self.goals = Some(goals);
        Ok(())
    }

    /// Current goals (defaults until set) and weight progress once goals are set.
    #[must_use]
    pub fn goals(&self, today: NaiveDate) -> GoalsView {
        match &self.goals {
            Some(goals) => GoalsView {
                goals: goals.clone(),
                is_set: true,
                weight_progress: weight_goal_progress(&self.progress, goals),
            },
            None => GoalsView {
                goals: Goals::default_from(today),
                is_set: false,
                weight_progress: None,
            },
        }
    }

    // --- Fitness tracker ---

    pub fn connect_tracker(&mut self) -> Result<()> {
        self.tracker.connect()
    }

    pub fn disconnect_tracker(&mut self) {
        self.tracker.disconnect();
    }

    #[must_use]
    pub fn tracker_connected(&self) -> bool {
        self.tracker.is_connected()
    }

    #[must_use]
    pub fn last_sync(&self) -> Option<NaiveDateTime> {
        self.last_sync
    }

    pub fn activity_dashboard(
        &mut self,
        days: Option<u32>,
        today: NaiveDate,
    ) -> Result<ActivityDashboard> {
        let days = days.unwrap_or(DEFAULT_HISTORY_DAYS);
        if days > MAX_HISTORY_DAYS {
            bail!("Days must be between 0 and {MAX_HISTORY_DAYS} (got {days})");
        }
        let records = self.tracker.fetch_recent(days, today)?;
        let summary = summarize(&records).context("Fitness tracker returned no data")?;
        Ok(ActivityDashboard { records, summary })
    }

    /// Pull recent activity and adjust the daily calorie goal from the average burn.
    pub fn sync_tracker(&mut self, now: NaiveDateTime) -> Result<SyncOutcome> {
        let records = self.tracker.fetch_recent(DEFAULT_HISTORY_DAYS, now.date())?;
        let summary = summarize(&records).context("Fitness tracker returned no data")?;

        let previous_goal = self.calorie_goal;
        let calorie_goal = adjust_calorie_goal(previous_goal, summary.avg_calories_burned);
        let last_sync = self.last_sync.replace(now);
        self.calorie_goal = Some(calorie_goal);

        tracing::info!(
            session = %self.session_id,
            avg_burned = summary.avg_calories_burned,
            calorie_goal,
            "synced fitness tracker"
        );

        Ok(SyncOutcome {
            avg_calories_burned: summary.avg_calories_burned,
            previous_goal,
            calorie_goal,
            synced_at: format_timestamp(now),
            last_sync: last_sync.map(format_timestamp),
        })
    }
}

impl Default for CalTrackService {
    fn default() -> Self {
        Self::new()
    }
}

fn format_timestamp(t: NaiveDateTime) -> String {
    t.format("%Y-%m-%d %H:%M:%S").to_string()
}
