use std::fmt;

use anyhow::{Result, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// --- Profile types ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn parse_gender(s: &str) -> Result<Gender> {
    match s.trim().to_lowercase().as_str() {
        "male" | "m" => Ok(Gender::Male),
        "female" | "f" => Ok(Gender::Female),
        "other" | "o" => Ok(Gender::Other),
        _ => bail!("Invalid gender '{s}'. Must be one of: male, female, other"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    LightlyActive,
    ModeratelyActive,
    VeryActive,
    ExtraActive,
}

pub const ACTIVITY_LEVELS: &[ActivityLevel] = &[
    ActivityLevel::Sedentary,
    ActivityLevel::LightlyActive,
    ActivityLevel::ModeratelyActive,
    ActivityLevel::VeryActive,
    ActivityLevel::ExtraActive,
];

impl ActivityLevel {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Sedentary => "Sedentary",
            Self::LightlyActive => "Lightly Active",
            Self::ModeratelyActive => "Moderately Active",
            Self::VeryActive => "Very Active",
            Self::ExtraActive => "Extra Active",
        }
    }

    /// Multiplier applied to BMR to get TDEE.
    #[must_use]
    pub fn factor(self) -> f64 {
        match self {
            Self::Sedentary => 1.2,
            Self::LightlyActive => 1.375,
            Self::ModeratelyActive => 1.55,
            Self::VeryActive => 1.725,
            Self::ExtraActive => 1.9,
        }
    }
}

impl fmt::Display for ActivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Accepts display labels ("Lightly Active") as well as kebab/snake forms.
pub fn parse_activity_level(s: &str) -> Result<ActivityLevel> {
    let key: String = s
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect();
    match key.as_str() {
        "sedentary" => Ok(ActivityLevel::Sedentary),
        "lightlyactive" | "light" => Ok(ActivityLevel::LightlyActive),
        "moderatelyactive" | "moderate" => Ok(ActivityLevel::ModeratelyActive),
        "veryactive" | "very" => Ok(ActivityLevel::VeryActive),
        "extraactive" | "extra" => Ok(ActivityLevel::ExtraActive),
        _ => bail!(
            "Invalid activity level '{s}'. Must be one of: {}",
            ACTIVITY_LEVELS
                .iter()
                .map(|a| a.label())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub age: u32,
    pub gender: Gender,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub activity_level: ActivityLevel,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            age: 30,
            gender: Gender::Male,
            weight_kg: 70.0,
            height_cm: 170.0,
            activity_level: ActivityLevel::Sedentary,
        }
    }
}

pub fn validate_profile(profile: &UserProfile) -> Result<()> {
    if !(1..=120).contains(&profile.age) {
        bail!("Age must be between 1 and 120 (got {})", profile.age);
    }
    validate_range("Weight (kg)", profile.weight_kg, 1.0, 300.0)?;
    validate_range("Height (cm)", profile.height_cm, 1.0, 300.0)?;
    Ok(())
}

// --- Meals ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snacks,
}

pub const MEAL_TYPES: &[MealType] = &[
    MealType::Breakfast,
    MealType::Lunch,
    MealType::Dinner,
    MealType::Snacks,
];

impl MealType {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Breakfast => "Breakfast",
            Self::Lunch => "Lunch",
            Self::Dinner => "Dinner",
            Self::Snacks => "Snacks",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn validate_meal_type(meal: &str) -> Result<MealType> {
    match meal.trim().to_lowercase().as_str() {
        "breakfast" => Ok(MealType::Breakfast),
        "lunch" => Ok(MealType::Lunch),
        "dinner" => Ok(MealType::Dinner),
        "snacks" | "snack" => Ok(MealType::Snacks),
        _ => bail!("Invalid meal '{meal}'. Must be one of: breakfast, lunch, dinner, snacks"),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealItem {
    pub food: String,
    pub amount_g: f64,
}

/// Calorie and macro totals. Grams for the macros, kcal for calories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroTotals {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl MacroTotals {
    pub fn add(&mut self, other: &MacroTotals) {
        self.calories += other.calories;
        self.protein += other.protein;
        self.carbs += other.carbs;
        self.fat += other.fat;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MealItemView {
    pub index: usize,
    pub food: String,
    pub amount_g: f64,
    pub nutrition: MacroTotals,
}

#[derive(Debug, Clone, Serialize)]
pub struct MealGroup {
    pub meal: MealType,
    pub items: Vec<MealItemView>,
    pub subtotal: MacroTotals,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CalorieGoalStatus {
    Under { remaining: f64 },
    Met,
    Over { excess: f64 },
}

#[derive(Debug, Clone, Serialize)]
pub struct CalorieGoalProgress {
    pub calorie_goal: u32,
    pub consumed: f64,
    /// Share of the goal eaten so far, capped at 1.0 for progress bars.
    pub fraction: f64,
    pub status: CalorieGoalStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct MealPlanSummary {
    pub meals: Vec<MealGroup>,
    pub totals: MacroTotals,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal: Option<CalorieGoalProgress>,
}

pub const MAX_MEAL_AMOUNT_G: f64 = 1000.0;
pub const MIN_CALORIE_GOAL: u32 = 1000;
pub const MAX_CALORIE_GOAL: u32 = 5000;
pub const DEFAULT_CALORIE_GOAL: u32 = 2000;

pub fn validate_amount_g(amount_g: f64) -> Result<()> {
    if !amount_g.is_finite() || amount_g <= 0.0 {
        bail!("Amount must be greater than 0 g");
    }
    if amount_g > MAX_MEAL_AMOUNT_G {
        bail!("Amount must be at most {MAX_MEAL_AMOUNT_G} g (got {amount_g})");
    }
    Ok(())
}

pub fn validate_calorie_goal(calories: u32) -> Result<()> {
    if !(MIN_CALORIE_GOAL..=MAX_CALORIE_GOAL).contains(&calories) {
        bail!(
            "Calorie goal must be between {MIN_CALORIE_GOAL} and {MAX_CALORIE_GOAL} (got {calories})"
        );
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DietType {
    Balanced,
    HighProtein,
    LowCarb,
    Vegetarian,
    Vegan,
}

impl DietType {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Balanced => "Balanced",
            Self::HighProtein => "High-protein",
            Self::LowCarb => "Low-carb",
            Self::Vegetarian => "Vegetarian",
            Self::Vegan => "Vegan",
        }
    }
}

impl fmt::Display for DietType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn parse_diet_type(s: &str) -> Result<DietType> {
    let key: String = s
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect();
    match key.as_str() {
        "balanced" => Ok(DietType::Balanced),
        "highprotein" => Ok(DietType::HighProtein),
        "lowcarb" => Ok(DietType::LowCarb),
        "vegetarian" => Ok(DietType::Vegetarian),
        "vegan" => Ok(DietType::Vegan),
        _ => bail!(
            "Invalid diet type '{s}'. Must be one of: balanced, high-protein, low-carb, vegetarian, vegan"
        ),
    }
}

// --- Progress tracking ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub date: NaiveDate,
    pub weight_kg: f64,
    pub body_fat_pct: f64,
    pub waist_cm: f64,
    pub chest_cm: f64,
    pub arms_cm: f64,
    pub thighs_cm: f64,
}

pub fn validate_progress_entry(entry: &ProgressEntry) -> Result<()> {
    validate_range("Weight (kg)", entry.weight_kg, 0.0, 500.0)?;
    validate_range("Body Fat %", entry.body_fat_pct, 0.0, 100.0)?;
    validate_range("Waist (cm)", entry.waist_cm, 0.0, 200.0)?;
    validate_range("Chest (cm)", entry.chest_cm, 0.0, 200.0)?;
    validate_range("Arms (cm)", entry.arms_cm, 0.0, 100.0)?;
    validate_range("Thighs (cm)", entry.thighs_cm, 0.0, 200.0)?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressMetric {
    Weight,
    BodyFat,
    Waist,
    Chest,
    Arms,
    Thighs,
}

pub const PROGRESS_METRICS: &[ProgressMetric] = &[
    ProgressMetric::Weight,
    ProgressMetric::BodyFat,
    ProgressMetric::Waist,
    ProgressMetric::Chest,
    ProgressMetric::Arms,
    ProgressMetric::Thighs,
];

impl ProgressMetric {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Weight => "Weight",
            Self::BodyFat => "Body Fat %",
            Self::Waist => "Waist",
            Self::Chest => "Chest",
            Self::Arms => "Arms",
            Self::Thighs => "Thighs",
        }
    }

    #[must_use]
    pub fn value_of(self, entry: &ProgressEntry) -> f64 {
        match self {
            Self::Weight => entry.weight_kg,
            Self::BodyFat => entry.body_fat_pct,
            Self::Waist => entry.waist_cm,
            Self::Chest => entry.chest_cm,
            Self::Arms => entry.arms_cm,
            Self::Thighs => entry.thighs_cm,
        }
    }
}

pub fn parse_progress_metric(s: &str) -> Result<ProgressMetric> {
    let key: String = s
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect();
    match key.as_str() {
        "weight" => Ok(ProgressMetric::Weight),
        "bodyfat" | "bodyfatpct" | "fat" => Ok(ProgressMetric::BodyFat),
        "waist" => Ok(ProgressMetric::Waist),
        "chest" => Ok(ProgressMetric::Chest),
        "arms" | "arm" => Ok(ProgressMetric::Arms),
        "thighs" | "thigh" => Ok(ProgressMetric::Thighs),
        _ => bail!("Invalid metric '{s}'. Must be one of: weight, body-fat, waist, chest, arms, thighs"),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricChange {
    pub metric: ProgressMetric,
    pub label: &'static str,
    pub change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goals {
    pub target_weight_kg: f64,
    pub target_body_fat_pct: f64,
    pub target_date: NaiveDate,
}

impl Goals {
    /// Empty targets with the date one month out.
    #[must_use]
    pub fn default_from(today: NaiveDate) -> Self {
        Self {
            target_weight_kg: 0.0,
            target_body_fat_pct: 0.0,
            target_date: today + chrono::Duration::days(30),
        }
    }
}

/// A partial goals change. `None` fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct GoalsUpdate {
    pub target_weight_kg: Option<f64>,
    pub target_body_fat_pct: Option<f64>,
    pub target_date: Option<NaiveDate>,
}

impl GoalsUpdate {
    #[must_use]
    pub fn apply_to(&self, current: &Goals) -> Goals {
        Goals {
            target_weight_kg: self.target_weight_kg.unwrap_or(current.target_weight_kg),
            target_body_fat_pct: self
                .target_body_fat_pct
                .unwrap_or(current.target_body_fat_pct),
            target_date: self.target_date.unwrap_or(current.target_date),
        }
    }
}

pub fn validate_goal_targets(goals: &Goals) -> Result<()> {
    validate_range("Target weight (kg)", goals.target_weight_kg, 0.0, 500.0)?;
    validate_range("Target body fat %", goals.target_body_fat_pct, 0.0, 100.0)
}

pub fn validate_target_date(date: NaiveDate, today: NaiveDate) -> Result<()> {
    if date < today {
        bail!("Target date {} must not be in the past", date.format("%Y-%m-%d"));
    }
    Ok(())
}

pub fn validate_goals(goals: &Goals, today: NaiveDate) -> Result<()> {
    validate_goal_targets(goals)?;
    validate_target_date(goals.target_date, today)
}

#[derive(Debug, Clone, Serialize)]
pub struct WeightGoalProgress {
    pub start_weight_kg: f64,
    pub current_weight_kg: f64,
    pub target_weight_kg: f64,
    pub percent: f64,
    /// `percent / 100`, capped at 1.0.
    pub fraction: f64,
}

// --- Activity tracking ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub date: NaiveDate,
    pub steps: u32,
    pub calories_burned: u32,
    pub active_minutes: u32,
    pub heart_rate: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivitySummary {
    pub days: usize,
    pub avg_steps: f64,
    pub avg_calories_burned: f64,
    pub avg_active_minutes: f64,
    pub avg_heart_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub avg_calories_burned: f64,
    pub previous_goal: Option<u32>,
    pub calorie_goal: u32,
    pub synced_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<String>,
}

// --- Units ---

/// Convert a quantity with a unit to grams.
/// Volume-based conversions assume water density (1 ml = 1 g).
/// Returns `(grams, is_approximate)` where `is_approximate` is true for volume conversions.
#[must_use]
pub fn convert_to_grams(quantity: f64, unit: &str) -> Option<(f64, bool)> {
    let lower = unit.to_lowercase();
    match lower.as_str() {
        "g" | "gram" | "grams" => Some((quantity, false)),
        "kg" | "kilogram" | "kilograms" => Some((quantity * 1000.0, false)),
        "lb" | "lbs" | "pound" | "pounds" => Some((quantity * 454.0, false)),
        "oz" | "ounce" | "ounces" => Some((quantity * 28.35, false)),
        "tbsp" | "tablespoon" | "tablespoons" => Some((quantity * 15.0, true)),
        "tsp" | "teaspoon" | "teaspoons" => Some((quantity * 5.0, true)),
        "ml" | "milliliter" | "milliliters" | "millilitre" | "millilitres" => {
            Some((quantity, true))
        }
        "l" | "liter" | "liters" | "litre" | "litres" => Some((quantity * 1000.0, true)),
        _ => None,
    }
}

fn validate_range(field: &str, value: f64, min: f64, max: f64) -> Result<()> {
    if !value.is_finite() || value < min || value > max {
        bail!("{field} must be between {min} and {max} (got {value})");
    }
    Ok(())
}
