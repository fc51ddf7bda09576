use anyhow::Result;
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Serialize;

use crate::foods::FOOD_DATABASE;
use crate::models::{DietType, MealItem, validate_calorie_goal};

/// Meals in a recommendation and their share of the daily target.
pub const RECOMMENDED_MEALS: &[(&str, f64)] = &[
    ("Breakfast", 0.3),
    ("Lunch", 0.3),
    ("Dinner", 0.3),
    ("Snack", 0.1),
];

pub const FOODS_PER_MEAL: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct RecommendedMeal {
    pub meal: &'static str,
    pub target_calories: f64,
    pub items: Vec<MealItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub diet: DietType,
    pub calorie_target: u32,
    pub meals: Vec<RecommendedMeal>,
    pub note: &'static str,
}

pub const RECOMMENDATION_NOTE: &str =
    "This is a basic suggestion. Please consult with a nutritionist for a personalized meal plan.";

/// Three distinct foods per meal, each portioned to a third of the meal's calories.
/// The diet type labels the plan; it does not restrict the food choice.
pub fn recommend_meals<R: Rng + ?Sized>(
    diet: DietType,
    calorie_target: u32,
    rng: &mut R,
) -> Result<Recommendation> {
    validate_calorie_goal(calorie_target)?;
    let target = f64::from(calorie_target);

    let mut meals = Vec::with_capacity(RECOMMENDED_MEALS.len());
    for &(meal, ratio) in RECOMMENDED_MEALS {
        let meal_calories = target * ratio;
        let items = FOOD_DATABASE
            .choose_multiple(rng, FOODS_PER_MEAL)
            .map(|food| MealItem {
                food: food.name.to_string(),
                amount_g: portion_grams(meal_calories, food.per_100g.calories),
            })
            .collect();
        meals.push(RecommendedMeal {
            meal,
            target_calories: meal_calories,
            items,
        });
    }

    tracing::debug!(%diet, calorie_target, "generated meal recommendation");

    Ok(Recommendation {
        diet,
        calorie_target,
        meals,
        note: RECOMMENDATION_NOTE,
    })
}

#[allow(clippy::cast_precision_loss)]
fn portion_grams(meal_calories: f64, kcal_per_100g: f64) -> f64 {
    (meal_calories / (FOODS_PER_MEAL as f64 * kcal_per_100g) * 100.0).round()
}
