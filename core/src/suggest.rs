use anyhow::Result;
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Serialize;

use crate::foods::FOOD_DATABASE;
use crate::models::{MealItem, MealType, validate_calorie_goal};

/// Share of the daily calorie goal given to each meal.
pub const MEAL_RATIOS: &[(MealType, f64)] = &[
    (MealType::Breakfast, 0.25),
    (MealType::Lunch, 0.35),
    (MealType::Dinner, 0.30),
    (MealType::Snacks, 0.10),
];

pub const MAX_ITEMS_PER_MEAL: usize = 3;
/// Accepted items may push a meal up to 110% of its target.
pub const OVERFLOW_ALLOWANCE: f64 = 1.1;
pub const MIN_SUGGESTED_G: u32 = 50;
pub const MAX_SUGGESTED_G: u32 = 200;
/// Caps rejected draws so a meal target smaller than any possible item still terminates.
pub const MAX_DRAWS_PER_MEAL: usize = 1000;

#[derive(Debug, Clone, Serialize)]
pub struct SuggestedMeal {
    pub meal: MealType,
    pub target_calories: f64,
    pub items: Vec<MealItem>,
    pub total_calories: f64,
}

pub fn suggest_meal_plan<R: Rng + ?Sized>(
    calorie_goal: u32,
    rng: &mut R,
) -> Result<Vec<SuggestedMeal>> {
    validate_calorie_goal(calorie_goal)?;
    let goal = f64::from(calorie_goal);
    let mut meals = Vec::with_capacity(MEAL_RATIOS.len());
    for &(meal, ratio) in MEAL_RATIOS {
        meals.push(suggest_meal(meal, goal * ratio, rng));
    }
    Ok(meals)
}

/// Greedy random fill of one meal: draw a food and a gram amount, keep it if the
/// running total stays within the overflow allowance, stop at the item cap or
/// once the target is reached. May finish under target.
pub fn suggest_meal<R: Rng + ?Sized>(
    meal: MealType,
    target_calories: f64,
    rng: &mut R,
) -> SuggestedMeal {
    let ceiling = target_calories * OVERFLOW_ALLOWANCE;
    let mut items = Vec::new();
    let mut current = 0.0;
    let mut draws = 0;

    while current < target_calories
        && items.len() < MAX_ITEMS_PER_MEAL
        && draws < MAX_DRAWS_PER_MEAL
    {
        draws += 1;
        let Some(food) = FOOD_DATABASE.choose(rng) else {
            break;
        };
        let amount = rng.random_range(MIN_SUGGESTED_G..=MAX_SUGGESTED_G);
        let calories = food.per_100g.calories * f64::from(amount) / 100.0;

        if current + calories <= ceiling {
            items.push(MealItem {
                food: food.name.to_string(),
                amount_g: f64::from(amount),
            });
            current += calories;
        }
    }

    tracing::debug!(
        %meal,
        target_calories,
        total = current,
        draws,
        accepted = items.len(),
        "suggested meal"
    );

    SuggestedMeal {
        meal,
        target_calories,
        items,
        total_calories: current,
    }
}
