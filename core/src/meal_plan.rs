use std::collections::BTreeMap;

use anyhow::{Result, bail};
use serde::Serialize;

use crate::foods::get_food;
use crate::models::{
    CalorieGoalProgress, CalorieGoalStatus, MEAL_TYPES, MacroTotals, MealGroup, MealItem,
    MealItemView, MealPlanSummary, MealType, validate_amount_g,
};

/// A day's meals, each an ordered list of (food, grams).
#[derive(Debug, Clone, Default, Serialize)]
pub struct MealPlan {
    meals: BTreeMap<MealType, Vec<MealItem>>,
}

impl MealPlan {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a food to a meal. The name is normalized to the table's spelling.
    pub fn add(&mut self, meal: MealType, food: &str, amount_g: f64) -> Result<&MealItem> {
        validate_amount_g(amount_g)?;
        let food = get_food(food)?;
        let items = self.meals.entry(meal).or_default();
        items.push(MealItem {
            food: food.name.to_string(),
            amount_g,
        });
        Ok(&items[items.len() - 1])
    }

    pub fn remove(&mut self, meal: MealType, index: usize) -> Result<MealItem> {
        let items = self.meals.entry(meal).or_default();
        if index >= items.len() {
            bail!(
                "No item {index} in {meal} ({} item{})",
                items.len(),
                if items.len() == 1 { "" } else { "s" }
            );
        }
        Ok(items.remove(index))
    }

    #[must_use]
    pub fn items(&self, meal: MealType) -> &[MealItem] {
        self.meals.get(&meal).map(Vec::as_slice).unwrap_or_default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.meals.values().all(Vec::is_empty)
    }

    pub fn clear(&mut self) {
        self.meals.clear();
    }

    pub fn meal_nutrition(&self, meal: MealType) -> Result<MacroTotals> {
        let mut total = MacroTotals::default();
        for item in self.items(meal) {
            total.add(&item_nutrition(item)?);
        }
        Ok(total)
    }

    pub fn daily_totals(&self) -> Result<MacroTotals> {
        let mut total = MacroTotals::default();
        for &meal in MEAL_TYPES {
            total.add(&self.meal_nutrition(meal)?);
        }
        Ok(total)
    }

    /// Every meal in display order, including empty ones.
    pub fn summary(&self, calorie_goal: Option<u32>) -> Result<MealPlanSummary> {
        let mut meals = Vec::with_capacity(MEAL_TYPES.len());
        let mut totals = MacroTotals::default();

        for &meal in MEAL_TYPES {
            let mut subtotal = MacroTotals::default();
            let mut items = Vec::new();
            for (index, item) in self.items(meal).iter().enumerate() {
                let nutrition = item_nutrition(item)?;
                subtotal.add(&nutrition);
                items.push(MealItemView {
                    index,
                    food: item.food.clone(),
                    amount_g: item.amount_g,
                    nutrition,
                });
            }
            totals.add(&subtotal);
            meals.push(MealGroup {
                meal,
                items,
                subtotal,
            });
        }

        Ok(MealPlanSummary {
            meals,
            goal: calorie_goal.map(|goal| goal_progress(totals.calories, goal)),
            totals,
        })
    }
}

pub fn item_nutrition(item: &MealItem) -> Result<MacroTotals> {
    let food = get_food(&item.food)?;
    Ok(food.per_100g.scaled(item.amount_g).macros())
}

#[must_use]
pub fn goal_progress(consumed: f64, calorie_goal: u32) -> CalorieGoalProgress {
    let goal = f64::from(calorie_goal);
    let ratio = if goal > 0.0 { consumed / goal } else { 0.0 };
    let status = if ratio < 1.0 {
        CalorieGoalStatus::Under {
            remaining: goal - consumed,
        }
    } else if ratio > 1.0 {
        CalorieGoalStatus::Over {
            excess: consumed - goal,
        }
    } else {
        CalorieGoalStatus::Met
    };
    CalorieGoalProgress {
        calorie_goal,
        consumed,
        fraction: ratio.min(1.0),
        status,
    }
}
