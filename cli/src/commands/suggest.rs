use anyhow::Result;
use rand::SeedableRng;
use rand::rngs::StdRng;

use caltrack_core::models::{DEFAULT_CALORIE_GOAL, parse_diet_type};
use caltrack_core::recommendations::{Recommendation, recommend_meals};
use caltrack_core::suggest::{SuggestedMeal, suggest_meal_plan};

use super::helpers::print_json;

pub(crate) fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_os_rng(),
    }
}

pub(crate) fn cmd_suggest(calories: Option<u32>, seed: Option<u64>, json: bool) -> Result<()> {
    let goal = calories.unwrap_or(DEFAULT_CALORIE_GOAL);
    let plan = suggest_meal_plan(goal, &mut seeded_rng(seed))?;

    if json {
        return print_json(&plan);
    }
    println!("Meal suggestions for {goal} kcal/day\n");
    print_suggestion(&plan);
    Ok(())
}

pub(crate) fn print_suggestion(plan: &[SuggestedMeal]) {
    let mut total = 0.0;
    for meal in plan {
        let label = meal.meal.label().to_uppercase();
        println!(
            "  {label} (target {:.0} kcal, suggested {:.0} kcal)",
            meal.target_calories, meal.total_calories
        );
        if meal.items.is_empty() {
            println!("    (nothing fits this target)");
        }
        for item in &meal.items {
            println!("    - {:.0}g {}", item.amount_g, item.food);
        }
        println!();
        total += meal.total_calories;
    }
    println!("  TOTAL: {total:.0} kcal");
}

pub(crate) fn cmd_recommend(
    diet: &str,
    calories: Option<u32>,
    seed: Option<u64>,
    json: bool,
) -> Result<()> {
    let diet = parse_diet_type(diet)?;
    let target = calories.unwrap_or(DEFAULT_CALORIE_GOAL);
    let rec = recommend_meals(diet, target, &mut seeded_rng(seed))?;

    if json {
        return print_json(&rec);
    }
    print_recommendation(&rec);
    Ok(())
}

fn print_recommendation(rec: &Recommendation) {
    println!(
        "Suggested meal plan for a {} diet with {} calories:\n",
        rec.diet, rec.calorie_target
    );
    for meal in &rec.meals {
        println!("  {} ({:.0} kcal)", meal.meal, meal.target_calories);
        for item in &meal.items {
            println!("    - {:.0}g of {}", item.amount_g, item.food);
        }
        println!();
    }
    println!("Note: {}", rec.note);
}
