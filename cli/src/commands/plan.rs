use anyhow::{Result, bail};

use caltrack_core::models::{CalorieGoalStatus, MealPlanSummary};
use caltrack_core::service::CalTrackService;

use super::helpers::{parse_amount, print_json, progress_bar};
use super::suggest::{print_suggestion, seeded_rng};

pub(crate) fn plan_add(
    svc: &mut CalTrackService,
    meal: &str,
    food: &str,
    amount: Option<&str>,
    json: bool,
) -> Result<()> {
    let amount_g = amount.map_or(Ok(100.0), parse_amount)?;
    let item = svc.add_meal_item(meal, food, amount_g)?;
    if json {
        return print_json(&item);
    }
    println!("Added {:.0}g {} to {}", item.amount_g, item.food, meal.to_lowercase());
    Ok(())
}

/// `number` is the 1-based position shown by `plan show`.
pub(crate) fn plan_remove(
    svc: &mut CalTrackService,
    meal: &str,
    number: usize,
    json: bool,
) -> Result<()> {
    let Some(index) = number.checked_sub(1) else {
        bail!("Item numbers start at 1");
    };
    let item = svc.remove_meal_item(meal, index)?;
    if json {
        return print_json(&item);
    }
    println!("Removed {:.0}g {} from {}", item.amount_g, item.food, meal.to_lowercase());
    Ok(())
}

pub(crate) fn plan_clear(svc: &mut CalTrackService, json: bool) {
    svc.clear_meal_plan();
    if json {
        println!("{}", serde_json::json!({ "cleared": true }));
    } else {
        println!("Meal plan cleared");
    }
}

pub(crate) fn plan_goal(svc: &mut CalTrackService, calories: u32, json: bool) -> Result<()> {
    svc.set_calorie_goal(calories)?;
    if json {
        println!("{}", serde_json::json!({ "calorie_goal": calories }));
    } else {
        println!("Daily calorie goal set to {calories} kcal");
    }
    Ok(())
}

pub(crate) fn plan_show(svc: &CalTrackService, goal: Option<u32>, json: bool) -> Result<()> {
    let summary = svc.meal_plan_summary(goal)?;
    if json {
        return print_json(&summary);
    }
    if svc.meal_plan().is_empty() {
        eprintln!("Meal plan is empty. Add food with `plan add <meal> <food> [amount]`");
        return Ok(());
    }
    print_plan(&summary);
    Ok(())
}

fn print_plan(summary: &MealPlanSummary) {
    for group in &summary.meals {
        let label = group.meal.label().to_uppercase();
        let sub = &group.subtotal;
        println!("  {label} ({:.0} kcal)", sub.calories);
        for item in &group.items {
            let n = &item.nutrition;
            println!(
                "    [{}] {} — {:.0}g — {:.0} kcal | P:{:.0}g C:{:.0}g F:{:.0}g",
                item.index + 1,
                item.food,
                item.amount_g,
                n.calories,
                n.protein,
                n.carbs,
                n.fat
            );
        }
        println!();
    }

    let t = &summary.totals;
    println!(
        "  TOTAL: {:.0} kcal | P:{:.0}g C:{:.0}g F:{:.0}g",
        t.calories, t.protein, t.carbs, t.fat
    );

    if let Some(goal) = &summary.goal {
        println!(
            "  GOAL:  {} kcal {}",
            goal.calorie_goal,
            progress_bar(goal.fraction, 20)
        );
        match goal.status {
            CalorieGoalStatus::Under { remaining } => {
                println!("  {remaining:.0} kcal remaining");
            }
            CalorieGoalStatus::Met => println!("  Goal reached"),
            CalorieGoalStatus::Over { excess } => println!("  {excess:.0} kcal over goal"),
        }
    }
}

pub(crate) fn plan_suggest(
    svc: &mut CalTrackService,
    calories: Option<u32>,
    seed: Option<u64>,
    apply: bool,
    json: bool,
) -> Result<()> {
    let suggestion = svc.suggest_meals(calories, &mut seeded_rng(seed))?;
    let added = if apply {
        Some(svc.apply_suggestion(&suggestion)?)
    } else {
        None
    };

    if json {
        return print_json(&serde_json::json!({
            "suggestion": suggestion,
            "applied_items": added,
        }));
    }
    print_suggestion(&suggestion);
    match added {
        Some(n) => println!("\nAdded {n} item(s) to the meal plan"),
        None => println!("\nRun with --apply to add these to the meal plan"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_add_and_remove() {
        let mut svc = CalTrackService::new();
        plan_add(&mut svc, "dinner", "salmon", Some("150g"), false).unwrap();
        plan_add(&mut svc, "dinner", "broccoli", None, true).unwrap();
        assert_eq!(svc.meal_plan_summary(None).unwrap().meals[2].items.len(), 2);

        assert!(plan_remove(&mut svc, "dinner", 0, false).is_err());
        plan_remove(&mut svc, "dinner", 1, false).unwrap();
        let summary = svc.meal_plan_summary(None).unwrap();
        assert_eq!(summary.meals[2].items[0].food, "Broccoli");
    }

    #[test]
    fn test_plan_add_rejects_unknown_food() {
        let mut svc = CalTrackService::new();
        assert!(plan_add(&mut svc, "lunch", "pizza", None, false).is_err());
        assert!(plan_add(&mut svc, "lunch", "salmon", Some("5kg"), false).is_err());
        assert!(svc.meal_plan().is_empty());
    }

    #[test]
    fn test_plan_goal_and_show() {
        let mut svc = CalTrackService::new();
        assert!(plan_goal(&mut svc, 900, false).is_err());
        plan_goal(&mut svc, 1800, false).unwrap();
        assert_eq!(svc.calorie_goal(), 1800);

        plan_add(&mut svc, "breakfast", "greek yogurt", Some("200"), false).unwrap();
        plan_show(&svc, None, false).unwrap();
        plan_show(&svc, Some(2500), true).unwrap();
    }

    #[test]
    fn test_plan_suggest_apply() {
        let mut svc = CalTrackService::new();
        plan_suggest(&mut svc, Some(2000), Some(1), false, false).unwrap();
        assert!(svc.meal_plan().is_empty());
        plan_suggest(&mut svc, Some(2000), Some(1), true, false).unwrap();
        assert!(!svc.meal_plan().is_empty());
    }
}
