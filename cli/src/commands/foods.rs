use anyhow::Result;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use caltrack_core::foods::{FOOD_DATABASE, Food, analyze_food, search_foods};

use super::helpers::{parse_amount, print_json};

pub(crate) fn cmd_foods(search: Option<&str>, json: bool) -> Result<()> {
    let foods: Vec<&Food> = match search {
        Some(q) => search_foods(q),
        None => FOOD_DATABASE.iter().collect(),
    };

    if foods.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("No foods matching '{}'", search.unwrap_or_default());
        }
        process::exit(2);
    }

    if json {
        return print_json(&foods);
    }
    print_food_table(&foods);
    Ok(())
}

fn print_food_table(foods: &[&Food]) {
    #[derive(Tabled)]
    struct FoodRow {
        #[tabled(rename = "Name")]
        name: &'static str,
        #[tabled(rename = "Cal/100g")]
        calories: String,
        #[tabled(rename = "P/100g")]
        protein: String,
        #[tabled(rename = "C/100g")]
        carbs: String,
        #[tabled(rename = "F/100g")]
        fat: String,
        #[tabled(rename = "Fiber")]
        fiber: String,
        #[tabled(rename = "Vitamins")]
        vitamins: String,
    }

    let rows: Vec<FoodRow> = foods
        .iter()
        .map(|f| {
            let n = &f.per_100g;
            FoodRow {
                name: f.name,
                calories: format!("{:.0}", n.calories),
                protein: format!("{:.1}", n.protein),
                carbs: format!("{:.1}", n.carbs),
                fat: format!("{:.1}", n.fat),
                fiber: format!("{:.1}", n.fiber),
                vitamins: f.vitamins.join(", "),
            }
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..6)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn cmd_analyze(food: &str, amount: Option<&str>, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct NutrientRow {
        #[tabled(rename = "Nutrient")]
        name: String,
        #[tabled(rename = "Amount")]
        amount: String,
    }

    let amount_g = amount.map_or(Ok(100.0), parse_amount)?;
    let analysis = analyze_food(food, amount_g)?;

    if json {
        return print_json(&analysis);
    }

    println!("=== {} ({:.0}g) ===\n", analysis.food, analysis.amount_g);

    let rows: Vec<NutrientRow> = analysis
        .nutrients
        .rows()
        .iter()
        .map(|(name, value, unit)| {
            let mut label = name.to_string();
            if let Some(first) = label.get_mut(0..1) {
                first.make_ascii_uppercase();
            }
            NutrientRow {
                name: label,
                amount: format!("{value:.1} {unit}"),
            }
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    let d = &analysis.macro_distribution;
    println!(
        "\n  Macros: protein {:.0}% | carbs {:.0}% | fat {:.0}%",
        d.protein.percent, d.carbs.percent, d.fat.percent
    );
    println!("  Vitamins: {}", analysis.vitamins.join(", "));

    Ok(())
}
