use anyhow::{Result, bail};
use serde::Serialize;

use crate::models::MacroTotals;

/// Nutrient content. Values in the food table are per 100 g; calories in kcal,
/// sodium and potassium in mg, everything else in g.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NutrientProfile {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub fiber: f64,
    pub sugar: f64,
    pub sodium: f64,
    pub potassium: f64,
}

impl NutrientProfile {
    /// Scale a per-100 g profile to `amount_g` grams.
    #[must_use]
    pub fn scaled(&self, amount_g: f64) -> Self {
        let factor = amount_g / 100.0;
        Self {
            calories: self.calories * factor,
            protein: self.protein * factor,
            carbs: self.carbs * factor,
            fat: self.fat * factor,
            fiber: self.fiber * factor,
            sugar: self.sugar * factor,
            sodium: self.sodium * factor,
            potassium: self.potassium * factor,
        }
    }

    #[must_use]
    pub fn macros(&self) -> MacroTotals {
        MacroTotals {
            calories: self.calories,
            protein: self.protein,
            carbs: self.carbs,
            fat: self.fat,
        }
    }

    /// `(name, value, unit)` rows in display order.
    #[must_use]
    pub fn rows(&self) -> [(&'static str, f64, &'static str); 8] {
        [
            ("calories", self.calories, "kcal"),
            ("protein", self.protein, "g"),
            ("carbs", self.carbs, "g"),
            ("fat", self.fat, "g"),
            ("fiber", self.fiber, "g"),
            ("sugar", self.sugar, "g"),
            ("sodium", self.sodium, "mg"),
            ("potassium", self.potassium, "mg"),
        ]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Food {
    pub name: &'static str,
    pub per_100g: NutrientProfile,
    pub vitamins: &'static [&'static str],
}

const fn food(
    name: &'static str,
    n: [f64; 8],
    vitamins: &'static [&'static str],
) -> Food {
    Food {
        name,
        per_100g: NutrientProfile {
            calories: n[0],
            protein: n[1],
            carbs: n[2],
            fat: n[3],
            fiber: n[4],
            sugar: n[5],
            sodium: n[6],
            potassium: n[7],
        },
        vitamins,
    }
}

// kcal, protein, carbs, fat, fiber, sugar, sodium, potassium
pub static FOOD_DATABASE: &[Food] = &[
    food(
        "Chicken Breast",
        [165.0, 31.0, 0.0, 3.6, 0.0, 0.0, 74.0, 256.0],
        &["B6", "B3"],
    ),
    food(
        "Brown Rice",
        [216.0, 5.0, 45.0, 1.6, 3.5, 0.7, 10.0, 84.0],
        &["B1", "B6"],
    ),
    food(
        "Broccoli",
        [55.0, 3.7, 11.2, 0.6, 5.1, 2.6, 33.0, 468.0],
        &["C", "K"],
    ),
    food(
        "Salmon",
        [206.0, 22.0, 0.0, 13.0, 0.0, 0.0, 59.0, 366.0],
        &["D", "B12"],
    ),
    food(
        "Sweet Potato",
        [180.0, 2.0, 41.4, 0.1, 6.6, 13.0, 36.0, 475.0],
        &["A", "C"],
    ),
    food(
        "Greek Yogurt",
        [100.0, 18.0, 6.0, 0.7, 0.0, 6.0, 36.0, 141.0],
        &["B12", "B2"],
    ),
    food(
        "Spinach",
        [23.0, 2.9, 3.6, 0.4, 2.2, 0.4, 79.0, 558.0],
        &["K", "A"],
    ),
];

#[must_use]
pub fn find_food(name: &str) -> Option<&'static Food> {
    let name = name.trim();
    FOOD_DATABASE
        .iter()
        .find(|f| f.name.eq_ignore_ascii_case(name))
}

pub fn get_food(name: &str) -> Result<&'static Food> {
    match find_food(name) {
        Some(f) => Ok(f),
        None => bail!(
            "Unknown food '{name}'. Available: {}",
            food_names().join(", ")
        ),
    }
}

#[must_use]
pub fn food_names() -> Vec<&'static str> {
    FOOD_DATABASE.iter().map(|f| f.name).collect()
}

#[must_use]
pub fn search_foods(query: &str) -> Vec<&'static Food> {
    let q = query.trim().to_lowercase();
    FOOD_DATABASE
        .iter()
        .filter(|f| f.name.to_lowercase().contains(&q))
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct MacroShare {
    pub grams: f64,
    /// Percent of the combined protein + carbs + fat mass.
    pub percent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MacroDistribution {
    pub protein: MacroShare,
    pub carbs: MacroShare,
    pub fat: MacroShare,
}

#[derive(Debug, Clone, Serialize)]
pub struct NutrientAnalysis {
    pub food: &'static str,
    pub amount_g: f64,
    pub nutrients: NutrientProfile,
    pub macro_distribution: MacroDistribution,
    pub vitamins: &'static [&'static str],
}

pub fn analyze_food(name: &str, amount_g: f64) -> Result<NutrientAnalysis> {
    crate::models::validate_amount_g(amount_g)?;
    let food = get_food(name)?;
    let nutrients = food.per_100g.scaled(amount_g);

    let macro_mass = nutrients.protein + nutrients.carbs + nutrients.fat;
    let share = |grams: f64| MacroShare {
        grams,
        percent: if macro_mass > 0.0 {
            grams / macro_mass * 100.0
        } else {
            0.0
        },
    };

    Ok(NutrientAnalysis {
        food: food.name,
        amount_g,
        macro_distribution: MacroDistribution {
            protein: share(nutrients.protein),
            carbs: share(nutrients.carbs),
            fat: share(nutrients.fat),
        },
        nutrients,
        vitamins: food.vitamins,
    })
}
