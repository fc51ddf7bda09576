use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use caltrack_core::metabolism::{EnergyProfile, calculate_tdee};
use caltrack_core::models::{ACTIVITY_LEVELS, UserProfile, parse_activity_level, parse_gender};

use super::helpers::print_json;

pub(crate) fn cmd_profile(
    age: u32,
    gender: &str,
    weight_kg: f64,
    height_cm: f64,
    activity: &str,
    json: bool,
) -> Result<()> {
    #[derive(Tabled)]
    struct LevelRow {
        #[tabled(rename = "Activity level")]
        level: String,
        #[tabled(rename = "Factor")]
        factor: String,
        #[tabled(rename = "TDEE (kcal)")]
        tdee: String,
    }

    let profile = UserProfile {
        age,
        gender: parse_gender(gender)?,
        weight_kg,
        height_cm,
        activity_level: parse_activity_level(activity)?,
    };
    let energy = EnergyProfile::from_profile(&profile)?;

    if json {
        return print_json(&serde_json::json!({
            "profile": profile,
            "bmr": energy.bmr,
            "tdee": energy.tdee,
        }));
    }

    println!(
        "{} y, {}, {:.1} kg, {:.1} cm, {}",
        profile.age, profile.gender, profile.weight_kg, profile.height_cm, profile.activity_level
    );
    println!("  BMR:  {:.0} kcal/day", energy.bmr);
    println!("  TDEE: {:.0} kcal/day\n", energy.tdee);

    let bmr = energy.bmr;
    let rows: Vec<LevelRow> = ACTIVITY_LEVELS
        .iter()
        .map(|&level| LevelRow {
            level: if level == profile.activity_level {
                format!("{level} *")
            } else {
                level.to_string()
            },
            factor: format!("{:.3}", level.factor()),
            tdee: format!("{:.0}", calculate_tdee(bmr, level)),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    Ok(())
}
