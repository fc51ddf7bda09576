//! Resting and total daily energy expenditure.
//!
//! BMR uses the revised Harris-Benedict coefficients. `Gender::Other` takes the
//! mean of the male and female equations.

use anyhow::Result;
use serde::Serialize;

use crate::models::{ActivityLevel, Gender, UserProfile, validate_profile};

#[must_use]
pub fn calculate_bmr(age: u32, gender: Gender, weight_kg: f64, height_cm: f64) -> f64 {
    let age = f64::from(age);
    let male = 88.362 + (13.397 * weight_kg) + (4.799 * height_cm) - (5.677 * age);
    let female = 447.593 + (9.247 * weight_kg) + (3.098 * height_cm) - (4.330 * age);
    match gender {
        Gender::Male => male,
        Gender::Female => female,
        Gender::Other => (male + female) / 2.0,
    }
}

#[must_use]
pub fn calculate_tdee(bmr: f64, activity_level: ActivityLevel) -> f64 {
    bmr * activity_level.factor()
}

#[derive(Debug, Clone, Serialize)]
pub struct EnergyProfile {
    pub bmr: f64,
    pub tdee: f64,
    pub activity_level: ActivityLevel,
}

impl EnergyProfile {
    pub fn from_profile(profile: &UserProfile) -> Result<Self> {
        validate_profile(profile)?;
        let bmr = calculate_bmr(
            profile.age,
            profile.gender,
            profile.weight_kg,
            profile.height_cm,
        );
        Ok(Self {
            bmr,
            tdee: calculate_tdee(bmr, profile.activity_level),
            activity_level: profile.activity_level,
        })
    }
}
