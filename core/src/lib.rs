pub mod education;
pub mod foods;
pub mod meal_plan;
pub mod metabolism;
pub mod models;
pub mod progress;
pub mod recommendations;
pub mod service;
pub mod suggest;
pub mod tracker;
