// src/handlers/mod.rs

pub mod attempt;
pub mod auth;
pub mod preferences;
pub mod quiz;
pub mod results;
