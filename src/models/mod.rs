// src/models/mod.rs

pub mod quiz;
pub mod result;
pub mod user;

/// Rejects strings that are empty once surrounding whitespace is removed.
pub(crate) fn not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("required"));
    }
    Ok(())
}
