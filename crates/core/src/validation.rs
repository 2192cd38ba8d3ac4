//! Input validation utilities.
//!
//! Form fields are checked here before they reach account or consultation records, so stored
//! records always satisfy these bounds.

use crate::constants::{MAX_AGE, MAX_NAME_LEN, MAX_PAGE_SIZE, MIN_AGE, MIN_NAME_LEN};
use crate::{HealthBotError, HealthBotResult};
use healthbot_types::{NonEmptyText, TextError};

/// Validates a person name: trimmed, between 2 and 50 characters.
///
/// # Errors
///
/// Returns [`HealthBotError::InvalidInput`] naming `field` if the value is blank or out of range.
pub fn validate_name(field: &str, value: &str) -> HealthBotResult<NonEmptyText> {
    NonEmptyText::with_length(value, MIN_NAME_LEN, MAX_NAME_LEN).map_err(|e| match e {
        TextError::Empty => HealthBotError::InvalidInput(format!("{} is required", field)),
        other => HealthBotError::InvalidInput(format!("{}: {}", field, other)),
    })
}

/// Validates an age in whole years (1 to 120 inclusive).
pub fn validate_age(age: u32) -> HealthBotResult<u32> {
    if (MIN_AGE..=MAX_AGE).contains(&age) {
        Ok(age)
    } else {
        Err(HealthBotError::InvalidInput(format!(
            "age must be between {} and {}, got {}",
            MIN_AGE, MAX_AGE, age
        )))
    }
}

/// Validates a 1-based page request.
pub fn validate_page(page: usize, per_page: usize) -> HealthBotResult<()> {
    if page == 0 {
        return Err(HealthBotError::InvalidInput("page starts at 1".into()));
    }
    if per_page == 0 || per_page > MAX_PAGE_SIZE {
        return Err(HealthBotError::InvalidInput(format!(
            "per_page must be between 1 and {}",
            MAX_PAGE_SIZE
        )));
    }
    Ok(())
}
