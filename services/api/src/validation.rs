//! Input validation for user and family payloads
//!
//! Validation short-circuits on the first failing field of a struct.
//! Messages are surfaced verbatim to the caller, so they embed the
//! offending value where that helps the caller find the bad record.

use regex::Regex;
use std::sync::OnceLock;

use crate::models::{Family, User};

fn dob_regex() -> &'static Regex {
    static DOB_REGEX: OnceLock<Regex> = OnceLock::new();
    DOB_REGEX.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("Failed to compile DOB regex"))
}

/// Validate a date of birth string.
///
/// Two independent checks, both required: the string must match the
/// `YYYY-MM-DD` pattern, and it must parse as a real calendar date
/// (`2024-02-30` passes the pattern but is not a date).
pub fn validate_dob(dob: &str) -> Result<(), String> {
    if !dob_regex().is_match(dob) {
        return Err("Date must be in YYYY-MM-DD format".to_string());
    }

    if chrono::NaiveDate::parse_from_str(dob, "%Y-%m-%d").is_err() {
        return Err("Invalid date format. Use YYYY-MM-DD".to_string());
    }

    Ok(())
}

/// Validate a user's scalar fields: name, date of birth, nationality.
pub fn validate_user(user: &User) -> Result<(), String> {
    if user.name.is_empty() {
        return Err("Name is required".to_string());
    }

    let name_len = user.name.chars().count();
    if !(5..=50).contains(&name_len) {
        return Err("Name must be between 5 and 50 characters".to_string());
    }

    if user.dob.is_empty() {
        return Err("Dob is required".to_string());
    }
    validate_dob(&user.dob)?;

    if user.nationality_id == 0 {
        return Err("Nationality ID is required".to_string());
    }

    Ok(())
}

/// Validate one family member in a create payload.
pub fn validate_family_create(family: &Family) -> Result<(), String> {
    let name_len = family.name.chars().count();
    if family.name.is_empty() || !(5..=50).contains(&name_len) {
        return Err(format!(
            "Family validation failed for {}: is required and must be between 5 to 50 characters",
            family.name
        ));
    }

    if family.dob.is_empty() {
        return Err(format!(
            "Family validation failed for {}: is required",
            family.dob
        ));
    }
    validate_dob(&family.dob)?;

    Ok(())
}

/// Validate one family member in an update payload.
///
/// Stricter than create: the family id must be zero (new record) or
/// positive, and the owning user id must be set.
pub fn validate_family_update(family: &Family) -> Result<(), String> {
    if family.family_id < 0 {
        return Err(
            "Family ID must be a positive integer or zero for new family record".to_string(),
        );
    }

    if family.user_id == 0 {
        return Err("User ID is required".to_string());
    }
    if family.user_id < 1 {
        return Err("User ID must be a positive integer".to_string());
    }

    validate_family_create(family)
}
