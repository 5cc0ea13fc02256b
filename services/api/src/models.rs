//! API models for request and response payloads

use serde::{Deserialize, Serialize};

/// A user together with their nested family members.
///
/// `user_id` is server-assigned on creation and therefore optional in
/// request payloads. Dates of birth are exchanged as `YYYY-MM-DD` strings
/// end to end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub user_id: i32,
    pub name: String,
    pub dob: String,
    #[serde(rename = "national_id")]
    pub nationality_id: i32,
    #[serde(default)]
    pub families: Vec<Family>,
}

/// A family member belonging to exactly one user.
///
/// A `family_id` of 0 means "new record, assign an identifier on write".
/// Family identifiers are unique across all users, not per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Family {
    #[serde(default)]
    pub family_id: i32,
    #[serde(default)]
    pub user_id: i32,
    pub name: String,
    pub dob: String,
}

/// Read-only nationality reference data, joined in for display.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Nationality {
    pub nationality_id: i32,
    pub nationality_name: String,
    pub nationality_code: String,
}

/// Read model combining a user, their resolved nationality, and their
/// family members ordered by ascending family id. Assembled by queries,
/// never persisted as its own row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDetailResponse {
    pub user_id: i32,
    pub name: String,
    pub dob: String,
    #[serde(rename = "national_id")]
    pub nationality_id: i32,
    pub nationality: Nationality,
    pub families: Vec<Family>,
}
