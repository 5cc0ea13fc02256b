//! Application state shared across handlers

use crate::services::UserService;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub users: UserService,
}
