//! User service orchestrating validation and persistence
//!
//! The only caller of the persistence capability. Create and update run the
//! validation rules over the user and every family member before any storage
//! call; the read and delete operations pass straight through.

use std::sync::Arc;

use tracing::error;

use crate::error::{ApiError, ApiResult};
use crate::models::{User, UserDetailResponse};
use crate::repositories::UserStore;
use crate::validation;

/// Application service for user and family operations
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
}

impl UserService {
    /// Create a new user service over a persistence capability
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// List all users with nationality and families
    pub async fn list(&self) -> ApiResult<Vec<UserDetailResponse>> {
        self.store.list().await.map_err(|e| {
            error!("User get all failed: {e:#}");
            ApiError::Storage(e)
        })
    }

    /// Validate then create a user with nested families, returning the
    /// generated user id
    pub async fn create(&self, user: &User) -> ApiResult<i32> {
        validation::validate_user(user).map_err(ApiError::Validation)?;

        for family in &user.families {
            validation::validate_family_create(family).map_err(ApiError::Validation)?;
        }

        self.store.create(user).await.map_err(|e| {
            error!("User create failed: {e:#}");
            ApiError::Storage(e)
        })
    }

    /// Fetch one user's detail
    pub async fn detail(&self, user_id: i32) -> ApiResult<UserDetailResponse> {
        self.store
            .get_detail(user_id)
            .await
            .map_err(|e| {
                error!("User detail failed: {e:#}");
                ApiError::Storage(e)
            })?
            .ok_or_else(|| ApiError::NotFound(format!("user {user_id} not found")))
    }

    /// Validate then update a user's scalar fields and upsert the supplied
    /// families. Families omitted from the payload are left untouched.
    pub async fn update(&self, user: &User) -> ApiResult<()> {
        validation::validate_user(user).map_err(ApiError::Validation)?;

        for family in &user.families {
            validation::validate_family_update(family).map_err(ApiError::Validation)?;
        }

        let found = self.store.update(user).await.map_err(|e| {
            error!("User update failed: {e:#}");
            ApiError::Storage(e)
        })?;

        if !found {
            return Err(ApiError::NotFound(format!(
                "user {} not found",
                user.user_id
            )));
        }

        Ok(())
    }

    /// Delete a user and all their families
    pub async fn delete(&self, user_id: i32) -> ApiResult<()> {
        self.store.delete(user_id).await.map_err(|e| {
            error!("User delete failed: {e:#}");
            ApiError::Storage(e)
        })
    }

    /// Delete one family member by (user id, family id)
    pub async fn delete_family(&self, user_id: i32, family_id: i32) -> ApiResult<()> {
        let found = self
            .store
            .delete_family(user_id, family_id)
            .await
            .map_err(|e| {
                error!("Family delete failed: {e:#}");
                ApiError::Storage(e)
            })?;

        if !found {
            return Err(ApiError::NotFound(format!(
                "family {family_id} not found for user {user_id}"
            )));
        }

        Ok(())
    }
}
