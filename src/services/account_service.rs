//! Domain service for signup, confirmation-code exchange, and user accounts.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Mail delivery failed: {0}")]
    Mail(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AccountError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

/// User account DTO for responses. Never carries the confirmation code.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub role: String,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub role: Option<String>,
}

/// Domain service trait for the signup/confirmation flow and user CRUD.
#[async_trait::async_trait]
pub trait AccountService: Send + Sync {
    /// Registers or re-registers a (username, email) pair and mails a fresh
    /// confirmation code. Re-signup for an existing pair resends the code.
    ///
    /// # Errors
    ///
    /// [`AccountError::Validation`] for a malformed or reserved username or a
    /// malformed email; [`AccountError::Conflict`] when the username or email
    /// belongs to a different pairing.
    async fn signup(&self, username: &str, email: &str) -> Result<(), AccountError>;

    /// Exchanges a confirmation code for a bearer token.
    ///
    /// # Errors
    ///
    /// [`AccountError::NotFound`] for an unknown username;
    /// [`AccountError::Validation`] when the code does not match.
    async fn issue_token(
        &self,
        username: &str,
        confirmation_code: &str,
    ) -> Result<String, AccountError>;

    /// Profile of the requester.
    async fn get_profile(&self, user_id: i32) -> Result<UserProfile, AccountError>;

    /// Self-service profile update. Any `role` in the patch is discarded.
    async fn update_own_profile(
        &self,
        user_id: i32,
        patch: ProfileUpdate,
    ) -> Result<UserProfile, AccountError>;

    /// Admin surface: list all accounts.
    async fn list_users(&self) -> Result<Vec<UserProfile>, AccountError>;

    /// Admin surface: create an account. `actor_is_admin` re-checks the
    /// caller before a role other than `user` is accepted.
    async fn create_user(
        &self,
        input: NewUser,
        actor_is_admin: bool,
    ) -> Result<UserProfile, AccountError>;

    async fn get_user(&self, username: &str) -> Result<UserProfile, AccountError>;

    /// Admin surface: update an account. The role guard mirrors
    /// [`AccountService::create_user`].
    async fn update_user(
        &self,
        username: &str,
        patch: ProfileUpdate,
        actor_is_admin: bool,
    ) -> Result<UserProfile, AccountError>;

    /// Deleting a user cascades their reviews and comments.
    async fn delete_user(&self, username: &str) -> Result<(), AccountError>;
}
