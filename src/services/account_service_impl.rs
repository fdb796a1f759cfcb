use std::sync::Arc;

use rand::Rng;
use rand::distr::Alphanumeric;
use sea_orm::{DbErr, SqlErr};
use tracing::{info, warn};

use crate::db::Store;
use crate::entities::users;
use crate::services::account_service::{
    AccountError, AccountService, NewUser, ProfileUpdate, UserProfile,
};
use crate::services::mailer::Mailer;
use crate::services::tokens::TokenIssuer;

const MAX_USERNAME_LEN: usize = 150;
const MAX_EMAIL_LEN: usize = 254;
const ROLES: [&str; 3] = ["user", "moderator", "admin"];

pub struct SeaOrmAccountServiceImpl {
    store: Store,
    mailer: Arc<dyn Mailer>,
    tokens: TokenIssuer,
    code_length: usize,
}

impl SeaOrmAccountServiceImpl {
    #[must_use]
    pub fn new(store: Store, mailer: Arc<dyn Mailer>, tokens: TokenIssuer, code_length: usize) -> Self {
        Self {
            store,
            mailer,
            tokens,
            code_length,
        }
    }

    fn generate_code(&self) -> String {
        rand::rng()
            .sample_iter(Alphanumeric)
            .take(self.code_length)
            .map(char::from)
            .collect()
    }

    async fn mail_code(&self, email: &str, code: &str) -> Result<(), AccountError> {
        self.mailer
            .send(
                email,
                "Your confirmation code",
                &format!("Your confirmation code: {code}"),
            )
            .await
            .map_err(|err| AccountError::Mail(err.to_string()))
    }

    fn profile(user: &users::Model) -> UserProfile {
        UserProfile {
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            bio: user.bio.clone(),
            role: user.role.clone(),
        }
    }

    fn to_repo_patch(patch: ProfileUpdate, role: Option<String>) -> crate::db::repositories::user::UserPatch {
        crate::db::repositories::user::UserPatch {
            email: patch.email,
            first_name: patch.first_name.map(Some),
            last_name: patch.last_name.map(Some),
            bio: patch.bio.map(Some),
            role,
        }
    }

    /// Resolves the role an actor may assign. Non-admins always get `user`.
    fn resolve_role(requested: Option<String>, actor_is_admin: bool) -> Result<String, AccountError> {
        let role = requested.unwrap_or_else(|| "user".to_string());
        if !ROLES.contains(&role.as_str()) {
            return Err(AccountError::Validation(format!("Unknown role '{role}'")));
        }
        if actor_is_admin {
            Ok(role)
        } else {
            Ok("user".to_string())
        }
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Translates a repository error, surfacing unique-index hits as conflicts.
fn map_write_err(err: anyhow::Error) -> AccountError {
    if err
        .downcast_ref::<DbErr>()
        .is_some_and(is_unique_violation)
    {
        AccountError::Conflict("Username or email already in use".to_string())
    } else {
        AccountError::Database(err.to_string())
    }
}

fn validate_username(username: &str) -> Result<(), AccountError> {
    if username.is_empty() {
        return Err(AccountError::Validation("Username must not be empty".to_string()));
    }
    if username.len() > MAX_USERNAME_LEN {
        return Err(AccountError::Validation(format!(
            "Username must be at most {MAX_USERNAME_LEN} characters"
        )));
    }
    if username.eq_ignore_ascii_case("me") {
        return Err(AccountError::Validation(
            "'me' is reserved and cannot be used as a username".to_string(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(AccountError::Validation(
            "Username may only contain letters, digits, and @.+-_".to_string(),
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), AccountError> {
    if email.is_empty() {
        return Err(AccountError::Validation("Email must not be empty".to_string()));
    }
    if email.len() > MAX_EMAIL_LEN {
        return Err(AccountError::Validation(format!(
            "Email must be at most {MAX_EMAIL_LEN} characters"
        )));
    }
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid {
        return Err(AccountError::Validation(format!("'{email}' is not a valid email address")));
    }
    Ok(())
}

#[async_trait::async_trait]
impl AccountService for SeaOrmAccountServiceImpl {
    async fn signup(&self, username: &str, email: &str) -> Result<(), AccountError> {
        validate_username(username)?;
        validate_email(email)?;

        let repo = self.store.users();
        let code = self.generate_code();

        if let Some(existing) = repo
            .get_by_pair(username, email)
            .await
            .map_err(|e| AccountError::Database(e.to_string()))?
        {
            // Re-signup for the same pairing rotates the code and resends it.
            repo.set_confirmation_code(existing.id, &code)
                .await
                .map_err(|e| AccountError::Database(e.to_string()))?;
            self.mail_code(email, &code).await?;
            info!(username, "Confirmation code re-issued");
            return Ok(());
        }

        if repo
            .pair_conflicts(username, email)
            .await
            .map_err(|e| AccountError::Database(e.to_string()))?
        {
            return Err(AccountError::Conflict(
                "Username or email already registered to another account".to_string(),
            ));
        }

        match repo.insert_pending(username, email, &code).await {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => {
                // Lost a race against a concurrent signup with the same
                // username or email.
                return Err(AccountError::Conflict(
                    "Username or email already registered to another account".to_string(),
                ));
            }
            Err(err) => return Err(err.into()),
        }

        self.mail_code(email, &code).await?;
        info!(username, "Signup recorded, confirmation code sent");
        Ok(())
    }

    async fn issue_token(
        &self,
        username: &str,
        confirmation_code: &str,
    ) -> Result<String, AccountError> {
        let repo = self.store.users();
        let user = repo
            .get_by_username(username)
            .await
            .map_err(|e| AccountError::Database(e.to_string()))?
            .ok_or_else(|| AccountError::NotFound(format!("User '{username}' not found")))?;

        if user.confirmation_code != confirmation_code {
            warn!(username, "Token request with wrong confirmation code");
            return Err(AccountError::Validation(
                "Confirmation code does not match".to_string(),
            ));
        }

        repo.mark_confirmed(user.id)
            .await
            .map_err(|e| AccountError::Database(e.to_string()))?;

        self.tokens
            .issue(&user)
            .map_err(|e| AccountError::Internal(format!("Token issuance failed: {e}")))
    }

    async fn get_profile(&self, user_id: i32) -> Result<UserProfile, AccountError> {
        let user = self
            .store
            .users()
            .get_by_id(user_id)
            .await
            .map_err(|e| AccountError::Database(e.to_string()))?
            .ok_or_else(|| AccountError::NotFound(format!("User {user_id} not found")))?;

        Ok(Self::profile(&user))
    }

    async fn update_own_profile(
        &self,
        user_id: i32,
        patch: ProfileUpdate,
    ) -> Result<UserProfile, AccountError> {
        if let Some(email) = &patch.email {
            validate_email(email)?;
        }

        // Self-service never changes the role, whatever the patch says.
        let repo_patch = Self::to_repo_patch(patch, None);
        let updated = self
            .store
            .users()
            .apply_patch(user_id, repo_patch)
            .await
            .map_err(map_write_err)?;

        Ok(Self::profile(&updated))
    }

    async fn list_users(&self) -> Result<Vec<UserProfile>, AccountError> {
        let users = self
            .store
            .users()
            .list()
            .await
            .map_err(|e| AccountError::Database(e.to_string()))?;

        Ok(users.iter().map(Self::profile).collect())
    }

    async fn create_user(
        &self,
        input: NewUser,
        actor_is_admin: bool,
    ) -> Result<UserProfile, AccountError> {
        validate_username(&input.username)?;
        validate_email(&input.email)?;
        let role = Self::resolve_role(input.role, actor_is_admin)?;

        let code = self.generate_code();
        let created = match self
            .store
            .users()
            .insert_with_role(&input.username, &input.email, &role, &code)
            .await
        {
            Ok(user) => user,
            Err(err) if is_unique_violation(&err) => {
                return Err(AccountError::Conflict(
                    "Username or email already in use".to_string(),
                ));
            }
            Err(err) => return Err(err.into()),
        };

        info!(username = created.username, role, "User created by admin");
        Ok(Self::profile(&created))
    }

    async fn get_user(&self, username: &str) -> Result<UserProfile, AccountError> {
        let user = self
            .store
            .users()
            .get_by_username(username)
            .await
            .map_err(|e| AccountError::Database(e.to_string()))?
            .ok_or_else(|| AccountError::NotFound(format!("User '{username}' not found")))?;

        Ok(Self::profile(&user))
    }

    async fn update_user(
        &self,
        username: &str,
        patch: ProfileUpdate,
        actor_is_admin: bool,
    ) -> Result<UserProfile, AccountError> {
        if let Some(email) = &patch.email {
            validate_email(email)?;
        }

        let repo = self.store.users();
        let user = repo
            .get_by_username(username)
            .await
            .map_err(|e| AccountError::Database(e.to_string()))?
            .ok_or_else(|| AccountError::NotFound(format!("User '{username}' not found")))?;

        let role = match patch.role.clone() {
            Some(requested) => Some(Self::resolve_role(Some(requested), actor_is_admin)?),
            None => None,
        };
        let repo_patch = Self::to_repo_patch(patch, role);
        let updated = repo.apply_patch(user.id, repo_patch).await.map_err(map_write_err)?;

        Ok(Self::profile(&updated))
    }

    async fn delete_user(&self, username: &str) -> Result<(), AccountError> {
        let deleted = self
            .store
            .users()
            .delete_by_username(username)
            .await
            .map_err(|e| AccountError::Database(e.to_string()))?;

        if deleted {
            info!(username, "User deleted");
            Ok(())
        } else {
            Err(AccountError::NotFound(format!("User '{username}' not found")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_username_is_rejected_in_any_case() {
        assert!(validate_username("me").is_err());
        assert!(validate_username("ME").is_err());
        assert!(validate_username("Me").is_err());
        assert!(validate_username("mee").is_ok());
    }

    #[test]
    fn username_charset_and_length_are_enforced() {
        assert!(validate_username("alice.b+c@d-e_f").is_ok());
        assert!(validate_username("alice bob").is_err());
        assert!(validate_username("").is_err());
        assert!(validate_username(&"a".repeat(151)).is_err());
        assert!(validate_username(&"a".repeat(150)).is_ok());
    }

    #[test]
    fn email_shape_is_enforced() {
        assert!(validate_email("alice@example.com").is_ok());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("alice@nodot").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn role_guard_defaults_non_admin_assignments_to_user() {
        assert_eq!(
            SeaOrmAccountServiceImpl::resolve_role(Some("admin".to_string()), true).unwrap(),
            "admin"
        );
        assert_eq!(
            SeaOrmAccountServiceImpl::resolve_role(Some("admin".to_string()), false).unwrap(),
            "user"
        );
        assert_eq!(SeaOrmAccountServiceImpl::resolve_role(None, true).unwrap(), "user");
        assert!(SeaOrmAccountServiceImpl::resolve_role(Some("superhero".to_string()), true).is_err());
    }
}
