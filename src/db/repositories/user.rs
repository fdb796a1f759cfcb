use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::entities::users;

/// Fields an update may touch. `None` leaves the stored value untouched.
#[derive(Debug, Default, Clone)]
pub struct UserPatch {
    pub email: Option<String>,
    pub first_name: Option<Option<String>>,
    pub last_name: Option<Option<String>>,
    pub bio: Option<Option<String>>,
    pub role: Option<String>,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<users::Model>> {
        users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<users::Model>> {
        users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")
    }

    /// Exact (username, email) pairing, if registered.
    pub async fn get_by_pair(&self, username: &str, email: &str) -> Result<Option<users::Model>> {
        users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user by username/email pair")
    }

    /// True when the username or the email is already taken by a record that
    /// is not this exact pairing.
    pub async fn pair_conflicts(&self, username: &str, email: &str) -> Result<bool> {
        let existing = users::Entity::find()
            .filter(
                users::Column::Username
                    .eq(username)
                    .or(users::Column::Email.eq(email)),
            )
            .one(&self.conn)
            .await
            .context("Failed to check username/email availability")?;

        Ok(existing.is_some_and(|u| u.username != username || u.email != email))
    }

    pub async fn list(&self) -> Result<Vec<users::Model>> {
        users::Entity::find()
            .order_by_asc(users::Column::Username)
            .all(&self.conn)
            .await
            .context("Failed to list users")
    }

    /// Inserts an unconfirmed user. The unique indexes on username and email
    /// settle concurrent signups; callers translate the violation.
    pub async fn insert_pending(
        &self,
        username: &str,
        email: &str,
        confirmation_code: &str,
    ) -> std::result::Result<users::Model, DbErr> {
        let now = chrono::Utc::now().to_rfc3339();
        let model = users::ActiveModel {
            username: Set(username.to_string()),
            email: Set(email.to_string()),
            role: Set("user".to_string()),
            confirmation_code: Set(confirmation_code.to_string()),
            confirmed: Set(false),
            is_staff: Set(false),
            is_superuser: Set(false),
            date_joined: Set(now),
            ..Default::default()
        };
        model.insert(&self.conn).await
    }

    /// Admin-created user; `is_staff` follows the admin role.
    pub async fn insert_with_role(
        &self,
        username: &str,
        email: &str,
        role: &str,
        confirmation_code: &str,
    ) -> std::result::Result<users::Model, DbErr> {
        let now = chrono::Utc::now().to_rfc3339();
        let model = users::ActiveModel {
            username: Set(username.to_string()),
            email: Set(email.to_string()),
            role: Set(role.to_string()),
            confirmation_code: Set(confirmation_code.to_string()),
            confirmed: Set(false),
            is_staff: Set(role == "admin"),
            is_superuser: Set(false),
            date_joined: Set(now),
            ..Default::default()
        };
        model.insert(&self.conn).await
    }

    /// Overwrite the stored confirmation code. Latest code wins.
    pub async fn set_confirmation_code(&self, id: i32, code: &str) -> Result<()> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user for code rotation")?
            .ok_or_else(|| anyhow::anyhow!("User {id} not found"))?;

        let mut active: users::ActiveModel = user.into();
        active.confirmation_code = Set(code.to_string());
        active.update(&self.conn).await?;

        Ok(())
    }

    pub async fn mark_confirmed(&self, id: i32) -> Result<()> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user for confirmation")?
            .ok_or_else(|| anyhow::anyhow!("User {id} not found"))?;

        if user.confirmed {
            return Ok(());
        }

        let mut active: users::ActiveModel = user.into();
        active.confirmed = Set(true);
        active.update(&self.conn).await?;

        Ok(())
    }

    pub async fn apply_patch(&self, id: i32, patch: UserPatch) -> Result<users::Model> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user for update")?
            .ok_or_else(|| anyhow::anyhow!("User {id} not found"))?;

        let mut active: users::ActiveModel = user.into();
        if let Some(email) = patch.email {
            active.email = Set(email);
        }
        if let Some(first_name) = patch.first_name {
            active.first_name = Set(first_name);
        }
        if let Some(last_name) = patch.last_name {
            active.last_name = Set(last_name);
        }
        if let Some(bio) = patch.bio {
            active.bio = Set(bio);
        }
        if let Some(role) = patch.role {
            active.is_staff = Set(role == "admin");
            active.role = Set(role);
        }

        let updated = active.update(&self.conn).await?;
        Ok(updated)
    }

    pub async fn delete_by_username(&self, username: &str) -> Result<bool> {
        let result = users::Entity::delete_many()
            .filter(users::Column::Username.eq(username))
            .exec(&self.conn)
            .await
            .context("Failed to delete user")?;

        Ok(result.rows_affected > 0)
    }
}
