//! Pure authorization decisions.
//!
//! Every request resolves an [`Actor`] and asks [`decide`] whether an action
//! on a resource kind is allowed. The function has no state and no I/O;
//! object-level ownership is passed in as the owning user's ID.

use serde::{Deserialize, Serialize};

use crate::entities::users;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Moderator,
    Admin,
}

impl Role {
    /// Unknown stored values degrade to the lowest role.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "admin" => Self::Admin,
            "moderator" => Self::Moderator,
            _ => Self::User,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Moderator => "moderator",
            Self::Admin => "admin",
        }
    }
}

/// An authenticated requester, resolved from a bearer token.
#[derive(Debug, Clone)]
pub struct AuthenticatedActor {
    pub user_id: i32,
    pub username: String,
    pub role: Role,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl AuthenticatedActor {
    /// Superuser and staff flags alias to admin.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin || self.is_staff || self.is_superuser
    }

    /// Admin is always a moderator.
    #[must_use]
    pub fn is_moderator(&self) -> bool {
        self.role == Role::Moderator || self.is_admin()
    }
}

impl From<&users::Model> for AuthenticatedActor {
    fn from(user: &users::Model) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            role: Role::parse(&user.role),
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Actor {
    Anonymous,
    Authenticated(AuthenticatedActor),
}

impl Actor {
    #[must_use]
    pub const fn authenticated(&self) -> Option<&AuthenticatedActor> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(actor) => Some(actor),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Category,
    Genre,
    Title,
    Review,
    Comment,
    /// The admin-only `/users` surface.
    UserAccount,
    /// The requester's own `/users/me` profile.
    OwnProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No (valid) credentials on a path that requires them.
    Unauthenticated,
    /// Credentials are fine, the actor just may not do this.
    Forbidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny(DenyReason),
}

impl Access {
    #[must_use]
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Decision table for the whole API surface.
///
/// `owner` carries the owning user's ID for object-level checks on reviews
/// and comments; collection-level decisions pass `None`.
#[must_use]
pub fn decide(actor: &Actor, action: Action, kind: ResourceKind, owner: Option<i32>) -> Access {
    match kind {
        ResourceKind::Category | ResourceKind::Genre | ResourceKind::Title => match action {
            Action::Read => Access::Allow,
            Action::Create | Action::Update | Action::Delete => admin_only(actor),
        },
        ResourceKind::Review | ResourceKind::Comment => match action {
            Action::Read => Access::Allow,
            Action::Create => match actor.authenticated() {
                Some(_) => Access::Allow,
                None => Access::Deny(DenyReason::Unauthenticated),
            },
            Action::Update | Action::Delete => match actor.authenticated() {
                None => Access::Deny(DenyReason::Unauthenticated),
                Some(user) => {
                    if owner == Some(user.user_id) || user.is_moderator() {
                        Access::Allow
                    } else {
                        Access::Deny(DenyReason::Forbidden)
                    }
                }
            },
        },
        ResourceKind::UserAccount => admin_only(actor),
        ResourceKind::OwnProfile => match actor.authenticated() {
            Some(_) => Access::Allow,
            None => Access::Deny(DenyReason::Unauthenticated),
        },
    }
}

fn admin_only(actor: &Actor) -> Access {
    match actor.authenticated() {
        None => Access::Deny(DenyReason::Unauthenticated),
        Some(user) => {
            if user.is_admin() {
                Access::Allow
            } else {
                Access::Deny(DenyReason::Forbidden)
            }
        }
    }
}
