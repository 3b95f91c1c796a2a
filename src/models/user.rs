use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A registered account
///
/// Never serialized directly: responses go through [`UserSummary`] so the
/// password hash stays server-side.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Public view of a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
        }
    }
}

/// Fields needed to insert a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Free-form profile attached to every user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct UserProfile {
    pub user_id: i64,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// Empty profile created at signup
    pub fn empty(user_id: i64) -> Self {
        Self {
            user_id,
            display_name: None,
            bio: None,
            updated_at: Utc::now(),
        }
    }

    /// Applies a partial update; empty strings clear a field
    pub fn apply(&mut self, update: ProfileUpdate) {
        if let Some(display_name) = update.display_name {
            self.display_name = non_empty(display_name);
        }
        if let Some(bio) = update.bio {
            self.bio = non_empty(bio);
        }
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub bio: Option<String>,
}

/// Login session identified by an opaque bearer token
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Session {
    pub token: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Creates a session with a fresh random token
    pub fn new(user_id: i64) -> Self {
        Self {
            token: uuid::Uuid::new_v4().simple().to_string(),
            user_id,
            created_at: Utc::now(),
        }
    }
}

pub(crate) fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
