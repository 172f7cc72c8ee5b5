use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::UserId;

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 32;
const EMAIL_MAX: usize = 254;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UserError {
    #[error("username must be between 3 and 32 characters")]
    InvalidUsernameLength,

    #[error("username may only contain letters, digits, '_', '-' and '.'")]
    InvalidUsernameChars,

    #[error("email address is not valid")]
    InvalidEmail,

    #[error("unknown role: {0}")]
    UnknownRole(String),
}

//
// ─── ROLE ──────────────────────────────────────────────────────────────────────
//

/// Access level of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    User,
    Instructor,
    Admin,
}

impl Role {
    /// Instructors and admins may create and edit learning content.
    #[must_use]
    pub fn can_author(self) -> bool {
        matches!(self, Role::Instructor | Role::Admin)
    }

    #[must_use]
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Instructor => "INSTRUCTOR",
            Role::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USER" => Ok(Role::User),
            "INSTRUCTOR" => Ok(Role::Instructor),
            "ADMIN" => Ok(Role::Admin),
            _ => Err(UserError::UnknownRole(s.to_string())),
        }
    }
}

//
// ─── PROFILE ───────────────────────────────────────────────────────────────────
//

/// Optional, free-form profile fields shown on dashboards and the leaderboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

impl Profile {
    /// Blank strings are stored as absent.
    #[must_use]
    pub fn normalized(self) -> Self {
        fn clean(v: Option<String>) -> Option<String> {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        }
        Self {
            first_name: clean(self.first_name),
            last_name: clean(self.last_name),
            bio: clean(self.bio),
            avatar_url: clean(self.avatar_url),
        }
    }

    /// "First Last" when either part is present.
    #[must_use]
    pub fn full_name(&self) -> Option<String> {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => Some(format!("{first} {last}")),
            (Some(only), None) | (None, Some(only)) => Some(only.to_string()),
            (None, None) => None,
        }
    }
}

//
// ─── USER ──────────────────────────────────────────────────────────────────────
//

/// A learner, instructor, or administrator account.
///
/// Credentials are not part of the domain type; storage keeps the password
/// hash alongside the row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: UserId,
    username: String,
    email: String,
    role: Role,
    profile: Profile,
    created_at: DateTime<Utc>,
}

impl User {
    /// Creates a validated user.
    ///
    /// # Errors
    ///
    /// Returns `UserError` if the username or email is malformed.
    pub fn new(
        id: UserId,
        username: impl Into<String>,
        email: impl Into<String>,
        role: Role,
        profile: Profile,
        created_at: DateTime<Utc>,
    ) -> Result<Self, UserError> {
        let username = validate_username(username.into())?;
        let email = validate_email(email.into())?;
        Ok(Self {
            id,
            username,
            email,
            role,
            profile: profile.normalized(),
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Full name when a profile name is set, otherwise the username.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.profile
            .full_name()
            .unwrap_or_else(|| self.username.clone())
    }

    /// Replace the profile fields, keeping identity and role.
    pub fn set_profile(&mut self, profile: Profile) {
        self.profile = profile.normalized();
    }

    pub fn set_role(&mut self, role: Role) {
        self.role = role;
    }
}

fn validate_username(raw: String) -> Result<String, UserError> {
    let username = raw.trim().to_string();
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(UserError::InvalidUsernameLength);
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(UserError::InvalidUsernameChars);
    }
    Ok(username)
}

fn validate_email(raw: String) -> Result<String, UserError> {
    let email = raw.trim().to_ascii_lowercase();
    if email.len() > EMAIL_MAX || email.chars().any(char::is_whitespace) {
        return Err(UserError::InvalidEmail);
    }
    let Some((local, domain)) = email.split_once('@') else {
        return Err(UserError::InvalidEmail);
    };
    if local.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        return Err(UserError::InvalidEmail);
    }
    Ok(email)
}
