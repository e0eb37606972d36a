//! User domain model

use std::fmt;

use serde::{Deserialize, Serialize};

/// Profile picture used when a user signs up without one
pub const DEFAULT_IMAGE_URL: &str = "/static/images/default-pic.png";

/// An account holder
///
/// `id` is `None` until the row is committed. `password` always holds a
/// digest produced by the credential hasher, never plaintext, and is left
/// out of serialized output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Option<i64>,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub image_url: Option<String>,
}

impl User {
    /// Build an uncommitted user from an already hashed password
    pub fn new(
        username: impl Into<String>,
        password_digest: impl Into<String>,
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            username: username.into(),
            password: password_digest.into(),
            email: email.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            image_url: None,
        }
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "<User #{}: {}, {}>", id, self.username, self.email),
            None => write!(f, "<User #?: {}, {}>", self.username, self.email),
        }
    }
}

/// Input for a new account
#[derive(Debug, Clone, Default)]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Absent or empty falls back to the configured default image
    pub image_url: Option<String>,
}

/// Editable profile fields; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub image_url: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.image_url.is_none()
    }
}

/// Result of `authenticate`
///
/// `NoMatch` covers both an unknown username and a wrong password so callers
/// cannot probe which usernames exist.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    Authenticated(User),
    NoMatch,
}

impl AuthOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Authenticated(user) => Some(user),
            Self::NoMatch => None,
        }
    }

    pub fn into_user(self) -> Option<User> {
        match self {
            Self::Authenticated(user) => Some(user),
            Self::NoMatch => None,
        }
    }
}
