//! Post domain model

use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// A shared health story, recipe or tip
///
/// `user_id` is `None` for posts whose author was removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Option<i64>,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub timestamp: Option<NaiveDateTime>,
    pub user_id: Option<i64>,
}

impl Post {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            content: content.into(),
            image_url: None,
            timestamp: None,
            user_id: None,
        }
    }

    pub fn by(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    pub fn is_orphaned(&self) -> bool {
        self.user_id.is_none()
    }
}

/// Editable post fields; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub image_url: Option<String>,
}

impl PostUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.image_url.is_none()
    }
}

/// What happens to a user's posts when the user is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostRetention {
    /// Keep the posts and clear their author
    #[default]
    Orphan,
    /// Delete the posts along with the user
    Delete,
}

impl FromStr for PostRetention {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "orphan" => Ok(Self::Orphan),
            "delete" | "cascade" => Ok(Self::Delete),
            other => Err(Error::validation(format!("Unknown post retention policy: {}", other))),
        }
    }
}
