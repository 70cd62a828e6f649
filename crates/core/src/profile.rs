//! Public profile of an authenticated user.

use serde::{Deserialize, Serialize};

use crate::id::UserId;

/// Display name and avatar shown next to a user's recipes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: UserId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<String>,
}

impl UserProfile {
    pub fn new(user_id: UserId, name: impl Into<String>) -> Self {
        Self {
            user_id,
            name: name.into(),
            profile_image_url: None,
        }
    }

    /// Name to greet the user with; falls back to "Guest" when unset.
    pub fn display_name(&self) -> &str {
        let trimmed = self.name.trim();
        if trimmed.is_empty() { "Guest" } else { trimmed }
    }
}
