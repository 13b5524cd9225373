use serde::{Deserialize, Serialize};

use super::RecordKey;

/// An authenticated dashboard operator, as returned by `/auth/signin` and
/// `/auth/signup`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    #[serde(alias = "_id")]
    pub id: RecordKey,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, alias = "access_token", skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_metadata: Option<UserMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Older session files kept name and role under `user_metadata`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserMetadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl User {
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or_else(|| self.user_metadata.as_ref().and_then(|m| m.name.as_deref()))
            .unwrap_or("Administrator")
    }

    pub fn role(&self) -> &str {
        self.role
            .as_deref()
            .or_else(|| self.user_metadata.as_ref().and_then(|m| m.role.as_deref()))
            .unwrap_or("admin")
    }
}
