//! Types for authentication and user management

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Email/password credentials for the password grant
#[derive(Debug, Clone, Serialize)]
pub struct PasswordCredentials {
    /// The user's email address
    pub email: String,

    /// The user's password
    pub password: String,
}

/// User data as returned by the identity service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The user ID
    pub id: String,

    /// The user's email address
    #[serde(default)]
    pub email: Option<String>,

    /// The user's phone number
    #[serde(default)]
    pub phone: Option<String>,

    /// The user's role
    #[serde(default)]
    pub role: Option<String>,

    /// The app metadata
    #[serde(default)]
    pub app_metadata: HashMap<String, serde_json::Value>,

    /// The user metadata
    #[serde(default)]
    pub user_metadata: HashMap<String, serde_json::Value>,

    /// The creation time
    #[serde(default)]
    pub created_at: Option<String>,

    /// The update time
    #[serde(default)]
    pub updated_at: Option<String>,

    /// The last sign-in time
    #[serde(default)]
    pub last_sign_in_at: Option<String>,
}

impl User {
    /// Create a user with only an id and email, as restored sessions often carry
    pub fn new(id: impl Into<String>, email: Option<&str>) -> Self {
        Self {
            id: id.into(),
            email: email.map(str::to_string),
            phone: None,
            role: None,
            app_metadata: HashMap::new(),
            user_metadata: HashMap::new(),
            created_at: None,
            updated_at: None,
            last_sign_in_at: None,
        }
    }
}

/// Error body returned by the identity service
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthErrorBody {
    /// OAuth style error code
    #[serde(default)]
    pub error: Option<String>,

    /// OAuth style description
    #[serde(default)]
    pub error_description: Option<String>,

    /// GoTrue style message
    #[serde(default, alias = "message")]
    pub msg: Option<String>,
}

impl AuthErrorBody {
    /// The most specific message the body carries
    pub fn detail(&self) -> Option<&str> {
        self.error_description
            .as_deref()
            .or(self.msg.as_deref())
            .or(self.error.as_deref())
    }
}
