//! Session identity of the signed-in teacher.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::UserId;

/// The authenticated teacher (professor).
///
/// Exists only while signed in. Created on login, registration or session
/// restore and dropped on logout. Only the session manager constructs and
/// replaces it; everything else sees clones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    user_id: UserId,
    display_name: String,
    email: String,
}

impl Session {
    pub fn new(user_id: UserId, display_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            email: email.into(),
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}
