//! Outcome of a class deletion request.

/// Reason given when a class still has activities attached.
pub const CLASS_HAS_ACTIVITIES: &str = "You cannot delete a class that has registered activities";

/// Reason given when the deletion could not be carried out remotely.
pub const CLASS_DELETE_FAILED: &str = "Could not delete the class";

/// Reason given when no teacher is signed in.
pub const NO_ACTIVE_SESSION: &str = "No active session";

/// Result of `delete_class`: success, or failure with a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDeletion {
    pub success: bool,
    pub reason: Option<String>,
}

impl ClassDeletion {
    pub fn deleted() -> Self {
        Self {
            success: true,
            reason: None,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            reason: Some(reason.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}
