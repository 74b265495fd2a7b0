//! Form validation for login and registration.
//!
//! These checks run before any remote call. Their errors are meant to be
//! shown to the user as-is.

use crate::domain::foundation::ValidationError;

/// Minimum accepted password length at registration.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Login form input.
#[derive(Debug, Clone)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Checks that both fields are filled in.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("email", &self.email)?;
        if self.password.is_empty() {
            return Err(ValidationError::empty_field("password"));
        }
        Ok(())
    }
}

/// Registration form input.
#[derive(Debug, Clone)]
pub struct RegistrationForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

impl RegistrationForm {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        password_confirmation: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            password_confirmation: password_confirmation.into(),
        }
    }

    /// Checks required fields, password confirmation and minimum length,
    /// in that order.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)?;
        require("email", &self.email)?;
        if self.password.is_empty() {
            return Err(ValidationError::empty_field("password"));
        }
        if self.password_confirmation.is_empty() {
            return Err(ValidationError::empty_field("password_confirmation"));
        }
        if self.password != self.password_confirmation {
            return Err(ValidationError::mismatch("password", "password_confirmation"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ValidationError::too_short("password", MIN_PASSWORD_LENGTH));
        }
        Ok(())
    }
}

/// Validates a required free-text field and returns it trimmed.
///
/// Used for class names and activity descriptions.
pub fn required_text(field: &str, value: &str) -> Result<String, ValidationError> {
    require(field, value)?;
    Ok(value.trim().to_string())
}

fn require(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::empty_field(field));
    }
    Ok(())
}
