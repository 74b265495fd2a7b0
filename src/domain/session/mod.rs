//! Session domain module.
//!
//! The signed-in teacher identity and the validation rules applied to the
//! login and registration forms.

mod forms;
mod identity;

pub use forms::{required_text, LoginForm, RegistrationForm, MIN_PASSWORD_LENGTH};
pub use identity::Session;
