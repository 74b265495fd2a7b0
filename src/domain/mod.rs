//! Domain layer containing business rules and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors)
//! - `session` - Signed-in teacher identity and form validation
//! - `classroom` - Classes, activities and their ordinal numbering
//! - `preferences` - Device-local UI preferences

pub mod classroom;
pub mod foundation;
pub mod preferences;
pub mod session;
