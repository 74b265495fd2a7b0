//! Classroom domain module.
//!
//! Classes (turmas) owned by a teacher and the activities (atividades)
//! attached to them. One class has many activities; an activity belongs to
//! exactly one class, and a class cannot be deleted while it has any.

mod activity;
mod class_entity;
mod deletion;
mod numbering;

pub use activity::ActivityEntity;
pub use class_entity::ClassEntity;
pub use deletion::{ClassDeletion, CLASS_DELETE_FAILED, CLASS_HAS_ACTIVITIES, NO_ACTIVE_SESSION};
pub use numbering::{number_sequentially, Numbered};
