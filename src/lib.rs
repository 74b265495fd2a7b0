//! Classroom Tracker - client core for teachers tracking classes and activities.
//!
//! Authentication and row storage are delegated to a hosted backend. This
//! crate keeps the signed-in session and a cache of the teacher's classes
//! and activities in sync with it.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
