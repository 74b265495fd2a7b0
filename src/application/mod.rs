//! Application layer - state managers consumed by the presentation layer.
//!
//! - [`SessionManager`] owns the signed-in teacher
//! - [`CollectionStateManager`] caches classes and activities of that teacher
//! - [`ThemeController`] holds the persisted theme preference
//! - [`AppContext`] wires them together and owns their listeners

mod collection_manager;
mod context;
mod listener;
mod session_manager;
mod theme;

pub mod services;

pub use collection_manager::{CollectionStateManager, SyncState};
pub use context::AppContext;
pub use listener::ListenerHandle;
pub use session_manager::SessionManager;
pub use theme::{ThemeController, THEME_KEY};
