//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the application and the outside world. Adapters implement these ports.
//!
//! - `TableStore` - Row storage of the hosted backend
//! - `AuthBackend` - Hosted email/password authentication and its change feed
//! - `KeyValueStore` - Device-local key-value persistence
//! - `AppLifecycle` - Foreground/background signal from the host platform

mod app_lifecycle;
mod auth_backend;
mod key_value_store;
mod table_store;

pub use app_lifecycle::{lifecycle_channel, AppLifecycle};
pub use auth_backend::{AuthBackend, AuthChange, DISPLAY_NAME_METADATA_KEY};
pub use key_value_store::{KeyValueStore, StorageError};
pub use table_store::{Filter, RemoteError, Row, SelectQuery, TableStore};
