//! Storage Adapters
//!
//! Implementations of the KeyValueStore port for device-local preferences.
//!
//! ## Available Adapters
//!
//! - **FileKeyValueStore** - Stores all entries in one YAML file on disk
//! - **InMemoryKeyValueStore** - Stores entries in memory (testing/development)
//!
//! ## Usage
//!
//! ```ignore
//! use classroom_tracker::adapters::storage::{FileKeyValueStore, InMemoryKeyValueStore};
//!
//! // Production: file-based storage
//! let store = FileKeyValueStore::new("./data/preferences.yaml");
//!
//! // Testing: in-memory storage
//! let store = InMemoryKeyValueStore::new();
//! ```

mod file_key_value_store;
mod in_memory_key_value_store;

pub use file_key_value_store::FileKeyValueStore;
pub use in_memory_key_value_store::InMemoryKeyValueStore;
