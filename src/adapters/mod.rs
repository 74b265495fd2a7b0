//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the application to external systems:
//! - `supabase` - Hosted backend over HTTP (tables and auth)
//! - `memory` - In-process backend for tests and offline runs
//! - `storage` - Device-local key-value persistence (file, in-memory)

pub mod memory;
pub mod storage;
pub mod supabase;

pub use memory::{InMemoryAuthBackend, InMemoryTableStore};
pub use storage::{FileKeyValueStore, InMemoryKeyValueStore};
pub use supabase::{SupabaseAuth, SupabaseClient, SupabaseConfig, SupabaseTableStore};
