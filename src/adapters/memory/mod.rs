//! In-memory backend adapters.
//!
//! Stand-ins for the hosted backend used by tests and offline runs:
//!
//! - `InMemoryTableStore` - implements `TableStore`
//! - `InMemoryAuthBackend` - implements `AuthBackend`
//!
//! Both support forcing errors and expose counters/snapshots for assertions.
//! The table store can also delay calls to emulate remote round trips.

mod auth;
mod tables;

pub use auth::InMemoryAuthBackend;
pub use tables::InMemoryTableStore;
