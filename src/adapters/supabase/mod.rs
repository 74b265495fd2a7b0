//! Hosted backend adapters.
//!
//! - `SupabaseClient` - shared HTTP client and token holder
//! - `SupabaseTableStore` - implements `TableStore` over the REST interface
//! - `SupabaseAuth` - implements `AuthBackend` over the auth endpoints
//!
//! # Example
//!
//! ```ignore
//! let client = SupabaseClient::new(SupabaseConfig::new(url, anon_key))?;
//! let tables = Arc::new(SupabaseTableStore::new(client.clone()));
//! let auth = Arc::new(SupabaseAuth::new(client).with_session_store(store));
//! ```

mod auth;
mod client;
mod rest;

pub use auth::{SupabaseAuth, REFRESH_TOKEN_KEY};
pub use client::{SupabaseClient, SupabaseConfig};
pub use rest::SupabaseTableStore;
