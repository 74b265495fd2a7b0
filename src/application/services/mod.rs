//! Resource services - per-entity adapters over the table store.
//!
//! Each service translates a domain call ("list activities for class X")
//! into a [`TableStore`](crate::ports::TableStore) query and maps the rows
//! into entities. Services do not log; callers decide how failures surface.

mod activity_service;
mod class_service;
mod profile_service;
pub mod tables;

pub use activity_service::ActivityService;
pub use class_service::ClassService;
pub use profile_service::{AccountError, ProfileService};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::ports::Row;

/// Deserializes a fetched row into its typed shape.
pub(crate) fn decode_row<T: DeserializeOwned>(table: &str, row: Row) -> Result<T, DomainError> {
    serde_json::from_value(Value::Object(row)).map_err(|e| {
        DomainError::new(ErrorCode::MalformedRow, format!("Unexpected row shape: {}", e))
            .with_detail("table", table)
    })
}

/// Row creation time, or now when the backend did not return one.
pub(crate) fn created_at_or_now(created_at: Option<Timestamp>) -> Timestamp {
    created_at.unwrap_or_else(Timestamp::now)
}
