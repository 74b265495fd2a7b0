//! Table store port - row storage of the hosted backend.
//!
//! The backend exposes named tables with row-level security. This port covers
//! the subset the application needs: equality-filtered ordered reads, insert
//! returning the created row, and patch/delete by an equality filter.
//!
//! Rows are untyped JSON objects; the resource services map them to domain
//! entities.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::domain::foundation::{DomainError, ErrorCode};

/// A row as returned by the backend.
pub type Row = Map<String, Value>;

/// Errors raised by table operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("Request rejected by backend ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Backend unreachable: {0}")]
    Unavailable(String),

    #[error("Unexpected response: {0}")]
    MalformedResponse(String),
}

impl RemoteError {
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }
}

impl From<RemoteError> for DomainError {
    fn from(err: RemoteError) -> Self {
        let code = match &err {
            RemoteError::Rejected { .. } => ErrorCode::RemoteRejected,
            RemoteError::Unavailable(_) => ErrorCode::RemoteUnavailable,
            RemoteError::MalformedResponse(_) => ErrorCode::MalformedRow,
        };
        DomainError::new(code, err.to_string())
    }
}

/// Equality filter `column = value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Returns true if the row holds this value in the filtered column.
    pub fn matches(&self, row: &Row) -> bool {
        row.get(&self.column) == Some(&self.value)
    }

    /// Value rendered the way query strings expect it (strings unquoted).
    pub fn value_as_text(&self) -> String {
        match &self.value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Read request against one table.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    pub table: String,
    pub columns: Option<Vec<String>>,
    pub filter: Option<Filter>,
    /// Column to sort ascending by.
    pub order_by: Option<String>,
    pub limit: Option<usize>,
}

impl SelectQuery {
    /// Selects all columns of all rows.
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: None,
            filter: None,
            order_by: None,
            limit: None,
        }
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter = Some(Filter::eq(column, value));
        self
    }

    pub fn order_ascending(mut self, column: impl Into<String>) -> Self {
        self.order_by = Some(column.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Row storage of the hosted backend.
///
/// # Contract
///
/// - `select` returns rows matching the filter, sorted ascending by
///   `order_by` when given, truncated to `limit`
/// - `insert` returns the row as stored, including backend-generated columns
/// - `update` and `delete` affect every row matching the filter; matching
///   nothing is not an error
#[async_trait]
pub trait TableStore: Send + Sync {
    async fn select(&self, query: &SelectQuery) -> Result<Vec<Row>, RemoteError>;

    async fn insert(&self, table: &str, row: Row) -> Result<Row, RemoteError>;

    async fn update(&self, table: &str, filter: &Filter, patch: Row) -> Result<(), RemoteError>;

    async fn delete(&self, table: &str, filter: &Filter) -> Result<(), RemoteError>;
}
