//! In-memory table store.
//!
//! Emulates the subset of the hosted row storage the services rely on:
//! identity columns, a `created_at` default, equality filters, ascending
//! ordering and limits.
//!
//! # Security Note
//!
//! This adapter is for **testing and offline use** only. It uses `.expect()`
//! on lock operations which will panic if locks are poisoned.

use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::RwLock;
use std::time::Duration;

use crate::domain::foundation::Timestamp;
use crate::ports::{Filter, RemoteError, Row, SelectQuery, TableStore};

const CREATED_AT: &str = "created_at";

#[derive(Debug, Default)]
struct Tables {
    rows: HashMap<String, Vec<Row>>,
    next_ids: HashMap<String, i64>,
}

/// In-memory row storage.
///
/// # Panics
///
/// Methods may panic if internal locks are poisoned.
///
/// # Example
///
/// ```ignore
/// let store = InMemoryTableStore::new().with_identity("turmas", "id_turma");
/// let row = store.insert("turmas", row).await?;
/// assert_eq!(row["id_turma"], 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryTableStore {
    tables: RwLock<Tables>,
    identities: HashMap<String, String>,
    force_error: RwLock<Option<RemoteError>>,
    selects: AtomicUsize,
    mutations: AtomicUsize,
    read_latency: Duration,
    write_latency: Duration,
}

impl InMemoryTableStore {
    /// Creates an empty store without identity columns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares an auto-incrementing integer column for a table.
    ///
    /// Inserted rows get the next value (starting at 1) unless they already
    /// carry one.
    pub fn with_identity(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.identities.insert(table.into(), column.into());
        self
    }

    /// Forces all operations to fail with the given error.
    pub fn with_error(self, error: RemoteError) -> Self {
        self.set_error(Some(error));
        self
    }

    /// Sets or clears the forced error at runtime.
    pub fn set_error(&self, error: Option<RemoteError>) {
        *self
            .force_error
            .write()
            .expect("InMemoryTableStore: error lock poisoned") = error;
    }

    // === Test Helpers ===

    /// Delays every call to emulate a remote round trip.
    ///
    /// A `select` reads the rows as they are when it is called and answers
    /// after `reads`. A mutation lands after `writes` and then returns.
    pub fn with_latency(mut self, reads: Duration, writes: Duration) -> Self {
        self.read_latency = reads;
        self.write_latency = writes;
        self
    }

    /// Returns a snapshot of a table's rows in insertion order.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .read()
            .expect("InMemoryTableStore: tables lock poisoned")
            .rows
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of `select` calls served (including failed ones).
    pub fn select_count(&self) -> usize {
        self.selects.load(AtomicOrdering::SeqCst)
    }

    /// Number of insert/update/delete calls received (including failed ones).
    pub fn mutation_count(&self) -> usize {
        self.mutations.load(AtomicOrdering::SeqCst)
    }

    fn read_rows(&self, query: &SelectQuery) -> Vec<Row> {
        let tables = self
            .tables
            .read()
            .expect("InMemoryTableStore: tables lock poisoned");

        let mut rows: Vec<Row> = tables
            .rows
            .get(&query.table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.filter.as_ref().map_or(true, |f| f.matches(row)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(column) = &query.order_by {
            rows.sort_by(|a, b| compare_values(a.get(column), b.get(column)));
        }

        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }

        if let Some(columns) = &query.columns {
            rows = rows
                .into_iter()
                .map(|row| {
                    row.into_iter()
                        .filter(|(key, _)| columns.contains(key))
                        .collect()
                })
                .collect();
        }

        rows
    }

    async fn delay(duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }

    fn check_error(&self) -> Result<(), RemoteError> {
        match self
            .force_error
            .read()
            .expect("InMemoryTableStore: error lock poisoned")
            .clone()
        {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TableStore for InMemoryTableStore {
    async fn select(&self, query: &SelectQuery) -> Result<Vec<Row>, RemoteError> {
        self.selects.fetch_add(1, AtomicOrdering::SeqCst);
        self.check_error()?;

        let rows = self.read_rows(query);
        Self::delay(self.read_latency).await;
        Ok(rows)
    }

    async fn insert(&self, table: &str, mut row: Row) -> Result<Row, RemoteError> {
        self.mutations.fetch_add(1, AtomicOrdering::SeqCst);
        self.check_error()?;
        Self::delay(self.write_latency).await;

        let mut tables = self
            .tables
            .write()
            .expect("InMemoryTableStore: tables lock poisoned");

        if let Some(column) = self.identities.get(table) {
            if !row.contains_key(column) {
                let next = tables.next_ids.entry(table.to_string()).or_insert(0);
                *next += 1;
                row.insert(column.clone(), Value::from(*next));
            }
        }

        if !row.contains_key(CREATED_AT) {
            let created_at = serde_json::to_value(Timestamp::now())
                .map_err(|e| RemoteError::malformed(e.to_string()))?;
            row.insert(CREATED_AT.to_string(), created_at);
        }

        tables
            .rows
            .entry(table.to_string())
            .or_default()
            .push(row.clone());

        Ok(row)
    }

    async fn update(&self, table: &str, filter: &Filter, patch: Row) -> Result<(), RemoteError> {
        self.mutations.fetch_add(1, AtomicOrdering::SeqCst);
        self.check_error()?;
        Self::delay(self.write_latency).await;

        let mut tables = self
            .tables
            .write()
            .expect("InMemoryTableStore: tables lock poisoned");

        if let Some(rows) = tables.rows.get_mut(table) {
            for row in rows.iter_mut().filter(|row| filter.matches(row)) {
                for (key, value) in &patch {
                    row.insert(key.clone(), value.clone());
                }
            }
        }

        Ok(())
    }

    async fn delete(&self, table: &str, filter: &Filter) -> Result<(), RemoteError> {
        self.mutations.fetch_add(1, AtomicOrdering::SeqCst);
        self.check_error()?;
        Self::delay(self.write_latency).await;

        let mut tables = self
            .tables
            .write()
            .expect("InMemoryTableStore: tables lock poisoned");

        if let Some(rows) = tables.rows.get_mut(table) {
            rows.retain(|row| !filter.matches(row));
        }

        Ok(())
    }
}

/// Orders JSON scalars: missing/null first, then numbers, then strings.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Number(_)) => 1,
            Some(Value::String(_)) => 2,
            Some(_) => 3,
        }
    }

    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
