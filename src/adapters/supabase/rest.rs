//! Table access over the hosted REST interface.
//!
//! Filters use the `column=eq.value` query syntax, ordering `order=column.asc`
//! and inserts ask for the stored row back with `Prefer: return=representation`.

use async_trait::async_trait;

use super::client::{ensure_success, send, SupabaseClient};
use crate::ports::{Filter, RemoteError, Row, SelectQuery, TableStore};

/// `TableStore` backed by the hosted REST interface.
#[derive(Clone)]
pub struct SupabaseTableStore {
    client: SupabaseClient,
}

impl SupabaseTableStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }
}

/// Builds the query string pairs for a select.
fn select_params(query: &SelectQuery) -> Vec<(String, String)> {
    let mut params = Vec::new();

    let columns = query
        .columns
        .as_ref()
        .map(|columns| columns.join(","))
        .unwrap_or_else(|| "*".to_string());
    params.push(("select".to_string(), columns));

    if let Some(filter) = &query.filter {
        params.push(filter_param(filter));
    }
    if let Some(column) = &query.order_by {
        params.push(("order".to_string(), format!("{}.asc", column)));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }

    params
}

fn filter_param(filter: &Filter) -> (String, String) {
    (filter.column.clone(), format!("eq.{}", filter.value_as_text()))
}

#[async_trait]
impl TableStore for SupabaseTableStore {
    async fn select(&self, query: &SelectQuery) -> Result<Vec<Row>, RemoteError> {
        let url = self.client.config().rest_url(&query.table);
        tracing::debug!(table = %query.table, "Selecting rows");

        let request = self
            .client
            .authorize(self.client.http().get(&url).query(&select_params(query)))
            .await;
        let response = ensure_success(send(request).await?).await?;

        response
            .json::<Vec<Row>>()
            .await
            .map_err(|e| RemoteError::malformed(e.to_string()))
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, RemoteError> {
        let url = self.client.config().rest_url(table);

        let request = self
            .client
            .authorize(
                self.client
                    .http()
                    .post(&url)
                    .header("Prefer", "return=representation")
                    .json(&row),
            )
            .await;
        let response = ensure_success(send(request).await?).await?;

        let mut rows = response
            .json::<Vec<Row>>()
            .await
            .map_err(|e| RemoteError::malformed(e.to_string()))?;

        if rows.is_empty() {
            return Err(RemoteError::malformed(format!(
                "Insert into '{}' returned no row",
                table
            )));
        }
        Ok(rows.swap_remove(0))
    }

    async fn update(&self, table: &str, filter: &Filter, patch: Row) -> Result<(), RemoteError> {
        let url = self.client.config().rest_url(table);

        let request = self
            .client
            .authorize(
                self.client
                    .http()
                    .patch(&url)
                    .query(&[filter_param(filter)])
                    .header("Prefer", "return=minimal")
                    .json(&patch),
            )
            .await;
        ensure_success(send(request).await?).await?;
        Ok(())
    }

    async fn delete(&self, table: &str, filter: &Filter) -> Result<(), RemoteError> {
        let url = self.client.config().rest_url(table);

        let request = self
            .client
            .authorize(
                self.client
                    .http()
                    .delete(&url)
                    .query(&[filter_param(filter)]),
            )
            .await;
        ensure_success(send(request).await?).await?;
        Ok(())
    }
}
