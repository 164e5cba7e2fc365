//! The query boundary a [`Table`](crate::Table) uses for full reloads and
//! `bigColumns` secondary fetches (spec.md §4.3). This crate stays
//! decoupled from any particular driver — `pgcache-listener` supplies the
//! `tokio-postgres`-backed implementation — mirroring the upstream-driver
//! trait boundary the teacher crate draws between its client logic and a
//! specific database connector.

use async_trait::async_trait;
use serde_json::{Map, Value};

/// A source of rows-as-JSON-objects, keyed by column name, that a
/// [`Table`](crate::Table) can run `loadSql` and `bigColumns` queries
/// against.
#[async_trait]
pub trait RowSource: Send + Sync {
    /// The error type returned by a failed query.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Run `sql` and return every result row as a JSON object keyed by
    /// column name.
    async fn query(&self, sql: &str) -> Result<Vec<Map<String, Value>>, Self::Error>;
}
