//! The `tokio-postgres`-backed [`RowSource`](pgcache_client::RowSource)
//! implementation, built on a `deadpool-postgres` pool capped at a single
//! connection (spec.md §5: shared resource note on the trigger-installing
//! connection applies equally to reload queries issued off this pool).

use deadpool_postgres::Pool;
use pgcache_client::RowSource;
use serde_json::{Map, Value};
use tokio_postgres::types::Type;
use tokio_postgres::Row;

/// Queries a `deadpool-postgres` pool and converts each returned row into
/// a JSON object keyed by column name, for [`Table::init`](pgcache_client::Table::init)
/// and `bigColumns` secondary fetches.
pub struct PoolRowSource {
    pool: Pool,
}

impl PoolRowSource {
    /// Wrap an existing pool. `pgcache-listener`'s `Listener` builds one of
    /// these per registered table from its own DDL pool.
    pub fn new(pool: Pool) -> Self {
        PoolRowSource { pool }
    }
}

#[async_trait::async_trait]
impl RowSource for PoolRowSource {
    type Error = deadpool_postgres::PoolError;

    async fn query(&self, sql: &str) -> Result<Vec<Map<String, Value>>, Self::Error> {
        let client = self.pool.get().await?;
        let rows = client.query(sql, &[]).await.map_err(deadpool_postgres::PoolError::Backend)?;
        Ok(rows.iter().map(row_to_json).collect())
    }
}

/// Convert one row into a JSON object keyed by column name. Covers the
/// scalar types `loadSql`/`bigColumns` queries are expected to return
/// (booleans, integers, floats, text, and columns already typed
/// `json`/`jsonb`); a column of an unsupported type decodes to `null` and
/// is logged, rather than failing the whole row.
fn row_to_json(row: &Row) -> Map<String, Value> {
    let mut object = Map::with_capacity(row.columns().len());
    for (i, column) in row.columns().iter().enumerate() {
        let value = match *column.type_() {
            Type::BOOL => row.get::<_, Option<bool>>(i).map(Value::from),
            Type::INT2 => row.get::<_, Option<i16>>(i).map(Value::from),
            Type::INT4 => row.get::<_, Option<i32>>(i).map(Value::from),
            Type::INT8 => row.get::<_, Option<i64>>(i).map(Value::from),
            Type::FLOAT4 => row.get::<_, Option<f32>>(i).map(|v| Value::from(v as f64)),
            Type::FLOAT8 => row.get::<_, Option<f64>>(i).map(Value::from),
            Type::TEXT | Type::VARCHAR | Type::BPCHAR => row.get::<_, Option<String>>(i).map(Value::from),
            Type::JSON | Type::JSONB => row.get::<_, Option<Value>>(i),
            ref other => {
                tracing::warn!(column = column.name(), pg_type = %other, "unsupported column type, decoding as null");
                None
            }
        };
        object.insert(column.name().to_string(), value.unwrap_or(Value::Null));
    }
    object
}
