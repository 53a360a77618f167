//! PostgreSQL client backed by an sqlx pool.
//!
//! # Responsibilities
//! - Open one pool per role (primary eagerly, replica lazily)
//! - Bind JSON arguments and decode rows into JSON objects
//! - Close the pool on disconnect

use async_trait::async_trait;
use serde_json::{Number, Value};
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column, PgPool, Postgres, Row as _, TypeInfo, ValueRef};

use crate::client::{ClientError, Connector, DatabaseClient, Row};
use crate::routing::Target;

/// Default pool size per handle.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// A PostgreSQL handle.
#[derive(Debug, Clone)]
pub struct PgClient {
    pool: PgPool,
}

impl PgClient {
    /// Wrap an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool, for callers that want typed sqlx queries.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DatabaseClient for PgClient {
    async fn raw_query(&self, sql: &str, args: &[Value]) -> Result<Vec<Row>, ClientError> {
        if self.pool.is_closed() {
            return Err(ClientError::Disconnected);
        }

        let mut query = sqlx::query(sql);
        for arg in args {
            query = bind_value(query, arg);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn disconnect(&self) -> Result<(), ClientError> {
        if !self.pool.is_closed() {
            self.pool.close().await;
        }
        Ok(())
    }
}

fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &Value,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => query.bind(i),
            None => query.bind(n.as_f64()),
        },
        Value::String(s) => query.bind(s.clone()),
        other => query.bind(sqlx::types::Json(other.clone())),
    }
}

fn decode_row(row: &PgRow) -> Result<Row, ClientError> {
    let mut out = Row::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(idx)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            decode_column(row, idx, column.type_info().name())?
        };
        out.insert(column.name().to_string(), value);
    }
    Ok(out)
}

fn decode_column(row: &PgRow, idx: usize, type_name: &str) -> Result<Value, ClientError> {
    let value = match type_name {
        "BOOL" => Value::Bool(row.try_get::<bool, _>(idx)?),
        "INT2" => Value::from(row.try_get::<i16, _>(idx)?),
        "INT4" => Value::from(row.try_get::<i32, _>(idx)?),
        "INT8" => Value::from(row.try_get::<i64, _>(idx)?),
        "FLOAT4" => float_value(f64::from(row.try_get::<f32, _>(idx)?)),
        "FLOAT8" => float_value(row.try_get::<f64, _>(idx)?),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => Value::String(row.try_get::<String, _>(idx)?),
        "JSON" | "JSONB" => row.try_get::<sqlx::types::Json<Value>, _>(idx)?.0,
        "TIMESTAMPTZ" => Value::String(
            row.try_get::<chrono::DateTime<chrono::Utc>, _>(idx)?
                .to_rfc3339(),
        ),
        "TIMESTAMP" => Value::String(
            row.try_get::<chrono::NaiveDateTime, _>(idx)?
                .to_string(),
        ),
        "DATE" => Value::String(row.try_get::<chrono::NaiveDate, _>(idx)?.to_string()),
        other => {
            return Err(ClientError::Decode(format!(
                "unsupported column type {} at index {}",
                other, idx
            )))
        }
    };
    Ok(value)
}

// NaN and infinities have no JSON form.
fn float_value(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

/// Opens [`PgClient`] handles.
#[derive(Debug, Clone)]
pub struct PgConnector {
    max_connections: u32,
}

impl PgConnector {
    pub fn new(max_connections: u32) -> Self {
        Self { max_connections }
    }
}

impl Default for PgConnector {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONNECTIONS)
    }
}

#[async_trait]
impl Connector for PgConnector {
    type Client = PgClient;

    async fn connect(&self, role: Target, url: &str) -> Result<PgClient, ClientError> {
        let options = PgPoolOptions::new().max_connections(self.max_connections);

        // An unreachable replica must not keep the process from starting.
        let pool = match role {
            Target::Primary => options.connect(url).await?,
            Target::Replica => options.connect_lazy(url)?,
        };

        tracing::info!(role = %role, max_connections = self.max_connections, "Database pool opened");
        Ok(PgClient::new(pool))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_finite_floats_become_null() {
        assert_eq!(float_value(f64::NAN), Value::Null);
        assert_eq!(float_value(f64::INFINITY), Value::Null);
        assert_eq!(float_value(1.5), serde_json::json!(1.5));
    }

    // Run with: DATABASE_URL=postgres://... cargo test -- --ignored

    #[tokio::test]
    #[ignore = "requires database"]
    async fn test_raw_query_decodes_rows() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let client = PgConnector::default()
            .connect(Target::Primary, &url)
            .await
            .expect("connect failed");

        let rows = client
            .raw_query(
                "SELECT $1::int8 AS n, $2::text AS s, NULL::text AS missing",
                &[serde_json::json!(7), serde_json::json!("seven")],
            )
            .await
            .expect("query failed");

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["n"], serde_json::json!(7));
        assert_eq!(rows[0]["s"], serde_json::json!("seven"));
        assert_eq!(rows[0]["missing"], Value::Null);

        client.disconnect().await.expect("disconnect failed");
        client.disconnect().await.expect("second disconnect failed");
        assert!(matches!(
            client.raw_query("SELECT 1", &[]).await,
            Err(ClientError::Disconnected)
        ));
    }
}
