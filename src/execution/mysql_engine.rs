//! MySQL Executor
//!
//! Opens one connection per statement (no pooling) and always closes it,
//! whatever the statement did.

use crate::config::DatabaseConfig;
use crate::execution::engine::QueryExecutor;
use crate::execution::result::{QueryResult, ResultTable, Row};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Column, ConnectOptions, Connection, Executor, Row as _, Statement, TypeInfo};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub struct MySqlExecutor {
    options: MySqlConnectOptions,
    timeout: Duration,
}

impl MySqlExecutor {
    pub fn new(options: MySqlConnectOptions, timeout: Duration) -> Self {
        Self { options, timeout }
    }

    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self::new(config.connect_options(), config.query_timeout())
    }

    async fn run(&self, sql: &str) -> Result<ResultTable, sqlx::Error> {
        let mut conn = self.options.connect().await?;
        let outcome = fetch_table(&mut conn, sql).await;
        if let Err(e) = conn.close().await {
            warn!("Failed to close MySQL connection cleanly: {}", e);
        }
        outcome
    }
}

#[async_trait]
impl QueryExecutor for MySqlExecutor {
    fn name(&self) -> &'static str {
        "mysql"
    }

    async fn execute(&self, sql: &str) -> QueryResult {
        let started = Instant::now();
        // Dropping the timed-out future drops the connection with it.
        match tokio::time::timeout(self.timeout, self.run(sql)).await {
            Ok(Ok(table)) => {
                info!(
                    rows = table.row_count(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Query executed"
                );
                QueryResult::Table(table)
            }
            Ok(Err(e)) => {
                warn!("Query failed: {}", e);
                QueryResult::failed(e)
            }
            Err(_) => {
                warn!("Query timed out after {:?}", self.timeout);
                QueryResult::failed(format!("query timed out after {:?}", self.timeout))
            }
        }
    }
}

async fn fetch_table(conn: &mut MySqlConnection, sql: &str) -> Result<ResultTable, sqlx::Error> {
    // Preparing first keeps the column names even when no row comes back.
    let statement = (&mut *conn).prepare(sql).await?;
    let columns: Vec<String> = statement
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    debug!(?columns, "Statement prepared");

    let rows = statement.query().fetch_all(&mut *conn).await?;
    let rows = rows.iter().map(|row| decode_row(row, &columns)).collect();
    Ok(ResultTable::new(columns, rows))
}

fn decode_row(row: &MySqlRow, columns: &[String]) -> Row {
    let mut out = Row::new();
    for (index, column) in row.columns().iter().enumerate() {
        let name = columns
            .get(index)
            .cloned()
            .unwrap_or_else(|| column.name().to_string());
        out.insert(name, decode_cell(row, index, column.type_info().name()));
    }
    out
}

fn decode_cell(row: &MySqlRow, index: usize, type_name: &str) -> Value {
    let decoded: Result<Option<Value>, sqlx::Error> = match type_name {
        "BOOLEAN" => row.try_get::<Option<bool>, _>(index).map(|v| v.map(Value::from)),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            row.try_get::<Option<i64>, _>(index).map(|v| v.map(Value::from))
        }
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => row.try_get::<Option<u64>, _>(index).map(|v| v.map(Value::from)),
        "YEAR" => row
            .try_get_unchecked::<Option<u16>, _>(index)
            .map(|v| v.map(Value::from)),
        "FLOAT" | "DOUBLE" => row.try_get::<Option<f64>, _>(index).map(|v| {
            v.map(|f| {
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            })
        }),
        // Sent as text on the wire; keep it numeric when it parses.
        "DECIMAL" => row.try_get_unchecked::<Option<String>, _>(index).map(|v| {
            v.map(|s| {
                s.parse::<serde_json::Number>()
                    .map(Value::Number)
                    .unwrap_or(Value::String(s))
            })
        }),
        "DATETIME" | "TIMESTAMP" => row.try_get::<Option<NaiveDateTime>, _>(index).map(|v| {
            v.map(|dt| Value::String(dt.format("%Y-%m-%d %H:%M:%S").to_string()))
        }),
        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(index)
            .map(|v| v.map(|d| Value::String(d.to_string()))),
        "TIME" => row
            .try_get::<Option<NaiveTime>, _>(index)
            .map(|v| v.map(|t| Value::String(t.to_string()))),
        "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY" | "VARBINARY" | "GEOMETRY" => row
            .try_get_unchecked::<Option<Vec<u8>>, _>(index)
            .map(|v| v.map(|bytes| Value::String(format!("<{} bytes>", bytes.len())))),
        _ => row.try_get::<Option<String>, _>(index).map(|v| v.map(Value::String)),
    };

    match decoded {
        Ok(value) => value.unwrap_or(Value::Null),
        Err(e) => {
            debug!(type_name, "Falling back to text decode: {}", e);
            row.try_get_unchecked::<Option<String>, _>(index)
                .ok()
                .flatten()
                .map(Value::String)
                .unwrap_or(Value::Null)
        }
    }
}
