//! Read-only passthrough to the advertising-sales database.

use anyhow::{Context, Result};
use serde_json::{Map, Number, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, SqlitePool, TypeInfo, ValueRef};
use std::path::Path;

/// Connection pool over the sales database, opened read-only.
#[derive(Debug, Clone)]
pub struct SalesDb {
    pool: SqlitePool,
}

impl SalesDb {
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open sales database: {}", path.display()))?;

        tracing::info!("Sales database opened read-only at {}", path.display());
        Ok(Self { pool })
    }

    /// User tables, alphabetically.
    pub async fn list_tables(&self) -> Result<Vec<String>> {
        let names: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch tables")?;

        Ok(names.into_iter().map(|(n,)| n).collect())
    }

    /// `CREATE TABLE` statement for `table_name`, or None if no such table.
    pub async fn table_ddl(&self, table_name: &str) -> Result<Option<String>> {
        let ddl: Option<(String,)> = sqlx::query_as(
            "SELECT sql FROM sqlite_master
             WHERE type = 'table' AND name = ? COLLATE NOCASE",
        )
        .bind(table_name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch table info")?;

        Ok(ddl.map(|(sql,)| sql))
    }

    /// Run `query` with a row limit and return the executed SQL with its rows.
    pub async fn execute(&self, query: &str, limit: u32) -> Result<(String, Vec<Map<String, Value>>)> {
        let query = apply_row_limit(query, limit);
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .context("Query execution failed")?;

        let rows = rows.iter().map(row_to_json).collect::<Result<Vec<_>>>()?;
        Ok((query, rows))
    }
}

/// Append `LIMIT n` unless the statement already ends with that clause.
pub fn apply_row_limit(query: &str, limit: u32) -> String {
    let trimmed = query.trim().trim_end_matches(';').trim_end();
    let tokens: Vec<String> = trimmed
        .split_whitespace()
        .rev()
        .take(2)
        .map(str::to_lowercase)
        .collect();

    let already_limited = tokens.len() == 2 && tokens[1] == "limit" && tokens[0] == limit.to_string();
    if already_limited {
        trimmed.to_string()
    } else {
        format!("{trimmed} LIMIT {limit}")
    }
}

fn row_to_json(row: &SqliteRow) -> Result<Map<String, Value>> {
    let mut object = Map::new();
    for (i, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(i)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            match raw.type_info().name() {
                "INTEGER" => Value::from(row.try_get::<i64, _>(i)?),
                "REAL" => Number::from_f64(row.try_get::<f64, _>(i)?)
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
                "BLOB" => {
                    let bytes: Vec<u8> = row.try_get(i)?;
                    Value::String(String::from_utf8_lossy(&bytes).into_owned())
                }
                _ => Value::String(row.try_get_unchecked::<String, _>(i)?),
            }
        };
        object.insert(column.name().to_string(), value);
    }
    Ok(object)
}
