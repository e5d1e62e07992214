/// Snapshot sources
///
/// [`ScanSource`] is the seam between the reconciliation loop and storage.
/// [`SqliteScanSource`] reads the scanner's database through one read-only
/// connection; every query runs on the blocking pool.
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{params, Connection, OpenFlags};

use super::mapping::{map_scan_row, ScanRow};
use super::types::TokenRecord;
use crate::errors::DataSourceError;
use crate::logger::{self, LogTag};

/// Anything that can produce an ordered snapshot of token records
#[async_trait]
pub trait ScanSource: Send + Sync {
    /// Most recently scanned records first, at most `limit` of them
    async fn fetch_snapshot(&self, limit: usize) -> Result<Vec<TokenRecord>, DataSourceError>;
}

pub struct SqliteScanSource {
    conn: Arc<Mutex<Option<Connection>>>,
    table: String,
}

impl SqliteScanSource {
    /// Open the scanner database read-only
    ///
    /// Fails with [`DataSourceError::Connect`] when the file is missing or unreadable.
    pub fn open(path: &str, table: &str) -> Result<Self, DataSourceError> {
        if !Path::new(path).exists() {
            return Err(DataSourceError::connect(path, "file does not exist"));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| DataSourceError::connect(path, e))?;

        // The scanner writes concurrently; wait for its locks instead of failing the tick
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(|e| DataSourceError::connect(path, e))?;

        match table_exists(&conn, table) {
            Ok(true) => {
                logger::info(
                    LogTag::Database,
                    &format!("Opened {} (table '{}')", path, table),
                );
            }
            Ok(false) => {
                logger::warning(
                    LogTag::Database,
                    &format!(
                        "Table '{}' not found in {} - polls will fail until the scanner creates it",
                        table, path
                    ),
                );
            }
            Err(e) => return Err(DataSourceError::connect(path, e)),
        }

        Ok(Self::from_connection(conn, table))
    }

    /// Wrap an already open connection
    pub fn from_connection(conn: Connection, table: &str) -> Self {
        Self {
            conn: Arc::new(Mutex::new(Some(conn))),
            table: table.to_string(),
        }
    }

    /// Close the connection; later fetches fail with a query error
    pub fn close(&self) {
        let taken = match self.conn.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        if let Some(conn) = taken {
            if let Err((_, e)) = conn.close() {
                logger::warning(
                    LogTag::Database,
                    &format!("Error closing scan database: {}", e),
                );
            } else {
                logger::info(LogTag::Database, "Scan database closed");
            }
        }
    }
}

#[async_trait]
impl ScanSource for SqliteScanSource {
    async fn fetch_snapshot(&self, limit: usize) -> Result<Vec<TokenRecord>, DataSourceError> {
        let conn = Arc::clone(&self.conn);
        let table = self.table.clone();

        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| DataSourceError::Query("connection lock poisoned".to_string()))?;
            let conn = guard
                .as_ref()
                .ok_or_else(|| DataSourceError::Query("connection is closed".to_string()))?;
            query_snapshot(conn, &table, limit)
        })
        .await
        .map_err(|e| DataSourceError::Query(format!("query task failed: {}", e)))?
    }
}

fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn query_snapshot(
    conn: &Connection,
    table: &str,
    limit: usize,
) -> Result<Vec<TokenRecord>, DataSourceError> {
    let sql = format!(
        "SELECT * FROM \"{}\" ORDER BY scan_timestamp DESC LIMIT ?1",
        table
    );
    let mut stmt = conn.prepare(&sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let rows = stmt
        .query_map(params![limit as i64], |row| {
            let mut values = Vec::with_capacity(columns.len());
            for idx in 0..columns.len() {
                values.push(row.get::<_, Value>(idx)?);
            }
            Ok(ScanRow::from_columns(&columns, values))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let total = rows.len();
    let mut seen = HashSet::with_capacity(total);
    let mut records = Vec::with_capacity(total);
    let mut dropped = 0usize;

    for row in rows {
        match map_scan_row(&row) {
            // Rows are newest first; an older duplicate of a token is ignored
            Ok(record) if !seen.insert(record.address.clone()) => {
                logger::debug(
                    LogTag::Database,
                    &format!("Skipping older duplicate row for {}", record.address),
                );
            }
            Ok(record) => records.push(record),
            Err(e) => {
                dropped += 1;
                logger::warning(LogTag::Database, &format!("Dropping scan row: {}", e));
            }
        }
    }

    logger::verbose(
        LogTag::Database,
        &format!(
            "Snapshot: {} rows read, {} records, {} dropped",
            total,
            records.len(),
            dropped
        ),
    );

    Ok(records)
}
