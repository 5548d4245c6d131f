//! Versioned SQLite schema management shared by the stores.
//!
//! Each store declares its schema history as a list of [`SchemaVersion`]s.
//! A fresh database is created at the latest version; an existing database is
//! structurally validated against its recorded version and migrated forward
//! inside a single transaction.

use anyhow::{bail, Context, Result};
use rusqlite::Connection;
use std::path::Path;
use tracing::info;

/// Offset added to the schema version before storing it in `PRAGMA
/// user_version`, so a foreign SQLite file is never mistaken for one of ours.
pub const BASE_DB_VERSION: i64 = 41000;

/// Expected column of a table, checked against `PRAGMA table_info` on open.
pub struct ColumnSpec {
    pub name: &'static str,
    pub sql_type: &'static str,
    pub non_null: bool,
}

pub struct TableSpec {
    pub name: &'static str,
    pub create_sql: &'static str,
    pub columns: &'static [ColumnSpec],
    /// (index name, indexed columns)
    pub indices: &'static [(&'static str, &'static str)],
}

pub struct SchemaVersion {
    pub version: i64,
    pub tables: &'static [TableSpec],
    pub migration: Option<fn(&rusqlite::Transaction) -> Result<()>>,
}

impl SchemaVersion {
    fn create(&self, conn: &Connection) -> Result<()> {
        conn.execute("PRAGMA foreign_keys = ON;", [])?;
        for table in self.tables {
            conn.execute(table.create_sql, [])
                .with_context(|| format!("Failed to create table {}", table.name))?;
            for (index_name, columns) in table.indices {
                conn.execute(
                    &format!("CREATE INDEX {} ON {}({});", index_name, table.name, columns),
                    [],
                )?;
            }
        }
        conn.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + self.version),
            [],
        )?;
        Ok(())
    }

    fn validate(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", table.name))?;
            let actual: Vec<(String, String, bool)> = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i32>(3)? == 1,
                    ))
                })?
                .collect::<rusqlite::Result<_>>()?;

            if actual.len() != table.columns.len() {
                bail!(
                    "Table {} has {} columns, expected {} ({})",
                    table.name,
                    actual.len(),
                    table.columns.len(),
                    table
                        .columns
                        .iter()
                        .map(|c| c.name)
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }

            for ((name, sql_type, non_null), expected) in actual.iter().zip(table.columns) {
                if name != expected.name {
                    bail!(
                        "Table {}: expected column {}, found {}",
                        table.name,
                        expected.name,
                        name
                    );
                }
                if sql_type != expected.sql_type {
                    bail!(
                        "Table {} column {}: expected type {}, found {}",
                        table.name,
                        name,
                        expected.sql_type,
                        sql_type
                    );
                }
                if *non_null != expected.non_null {
                    bail!(
                        "Table {} column {}: NOT NULL mismatch (expected {}, found {})",
                        table.name,
                        name,
                        expected.non_null,
                        non_null
                    );
                }
            }

            for (index_name, _) in table.indices {
                let exists: bool = conn
                    .query_row(
                        "SELECT 1 FROM sqlite_master WHERE type='index' AND name=?1 AND tbl_name=?2",
                        rusqlite::params![index_name, table.name],
                        |_| Ok(true),
                    )
                    .unwrap_or(false);
                if !exists {
                    bail!("Table {} is missing index {}", table.name, index_name);
                }
            }
        }
        Ok(())
    }
}

/// Opens (or creates) a database file and brings it to the latest schema
/// version in `schemas`.
pub fn open_database(path: &Path, schemas: &[SchemaVersion], label: &str) -> Result<Connection> {
    let is_new = !path.exists();
    let mut conn = Connection::open(path)
        .with_context(|| format!("Failed to open {} database at {:?}", label, path))?;
    conn.execute("PRAGMA foreign_keys = ON;", [])?;

    let latest = schemas
        .last()
        .with_context(|| format!("No schema versions declared for {} database", label))?;

    if is_new {
        info!("Creating new {} database at {:?}", label, path);
        latest.create(&conn)?;
        return Ok(conn);
    }

    let raw_version: i64 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    let db_version = raw_version - BASE_DB_VERSION;
    let current = schemas
        .iter()
        .find(|s| s.version == db_version)
        .with_context(|| format!("Unknown {} database version {}", label, db_version))?;
    current.validate(&conn).with_context(|| {
        format!(
            "{} database schema validation failed for version {}",
            label, db_version
        )
    })?;

    if db_version < latest.version {
        info!(
            "Migrating {} database from version {} to {}",
            label, db_version, latest.version
        );
        let tx = conn.transaction()?;
        for schema in schemas.iter().filter(|s| s.version > db_version) {
            if let Some(migration) = schema.migration {
                migration(&tx).with_context(|| {
                    format!(
                        "Failed to migrate {} database to version {}",
                        label, schema.version
                    )
                })?;
            }
        }
        tx.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + latest.version),
            [],
        )?;
        tx.commit()?;
    }

    Ok(conn)
}
