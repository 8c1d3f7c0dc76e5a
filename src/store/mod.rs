//! SQLite persistence: users, audit trail, invoices.
//!
//! [`Store`] holds only the database path. Every operation opens its own
//! connection and drops it before returning, so no connection outlives a
//! single call and nothing is pooled.
//!
//! All statements issued from this module bind their values. The one place
//! that runs text it did not write is [`Store::run_read_only`], which opens a
//! read-only connection for it.

mod audit;
mod invoices;
mod query;
mod users;

pub use query::QueryResult;
pub use users::{hash_password, verify_password};

use crate::error::InvoiceError;
use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        is_admin INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS audit_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL,
        action TEXT NOT NULL,
        details TEXT NOT NULL DEFAULT '',
        timestamp TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS invoice_master (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        invoice_id TEXT NOT NULL UNIQUE,
        customer TEXT,
        invoice_date TEXT,
        total REAL,
        created_by TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS invoice_items (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        invoice_id TEXT NOT NULL,
        description TEXT,
        quantity REAL,
        price REAL
    );
    CREATE INDEX IF NOT EXISTS idx_audit_log_timestamp ON audit_log(timestamp);
    CREATE INDEX IF NOT EXISTS idx_invoice_items_invoice_id ON invoice_items(invoice_id);
";

/// Handle on the invoice database.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    /// Point at a database file. Nothing is opened until the first call.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a read-write connection for one operation.
    pub(crate) fn connect(&self) -> Result<Connection, InvoiceError> {
        let conn = Connection::open(&self.path).map_err(InvoiceError::db("opening the database"))?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(InvoiceError::db("configuring the connection"))?;
        Ok(conn)
    }

    /// Open a connection that cannot write, for model-generated SQL.
    pub(crate) fn connect_read_only(&self) -> Result<Connection, InvoiceError> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(InvoiceError::db("opening a read-only connection"))?;
        conn.pragma_update(None, "query_only", true)
            .map_err(InvoiceError::db("configuring the read-only connection"))?;
        Ok(conn)
    }

    /// Create the four tables if missing and seed an admin into an empty
    /// user table.
    ///
    /// Safe to call on every start. Returns `true` when the admin was seeded.
    pub fn ensure_schema(
        &self,
        admin_username: &str,
        admin_password: &str,
    ) -> Result<bool, InvoiceError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| InvoiceError::FileRead {
                    path: parent.display().to_string(),
                    source,
                })?;
            }
        }

        let mut conn = self.connect()?;
        conn.execute_batch(SCHEMA)
            .map_err(InvoiceError::db("creating tables"))?;

        let tx = conn
            .transaction()
            .map_err(InvoiceError::db("starting the seed transaction"))?;
        let user_count: i64 = tx
            .query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))
            .map_err(InvoiceError::db("counting users"))?;

        let seeded = if user_count == 0 {
            let hash = hash_password(admin_password)?;
            tx.execute(
                "INSERT INTO users (username, password_hash, is_admin, created_at)
                 VALUES (?1, ?2, 1, ?3)",
                params![admin_username, hash, now()],
            )
            .map_err(InvoiceError::db("seeding the admin account"))?;
            tx.execute(
                "INSERT INTO audit_log (username, action, details, timestamp)
                 VALUES ('system', 'Seeded admin account', ?1, ?2)",
                params![format!("Username: {admin_username}"), now()],
            )
            .map_err(InvoiceError::db("auditing the admin seed"))?;
            info!("Seeded admin account '{}'", admin_username);
            true
        } else {
            false
        };

        tx.commit()
            .map_err(InvoiceError::db("committing the schema"))?;
        Ok(seeded)
    }
}

/// Current UTC time, microsecond precision, lexicographically sortable.
pub(crate) fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// `true` for UNIQUE / PRIMARY KEY constraint failures.
pub(crate) fn is_unique_violation(e: &rusqlite::Error) -> bool {
    match e {
        rusqlite::Error::SqliteFailure(err, _) => {
            err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        }
        _ => false,
    }
}
