//! Accounts and password hashing.
//!
//! Passwords are stored as Argon2id PHC strings (`$argon2id$v=19$…`) with a
//! random 16-byte salt per account, so two users with the same password have
//! different hashes.

use super::{is_unique_violation, now, Store};
use crate::error::InvoiceError;
use crate::invoice::UserAccount;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rusqlite::{params, OptionalExtension};
use tracing::{debug, info};

/// Hash a password into a PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, InvoiceError> {
    let mut salt_bytes = [0u8; 16];
    getrandom::fill(&mut salt_bytes)
        .map_err(|e| InvoiceError::Internal(format!("Salt generation failed: {e}")))?;
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| InvoiceError::Internal(format!("Salt encoding failed: {e}")))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| InvoiceError::Internal(format!("Password hashing failed: {e}")))
}

/// Check a password against a stored PHC string. Malformed hashes never match.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

impl Store {
    /// Return the account when `username` exists and `password` matches.
    pub fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<UserAccount>, InvoiceError> {
        let conn = self.connect()?;
        let row: Option<(String, bool, String)> = conn
            .query_row(
                "SELECT password_hash, is_admin, created_at FROM users WHERE username = ?1",
                params![username],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .optional()
            .map_err(InvoiceError::db("looking up the user"))?;

        Ok(row.and_then(|(hash, is_admin, created_at)| {
            if verify_password(password, &hash) {
                Some(UserAccount {
                    username: username.to_string(),
                    is_admin,
                    created_at,
                })
            } else {
                debug!("Password mismatch for '{}'", username);
                None
            }
        }))
    }

    /// Add an account. The username must be unused.
    pub fn create_user(
        &self,
        username: &str,
        password: &str,
        is_admin: bool,
    ) -> Result<(), InvoiceError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(InvoiceError::MissingField { field: "username" });
        }
        if password.is_empty() {
            return Err(InvoiceError::MissingField { field: "password" });
        }

        let hash = hash_password(password)?;
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO users (username, password_hash, is_admin, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![username, hash, is_admin, now()],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                InvoiceError::DuplicateUser {
                    username: username.to_string(),
                }
            } else {
                InvoiceError::Database {
                    action: "adding the user",
                    source: e,
                }
            }
        })?;

        info!("Created user '{}' (admin: {})", username, is_admin);
        Ok(())
    }

    /// All accounts, newest first.
    pub fn list_users(&self) -> Result<Vec<UserAccount>, InvoiceError> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(
                "SELECT username, is_admin, created_at FROM users
                 ORDER BY created_at DESC, id DESC",
            )
            .map_err(InvoiceError::db("listing users"))?;
        let users = stmt
            .query_map([], |r| {
                Ok(UserAccount {
                    username: r.get(0)?,
                    is_admin: r.get(1)?,
                    created_at: r.get(2)?,
                })
            })
            .map_err(InvoiceError::db("listing users"))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(InvoiceError::db("reading users"))?;
        Ok(users)
    }

    pub fn user_count(&self) -> Result<i64, InvoiceError> {
        let conn = self.connect()?;
        conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))
            .map_err(InvoiceError::db("counting users"))
    }
}
