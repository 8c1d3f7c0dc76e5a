//! Append-only audit trail.

use super::{now, Store};
use crate::error::InvoiceError;
use crate::invoice::AuditEntry;
use rusqlite::params;
use tracing::debug;

impl Store {
    /// Record an action. Entries are never updated or deleted.
    pub fn append_audit(
        &self,
        username: &str,
        action: &str,
        details: &str,
    ) -> Result<(), InvoiceError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO audit_log (username, action, details, timestamp)
             VALUES (?1, ?2, ?3, ?4)",
            params![username, action, details, now()],
        )
        .map_err(InvoiceError::db("writing the audit log"))?;
        debug!("audit: {} {} {}", username, action, details);
        Ok(())
    }

    /// The `limit` most recent entries, newest first.
    pub fn list_audit(&self, limit: usize) -> Result<Vec<AuditEntry>, InvoiceError> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(
                "SELECT username, action, details, timestamp FROM audit_log
                 ORDER BY timestamp DESC, id DESC
                 LIMIT ?1",
            )
            .map_err(InvoiceError::db("reading the audit log"))?;
        let entries = stmt
            .query_map(params![limit as i64], |r| {
                Ok(AuditEntry {
                    username: r.get(0)?,
                    action: r.get(1)?,
                    details: r.get(2)?,
                    timestamp: r.get(3)?,
                })
            })
            .map_err(InvoiceError::db("reading the audit log"))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(InvoiceError::db("reading the audit log"))?;
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::store;

    #[test]
    fn newest_first_and_capped() {
        let (_dir, store) = store();
        for i in 0..5 {
            store
                .append_audit("admin", &format!("action {i}"), "")
                .unwrap();
        }

        let entries = store.list_audit(3).unwrap();
        let actions: Vec<&str> = entries.iter().map(|e| e.action.as_str()).collect();
        assert_eq!(actions, vec!["action 4", "action 3", "action 2"]);
    }

    #[test]
    fn details_are_kept() {
        let (_dir, store) = store();
        store
            .append_audit("bob", "Inserted invoice data", "Invoice ID: INV-9")
            .unwrap();
        let entry = &store.list_audit(10).unwrap()[0];
        assert_eq!(entry.username, "bob");
        assert_eq!(entry.details, "Invoice ID: INV-9");
        assert!(!entry.timestamp.is_empty());
    }
}
