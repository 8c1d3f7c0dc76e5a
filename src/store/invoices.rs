//! Invoice headers and line items.

use super::{is_unique_violation, now, Store};
use crate::error::InvoiceError;
use crate::invoice::{InvoiceFilter, InvoiceRecord, LineItem, NewInvoice};
use rusqlite::{params, OptionalExtension, Row};
use tracing::{debug, info};

const HEADER_COLUMNS: &str =
    "invoice_id, customer, invoice_date, total, created_by, created_at";

impl Store {
    /// Store one header and all its items atomically.
    ///
    /// An existing `invoice_id` fails with [`InvoiceError::DuplicateInvoice`]
    /// and leaves both tables untouched.
    pub fn insert_invoice(
        &self,
        invoice: &NewInvoice,
        created_by: &str,
    ) -> Result<(), InvoiceError> {
        let mut conn = self.connect()?;
        let tx = conn
            .transaction()
            .map_err(InvoiceError::db("starting the insert transaction"))?;

        tx.execute(
            "INSERT INTO invoice_master
                 (invoice_id, customer, invoice_date, total, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                invoice.invoice_id,
                invoice.customer,
                invoice.invoice_date,
                invoice.total,
                created_by,
                now(),
            ],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                InvoiceError::DuplicateInvoice {
                    invoice_id: invoice.invoice_id.clone(),
                }
            } else {
                InvoiceError::Database {
                    action: "inserting the invoice header",
                    source: e,
                }
            }
        })?;

        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO invoice_items (invoice_id, description, quantity, price)
                     VALUES (?1, ?2, ?3, ?4)",
                )
                .map_err(InvoiceError::db("preparing the item insert"))?;
            for item in &invoice.items {
                stmt.execute(params![
                    invoice.invoice_id,
                    item.description,
                    item.quantity,
                    item.price,
                ])
                .map_err(InvoiceError::db("inserting an invoice item"))?;
            }
        }

        tx.commit()
            .map_err(InvoiceError::db("committing the invoice"))?;
        info!(
            "Stored invoice {} with {} item(s)",
            invoice.invoice_id,
            invoice.items.len()
        );
        Ok(())
    }

    /// Invoice headers matching `filter`, newest first.
    ///
    /// Id and customer filters are case-insensitive substring matches;
    /// `%` and `_` in the needle are matched literally.
    pub fn find_invoices(&self, filter: &InvoiceFilter) -> Result<Vec<InvoiceRecord>, InvoiceError> {
        let (clause, needle) = match filter {
            InvoiceFilter::All => ("", None),
            InvoiceFilter::InvoiceId(id) => ("WHERE invoice_id LIKE ?1 ESCAPE '\\'", Some(id)),
            InvoiceFilter::Customer(c) => ("WHERE customer LIKE ?1 ESCAPE '\\'", Some(c)),
        };
        let sql = format!(
            "SELECT {HEADER_COLUMNS} FROM invoice_master {clause}
             ORDER BY created_at DESC, id DESC"
        );
        debug!("find_invoices: {:?}", filter);

        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(&sql)
            .map_err(InvoiceError::db("searching invoices"))?;
        let rows = match needle {
            Some(n) => stmt.query_map(params![like_pattern(n)], header_from_row),
            None => stmt.query_map([], header_from_row),
        }
        .map_err(InvoiceError::db("searching invoices"))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(InvoiceError::db("reading invoices"))
    }

    /// One header with its items, or `None` if the id is unknown.
    pub fn get_invoice(
        &self,
        invoice_id: &str,
    ) -> Result<Option<(InvoiceRecord, Vec<LineItem>)>, InvoiceError> {
        let conn = self.connect()?;
        let header = conn
            .query_row(
                &format!("SELECT {HEADER_COLUMNS} FROM invoice_master WHERE invoice_id = ?1"),
                params![invoice_id],
                header_from_row,
            )
            .optional()
            .map_err(InvoiceError::db("loading the invoice"))?;

        let Some(header) = header else {
            return Ok(None);
        };

        let mut stmt = conn
            .prepare(
                "SELECT description, quantity, price FROM invoice_items
                 WHERE invoice_id = ?1 ORDER BY id",
            )
            .map_err(InvoiceError::db("loading invoice items"))?;
        let items = stmt
            .query_map(params![invoice_id], |r| {
                Ok(LineItem {
                    description: r.get(0)?,
                    quantity: r.get(1)?,
                    price: r.get(2)?,
                })
            })
            .map_err(InvoiceError::db("loading invoice items"))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(InvoiceError::db("reading invoice items"))?;

        Ok(Some((header, items)))
    }
}

fn header_from_row(r: &Row<'_>) -> rusqlite::Result<InvoiceRecord> {
    Ok(InvoiceRecord {
        invoice_id: r.get(0)?,
        customer: r.get(1)?,
        invoice_date: r.get(2)?,
        total: r.get(3)?,
        created_by: r.get(4)?,
        created_at: r.get(5)?,
    })
}

/// `%needle%` with LIKE wildcards escaped.
fn like_pattern(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len() + 2);
    out.push('%');
    for c in needle.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}
