//! Record types shared by the extraction pipeline and the store.

use crate::error::InvoiceError;
use serde::{Deserialize, Deserializer, Serialize};

/// One invoice as returned by the model, before it is persisted.
///
/// Every field may be `null` in the model's reply; only `invoice_id` is
/// required to store the record (see [`ExtractedInvoice::validate`]).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExtractedInvoice {
    #[serde(default, deserialize_with = "lenient_string")]
    pub invoice_id: Option<String>,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub invoice_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total: Option<f64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub items: Vec<LineItem>,
}

/// A single invoice line.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub quantity: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: Option<f64>,
}

/// A validated invoice ready for insertion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewInvoice {
    pub invoice_id: String,
    pub customer: Option<String>,
    pub invoice_date: Option<String>,
    pub total: Option<f64>,
    pub items: Vec<LineItem>,
}

impl ExtractedInvoice {
    /// Check the record can be stored and turn it into a [`NewInvoice`].
    ///
    /// The invoice id is the primary key; it is trimmed and must not be empty.
    pub fn validate(self) -> Result<NewInvoice, InvoiceError> {
        let invoice_id = self
            .invoice_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or(InvoiceError::MissingField {
                field: "invoice_id",
            })?;

        Ok(NewInvoice {
            invoice_id,
            customer: self.customer,
            invoice_date: self.invoice_date,
            total: self.total,
            items: self.items,
        })
    }
}

/// A stored invoice header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub invoice_id: String,
    pub customer: Option<String>,
    pub invoice_date: Option<String>,
    pub total: Option<f64>,
    pub created_by: String,
    pub created_at: String,
}

/// A stored account, without its password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
    pub username: String,
    pub is_admin: bool,
    pub created_at: String,
}

/// One row of the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub username: String,
    pub action: String,
    pub details: String,
    pub timestamp: String,
}

/// How to filter the invoice history.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InvoiceFilter {
    /// Every invoice.
    #[default]
    All,
    /// Invoice id contains the given text.
    InvoiceId(String),
    /// Customer name contains the given text.
    Customer(String),
}

// ── Lenient deserialisers ────────────────────────────────────────────────
//
// Models regularly emit `"total": "250.75"` or `"quantity": "2"` despite being
// asked for numbers, and ids as bare numbers.

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrText::Number(n)) => Ok(Some(n)),
        Some(NumberOrText::Text(s)) => {
            let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
            if cleaned.is_empty() {
                return Ok(None);
            }
            cleaned
                .parse::<f64>()
                .map(Some)
                .map_err(|_| serde::de::Error::custom(format!("expected a number, got {s:?}")))
        }
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(other) => {
            return Err(serde::de::Error::custom(format!(
                "expected a string, got {other}"
            )))
        }
    })
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<LineItem>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<LineItem>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_strings_are_accepted() {
        let inv: ExtractedInvoice = serde_json::from_str(
            r#"{"invoice_id": 1042, "total": "1,250.50",
                "items": [{"description": "Bolt", "quantity": "2", "price": 3.5}]}"#,
        )
        .unwrap();
        assert_eq!(inv.invoice_id.as_deref(), Some("1042"));
        assert_eq!(inv.total, Some(1250.5));
        assert_eq!(inv.items[0].quantity, Some(2.0));
    }

    #[test]
    fn nulls_and_missing_fields() {
        let inv: ExtractedInvoice =
            serde_json::from_str(r#"{"invoice_id": "A-1", "customer": null, "items": null}"#)
                .unwrap();
        assert_eq!(inv.customer, None);
        assert_eq!(inv.total, None);
        assert!(inv.items.is_empty());
    }

    #[test]
    fn non_numeric_total_is_rejected() {
        let res: Result<ExtractedInvoice, _> =
            serde_json::from_str(r#"{"invoice_id": "A-1", "total": "about ten"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn validate_requires_invoice_id() {
        let err = ExtractedInvoice::default().validate().unwrap_err();
        assert!(matches!(
            err,
            InvoiceError::MissingField {
                field: "invoice_id"
            }
        ));

        let blank = ExtractedInvoice {
            invoice_id: Some("   ".into()),
            ..Default::default()
        };
        assert!(blank.validate().is_err());
    }

    #[test]
    fn validate_trims_invoice_id() {
        let inv = ExtractedInvoice {
            invoice_id: Some(" INV-7 ".into()),
            total: Some(10.0),
            ..Default::default()
        };
        let new = inv.validate().unwrap();
        assert_eq!(new.invoice_id, "INV-7");
        assert_eq!(new.total, Some(10.0));
    }
}
