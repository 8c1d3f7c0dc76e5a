//! Response normalisation: recover the invoice JSON from free-form model text.
//!
//! Models wrap their JSON in prose or ```json fences despite being told not
//! to. The normaliser takes everything from the first `{` to the last `}`
//! (inclusive) and parses that span.
//!
//! Known limitation: this is a span heuristic, not a grammar. A reply that
//! contains two separate objects, or prose after the object that itself
//! contains a `}`, yields a span that does not parse and is reported as an
//! error. Braces inside string values are harmless as long as they sit
//! between the outermost braces.

use crate::error::InvoiceError;
use crate::invoice::ExtractedInvoice;
use serde_json::Value;
use tracing::debug;

/// Return the slice from the first `{` through the last `}`, if any.
pub fn extract_json_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Parse the JSON object embedded in `text`.
///
/// Fails with [`InvoiceError::NoJsonObject`] when there is no brace span, and
/// [`InvoiceError::InvalidJson`] when the span does not parse to an object.
pub fn normalize_response(text: &str) -> Result<Value, InvoiceError> {
    let span = extract_json_span(text).ok_or(InvoiceError::NoJsonObject)?;
    debug!("JSON span: {} of {} chars", span.len(), text.len());

    let value: Value = serde_json::from_str(span).map_err(|e| InvoiceError::InvalidJson {
        detail: e.to_string(),
    })?;

    if !value.is_object() {
        return Err(InvoiceError::InvalidJson {
            detail: "expected a JSON object".into(),
        });
    }
    Ok(value)
}

/// Normalise `text` and map it onto an [`ExtractedInvoice`].
pub fn parse_invoice(text: &str) -> Result<ExtractedInvoice, InvoiceError> {
    let value = normalize_response(text)?;
    serde_json::from_value(value).map_err(|e| InvoiceError::InvalidJson {
        detail: e.to_string(),
    })
}
