//! Upload resolution: turn a local file into an [`UploadedFile`].
//!
//! The rasterizer routes on MIME type only. The type is taken from the file
//! extension, and the magic bytes decide when the extension is missing or
//! unknown, so a `scan` file saved without extension still works.

use crate::error::InvoiceError;
use std::path::Path;
use tracing::debug;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_JPEG: &str = "image/jpeg";
pub const MIME_PNG: &str = "image/png";
pub const MIME_UNKNOWN: &str = "application/octet-stream";

/// A file handed to the workspace, identified by MIME type.
#[derive(Clone)]
pub struct UploadedFile {
    /// Display name (file name without directories).
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadedFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

impl UploadedFile {
    /// Wrap bytes that already carry a MIME type (e.g. from a form upload).
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Read a local file and infer its MIME type.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, InvoiceError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| InvoiceError::FileRead {
                path: path.display().to_string(),
                source,
            })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = detect_mime(path, &bytes);
        debug!("Read upload {} ({}, {} bytes)", name, mime_type, bytes.len());

        Ok(Self {
            name,
            mime_type: mime_type.to_string(),
            bytes,
        })
    }
}

/// Pick a MIME type from the extension, falling back to magic bytes.
pub fn detect_mime(path: &Path, bytes: &[u8]) -> &'static str {
    let by_ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .and_then(|ext| match ext.as_str() {
            "pdf" => Some(MIME_PDF),
            "jpg" | "jpeg" => Some(MIME_JPEG),
            "png" => Some(MIME_PNG),
            _ => None,
        });

    by_ext.unwrap_or_else(|| sniff_mime(bytes))
}

/// Identify PDF, PNG and JPEG by their leading bytes.
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"%PDF") {
        MIME_PDF
    } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        MIME_PNG
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        MIME_JPEG
    } else {
        MIME_UNKNOWN
    }
}
