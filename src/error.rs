//! Error types for the edgequake-invoice2sql library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`InvoiceError`]: the current action cannot complete (bad credentials,
//!   model unreachable, unparsable reply, duplicate invoice id). The session
//!   itself survives; only the action is aborted and its local state is left
//!   as it was.
//!
//! * [`UploadIssue`]: **Non-fatal**: a single uploaded file was rejected or
//!   could not be rasterised, but every other file in the same batch is
//!   still staged. Collected inside
//!   [`crate::pipeline::render::RasterReport`].

use thiserror::Error;

/// Which class of failure an [`InvoiceError`] belongs to.
///
/// The shell uses this to tell the operator whether re-submitting makes
/// sense without inspecting every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Bad credentials, missing fields, wrong screen. Re-submit with fixed input.
    Input,
    /// The model or the database could not be reached or returned an error.
    Upstream,
    /// The reply or the record itself is unusable; staged data is kept for editing.
    Data,
    /// Natural-language query rejected by the read-only guard.
    Policy,
    /// Misconfiguration or a bug.
    Internal,
}

/// All errors returned by the edgequake-invoice2sql library.
#[derive(Debug, Error)]
pub enum InvoiceError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Username/password pair did not match a stored account.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// A required field was left empty.
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    /// The action needs a logged-in user.
    #[error("Please log in first")]
    NotAuthenticated,

    /// The action is restricted to administrators.
    #[error("Access denied. Admin privileges required.")]
    AdminRequired,

    /// Extraction was requested with no staged pages.
    #[error("Please upload invoice files first")]
    NothingStaged,

    /// Preview/insert was requested before any extraction.
    #[error("No extracted invoice data; run an extraction first")]
    NothingExtracted,

    /// `confirm`/`cancel` without a pending insert.
    #[error("No insert is awaiting confirmation")]
    NoPendingConfirmation,

    /// A local file could not be read.
    #[error("Cannot read '{path}': {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The account name is already taken.
    #[error("User '{username}' already exists")]
    DuplicateUser { username: String },

    // ── Upstream errors ───────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM API returned an error. Not retried.
    #[error("LLM API error: {message}")]
    LlmApiError { message: String },

    /// A database statement failed.
    #[error("Database error while {action}: {source}")]
    Database {
        action: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDFium is normally downloaded automatically on first run.\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Data errors ───────────────────────────────────────────────────────
    /// The model reply contained no `{ … }` span at all.
    #[error("Couldn't extract valid JSON from response: no JSON object found")]
    NoJsonObject,

    /// The `{ … }` span was found but is not valid JSON for an invoice.
    #[error("Couldn't extract valid JSON from response: {detail}")]
    InvalidJson { detail: String },

    /// The invoice id is already stored.
    #[error("Invoice '{invoice_id}' already exists in the database")]
    DuplicateInvoice { invoice_id: String },

    /// Image encoding for the API request failed.
    #[error("Image encoding failed for page {page}: {detail}")]
    EncodingFailed { page: usize, detail: String },

    // ── Natural-language query errors ─────────────────────────────────────
    /// NL-to-SQL was not enabled in the configuration.
    #[error("Natural-language queries are disabled.\nEnable them with --enable-nl-query.")]
    NlQueryDisabled,

    /// The generated statement would modify the database.
    #[error("Refusing to run a statement that is not read-only:\n{sql}")]
    ReadOnlyViolation { sql: String },

    /// The model produced no statement.
    #[error("The model returned an empty SQL statement")]
    EmptyQuery,

    /// The generated statement failed to execute.
    #[error("Error executing query: {detail}")]
    QueryFailed { detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl InvoiceError {
    /// Classify the error by recoverability.
    pub fn category(&self) -> ErrorCategory {
        match self {
            InvoiceError::InvalidCredentials
            | InvoiceError::MissingField { .. }
            | InvoiceError::NotAuthenticated
            | InvoiceError::AdminRequired
            | InvoiceError::NothingStaged
            | InvoiceError::NothingExtracted
            | InvoiceError::NoPendingConfirmation
            | InvoiceError::FileRead { .. }
            | InvoiceError::DuplicateUser { .. } => ErrorCategory::Input,

            InvoiceError::ProviderNotConfigured { .. }
            | InvoiceError::LlmApiError { .. }
            | InvoiceError::Database { .. }
            | InvoiceError::PdfiumBindingFailed(_) => ErrorCategory::Upstream,

            InvoiceError::NoJsonObject
            | InvoiceError::InvalidJson { .. }
            | InvoiceError::DuplicateInvoice { .. }
            | InvoiceError::EncodingFailed { .. }
            | InvoiceError::EmptyQuery
            | InvoiceError::QueryFailed { .. } => ErrorCategory::Data,

            InvoiceError::NlQueryDisabled | InvoiceError::ReadOnlyViolation { .. } => {
                ErrorCategory::Policy
            }

            InvoiceError::InvalidConfig(_) | InvoiceError::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Build a `map_err` adapter that tags a rusqlite error with what was
    /// being done at the time.
    pub(crate) fn db(action: &'static str) -> impl FnOnce(rusqlite::Error) -> InvoiceError {
        move |source| InvoiceError::Database { action, source }
    }
}

/// A non-fatal error for a single uploaded file.
///
/// The rest of the batch is still rasterised and staged.
#[derive(Debug, Clone, Error, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum UploadIssue {
    /// The MIME type is not PDF, JPEG or PNG.
    #[error("Unsupported file type: {mime_type} ({file})")]
    UnsupportedType { file: String, mime_type: String },

    /// The PDF could not be opened or a page failed to render.
    #[error("Error processing PDF '{file}': {detail}")]
    PdfFailed { file: String, detail: String },

    /// The image bytes could not be decoded.
    #[error("Error processing image '{file}': {detail}")]
    ImageFailed { file: String, detail: String },
}
