//! # edgequake-invoice2sql
//!
//! Extract invoices from PDFs and images with a Vision Language Model, review
//! the result, and store it in SQLite.
//!
//! ## Pipeline Overview
//!
//! ```text
//! uploads (PDF / JPEG / PNG)
//!  │
//!  ├─ 1. Render     one image per PDF page via pdfium (spawn_blocking)
//!  ├─ 2. Encode     PNG → base64 ImageData
//!  ├─ 3. Extract    one multimodal call carrying every page
//!  ├─ 4. Normalise  first `{` .. last `}` → ExtractedInvoice
//!  ├─ 5. Confirm    operator reviews, admins may edit the raw reply
//!  └─ 6. Store      header + items in one transaction, audited
//! ```
//!
//! Stored invoices can be searched by id or customer, or queried in plain
//! English when natural-language queries are enabled. Generated SQL only ever
//! runs on a read-only connection.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_invoice2sql::{AppConfig, InvoiceApp, Session, UploadedFile};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from GEMINI_API_KEY / OPENAI_API_KEY / …
//!     let app = InvoiceApp::open(AppConfig::default())?;
//!     let mut session = Session::new();
//!     app.login(&mut session, "admin", "admin123")?;
//!
//!     let scan = UploadedFile::from_path("invoice.pdf").await?;
//!     app.stage_uploads(&mut session, vec![scan]).await?;
//!     app.extract(&mut session, "").await?;
//!
//!     let invoice = app.request_insert(&mut session)?;
//!     println!("storing {}", invoice.invoice_id);
//!     app.confirm_insert(&mut session)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `invoice2sql` shell (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-invoice2sql = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod app;
pub mod config;
pub mod error;
pub mod invoice;
pub mod nlsql;
pub mod pipeline;
pub mod prompts;
pub mod session;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use app::{InvoiceApp, StagedUploads};
pub use config::{AppConfig, AppConfigBuilder, DEFAULT_MODEL};
pub use error::{ErrorCategory, InvoiceError, UploadIssue};
pub use invoice::{
    AuditEntry, ExtractedInvoice, InvoiceFilter, InvoiceRecord, LineItem, NewInvoice, UserAccount,
};
pub use pipeline::input::UploadedFile;
pub use pipeline::llm::{GenerationRequest, LlmGenerator, TextGenerator};
pub use session::{Screen, Session, SessionUser, WorkspaceStage};
pub use store::{QueryResult, Store};
