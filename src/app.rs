//! Session handlers: every user action, wired to the pipeline and the store.
//!
//! Each handler runs one action to completion and either updates the
//! [`Session`] or returns an [`InvoiceError`] with the session left as it was.
//! Actions that change persisted state also append to the audit trail; a
//! failed audit write is logged and does not undo the action.

use crate::config::AppConfig;
use crate::error::{InvoiceError, UploadIssue};
use crate::invoice::{AuditEntry, ExtractedInvoice, InvoiceFilter, InvoiceRecord, LineItem, NewInvoice, UserAccount};
use crate::nlsql;
use crate::pipeline::input::UploadedFile;
use crate::pipeline::llm::{self, LlmGenerator, TextGenerator};
use crate::pipeline::normalize;
use crate::pipeline::render;
use crate::session::{Screen, Session, SessionUser};
use crate::store::{QueryResult, Store};
use std::sync::Arc;
use tracing::{info, warn};

/// What an upload batch produced.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedUploads {
    pub pages: usize,
    pub issues: Vec<UploadIssue>,
}

/// The invoice workspace: configuration, database and model.
pub struct InvoiceApp {
    config: AppConfig,
    store: Store,
    generator: Arc<dyn TextGenerator>,
}

impl InvoiceApp {
    /// Prepare the database and wire in `generator`.
    pub fn new(config: AppConfig, generator: Arc<dyn TextGenerator>) -> Result<Self, InvoiceError> {
        let store = Store::new(&config.database_path);
        store.ensure_schema(&config.seed_admin_username, &config.seed_admin_password)?;
        info!("Database ready at {}", store.path().display());
        Ok(Self {
            config,
            store,
            generator,
        })
    }

    /// Like [`InvoiceApp::new`], resolving the model provider from the config.
    pub fn open(config: AppConfig) -> Result<Self, InvoiceError> {
        let generator = Arc::new(LlmGenerator::from_config(&config)?);
        Self::new(config, generator)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    // ── Authentication ───────────────────────────────────────────────────

    pub fn login(
        &self,
        session: &mut Session,
        username: &str,
        password: &str,
    ) -> Result<SessionUser, InvoiceError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(InvoiceError::MissingField { field: "username" });
        }
        if password.is_empty() {
            return Err(InvoiceError::MissingField { field: "password" });
        }

        match self.store.authenticate(username, password)? {
            Some(account) => {
                session.reset();
                let user = SessionUser {
                    username: account.username,
                    is_admin: account.is_admin,
                };
                session.user = Some(user.clone());
                self.audit(&user.username, "User logged in", "");
                info!("{} logged in", user.username);
                Ok(user)
            }
            None => {
                self.audit(username, "Failed login attempt", "");
                warn!("Failed login attempt for '{}'", username);
                Err(InvoiceError::InvalidCredentials)
            }
        }
    }

    pub fn logout(&self, session: &mut Session) -> Result<(), InvoiceError> {
        let username = require_user(session)?.username.clone();
        self.audit(&username, "User logged out", "");
        session.reset();
        Ok(())
    }

    pub fn navigate(&self, session: &mut Session, screen: Screen) -> Result<(), InvoiceError> {
        let user = require_user(session)?;
        if screen.requires_admin() && !user.is_admin {
            return Err(InvoiceError::AdminRequired);
        }
        session.screen = screen;
        Ok(())
    }

    // ── Extraction workspace ─────────────────────────────────────────────

    /// Rasterise a new batch, replacing whatever was staged before.
    ///
    /// A batch that yields no page only reports its issues; the current
    /// workspace is left untouched.
    pub async fn stage_uploads(
        &self,
        session: &mut Session,
        files: Vec<UploadedFile>,
    ) -> Result<StagedUploads, InvoiceError> {
        require_user(session)?;
        let report = render::rasterize_uploads(files, self.config.render_scale()).await?;

        if report.pages.is_empty() {
            return Ok(StagedUploads {
                pages: 0,
                issues: report.issues,
            });
        }

        session.clear_workspace();
        session.staged_pages = report.pages;
        session.upload_issues = report.issues.clone();
        Ok(StagedUploads {
            pages: session.staged_pages.len(),
            issues: report.issues,
        })
    }

    /// Send every staged page to the model and keep its reply.
    pub async fn extract(&self, session: &mut Session, instruction: &str) -> Result<String, InvoiceError> {
        let username = require_user(session)?.username.clone();
        if session.staged_pages.is_empty() {
            return Err(InvoiceError::NothingStaged);
        }

        let reply = llm::extract_invoice_text(
            self.generator.as_ref(),
            &session.staged_pages,
            instruction,
            &self.config,
        )
        .await?;

        session.raw_response = Some(reply.clone());
        session.edited = false;
        session.confirmation_pending = None;
        self.audit(
            &username,
            "Extracted multi-page invoice data",
            &format!("Pages processed: {}", session.staged_pages.len()),
        );
        Ok(reply)
    }

    /// Replace the stored reply with hand-edited text. Admins only.
    pub fn edit_response(&self, session: &mut Session, text: &str) -> Result<(), InvoiceError> {
        require_admin(session)?;
        if session.raw_response.is_none() {
            return Err(InvoiceError::NothingExtracted);
        }
        session.raw_response = Some(text.to_string());
        session.edited = true;
        session.confirmation_pending = None;
        Ok(())
    }

    /// Parse the current reply without changing anything.
    pub fn preview(&self, session: &Session) -> Result<ExtractedInvoice, InvoiceError> {
        require_user(session)?;
        let raw = session
            .raw_response
            .as_deref()
            .ok_or(InvoiceError::NothingExtracted)?;
        normalize::parse_invoice(raw)
    }

    /// Validate the current reply and ask for confirmation.
    pub fn request_insert(&self, session: &mut Session) -> Result<NewInvoice, InvoiceError> {
        let invoice = self.preview(session)?.validate()?;
        session.confirmation_pending = Some(invoice.clone());
        Ok(invoice)
    }

    /// Store the pending invoice and clear the workspace.
    ///
    /// On failure the reply and pages stay staged for editing; only the
    /// pending confirmation is dropped.
    pub fn confirm_insert(&self, session: &mut Session) -> Result<NewInvoice, InvoiceError> {
        let username = require_user(session)?.username.clone();
        let invoice = session
            .confirmation_pending
            .take()
            .ok_or(InvoiceError::NoPendingConfirmation)?;

        self.store.insert_invoice(&invoice, &username)?;
        self.audit(
            &username,
            "Inserted invoice data",
            &format!("Invoice ID: {}", invoice.invoice_id),
        );
        session.clear_workspace();
        Ok(invoice)
    }

    /// Back out of a pending insert; the reply stays available for editing.
    pub fn cancel_insert(&self, session: &mut Session) -> Result<(), InvoiceError> {
        require_user(session)?;
        if session.confirmation_pending.take().is_none() {
            return Err(InvoiceError::NoPendingConfirmation);
        }
        session.edited = true;
        Ok(())
    }

    pub fn clear(&self, session: &mut Session) -> Result<(), InvoiceError> {
        require_user(session)?;
        session.clear_workspace();
        Ok(())
    }

    // ── History ──────────────────────────────────────────────────────────

    pub fn search_invoices(
        &self,
        session: &Session,
        filter: &InvoiceFilter,
    ) -> Result<Vec<InvoiceRecord>, InvoiceError> {
        require_user(session)?;
        self.store.find_invoices(filter)
    }

    pub fn invoice_details(
        &self,
        session: &Session,
        invoice_id: &str,
    ) -> Result<Option<(InvoiceRecord, Vec<LineItem>)>, InvoiceError> {
        require_user(session)?;
        self.store.get_invoice(invoice_id.trim())
    }

    // ── Natural-language query ───────────────────────────────────────────

    /// Translate `question` to SQL and run it read-only.
    pub async fn ask(
        &self,
        session: &Session,
        question: &str,
    ) -> Result<(String, QueryResult), InvoiceError> {
        let username = require_user(session)?.username.clone();
        if !self.config.nl_query_enabled {
            return Err(InvoiceError::NlQueryDisabled);
        }

        let (sql, result) = nlsql::run_nl_query(self.generator.as_ref(), &self.store, question).await?;
        self.audit(
            &username,
            "Natural language query executed",
            &format!("Query: {}", question.trim()),
        );
        Ok((sql, result))
    }

    // ── Administration ───────────────────────────────────────────────────

    pub fn add_user(
        &self,
        session: &Session,
        username: &str,
        password: &str,
        is_admin: bool,
    ) -> Result<(), InvoiceError> {
        let actor = require_admin(session)?.username.clone();
        self.store.create_user(username, password, is_admin)?;
        self.audit(&actor, &format!("Added new user: {}", username.trim()), "");
        Ok(())
    }

    pub fn list_users(&self, session: &Session) -> Result<Vec<UserAccount>, InvoiceError> {
        require_admin(session)?;
        self.store.list_users()
    }

    pub fn audit_log(&self, session: &Session) -> Result<Vec<AuditEntry>, InvoiceError> {
        require_admin(session)?;
        self.store.list_audit(self.config.audit_log_limit)
    }

    fn audit(&self, username: &str, action: &str, details: &str) {
        if let Err(e) = self.store.append_audit(username, action, details) {
            warn!("Audit entry '{}' not written: {}", action, e);
        }
    }
}

fn require_user(session: &Session) -> Result<&SessionUser, InvoiceError> {
    session.user.as_ref().ok_or(InvoiceError::NotAuthenticated)
}

fn require_admin(session: &Session) -> Result<&SessionUser, InvoiceError> {
    let user = require_user(session)?;
    if !user.is_admin {
        return Err(InvoiceError::AdminRequired);
    }
    Ok(user)
}
