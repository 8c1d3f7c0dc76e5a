//! Per-session scratch state.
//!
//! A [`Session`] is created when an operator connects and dropped when they
//! leave. Nothing in it is shared between sessions or persisted; the
//! handlers on [`crate::app::InvoiceApp`] take it by `&mut`.

use crate::error::UploadIssue;
use crate::invoice::NewInvoice;
use crate::pipeline::render::RasterPage;
use serde::Serialize;

/// The authenticated operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionUser {
    pub username: String,
    pub is_admin: bool,
}

/// Top-level screens. Navigation between them is unordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    #[default]
    Extraction,
    History,
    Query,
    /// Admins only.
    UserAdmin,
}

impl Screen {
    pub fn requires_admin(self) -> bool {
        matches!(self, Screen::UserAdmin)
    }

    pub fn label(self) -> &'static str {
        match self {
            Screen::Extraction => "Invoice Extraction",
            Screen::History => "Invoice History",
            Screen::Query => "Query Interface",
            Screen::UserAdmin => "User Management",
        }
    }
}

/// Where the extraction workspace currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceStage {
    Idle,
    ImagesStaged,
    Extracted,
    Edited,
    ConfirmationPending,
}

/// Scratch state for one interactive session.
#[derive(Debug, Default)]
pub struct Session {
    pub user: Option<SessionUser>,
    pub screen: Screen,
    /// Pages from the last upload batch, in upload order.
    pub staged_pages: Vec<RasterPage>,
    /// Per-file problems from the last upload batch.
    pub upload_issues: Vec<UploadIssue>,
    /// Model reply, possibly edited by an admin.
    pub raw_response: Option<String>,
    pub edited: bool,
    /// Validated record awaiting an explicit yes.
    pub confirmation_pending: Option<NewInvoice>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.is_admin)
    }

    pub fn username(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.username.as_str())
    }

    pub fn stage(&self) -> WorkspaceStage {
        if self.confirmation_pending.is_some() {
            WorkspaceStage::ConfirmationPending
        } else if self.raw_response.is_some() && self.edited {
            WorkspaceStage::Edited
        } else if self.raw_response.is_some() {
            WorkspaceStage::Extracted
        } else if !self.staged_pages.is_empty() {
            WorkspaceStage::ImagesStaged
        } else {
            WorkspaceStage::Idle
        }
    }

    /// Drop staged pages, the reply and any pending confirmation.
    pub fn clear_workspace(&mut self) {
        self.staged_pages.clear();
        self.upload_issues.clear();
        self.raw_response = None;
        self.edited = false;
        self.confirmation_pending = None;
    }

    /// Forget the user and everything they staged.
    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::DynamicImage;

    fn page() -> RasterPage {
        RasterPage {
            source: "a.png".into(),
            page_num: 1,
            image: DynamicImage::new_rgb8(1, 1),
        }
    }

    #[test]
    fn stage_follows_fields() {
        let mut s = Session::new();
        assert_eq!(s.stage(), WorkspaceStage::Idle);

        s.staged_pages.push(page());
        assert_eq!(s.stage(), WorkspaceStage::ImagesStaged);

        s.raw_response = Some("{}".into());
        assert_eq!(s.stage(), WorkspaceStage::Extracted);

        s.edited = true;
        assert_eq!(s.stage(), WorkspaceStage::Edited);

        s.confirmation_pending = Some(NewInvoice {
            invoice_id: "X".into(),
            customer: None,
            invoice_date: None,
            total: None,
            items: vec![],
        });
        assert_eq!(s.stage(), WorkspaceStage::ConfirmationPending);

        s.clear_workspace();
        assert_eq!(s.stage(), WorkspaceStage::Idle);
    }

    #[test]
    fn admin_flag() {
        let mut s = Session::new();
        assert!(!s.is_admin());
        s.user = Some(SessionUser {
            username: "bob".into(),
            is_admin: false,
        });
        assert!(s.is_authenticated());
        assert!(!s.is_admin());
        assert_eq!(s.username(), Some("bob"));
        assert!(Screen::UserAdmin.requires_admin());
        assert!(!Screen::Query.requires_admin());
    }
}
