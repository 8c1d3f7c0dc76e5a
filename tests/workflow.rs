//! Workspace flows driven end to end with a scripted model.
//!
//! Uploads are PNGs so nothing here needs the pdfium library; the PDF path
//! is covered by `tests/e2e.rs`.

mod common;

use common::{png_upload, workspace, ScriptedGenerator};
use edgequake_invoice2sql::prompts::EXTRACTION_SYSTEM_PROMPT;
use edgequake_invoice2sql::{
    InvoiceError, InvoiceFilter, LineItem, Screen, Session, UploadIssue, UploadedFile,
    WorkspaceStage,
};
use serde_json::Value;

const TWO_PAGE_REPLY: &str = r#"Here is the consolidated invoice:
```json
{
  "invoice_id": "INV-2024-001",
  "customer": "Acme Corp",
  "invoice_date": "2024-06-15",
  "total": 250.75,
  "items": [
    {"description": "Product A", "quantity": 2, "price": 100.00},
    {"description": "Service Fee", "quantity": 1, "price": 50.75},
    {"description": "Shipping", "quantity": "1", "price": "0"}
  ]
}
```"#;

fn logged_in(app: &edgequake_invoice2sql::InvoiceApp, user: &str, password: &str) -> Session {
    let mut session = Session::new();
    app.login(&mut session, user, password).unwrap();
    session
}

#[tokio::test]
async fn two_pages_become_one_invoice() {
    let generator = ScriptedGenerator::new([TWO_PAGE_REPLY]);
    let (_dir, app) = workspace(generator.clone(), false);
    let mut session = logged_in(&app, "admin", "admin123");

    let staged = app
        .stage_uploads(
            &mut session,
            vec![png_upload("page1.png", 10), png_upload("page2.png", 200)],
        )
        .await
        .unwrap();
    assert_eq!(staged.pages, 2);
    assert!(staged.issues.is_empty());
    assert_eq!(session.staged_pages[0].source, "page1.png");
    assert_eq!(session.staged_pages[1].source, "page2.png");

    app.extract(&mut session, "Dates are day-first").await.unwrap();
    {
        let requests = generator.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].images.len(), 2);
        assert_eq!(requests[0].prompt, "Dates are day-first");
        assert_eq!(requests[0].system.as_deref(), Some(EXTRACTION_SYSTEM_PROMPT));
    }

    let preview = app.preview(&session).unwrap();
    assert_eq!(preview.items.len(), 3);

    let pending = app.request_insert(&mut session).unwrap();
    assert_eq!(session.stage(), WorkspaceStage::ConfirmationPending);
    assert_eq!(pending.invoice_id, "INV-2024-001");

    let stored = app.confirm_insert(&mut session).unwrap();
    assert_eq!(stored.items.len(), 3);
    assert_eq!(session.stage(), WorkspaceStage::Idle);
    assert!(session.staged_pages.is_empty());

    let (header, items) = app
        .invoice_details(&session, "INV-2024-001")
        .unwrap()
        .unwrap();
    assert_eq!(header.customer.as_deref(), Some("Acme Corp"));
    assert_eq!(header.total, Some(250.75));
    assert_eq!(header.created_by, "admin");
    assert_eq!(items.len(), 3);
    assert!(items.contains(&LineItem {
        description: Some("Shipping".into()),
        quantity: Some(1.0),
        price: Some(0.0),
    }));

    let counts = app
        .store()
        .run_read_only(
            "SELECT (SELECT COUNT(*) FROM invoice_master), (SELECT COUNT(*) FROM invoice_items)",
        )
        .unwrap();
    assert_eq!(counts.rows[0], vec![Value::from(1), Value::from(3)]);

    let log = app.audit_log(&session).unwrap();
    assert_eq!(log[0].action, "Inserted invoice data");
    assert_eq!(log[0].details, "Invoice ID: INV-2024-001");
    assert_eq!(log[1].action, "Extracted multi-page invoice data");
    assert_eq!(log[1].details, "Pages processed: 2");
}

#[tokio::test]
async fn bad_files_do_not_sink_the_batch() {
    let generator = ScriptedGenerator::new(Vec::<String>::new());
    let (_dir, app) = workspace(generator, false);
    let mut session = logged_in(&app, "admin", "admin123");

    let staged = app
        .stage_uploads(
            &mut session,
            vec![
                UploadedFile::new("notes.txt", "text/plain", b"hello".to_vec()),
                UploadedFile::new("broken.png", "image/png", vec![0x89, 0x50, 0x00]),
                png_upload("good.png", 128),
            ],
        )
        .await
        .unwrap();

    assert_eq!(staged.pages, 1);
    assert_eq!(session.staged_pages[0].source, "good.png");
    assert_eq!(staged.issues.len(), 2);
    assert_eq!(
        staged.issues[0],
        UploadIssue::UnsupportedType {
            file: "notes.txt".into(),
            mime_type: "text/plain".into(),
        }
    );
    assert!(matches!(staged.issues[1], UploadIssue::ImageFailed { .. }));
}

#[tokio::test]
async fn new_upload_replaces_the_last_batch() {
    let generator = ScriptedGenerator::new([r#"{"invoice_id": "A"}"#]);
    let (_dir, app) = workspace(generator, false);
    let mut session = logged_in(&app, "admin", "admin123");

    app.stage_uploads(&mut session, vec![png_upload("a.png", 1), png_upload("b.png", 2)])
        .await
        .unwrap();
    app.extract(&mut session, "").await.unwrap();

    app.stage_uploads(&mut session, vec![png_upload("c.png", 3)])
        .await
        .unwrap();
    assert_eq!(session.staged_pages.len(), 1);
    assert_eq!(session.stage(), WorkspaceStage::ImagesStaged);
}

#[tokio::test]
async fn rejected_upload_keeps_the_edited_reply() {
    let generator = ScriptedGenerator::new([r#"{"invoice_id": "E-1"}"#]);
    let (_dir, app) = workspace(generator, false);
    let mut session = logged_in(&app, "admin", "admin123");

    app.stage_uploads(&mut session, vec![png_upload("scan.png", 1)])
        .await
        .unwrap();
    app.extract(&mut session, "").await.unwrap();
    app.edit_response(&mut session, r#"{"invoice_id": "E-1-fixed"}"#)
        .unwrap();

    let staged = app
        .stage_uploads(
            &mut session,
            vec![UploadedFile::new("notes.txt", "text/plain", b"hello".to_vec())],
        )
        .await
        .unwrap();
    assert_eq!(staged.pages, 0);
    assert!(matches!(
        staged.issues.as_slice(),
        [UploadIssue::UnsupportedType { file, .. }] if file == "notes.txt"
    ));

    assert_eq!(session.stage(), WorkspaceStage::Edited);
    assert_eq!(session.staged_pages.len(), 1);
    assert_eq!(session.raw_response.as_deref(), Some(r#"{"invoice_id": "E-1-fixed"}"#));
}

#[tokio::test]
async fn duplicate_invoice_keeps_the_workspace() {
    let reply = r#"{"invoice_id": "INV-7", "customer": "Beta", "items": [{"description": "X", "quantity": 1, "price": 9}]}"#;
    let generator = ScriptedGenerator::new([reply, reply]);
    let (_dir, app) = workspace(generator, false);
    let mut session = logged_in(&app, "admin", "admin123");

    for round in 0..2 {
        app.stage_uploads(&mut session, vec![png_upload("scan.png", 50)])
            .await
            .unwrap();
        app.extract(&mut session, "").await.unwrap();
        app.request_insert(&mut session).unwrap();

        let outcome = app.confirm_insert(&mut session);
        if round == 0 {
            outcome.unwrap();
        } else {
            let err = outcome.unwrap_err();
            assert!(matches!(err, InvoiceError::DuplicateInvoice { .. }));
            assert_eq!(session.stage(), WorkspaceStage::Extracted);
            assert_eq!(session.staged_pages.len(), 1);
            assert!(session.raw_response.is_some());
        }
    }

    let (_, items) = app.invoice_details(&session, "INV-7").unwrap().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(app.search_invoices(&session, &InvoiceFilter::All).unwrap().len(), 1);
}

#[tokio::test]
async fn model_failure_leaves_state_unchanged() {
    let generator = ScriptedGenerator::new(Vec::<String>::new());
    generator.push_failure("503 Service Unavailable");
    let (_dir, app) = workspace(generator.clone(), false);
    let mut session = logged_in(&app, "admin", "admin123");

    app.stage_uploads(&mut session, vec![png_upload("scan.png", 1)])
        .await
        .unwrap();
    let err = app.extract(&mut session, "").await.unwrap_err();
    assert!(matches!(err, InvoiceError::LlmApiError { .. }));
    assert_eq!(session.stage(), WorkspaceStage::ImagesStaged);
    assert_eq!(generator.request_count(), 1);

    let actions: Vec<String> = app
        .audit_log(&session)
        .unwrap()
        .into_iter()
        .map(|e| e.action)
        .collect();
    assert!(!actions.iter().any(|a| a.starts_with("Extracted")));
}

#[tokio::test]
async fn regular_users_extract_but_cannot_edit() {
    let reply = r#"{"invoice_id": "U-1", "items": []}"#;
    let generator = ScriptedGenerator::new([reply]);
    let (_dir, app) = workspace(generator, false);
    let admin = logged_in(&app, "admin", "admin123");
    app.add_user(&admin, "clerk", "s3cret", false).unwrap();

    let mut clerk = logged_in(&app, "clerk", "s3cret");
    app.stage_uploads(&mut clerk, vec![png_upload("scan.png", 1)])
        .await
        .unwrap();
    app.extract(&mut clerk, "").await.unwrap();

    assert!(matches!(
        app.edit_response(&mut clerk, r#"{"invoice_id": "HACK"}"#),
        Err(InvoiceError::AdminRequired)
    ));
    assert!(matches!(
        app.navigate(&mut clerk, Screen::UserAdmin),
        Err(InvoiceError::AdminRequired)
    ));

    app.request_insert(&mut clerk).unwrap();
    app.confirm_insert(&mut clerk).unwrap();
    let (header, _) = app.invoice_details(&clerk, "U-1").unwrap().unwrap();
    assert_eq!(header.created_by, "clerk");
}

#[tokio::test]
async fn missing_invoice_id_cannot_be_stored() {
    let generator = ScriptedGenerator::new([r#"{"customer": "Nobody", "items": []}"#]);
    let (_dir, app) = workspace(generator, false);
    let mut session = logged_in(&app, "admin", "admin123");

    app.stage_uploads(&mut session, vec![png_upload("scan.png", 1)])
        .await
        .unwrap();
    app.extract(&mut session, "").await.unwrap();
    assert!(matches!(
        app.request_insert(&mut session),
        Err(InvoiceError::MissingField { field: "invoice_id" })
    ));
    assert_eq!(session.stage(), WorkspaceStage::Extracted);
}

#[tokio::test]
async fn customers_question_lists_stored_customers() {
    let generator = ScriptedGenerator::new([
        r#"{"invoice_id": "A-1", "customer": "Acme"}"#,
        r#"{"invoice_id": "B-1", "customer": "Beta"}"#,
        "```sql\nSELECT customer FROM invoice_master ORDER BY customer;\n```",
    ]);
    let (_dir, app) = workspace(generator.clone(), true);
    let mut session = logged_in(&app, "admin", "admin123");

    for _ in 0..2 {
        app.stage_uploads(&mut session, vec![png_upload("scan.png", 1)])
            .await
            .unwrap();
        app.extract(&mut session, "").await.unwrap();
        app.request_insert(&mut session).unwrap();
        app.confirm_insert(&mut session).unwrap();
    }

    let (sql, result) = app.ask(&session, "List all customers").await.unwrap();
    assert!(sql.to_lowercase().contains("select customer from invoice_master"));
    assert_eq!(result.columns, vec!["customer"]);
    assert_eq!(
        result.rows,
        vec![vec![Value::from("Acme")], vec![Value::from("Beta")]]
    );

    let requests = generator.requests.lock().unwrap();
    let last = requests.last().unwrap();
    assert!(last.images.is_empty());
    assert!(last.prompt.contains("List all customers"));
}
