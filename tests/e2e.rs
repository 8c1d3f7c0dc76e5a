//! End-to-end tests through the real pdfium renderer.
//!
//! The model is still scripted, but PDFs are rasterised by pdfium, which is
//! downloaded on first use. Gated behind `E2E_ENABLED` so CI does not need
//! the library or network access.
//!
//! Run with:
//!   E2E_ENABLED=1 cargo test --test e2e -- --nocapture

mod common;

use common::{blank_pdf, png_upload, workspace, ScriptedGenerator};
use edgequake_invoice2sql::{Session, UploadIssue, UploadedFile};

macro_rules! e2e_skip_unless_enabled {
    () => {
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
    };
}

#[tokio::test(flavor = "multi_thread")]
async fn two_page_pdf_to_database() {
    e2e_skip_unless_enabled!();

    let generator = ScriptedGenerator::new([r#"{
        "invoice_id": "PDF-1",
        "customer": "Acme",
        "invoice_date": "2024-01-31",
        "total": 30.0,
        "items": [
            {"description": "From page one", "quantity": 1, "price": 10.0},
            {"description": "Also page one", "quantity": 1, "price": 5.0},
            {"description": "From page two", "quantity": 3, "price": 5.0}
        ]
    }"#]);
    let (_dir, app) = workspace(generator.clone(), false);
    let mut session = Session::new();
    app.login(&mut session, "admin", "admin123").unwrap();

    let staged = app
        .stage_uploads(
            &mut session,
            vec![UploadedFile::new("invoice.pdf", "application/pdf", blank_pdf(2))],
        )
        .await
        .unwrap();
    assert!(staged.issues.is_empty(), "{:?}", staged.issues);
    assert_eq!(staged.pages, 2);
    assert_eq!(session.staged_pages[0].page_num, 1);
    assert_eq!(session.staged_pages[1].page_num, 2);

    // 200 pt wide at 300 DPI.
    let width = session.staged_pages[0].image.width();
    assert!((830..=836).contains(&width), "width {width}");

    app.extract(&mut session, "").await.unwrap();
    assert_eq!(generator.requests.lock().unwrap()[0].images.len(), 2);

    app.request_insert(&mut session).unwrap();
    app.confirm_insert(&mut session).unwrap();

    let (_, items) = app.invoice_details(&session, "PDF-1").unwrap().unwrap();
    assert_eq!(items.len(), 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn pdf_and_images_keep_upload_order() {
    e2e_skip_unless_enabled!();

    let (_dir, app) = workspace(ScriptedGenerator::new(Vec::<String>::new()), false);
    let mut session = Session::new();
    app.login(&mut session, "admin", "admin123").unwrap();

    app.stage_uploads(
        &mut session,
        vec![
            png_upload("cover.png", 10),
            UploadedFile::new("body.pdf", "application/pdf", blank_pdf(3)),
            png_upload("receipt.png", 20),
        ],
    )
    .await
    .unwrap();

    let order: Vec<(String, usize)> = session
        .staged_pages
        .iter()
        .map(|p| (p.source.clone(), p.page_num))
        .collect();
    assert_eq!(
        order,
        vec![
            ("cover.png".to_string(), 1),
            ("body.pdf".to_string(), 1),
            ("body.pdf".to_string(), 2),
            ("body.pdf".to_string(), 3),
            ("receipt.png".to_string(), 1),
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn corrupt_pdf_is_reported_per_file() {
    e2e_skip_unless_enabled!();

    let (_dir, app) = workspace(ScriptedGenerator::new(Vec::<String>::new()), false);
    let mut session = Session::new();
    app.login(&mut session, "admin", "admin123").unwrap();

    let staged = app
        .stage_uploads(
            &mut session,
            vec![
                UploadedFile::new("bad.pdf", "application/pdf", b"%PDF-1.4 garbage".to_vec()),
                png_upload("ok.png", 1),
            ],
        )
        .await
        .unwrap();

    assert_eq!(staged.pages, 1);
    assert!(matches!(
        staged.issues.as_slice(),
        [UploadIssue::PdfFailed { file, .. }] if file == "bad.pdf"
    ));
}
