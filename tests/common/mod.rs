//! Shared helpers for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use edgequake_invoice2sql::{
    AppConfig, GenerationRequest, InvoiceApp, InvoiceError, TextGenerator, UploadedFile,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Replays canned replies in order and keeps every request it saw.
#[derive(Default)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String, String>>>,
    pub requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new<I, S>(replies: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn push_failure(&self, message: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<String, InvoiceError> {
        self.requests.lock().unwrap().push(request);
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(InvoiceError::LlmApiError { message }),
            None => Err(InvoiceError::LlmApiError {
                message: "no scripted reply left".into(),
            }),
        }
    }
}

/// A workspace over a fresh database with `admin/admin123` seeded.
pub fn workspace(generator: Arc<ScriptedGenerator>, nl_query: bool) -> (TempDir, InvoiceApp) {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::builder()
        .database_path(dir.path().join("invoices.db"))
        .enable_nl_query(nl_query)
        .build()
        .unwrap();
    let app = InvoiceApp::new(config, generator).unwrap();
    (dir, app)
}

/// A small PNG upload, tinted so pages are distinguishable.
pub fn png_upload(name: &str, shade: u8) -> UploadedFile {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 12, Rgb([shade, shade, shade])));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    UploadedFile::new(name, "image/png", bytes)
}

/// Minimal valid PDF with `pages` blank 200×100 pt pages.
pub fn blank_pdf(pages: usize) -> Vec<u8> {
    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            (0..pages)
                .map(|i| format!("{} 0 R", i + 3))
                .collect::<Vec<_>>()
                .join(" "),
            pages
        ),
    ];
    for _ in 0..pages {
        objects.push("<< /Type /Page /Parent 2 0 R /MediaBox [0 0 200 100] >>".to_string());
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref_at = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for off in offsets {
        out.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_at
        )
        .as_bytes(),
    );
    out
}
