//! Rasterisation: turn uploads into one `DynamicImage` per page.
//!
//! PDFs are rendered page by page through pdfium at a fixed scale
//! (`render_dpi / 72`, PDF user space being 72 units per inch). JPEG and PNG
//! uploads pass through as a single decoded image. Anything else is reported
//! as an [`UploadIssue`] and contributes no pages.
//!
//! ## Why spawn_blocking?
//!
//! pdfium uses thread-local state and is CPU-bound; rendering runs on the
//! blocking pool so the async runtime never stalls during a large scan.
//!
//! Files are independent: a corrupt PDF yields an issue for that file and
//! the batch continues with the next one, keeping upload order.

use crate::error::{InvoiceError, UploadIssue};
use crate::pipeline::input::{UploadedFile, MIME_JPEG, MIME_PDF, MIME_PNG};
use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::{debug, info, warn};

/// One rasterised page, tagged with where it came from.
#[derive(Debug, Clone)]
pub struct RasterPage {
    /// Upload file name.
    pub source: String,
    /// 1-indexed page within its source file.
    pub page_num: usize,
    pub image: DynamicImage,
}

/// Result of rasterising a batch of uploads.
#[derive(Debug, Clone, Default)]
pub struct RasterReport {
    /// Pages in upload order, then page order.
    pub pages: Vec<RasterPage>,
    /// Files that were skipped or failed.
    pub issues: Vec<UploadIssue>,
}

/// Rasterise every upload, concatenating pages in upload order.
///
/// Only a panic inside the blocking task is returned as an error; per-file
/// failures land in [`RasterReport::issues`].
pub async fn rasterize_uploads(
    files: Vec<UploadedFile>,
    scale: f32,
) -> Result<RasterReport, InvoiceError> {
    tokio::task::spawn_blocking(move || rasterize_blocking(&files, scale))
        .await
        .map_err(|e| InvoiceError::Internal(format!("Render task panicked: {}", e)))
}

/// Blocking implementation of [`rasterize_uploads`].
fn rasterize_blocking(files: &[UploadedFile], scale: f32) -> RasterReport {
    let mut report = RasterReport::default();
    // Bound lazily: an image-only batch never needs the pdfium library.
    let mut pdfium: Option<Result<Pdfium, String>> = None;

    for file in files {
        match file.mime_type.as_str() {
            MIME_PDF => {
                let engine = pdfium.get_or_insert_with(|| bind_pdfium().map_err(|e| e.to_string()));
                let rendered = match engine {
                    Ok(p) => render_pdf(p, &file.bytes, scale),
                    Err(detail) => Err(detail.clone()),
                };
                match rendered {
                    Ok(images) => {
                        info!("{}: rendered {} pages", file.name, images.len());
                        report
                            .pages
                            .extend(images.into_iter().enumerate().map(|(i, image)| RasterPage {
                                source: file.name.clone(),
                                page_num: i + 1,
                                image,
                            }));
                    }
                    Err(detail) => {
                        warn!("{}: PDF rendering failed: {}", file.name, detail);
                        report.issues.push(UploadIssue::PdfFailed {
                            file: file.name.clone(),
                            detail,
                        });
                    }
                }
            }
            MIME_JPEG | "image/jpg" | MIME_PNG => match image::load_from_memory(&file.bytes) {
                Ok(image) => {
                    debug!(
                        "{}: image {}x{} px",
                        file.name,
                        image.width(),
                        image.height()
                    );
                    report.pages.push(RasterPage {
                        source: file.name.clone(),
                        page_num: 1,
                        image,
                    });
                }
                Err(e) => {
                    warn!("{}: image decoding failed: {}", file.name, e);
                    report.issues.push(UploadIssue::ImageFailed {
                        file: file.name.clone(),
                        detail: e.to_string(),
                    });
                }
            },
            other => {
                warn!("Unsupported file type: {} ({})", other, file.name);
                report.issues.push(UploadIssue::UnsupportedType {
                    file: file.name.clone(),
                    mime_type: other.to_string(),
                });
            }
        }
    }

    report
}

/// Bind to the pdfium library, downloading it on first use.
pub fn bind_pdfium() -> Result<Pdfium, InvoiceError> {
    pdfium_auto::bind_pdfium_silent().map_err(|e| InvoiceError::PdfiumBindingFailed(e.to_string()))
}

/// Render every page of an in-memory PDF. All-or-nothing per document.
fn render_pdf(pdfium: &Pdfium, bytes: &[u8], scale: f32) -> Result<Vec<DynamicImage>, String> {
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| format!("{:?}", e))?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    debug!("PDF loaded: {} pages", total_pages);

    let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);
    let mut images = Vec::with_capacity(total_pages);

    for idx in 0..total_pages {
        let page = pages
            .get(idx as u16)
            .map_err(|e| format!("page {}: {:?}", idx + 1, e))?;

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| format!("page {}: {:?}", idx + 1, e))?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );
        images.push(image);
    }

    Ok(images)
}
