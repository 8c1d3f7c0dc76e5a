//! Image encoding: staged pages → base64 PNG `ImageData` for the model.
//!
//! PNG is lossless; JPEG artefacts around small digits (quantities, prices)
//! are exactly what makes totals come back wrong.

use crate::error::InvoiceError;
use crate::pipeline::render::RasterPage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode one image as a base64 PNG attachment.
pub fn encode_image(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded image → {} bytes base64", b64.len());

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}

/// Encode every staged page in order. The first failure aborts the batch,
/// since sending an invoice with a page missing would silently drop items.
pub fn encode_pages(pages: &[RasterPage]) -> Result<Vec<ImageData>, InvoiceError> {
    pages
        .iter()
        .enumerate()
        .map(|(i, page)| {
            encode_image(&page.image).map_err(|e| InvoiceError::EncodingFailed {
                page: i + 1,
                detail: e.to_string(),
            })
        })
        .collect()
}
