//! Extraction pipeline stages.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and swapped without touching the others.
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ llm ──▶ normalize
//! (upload)  (pdfium)   (base64)   (VLM)   (JSON span)
//! ```
//!
//! 1. [`input`]    : read a file and decide its MIME type
//! 2. [`render`]   : one image per PDF page, images pass through; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`encode`]   : PNG-encode and base64-wrap each page
//! 4. [`llm`]      : one multimodal call carrying every page
//! 5. [`normalize`]: recover the JSON object from the reply text

pub mod encode;
pub mod input;
pub mod llm;
pub mod normalize;
pub mod render;
