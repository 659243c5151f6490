//! Content extraction: source bytes → ordered [`Page`] records.
//!
//! Two extractors share the [`Extractor`] contract:
//!
//! * [`PdfExtractor`]: opens the buffer with pdfium and, page by page,
//!   collects the plain text (line breaks kept as `'\n'`) followed by every
//!   image object in the page's object order, re-encoded as PNG. Images
//!   drawn through form XObjects are collected in place.
//! * [`ImageExtractor`]: wraps the whole upload as a single synthetic page
//!   with no text and one image.
//!
//! Both are synchronous and CPU-bound; the orchestrator runs them under
//! `spawn_blocking`. Neither keeps a reference into the source buffer once
//! `extract` returns.

use crate::capabilities::{Availability, Capabilities, PdfiumLibrary};
use crate::config::ConversionConfig;
use crate::document::{ImageAsset, Page, SourceDocument, SourceFormat};
use crate::error::{ReconstructError, Stage};
use crate::pipeline::encode;
use pdfium_render::prelude::*;
use tracing::{debug, info, warn};

/// Turns a [`SourceDocument`] into pages.
pub trait Extractor: Send + Sync {
    fn extract(&self, source: &SourceDocument) -> Result<Vec<Page>, ReconstructError>;
}

/// Pick the extractor for a classified source.
pub fn extractor_for(
    format: SourceFormat,
    capabilities: &Capabilities,
    config: &ConversionConfig,
) -> Box<dyn Extractor> {
    match format {
        SourceFormat::Pdf => Box::new(PdfExtractor {
            library: capabilities.pdf_reader.clone(),
            password: config.password.clone(),
        }),
        SourceFormat::Image => Box::new(ImageExtractor),
    }
}

// ── PDF ──────────────────────────────────────────────────────────────────

/// pdfium-backed extractor.
pub struct PdfExtractor {
    library: Availability<PdfiumLibrary>,
    password: Option<String>,
}

impl PdfExtractor {
    pub fn new(library: Availability<PdfiumLibrary>, password: Option<String>) -> Self {
        Self { library, password }
    }
}

impl Extractor for PdfExtractor {
    fn extract(&self, source: &SourceDocument) -> Result<Vec<Page>, ReconstructError> {
        let library = match &self.library {
            Availability::Available(lib) => lib,
            Availability::Unavailable(reason) => {
                return Err(ReconstructError::internal(
                    Stage::Extract,
                    format!("PDF reader unavailable: {reason}"),
                ))
            }
        };
        let pdfium = library
            .bind()
            .map_err(|e| ReconstructError::internal(Stage::Extract, format!("pdfium bind failed: {e}")))?;

        let document = pdfium
            .load_pdf_from_byte_slice(source.bytes(), self.password.as_deref())
            .map_err(|e| {
                let err_str = format!("{:?}", e);
                if err_str.contains("Password") || err_str.contains("password") {
                    ReconstructError::PasswordRequired
                } else {
                    ReconstructError::MalformedDocument { detail: err_str }
                }
            })?;

        let pages = document.pages();
        info!("PDF loaded: {} pages", pages.len());

        let mut out = Vec::with_capacity(pages.len() as usize);
        for (index, page) in pages.iter().enumerate() {
            let text = match page.text() {
                Ok(text) => normalize_line_breaks(&text.all()),
                Err(e) => {
                    warn!("Page {}: no text layer ({:?})", index + 1, e);
                    String::new()
                }
            };

            let mut images = Vec::new();
            for object in page.objects().iter() {
                collect_images(&object, index + 1, 0, &mut images);
            }

            debug!(
                "Page {}: {} chars, {} images",
                index + 1,
                text.len(),
                images.len()
            );
            out.push(Page { index, text, images });
        }

        Ok(out)
    }
}

/// Form XObjects nested deeper than this are ignored.
const MAX_FORM_DEPTH: usize = 16;

/// Append the images drawn by `object`, descending into form XObjects.
fn collect_images(object: &PdfPageObject<'_>, page_no: usize, depth: usize, out: &mut Vec<ImageAsset>) {
    if let Some(image_object) = object.as_image_object() {
        let decoded = match image_object.get_raw_image() {
            Ok(img) => img,
            Err(e) => {
                warn!("Page {}: skipping undecodable image ({:?})", page_no, e);
                return;
            }
        };
        match encode::encode_png(&decoded) {
            Ok(asset) => out.push(asset),
            Err(e) => warn!("Page {}: skipping image, PNG encoding failed: {}", page_no, e),
        }
        return;
    }

    let Some(form) = object.as_x_object_form_object() else {
        return;
    };
    if depth >= MAX_FORM_DEPTH {
        warn!("Page {}: form XObjects nested too deeply, skipping", page_no);
        return;
    }
    for i in 0..form.len() {
        match form.get(i) {
            Ok(child) => collect_images(&child, page_no, depth + 1, out),
            Err(e) => warn!("Page {}: unreadable form object {} ({:?})", page_no, i, e),
        }
    }
}

/// CRLF and lone CR become `'\n'`, the pipeline's line-break marker.
pub fn normalize_line_breaks(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Image ────────────────────────────────────────────────────────────────

/// Treats the whole upload as one image.
pub struct ImageExtractor;

impl Extractor for ImageExtractor {
    fn extract(&self, source: &SourceDocument) -> Result<Vec<Page>, ReconstructError> {
        let asset = encode::asset_from_upload(source.bytes()).map_err(|e| {
            ReconstructError::UnsupportedImage {
                detail: e.to_string(),
            }
        })?;
        info!(
            "Image loaded: {}x{} {:?}",
            asset.width(),
            asset.height(),
            asset.encoding()
        );
        Ok(vec![Page {
            index: 0,
            text: String::new(),
            images: vec![asset],
        }])
    }
}
