//! # smartreader
//!
//! Rebuild a clean, reflowed PDF from an uploaded PDF or image.
//!
//! ## Why this crate?
//!
//! Scanned handouts, phone photos of pages, and PDFs produced by odd tools
//! are hard to read on small screens and hard to re-print. This crate pulls
//! the text and images out of the upload, regroups the text into paragraphs,
//! and renders a fresh document. The primary renderer prints generated HTML
//! with a headless Chromium-family browser; when none is installed, or it
//! fails, a pure-Rust generator built on lopdf produces the PDF instead.
//!
//! ## Pipeline Overview
//!
//! ```text
//! bytes (+ filename hint)
//!  │
//!  ├─ 1. Classify  filename suffix, then %PDF magic; otherwise an image
//!  ├─ 2. Extract   pdfium (text + image objects) or image decode (spawn_blocking)
//!  ├─ 3. Assemble  text cleanup, paragraphs, one block per page
//!  └─ 4. Render    chromium ──✗──▶ flow (lopdf) ──✗──▶ NoRendererAvailable
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use smartreader::{ConversionConfig, Converter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let converter = Converter::new(ConversionConfig::default())?;
//!     let bytes = std::fs::read("handout.pdf")?;
//!     let output = converter
//!         .convert(smartreader::SourceDocument::new(bytes, Some("handout.pdf")))
//!         .await?;
//!     std::fs::write("reconstructed_handout.pdf", &output.pdf)?;
//!     eprintln!("rendered by {}", output.stats.backend);
//!     Ok(())
//! }
//! ```
//!
//! ## External engines
//!
//! | Engine | Needed for | Found via |
//! |--------|------------|-----------|
//! | pdfium shared library | PDF input | `pdfium_library_path`, `PDFIUM_DYNAMIC_LIB_PATH`, or the system loader |
//! | Chromium / Chrome / Edge | primary renderer | `chromium_path`, `SMARTREADER_CHROMIUM`, or `PATH` |
//!
//! Image input and the fallback renderer need neither.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `smartreader` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! smartreader = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod capabilities;
pub mod config;
pub mod convert;
pub mod document;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod render;

/// Title written into output documents when the config does not set one.
pub const DEFAULT_TITLE: &str = "Reconstructed Document";

// ── Re-exports ───────────────────────────────────────────────────────────

pub use capabilities::{Availability, Capabilities, PdfiumLibrary};
pub use config::{ConversionConfig, ConversionConfigBuilder, PageSize};
pub use convert::{convert_file, process_sync, Converter};
pub use document::{
    DocumentLayout, ImageAsset, ImageEncoding, Page, PageBlock, Paragraph, SourceDocument,
    SourceFormat,
};
pub use error::{ErrorKind, ErrorReport, ReconstructError, Stage};
pub use output::{
    AttemptOutcome, AttemptRecord, AttemptStatus, ConversionOutput, ConversionStats, RenderedPdf,
};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use render::{RenderBackend, RenderChain};
