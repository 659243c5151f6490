//! Pipeline stages for document reconstruction.
//!
//! Each submodule implements one transformation step and is testable on its
//! own. Rendering lives in [`crate::render`] because it has several
//! interchangeable backends.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ classify ──▶ extract ──▶ assemble ──▶ render
//! (file)    (pdf/image)  (pages)     (layout)     (chain)
//! ```
//!
//! 1. [`input`]: read a local file into a [`crate::SourceDocument`]
//! 2. [`classify`]: filename hint first, then `%PDF` magic; anything else is
//!    treated as an image
//! 3. [`extract`]: per-page text and images; pdfium for PDFs, the `image`
//!    crate for raster uploads. Blocking, so run via `spawn_blocking`
//! 4. [`encode`]: normalise images to PNG/JPEG assets and data URIs
//! 5. [`assemble`]: text cleanup and paragraph grouping, one block per page

pub mod assemble;
pub mod classify;
pub mod encode;
pub mod extract;
pub mod input;
