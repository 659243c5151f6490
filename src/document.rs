//! Data model shared by every pipeline stage.
//!
//! ```text
//! SourceDocument ──extract──▶ Vec<Page> ──assemble──▶ DocumentLayout ──render──▶ PDF bytes
//! ```
//!
//! [`DocumentLayout`] is the only thing a renderer ever sees. It carries no
//! renderer-specific fields, so backends can be swapped without touching
//! extraction.

use serde::{Deserialize, Serialize};

/// The raw upload: bytes plus an optional filename hint.
///
/// Immutable once constructed; the pipeline only ever borrows it.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    bytes: Vec<u8>,
    filename: Option<String>,
}

impl SourceDocument {
    pub fn new(bytes: impl Into<Vec<u8>>, filename: Option<&str>) -> Self {
        Self {
            bytes: bytes.into(),
            filename: filename.map(str::to_owned),
        }
    }

    /// A document with no filename hint.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            filename: None,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// What the classifier decided the upload is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Pdf,
    Image,
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceFormat::Pdf => f.write_str("pdf"),
            SourceFormat::Image => f.write_str("image"),
        }
    }
}

/// Still-image encodings an [`ImageAsset`] may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageEncoding {
    Png,
    Jpeg,
}

impl ImageEncoding {
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageEncoding::Png => "image/png",
            ImageEncoding::Jpeg => "image/jpeg",
        }
    }
}

/// An encoded still image owned by a [`Page`].
///
/// Created once by an extractor and never mutated afterwards. Only a
/// renderer whose target format requires it decodes the bytes again.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub(crate) encoding: ImageEncoding,
    pub(crate) bytes: Vec<u8>,
    pub(crate) width: u32,
    pub(crate) height: u32,
}

impl ImageAsset {
    pub fn encoding(&self) -> ImageEncoding {
        self.encoding
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Pixel width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Pixel height.
    pub fn height(&self) -> u32 {
        self.height
    }
}

impl std::fmt::Debug for ImageAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageAsset")
            .field("encoding", &self.encoding)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// One source page as extracted.
///
/// `text` uses `'\n'` as an explicit line-break marker and may be empty.
/// Images keep the order in which the source referenced them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    /// 0-based position in the source.
    pub index: usize,
    pub text: String,
    pub images: Vec<ImageAsset>,
}

impl Page {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty() && self.images.is_empty()
    }
}

/// A run of lines that belong together. Lines keep the source's breaks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paragraph {
    pub lines: Vec<String>,
}

/// One logical output page: text first, then images in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageBlock {
    pub paragraphs: Vec<Paragraph>,
    pub images: Vec<ImageAsset>,
}

impl PageBlock {
    pub fn has_text(&self) -> bool {
        !self.paragraphs.is_empty()
    }

    /// Plain text of the block, paragraphs separated by a blank line.
    pub fn plain_text(&self) -> String {
        self.paragraphs
            .iter()
            .map(|p| p.lines.join("\n"))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// The renderer-agnostic intermediate representation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentLayout {
    pub blocks: Vec<PageBlock>,
}

impl DocumentLayout {
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn image_count(&self) -> usize {
        self.blocks.iter().map(|b| b.images.len()).sum()
    }
}
