//! Fallback backend: a minimal flowed-document generator on top of lopdf.
//!
//! Walks the page blocks in order. For each block it sets the paragraphs in
//! base-14 Helvetica, word-wrapped to the content width, then places every
//! image scaled to fit. When the next line or image does not fit, a new
//! output page begins. By default every block also starts on a fresh page,
//! so simple documents keep one block per page; long blocks spill over.
//!
//! Images: JPEG assets with one or three colour components are embedded
//! as-is (`DCTDecode`). Everything else, CMYK and YCCK JPEGs included, is
//! decoded, flattened onto white, and stored as Flate-compressed `DeviceRGB`.

use crate::config::ConversionConfig;
use crate::document::{DocumentLayout, ImageAsset, ImageEncoding, PageBlock};
use crate::output::AttemptOutcome;
use crate::pipeline::encode;
use crate::render::{helvetica, RenderBackend};
use futures::future::BoxFuture;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use thiserror::Error;
use tracing::debug;

/// CSS reference pixel → PDF point.
const PX_TO_PT: f32 = 72.0 / 96.0;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("PDF object error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("write error: {0}")]
    Io(#[from] std::io::Error),
}

/// Page geometry and typography for the flowed generator.
#[derive(Debug, Clone)]
pub struct FlowOptions {
    pub page_width: f32,
    pub page_height: f32,
    pub margin: f32,
    pub font_size: f32,
    /// Baseline-to-baseline distance as a multiple of `font_size`.
    pub line_spacing: f32,
    pub paragraph_gap: f32,
    pub image_gap: f32,
    pub break_between_blocks: bool,
    pub title: String,
}

impl Default for FlowOptions {
    fn default() -> Self {
        Self::from_config(&ConversionConfig::default())
    }
}

impl FlowOptions {
    pub fn from_config(config: &ConversionConfig) -> Self {
        let (page_width, page_height) = config.page_size.dimensions_pt();
        Self {
            page_width,
            page_height,
            margin: config.margin_pt(),
            font_size: config.font_size_pt,
            line_spacing: 1.3,
            paragraph_gap: config.font_size_pt * 0.6,
            image_gap: 6.0,
            break_between_blocks: config.break_between_blocks,
            title: config
                .title
                .clone()
                .unwrap_or_else(|| crate::DEFAULT_TITLE.to_string()),
        }
    }

    fn content_width(&self) -> f32 {
        self.page_width - 2.0 * self.margin
    }

    fn content_height(&self) -> f32 {
        self.page_height - 2.0 * self.margin
    }
}

/// The lopdf-based fallback renderer.
pub struct FlowBackend {
    options: FlowOptions,
}

impl FlowBackend {
    pub fn new(options: FlowOptions) -> Self {
        Self { options }
    }
}

impl RenderBackend for FlowBackend {
    fn name(&self) -> &'static str {
        "flow"
    }

    fn render<'a>(&'a self, layout: &'a DocumentLayout) -> BoxFuture<'a, AttemptOutcome> {
        Box::pin(async move {
            // Layout and image decoding are CPU-bound.
            let layout = layout.clone();
            let options = self.options.clone();
            match tokio::task::spawn_blocking(move || render_flow(&layout, &options)).await {
                Ok(Ok(bytes)) => AttemptOutcome::Rendered(bytes),
                Ok(Err(e)) => AttemptOutcome::Failed(e.to_string()),
                Err(e) => AttemptOutcome::Failed(format!("render task panicked: {e}")),
            }
        })
    }
}

/// Render a layout to PDF bytes synchronously.
pub fn render_flow(layout: &DocumentLayout, options: &FlowOptions) -> Result<Vec<u8>, FlowError> {
    let mut writer = FlowWriter::new(options);
    writer.start_page()?;

    for (i, block) in layout.blocks.iter().enumerate() {
        if i > 0 {
            if options.break_between_blocks {
                writer.start_page()?;
            } else {
                writer.gap(options.paragraph_gap);
            }
        }
        writer.write_block(block)?;
    }

    writer.finish()
}

struct FlowWriter<'o> {
    options: &'o FlowOptions,
    doc: Document,
    pages_id: ObjectId,
    font_id: ObjectId,
    page_ids: Vec<ObjectId>,
    ops: Vec<Operation>,
    xobjects: Dictionary,
    /// Distance from the bottom edge to the top of the free area.
    cursor: f32,
    /// Nothing placed on the current page yet.
    fresh: bool,
    open: bool,
    image_count: usize,
}

impl<'o> FlowWriter<'o> {
    fn new(options: &'o FlowOptions) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        Self {
            options,
            doc,
            pages_id,
            font_id,
            page_ids: Vec::new(),
            ops: Vec::new(),
            xobjects: Dictionary::new(),
            cursor: options.page_height - options.margin,
            fresh: true,
            open: false,
            image_count: 0,
        }
    }

    fn bottom(&self) -> f32 {
        self.options.margin
    }

    fn start_page(&mut self) -> Result<(), FlowError> {
        if self.open {
            self.flush_page()?;
        }
        self.open = true;
        self.fresh = true;
        self.cursor = self.options.page_height - self.options.margin;
        Ok(())
    }

    fn flush_page(&mut self) -> Result<(), FlowError> {
        let content = Content {
            operations: std::mem::take(&mut self.ops),
        };
        let mut stream = Stream::new(dictionary! {}, content.encode()?);
        stream.compress()?;
        let content_id = self.doc.add_object(stream);

        let resources = dictionary! {
            "Font" => dictionary! { "F1" => self.font_id },
            "XObject" => std::mem::take(&mut self.xobjects),
        };
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0.into(), 0.into(), self.options.page_width.into(), self.options.page_height.into()],
            "Contents" => content_id,
            "Resources" => resources,
        });
        self.page_ids.push(page_id);
        self.open = false;
        Ok(())
    }

    fn gap(&mut self, amount: f32) {
        if !self.fresh {
            self.cursor -= amount;
        }
    }

    /// Make room for `height`, starting a new page if needed.
    fn reserve(&mut self, height: f32) -> Result<(), FlowError> {
        if self.cursor - height < self.bottom() && !self.fresh {
            self.start_page()?;
        }
        Ok(())
    }

    fn write_block(&mut self, block: &PageBlock) -> Result<(), FlowError> {
        let size = self.options.font_size;
        let leading = size * self.options.line_spacing;
        let width = self.options.content_width();

        for (p, paragraph) in block.paragraphs.iter().enumerate() {
            if p > 0 {
                self.gap(self.options.paragraph_gap);
            }
            for line in &paragraph.lines {
                for wrapped in helvetica::wrap(line, size, width) {
                    self.reserve(leading)?;
                    let baseline = self.cursor - size;
                    self.text_line(&wrapped, self.options.margin, baseline);
                    self.cursor -= leading;
                    self.fresh = false;
                }
            }
        }

        for image in &block.images {
            self.gap(self.options.image_gap);
            self.image(image)?;
        }
        Ok(())
    }

    fn text_line(&mut self, text: &str, x: f32, y: f32) {
        self.ops.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), self.options.font_size.into()]),
            Operation::new("Td", vec![x.into(), y.into()]),
            Operation::new(
                "Tj",
                vec![Object::String(helvetica::encode(text), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ]);
    }

    fn image(&mut self, asset: &ImageAsset) -> Result<(), FlowError> {
        let (w, h) = fit(
            asset.width() as f32 * PX_TO_PT,
            asset.height() as f32 * PX_TO_PT,
            self.options.content_width(),
            self.options.content_height(),
        );
        self.reserve(h)?;

        let stream = image_stream(asset)?;
        let xobject_id = self.doc.add_object(stream);
        self.image_count += 1;
        let name = format!("Im{}", self.image_count);
        self.xobjects.set(name.as_bytes(), xobject_id);

        let y = self.cursor - h;
        self.ops.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![w.into(), 0.into(), 0.into(), h.into(), self.options.margin.into(), y.into()],
            ),
            Operation::new("Do", vec![Object::Name(name.into_bytes())]),
            Operation::new("Q", vec![]),
        ]);
        self.cursor = y;
        self.fresh = false;
        debug!("Placed image {} at {:.1}x{:.1}pt", self.image_count, w, h);
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<u8>, FlowError> {
        if self.open {
            self.flush_page()?;
        }

        let kids: Vec<Object> = self.page_ids.iter().map(|id| Object::Reference(*id)).collect();
        let count = kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        let info_id = self.doc.add_object(dictionary! {
            "Title" => Object::String(helvetica::encode(&self.options.title), StringFormat::Literal),
            "Producer" => Object::string_literal("smartreader"),
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.trailer.set("Info", info_id);

        let mut buf = Vec::new();
        self.doc.save_to(&mut buf)?;
        debug!("Flow renderer wrote {} pages, {} bytes", self.page_ids.len(), buf.len());
        Ok(buf)
    }
}

/// Scale `(w, h)` down to fit `(max_w, max_h)`, keeping the aspect ratio.
/// Never scales up.
fn fit(w: f32, h: f32, max_w: f32, max_h: f32) -> (f32, f32) {
    if w <= 0.0 || h <= 0.0 {
        return (1.0, 1.0);
    }
    let scale = (max_w / w).min(max_h / h).min(1.0);
    (w * scale, h * scale)
}

fn image_stream(asset: &ImageAsset) -> Result<Stream, FlowError> {
    if asset.encoding() == ImageEncoding::Jpeg {
        // The decoder reports CMYK as RGB, so go by the frame header.
        let space = match jpeg_components(asset.bytes()) {
            Some(3) => Some("DeviceRGB"),
            Some(1) => Some("DeviceGray"),
            _ => None,
        };
        if let Some(space) = space {
            let dict = dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(asset.width()),
                "Height" => i64::from(asset.height()),
                "ColorSpace" => space,
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            };
            return Ok(Stream::new(dict, asset.bytes().to_vec()).with_compression(false));
        }
    }

    let rgb = encode::decode_flattened(asset)?;
    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(rgb.width()),
        "Height" => i64::from(rgb.height()),
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
    };
    let mut stream = Stream::new(dict, rgb.into_raw());
    stream.compress()?;
    Ok(stream)
}

/// Number of colour components declared in a JPEG's start-of-frame header.
fn jpeg_components(bytes: &[u8]) -> Option<u8> {
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return None;
    }
    let mut pos = 2;
    while pos + 1 < bytes.len() {
        if bytes[pos] != 0xFF {
            return None;
        }
        let marker = bytes[pos + 1];
        match marker {
            // fill byte
            0xFF => {
                pos += 1;
                continue;
            }
            // standalone markers carry no length
            0x01 | 0xD0..=0xD7 => {
                pos += 2;
                continue;
            }
            // start of scan: no frame header seen
            0xDA | 0xD9 => return None,
            _ => {}
        }
        let len = usize::from(u16::from_be_bytes([*bytes.get(pos + 2)?, *bytes.get(pos + 3)?]));
        let is_frame = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_frame {
            // length(2) precision(1) height(2) width(2) components(1)
            return bytes.get(pos + 9).copied();
        }
        pos += 2 + len;
    }
    None
}
