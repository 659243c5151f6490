//! End-to-end integration tests for smartreader.
//!
//! Image input and the built-in generator need nothing from the host, so
//! those cases always run. Cases that need the pdfium library or a
//! Chromium-family browser probe for it first and print `SKIP` when it is
//! missing.
//!
//! Run with a local pdfium:
//!   PDFIUM_DYNAMIC_LIB_PATH=/path/to/lib cargo test --test e2e -- --nocapture
//!
//! To restrict to a specific test:
//!   cargo test --test e2e pdf_pages_keep_their_order -- --nocapture

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use smartreader::{
    Capabilities, ConversionConfig, Converter, ErrorKind, SourceDocument, SourceFormat,
};
use std::io::Cursor;
use std::path::PathBuf;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn fallback_config() -> ConversionConfig {
    let mut builder = ConversionConfig::builder().disable_primary(true);
    if let Some(lib) = std::env::var_os("PDFIUM_DYNAMIC_LIB_PATH") {
        builder = builder.pdfium_library_path(PathBuf::from(lib));
    }
    builder.build().unwrap()
}

/// Skip this test unless the capability `$avail` is present.
macro_rules! skip_unless_available {
    ($avail:expr, $what:expr) => {{
        if !$avail.is_available() {
            println!("SKIP: {} not available on this host", $what);
            return;
        }
    }};
}

/// Build a simple PDF with one Helvetica line per page; `None` is a blank page.
fn text_pdf(pages: &[Option<&str>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for text in pages {
        let operations = match text {
            Some(t) => vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*t)]),
                Operation::new("ET", vec![]),
            ],
            None => vec![],
        };
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::from(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

/// Solid-colour raw RGB image XObject.
fn raw_image(width: i64, height: i64) -> Stream {
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width,
            "Height" => height,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        vec![90u8; (width * height * 3) as usize],
    )
}

/// One-page PDF drawing images of the given widths in order. With
/// `via_form`, the second image is drawn from inside a form XObject.
fn image_pdf(widths: &[i64], via_form: bool) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut xobjects = lopdf::Dictionary::new();
    let mut operations = Vec::new();
    for (i, &width) in widths.iter().enumerate() {
        let image_id = doc.add_object(raw_image(width, 10));
        let y = 700 - 60 * i as i64;
        let place = |name: &str| {
            vec![
                Operation::new("q", vec![]),
                Operation::new("cm", vec![(width * 2).into(), 0.into(), 0.into(), 20.into(), 72.into(), y.into()]),
                Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]),
                Operation::new("Q", vec![]),
            ]
        };

        if via_form && i == 1 {
            let inner = Content { operations: place("Inner") };
            let form_id = doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Form",
                    "BBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
                    "Resources" => dictionary! {
                        "XObject" => dictionary! { "Inner" => image_id },
                    },
                },
                inner.encode().unwrap(),
            ));
            xobjects.set("Fm1", form_id);
            operations.push(Operation::new("Do", vec![Object::Name(b"Fm1".to_vec())]));
        } else {
            let name = format!("Im{i}");
            xobjects.set(name.as_bytes(), image_id);
            operations.extend(place(&name));
        }
    }

    let content_id = doc.add_object(Stream::new(dictionary! {}, Content { operations }.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! { "XObject" => xobjects },
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::from(page_id)],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

fn encoded(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    buf
}

/// Assert the bytes are a complete PDF and return it parsed.
fn assert_pdf(bytes: &[u8], context: &str) -> Document {
    assert!(bytes.starts_with(b"%PDF-"), "[{context}] missing %PDF- header");
    let tail = &bytes[bytes.len().saturating_sub(1024)..];
    assert!(
        tail.windows(5).any(|w| w == b"%%EOF"),
        "[{context}] missing %%EOF trailer"
    );
    let doc = Document::load_mem(bytes).unwrap_or_else(|e| panic!("[{context}] unparseable: {e}"));
    println!("[{context}] ✓  {} bytes, {} pages", bytes.len(), doc.get_pages().len());
    doc
}

fn image_xobject_count(doc: &Document) -> usize {
    doc.objects
        .values()
        .filter_map(|o| o.as_stream().ok())
        .filter(|s| {
            s.dict
                .get(b"Subtype")
                .and_then(|v| v.as_name())
                .is_ok_and(|n| n == b"Image")
        })
        .count()
}

/// Widths of the image XObjects drawn on `page`, in drawing order.
fn drawn_image_widths(doc: &Document, page: u32) -> Vec<i64> {
    let page_id = doc.get_pages()[&page];
    let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
    let xobjects = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .and_then(|d| d.get(b"Resources"))
        .and_then(Object::as_dict)
        .and_then(|d| d.get(b"XObject"))
        .and_then(Object::as_dict)
        .unwrap();

    content
        .operations
        .iter()
        .filter(|op| op.operator == "Do")
        .map(|op| {
            let id = xobjects
                .get(op.operands[0].as_name().unwrap())
                .and_then(Object::as_reference)
                .unwrap();
            let stream = doc.get_object(id).and_then(Object::as_stream).unwrap();
            stream.dict.get(b"Width").and_then(Object::as_i64).unwrap()
        })
        .collect()
}

// ── Image input (always runs) ────────────────────────────────────────────────

#[tokio::test]
async fn photo_becomes_single_page_pdf() {
    let jpeg = encoded(
        DynamicImage::ImageRgb8(RgbImage::from_pixel(320, 240, Rgb([180, 40, 40]))),
        ImageFormat::Jpeg,
    );
    let converter = Converter::new(fallback_config()).unwrap();

    let out = converter
        .convert(SourceDocument::new(jpeg, Some("photo.jpg")))
        .await
        .unwrap();
    assert_eq!(out.stats.source_format, SourceFormat::Image);
    assert_eq!(out.stats.backend, "flow");

    let doc = assert_pdf(&out.pdf, "photo");
    assert_eq!(doc.get_pages().len(), 1);
    assert_eq!(image_xobject_count(&doc), 1);
}

#[tokio::test]
async fn bmp_upload_is_transcoded() {
    let bmp = encoded(
        DynamicImage::ImageRgb8(RgbImage::from_pixel(30, 30, Rgb([0, 0, 255]))),
        ImageFormat::Bmp,
    );
    let converter = Converter::new(fallback_config()).unwrap();
    let pdf = converter.process_bytes(bmp, Some("scan.bmp")).await.unwrap();
    assert_eq!(assert_pdf(&pdf, "bmp").get_pages().len(), 1);
}

#[tokio::test]
async fn unknown_bytes_are_rejected_as_unsupported_image() {
    let converter = Converter::new(fallback_config()).unwrap();
    let err = converter
        .process_bytes(b"PK\x03\x04 not an image".to_vec(), Some("archive.zip"))
        .await
        .unwrap_err();

    let report = err.to_report();
    assert_eq!(report.kind, ErrorKind::UnsupportedImage);
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["kind"], "unsupported_image");
    assert_eq!(json["stage"], "extract");
}

#[tokio::test]
async fn empty_upload_is_an_error_not_a_pdf() {
    let converter = Converter::new(fallback_config()).unwrap();
    let err = converter.process_bytes(Vec::new(), None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedImage);
}

#[test]
fn probe_never_panics() {
    let caps = Capabilities::probe(&ConversionConfig::default());
    println!("capabilities: {}", serde_json::to_string(&caps).unwrap());
}

// ── PDF input (needs pdfium) ─────────────────────────────────────────────────

#[tokio::test]
async fn pdf_pages_keep_their_order() {
    let config = fallback_config();
    let converter = Converter::new(config).unwrap();
    skip_unless_available!(converter.capabilities().pdf_reader, "pdfium");

    let input = text_pdf(&[Some("Alpha"), Some("Beta"), Some("Gamma")]);
    let out = converter
        .convert(SourceDocument::new(input, Some("three.pdf")))
        .await
        .unwrap();
    assert_eq!(out.stats.source_format, SourceFormat::Pdf);
    assert_eq!(out.stats.pages, 3);

    let doc = assert_pdf(&out.pdf, "order");
    assert_eq!(doc.get_pages().len(), 3);
    for (n, word) in [(1, "Alpha"), (2, "Beta"), (3, "Gamma")] {
        let text = doc.extract_text(&[n]).unwrap();
        assert!(text.contains(word), "page {n} should contain {word}: {text:?}");
    }
}

#[tokio::test]
async fn blank_pdf_page_is_kept() {
    let converter = Converter::new(fallback_config()).unwrap();
    skip_unless_available!(converter.capabilities().pdf_reader, "pdfium");

    let input = text_pdf(&[Some("First"), None, Some("Third")]);
    let out = converter
        .convert(SourceDocument::new(input, Some("gap.pdf")))
        .await
        .unwrap();
    let doc = assert_pdf(&out.pdf, "blank page");
    assert_eq!(doc.get_pages().len(), 3);
    assert!(doc.extract_text(&[3]).unwrap().contains("Third"));
}

#[tokio::test]
async fn magic_bytes_win_without_a_filename() {
    let converter = Converter::new(fallback_config()).unwrap();
    skip_unless_available!(converter.capabilities().pdf_reader, "pdfium");

    let out = converter
        .convert(SourceDocument::from_bytes(text_pdf(&[Some("Hello")])))
        .await
        .unwrap();
    assert_eq!(out.stats.source_format, SourceFormat::Pdf);
}

#[tokio::test]
async fn pdf_images_keep_their_order() {
    let converter = Converter::new(fallback_config()).unwrap();
    skip_unless_available!(converter.capabilities().pdf_reader, "pdfium");

    let out = converter
        .convert(SourceDocument::new(image_pdf(&[40, 16], false), Some("two.pdf")))
        .await
        .unwrap();
    assert_eq!(out.stats.images, 2);

    let doc = assert_pdf(&out.pdf, "image order");
    assert_eq!(drawn_image_widths(&doc, 1), vec![40, 16]);
}

#[tokio::test]
async fn images_inside_form_xobjects_are_extracted() {
    let converter = Converter::new(fallback_config()).unwrap();
    skip_unless_available!(converter.capabilities().pdf_reader, "pdfium");

    let out = converter
        .convert(SourceDocument::new(image_pdf(&[24, 60, 12], true), Some("form.pdf")))
        .await
        .unwrap();
    assert_eq!(out.stats.images, 3);

    let doc = assert_pdf(&out.pdf, "form xobject");
    assert_eq!(drawn_image_widths(&doc, 1), vec![24, 60, 12]);
}

#[tokio::test]
async fn truncated_pdf_is_malformed() {
    let converter = Converter::new(fallback_config()).unwrap();
    skip_unless_available!(converter.capabilities().pdf_reader, "pdfium");

    let err = converter
        .process_bytes(b"%PDF-1.7\n1 0 obj << /Type".to_vec(), Some("broken.pdf"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedDocument);
}

// ── Primary renderer (needs a browser) ───────────────────────────────────────

#[tokio::test]
async fn browser_renders_when_installed() {
    let converter = Converter::new(ConversionConfig::default()).unwrap();
    skip_unless_available!(converter.capabilities().html_engine, "Chromium");

    let png = encoded(
        DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 64, Rgb([0, 120, 0]))),
        ImageFormat::Png,
    );
    let out = converter
        .convert(SourceDocument::new(png, Some("square.png")))
        .await
        .unwrap();
    assert_pdf(&out.pdf, "chromium");
    assert_eq!(out.stats.backend, "chromium");
    assert_eq!(out.stats.attempts.len(), 1);
}

#[tokio::test]
async fn forced_fallback_never_launches_browser() {
    let converter = Converter::new(fallback_config()).unwrap();
    assert!(!converter.capabilities().html_engine.is_available());

    let png = encoded(
        DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([1, 2, 3]))),
        ImageFormat::Png,
    );
    let out = converter.convert(SourceDocument::new(png, None)).await.unwrap();
    assert_eq!(out.stats.backend, "flow");
    assert_eq!(out.stats.attempts[0].backend, "chromium");
    assert!(out.stats.attempts[0].to_string().contains("disabled by configuration"));
}
