//! Format classification: decide whether an upload is a PDF or an image.
//!
//! The filename hint is consulted before the magic bytes. A `.pdf` name on a
//! buffer without the `%PDF` marker is still routed to the PDF extractor,
//! where a genuine mismatch surfaces as a malformed-document error. Anything
//! unrecognised (including empty or very short buffers) is treated as an
//! image and left for the image decoder to reject.

use crate::document::SourceFormat;

/// Leading bytes of every PDF file.
pub const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Classify an upload. Pure and infallible.
pub fn classify(bytes: &[u8], filename_hint: Option<&str>) -> SourceFormat {
    if filename_hint.is_some_and(has_pdf_extension) {
        return SourceFormat::Pdf;
    }
    if bytes.starts_with(PDF_MAGIC) {
        return SourceFormat::Pdf;
    }
    SourceFormat::Image
}

fn has_pdf_extension(name: &str) -> bool {
    let name = name.trim().as_bytes();
    name.len() >= 4 && name[name.len() - 4..].eq_ignore_ascii_case(b".pdf")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_without_hint_is_pdf() {
        assert_eq!(classify(b"%PDF-1.7\n...", None), SourceFormat::Pdf);
    }

    #[test]
    fn pdf_filename_wins_over_bytes() {
        let png_magic = b"\x89PNG\r\n\x1a\n";
        assert_eq!(classify(png_magic, Some("scan.pdf")), SourceFormat::Pdf);
        assert_eq!(classify(png_magic, Some("SCAN.PDF")), SourceFormat::Pdf);
    }

    #[test]
    fn magic_wins_over_non_pdf_filename() {
        assert_eq!(classify(b"%PDF-1.4", Some("photo.png")), SourceFormat::Pdf);
    }

    #[test]
    fn unknown_and_short_input_default_to_image() {
        assert_eq!(classify(b"", None), SourceFormat::Image);
        assert_eq!(classify(b"%P", None), SourceFormat::Image);
        assert_eq!(classify(b"hello world", Some("notes.txt")), SourceFormat::Image);
        assert_eq!(classify(b"\xff\xd8\xff\xe0", Some("photo.jpg")), SourceFormat::Image);
    }

    #[test]
    fn extension_must_be_a_suffix() {
        assert_eq!(classify(b"GIF89a", Some("pdf")), SourceFormat::Image);
        assert_eq!(classify(b"GIF89a", Some("file.pdf.gif")), SourceFormat::Image);
        assert_eq!(classify(b"GIF89a", Some("")), SourceFormat::Image);
    }

    #[test]
    fn multibyte_filenames_are_handled() {
        let png_magic = b"\x89PNG\r\n\x1a\n";
        assert_eq!(classify(png_magic, Some("ファイル")), SourceFormat::Image);
        assert_eq!(classify(png_magic, Some("日本")), SourceFormat::Image);
        assert_eq!(classify(png_magic, Some("é")), SourceFormat::Image);
        assert_eq!(classify(png_magic, Some("報告書.pdf")), SourceFormat::Pdf);
        assert_eq!(classify(b"%PDF-1.7", Some("ファイル")), SourceFormat::Pdf);
    }
}
