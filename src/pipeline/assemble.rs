//! Layout assembly: extracted [`Page`]s → renderer-neutral [`DocumentLayout`].
//!
//! Each page maps to exactly one [`PageBlock`], in order. The `'\n'`
//! line-break markers left by the extractor become paragraph structure:
//! blank lines separate paragraphs, every other break starts a new line
//! within the current paragraph. Images move across untouched.
//!
//! Text cleanup rules (applied in order):
//! 1. Remove invisible Unicode and control characters other than `'\n'`
//! 2. Collapse runs of horizontal whitespace (tabs, NBSP) to one space
//! 3. Trim each line
//! 4. Group non-empty lines into paragraphs at blank lines

use crate::document::{DocumentLayout, Page, PageBlock, Paragraph};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Assemble pages into a layout. Pure and infallible.
pub fn assemble(pages: Vec<Page>) -> DocumentLayout {
    let blocks: Vec<PageBlock> = pages
        .into_iter()
        .map(|page| PageBlock {
            paragraphs: paragraphs(&page.text),
            images: page.images,
        })
        .collect();

    debug!(
        "Assembled {} blocks ({} with text)",
        blocks.len(),
        blocks.iter().filter(|b| b.has_text()).count()
    );
    DocumentLayout { blocks }
}

/// Split marker-delimited text into cleaned paragraphs.
pub fn paragraphs(text: &str) -> Vec<Paragraph> {
    let cleaned = remove_invisible_chars(text);

    let mut out = Vec::new();
    let mut current: Vec<String> = Vec::new();
    for raw in cleaned.split('\n') {
        let line = RE_HSPACE.replace_all(raw, " ");
        let line = line.trim();
        if line.is_empty() {
            if !current.is_empty() {
                out.push(Paragraph {
                    lines: std::mem::take(&mut current),
                });
            }
        } else {
            current.push(line.to_string());
        }
    }
    if !current.is_empty() {
        out.push(Paragraph { lines: current });
    }
    out
}

// ── Rule 1: Remove invisible and control characters ──────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input
        .chars()
        .filter(|&c| {
            !matches!(
                c,
                '\u{200B}' | '\u{FEFF}' | '\u{00AD}' | '\u{200C}' | '\u{200D}' | '\u{2060}'
            ) && (c == '\n' || c == '\t' || !c.is_control())
        })
        .collect()
}

// ── Rule 2: Collapse horizontal whitespace ───────────────────────────────────

static RE_HSPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\u{00A0}\u{2000}-\u{200A}\u{3000}]+").unwrap());

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ImageAsset, ImageEncoding};

    fn asset(tag: u8) -> ImageAsset {
        ImageAsset {
            encoding: ImageEncoding::Png,
            bytes: vec![tag; 4],
            width: 1,
            height: 1,
        }
    }

    #[test]
    fn one_block_per_page_in_order() {
        let pages = vec![
            Page {
                index: 0,
                text: "first".into(),
                images: vec![],
            },
            Page {
                index: 1,
                text: "second".into(),
                images: vec![],
            },
            Page {
                index: 2,
                text: "third".into(),
                images: vec![],
            },
        ];
        let layout = assemble(pages);
        let texts: Vec<String> = layout.blocks.iter().map(|b| b.plain_text()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn blank_lines_split_paragraphs() {
        let paras = paragraphs("Title\n\nline one\nline two\n\n\n\nEnd");
        assert_eq!(paras.len(), 3);
        assert_eq!(paras[0].lines, vec!["Title"]);
        assert_eq!(paras[1].lines, vec!["line one", "line two"]);
        assert_eq!(paras[2].lines, vec!["End"]);
    }

    #[test]
    fn whitespace_and_control_chars_are_cleaned() {
        let paras = paragraphs("  a\t\tb\u{00A0} c  \u{0002}\n\u{200B}d\u{FEFF}");
        assert_eq!(paras.len(), 1);
        assert_eq!(paras[0].lines, vec!["a b c", "d"]);
    }

    #[test]
    fn whitespace_only_lines_count_as_blank() {
        let paras = paragraphs("a\n   \t\nb");
        assert_eq!(paras.len(), 2);
    }

    #[test]
    fn empty_text_keeps_images() {
        let layout = assemble(vec![Page {
            index: 0,
            text: String::new(),
            images: vec![asset(1), asset(2)],
        }]);
        assert_eq!(layout.len(), 1);
        assert!(!layout.blocks[0].has_text());
        assert_eq!(layout.blocks[0].images, vec![asset(1), asset(2)]);
    }

    #[test]
    fn image_bytes_are_untouched() {
        let original = asset(7);
        let layout = assemble(vec![Page {
            index: 0,
            text: "caption".into(),
            images: vec![original.clone()],
        }]);
        assert_eq!(layout.blocks[0].images[0].bytes(), original.bytes());
    }

    #[test]
    fn blank_page_yields_empty_block() {
        let layout = assemble(vec![Page::default()]);
        assert_eq!(layout.len(), 1);
        assert_eq!(layout.blocks[0], PageBlock::default());
    }

    #[test]
    fn no_pages_no_blocks() {
        assert!(assemble(Vec::new()).is_empty());
    }
}
