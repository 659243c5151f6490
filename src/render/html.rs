//! Primary backend: layout → HTML → headless Chromium `--print-to-pdf`.
//!
//! The HTML is self-contained: styles inline, images as base64 data URIs.
//! Each page block becomes one `<section class="page">` with a page break
//! before every section after the first, so the browser
//! emits one output page per block unless a block overflows.
//!
//! The browser runs in a private temp dir with its own profile. It is
//! killed when the timeout elapses or the future is dropped. On unix it
//! leads its own process group, and the whole group is killed so helper
//! processes do not outlive the temp dir.

use crate::capabilities::Availability;
use crate::config::{ConversionConfig, PageSize};
use crate::document::{DocumentLayout, PageBlock};
use crate::output::AttemptOutcome;
use crate::pipeline::encode;
use crate::render::RenderBackend;
use futures::future::BoxFuture;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Stylesheet used when the config does not supply one.
pub const DEFAULT_STYLESHEET: &str = r#"
body { font-family: "Helvetica Neue", Helvetica, Arial, sans-serif; font-size: 11pt; line-height: 1.4; color: #111; margin: 0; }
p { margin: 0 0 0.7em 0; }
img { display: block; max-width: 100%; max-height: 95vh; object-fit: contain; margin: 0.5em 0; }
"#;

/// Inputs to [`build_html`] beyond the layout itself.
#[derive(Debug, Clone)]
pub struct HtmlOptions {
    pub title: String,
    /// Replaces [`DEFAULT_STYLESHEET`] when set.
    pub stylesheet: Option<String>,
    pub page_size: PageSize,
    pub margin_mm: f32,
}

impl Default for HtmlOptions {
    fn default() -> Self {
        Self::from_config(&ConversionConfig::default())
    }
}

impl HtmlOptions {
    pub fn from_config(config: &ConversionConfig) -> Self {
        Self {
            title: config
                .title
                .clone()
                .unwrap_or_else(|| crate::DEFAULT_TITLE.to_string()),
            stylesheet: config.stylesheet.clone(),
            page_size: config.page_size,
            margin_mm: config.margin_mm,
        }
    }
}

/// Build a standalone HTML document for `layout`.
pub fn build_html(layout: &DocumentLayout, options: &HtmlOptions) -> String {
    let css = options.stylesheet.as_deref().unwrap_or(DEFAULT_STYLESHEET);

    let mut html = String::with_capacity(4096);
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(html, "<title>{}</title>", escape(&options.title));
    let _ = writeln!(
        html,
        "<style>\n@page {{ size: {}; margin: {}mm; }}\n.page + .page {{ break-before: page; }}\nimg {{ width: auto; height: auto; }}\n{}\n</style>",
        options.page_size.css_name(),
        options.margin_mm,
        css.trim()
    );
    html.push_str("</head>\n<body>\n");

    for block in &layout.blocks {
        push_block(&mut html, block);
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn push_block(html: &mut String, block: &PageBlock) {
    html.push_str("<section class=\"page\">\n");
    for paragraph in &block.paragraphs {
        let lines: Vec<String> = paragraph.lines.iter().map(|l| escape(l)).collect();
        let _ = writeln!(html, "<p>{}</p>", lines.join("<br/>"));
    }
    for image in &block.images {
        let _ = writeln!(
            html,
            "<img src=\"{}\" width=\"{}\" height=\"{}\" alt=\"\"/>",
            encode::to_data_uri(image),
            image.width(),
            image.height()
        );
    }
    html.push_str("</section>\n");
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Prints [`build_html`] output with a headless Chromium-family browser.
pub struct ChromiumBackend {
    engine: Availability<PathBuf>,
    options: HtmlOptions,
    timeout: Duration,
}

impl ChromiumBackend {
    pub fn new(engine: Availability<PathBuf>, options: HtmlOptions, timeout: Duration) -> Self {
        Self {
            engine,
            options,
            timeout,
        }
    }

    async fn print(&self, browser: &Path, layout: &DocumentLayout) -> Result<Vec<u8>, String> {
        let workdir = tempfile::tempdir().map_err(|e| format!("cannot create temp dir: {e}"))?;
        let html_path = workdir.path().join("document.html");
        let pdf_path = workdir.path().join("document.pdf");
        let profile = workdir.path().join("profile");

        tokio::fs::write(&html_path, build_html(layout, &self.options))
            .await
            .map_err(|e| format!("cannot write HTML: {e}"))?;

        let mut cmd = Command::new(browser);
        cmd.args([
            "--headless",
            "--disable-gpu",
            "--no-sandbox",
            "--no-first-run",
            "--no-default-browser-check",
            "--disable-extensions",
            "--no-pdf-header-footer",
            "--print-to-pdf-no-header",
        ])
        .arg(format!("--user-data-dir={}", profile.display()))
        .arg(format!("--print-to-pdf={}", pdf_path.display()))
        .arg(format!("file://{}", html_path.display()))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        debug!("Launching {} for {} blocks", browser.display(), layout.len());
        let child = cmd
            .spawn()
            .map_err(|e| format!("cannot launch {}: {e}", browser.display()))?;
        let _group = ProcessGroup(child.id());

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| format!("browser wait failed: {e}"))?,
            Err(_) => return Err(format!("timed out after {:.1}s", self.timeout.as_secs_f32())),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let last = stderr.lines().last().unwrap_or("").trim();
            return Err(format!("browser exited with {}: {}", output.status, last));
        }

        tokio::fs::read(&pdf_path)
            .await
            .map_err(|e| format!("browser produced no PDF: {e}"))
    }
}

/// Kills the browser's process group on drop.
struct ProcessGroup(Option<u32>);

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        #[cfg(unix)]
        if let Some(pid) = self.0.and_then(|pid| i32::try_from(pid).ok()) {
            // SAFETY: kill(2) with a negative pid only signals that group.
            unsafe {
                libc::kill(-pid, libc::SIGKILL);
            }
        }
    }
}

impl RenderBackend for ChromiumBackend {
    fn name(&self) -> &'static str {
        "chromium"
    }

    fn render<'a>(&'a self, layout: &'a DocumentLayout) -> BoxFuture<'a, AttemptOutcome> {
        Box::pin(async move {
            let browser = match &self.engine {
                Availability::Available(path) => path,
                Availability::Unavailable(reason) => {
                    return AttemptOutcome::Unavailable(reason.clone());
                }
            };
            match self.print(browser, layout).await {
                Ok(bytes) => AttemptOutcome::Rendered(bytes),
                Err(reason) => {
                    debug!("Chromium render failed: {}", reason);
                    AttemptOutcome::Failed(reason)
                }
            }
        })
    }
}
