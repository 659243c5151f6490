//! Configuration types for a conversion.
//!
//! All behaviour is controlled through [`ConversionConfig`], built via its
//! [`ConversionConfigBuilder`]. The library reads no environment variables:
//! the CLI maps flags and `SMARTREADER_*` variables onto the builder.
//!
//! Presentation lives here as backend configuration (page size, margins,
//! font size, HTML stylesheet) rather than inside the pipeline.

use crate::error::ReconstructError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Millimetres to PDF points.
pub(crate) const MM_TO_PT: f32 = 72.0 / 25.4;

/// Configuration for a conversion.
///
/// # Example
/// ```rust
/// use smartreader::{ConversionConfig, PageSize};
///
/// let config = ConversionConfig::builder()
///     .page_size(PageSize::Letter)
///     .primary_timeout_secs(20)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Upper bound on one primary-backend (browser) run. Default: 30 s.
    ///
    /// On expiry the browser is killed and the chain moves on to the
    /// fallback, exactly as if the browser were not installed.
    pub primary_timeout_secs: u64,

    /// Explicit browser executable. If None the capability probe searches
    /// `PATH` for the usual Chromium/Chrome names.
    pub chromium_path: Option<PathBuf>,

    /// Skip the primary backend entirely. Default: false.
    pub disable_primary: bool,

    /// pdfium shared library: a file, or a directory holding the platform
    /// library. If None the system library search path is used.
    pub pdfium_library_path: Option<PathBuf>,

    /// PDF user password for encrypted inputs.
    pub password: Option<String>,

    /// Output paper size. Default: A4.
    pub page_size: PageSize,

    /// Page margin on all four sides, in millimetres. Default: 20.
    pub margin_mm: f32,

    /// Body text size for the fallback generator, in points. Default: 11.
    pub font_size_pt: f32,

    /// Replacement CSS for the HTML backend. If None the backend's built-in
    /// stylesheet is used.
    pub stylesheet: Option<String>,

    /// Fallback generator: start every page block on a fresh output page.
    /// Default: true.
    pub break_between_blocks: bool,

    /// Document title written into the output. Default: "Reconstructed Document".
    pub title: Option<String>,

    /// Optional per-stage progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            primary_timeout_secs: 30,
            chromium_path: None,
            disable_primary: false,
            pdfium_library_path: None,
            password: None,
            page_size: PageSize::default(),
            margin_mm: 20.0,
            font_size_pt: 11.0,
            stylesheet: None,
            break_between_blocks: true,
            title: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("primary_timeout_secs", &self.primary_timeout_secs)
            .field("chromium_path", &self.chromium_path)
            .field("disable_primary", &self.disable_primary)
            .field("pdfium_library_path", &self.pdfium_library_path)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("page_size", &self.page_size)
            .field("margin_mm", &self.margin_mm)
            .field("font_size_pt", &self.font_size_pt)
            .field("stylesheet", &self.stylesheet.as_ref().map(|s| s.len()))
            .field("break_between_blocks", &self.break_between_blocks)
            .field("title", &self.title)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn primary_timeout(&self) -> Duration {
        Duration::from_secs(self.primary_timeout_secs)
    }

    /// Check the constraints [`ConversionConfigBuilder::build`] enforces.
    /// Useful for configs assembled by struct literal.
    pub fn validate(&self) -> Result<(), ReconstructError> {
        let c = self;
        if c.primary_timeout_secs == 0 {
            return Err(ReconstructError::InvalidConfig(
                "Primary renderer timeout must be ≥ 1 second".into(),
            ));
        }
        let (w, h) = c.page_size.dimensions_pt();
        if !c.margin_mm.is_finite() || c.margin_mm < 0.0 || 2.0 * c.margin_pt() >= w.min(h) * 0.8 {
            return Err(ReconstructError::InvalidConfig(format!(
                "Margin of {}mm leaves no room on a {:?} page",
                c.margin_mm, c.page_size
            )));
        }
        if !(4.0..=72.0).contains(&c.font_size_pt) {
            return Err(ReconstructError::InvalidConfig(format!(
                "Font size must be 4–72pt, got {}",
                c.font_size_pt
            )));
        }
        Ok(())
    }

    pub(crate) fn margin_pt(&self) -> f32 {
        self.margin_mm * MM_TO_PT
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn primary_timeout_secs(mut self, secs: u64) -> Self {
        self.config.primary_timeout_secs = secs;
        self
    }

    pub fn chromium_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.chromium_path = Some(path.into());
        self
    }

    pub fn disable_primary(mut self, v: bool) -> Self {
        self.config.disable_primary = v;
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn page_size(mut self, size: PageSize) -> Self {
        self.config.page_size = size;
        self
    }

    pub fn margin_mm(mut self, mm: f32) -> Self {
        self.config.margin_mm = mm;
        self
    }

    pub fn font_size_pt(mut self, pt: f32) -> Self {
        self.config.font_size_pt = pt;
        self
    }

    pub fn stylesheet(mut self, css: impl Into<String>) -> Self {
        self.config.stylesheet = Some(css.into());
        self
    }

    pub fn break_between_blocks(mut self, v: bool) -> Self {
        self.config.break_between_blocks = v;
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.config.title = Some(title.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, ReconstructError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Output paper size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageSize {
    /// 210 × 297 mm (default).
    #[default]
    A4,
    /// 8.5 × 11 in.
    Letter,
}

impl PageSize {
    /// Width and height in PDF points.
    pub fn dimensions_pt(self) -> (f32, f32) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::Letter => (612.0, 792.0),
        }
    }

    /// Name understood by the CSS `@page size` descriptor.
    pub fn css_name(self) -> &'static str {
        match self {
            PageSize::A4 => "A4",
            PageSize::Letter => "letter",
        }
    }
}

impl std::str::FromStr for PageSize {
    type Err = ReconstructError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "a4" => Ok(PageSize::A4),
            "letter" => Ok(PageSize::Letter),
            other => Err(ReconstructError::InvalidConfig(format!(
                "Unknown page size '{other}' (expected a4 or letter)"
            ))),
        }
    }
}
