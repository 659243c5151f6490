//! Conversion entry points.
//!
//! [`Converter`] owns everything a conversion needs that does not change
//! between calls: the validated config, the capability table probed once at
//! construction, and the render chain built from it. A single converter can
//! serve any number of concurrent conversions; each call keeps its pages and
//! layout local and drops them on return.
//!
//! ```text
//! SourceDocument ─▶ classify ─▶ extract ─▶ assemble ─▶ RenderChain ─▶ PDF bytes
//! ```
//!
//! Any stage failure ends the call with a single [`ReconstructError`]. No
//! partial PDF is ever returned.

use crate::capabilities::Capabilities;
use crate::config::ConversionConfig;
use crate::document::SourceDocument;
use crate::error::{ReconstructError, Stage};
use crate::output::{ConversionOutput, ConversionStats};
use crate::pipeline::{assemble, classify, extract, input};
use crate::render::RenderChain;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Reusable, thread-safe document reconstructor.
pub struct Converter {
    config: ConversionConfig,
    capabilities: Capabilities,
    chain: RenderChain,
}

impl Converter {
    /// Validate `config`, probe the host once, and build the standard chain.
    pub fn new(config: ConversionConfig) -> Result<Self, ReconstructError> {
        config.validate()?;
        let capabilities = Capabilities::probe(&config);
        Ok(Self::with_capabilities(config, capabilities))
    }

    /// Use a pre-computed capability table with the standard chain.
    pub fn with_capabilities(config: ConversionConfig, capabilities: Capabilities) -> Self {
        let chain = RenderChain::from_capabilities(&capabilities, &config);
        Self::with_chain(config, capabilities, chain)
    }

    /// Full injection: capability table and render chain supplied by the caller.
    pub fn with_chain(
        config: ConversionConfig,
        capabilities: Capabilities,
        chain: RenderChain,
    ) -> Self {
        debug!("Converter ready with backends {:?}", chain.backend_names());
        Self {
            config,
            capabilities,
            chain,
        }
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Reconstruct `source` and return the PDF bytes.
    pub async fn process(&self, source: SourceDocument) -> Result<Vec<u8>, ReconstructError> {
        Ok(self.convert(source).await?.pdf)
    }

    /// Same as [`Converter::process`] for a raw buffer plus optional file name.
    pub async fn process_bytes(
        &self,
        bytes: impl Into<Vec<u8>>,
        filename_hint: Option<&str>,
    ) -> Result<Vec<u8>, ReconstructError> {
        self.process(SourceDocument::new(bytes, filename_hint)).await
    }

    /// Reconstruct `source`, returning the PDF together with run statistics.
    pub async fn convert(&self, source: SourceDocument) -> Result<ConversionOutput, ReconstructError> {
        let total_start = Instant::now();
        let progress = self.config.progress_callback.as_ref();
        let notify = |stage: Stage| {
            if let Some(cb) = progress {
                cb.on_stage_start(stage);
            }
        };

        // ── Step 1: Classify ─────────────────────────────────────────────────
        notify(Stage::Classify);
        let format = classify::classify(source.bytes(), source.filename());
        info!(
            "Converting {} ({} bytes) as {}",
            source.filename().unwrap_or("<buffer>"),
            source.len(),
            format
        );

        // ── Step 2: Extract ──────────────────────────────────────────────────
        notify(Stage::Extract);
        let extract_start = Instant::now();
        let extractor = extract::extractor_for(format, &self.capabilities, &self.config);
        let pages = tokio::task::spawn_blocking(move || extractor.extract(&source))
            .await
            .map_err(|e| ReconstructError::internal(Stage::Extract, format!("extraction task failed: {e}")))??;
        let extract_duration_ms = extract_start.elapsed().as_millis() as u64;

        let image_total: usize = pages.iter().map(|p| p.images.len()).sum();
        debug!(
            "Extracted {} pages ({} blank), {} images in {}ms",
            pages.len(),
            pages.iter().filter(|p| p.is_blank()).count(),
            image_total,
            extract_duration_ms
        );
        if let Some(cb) = progress {
            cb.on_pages_extracted(pages.len(), image_total);
        }

        // ── Step 3: Assemble ─────────────────────────────────────────────────
        notify(Stage::Assemble);
        let layout = assemble::assemble(pages);

        // ── Step 4: Render ───────────────────────────────────────────────────
        notify(Stage::Render);
        let render_start = Instant::now();
        let rendered = self.chain.render(&layout, progress).await?;
        let render_duration_ms = render_start.elapsed().as_millis() as u64;

        let stats = ConversionStats {
            source_format: format,
            pages: layout.len(),
            images: layout.image_count(),
            backend: rendered.backend.clone(),
            attempts: rendered.attempts,
            output_bytes: rendered.bytes.len(),
            extract_duration_ms,
            render_duration_ms,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };

        info!(
            "Conversion complete: {} blocks via '{}', {} bytes, {}ms total",
            stats.pages, stats.backend, stats.output_bytes, stats.total_duration_ms
        );
        if let Some(cb) = progress {
            cb.on_conversion_complete(&stats.backend, stats.output_bytes);
        }

        Ok(ConversionOutput {
            pdf: rendered.bytes,
            stats,
        })
    }
}

/// Convert a file on disk and write the PDF to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn convert_file(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: ConversionConfig,
) -> Result<ConversionStats, ReconstructError> {
    let converter = Converter::new(config)?;
    let source = input::read_source(input_path.as_ref()).await?;
    let output = converter.convert(source).await?;
    write_atomic(output_path.as_ref(), &output.pdf).await?;
    Ok(output.stats)
}

pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ReconstructError> {
    let write_err = |e| ReconstructError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, bytes).await.map_err(write_err)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }
    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Synchronous wrapper around [`Converter::process`].
///
/// Creates a temporary tokio runtime internally; do not call from async code.
pub fn process_sync(
    bytes: impl Into<Vec<u8>>,
    filename_hint: Option<&str>,
    config: ConversionConfig,
) -> Result<Vec<u8>, ReconstructError> {
    let source = SourceDocument::new(bytes, filename_hint);
    tokio::runtime::Runtime::new()
        .map_err(|e| ReconstructError::internal(Stage::Classify, format!("Failed to create tokio runtime: {e}")))?
        .block_on(async move { Converter::new(config)?.process(source).await })
}
