//! The render chain: try each backend once, in order, until one produces a
//! complete PDF.
//!
//! A backend gets exactly one attempt per call. There is no retry against
//! the same backend; both shipped backends are local computation, so a
//! failure is treated the same whether it was transient or not.

use crate::capabilities::Capabilities;
use crate::config::ConversionConfig;
use crate::document::DocumentLayout;
use crate::error::ReconstructError;
use crate::output::{AttemptOutcome, AttemptRecord, RenderedPdf};
use crate::progress::ProgressCallback;
use crate::render::{ChromiumBackend, FlowBackend, FlowOptions, HtmlOptions, RenderBackend};
use tracing::{debug, info, warn};

/// Ordered list of render backends.
pub struct RenderChain {
    backends: Vec<Box<dyn RenderBackend>>,
}

impl RenderChain {
    pub fn new(backends: Vec<Box<dyn RenderBackend>>) -> Self {
        Self { backends }
    }

    /// The standard chain: headless browser first, lopdf generator second.
    pub fn from_capabilities(capabilities: &Capabilities, config: &ConversionConfig) -> Self {
        Self::new(vec![
            Box::new(ChromiumBackend::new(
                capabilities.html_engine.clone(),
                HtmlOptions::from_config(config),
                config.primary_timeout(),
            )),
            Box::new(FlowBackend::new(FlowOptions::from_config(config))),
        ])
    }

    pub fn backend_names(&self) -> Vec<&'static str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Render `layout` with the first backend that succeeds.
    pub async fn render(
        &self,
        layout: &DocumentLayout,
        progress: Option<&ProgressCallback>,
    ) -> Result<RenderedPdf, ReconstructError> {
        let mut attempts = Vec::with_capacity(self.backends.len());

        for backend in &self.backends {
            let name = backend.name();
            debug!("Trying render backend '{}'", name);

            let outcome = match backend.render(layout).await {
                AttemptOutcome::Rendered(bytes) => match validate_pdf(&bytes) {
                    Ok(()) => AttemptOutcome::Rendered(bytes),
                    Err(reason) => AttemptOutcome::Failed(reason),
                },
                other => other,
            };
            attempts.push(AttemptRecord::new(name, &outcome));

            match outcome {
                AttemptOutcome::Rendered(bytes) => {
                    info!("Rendered {} bytes with '{}'", bytes.len(), name);
                    return Ok(RenderedPdf {
                        bytes,
                        backend: name.to_string(),
                        attempts,
                    });
                }
                AttemptOutcome::Unavailable(reason) | AttemptOutcome::Failed(reason) => {
                    warn!("Render backend '{}' did not produce output: {}", name, reason);
                    if let Some(cb) = progress {
                        cb.on_backend_failed(name, &reason);
                    }
                }
            }
        }

        Err(ReconstructError::NoRendererAvailable { attempts })
    }
}

/// Reject empty, non-PDF, or truncated output.
fn validate_pdf(bytes: &[u8]) -> Result<(), String> {
    if bytes.is_empty() {
        return Err("backend returned no bytes".into());
    }
    if !bytes.starts_with(b"%PDF-") {
        return Err("backend output is not a PDF".into());
    }
    let tail = &bytes[bytes.len().saturating_sub(1024)..];
    if !tail.windows(5).any(|w| w == b"%%EOF") {
        return Err("backend output is truncated (no %%EOF marker)".into());
    }
    Ok(())
}
