//! Render backends and the chain that tries them in order.
//!
//! ```text
//! DocumentLayout ──▶ chromium (HTML → headless print) ──✗──▶ flow (lopdf) ──✗──▶ NoRendererAvailable
//!                          │ ✓                                  │ ✓
//!                          ▼                                    ▼
//!                       PDF bytes                            PDF bytes
//! ```
//!
//! * [`chain`]: ordered attempts, output validation, attempt log
//! * [`html`]: primary backend: builds an HTML document from the layout and
//!   prints it with a headless Chromium-family browser under a timeout
//! * [`flow`]: fallback backend: flowed text and images written straight
//!   to PDF objects with lopdf
//!
//! Every backend consumes the same [`DocumentLayout`]; none of them know
//! whether it came from a PDF or an image.

pub mod chain;
pub mod flow;
mod helvetica;
pub mod html;

use crate::document::DocumentLayout;
use crate::output::AttemptOutcome;
use futures::future::BoxFuture;

pub use chain::RenderChain;
pub use flow::{FlowBackend, FlowOptions};
pub use html::{build_html, ChromiumBackend, HtmlOptions};

/// One way of turning a layout into PDF bytes.
///
/// A backend reports availability and failure as an [`AttemptOutcome`]
/// instead of an error so the chain can move on without unwinding.
pub trait RenderBackend: Send + Sync {
    /// Short stable name used in logs and attempt records.
    fn name(&self) -> &'static str;

    /// Render the whole layout, or explain why not.
    fn render<'a>(&'a self, layout: &'a DocumentLayout) -> BoxFuture<'a, AttemptOutcome>;
}
