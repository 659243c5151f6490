//! Conversion results: the produced PDF plus per-run statistics.

use crate::document::SourceFormat;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of asking one render backend for a PDF.
///
/// A backend never returns half a document: it either hands back the full
/// byte buffer or says why it could not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Complete PDF bytes.
    Rendered(Vec<u8>),
    /// The backend is not usable on this host (not installed, not probed).
    Unavailable(String),
    /// The backend ran and failed (error, timeout, invalid output).
    Failed(String),
}

/// Serializable summary of an [`AttemptOutcome`], without the bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum AttemptStatus {
    Rendered { bytes: usize },
    Unavailable(String),
    Failed(String),
}

/// One entry of the render chain's attempt log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub backend: String,
    pub status: AttemptStatus,
}

impl AttemptRecord {
    pub fn new(backend: &str, outcome: &AttemptOutcome) -> Self {
        let status = match outcome {
            AttemptOutcome::Rendered(bytes) => AttemptStatus::Rendered { bytes: bytes.len() },
            AttemptOutcome::Unavailable(reason) => AttemptStatus::Unavailable(reason.clone()),
            AttemptOutcome::Failed(reason) => AttemptStatus::Failed(reason.clone()),
        };
        Self {
            backend: backend.to_string(),
            status,
        }
    }

    pub fn succeeded(&self) -> bool {
        matches!(self.status, AttemptStatus::Rendered { .. })
    }
}

impl fmt::Display for AttemptRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            AttemptStatus::Rendered { bytes } => write!(f, "{}: rendered {} bytes", self.backend, bytes),
            AttemptStatus::Unavailable(reason) => write!(f, "{}: unavailable ({})", self.backend, reason),
            AttemptStatus::Failed(reason) => write!(f, "{}: failed ({})", self.backend, reason),
        }
    }
}

/// PDF bytes from the first backend that succeeded.
#[derive(Debug, Clone)]
pub struct RenderedPdf {
    pub bytes: Vec<u8>,
    pub backend: String,
    /// Every attempt in chain order, the successful one last.
    pub attempts: Vec<AttemptRecord>,
}

/// Aggregate statistics for a single conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionStats {
    pub source_format: SourceFormat,
    /// Page blocks handed to the renderer.
    pub pages: usize,
    pub images: usize,
    /// Name of the backend that produced the output.
    pub backend: String,
    pub attempts: Vec<AttemptRecord>,
    pub output_bytes: usize,
    pub extract_duration_ms: u64,
    pub render_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// The complete output of a conversion.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    pub pdf: Vec<u8>,
    pub stats: ConversionStats,
}
