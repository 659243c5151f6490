//! Error types for the smartreader library.
//!
//! Two distinct shapes reflect two distinct failure modes:
//!
//! * [`ReconstructError`]: **Fatal**: the conversion cannot produce a PDF
//!   (unparseable input, undecodable image, every renderer failed). Returned
//!   as `Err(ReconstructError)` from [`crate::Converter`] and the `convert*`
//!   functions.
//!
//! * [`crate::output::AttemptOutcome`]: **Non-fatal**: a single render
//!   backend was unavailable or failed. The chain records it and moves on;
//!   it only becomes fatal (as [`ReconstructError::NoRendererAvailable`])
//!   when no backend is left.

use crate::output::AttemptRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Pipeline stage a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Classify,
    Extract,
    Assemble,
    Render,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Classify => "classify",
            Stage::Extract => "extract",
            Stage::Assemble => "assemble",
            Stage::Render => "render",
        })
    }
}

/// All fatal errors returned by the smartreader library.
#[derive(Debug, Error)]
pub enum ReconstructError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The input claims to be a PDF but cannot be parsed as one.
    #[error("Malformed document: {detail}")]
    MalformedDocument { detail: String },

    /// The PDF is encrypted and no (or the wrong) password was supplied.
    #[error("Document is encrypted and requires a password")]
    PasswordRequired,

    /// The bytes are not any recognised still-image format.
    #[error("Unsupported image: {detail}")]
    UnsupportedImage { detail: String },

    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    // ── Render errors ─────────────────────────────────────────────────────
    /// Every backend in the render chain was unavailable or failed.
    #[error("No PDF renderer available: {}", summarize(.attempts))]
    NoRendererAvailable { attempts: Vec<AttemptRecord> },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected failure inside a stage.
    #[error("Internal error during {stage}: {detail}")]
    Internal { stage: Stage, detail: String },
}

/// Stable, machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MalformedDocument,
    PasswordRequired,
    UnsupportedImage,
    NoRendererAvailable,
    InternalPipelineError,
    InvalidInput,
    InvalidConfig,
    OutputWriteFailed,
}

/// The single structured outcome a caller (e.g. an HTTP handler) reports
/// for a failed conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    pub message: String,
}

impl ReconstructError {
    pub(crate) fn internal(stage: Stage, detail: impl Into<String>) -> Self {
        Self::Internal {
            stage,
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedDocument { .. } => ErrorKind::MalformedDocument,
            Self::PasswordRequired => ErrorKind::PasswordRequired,
            Self::UnsupportedImage { .. } => ErrorKind::UnsupportedImage,
            Self::FileNotFound { .. } | Self::PermissionDenied { .. } => ErrorKind::InvalidInput,
            Self::NoRendererAvailable { .. } => ErrorKind::NoRendererAvailable,
            Self::OutputWriteFailed { .. } => ErrorKind::OutputWriteFailed,
            Self::InvalidConfig(_) => ErrorKind::InvalidConfig,
            Self::Internal { .. } => ErrorKind::InternalPipelineError,
        }
    }

    /// The pipeline stage the failure belongs to, when there is one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::MalformedDocument { .. } | Self::PasswordRequired | Self::UnsupportedImage { .. } => {
                Some(Stage::Extract)
            }
            Self::NoRendererAvailable { .. } => Some(Stage::Render),
            Self::Internal { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    pub fn to_report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind(),
            stage: self.stage(),
            message: self.to_string(),
        }
    }
}

fn summarize(attempts: &[AttemptRecord]) -> String {
    if attempts.is_empty() {
        return "no render backends configured".to_string();
    }
    attempts
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
