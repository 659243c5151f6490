//! Input loading: a user-supplied path → [`SourceDocument`].
//!
//! The whole file is read into memory. Format detection happens later in
//! [`super::classify`]; only the file name travels along as a hint.

use crate::document::SourceDocument;
use crate::error::{ReconstructError, Stage};
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// Read `path` into a [`SourceDocument`], keeping its file name as a hint.
pub async fn read_source(path: &Path) -> Result<SourceDocument, ReconstructError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        ErrorKind::PermissionDenied => ReconstructError::PermissionDenied {
            path: path.to_path_buf(),
        },
        ErrorKind::NotFound => ReconstructError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => ReconstructError::internal(Stage::Classify, format!("cannot read {}: {e}", path.display())),
    })?;

    let name = path.file_name().and_then(|n| n.to_str());
    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(SourceDocument::new(bytes, name))
}
