//! Capability registry: which external engines this host can use.
//!
//! Resolved once when a [`crate::Converter`] is built and then consumed as
//! ordinary data. Nothing in the pipeline checks for a library or an
//! executable on the fly; a backend marked unavailable here is skipped by
//! the render chain without being launched.
//!
//! | Capability   | Used by | Probe |
//! |--------------|---------|-------|
//! | `pdf_reader` | PDF extractor | bind the pdfium shared library |
//! | `html_engine`| primary renderer | locate a Chromium-family executable |

use crate::config::ConversionConfig;
use pdfium_render::prelude::Pdfium;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Executable names tried, in order, when no browser path is configured.
pub const BROWSER_CANDIDATES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
    "chrome",
    "microsoft-edge",
];

/// Typed availability of one capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Availability<T> {
    Available(T),
    Unavailable(String),
}

impl<T> Availability<T> {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available(_))
    }
}

/// Where the pdfium shared library is loaded from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PdfiumLibrary {
    /// An explicit library file.
    File(PathBuf),
    /// The dynamic loader's default search path.
    System,
}

impl PdfiumLibrary {
    /// Bind the library. Each call yields an independent handle.
    pub fn bind(&self) -> Result<Pdfium, String> {
        let bindings = match self {
            PdfiumLibrary::File(path) => {
                Pdfium::bind_to_library(path.to_string_lossy().into_owned())
            }
            PdfiumLibrary::System => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| format!("{e:?}"))?;
        Ok(Pdfium::new(bindings))
    }
}

impl fmt::Display for PdfiumLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfiumLibrary::File(p) => write!(f, "{}", p.display()),
            PdfiumLibrary::System => f.write_str("system library"),
        }
    }
}

/// The availability table consulted by extractors and the render chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub pdf_reader: Availability<PdfiumLibrary>,
    pub html_engine: Availability<PathBuf>,
}

impl Capabilities {
    /// Probe the host according to `config`.
    pub fn probe(config: &ConversionConfig) -> Self {
        let caps = Self {
            pdf_reader: probe_pdfium(config.pdfium_library_path.as_deref()),
            html_engine: if config.disable_primary {
                Availability::Unavailable("disabled by configuration".into())
            } else {
                probe_browser(config.chromium_path.as_deref())
            },
        };
        info!(
            "Capabilities: pdf_reader={} html_engine={}",
            caps.pdf_reader.is_available(),
            caps.html_engine.is_available()
        );
        caps
    }

    /// A table with nothing available, for tests and locked-down hosts.
    pub fn none() -> Self {
        Self {
            pdf_reader: Availability::Unavailable("not probed".into()),
            html_engine: Availability::Unavailable("not probed".into()),
        }
    }
}

/// Platform file name of the pdfium library, e.g. `libpdfium.so`.
pub fn pdfium_library_name() -> String {
    format!(
        "{}pdfium{}",
        std::env::consts::DLL_PREFIX,
        std::env::consts::DLL_SUFFIX
    )
}

fn probe_pdfium(configured: Option<&Path>) -> Availability<PdfiumLibrary> {
    let library = match configured {
        Some(p) if p.is_dir() => PdfiumLibrary::File(p.join(pdfium_library_name())),
        Some(p) => PdfiumLibrary::File(p.to_path_buf()),
        None => PdfiumLibrary::System,
    };
    match library.bind() {
        Ok(_) => {
            debug!("pdfium bound from {}", library);
            Availability::Available(library)
        }
        Err(e) => Availability::Unavailable(format!("cannot bind pdfium ({library}): {e}")),
    }
}

fn probe_browser(configured: Option<&Path>) -> Availability<PathBuf> {
    if let Some(path) = configured {
        return if path.is_file() {
            Availability::Available(path.to_path_buf())
        } else {
            Availability::Unavailable(format!("browser not found at '{}'", path.display()))
        };
    }

    let Some(search_path) = std::env::var_os("PATH") else {
        return Availability::Unavailable("PATH is not set".into());
    };
    find_in_path(BROWSER_CANDIDATES, &search_path)
        .map(Availability::Available)
        .unwrap_or_else(|| {
            Availability::Unavailable(format!(
                "none of {} found on PATH",
                BROWSER_CANDIDATES.join(", ")
            ))
        })
}

/// First `dir/name` (with the platform executable suffix) that is a file.
fn find_in_path(names: &[&str], search_path: &std::ffi::OsStr) -> Option<PathBuf> {
    let dirs: Vec<PathBuf> = std::env::split_paths(search_path).collect();
    names.iter().find_map(|name| {
        let file = format!("{}{}", name, std::env::consts::EXE_SUFFIX);
        dirs.iter().map(|d| d.join(&file)).find(|p| p.is_file())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_in_path_respects_candidate_order() {
        let dir = tempfile::tempdir().unwrap();
        let exe = |n: &str| format!("{}{}", n, std::env::consts::EXE_SUFFIX);
        std::fs::write(dir.path().join(exe("chrome")), b"").unwrap();
        std::fs::write(dir.path().join(exe("chromium")), b"").unwrap();

        let search = std::env::join_paths([dir.path()]).unwrap();
        let found = find_in_path(BROWSER_CANDIDATES, &search).unwrap();
        assert_eq!(found, dir.path().join(exe("chromium")));
    }

    #[test]
    fn find_in_path_misses_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let search = std::env::join_paths([dir.path()]).unwrap();
        assert!(find_in_path(BROWSER_CANDIDATES, &search).is_none());
    }

    #[test]
    fn configured_browser_must_exist() {
        let avail = probe_browser(Some(Path::new("/definitely/not/chromium")));
        assert!(!avail.is_available());
    }

    #[test]
    fn disable_primary_marks_engine_unavailable() {
        let config = ConversionConfig::builder().disable_primary(true).build().unwrap();
        let caps = Capabilities::probe(&config);
        assert_eq!(
            caps.html_engine,
            Availability::Unavailable("disabled by configuration".into())
        );
    }

    #[test]
    fn missing_pdfium_file_is_unavailable() {
        let avail = probe_pdfium(Some(Path::new("/definitely/not/libpdfium.so")));
        assert!(!avail.is_available());
    }

    #[test]
    fn library_name_mentions_pdfium() {
        assert!(pdfium_library_name().contains("pdfium"));
    }
}
