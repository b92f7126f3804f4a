//! Source discovery.
//!
//! Walks `<source_root>/<preset.source>` recursively and collects the image
//! files a preset applies to:
//!
//! - regular files only (symlinked directories are not followed)
//! - file name ending in `.png`, `.jpg`, `.jpeg` or `.gif`, case-sensitive
//! - when the preset sets `source_subfolder`, the full path must also match
//!   that pattern somewhere
//!
//! Results are sorted so passes, logs and reports are deterministic.

use crate::imaging::supported_extensions;
use crate::preset::PathConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("source directory not found: {}", .0.display())]
    SourceNotFound(PathBuf),
}

/// Collect the source files for one preset, sorted.
pub fn scan_sources(source_root: &Path, paths: &PathConfig) -> Result<Vec<PathBuf>, ScanError> {
    let scan_root = source_root.join(&paths.source);
    if !scan_root.is_dir() {
        return Err(ScanError::SourceNotFound(scan_root));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(&scan_root)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry under {}", scan_root.display());
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| has_image_extension(path))
        .filter(|path| match &paths.source_filter {
            Some(filter) => filter.is_match(&path.to_string_lossy()),
            None => true,
        })
        .collect();

    files.sort();
    tracing::debug!(count = files.len(), root = %scan_root.display(), "scanned sources");
    Ok(files)
}

/// Whether the file name ends in one of the supported extensions.
///
/// Case-sensitive: `logo.PNG` is not picked up.
pub fn has_image_extension(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    supported_extensions()
        .any(|ext| name.len() > ext.len() + 1 && name.ends_with(&format!(".{ext}")))
}
