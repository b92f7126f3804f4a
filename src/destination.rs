//! Destination path resolution.
//!
//! A preset names where its output goes in one of two shapes:
//!
//! - `destination = "generated_img"`: every matched file lands in that one
//!   directory ([`DestinationPolicy::Flat`]). Nested sources are flattened.
//! - `destination_subfolder = "thumbs"`: each file lands in a subfolder of
//!   its own directory ([`DestinationPolicy::SourceRelative`]), so a nested
//!   source tree produces a parallel nested output tree.
//!
//! Resolved directories are relative to the output root. The file name is
//! always the source's base name; a command that changes the pixel format
//! does not rewrite the extension.

use serde::Serialize;
use std::path::{Path, PathBuf};

/// Where a preset writes its output, relative to the output root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "policy", content = "dir", rename_all = "snake_case")]
pub enum DestinationPolicy {
    /// One directory for every file of the preset.
    Flat(PathBuf),
    /// A subfolder under each source file's own directory.
    SourceRelative(PathBuf),
}

/// Output directory for `source_file`, relative to the output root.
///
/// For [`DestinationPolicy::SourceRelative`] the project root is stripped
/// from the file's parent by whole components only, so `/site` never
/// matches inside `/site-old`. A parent outside the project root is kept
/// as is.
pub fn destination_dir(
    project_root: &Path,
    source_file: &Path,
    policy: &DestinationPolicy,
) -> PathBuf {
    match policy {
        DestinationPolicy::Flat(dir) => dir.clone(),
        DestinationPolicy::SourceRelative(sub) => {
            let parent = source_file.parent().unwrap_or(Path::new(""));
            let relative = parent.strip_prefix(project_root).unwrap_or(parent);
            relative.join(sub)
        }
    }
}

/// Full output path for `source_file`, relative to the output root.
pub fn relative_destination(
    project_root: &Path,
    source_file: &Path,
    policy: &DestinationPolicy,
) -> PathBuf {
    let dir = destination_dir(project_root, source_file, policy);
    match source_file.file_name() {
        Some(name) => dir.join(name),
        None => dir,
    }
}
