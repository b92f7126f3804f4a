//! Image artifacts: one source file paired with one preset.
//!
//! An artifact fixes its destination when it is created and carries its own
//! copy of the preset's commands. Artifacts of the same preset are built
//! from one shared [`CommandMapping`] and each clones it, so adjusting one
//! artifact's commands never leaks into a sibling.
//!
//! [`ImageArtifact::write`] is the only place pixels move: it consults the
//! staleness cache, runs the backend, creates the destination directory and
//! writes the bytes. Generated and fresh artifacts are then handed to an
//! [`ArtifactRegistry`], the host's output stage.

use crate::cache::{Freshness, MtimeCache};
use crate::destination::{DestinationPolicy, relative_destination};
use crate::imaging::{BackendError, CommandMapping, ImageBackend};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("failed to transform {}: {source}", .path.display())]
    Transform {
        path: PathBuf,
        #[source]
        source: BackendError,
    },
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result of a successful [`ImageArtifact::write`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteOutcome {
    /// The backend ran and the destination was (over)written.
    Generated,
    /// The destination was up to date; nothing was written.
    Fresh,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageArtifact {
    preset: String,
    source_path: PathBuf,
    relative_destination: PathBuf,
    destination_path: PathBuf,
    commands: CommandMapping,
}

impl ImageArtifact {
    /// Resolve the destination for `source_path` and clone `commands`.
    pub fn new(
        preset: &str,
        project_root: &Path,
        output_root: &Path,
        source_path: &Path,
        policy: &DestinationPolicy,
        commands: &CommandMapping,
    ) -> Self {
        let relative_destination = relative_destination(project_root, source_path, policy);
        let destination_path = output_root.join(&relative_destination);
        Self {
            preset: preset.to_string(),
            source_path: source_path.to_path_buf(),
            relative_destination,
            destination_path,
            commands: commands.clone(),
        }
    }

    pub fn preset(&self) -> &str {
        &self.preset
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Destination relative to the output root.
    pub fn relative_destination(&self) -> &Path {
        &self.relative_destination
    }

    pub fn destination_path(&self) -> &Path {
        &self.destination_path
    }

    pub fn commands(&self) -> &CommandMapping {
        &self.commands
    }

    /// This artifact's private command list.
    pub fn commands_mut(&mut self) -> &mut CommandMapping {
        &mut self.commands
    }

    /// Generate the destination if the cache says it is stale.
    ///
    /// The source's mtime is recorded before the backend runs. On failure
    /// the record is dropped again so the next pass retries the file.
    pub fn write(
        &self,
        backend: &impl ImageBackend,
        cache: &MtimeCache,
    ) -> Result<WriteOutcome, ArtifactError> {
        let freshness = cache
            .claim(&self.source_path, &self.destination_path)
            .map_err(|e| self.transform_error(BackendError::Io(e)))?;
        if freshness == Freshness::Fresh {
            return Ok(WriteOutcome::Fresh);
        }

        let result = self.generate(backend);
        if result.is_err() {
            cache.forget(&self.source_path);
        }
        result.map(|()| WriteOutcome::Generated)
    }

    fn generate(&self, backend: &impl ImageBackend) -> Result<(), ArtifactError> {
        let bytes = backend
            .apply(&self.source_path, &self.commands)
            .map_err(|e| self.transform_error(e))?;

        if let Some(parent) = self.destination_path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.write_error(e))?;
        }
        fs::write(&self.destination_path, bytes).map_err(|e| self.write_error(e))
    }

    fn transform_error(&self, source: BackendError) -> ArtifactError {
        ArtifactError::Transform {
            path: self.source_path.clone(),
            source,
        }
    }

    fn write_error(&self, source: io::Error) -> ArtifactError {
        ArtifactError::Write {
            path: self.destination_path.clone(),
            source,
        }
    }
}

/// The host's output stage: receives every artifact that is present on
/// disk after a pass, whether generated now or already fresh.
pub trait ArtifactRegistry {
    fn register(&mut self, artifact: ImageArtifact);
}

impl ArtifactRegistry for Vec<ImageArtifact> {
    fn register(&mut self, artifact: ImageArtifact) {
        self.push(artifact);
    }
}
