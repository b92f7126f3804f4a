//! Generation pass orchestration.
//!
//! Drives every configured preset through the pipeline:
//!
//! ```text
//! config.toml ─► preset (declared order)
//!                  ├─ split + validate commands   ─► Configuration diagnostic, skip preset
//!                  ├─ scan <source>/<preset.source> ─► SourceNotFound diagnostic, skip preset
//!                  ├─ resolve destinations, clone commands
//!                  └─ per destination (rayon), files sharing it in scan order:
//!                       claim in cache ─► fresh: skip
//!                       transform + write ─► Transformation / Write diagnostic, skip file
//!                  register generated + fresh artifacts (scan order)
//! ```
//!
//! Nothing here aborts a pass. Every problem becomes a [`ProcessError`] in
//! [`ProcessResult::diagnostics`] and a `tracing` warning; the caller
//! decides whether any of them is fatal.
//!
//! ## Parallel Processing
//!
//! Presets run one after another. Files within a preset run on rayon's
//! global pool (sized by `[processing] max_processes`). Progress events are
//! sent from the workers as each file finishes, so their order within a
//! preset is not deterministic; the result and the registry are.
//!
//! Under a flat destination, two sources with the same file name (say
//! `img/a/logo.png` and `img/b/logo.png`) map to one output. Such files are
//! written one after another in scan order on a single worker, so the last
//! one scanned deterministically wins, and a warning names them all.

use crate::artifact::{ArtifactError, ArtifactRegistry, ImageArtifact, WriteOutcome};
use crate::cache::{MtimeCache, PassStats};
use crate::config::{BuildConfig, ConfigError, resolve_project_root};
use crate::destination::DestinationPolicy;
use crate::imaging::{BackendError, CommandMapping, ImageBackend, RustBackend};
use crate::preset::resolve_preset;
use crate::scan::{ScanError, scan_sources};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("preset '{preset}': {source}")]
    Configuration {
        preset: String,
        #[source]
        source: ConfigError,
    },
    #[error("preset '{preset}': source directory not found: {}", .path.display())]
    SourceNotFound { preset: String, path: PathBuf },
    #[error("preset '{preset}': failed to transform {}: {source}", .source_path.display())]
    Transformation {
        preset: String,
        source_path: PathBuf,
        #[source]
        source: BackendError,
    },
    #[error("preset '{preset}': failed to write {}: {source}", .destination.display())]
    Write {
        preset: String,
        destination: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ProcessError {
    pub fn preset(&self) -> &str {
        match self {
            Self::Configuration { preset, .. }
            | Self::SourceNotFound { preset, .. }
            | Self::Transformation { preset, .. }
            | Self::Write { preset, .. } => preset,
        }
    }

    fn from_artifact(preset: &str, err: ArtifactError) -> Self {
        match err {
            ArtifactError::Transform { path, source } => Self::Transformation {
                preset: preset.to_string(),
                source_path: path,
                source,
            },
            ArtifactError::Write { path, source } => Self::Write {
                preset: preset.to_string(),
                destination: path,
                source,
            },
        }
    }
}

/// What happened to one artifact in a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactStatus {
    Generated,
    Fresh,
    Failed(String),
}

/// Progress events emitted during a pass.
#[derive(Debug, Clone)]
pub enum ProcessEvent {
    /// A preset resolved and scanned; its files are about to be processed.
    PresetStarted { name: String, file_count: usize },
    /// One file of a preset finished. `index` is its 1-based scan position.
    ArtifactProcessed {
        index: usize,
        preset: String,
        source_path: PathBuf,
        destination: PathBuf,
        status: ArtifactStatus,
    },
    /// A preset was not processed at all.
    PresetSkipped { name: String, reason: String },
}

/// One artifact's line in the pass result.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactReport {
    pub preset: String,
    pub source_path: PathBuf,
    /// Relative to the output root.
    pub destination: PathBuf,
    pub status: ArtifactStatus,
}

/// Everything a pass produced besides the files themselves.
#[derive(Debug, Default)]
pub struct ProcessResult {
    /// Every artifact attempted, in preset then scan order.
    pub artifacts: Vec<ArtifactReport>,
    pub diagnostics: Vec<ProcessError>,
    pub stats: PassStats,
}

impl ProcessResult {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Run one pass with the built-in image backend.
pub fn process(
    config: &BuildConfig,
    project_root: &Path,
    cache: &MtimeCache,
    registry: &mut impl ArtifactRegistry,
    progress: Option<Sender<ProcessEvent>>,
) -> ProcessResult {
    let backend = RustBackend::new();
    process_with_backend(&backend, config, project_root, cache, registry, progress)
}

/// Run one pass using a specific backend (allows testing with mock).
pub fn process_with_backend(
    backend: &impl ImageBackend,
    config: &BuildConfig,
    project_root: &Path,
    cache: &MtimeCache,
    registry: &mut impl ArtifactRegistry,
    progress: Option<Sender<ProcessEvent>>,
) -> ProcessResult {
    let mut result = ProcessResult::default();
    let Some(presets) = &config.presets else {
        tracing::debug!("no presets configured");
        return result;
    };

    let project_root = resolve_project_root(project_root);
    let source_root = config.source_root(&project_root);
    let output_root = config.output_root(&project_root);
    let emit = |event: ProcessEvent| {
        if let Some(tx) = &progress {
            // The receiver going away only silences progress.
            tx.send(event).ok();
        }
    };

    for (name, preset) in presets {
        let (paths, commands) = match resolve_preset(name, preset) {
            Ok(resolved) => resolved,
            Err(source) => {
                tracing::warn!(preset = %name, error = %source, "skipping preset");
                emit(ProcessEvent::PresetSkipped {
                    name: name.clone(),
                    reason: source.to_string(),
                });
                result.diagnostics.push(ProcessError::Configuration {
                    preset: name.clone(),
                    source,
                });
                continue;
            }
        };

        let files = match scan_sources(&source_root, &paths) {
            Ok(files) => files,
            Err(ScanError::SourceNotFound(path)) => {
                tracing::warn!(preset = %name, path = %path.display(), "source directory not found");
                emit(ProcessEvent::PresetSkipped {
                    name: name.clone(),
                    reason: format!("source directory not found: {}", path.display()),
                });
                result.diagnostics.push(ProcessError::SourceNotFound {
                    preset: name.clone(),
                    path,
                });
                continue;
            }
        };

        tracing::info!(preset = %name, files = files.len(), "processing preset");
        emit(ProcessEvent::PresetStarted {
            name: name.clone(),
            file_count: files.len(),
        });

        let artifacts: Vec<ImageArtifact> = files
            .iter()
            .map(|file| {
                ImageArtifact::new(
                    name,
                    &project_root,
                    &output_root,
                    file,
                    &paths.destination,
                    &commands,
                )
            })
            .collect();

        let groups = group_by_destination(&artifacts);
        for group in groups.iter().filter(|g| g.len() > 1) {
            let sources: Vec<String> = group
                .iter()
                .map(|&i| artifacts[i].source_path().display().to_string())
                .collect();
            tracing::warn!(
                preset = %name,
                destination = %artifacts[group[0]].relative_destination().display(),
                sources = %sources.join(", "),
                "sources share a destination, the last one wins"
            );
        }

        let shared = &artifacts;
        let mut outcomes: Vec<(usize, Result<WriteOutcome, ArtifactError>)> = groups
            .par_iter()
            .flat_map_iter(move |group| group.iter().map(move |&i| (i, &shared[i])))
            .map(|(i, artifact)| {
                let outcome = artifact.write(backend, cache);
                tracing::debug!(
                    preset = %name,
                    source = %artifact.source_path().display(),
                    ?outcome,
                    "artifact processed"
                );
                emit(ProcessEvent::ArtifactProcessed {
                    index: i + 1,
                    preset: name.clone(),
                    source_path: artifact.source_path().to_path_buf(),
                    destination: artifact.relative_destination().to_path_buf(),
                    status: status_of(&outcome),
                });
                (i, outcome)
            })
            .collect();
        outcomes.sort_by_key(|(i, _)| *i);

        for (artifact, (_, outcome)) in artifacts.into_iter().zip(outcomes) {
            let status = status_of(&outcome);
            result.artifacts.push(ArtifactReport {
                preset: name.clone(),
                source_path: artifact.source_path().to_path_buf(),
                destination: artifact.relative_destination().to_path_buf(),
                status,
            });
            match outcome {
                Ok(WriteOutcome::Generated) => {
                    result.stats.generated();
                    registry.register(artifact);
                }
                Ok(WriteOutcome::Fresh) => {
                    result.stats.fresh();
                    registry.register(artifact);
                }
                Err(err) => {
                    tracing::warn!(preset = %name, error = %err, "artifact failed");
                    result.stats.failed();
                    result.diagnostics.push(ProcessError::from_artifact(name, err));
                }
            }
        }
    }

    result
}

/// Indices of `artifacts` grouped by destination path. Groups keep scan
/// order inside and between them.
fn group_by_destination(artifacts: &[ImageArtifact]) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut by_path: HashMap<&Path, usize> = HashMap::new();
    for (i, artifact) in artifacts.iter().enumerate() {
        match by_path.entry(artifact.destination_path()) {
            Entry::Occupied(slot) => groups[*slot.get()].push(i),
            Entry::Vacant(slot) => {
                slot.insert(groups.len());
                groups.push(vec![i]);
            }
        }
    }
    groups
}

fn status_of(outcome: &Result<WriteOutcome, ArtifactError>) -> ArtifactStatus {
    match outcome {
        Ok(WriteOutcome::Generated) => ArtifactStatus::Generated,
        Ok(WriteOutcome::Fresh) => ArtifactStatus::Fresh,
        Err(e) => ArtifactStatus::Failed(e.to_string()),
    }
}

/// A preset that resolved and scanned cleanly.
#[derive(Debug, Clone)]
pub struct PresetSummary {
    pub files: usize,
    pub destination: DestinationPolicy,
    pub commands: CommandMapping,
}

/// Result of checking one preset without generating anything.
#[derive(Debug)]
pub struct PresetCheck {
    pub name: String,
    pub status: Result<PresetSummary, ProcessError>,
}

/// Resolve and scan every preset, writing nothing.
pub fn check(config: &BuildConfig, project_root: &Path) -> Vec<PresetCheck> {
    let Some(presets) = &config.presets else {
        return Vec::new();
    };
    let source_root = config.source_root(&resolve_project_root(project_root));

    presets
        .iter()
        .map(|(name, preset)| {
            let status = resolve_preset(name, preset)
                .map_err(|source| ProcessError::Configuration {
                    preset: name.clone(),
                    source,
                })
                .and_then(|(paths, commands)| match scan_sources(&source_root, &paths) {
                    Ok(files) => Ok(PresetSummary {
                        files: files.len(),
                        destination: paths.destination,
                        commands,
                    }),
                    Err(ScanError::SourceNotFound(path)) => Err(ProcessError::SourceNotFound {
                        preset: name.clone(),
                        path,
                    }),
                });
            PresetCheck {
                name: name.clone(),
                status,
            }
        })
        .collect()
}
