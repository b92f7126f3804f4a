//! Build configuration module.
//!
//! Handles loading and validating `config.toml` from the project root. The
//! file is optional: without it every default applies and, since there are
//! no presets, a generation pass does nothing.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! source = "."            # Project source root, relative to the project root
//! destination = "_site"   # Output root, relative to the project root
//!
//! [processing]
//! max_processes = 4       # Max parallel workers (omit for auto = CPU cores)
//!
//! [presets.thumbs]        # One table per preset, processed in file order
//! source = "img"
//! destination = "generated_img"
//! resize = "100x100"      # Every other key is a command, applied in order
//! ```
//!
//! Preset tables are kept raw here and split into path settings and commands
//! by [`preset::split_preset`](crate::preset::split_preset), so a broken
//! preset only disables itself. Unknown top-level keys are rejected to catch
//! typos early.

use crate::imaging::BackendError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Name of the config file in the project root.
pub const CONFIG_FILENAME: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("invalid preset: {0}")]
    Preset(String),
    #[error("invalid command: {0}")]
    Command(#[from] BackendError),
}

/// Build configuration loaded from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Project source root, relative to the project root.
    pub source: String,
    /// Output root, relative to the project root.
    pub destination: String,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
    /// Raw preset tables by name, in declaration order. `None` when the
    /// config has no `[presets]` at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presets: Option<toml::Table>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            source: ".".to_string(),
            destination: "_site".to_string(),
            processing: ProcessingConfig::default(),
            presets: None,
        }
    }
}

impl BuildConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source.trim().is_empty() {
            return Err(ConfigError::Validation("source must not be empty".into()));
        }
        if self.destination.trim().is_empty() {
            return Err(ConfigError::Validation(
                "destination must not be empty".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Absolute project source root for a project root.
    pub fn source_root(&self, project_root: &Path) -> PathBuf {
        normalize(&project_root.join(&self.source))
    }

    /// Absolute output root for a project root.
    pub fn output_root(&self, project_root: &Path) -> PathBuf {
        normalize(&project_root.join(&self.destination))
    }

    /// Number of configured presets (zero when the key is absent).
    pub fn preset_count(&self) -> usize {
        self.presets.as_ref().map_or(0, |p| p.len())
    }
}

/// Absolute, `.`-free form of a project root, so every path derived from
/// it (sources, outputs, source-relative destinations) shares one prefix.
///
/// Symlinks are left alone. If the working directory cannot be read the
/// root is only normalized.
pub fn resolve_project_root(project_root: &Path) -> PathBuf {
    match std::path::absolute(project_root) {
        Ok(root) => normalize(&root),
        Err(e) => {
            tracing::warn!(
                root = %project_root.display(),
                error = %e,
                "cannot make project root absolute"
            );
            normalize(project_root)
        }
    }
}

/// Drop `.` components so `root/./img` and `root/img` are the same path.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image processing workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Parse and validate config text.
pub fn parse_config(content: &str) -> Result<BuildConfig, ConfigError> {
    let config: BuildConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load `config.toml` from the project root.
///
/// A missing file yields the defaults; an unreadable or invalid one is an error.
pub fn load_config(root: &Path) -> Result<BuildConfig, ConfigError> {
    let config_path = root.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(BuildConfig::default());
    }
    let content = fs::read_to_string(&config_path)?;
    parse_config(&content)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# imgpreset configuration
# =======================
# All settings are optional. Values shown below are the defaults, except
# for the example preset. Unknown top-level keys cause an error.

# Project source root, relative to the directory holding this file.
source = "."

# Output root, relative to the directory holding this file.
destination = "_site"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# ---------------------------------------------------------------------------
# Presets
# ---------------------------------------------------------------------------
# One table per preset; presets run in the order they appear here.
#
# Path keys:
#   source                 directory under the source root to scan (required)
#   destination            output directory under the output root, shared by
#                          every matched file
#   destination_subfolder  instead of `destination`: write next to each source
#                          file, into this subfolder of its directory
#   source_subfolder       regex the full source path must match
#
# Every other key is a command, applied in the order written:
#   resize / thumbnail  geometry: 100x100, 640x, x480, 100x100^ (cover),
#                       100x100! (exact), 100x100> (shrink only), 50%
#   crop / extent       geometry with offsets: 100x100+10+10
#   gravity             NorthWest (default), North, NorthEast, West, Center,
#                       East, SouthWest, South, SouthEast
#   rotate              90, 180, 270
#   flip / flop         mirror vertically / horizontally
#   blur / sharpen      sigma, e.g. 1.5 or 0x1.5
#   colorspace          Gray or sRGB
#   quality             JPEG quality 1-100 (default 90)
#   strip               accepted, no effect (metadata is never written)
#
# Only png, jpg, jpeg and gif sources are picked up.

[presets.thumbnails]
source = "img"
destination = "generated_img"
resize = "100x100"
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = BuildConfig::default();
        assert_eq!(config.source, ".");
        assert_eq!(config.destination, "_site");
        assert_eq!(config.processing.max_processes, None);
        assert!(config.presets.is_none());
        assert_eq!(config.preset_count(), 0);
    }

    #[test]
    fn parse_partial_config() {
        let config = parse_config(r#"destination = "public""#).unwrap();
        assert_eq!(config.destination, "public");
        // Defaults preserved
        assert_eq!(config.source, ".");
        assert!(config.presets.is_none());
    }

    #[test]
    fn presets_keep_declaration_order() {
        let config = parse_config(
            r#"
[presets.zeta]
source = "a"
destination = "b"

[presets.alpha]
source = "c"
destination = "d"

[presets.mid]
source = "e"
destination = "f"
"#,
        )
        .unwrap();

        let names: Vec<&str> = config
            .presets
            .as_ref()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn preset_commands_keep_declaration_order() {
        let config = parse_config(
            r#"
[presets.p]
source = "img"
sharpen = 1
destination = "out"
resize = "100x100"
crop = "50x50"
"#,
        )
        .unwrap();

        let preset = config.presets.as_ref().unwrap()["p"].as_table().unwrap();
        let keys: Vec<&str> = preset.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["source", "sharpen", "destination", "resize", "crop"]
        );
    }

    #[test]
    fn unknown_keys_rejected() {
        let result = parse_config(r#"mini_magic = 1"#);
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn zero_max_processes_rejected() {
        let result = parse_config("[processing]\nmax_processes = 0\n");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn empty_destination_rejected() {
        let result = parse_config(r#"destination = """#);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.destination, "_site");
        assert!(config.presets.is_none());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            r#"
source = "site"

[presets.thumbs]
source = "img"
destination = "generated_img"
resize = "100x100"
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.source, "site");
        assert_eq!(config.preset_count(), 1);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILENAME), "presets = [").unwrap();
        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn roots_drop_current_dir_components() {
        let config = BuildConfig::default();
        let root = Path::new("/project");
        assert_eq!(config.source_root(root), PathBuf::from("/project"));
        assert_eq!(config.output_root(root), PathBuf::from("/project/_site"));
    }

    #[test]
    fn relative_project_root_becomes_absolute() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(resolve_project_root(Path::new(".")), cwd);
        assert_eq!(resolve_project_root(Path::new("./site")), cwd.join("site"));
        assert_eq!(
            resolve_project_root(Path::new("/project/./site/.")),
            PathBuf::from("/project/site")
        );
    }

    #[test]
    fn stock_config_parses() {
        let config = parse_config(stock_config_toml()).unwrap();
        assert_eq!(config.source, ".");
        assert_eq!(config.destination, "_site");
        assert_eq!(config.preset_count(), 1);
    }

    #[test]
    fn effective_threads_caps_at_cores() {
        let cores = effective_threads(&ProcessingConfig::default());
        assert!(cores >= 1);
        let capped = effective_threads(&ProcessingConfig {
            max_processes: Some(usize::MAX),
        });
        assert_eq!(capped, cores);
        let one = effective_threads(&ProcessingConfig {
            max_processes: Some(1),
        });
        assert_eq!(one, 1);
    }
}
