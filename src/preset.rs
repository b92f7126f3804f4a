//! Preset splitting.
//!
//! A preset table mixes two kinds of keys: four path-control keys that say
//! where to read and write, and everything else, which is an image command
//! applied in declaration order. [`split_preset`] separates them without
//! touching the input table, so the same config can be split again on the
//! next pass.
//!
//! ```toml
//! [presets.thumbs]
//! source = "img"                 # path key (required)
//! destination = "generated_img"  # path key
//! resize = "100x100"             # command
//! quality = 80                   # command, scalar stringified to "80"
//! ```

use crate::config::ConfigError;
use crate::destination::DestinationPolicy;
use crate::imaging::{CommandMapping, parse_commands};
use regex::Regex;
use std::path::PathBuf;

/// Keys that control paths and never reach the image backend.
pub const PATH_KEYS: [&str; 4] = [
    "source",
    "source_subfolder",
    "destination",
    "destination_subfolder",
];

/// Where a preset reads its sources and writes its output.
#[derive(Debug, Clone)]
pub struct PathConfig {
    /// Directory to scan, relative to the project source root.
    pub source: String,
    /// Pattern the full source path must match, when set.
    pub source_filter: Option<Regex>,
    pub destination: DestinationPolicy,
}

/// Split a preset table into its path settings and its ordered commands.
///
/// `destination_subfolder` wins over `destination` when both are present.
/// Array or table values anywhere in the preset are rejected.
pub fn split_preset(
    name: &str,
    preset: &toml::Value,
) -> Result<(PathConfig, CommandMapping), ConfigError> {
    let table = preset
        .as_table()
        .ok_or_else(|| ConfigError::Preset(format!("'{name}' must be a table")))?;

    let path_value = |key: &str| -> Result<Option<String>, ConfigError> {
        match table.get(key) {
            None => Ok(None),
            Some(toml::Value::String(s)) if !s.trim().is_empty() => Ok(Some(s.clone())),
            Some(_) => Err(ConfigError::Preset(format!(
                "'{name}': {key} must be a non-empty string"
            ))),
        }
    };

    let source = path_value("source")?
        .ok_or_else(|| ConfigError::Preset(format!("'{name}': missing source")))?;

    let source_filter = path_value("source_subfolder")?
        .map(|pattern| {
            Regex::new(&pattern).map_err(|e| {
                ConfigError::Preset(format!("'{name}': bad source_subfolder pattern: {e}"))
            })
        })
        .transpose()?;

    let destination = match (path_value("destination_subfolder")?, path_value("destination")?) {
        (Some(sub), _) => DestinationPolicy::SourceRelative(PathBuf::from(sub)),
        (None, Some(dir)) => DestinationPolicy::Flat(PathBuf::from(dir)),
        (None, None) => {
            return Err(ConfigError::Preset(format!(
                "'{name}': missing destination"
            )));
        }
    };

    let mut commands = CommandMapping::new();
    for (key, value) in table {
        if PATH_KEYS.contains(&key.as_str()) {
            continue;
        }
        let argument = scalar_argument(value).ok_or_else(|| {
            ConfigError::Preset(format!("'{name}': {key} must be a single value"))
        })?;
        commands.push(key.as_str(), argument);
    }

    Ok((
        PathConfig {
            source,
            source_filter,
            destination,
        },
        commands,
    ))
}

/// Split a preset and check its commands against the command table.
pub fn resolve_preset(
    name: &str,
    preset: &toml::Value,
) -> Result<(PathConfig, CommandMapping), ConfigError> {
    let (paths, commands) = split_preset(name, preset)?;
    parse_commands(&commands)?;
    Ok((paths, commands))
}

fn scalar_argument(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        toml::Value::Datetime(d) => Some(d.to_string()),
        toml::Value::Array(_) | toml::Value::Table(_) => None,
    }
}
