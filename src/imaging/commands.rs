//! The closed command table.
//!
//! A preset's commands arrive as an ordered list of `(name, argument)` string
//! pairs ([`CommandMapping`]). Each pair is parsed into a typed [`Command`]
//! here, before any pixels are touched, so an unknown name or a malformed
//! argument is reported as such instead of surfacing as a late failure.
//!
//! | Command | Argument | Effect |
//! |---|---|---|
//! | `resize` | geometry | scale per the geometry flags |
//! | `thumbnail` | geometry | same as `resize` (metadata is never written) |
//! | `crop` | geometry with offsets | cut a region, anchored by `gravity` |
//! | `extent` | geometry with offsets | pad/cut onto a white canvas, anchored by `gravity` |
//! | `gravity` | `NorthWest` … `SouthEast`, `Center` | anchor for later `crop`/`extent` |
//! | `rotate` | degrees (multiple of 90) | clockwise rotation |
//! | `flip` | any (`false` disables) | mirror top↔bottom |
//! | `flop` | any (`false` disables) | mirror left↔right |
//! | `blur` | `sigma` or `RxS` | gaussian blur |
//! | `sharpen` | `sigma` or `RxS` | unsharp mask |
//! | `colorspace` | `Gray`, `sRGB` | convert colour model |
//! | `quality` | 1–100 | JPEG encoding quality |
//! | `strip` | ignored | no-op; output never carries metadata |
//!
//! See [`geometry`](super::geometry) for the geometry syntax.

use super::backend::BackendError;
use super::geometry::{Geometry, Gravity, MAX_EDGE, parse_geometry};
use super::params::{Colorspace, Quality, Rotation};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Every command name the backend understands.
pub const COMMAND_NAMES: &[&str] = &[
    "resize",
    "thumbnail",
    "crop",
    "extent",
    "gravity",
    "rotate",
    "flip",
    "flop",
    "blur",
    "sharpen",
    "colorspace",
    "quality",
    "strip",
];

/// Ordered `(command, argument)` pairs, applied front to back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandMapping {
    entries: Vec<(String, String)>,
}

impl CommandMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command. A name may repeat; each occurrence runs in turn.
    pub fn push(&mut self, name: impl Into<String>, argument: impl Into<String>) {
        self.entries.push((name.into(), argument.into()));
    }

    /// Replace the argument of the first `name` in place, or append it.
    pub fn set(&mut self, name: &str, argument: impl Into<String>) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, arg)) => *arg = argument.into(),
            None => self.push(name, argument),
        }
    }

    /// Remove every occurrence of `name`, returning the first argument.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let first = self.get(name).map(str::to_string);
        self.entries.retain(|(n, _)| n != name);
        first
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, arg)| arg.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, a)| (n.as_str(), a.as_str()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.iter().map(|(n, _)| n).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CommandMapping {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut mapping = Self::new();
        for (name, arg) in iter {
            mapping.push(name, arg);
        }
        mapping
    }
}

/// Serialized as a JSON/TOML map in application order.
impl Serialize for CommandMapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, arg) in &self.entries {
            map.serialize_entry(name, arg)?;
        }
        map.end()
    }
}

/// A validated image command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Resize(Geometry),
    Thumbnail(Geometry),
    Crop(Geometry),
    Extent(Geometry),
    Gravity(Gravity),
    Rotate(Rotation),
    Flip(bool),
    Flop(bool),
    Blur(f32),
    Sharpen(f32),
    Colorspace(Colorspace),
    Quality(Quality),
    Strip,
}

impl Command {
    /// Parse one `(name, argument)` pair against the command table.
    pub fn parse(name: &str, argument: &str) -> Result<Self, BackendError> {
        let invalid = |reason: &str| BackendError::InvalidArgument {
            command: name.to_string(),
            argument: argument.to_string(),
            reason: reason.to_string(),
        };
        let geometry = || {
            parse_geometry(argument).ok_or_else(|| {
                invalid(&format!(
                    "expected a geometry like 100x100, edges and offsets within {MAX_EDGE}"
                ))
            })
        };

        let command = match name {
            "resize" => Self::Resize(geometry()?),
            "thumbnail" => Self::Thumbnail(geometry()?),
            "crop" => Self::Crop(geometry()?),
            "extent" => Self::Extent(geometry()?),
            "gravity" => Self::Gravity(
                Gravity::parse(argument).ok_or_else(|| invalid("unknown gravity"))?,
            ),
            "rotate" => Self::Rotate(
                Rotation::from_degrees(argument)
                    .ok_or_else(|| invalid("only multiples of 90 degrees are supported"))?,
            ),
            "flip" => Self::Flip(is_enabled(argument)),
            "flop" => Self::Flop(is_enabled(argument)),
            "blur" => Self::Blur(
                parse_sigma(argument).ok_or_else(|| invalid("expected a positive sigma"))?,
            ),
            "sharpen" => Self::Sharpen(
                parse_sigma(argument).ok_or_else(|| invalid("expected a positive sigma"))?,
            ),
            "colorspace" => Self::Colorspace(
                Colorspace::parse(argument).ok_or_else(|| invalid("expected Gray or sRGB"))?,
            ),
            "quality" => Self::Quality(
                Quality::parse(argument).ok_or_else(|| invalid("expected an integer 1-100"))?,
            ),
            "strip" => Self::Strip,
            other => return Err(BackendError::UnknownCommand(other.to_string())),
        };
        Ok(command)
    }
}

/// Parse a whole mapping, stopping at the first rejected command.
pub fn parse_commands(mapping: &CommandMapping) -> Result<Vec<Command>, BackendError> {
    mapping
        .iter()
        .map(|(name, arg)| Command::parse(name, arg))
        .collect()
}

/// Switch-style commands run unless explicitly turned off.
fn is_enabled(argument: &str) -> bool {
    !matches!(
        argument.trim().to_ascii_lowercase().as_str(),
        "false" | "no" | "off" | "0"
    )
}

/// `1.5` or `0x1.5` (radius ignored) → sigma.
fn parse_sigma(argument: &str) -> Option<f32> {
    let sigma = match argument.trim().split_once(['x', 'X']) {
        Some((_, sigma)) => sigma,
        None => argument.trim(),
    };
    sigma
        .parse::<f32>()
        .ok()
        .filter(|s| s.is_finite() && *s > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::geometry::ResizeMode;

    fn mapping(pairs: &[(&str, &str)]) -> CommandMapping {
        pairs.iter().copied().collect()
    }

    // =========================================================================
    // CommandMapping
    // =========================================================================

    #[test]
    fn mapping_keeps_insertion_order() {
        let m = mapping(&[("resize", "100x100"), ("crop", "50x50"), ("quality", "80")]);
        assert_eq!(m.names(), vec!["resize", "crop", "quality"]);
    }

    #[test]
    fn set_replaces_in_place() {
        let mut m = mapping(&[("resize", "100x100"), ("quality", "80")]);
        m.set("resize", "50x50");
        assert_eq!(m.names(), vec!["resize", "quality"]);
        assert_eq!(m.get("resize"), Some("50x50"));

        m.set("rotate", "90");
        assert_eq!(m.names(), vec!["resize", "quality", "rotate"]);
    }

    #[test]
    fn remove_returns_first_argument() {
        let mut m = mapping(&[("blur", "1"), ("resize", "10x10"), ("blur", "2")]);
        assert_eq!(m.remove("blur"), Some("1".to_string()));
        assert_eq!(m.names(), vec!["resize"]);
        assert_eq!(m.remove("blur"), None);
    }

    #[test]
    fn clone_is_independent() {
        let original = mapping(&[("resize", "100x100")]);
        let mut copy = original.clone();
        copy.set("resize", "1x1");
        assert_eq!(original.get("resize"), Some("100x100"));
    }

    #[test]
    fn serializes_as_ordered_map() {
        let m = mapping(&[("resize", "100x100"), ("crop", "50x50+0+0")]);
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, r#"{"resize":"100x100","crop":"50x50+0+0"}"#);
    }

    // =========================================================================
    // Command::parse
    // =========================================================================

    #[test]
    fn parses_geometry_commands() {
        match Command::parse("resize", "100x100^").unwrap() {
            Command::Resize(g) => assert_eq!(g.mode, ResizeMode::Fill),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            Command::parse("crop", "10x10+1+1").unwrap(),
            Command::Crop(_)
        ));
    }

    #[test]
    fn unknown_command_is_rejected_by_name() {
        let err = Command::parse("explode", "1").unwrap_err();
        assert!(matches!(err, BackendError::UnknownCommand(ref n) if n == "explode"));
    }

    #[test]
    fn bad_argument_reports_command_and_argument() {
        let err = Command::parse("resize", "big").unwrap_err();
        match err {
            BackendError::InvalidArgument {
                command, argument, ..
            } => {
                assert_eq!(command, "resize");
                assert_eq!(argument, "big");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn oversized_geometry_is_an_argument_error() {
        for (name, arg) in [
            ("crop", "5x5+9223372036854775807+0"),
            ("extent", "5x5-9223372036854775808+0"),
            ("resize", "100000x100000!"),
        ] {
            let err = Command::parse(name, arg).unwrap_err();
            assert!(
                matches!(err, BackendError::InvalidArgument { ref command, .. } if command == name),
                "{name}={arg}: {err:?}"
            );
        }
    }

    #[test]
    fn switches_can_be_disabled() {
        assert_eq!(Command::parse("flip", "").unwrap(), Command::Flip(true));
        assert_eq!(Command::parse("flip", "true").unwrap(), Command::Flip(true));
        assert_eq!(Command::parse("flop", "false").unwrap(), Command::Flop(false));
    }

    #[test]
    fn sigma_accepts_radius_form() {
        assert_eq!(Command::parse("blur", "0x1.5").unwrap(), Command::Blur(1.5));
        assert_eq!(Command::parse("sharpen", "2").unwrap(), Command::Sharpen(2.0));
        assert!(Command::parse("blur", "0x0").is_err());
        assert!(Command::parse("blur", "-1").is_err());
    }

    #[test]
    fn every_listed_name_parses_with_a_sample_argument() {
        let samples = [
            ("resize", "10x10"),
            ("thumbnail", "10x10"),
            ("crop", "10x10"),
            ("extent", "10x10"),
            ("gravity", "center"),
            ("rotate", "90"),
            ("flip", ""),
            ("flop", ""),
            ("blur", "1"),
            ("sharpen", "1"),
            ("colorspace", "gray"),
            ("quality", "80"),
            ("strip", ""),
        ];
        assert_eq!(samples.len(), COMMAND_NAMES.len());
        for (name, arg) in samples {
            assert!(COMMAND_NAMES.contains(&name));
            Command::parse(name, arg).unwrap_or_else(|e| panic!("{name}: {e}"));
        }
    }

    #[test]
    fn parse_commands_stops_at_first_error() {
        let m = mapping(&[("resize", "10x10"), ("explode", ""), ("rotate", "45")]);
        assert!(matches!(
            parse_commands(&m),
            Err(BackendError::UnknownCommand(_))
        ));
        let ok = mapping(&[("resize", "10x10"), ("rotate", "90")]);
        assert_eq!(parse_commands(&ok).unwrap().len(), 2);
    }
}
