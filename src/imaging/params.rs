//! Parameter types for image commands.
//!
//! These describe *what* a command asks for, not how pixels get there. The
//! [`commands`](super::commands) module parses raw preset arguments into them
//! and the backend consumes them.
//!
//! - [`Quality`]: lossy encoding quality (1–100, default 90).
//! - [`Rotation`]: right-angle rotation.
//! - [`Colorspace`]: target colour model.

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    /// Parse an explicit quality argument. Out-of-range values are rejected
    /// rather than clamped so a typo in a preset gets reported.
    pub fn parse(value: &str) -> Option<Self> {
        value
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|q| (1..=100).contains(q))
            .map(Self)
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Clockwise rotation in quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    None,
    Quarter,
    Half,
    ThreeQuarter,
}

impl Rotation {
    /// Parse degrees. Negative and >360 values wrap; only multiples of 90
    /// are representable without resampling.
    pub fn from_degrees(value: &str) -> Option<Self> {
        let degrees: f64 = value.trim().parse().ok()?;
        if !degrees.is_finite() {
            return None;
        }
        let turned = degrees.rem_euclid(360.0);
        match turned {
            d if d == 0.0 => Some(Self::None),
            d if d == 90.0 => Some(Self::Quarter),
            d if d == 180.0 => Some(Self::Half),
            d if d == 270.0 => Some(Self::ThreeQuarter),
            _ => None,
        }
    }
}

/// Target colour model for the `colorspace` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Colorspace {
    Gray,
    Rgb,
}

impl Colorspace {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gray" | "grey" => Some(Self::Gray),
            "rgb" | "srgb" => Some(Self::Rgb),
            _ => None,
        }
    }
}
