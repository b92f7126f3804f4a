//! Geometry arguments and the dimension math behind them.
//!
//! Commands like `resize`, `crop` and `extent` take a geometry string in the
//! familiar `WxH[+X+Y][flags]` shape:
//!
//! | Form | Meaning |
//! |---|---|
//! | `100x100` | fit inside the box, aspect preserved |
//! | `640x` / `x480` | fix one edge, scale the other |
//! | `100x100!` | exact size, aspect ignored |
//! | `100x100^` | cover the box (smaller edge matches) |
//! | `100x100>` | only shrink larger images |
//! | `100x100<` | only enlarge smaller images |
//! | `50%` / `50x25%` | scale by percentage |
//! | `200x100+10-5` | region with offsets (crop / extent) |
//!
//! Edges (pixels or percent) are capped at [`MAX_EDGE`] and offsets at
//! `±MAX_EDGE`, so a geometry never asks for a multi-gigabyte canvas and the
//! region math below cannot overflow.
//!
//! All functions here are pure and testable without any I/O or images.

/// Largest edge, percentage or offset magnitude a geometry may carry.
pub const MAX_EDGE: u32 = 16_384;

/// How a geometry's box constrains a resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeMode {
    Fit,
    Exact,
    Fill,
    ShrinkOnly,
    EnlargeOnly,
}

impl ResizeMode {
    fn from_flag(flag: char) -> Self {
        match flag {
            '!' => Self::Exact,
            '^' => Self::Fill,
            '>' => Self::ShrinkOnly,
            '<' => Self::EnlargeOnly,
            _ => Self::Fit,
        }
    }
}

/// A parsed geometry argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub x: i64,
    pub y: i64,
    pub mode: ResizeMode,
    /// Width and height are percentages rather than pixels.
    pub percent: bool,
}

/// Parse a geometry string. Returns `None` for anything malformed.
pub fn parse_geometry(input: &str) -> Option<Geometry> {
    let mut rest = input.trim();
    let mut mode = ResizeMode::Fit;
    let mut percent = false;

    // Trailing flags, in any order, each at most once
    while let Some(last) = rest.chars().last() {
        match last {
            '%' if !percent => percent = true,
            '!' | '^' | '>' | '<' if mode == ResizeMode::Fit => mode = ResizeMode::from_flag(last),
            '!' | '^' | '>' | '<' | '%' => return None,
            _ => break,
        }
        rest = &rest[..rest.len() - 1];
    }

    let (size, offsets) = match rest.find(['+', '-']) {
        Some(i) => rest.split_at(i),
        None => (rest, ""),
    };
    let (x, y) = parse_offsets(offsets)?;

    let (width, height) = match size.split_once(['x', 'X']) {
        Some((w, h)) => (parse_dimension(w)?, parse_dimension(h)?),
        None => (parse_dimension(size)?, None),
    };
    if width.is_none() && height.is_none() {
        return None;
    }

    Some(Geometry {
        width,
        height,
        x,
        y,
        mode,
        percent,
    })
}

/// `""` is an absent dimension; zero, garbage and edges over [`MAX_EDGE`]
/// are rejected.
fn parse_dimension(s: &str) -> Option<Option<u32>> {
    if s.is_empty() {
        return Some(None);
    }
    s.parse::<u32>()
        .ok()
        .filter(|&v| (1..=MAX_EDGE).contains(&v))
        .map(Some)
}

fn parse_offset(s: &str) -> Option<i64> {
    s.parse::<i64>()
        .ok()
        .filter(|v| v.unsigned_abs() <= u64::from(MAX_EDGE))
}

/// Parse `+X+Y` / `-X+Y` etc. An empty string means no offset.
fn parse_offsets(s: &str) -> Option<(i64, i64)> {
    if s.is_empty() {
        return Some((0, 0));
    }
    let split = s[1..].find(['+', '-'])? + 1;
    let x = parse_offset(&s[..split])?;
    let y = parse_offset(&s[split..])?;
    Some((x, y))
}

fn scale_edge(edge: u32, scale: f64) -> u32 {
    ((edge as f64 * scale).round() as u32).clamp(1, MAX_EDGE)
}

/// Calculate output dimensions for a resize of `source` by `geometry`.
///
/// # Examples
/// ```
/// # use imgpreset::imaging::geometry::{parse_geometry, resize_dimensions};
/// let g = parse_geometry("100x100").unwrap();
/// assert_eq!(resize_dimensions((200, 100), &g), (100, 50));
/// ```
pub fn resize_dimensions(source: (u32, u32), geometry: &Geometry) -> (u32, u32) {
    let (src_w, src_h) = source;
    if src_w == 0 || src_h == 0 {
        return source;
    }

    if geometry.percent {
        let pct_w = geometry.width.or(geometry.height).unwrap_or(100);
        let pct_h = geometry.height.unwrap_or(pct_w);
        return (
            scale_edge(src_w, pct_w as f64 / 100.0),
            scale_edge(src_h, pct_h as f64 / 100.0),
        );
    }

    let scale_x = |w: u32| w as f64 / src_w as f64;
    let scale_y = |h: u32| h as f64 / src_h as f64;

    let (fit, fill) = match (geometry.width, geometry.height) {
        (Some(w), Some(h)) => {
            if geometry.mode == ResizeMode::Exact {
                return (w, h);
            }
            let (sx, sy) = (scale_x(w), scale_y(h));
            (sx.min(sy), sx.max(sy))
        }
        (Some(w), None) => (scale_x(w), scale_x(w)),
        (None, Some(h)) => (scale_y(h), scale_y(h)),
        (None, None) => return source,
    };

    let scale = match geometry.mode {
        ResizeMode::Fit | ResizeMode::Exact => fit,
        ResizeMode::Fill => fill,
        ResizeMode::ShrinkOnly if fit >= 1.0 => return source,
        ResizeMode::EnlargeOnly if fit <= 1.0 => return source,
        ResizeMode::ShrinkOnly | ResizeMode::EnlargeOnly => fit,
    };

    (scale_edge(src_w, scale), scale_edge(src_h, scale))
}

/// Anchor point for regions (crop, extent). Defaults to the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gravity {
    #[default]
    NorthWest,
    North,
    NorthEast,
    West,
    Center,
    East,
    SouthWest,
    South,
    SouthEast,
}

#[derive(Debug, Clone, Copy)]
enum Align {
    Start,
    Middle,
    End,
}

impl Gravity {
    /// Parse a gravity name, case-insensitively (`center`, `NorthEast`, ...).
    pub fn parse(name: &str) -> Option<Self> {
        let gravity = match name.trim().to_ascii_lowercase().as_str() {
            "northwest" => Self::NorthWest,
            "north" => Self::North,
            "northeast" => Self::NorthEast,
            "west" => Self::West,
            "center" | "centre" => Self::Center,
            "east" => Self::East,
            "southwest" => Self::SouthWest,
            "south" => Self::South,
            "southeast" => Self::SouthEast,
            _ => return None,
        };
        Some(gravity)
    }

    fn alignment(self) -> (Align, Align) {
        use Align::*;
        match self {
            Self::NorthWest => (Start, Start),
            Self::North => (Middle, Start),
            Self::NorthEast => (End, Start),
            Self::West => (Start, Middle),
            Self::Center => (Middle, Middle),
            Self::East => (End, Middle),
            Self::SouthWest => (Start, End),
            Self::South => (Middle, End),
            Self::SouthEast => (End, End),
        }
    }
}

/// Offsets point inward from the anchored edge.
fn anchor(align: Align, outer: u32, inner: u32, offset: i64) -> i64 {
    let (outer, inner) = (i64::from(outer), i64::from(inner));
    match align {
        Align::Start => offset,
        Align::Middle => ((outer - inner) / 2).saturating_add(offset),
        Align::End => (outer - inner).saturating_sub(offset),
    }
}

/// Size of the region a crop/extent geometry describes on an `image`.
/// Missing edges default to the image's own edge.
pub fn region_size(image: (u32, u32), geometry: &Geometry) -> (u32, u32) {
    if geometry.percent {
        return resize_dimensions(image, geometry);
    }
    (
        geometry.width.unwrap_or(image.0),
        geometry.height.unwrap_or(image.1),
    )
}

/// Top-left corner of a `region` placed on an `image` by gravity and offset,
/// in image coordinates. May be negative or past the image edge.
pub fn region_origin(
    image: (u32, u32),
    region: (u32, u32),
    gravity: Gravity,
    offset: (i64, i64),
) -> (i64, i64) {
    let (h_align, v_align) = gravity.alignment();
    (
        anchor(h_align, image.0, region.0, offset.0),
        anchor(v_align, image.1, region.1, offset.1),
    )
}

/// Crop rectangle `(x, y, width, height)` clipped to the image bounds.
///
/// Returns `None` when the requested region does not overlap the image.
pub fn crop_rect(
    image: (u32, u32),
    geometry: &Geometry,
    gravity: Gravity,
) -> Option<(u32, u32, u32, u32)> {
    let region = region_size(image, geometry);
    let (ox, oy) = region_origin(image, region, gravity, (geometry.x, geometry.y));

    let x0 = ox.max(0);
    let y0 = oy.max(0);
    let x1 = ox.saturating_add(i64::from(region.0)).min(i64::from(image.0));
    let y1 = oy.saturating_add(i64::from(region.1)).min(i64::from(image.1));
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some((x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32))
}
