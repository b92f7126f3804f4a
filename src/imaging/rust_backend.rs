//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (PNG, JPEG, GIF) | `image::ImageReader` with content sniffing |
//! | Resize / thumbnail | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Crop | `DynamicImage::crop_imm` |
//! | Extent | `imageops::overlay` onto a white RGBA canvas |
//! | Rotate / flip / flop | `rotate90`/`rotate180`/`rotate270`, `flipv`, `fliph` |
//! | Blur / sharpen | `DynamicImage::blur`, `DynamicImage::unsharpen` |
//! | Encode | same format as the source; JPEG via `JpegEncoder` with quality |
//!
//! GIF sources are decoded as their first frame.

use super::backend::{BackendError, ImageBackend};
use super::commands::{Command, CommandMapping, parse_commands};
use super::geometry::{
    Geometry, Gravity, crop_rect, region_origin, region_size, resize_dimensions,
};
use super::params::{Colorspace, Quality, Rotation};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::Path;

/// Extensions with a compiled-in decoder and encoder.
const SUPPORTED_FORMATS: &[(&str, ImageFormat)] = &[
    ("png", ImageFormat::Png),
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("gif", ImageFormat::Gif),
];

/// File extensions this backend can read and write, lowercase.
pub fn supported_extensions() -> impl Iterator<Item = &'static str> {
    SUPPORTED_FORMATS.iter().map(|(ext, _)| *ext)
}

/// Output format for a path, from its extension. Derivatives keep the
/// source's file name, so this is also the source's format.
fn format_for(path: &Path) -> Result<ImageFormat, BackendError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    SUPPORTED_FORMATS
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, format)| *format)
        .ok_or_else(|| BackendError::UnsupportedFormat(path.display().to_string()))
}

/// Pure Rust backend using the `image` crate.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })
}

/// The image a command chain operates on, plus the state commands like
/// `gravity` and `quality` leave behind for later ones.
struct WorkingImage {
    image: DynamicImage,
    gravity: Gravity,
    quality: Quality,
}

impl WorkingImage {
    fn new(image: DynamicImage) -> Self {
        Self {
            image,
            gravity: Gravity::default(),
            quality: Quality::default(),
        }
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }

    fn apply(&mut self, command: &Command) -> Result<(), BackendError> {
        match command {
            Command::Resize(geometry) | Command::Thumbnail(geometry) => self.resize(geometry),
            Command::Crop(geometry) => return self.crop(geometry),
            Command::Extent(geometry) => self.extent(geometry),
            Command::Gravity(gravity) => self.gravity = *gravity,
            Command::Rotate(rotation) => {
                self.image = match rotation {
                    Rotation::None => return Ok(()),
                    Rotation::Quarter => self.image.rotate90(),
                    Rotation::Half => self.image.rotate180(),
                    Rotation::ThreeQuarter => self.image.rotate270(),
                }
            }
            Command::Flip(true) => self.image = self.image.flipv(),
            Command::Flop(true) => self.image = self.image.fliph(),
            Command::Flip(false) | Command::Flop(false) | Command::Strip => {}
            Command::Blur(sigma) => self.image = self.image.blur(*sigma),
            Command::Sharpen(sigma) => self.image = self.image.unsharpen(*sigma, 0),
            Command::Colorspace(Colorspace::Gray) => self.image = self.image.grayscale(),
            Command::Colorspace(Colorspace::Rgb) => {
                self.image = if self.image.color().has_alpha() {
                    DynamicImage::ImageRgba8(self.image.to_rgba8())
                } else {
                    DynamicImage::ImageRgb8(self.image.to_rgb8())
                }
            }
            Command::Quality(quality) => self.quality = *quality,
        }
        Ok(())
    }

    fn resize(&mut self, geometry: &Geometry) {
        let current = self.dimensions();
        let (width, height) = resize_dimensions(current, geometry);
        if (width, height) != current {
            self.image = self.image.resize_exact(width, height, FilterType::Lanczos3);
        }
    }

    fn crop(&mut self, geometry: &Geometry) -> Result<(), BackendError> {
        let (width, height) = self.dimensions();
        let (x, y, w, h) = crop_rect((width, height), geometry, self.gravity).ok_or_else(|| {
            BackendError::ProcessingFailed(format!(
                "crop region lies outside the {width}x{height} image"
            ))
        })?;
        self.image = self.image.crop_imm(x, y, w, h);
        Ok(())
    }

    fn extent(&mut self, geometry: &Geometry) {
        let current = self.dimensions();
        let canvas_size = region_size(current, geometry);
        let (ox, oy) = region_origin(current, canvas_size, self.gravity, (geometry.x, geometry.y));

        let mut canvas =
            RgbaImage::from_pixel(canvas_size.0, canvas_size.1, Rgba([255, 255, 255, 255]));
        image::imageops::overlay(&mut canvas, &self.image.to_rgba8(), -ox, -oy);
        self.image = DynamicImage::ImageRgba8(canvas);
    }

    fn encode(&self, format: ImageFormat) -> Result<Vec<u8>, BackendError> {
        let mut buf = Vec::new();
        let result = match format {
            ImageFormat::Jpeg => {
                // JPEG has no alpha channel
                let encoder = JpegEncoder::new_with_quality(&mut buf, self.quality.value() as u8);
                DynamicImage::ImageRgb8(self.image.to_rgb8()).write_with_encoder(encoder)
            }
            ImageFormat::Gif => DynamicImage::ImageRgba8(self.image.to_rgba8())
                .write_to(&mut Cursor::new(&mut buf), format),
            _ => self.image.write_to(&mut Cursor::new(&mut buf), format),
        };
        result
            .map_err(|e| BackendError::ProcessingFailed(format!("{format:?} encode failed: {e}")))?;
        Ok(buf)
    }
}

impl ImageBackend for RustBackend {
    fn apply(&self, source: &Path, commands: &CommandMapping) -> Result<Vec<u8>, BackendError> {
        // Reject bad presets before paying for a decode
        let commands = parse_commands(commands)?;
        let format = format_for(source)?;

        let mut working = WorkingImage::new(load_image(source)?);
        for command in &commands {
            working.apply(command)?;
        }
        working.encode(format)
    }
}
