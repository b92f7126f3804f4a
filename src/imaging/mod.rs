//! Image transformation in pure Rust, no system image libraries.
//!
//! The module is split into:
//! - **Geometry**: parsing of `WxH+X+Y` arguments and the dimension math (unit testable)
//! - **Parameters**: small typed values commands carry (quality, rotation, colorspace)
//! - **Commands**: the ordered [`CommandMapping`] and the closed [`Command`] table
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

pub mod backend;
pub mod commands;
pub mod geometry;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend};
pub use commands::{COMMAND_NAMES, Command, CommandMapping, parse_commands};
pub use params::{Colorspace, Quality, Rotation};
pub use rust_backend::{RustBackend, supported_extensions};
