//! # imgpreset
//!
//! Incremental image derivatives for static-site builds. A `config.toml`
//! declares named presets; each preset picks source images from a directory
//! and runs an ordered list of commands (resize, crop, rotate, ...) over every
//! one of them, writing the result under the output root.
//!
//! # Architecture: One Pass, Five Steps
//!
//! ```text
//! config.toml ─► preset ─► scan ─► resolve destination ─► staleness check ─► transform + write ─► register
//! ```
//!
//! Every step is a small module with a pure core, so most behavior is tested
//! without decoding a single pixel:
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `config.toml` loading and validation; presets kept as raw tables |
//! | [`preset`] | Splits a preset into path settings and its ordered command mapping |
//! | [`scan`] | Walks a preset's source directory for png/jpg/jpeg/gif files |
//! | [`destination`] | Computes where a source file's derivative goes |
//! | [`cache`] | In-memory mtime cache deciding what is stale; pass statistics |
//! | [`imaging`] | Closed command table, geometry math, the pure-Rust backend |
//! | [`artifact`] | One source × preset pairing; the write step; the output registry seam |
//! | [`process`] | Orchestrates a whole pass, collecting diagnostics instead of failing |
//! | [`output`] | CLI output formatting and the JSON pass report |
//!
//! # Design Decisions
//!
//! ## Diagnostics, Not Aborts
//!
//! A broken preset, a missing source directory or a corrupt image each
//! disable only their own slice of the work. The pass always completes and
//! hands back every problem in [`process::ProcessResult::diagnostics`]; the
//! `build --strict` flag is where a host turns them into a failing exit code.
//!
//! ## Freshness by Modification Time, In Memory
//!
//! The cache maps each source path to the mtime it had when last generated
//! and lives only as long as the process. A one-shot build therefore
//! regenerates everything; `watch` keeps one cache across passes and only
//! touches what changed. See [`cache`] for the exact rule.
//!
//! ## A Closed Command Table
//!
//! Preset keys other than the four path keys are commands, looked up in a
//! fixed table ([`imaging::COMMAND_NAMES`]). An unknown name or a malformed
//! argument disables the preset before any file is touched, rather than
//! failing on the first image.
//!
//! ## Pure-Rust Imaging
//!
//! The [`imaging`] module uses the `image` crate for decoding, resampling and
//! encoding. No ImageMagick, no system libraries: the binary is self-contained.

pub mod artifact;
pub mod cache;
pub mod config;
pub mod destination;
pub mod imaging;
pub mod output;
pub mod preset;
pub mod process;
pub mod scan;
