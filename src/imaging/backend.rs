//! Image processing backend trait and shared error type.
//!
//! The [`ImageBackend`] trait is the only seam between the generation
//! pipeline and pixel work: decode a source, run a preset's commands over it
//! in order, hand back encoded bytes. Writing those bytes is the caller's job,
//! so transform failures and write failures stay distinguishable.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend).

use super::commands::CommandMapping;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("invalid argument '{argument}' for {command}: {reason}")]
    InvalidArgument {
        command: String,
        argument: String,
        reason: String,
    },
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Trait for image processing backends.
///
/// Must be `Sync`: artifacts of one preset are transformed on rayon's pool
/// against a shared backend.
pub trait ImageBackend: Sync {
    /// Decode `source`, apply `commands` front to back to one working image,
    /// and return the result encoded in the source's own format.
    fn apply(&self, source: &Path, commands: &CommandMapping) -> Result<Vec<u8>, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::commands::parse_commands;
    use std::sync::Mutex;

    /// Mock backend that records applied command lists without decoding.
    /// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
    #[derive(Default)]
    pub struct MockBackend {
        pub operations: Mutex<Vec<RecordedOp>>,
        /// Source file names that fail to "decode".
        pub failing: Vec<String>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedOp {
        pub source: String,
        pub commands: Vec<(String, String)>,
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing_on(names: &[&str]) -> Self {
            Self {
                operations: Mutex::new(Vec::new()),
                failing: names.iter().map(|n| n.to_string()).collect(),
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        /// Recorded operations sorted by source, for order-independent checks.
        pub fn sorted_operations(&self) -> Vec<RecordedOp> {
            let mut ops = self.get_operations();
            ops.sort_by(|a, b| a.source.cmp(&b.source));
            ops
        }
    }

    impl ImageBackend for MockBackend {
        fn apply(
            &self,
            source: &Path,
            commands: &CommandMapping,
        ) -> Result<Vec<u8>, BackendError> {
            parse_commands(commands)?;

            let name = source
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if self.failing.contains(&name) {
                return Err(BackendError::ProcessingFailed(format!(
                    "Failed to decode {}",
                    source.display()
                )));
            }

            self.operations.lock().unwrap().push(RecordedOp {
                source: source.to_string_lossy().to_string(),
                commands: commands
                    .iter()
                    .map(|(n, a)| (n.to_string(), a.to_string()))
                    .collect(),
            });
            Ok(format!("rendered:{name}").into_bytes())
        }
    }

    #[test]
    fn mock_records_commands_in_order() {
        let backend = MockBackend::new();
        let commands: CommandMapping = [("resize", "10x10"), ("rotate", "90")]
            .into_iter()
            .collect();

        let bytes = backend.apply(Path::new("/src/a.png"), &commands).unwrap();
        assert_eq!(bytes, b"rendered:a.png");

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].source, "/src/a.png");
        assert_eq!(
            ops[0].commands,
            vec![
                ("resize".to_string(), "10x10".to_string()),
                ("rotate".to_string(), "90".to_string())
            ]
        );
    }

    #[test]
    fn mock_rejects_unknown_commands() {
        let backend = MockBackend::new();
        let commands: CommandMapping = [("explode", "1")].into_iter().collect();
        let result = backend.apply(Path::new("/src/a.png"), &commands);
        assert!(matches!(result, Err(BackendError::UnknownCommand(_))));
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn mock_fails_on_configured_files() {
        let backend = MockBackend::failing_on(&["broken.png"]);
        let commands = CommandMapping::new();
        assert!(backend.apply(Path::new("/src/broken.png"), &commands).is_err());
        assert!(backend.apply(Path::new("/src/fine.png"), &commands).is_ok());
    }
}
