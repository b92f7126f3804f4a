//! CLI output formatting.
//!
//! Every `format_*` function is pure and returns display lines, so output is
//! unit testable; the `print_*` wrappers write those lines to stdout.
//! Diagnostics meant for operators go through `tracing` instead and never
//! appear here except in the end-of-pass summary.
//!
//! # Output Format
//!
//! ## Build
//!
//! ```text
//! thumbs (2 images)
//!     001 logo.png: generated
//!         → generated_img/logo.png
//!     002 banner.jpg: fresh
//!         → generated_img/banner.jpg
//! avatars: skipped (source directory not found: /site/people)
//!
//! Images: 1 generated, 1 fresh (2 total)
//! Diagnostics
//!     preset 'avatars': source directory not found: /site/people
//! ```
//!
//! ## Check
//!
//! ```text
//! 001 thumbs (2 images)
//!     Destination: generated_img
//!     Commands: resize=100x100
//! 002 avatars
//!     Error: preset 'avatars': source directory not found: /site/people
//! ```

use crate::cache::PassStats;
use crate::destination::DestinationPolicy;
use crate::imaging::CommandMapping;
use crate::process::{ArtifactReport, ArtifactStatus, PresetCheck, ProcessEvent, ProcessResult};
use serde::Serialize;
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "image" } else { "images" }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn status_label(status: &ArtifactStatus) -> &'static str {
    match status {
        ArtifactStatus::Generated => "generated",
        ArtifactStatus::Fresh => "fresh",
        ArtifactStatus::Failed(_) => "failed",
    }
}

fn describe_destination(policy: &DestinationPolicy) -> String {
    match policy {
        DestinationPolicy::Flat(dir) => dir.display().to_string(),
        DestinationPolicy::SourceRelative(sub) => format!("<source dir>/{}", sub.display()),
    }
}

fn describe_commands(commands: &CommandMapping) -> String {
    if commands.is_empty() {
        return "(none)".to_string();
    }
    commands
        .iter()
        .map(|(name, arg)| format!("{name}={arg}"))
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// Build
// ============================================================================

/// Format a single progress event as display lines.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::PresetStarted { name, file_count } => {
            vec![format!("{} ({} {})", name, file_count, plural(*file_count))]
        }
        ProcessEvent::ArtifactProcessed {
            index,
            source_path,
            destination,
            status,
            ..
        } => {
            let mut lines = vec![format!(
                "{}{} {}: {}",
                indent(1),
                format_index(*index),
                file_name(source_path),
                status_label(status)
            )];
            match status {
                ArtifactStatus::Failed(reason) => {
                    lines.push(format!("{}Error: {}", indent(2), reason));
                }
                _ => lines.push(format!("{}\u{2192} {}", indent(2), destination.display())),
            }
            lines
        }
        ProcessEvent::PresetSkipped { name, reason } => {
            vec![format!("{}: skipped ({})", name, reason)]
        }
    }
}

/// Format the end-of-pass summary: counts, then any diagnostics.
pub fn format_pass_summary(result: &ProcessResult) -> Vec<String> {
    let mut lines = vec![format!("Images: {}", result.stats)];
    if !result.diagnostics.is_empty() {
        lines.push("Diagnostics".to_string());
        for diagnostic in &result.diagnostics {
            lines.push(format!("{}{}", indent(1), diagnostic));
        }
    }
    lines
}

pub fn print_process_event(event: &ProcessEvent) {
    for line in format_process_event(event) {
        println!("{}", line);
    }
}

pub fn print_pass_summary(result: &ProcessResult) {
    for line in format_pass_summary(result) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Format the result of checking every preset.
pub fn format_check(checks: &[PresetCheck]) -> Vec<String> {
    if checks.is_empty() {
        return vec!["No presets configured".to_string()];
    }
    let mut lines = Vec::new();
    for (i, check) in checks.iter().enumerate() {
        match &check.status {
            Ok(summary) => {
                lines.push(format!(
                    "{} {} ({} {})",
                    format_index(i + 1),
                    check.name,
                    summary.files,
                    plural(summary.files)
                ));
                lines.push(format!(
                    "{}Destination: {}",
                    indent(1),
                    describe_destination(&summary.destination)
                ));
                lines.push(format!(
                    "{}Commands: {}",
                    indent(1),
                    describe_commands(&summary.commands)
                ));
            }
            Err(err) => {
                lines.push(format!("{} {}", format_index(i + 1), check.name));
                lines.push(format!("{}Error: {}", indent(1), err));
            }
        }
    }
    lines
}

pub fn print_check(checks: &[PresetCheck]) {
    for line in format_check(checks) {
        println!("{}", line);
    }
}

// ============================================================================
// JSON report
// ============================================================================

#[derive(Debug, Serialize)]
struct DiagnosticReport<'a> {
    preset: &'a str,
    message: String,
}

#[derive(Debug, Serialize)]
struct PassReport<'a> {
    stats: PassStats,
    artifacts: &'a [ArtifactReport],
    diagnostics: Vec<DiagnosticReport<'a>>,
}

/// Pretty JSON rendering of a pass, for `build --report`.
pub fn report_json(result: &ProcessResult) -> Result<String, serde_json::Error> {
    let report = PassReport {
        stats: result.stats,
        artifacts: &result.artifacts,
        diagnostics: result
            .diagnostics
            .iter()
            .map(|d| DiagnosticReport {
                preset: d.preset(),
                message: d.to_string(),
            })
            .collect(),
    };
    serde_json::to_string_pretty(&report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{PresetSummary, ProcessError};
    use std::path::PathBuf;

    fn processed(index: usize, source: &str, dest: &str, status: ArtifactStatus) -> ProcessEvent {
        ProcessEvent::ArtifactProcessed {
            index,
            preset: "thumbs".to_string(),
            source_path: PathBuf::from(source),
            destination: PathBuf::from(dest),
            status,
        }
    }

    #[test]
    fn index_is_zero_padded() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1234), "1234");
    }

    #[test]
    fn indent_levels() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "        ");
    }

    #[test]
    fn preset_started_line() {
        let event = ProcessEvent::PresetStarted {
            name: "thumbs".to_string(),
            file_count: 1,
        };
        assert_eq!(format_process_event(&event), vec!["thumbs (1 image)"]);
    }

    #[test]
    fn generated_artifact_lines() {
        let event = processed(
            1,
            "/site/img/logo.png",
            "generated_img/logo.png",
            ArtifactStatus::Generated,
        );
        assert_eq!(
            format_process_event(&event),
            vec![
                "    001 logo.png: generated",
                "        \u{2192} generated_img/logo.png"
            ]
        );
    }

    #[test]
    fn failed_artifact_shows_error() {
        let event = processed(
            3,
            "/site/img/broken.png",
            "generated_img/broken.png",
            ArtifactStatus::Failed("corrupt".to_string()),
        );
        let lines = format_process_event(&event);
        assert_eq!(lines[0], "    003 broken.png: failed");
        assert_eq!(lines[1], "        Error: corrupt");
    }

    #[test]
    fn skipped_preset_line() {
        let event = ProcessEvent::PresetSkipped {
            name: "avatars".to_string(),
            reason: "missing source".to_string(),
        };
        assert_eq!(
            format_process_event(&event),
            vec!["avatars: skipped (missing source)"]
        );
    }

    #[test]
    fn summary_lists_diagnostics() {
        let mut result = ProcessResult::default();
        result.stats.generated();
        result.stats.fresh();
        result.diagnostics.push(ProcessError::SourceNotFound {
            preset: "avatars".to_string(),
            path: PathBuf::from("/site/people"),
        });

        let lines = format_pass_summary(&result);
        assert_eq!(lines[0], "Images: 1 generated, 1 fresh (2 total)");
        assert_eq!(lines[1], "Diagnostics");
        assert_eq!(
            lines[2],
            "    preset 'avatars': source directory not found: /site/people"
        );
    }

    #[test]
    fn clean_summary_is_one_line() {
        let result = ProcessResult::default();
        assert_eq!(format_pass_summary(&result), vec!["Images: 0 generated"]);
    }

    #[test]
    fn check_lines() {
        let checks = vec![
            PresetCheck {
                name: "thumbs".to_string(),
                status: Ok(PresetSummary {
                    files: 2,
                    destination: DestinationPolicy::Flat(PathBuf::from("generated_img")),
                    commands: [("resize", "100x100"), ("quality", "80")]
                        .into_iter()
                        .collect(),
                }),
            },
            PresetCheck {
                name: "nested".to_string(),
                status: Ok(PresetSummary {
                    files: 0,
                    destination: DestinationPolicy::SourceRelative(PathBuf::from("small")),
                    commands: CommandMapping::new(),
                }),
            },
        ];
        let lines = format_check(&checks);
        assert_eq!(
            lines,
            vec![
                "001 thumbs (2 images)",
                "    Destination: generated_img",
                "    Commands: resize=100x100, quality=80",
                "002 nested (0 images)",
                "    Destination: <source dir>/small",
                "    Commands: (none)",
            ]
        );
    }

    #[test]
    fn check_without_presets() {
        assert_eq!(format_check(&[]), vec!["No presets configured"]);
    }

    #[test]
    fn report_json_shape() {
        let mut result = ProcessResult::default();
        result.stats.generated();
        result.artifacts.push(ArtifactReport {
            preset: "thumbs".to_string(),
            source_path: PathBuf::from("/site/img/logo.png"),
            destination: PathBuf::from("generated_img/logo.png"),
            status: ArtifactStatus::Generated,
        });

        let json: serde_json::Value = serde_json::from_str(&report_json(&result).unwrap()).unwrap();
        assert_eq!(json["stats"]["generated"], 1);
        assert_eq!(json["artifacts"][0]["status"], "generated");
        assert_eq!(json["artifacts"][0]["destination"], "generated_img/logo.png");
        assert!(json["diagnostics"].as_array().unwrap().is_empty());
    }
}
