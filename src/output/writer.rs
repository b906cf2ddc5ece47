// src/output/writer.rs
//! Carries out an `OutputPlan` against the filesystem or stdout.
//!
//! Export files are staged next to their destination and renamed into
//! place, so a cancelled or failing export never leaves a half-written
//! conversation behind. Every other module only builds plans.

use super::types::{CompletedOperation, DeliveryTarget, FailedOperation, OutputPlan, OutputReport};
use crate::error::AppError;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Suffix of a document that is still being written.
const STAGING_SUFFIX: &str = "part";

/// Performs every operation of `plan` in order. Failures are collected in
/// the report; `OutputReport::into_result` decides whether they are fatal.
pub fn deliver(plan: OutputPlan) -> Result<OutputReport, AppError> {
    let started = Instant::now();
    let mut report = OutputReport::new();

    for operation in plan.operations {
        let op_started = Instant::now();
        match perform(&operation) {
            Ok(bytes_written) => {
                report = report.with_completed(CompletedOperation {
                    operation,
                    bytes_written,
                    duration_ms: op_started.elapsed().as_millis() as u64,
                });
            }
            Err(e) => {
                let error = format!("{}: {}", describe(&operation), e);
                log::error!("Could not deliver {}", error);
                report = report.with_failed(FailedOperation { operation, error });
            }
        }
    }

    report.stats.total_duration_ms = started.elapsed().as_millis() as u64;
    log::debug!(
        "Delivered {} documents ({} bytes, {} failed) in {}ms",
        report.stats.operations_completed,
        report.stats.bytes_written,
        report.stats.operations_failed,
        report.stats.total_duration_ms
    );

    Ok(report)
}

fn perform(operation: &DeliveryTarget) -> io::Result<usize> {
    match operation {
        DeliveryTarget::WriteFile { path, content } => write_staged(path, content),
        DeliveryTarget::CreateDirectory { path } => {
            // create_dir_all fails on its own when `path` is an existing file
            fs::create_dir_all(path)?;
            log::debug!("Export directory ready: {}", path.display());
            Ok(0)
        }
        DeliveryTarget::PrintToStdout { content } => print_document(content),
    }
}

/// Writes `content` to a staging file beside `path`, then renames it over
/// `path`.
fn write_staged(path: &Path, content: &str) -> io::Result<usize> {
    let staging = staging_path(path);
    if let Err(e) = fs::write(&staging, content) {
        let _ = fs::remove_file(&staging);
        return Err(e);
    }
    if let Err(e) = fs::rename(&staging, path) {
        let _ = fs::remove_file(&staging);
        return Err(e);
    }

    log::info!("📝 {} ({} bytes)", path.display(), content.len());
    Ok(content.len())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(STAGING_SUFFIX);
    path.with_file_name(name)
}

/// Prints one document followed by a blank line. A reader that went away
/// (`| head`) ends the output quietly.
fn print_document(content: &str) -> io::Result<usize> {
    let mut stdout = io::stdout().lock();
    let written = stdout
        .write_all(content.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush());

    match written {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            log::debug!("stdout closed by the reader, dropping the rest of the document");
            Ok(0)
        }
        Err(e) => Err(e),
        Ok(()) => Ok(content.len()),
    }
}

fn describe(operation: &DeliveryTarget) -> String {
    match operation {
        DeliveryTarget::WriteFile { path, .. } => path.display().to_string(),
        DeliveryTarget::CreateDirectory { path } => format!("directory {}", path.display()),
        DeliveryTarget::PrintToStdout { .. } => "stdout".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_files_and_reports() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("out");
        let plan = OutputPlan::new()
            .with_operation(DeliveryTarget::CreateDirectory {
                path: nested.clone(),
            })
            .with_operation(DeliveryTarget::WriteFile {
                path: nested.join("a.md"),
                content: "# A\n".to_string(),
            });

        let report = deliver(plan).unwrap();

        assert!(report.is_success());
        assert_eq!(report.stats.bytes_written, 4);
        assert_eq!(report.written_files(), vec![nested.join("a.md")]);
        assert_eq!(fs::read_to_string(nested.join("a.md")).unwrap(), "# A\n");
    }

    #[test]
    fn rewrites_leave_no_staging_files() {
        let dir = tempfile::tempdir().unwrap();
        let index = dir.path().join("index.md");
        fs::write(&index, "old").unwrap();

        let report = deliver(OutputPlan::new().with_operation(DeliveryTarget::WriteFile {
            path: index.clone(),
            content: "new".to_string(),
        }))
        .unwrap();

        assert!(report.is_success());
        assert_eq!(fs::read_to_string(&index).unwrap(), "new");
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("index.md")]);
    }

    #[test]
    fn failures_name_the_destination() {
        let dir = tempfile::tempdir().unwrap();
        let taken = dir.path().join("taken");
        fs::write(&taken, "x").unwrap();

        let report = deliver(
            OutputPlan::new()
                .with_operation(DeliveryTarget::CreateDirectory {
                    path: taken.clone(),
                })
                .with_operation(DeliveryTarget::WriteFile {
                    path: taken.join("a.md"),
                    content: "# A\n".to_string(),
                }),
        )
        .unwrap();

        assert_eq!(report.stats.operations_failed, 2);
        assert!(report.failed[0].error.starts_with("directory "));
        assert!(report.failed[1].error.contains("a.md"));
        assert!(report.into_result().is_err());
    }

    #[test]
    fn staging_name_sits_beside_the_target() {
        assert_eq!(
            staging_path(Path::new("/tmp/export/index.md")),
            PathBuf::from("/tmp/export/index.md.part")
        );
    }
}
