// src/progress.rs
//! Console presentation of export progress.

use crate::pipeline::{ProgressReporter, Severity};
use std::io::Write;

/// Prints progress to stderr so stdout stays clean for `--pipe`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter {
    quiet: bool,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only warnings and errors are printed.
    pub fn quiet() -> Self {
        Self { quiet: true }
    }
}

impl ConsoleReporter {
    /// The line shown for a notice, or `None` when it is filtered out.
    fn line(&self, message: &str, severity: Severity) -> Option<String> {
        if self.quiet && matches!(severity, Severity::Info | Severity::Success) {
            return None;
        }

        let icon = match severity {
            Severity::Info => "⏳",
            Severity::Success => "✓",
            Severity::Warning => "⚠️ ",
            Severity::Error => "❌",
        };
        Some(format!("{} {}", icon, message))
    }
}

/// Writes one line, ignoring a closed or broken stream.
fn emit<W: Write>(out: &mut W, line: &str) {
    let _ = writeln!(out, "{}", line);
}

impl ProgressReporter for ConsoleReporter {
    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Info => log::info!("{}", message),
            Severity::Success => log::info!("{}", message),
            Severity::Warning => log::warn!("{}", message),
            Severity::Error => log::error!("{}", message),
        }

        if let Some(line) = self.line(message, severity) {
            emit(&mut std::io::stderr().lock(), &line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    struct ClosedStream;

    impl Write for ClosedStream {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[test]
    fn closed_stream_is_ignored() {
        emit(&mut ClosedStream, "⏳ Processed 5/20 (25%)");
    }

    #[test]
    fn quiet_keeps_only_problems() {
        let quiet = ConsoleReporter::quiet();
        assert_eq!(quiet.line("Processed 5/20 (25%)", Severity::Info), None);
        assert_eq!(quiet.line("done", Severity::Success), None);
        assert_eq!(
            quiet.line("Export failed: boom", Severity::Error),
            Some("❌ Export failed: boom".to_string())
        );
        assert_eq!(
            ConsoleReporter::new().line("Processed 5/20 (25%)", Severity::Info),
            Some("⏳ Processed 5/20 (25%)".to_string())
        );
    }
}
