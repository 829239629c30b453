//! Leveled console logging with indentation support.
//!
//! Tool output is converted into [`LogEntry`] values by the output filters
//! and written through a [`Logger`], which drops entries below its minimum
//! severity and renders the rest with a per-severity color.

use std::fmt;

use colored::Colorize;

/// Logging message severity levels, ordered from least to most severe.
///
/// The ordering matters: a [`Logger`] keeps every entry whose severity is at
/// least its configured minimum. `Quiet` sits above `Warning` so that
/// always-visible status output survives even a `--quiet` run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Verbose,
    Normal,
    DryRun,
    Info,
    Warning,
    Quiet,
    Error,
    Fatal,
}

impl Severity {
    /// Translate a VHDL severity level name into a logging severity.
    ///
    /// Unknown names yield `fallback`; simulators occasionally invent their
    /// own levels.
    pub fn parse_vhdl(value: &str, fallback: Severity) -> Severity {
        match value {
            "failure" => Severity::Fatal,
            "error" => Severity::Error,
            "warning" => Severity::Warning,
            "note" => Severity::Info,
            _ => fallback,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Debug => "DEBUG",
            Severity::Verbose => "VERBOSE",
            Severity::Normal => "NORMAL",
            Severity::DryRun => "DRYRUN",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Quiet => "QUIET",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        };
        write!(f, "{name}")
    }
}

/// A single log line with a severity and an indentation level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    message: String,
    severity: Severity,
    indent: usize,
}

impl LogEntry {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            severity,
            indent: 0,
        }
    }

    pub fn with_indent(message: impl Into<String>, severity: Severity, indent: usize) -> Self {
        Self {
            message: message.into(),
            severity,
            indent,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn indent(&self) -> usize {
        self.indent
    }

    /// Increase the entry's indentation level.
    pub fn indent_by(&mut self, indent: usize) {
        self.indent += indent;
    }

    /// Replace the message while keeping severity and indent.
    pub fn retag(&self, message: impl Into<String>) -> LogEntry {
        LogEntry {
            message: message.into(),
            severity: self.severity,
            indent: self.indent,
        }
    }
}

/// Console logger with a minimum severity and a base indentation level.
///
/// The base indent is raised by the orchestrator while iterating multiple
/// entities so that per-entity output nests under its headline.
#[derive(Debug)]
pub struct Logger {
    min_severity: Severity,
    base_indent: usize,
    use_color: bool,
}

impl Logger {
    pub fn new(min_severity: Severity) -> Self {
        Self {
            min_severity,
            base_indent: 0,
            use_color: true,
        }
    }

    /// Disable colored rendering (tests, non-tty output).
    pub fn plain(min_severity: Severity) -> Self {
        Self {
            min_severity,
            base_indent: 0,
            use_color: false,
        }
    }

    pub fn min_severity(&self) -> Severity {
        self.min_severity
    }

    pub fn base_indent(&self) -> usize {
        self.base_indent
    }

    pub fn set_base_indent(&mut self, indent: usize) {
        self.base_indent = indent;
    }

    /// Would an entry of this severity be written?
    pub fn would_write(&self, severity: Severity) -> bool {
        severity >= self.min_severity
    }

    /// Write one entry; returns whether it passed the severity gate.
    pub fn write(&self, entry: &LogEntry) -> bool {
        if entry.severity() < self.min_severity {
            return false;
        }
        let text = format!("{}{}", "  ".repeat(entry.indent()), entry.message());
        if self.use_color {
            let colored = match entry.severity() {
                Severity::Fatal => text.red().bold().to_string(),
                Severity::Error => text.red().to_string(),
                Severity::Warning => text.yellow().to_string(),
                Severity::DryRun => text.cyan().to_string(),
                Severity::Verbose => text.bright_black().to_string(),
                Severity::Debug => text.bright_black().dimmed().to_string(),
                _ => text,
            };
            println!("{colored}");
        } else {
            println!("{text}");
        }
        true
    }

    fn write_leveled(&self, message: impl Into<String>, severity: Severity, indent: usize) -> bool {
        self.write(&LogEntry::with_indent(
            message,
            severity,
            self.base_indent + indent,
        ))
    }

    pub fn fatal(&self, message: impl Into<String>, indent: usize) -> bool {
        self.write_leveled(message, Severity::Fatal, indent)
    }

    pub fn error(&self, message: impl Into<String>, indent: usize) -> bool {
        self.write_leveled(message, Severity::Error, indent)
    }

    pub fn warning(&self, message: impl Into<String>, indent: usize) -> bool {
        self.write_leveled(message, Severity::Warning, indent)
    }

    pub fn info(&self, message: impl Into<String>, indent: usize) -> bool {
        self.write_leveled(message, Severity::Info, indent)
    }

    pub fn quiet(&self, message: impl Into<String>, indent: usize) -> bool {
        self.write_leveled(message, Severity::Quiet, indent)
    }

    pub fn normal(&self, message: impl Into<String>, indent: usize) -> bool {
        self.write_leveled(message, Severity::Normal, indent)
    }

    pub fn verbose(&self, message: impl Into<String>, indent: usize) -> bool {
        self.write_leveled(message, Severity::Verbose, indent)
    }

    pub fn debug(&self, message: impl Into<String>, indent: usize) -> bool {
        self.write_leveled(message, Severity::Debug, indent)
    }

    pub fn dry_run(&self, message: impl Into<String>, indent: usize) -> bool {
        self.write_leveled(message, Severity::DryRun, indent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(Severity::Debug < Severity::Verbose);
        assert!(Severity::Verbose < Severity::Normal);
        assert!(Severity::Warning < Severity::Quiet);
        assert!(Severity::Quiet < Severity::Error);
        assert!(Severity::Error < Severity::Fatal);
    }

    #[test]
    fn vhdl_severity_mapping() {
        assert_eq!(
            Severity::parse_vhdl("failure", Severity::Error),
            Severity::Fatal
        );
        assert_eq!(
            Severity::parse_vhdl("warning", Severity::Error),
            Severity::Warning
        );
        assert_eq!(
            Severity::parse_vhdl("note", Severity::Error),
            Severity::Info
        );
        // unknown levels fall back to the caller's default
        assert_eq!(
            Severity::parse_vhdl("whatever", Severity::Error),
            Severity::Error
        );
    }

    #[test]
    fn logger_severity_gate() {
        let logger = Logger::plain(Severity::Warning);
        assert!(!logger.write(&LogEntry::new("ignored", Severity::Normal)));
        assert!(logger.write(&LogEntry::new("kept", Severity::Error)));
        assert!(logger.would_write(Severity::Quiet));
        assert!(!logger.would_write(Severity::Verbose));
    }

    #[test]
    fn entry_indentation() {
        let mut entry = LogEntry::with_indent("msg", Severity::Normal, 1);
        entry.indent_by(2);
        assert_eq!(entry.indent(), 3);
        assert_eq!(entry.message(), "msg");
    }
}
