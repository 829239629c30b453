//! Error taxonomy for the ipcm core.
//!
//! Two families exist: [`ConfigError`] for malformed configuration and
//! unresolvable names (never skippable, aborts the current command), and
//! [`SimulatorError`] for failures while driving an external tool. Some
//! simulator errors are *skippable*: a batch run records them against the
//! failing entity and carries on with the next one.

use std::path::PathBuf;

use thiserror::Error;

/// Configuration and name-resolution errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {0}")]
    Io(PathBuf, #[source] std::io::Error),
    #[error("syntax error in configuration file at line {line}: {text}")]
    Syntax { line: usize, text: String },
    #[error("configuration section [{0}] not found")]
    MissingSection(String),
    #[error("option '{option}' not found in section [{section}]")]
    MissingOption { section: String, option: String },
    #[error("unresolvable interpolation '${{{reference}}}' in [{section}]:{option}")]
    Interpolation {
        section: String,
        option: String,
        reference: String,
    },
    #[error("interpolation cycle while expanding [{section}]:{option}")]
    InterpolationCycle { section: String, option: String },
    #[error("'{value}' is not a valid visibility in section [{section}]")]
    InvalidVisibility { section: String, value: String },
    #[error("hierarchy error, expected Library")]
    HierarchyError,
    #[error("fully qualified name is empty")]
    EmptyName,
    #[error("fully qualified name '{0}' has too many ':' signs")]
    MalformedName(String),
    #[error("entity '{resolved}.{unresolved}' not found (resolved up to '{resolved}')")]
    EntityNotFound { resolved: String, unresolved: String },
    #[error("no {kind} configured for '{entity}'")]
    NoVariant { entity: String, kind: &'static str },
}

/// Errors raised while running an external simulator or synthesizer.
#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to launch {tool}")]
    LaunchFailed {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error("error while reading {tool} output")]
    OutputRead {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{tool} reported a compilation error: {message}")]
    CompilationError { tool: String, message: String },
    #[error("a unit must be reanalysed: {0}")]
    Reanalyze(String),
    #[error("no testbench report found in simulator output")]
    ResultNotFound,
    #[error("error while reading file list '{0}'")]
    FileListError(PathBuf, #[source] std::io::Error),
    #[error("error while writing project file '{0}'")]
    ProjectFile(PathBuf, #[source] std::io::Error),
    #[error("cannot prepare working directory '{0}'")]
    WorkingDirectory(PathBuf, #[source] std::io::Error),
}

impl SimulatorError {
    /// Whether this failure may be skipped in a batch run.
    ///
    /// Skippable failures are recorded as a failed test case; everything
    /// else aborts the whole batch.
    pub fn is_skippable(&self) -> bool {
        match self {
            SimulatorError::CompilationError { .. }
            | SimulatorError::Reanalyze(..)
            | SimulatorError::ResultNotFound
            | SimulatorError::FileListError(..) => true,
            SimulatorError::Config(..)
            | SimulatorError::LaunchFailed { .. }
            | SimulatorError::OutputRead { .. }
            | SimulatorError::ProjectFile(..)
            | SimulatorError::WorkingDirectory(..) => false,
        }
    }

    /// An output read cut short by a signal; the batch stops, but timers
    /// are finalized and the partial report is still rendered.
    pub fn is_interrupted(&self) -> bool {
        matches!(
            self,
            SimulatorError::OutputRead { source, .. }
                if source.kind() == std::io::ErrorKind::Interrupted
        )
    }
}
