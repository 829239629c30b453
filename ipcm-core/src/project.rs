//! Source file lists and generated project files.
//!
//! A testbench references a `*.files` list naming its VHDL sources; the
//! flows read it with [`read_files_file`] and, where a tool wants one,
//! emit a `*.prj` project file through [`ProjectFileWriter`].

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::error::SimulatorError;

/// One VHDL source file together with its target library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub library: String,
    pub path: PathBuf,
}

/// Parse a `*.files` list.
///
/// Each non-empty, non-`#` line is either a bare path (compiled into
/// `default_library`) or `vhdl <library> <path>`, with an optionally
/// quoted path. A missing or unreadable list is a skippable failure.
pub fn read_files_file(
    path: &Path,
    default_library: &str,
) -> Result<Vec<SourceFile>, SimulatorError> {
    let content = fs::read_to_string(path)
        .map_err(|source| SimulatorError::FileListError(path.to_path_buf(), source))?;
    let mut files = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let (library, file) = match tokens.as_slice() {
            [file] => (default_library, *file),
            ["vhdl", file] => (default_library, *file),
            ["vhdl", library, file] => (*library, *file),
            _ => (default_library, *tokens.last().unwrap_or(&line)),
        };
        let file = file.trim_matches('"');
        files.push(SourceFile {
            library: library.to_string(),
            path: PathBuf::from(file),
        });
    }
    Ok(files)
}

/// Writes tool project files (`*.prj`) listing sources one per line as
/// `vhdl <library> "<path>"`.
#[derive(Debug)]
pub struct ProjectFileWriter {
    path: PathBuf,
}

impl ProjectFileWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, files: &[SourceFile]) -> Result<(), SimulatorError> {
        let mut buffer = Vec::new();
        for file in files {
            writeln!(buffer, "vhdl {} \"{}\"", file.library, file.path.display())
                .map_err(|source| SimulatorError::ProjectFile(self.path.clone(), source))?;
        }
        fs::write(&self.path, buffer)
            .map_err(|source| SimulatorError::ProjectFile(self.path.clone(), source))
    }
}
