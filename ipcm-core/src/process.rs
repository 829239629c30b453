//! Spawning external EDA tools and streaming their output line by line.
//!
//! A [`Runner`] carries the global dry-run switch: in dry-run mode no
//! process is spawned and the returned handle yields no output, so the
//! calling flow can log the command and report a dry-run verdict instead.

use std::io::{BufRead, BufReader, Lines};
use std::path::Path;
use std::process::{Child, ChildStderr, ChildStdout, Command, Stdio};

use crate::error::SimulatorError;

/// Spawns tool processes, or pretends to under `--dry-run`.
#[derive(Debug, Clone, Copy)]
pub struct Runner {
    dry_run: bool,
}

impl Runner {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Launch `program` with `args` in `cwd`, stdout and stderr piped.
    ///
    /// `tool` is the short name used in error messages.
    pub fn start(
        &self,
        tool: &str,
        program: &Path,
        args: &[String],
        cwd: &Path,
    ) -> Result<ToolProcess, SimulatorError> {
        if self.dry_run {
            return Ok(ToolProcess {
                tool: tool.to_string(),
                child: None,
                stdout: None,
                stderr: None,
            });
        }
        let mut child = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| SimulatorError::LaunchFailed {
                tool: tool.to_string(),
                source,
            })?;
        let stdout = child.stdout.take().map(BufReader::new);
        let stderr = child.stderr.take().map(BufReader::new);
        Ok(ToolProcess {
            tool: tool.to_string(),
            child: Some(child),
            stdout,
            stderr,
        })
    }
}

/// A running (or dry-run placeholder) tool process.
#[derive(Debug)]
pub struct ToolProcess {
    tool: String,
    child: Option<Child>,
    stdout: Option<BufReader<ChildStdout>>,
    stderr: Option<BufReader<ChildStderr>>,
}

impl ToolProcess {
    pub fn is_dry_run(&self) -> bool {
        self.child.is_none()
    }

    /// Stream output lines, stdout first, then stderr.
    pub fn lines(&mut self) -> OutputLines<'_> {
        OutputLines {
            tool: &self.tool,
            stdout: self.stdout.take().map(BufRead::lines),
            stderr: self.stderr.take().map(BufRead::lines),
        }
    }

    /// Wait for the process to exit; `true` on a zero exit status.
    /// Dry runs always succeed.
    pub fn wait(&mut self) -> Result<bool, SimulatorError> {
        match &mut self.child {
            None => Ok(true),
            Some(child) => {
                let status = child.wait().map_err(|source| SimulatorError::LaunchFailed {
                    tool: self.tool.clone(),
                    source,
                })?;
                Ok(status.success())
            }
        }
    }
}

/// Iterator over a tool's output lines.
pub struct OutputLines<'a> {
    tool: &'a str,
    stdout: Option<Lines<BufReader<ChildStdout>>>,
    stderr: Option<Lines<BufReader<ChildStderr>>>,
}

impl Iterator for OutputLines<'_> {
    type Item = Result<String, SimulatorError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(lines) = &mut self.stdout {
            match lines.next() {
                Some(Ok(line)) => return Some(Ok(line)),
                Some(Err(source)) => {
                    return Some(Err(SimulatorError::OutputRead {
                        tool: self.tool.to_string(),
                        source,
                    }));
                }
                None => self.stdout = None,
            }
        }
        if let Some(lines) = &mut self.stderr {
            match lines.next() {
                Some(Ok(line)) => return Some(Ok(line)),
                Some(Err(source)) => {
                    return Some(Err(SimulatorError::OutputRead {
                        tool: self.tool.to_string(),
                        source,
                    }));
                }
                None => self.stderr = None,
            }
        }
        None
    }
}

/// The command line as it would be typed, for dry-run logging.
pub fn render_command(program: &Path, args: &[String]) -> String {
    let mut text = program.display().to_string();
    for arg in args {
        text.push(' ');
        if arg.contains(' ') {
            text.push('"');
            text.push_str(arg);
            text.push('"');
        } else {
            text.push_str(arg);
        }
    }
    text
}
