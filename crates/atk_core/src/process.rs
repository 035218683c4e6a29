//! External tool invocation.
//!
//! Thin wrapper around `std::process::Command` for the command-line tools
//! the executors drive (ffmpeg, ffprobe, ffcuesplitter). A nonzero exit is
//! not an error at this layer - callers inspect the captured output and
//! decide. `Command::output()` waits for the child, so no zombies are left
//! behind.

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

/// Errors from spawning an external tool.
///
/// Only raised when the process could not be run at all; a tool that ran
/// and exited nonzero is reported through [`ToolOutput::exit_code`].
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("'{tool}' not found in PATH")]
    ToolUnavailable { tool: String },

    #[error("failed to run '{tool}': {source}")]
    SpawnFailed {
        tool: String,
        #[source]
        source: io::Error,
    },
}

/// Result type for process operations.
pub type ProcessResult<T> = Result<T, ProcessError>;

/// Captured output of a finished external tool.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Last `n` nonempty stderr lines, for log output on failure.
    pub fn stderr_tail(&self, n: usize) -> Vec<&str> {
        let lines: Vec<&str> = self
            .stderr
            .lines()
            .map(str::trim_end)
            .filter(|l| !l.is_empty())
            .collect();
        let start = lines.len().saturating_sub(n);
        lines[start..].to_vec()
    }
}

/// Run an external tool and capture its output.
///
/// Blocks until the child exits and is fully reaped. The working directory
/// is only changed when `working_dir` is given.
pub fn run_tool(
    program: &Path,
    args: &[&OsStr],
    working_dir: Option<&Path>,
) -> ProcessResult<ToolOutput> {
    let tool = tool_name(program);

    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Some(dir) = working_dir {
        cmd.current_dir(dir);
    }

    tracing::debug!(
        "Running: {} {}",
        program.display(),
        args.iter()
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    );

    let output = cmd.output().map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            ProcessError::ToolUnavailable { tool: tool.clone() }
        } else {
            ProcessError::SpawnFailed {
                tool: tool.clone(),
                source: e,
            }
        }
    })?;

    let result = ToolOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    };

    if !result.success() {
        tracing::debug!("{} exited with code {}", tool, result.exit_code);
    }

    Ok(result)
}

/// Locate an executable in `PATH`.
///
/// Returns the first matching path, honoring `PATHEXT` suffixes on
/// Windows.
pub fn find_tool(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;

    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(name);
        if is_executable(&candidate) {
            return Some(candidate);
        }

        #[cfg(windows)]
        {
            let exe = dir.join(format!("{name}.exe"));
            if is_executable(&exe) {
                return Some(exe);
            }
        }
    }

    None
}

fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        path.metadata()
            .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        path.is_file()
    }
}

fn tool_name(program: &Path) -> String {
    program
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| program.to_string_lossy().to_string())
}
