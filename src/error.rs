use crate::command::ExitCode;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Status reported for a command that could not be located.
pub const STATUS_NOT_FOUND: ExitCode = 127;
/// Status reported when a located program could not be started.
pub const STATUS_SPAWN_FAILED: ExitCode = 126;
/// Status returned by `execute_line` for a line that failed to parse.
pub const STATUS_SYNTAX: ExitCode = 2;
/// Process exit status forced by an `export PATH=...` with no usable directory.
pub const STATUS_FATAL_PATH: ExitCode = 255;

/// Everything that can abort the execution of a single command line.
///
/// None of these stop the shell itself: the interpreter reports the error,
/// maps it to a status with [`ShellError::status`] and moves on to the next line.
#[derive(Error, Debug)]
pub enum ShellError {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("{}: {source}", path.display())]
    Redirect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("command not found: {0}")]
    NotFound(String),

    #[error("{name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl ShellError {
    /// Exit status recorded for a line that failed with this error.
    pub fn status(&self) -> ExitCode {
        match self {
            ShellError::Syntax(_) => STATUS_SYNTAX,
            ShellError::Redirect { .. } => 1,
            ShellError::NotFound(_) => STATUS_NOT_FOUND,
            ShellError::Spawn { .. } => STATUS_SPAWN_FAILED,
            ShellError::Io(_) => 1,
        }
    }

    /// Syntax errors leave the session untouched, including the last status.
    pub fn is_syntax(&self) -> bool {
        matches!(self, ShellError::Syntax(_))
    }
}
