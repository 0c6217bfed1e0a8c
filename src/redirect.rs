//! Redirection operators: extracting them from a command line and opening
//! their targets.
//!
//! Recognized operators, matched longest-first at every position:
//!
//! | operator | effect |
//! |----------|--------|
//! | `&>>`    | stdout and stderr, appending |
//! | `&>`     | stdout and stderr, truncating |
//! | `2>`     | stderr, truncating (only at the start of a word) |
//! | `>>`     | stdout, appending |
//! | `>`      | stdout, truncating |
//! | `<`      | stdin |
//!
//! Operators may touch the surrounding words (`echo hi>out`) or be separated
//! by blanks (`echo hi > out`).

use crate::command::Streams;
use crate::env::Environment;
use crate::error::ShellError;
use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Truncate,
    Append,
}

/// A file receiving output, and how it is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    pub path: String,
    pub mode: OutputMode,
}

impl OutputTarget {
    fn new(path: String, mode: OutputMode) -> Self {
        Self { path, mode }
    }
}

/// Redirections of one command invocation. At most one target per stream.
///
/// `combined` covers both stdout and stderr and is never active together with
/// `stdout`. Repeated operators for the same stream are last-write-wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectionSpec {
    pub stdin: Option<String>,
    pub stdout: Option<OutputTarget>,
    pub stderr: Option<OutputTarget>,
    pub combined: Option<OutputTarget>,
}

#[derive(Debug, Clone, Copy)]
enum Operator {
    Input,
    Output(OutputMode),
    Error,
    Combined(OutputMode),
}

const OPERATORS: &[(&str, Operator)] = &[
    ("&>>", Operator::Combined(OutputMode::Append)),
    ("&>", Operator::Combined(OutputMode::Truncate)),
    ("2>", Operator::Error),
    (">>", Operator::Output(OutputMode::Append)),
    (">", Operator::Output(OutputMode::Truncate)),
    ("<", Operator::Input),
];

/// Extracts redirections from `line`.
///
/// # Returns
/// The line with every operator and its filename removed (all other bytes
/// unchanged), and the collected [`RedirectionSpec`]. An operator without a
/// filename is a syntax error.
pub fn parse(line: &str) -> Result<(String, RedirectionSpec), ShellError> {
    let bytes = line.as_bytes();
    let mut residual = String::with_capacity(line.len());
    let mut spec = RedirectionSpec::default();
    let mut copied_up_to = 0;
    let mut pos = 0;

    while pos < bytes.len() {
        let Some((symbol, op)) = operator_at(bytes, pos) else {
            pos += 1;
            continue;
        };
        residual.push_str(&line[copied_up_to..pos]);

        let mut cursor = pos + symbol.len();
        while cursor < bytes.len() && bytes[cursor].is_ascii_whitespace() {
            cursor += 1;
        }
        let start = cursor;
        while cursor < bytes.len() && !ends_filename(bytes[cursor]) {
            cursor += 1;
        }
        if start == cursor {
            return Err(ShellError::Syntax(format!(
                "missing filename after `{symbol}`"
            )));
        }

        spec.set(op, line[start..cursor].to_string());
        pos = cursor;
        copied_up_to = cursor;
    }
    residual.push_str(&line[copied_up_to..]);

    log::trace!("redirections {spec:?}, residual {residual:?}");
    Ok((residual, spec))
}

fn operator_at(bytes: &[u8], pos: usize) -> Option<(&'static str, Operator)> {
    let at_word_start = pos == 0 || bytes[pos - 1].is_ascii_whitespace();
    OPERATORS.iter().copied().find(|(symbol, op)| {
        if matches!(op, Operator::Error) && !at_word_start {
            return false;
        }
        bytes[pos..].starts_with(symbol.as_bytes())
    })
}

fn ends_filename(b: u8) -> bool {
    b.is_ascii_whitespace() || b == b'<' || b == b'>'
}

impl RedirectionSpec {
    fn set(&mut self, op: Operator, path: String) {
        match op {
            Operator::Input => self.stdin = Some(path),
            Operator::Output(mode) => {
                // stderr stays with the earlier `&>` file
                if let Some(combined) = self.combined.take() {
                    self.stderr = Some(combined);
                }
                self.stdout = Some(OutputTarget::new(path, mode));
            }
            Operator::Error => {
                if let Some(combined) = self.combined.take() {
                    self.stdout = Some(combined);
                }
                self.stderr = Some(OutputTarget::new(path, OutputMode::Truncate));
            }
            Operator::Combined(mode) => {
                self.stdout = None;
                self.stderr = None;
                self.combined = Some(OutputTarget::new(path, mode));
            }
        }
    }

    /// Rewrites every filename with `f` (used for `$NAME` substitution).
    pub fn map_paths(self, f: impl Fn(&str) -> String) -> Self {
        let map_target = |t: OutputTarget| OutputTarget {
            path: f(&t.path),
            mode: t.mode,
        };
        Self {
            stdin: self.stdin.as_deref().map(&f),
            stdout: self.stdout.map(map_target),
            stderr: self.stderr.map(map_target),
            combined: self.combined.map(map_target),
        }
    }

    /// Opens every target relative to the session working directory and puts
    /// it in place of the matching slot of `base`.
    ///
    /// Files opened before a failing one are closed when the partially built
    /// streams are dropped; nothing outside the returned value is changed.
    pub fn open(&self, base: Streams, env: &Environment) -> Result<Streams, ShellError> {
        let mut streams = base;
        if let Some(path) = &self.stdin {
            let path = env.resolve(path);
            let file = File::open(&path).map_err(|source| ShellError::Redirect { path, source })?;
            streams.stdin = Box::new(file);
        }
        if let Some(target) = &self.stdout {
            streams.stdout = Box::new(open_output(env, target)?);
        }
        if let Some(target) = &self.stderr {
            streams.stderr = Box::new(open_output(env, target)?);
        }
        if let Some(target) = &self.combined {
            let file = open_output(env, target)?;
            let second = file.try_clone().map_err(|source| ShellError::Redirect {
                path: PathBuf::from(&target.path),
                source,
            })?;
            streams.stdout = Box::new(file);
            streams.stderr = Box::new(second);
        }
        Ok(streams)
    }
}

fn open_output(env: &Environment, target: &OutputTarget) -> Result<File, ShellError> {
    let path = env.resolve(&target.path);
    let mut options = OpenOptions::new();
    options.write(true).create(true).mode(0o644);
    match target.mode {
        OutputMode::Truncate => options.truncate(true),
        OutputMode::Append => options.append(true),
    };
    options
        .open(&path)
        .map_err(|source| ShellError::Redirect { path, source })
}
