use crate::error::ShellError;
use crate::session::Session;
use std::fs::File;
use std::io::{self, Read, Write};
use std::process::Stdio;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
pub type ExitCode = i32;

/// Abstraction over a readable input stream that can also be converted into
/// a [`Stdio`] handle for spawning external processes.
///
/// A blanket implementation exists for any type that implements `Read` and
/// `Into<Stdio>` (e.g. a `File` opened for `< input`).
pub trait Stdin: Read {
    /// Convert this input into a [`Stdio`] handle suitable for `std::process::Command`.
    fn stdio(self: Box<Self>) -> Stdio;
}

impl<T: Read + Into<Stdio>> Stdin for T {
    fn stdio(self: Box<Self>) -> Stdio {
        (*self).into()
    }
}

/// Abstraction over a writable output stream that can also be converted into
/// a [`Stdio`] handle for spawning external processes.
pub trait Stdout: Write {
    /// Convert this output into a [`Stdio`] handle suitable for `std::process::Command`.
    fn stdio(self: Box<Self>) -> Stdio;

    /// A second handle writing to the same place.
    ///
    /// Lets a command keep reporting on its stderr after the stream itself
    /// has been handed to a child process.
    fn try_clone(&self) -> io::Result<Box<dyn Stdout>>;
}

impl Stdout for File {
    fn stdio(self: Box<Self>) -> Stdio {
        (*self).into()
    }

    fn try_clone(&self) -> io::Result<Box<dyn Stdout>> {
        Ok(Box::new(File::try_clone(self)?))
    }
}

impl Stdout for io::Stdout {
    fn stdio(self: Box<Self>) -> Stdio {
        Stdio::inherit()
    }

    fn try_clone(&self) -> io::Result<Box<dyn Stdout>> {
        Ok(Box::new(io::stdout()))
    }
}

impl Stdout for io::Stderr {
    fn stdio(self: Box<Self>) -> Stdio {
        Stdio::inherit()
    }

    fn try_clone(&self) -> io::Result<Box<dyn Stdout>> {
        Ok(Box::new(io::stderr()))
    }
}

/// The three standard streams handed to one command invocation.
///
/// Redirections replace individual slots before the command runs; the streams
/// are dropped (and redirected files closed) when the command returns.
pub struct Streams {
    pub stdin: Box<dyn Stdin>,
    pub stdout: Box<dyn Stdout>,
    pub stderr: Box<dyn Stdout>,
}

/// Object-safe trait for any command that can be executed by the shell.
///
/// This is implemented by built-ins via a blanket impl and by external commands.
pub trait ExecutableCommand {
    /// Executes the command.
    fn execute(self: Box<Self>, streams: Streams, session: &mut Session)
    -> Result<ExitCode, ShellError>;
}

/// Factory that tries to create a command from a name and its arguments.
///
/// Returns `None` when the factory doesn't recognize the `name`.
pub trait CommandFactory {
    /// Attempt to create a command instance for the provided name and arguments.
    fn try_create(
        &self,
        session: &Session,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>>;
}
