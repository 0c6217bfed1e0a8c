use crate::command::{CommandFactory, ExecutableCommand, ExitCode, Streams};
use crate::error::ShellError;
use crate::interpreter::Factory;
use crate::session::Session;
use std::ffi::OsString;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

/// Command that is not a builtin.
pub struct ExternalCommand {
    /// The name as typed; becomes the child's `argv[0]`.
    name: String,
    program: PathBuf,
    args: Vec<OsString>,
}

impl ExternalCommand {
    pub fn new(name: impl Into<String>, program: PathBuf, args: Vec<OsString>) -> Self {
        Self {
            name: name.into(),
            program,
            args,
        }
    }
}

impl CommandFactory for Factory<ExternalCommand> {
    fn try_create(
        &self,
        session: &Session,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        let search_paths = session.env.get_var("PATH").unwrap_or_default();
        let program = find_command_path(search_paths, &session.env.current_dir, name)?;
        log::debug!("resolved {name} to {}", program.display());
        Some(Box::new(ExternalCommand::new(
            name,
            program,
            args.iter().map(OsString::from).collect(),
        )))
    }
}

impl ExecutableCommand for ExternalCommand {
    /// Spawns the program with the session environment and waits for it.
    ///
    /// A program that cannot be started is reported on the command's own
    /// stderr and yields status 126.
    fn execute(
        self: Box<Self>,
        streams: Streams,
        session: &mut Session,
    ) -> Result<ExitCode, ShellError> {
        let Streams {
            stdin,
            stdout,
            stderr,
        } = streams;
        let mut diagnostics = stderr.try_clone()?;
        let spawned = std::process::Command::new(&self.program)
            .arg0(&self.name)
            .args(&self.args)
            .env_clear()
            .envs(&session.env.vars)
            .current_dir(&session.env.current_dir)
            .stdin(stdin.stdio())
            .stdout(stdout.stdio())
            .stderr(stderr.stdio())
            .spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(source) => {
                let err = ShellError::Spawn {
                    name: self.name.clone(),
                    source,
                };
                log::debug!("spawn failed: {err:?}");
                writeln!(diagnostics, "tinysh: {err}")?;
                return Ok(err.status());
            }
        };
        drop(diagnostics);
        let exit_status = child.wait()?;
        let code = match exit_status.code() {
            Some(x) => x,
            None => terminated_by_signal(exit_status),
        };
        log::debug!("{} exited with {code}", self.name);
        Ok(code)
    }
}

fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Empty name: returns `None`.
/// - Name containing `/` (absolute, `./foo`, `bin/sh`): taken literally,
///   relative names against `cwd`; returned if a file exists there. Whether it
///   can actually be executed is left to the spawn.
/// - Anything else: each non-empty `:`-separated directory of `search_paths`
///   (relative ones against `cwd`) is tried in order and the first regular
///   file with an execute bit wins.
pub fn find_command_path(search_paths: &str, cwd: &Path, name: &str) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }

    if name.contains('/') {
        let path = cwd.join(name);
        return path.is_file().then_some(path);
    }

    search_paths
        .split(':')
        .filter(|dir| !dir.is_empty())
        .map(|dir| cwd.join(dir).join(name))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}
