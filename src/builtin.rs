use crate::command::{CommandFactory, ExecutableCommand, ExitCode, Streams};
use crate::error::ShellError;
use crate::interpreter::Factory;
use crate::session::Session;
use crate::vars;
use anyhow::{Context, Result, anyhow, bail};
use argh::{EarlyExit, FromArgs};
use std::fs;
use std::io::Write;

/// Names of every builtin, in dispatch order.
pub const BUILTIN_NAMES: &[&str] = &[
    "cd", "pwd", "export", "local", "vars", "history", "ls", "exit",
];

/// Whether `name` is handled in-process rather than by spawning a program.
pub fn is_builtin(name: &str) -> bool {
    BUILTIN_NAMES.contains(&name)
}

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "cd" or "history".
    fn name() -> &'static str;

    /// Executes the command against the session state.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    /// An `Err` is printed on `stderr` by the dispatcher and turns into status 1.
    fn execute(
        self,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        session: &mut Session,
    ) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        streams: Streams,
        session: &mut Session,
    ) -> Result<ExitCode, ShellError> {
        let Streams {
            mut stdout,
            mut stderr,
            ..
        } = streams;
        let status = match <T as BuiltinCommand>::execute(*self, &mut stdout, &mut stderr, session) {
            Ok(x) => x,
            Err(e) => {
                writeln!(stderr, "tinysh: {e:#}")?;
                1
            }
        };
        stdout.flush()?;
        Ok(status)
    }
}

struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        streams: Streams,
        _session: &mut Session,
    ) -> Result<ExitCode, ShellError> {
        let Streams {
            mut stdout,
            mut stderr,
            ..
        } = streams;
        if self.is_error {
            writeln!(stderr, "{}", self.output.trim_end())?;
            Ok(1)
        } else {
            writeln!(stdout, "{}", self.output.trim_end())?;
            Ok(0)
        }
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(
        &self,
        _session: &Session,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        if name == T::name() {
            Some(match T::from_args(&[name], args) {
                Ok(cmd) => Box::new(cmd),
                Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                    output,
                    is_error: status.is_err(),
                }),
            })
        } else {
            None
        }
    }
}

/// Splits `NAME=VALUE`. A missing `=` yields `None`.
fn split_assignment(assignment: &str) -> Option<(&str, &str)> {
    assignment.split_once('=')
}

fn check_name(builtin: &str, name: &str) -> Result<()> {
    if vars::is_valid_name(name) {
        Ok(())
    } else {
        bail!("{builtin}: `{name}': not a valid identifier")
    }
}

#[derive(FromArgs)]
/// Print the current working directory to standard output.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn execute(
        self,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        session: &mut Session,
    ) -> Result<ExitCode> {
        writeln!(stdout, "{}", session.env.current_dir.display())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory.
    pub target: String,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(
        self,
        _stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        session: &mut Session,
    ) -> Result<ExitCode> {
        let new_dir = session.env.resolve(&self.target);
        let canonical = fs::canonicalize(&new_dir)
            .with_context(|| format!("cd: {}", self.target))?;
        if !canonical.is_dir() {
            bail!("cd: {}: Not a directory", self.target);
        }
        fs::read_dir(&canonical).with_context(|| format!("cd: {}", self.target))?;

        log::debug!("cd: {}", canonical.display());
        session
            .env
            .set_var("PWD", canonical.to_string_lossy().into_owned());
        session.env.current_dir = canonical;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Set an environment variable inherited by every command started afterwards.
pub struct Export {
    #[argh(positional)]
    /// assignment in the form NAME=VALUE.
    pub assignment: String,
}

impl BuiltinCommand for Export {
    fn name() -> &'static str {
        "export"
    }

    fn execute(
        self,
        _stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        session: &mut Session,
    ) -> Result<ExitCode> {
        let (name, value) = split_assignment(&self.assignment)
            .ok_or_else(|| anyhow!("export: `{}': expected NAME=VALUE", self.assignment))?;
        check_name("export", name)?;

        if name == "PATH" {
            let usable = value
                .split(':')
                .filter(|dir| !dir.is_empty())
                .any(|dir| session.env.resolve(dir).is_dir());
            if !usable {
                log::debug!("PATH={value:?} has no existing directory");
                writeln!(stderr, "tinysh: export: invalid PATH value `{value}'")?;
                session.mark_path_invalid();
            }
        }

        session.env.set_var(name, value);
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Set a shell-local variable, visible to substitution but not to child processes.
pub struct Local {
    #[argh(positional)]
    /// assignment in the form NAME=VALUE; VALUE may be empty.
    pub assignment: String,
}

impl BuiltinCommand for Local {
    fn name() -> &'static str {
        "local"
    }

    fn execute(
        self,
        _stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        session: &mut Session,
    ) -> Result<ExitCode> {
        let (name, value) = split_assignment(&self.assignment).unwrap_or((self.assignment.as_str(), ""));
        check_name("local", name)?;
        session.locals.set(name, value);
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Print every local variable as NAME=VALUE, in the order they were defined.
pub struct Vars {}

impl BuiltinCommand for Vars {
    fn name() -> &'static str {
        "vars"
    }

    fn execute(
        self,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        session: &mut Session,
    ) -> Result<ExitCode> {
        for (name, value) in session.locals.iter() {
            writeln!(stdout, "{name}={value}")?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Show the command history, run entry N again, or change its size with `set N`.
pub struct HistoryCmd {
    #[argh(positional, greedy)]
    /// nothing to list, N to run entry N again, or `set N`.
    pub args: Vec<String>,
}

impl BuiltinCommand for HistoryCmd {
    fn name() -> &'static str {
        "history"
    }

    fn execute(
        self,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        session: &mut Session,
    ) -> Result<ExitCode> {
        let args: Vec<&str> = self.args.iter().map(String::as_str).collect();
        match args.as_slice() {
            [] => {
                for (index, command) in session.history.entries() {
                    writeln!(stdout, "{index}) {command}")?;
                }
            }
            ["set", size] => {
                let size: usize = size
                    .parse()
                    .map_err(|_| anyhow!("history: invalid size `{size}'"))?;
                session.history.resize(size).context("history")?;
            }
            ["set"] => bail!("history: missing size for `history set'"),
            [index] => {
                let n: usize = index
                    .parse()
                    .map_err(|_| anyhow!("history: invalid index `{index}'"))?;
                let command = session
                    .history
                    .get(n)
                    .ok_or_else(|| anyhow!("history: {n}: no such entry"))?
                    .to_string();
                writeln!(stdout, "{command}")?;
                session.queue_replay(command);
            }
            ["set", _, extra, ..] | [_, extra, ..] => {
                bail!("history: unexpected argument `{extra}'")
            }
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// List the entries of the current directory, hidden ones excluded, sorted by name.
pub struct Ls {}

impl BuiltinCommand for Ls {
    fn name() -> &'static str {
        "ls"
    }

    fn execute(
        self,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        session: &mut Session,
    ) -> Result<ExitCode> {
        let dir = &session.env.current_dir;
        let mut names = Vec::new();
        for entry in fs::read_dir(dir).with_context(|| format!("ls: {}", dir.display()))? {
            let name = entry.context("ls")?.file_name();
            if name.as_encoded_bytes().first() != Some(&b'.') {
                names.push(name);
            }
        }
        // OsString ordering is plain byte order on unix
        names.sort();
        for name in names {
            writeln!(stdout, "{}", name.to_string_lossy())?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Exit shell process
pub struct Exit {
    #[argh(positional)]
    /// exit status; defaults to the status of the last command.
    pub code: Option<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(
        self,
        _stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        session: &mut Session,
    ) -> Result<ExitCode> {
        let code = match self.code {
            Some(code) => code
                .parse()
                .map_err(|_| anyhow!("exit: {code}: numeric argument required"))?,
            None => session.last_status(),
        };
        session.request_exit();
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Environment;
    use std::path::Path;

    fn session_in(dir: &Path) -> Session {
        let mut env = Environment::empty(fs::canonicalize(dir).unwrap());
        env.set_var("PATH", "/bin:/usr/bin");
        Session::new(env)
    }

    fn run<T: BuiltinCommand>(cmd: T, session: &mut Session) -> (Result<ExitCode>, String, String) {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let res = cmd.execute(&mut out, &mut err, session);
        (
            res,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn test_pwd_prints_session_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = session_in(tmp.path());
        let (res, out, _) = run(Pwd {}, &mut session);
        assert_eq!(res.unwrap(), 0);
        assert_eq!(out, format!("{}\n", session.env.current_dir.display()));
    }

    #[test]
    fn test_cd_relative_and_absolute() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();
        let mut session = session_in(tmp.path());
        let root = session.env.current_dir.clone();

        let (res, _, _) = run(Cd { target: "sub".into() }, &mut session);
        assert_eq!(res.unwrap(), 0);
        assert_eq!(session.env.current_dir, root.join("sub"));
        assert_eq!(session.env.get_var("PWD"), root.join("sub").to_str());

        let target = root.to_string_lossy().into_owned();
        run(Cd { target }, &mut session).0.unwrap();
        assert_eq!(session.env.current_dir, root);
    }

    #[test]
    fn test_cd_nonexistent_path_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = session_in(tmp.path());
        let before = session.env.current_dir.clone();

        let (res, _, _) = run(Cd { target: "missing".into() }, &mut session);
        assert!(res.is_err());
        assert_eq!(session.env.current_dir, before);
    }

    #[test]
    fn test_cd_into_a_file_errors() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("file"), "").unwrap();
        let mut session = session_in(tmp.path());
        let (res, _, _) = run(Cd { target: "file".into() }, &mut session);
        assert!(res.unwrap_err().to_string().contains("Not a directory"));
    }

    #[test]
    fn test_cd_argument_count_is_checked() {
        let tmp = tempfile::tempdir().unwrap();
        let session = session_in(tmp.path());
        for args in [&[][..], &["a", "b"][..]] {
            let cmd = Factory::<Cd>::default().try_create(&session, "cd", args);
            assert!(cmd.is_some());
            assert!(Cd::from_args(&["cd"], args).is_err());
        }
    }

    #[test]
    fn test_export_sets_env() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = session_in(tmp.path());
        let (res, _, _) = run(
            Export {
                assignment: "GREETING=hello=world".into(),
            },
            &mut session,
        );
        assert_eq!(res.unwrap(), 0);
        assert_eq!(session.env.get_var("GREETING"), Some("hello=world"));
        assert!(!session.path_invalid());
    }

    #[test]
    fn test_export_requires_assignment() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = session_in(tmp.path());
        let (res, _, _) = run(Export { assignment: "JUSTNAME".into() }, &mut session);
        assert!(res.is_err());
        let (res, _, _) = run(Export { assignment: "1X=a".into() }, &mut session);
        assert!(res.is_err());
    }

    #[test]
    fn test_export_invalid_path_raises_fatal_flag() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = session_in(tmp.path());
        let (res, _, err) = run(
            Export {
                assignment: "PATH=/no/such/dir:/nor/this".into(),
            },
            &mut session,
        );
        assert_eq!(res.unwrap(), 0);
        assert!(err.contains("invalid PATH"));
        assert!(session.path_invalid());
        assert_eq!(session.env.get_var("PATH"), Some("/no/such/dir:/nor/this"));
    }

    #[test]
    fn test_export_path_with_one_good_dir_is_fine() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("bin")).unwrap();
        let mut session = session_in(tmp.path());
        run(
            Export {
                assignment: "PATH=/no/such/dir:bin".into(),
            },
            &mut session,
        )
        .0
        .unwrap();
        assert!(!session.path_invalid());
    }

    #[test]
    fn test_local_and_vars() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = session_in(tmp.path());
        for assignment in ["b=2", "a=1", "b=3", "empty"] {
            let (res, _, _) = run(
                Local {
                    assignment: assignment.into(),
                },
                &mut session,
            );
            assert_eq!(res.unwrap(), 0);
        }
        let (_, out, _) = run(Vars {}, &mut session);
        assert_eq!(out, "b=3\na=1\nempty=\n");
        assert_eq!(session.env.get_var("a"), None);
    }

    fn history(args: &[&str]) -> HistoryCmd {
        HistoryCmd {
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    #[test]
    fn test_history_list_set_and_replay() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = session_in(tmp.path());
        for cmd in ["echo a", "echo b", "echo c"] {
            session.history.record(cmd, "echo");
        }

        let (_, out, _) = run(
history(&["set", "2"]),
            &mut session,
        );
        assert!(out.is_empty());

        let (_, out, _) = run(
history(&[]),
            &mut session,
        );
        assert_eq!(out, "1) echo b\n2) echo c\n");

        let (res, out, _) = run(
history(&["1"]),
            &mut session,
        );
        assert_eq!(res.unwrap(), 0);
        assert_eq!(out, "echo b\n");
        assert_eq!(session.take_replay().as_deref(), Some("echo b"));
    }

    #[test]
    fn test_history_rejects_bad_arguments() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = session_in(tmp.path());
        session.history.record("echo a", "echo");
        let cases: [&[&str]; 8] = [
            &["0"],
            &["2"],
            &["x"],
            &["set"],
            &["set", "-1"],
            &["set", "101"],
            &["1", "2"],
            &["set", "2", "extra"],
        ];
        for args in cases {
            let (res, _, _) = run(history(args), &mut session);
            assert!(res.is_err(), "history {args:?}");
        }
        assert_eq!(session.take_replay(), None);
        assert_eq!(session.history.capacity(), 5);
    }

    #[test]
    fn test_ls_sorts_bytewise_and_hides_dotfiles() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["b", "B", "a.txt", ".hidden", "_x"] {
            fs::write(tmp.path().join(name), "").unwrap();
        }
        fs::create_dir(tmp.path().join("dir")).unwrap();
        let mut session = session_in(tmp.path());
        let (res, out, _) = run(Ls {}, &mut session);
        assert_eq!(res.unwrap(), 0);
        assert_eq!(out, "B\n_x\na.txt\nb\ndir\n");
    }

    #[test]
    fn test_exit_uses_last_status_by_default() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = session_in(tmp.path());
        session.set_last_status(7);
        let (res, _, _) = run(Exit { code: None }, &mut session);
        assert_eq!(res.unwrap(), 7);
        assert!(session.should_exit());
    }

    #[test]
    fn test_exit_with_code() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = session_in(tmp.path());
        let (res, _, _) = run(Exit { code: Some("3".into()) }, &mut session);
        assert_eq!(res.unwrap(), 3);

        let mut session = session_in(tmp.path());
        let (res, _, _) = run(Exit { code: Some("x".into()) }, &mut session);
        assert!(res.is_err());
        assert!(!session.should_exit());
    }

    #[test]
    fn test_builtin_names() {
        assert!(is_builtin("cd"));
        assert!(is_builtin("history"));
        assert!(!is_builtin("echo"));
        assert!(!is_builtin("CD"));
    }
}
