use crate::command::{CommandFactory, ExitCode};
use crate::env::Environment;
use crate::error::ShellError;
use crate::io_adapters::{Console, Terminal};
use crate::lexer;
use crate::redirect;
use crate::session::Session;
use crate::substitute;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{BufRead, Write};

const PROMPT: &str = "tinysh> ";

/// Factory allows creating instances of ExecutableCommand.
///
/// Implemented for the builtins and for ExternalCommand.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// A line-oriented shell that runs builtins in-process and everything else as
/// a child process.
///
/// The interpreter owns a [`Session`] and a list of [`CommandFactory`] objects
/// that are queried in order to create commands by name. See [`Default`] for
/// the factories included out of the box.
///
/// Example
/// ```
/// use tinysh::{Captured, Interpreter};
/// let console = Captured::new();
/// let mut sh = Interpreter::default().with_console(console.clone());
/// sh.execute_line("local greeting=hello", true);
/// sh.execute_line("vars", true);
/// assert_eq!(console.stdout_text(), "greeting=hello\n");
/// ```
pub struct Interpreter {
    session: Session,
    commands: Vec<Box<dyn CommandFactory>>,
    console: Box<dyn Console>,
    /// Set while a history entry is being re-run.
    replaying: bool,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of command factories.
    pub fn new(session: Session, commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self {
            session,
            commands,
            console: Box::new(Terminal),
            replaying: false,
        }
    }

    /// Replace the streams commands start from (the terminal by default).
    pub fn with_console(mut self, console: impl Console + 'static) -> Self {
        self.console = Box::new(console);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Run one command line and return its status.
    ///
    /// The line goes through comment stripping, redirection parsing,
    /// tokenizing and variable substitution, is recorded in the history when
    /// `add_to_history` is set, and is then dispatched to the first factory
    /// that recognizes its command name. A syntax error leaves the session
    /// untouched.
    ///
    /// A `history N` reached while re-running a history entry prints the
    /// entry but does not run it again.
    pub fn execute_line(&mut self, line: &str, add_to_history: bool) -> ExitCode {
        let line = lexer::strip_comment(line).trim();
        if line.is_empty() {
            return self.session.last_status();
        }

        let status = match self.execute_command(line, add_to_history) {
            Ok(status) => status,
            Err(err) if err.is_syntax() => {
                self.report(&err);
                return err.status();
            }
            Err(err) => {
                self.report(&err);
                err.status()
            }
        };
        self.session.set_last_status(status);

        if let Some(entry) = self.session.take_replay() {
            if self.replaying {
                log::debug!("not re-running {entry:?} from inside a replay");
                return status;
            }
            log::debug!("re-running history entry {entry:?}");
            self.replaying = true;
            let status = self.execute_line(&entry, false);
            self.replaying = false;
            return status;
        }
        status
    }

    fn execute_command(&mut self, line: &str, add_to_history: bool) -> Result<ExitCode, ShellError> {
        let (residual, redirections) = redirect::parse(line)?;
        let words = lexer::split_into_tokens(&residual)?;

        let session = &mut self.session;
        let argv = substitute::expand_words(&words, &session.env, &session.locals);
        let redirections = redirections
            .map_paths(|path| substitute::substitute(path, &session.env, &session.locals).into_owned());

        let Some((name, args)) = argv.split_first() else {
            return Ok(0);
        };
        if add_to_history {
            session.history.record(line, name);
        }
        log::debug!("executing {name} {args:?}");

        let mut streams = redirections.open(self.console.streams(), &session.env)?;
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        for factory in &self.commands {
            if let Some(cmd) = factory.try_create(session, name, &args) {
                return cmd.execute(streams, session);
            }
        }

        let err = ShellError::NotFound(name.clone());
        writeln!(streams.stderr, "tinysh: {err}")?;
        Ok(err.status())
    }

    /// Reports errors raised before the command's own streams exist.
    fn report(&self, err: &ShellError) {
        log::debug!("line failed: {err:?}");
        let mut stderr = self.console.streams().stderr;
        // nowhere left to report a failing stderr
        let _ = writeln!(stderr, "tinysh: {err}");
    }

    /// Feed every line of `reader` to [`execute_line`](Self::execute_line)
    /// until the input ends or `exit` runs.
    pub fn run_batch(&mut self, reader: impl BufRead) -> std::io::Result<ExitCode> {
        for line in reader.lines() {
            self.execute_line(&line?, true);
            if self.session.should_exit() {
                break;
            }
        }
        Ok(self.session.final_status())
    }

    /// Read lines from the terminal with a `tinysh> ` prompt.
    ///
    /// Ctrl-C abandons the current line, Ctrl-D ends the session.
    pub fn repl(&mut self) -> rustyline::Result<ExitCode> {
        let mut rl = DefaultEditor::new()?;

        while !self.session.should_exit() {
            match rl.readline(PROMPT) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str())?;
                    }
                    self.execute_line(&line, true);
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err),
            }
        }

        Ok(self.session.final_status())
    }
}

impl Default for Interpreter {
    /// Create an interpreter over the process environment with the default set
    /// of commands:
    /// - built-ins: `cd`, `pwd`, `export`, `local`, `vars`, `history`, `ls`, `exit`
    /// - external command launcher
    fn default() -> Self {
        use crate::builtin::*;
        use crate::external::ExternalCommand;
        Self::new(
            Session::new(Environment::from_process()),
            vec![
                Box::new(Factory::<Cd>::default()),
                Box::new(Factory::<Pwd>::default()),
                Box::new(Factory::<Export>::default()),
                Box::new(Factory::<Local>::default()),
                Box::new(Factory::<Vars>::default()),
                Box::new(Factory::<HistoryCmd>::default()),
                Box::new(Factory::<Ls>::default()),
                Box::new(Factory::<Exit>::default()),
                Box::new(Factory::<ExternalCommand>::default()),
            ],
        )
    }
}
