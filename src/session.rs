use crate::command::ExitCode;
use crate::env::Environment;
use crate::error::STATUS_FATAL_PATH;
use crate::history::History;
use crate::vars::LocalVars;

/// All state of one shell session.
///
/// Owned by the [`Interpreter`](crate::Interpreter) and lent to every command
/// it runs; builtins mutate it directly.
#[derive(Debug, Clone)]
pub struct Session {
    pub env: Environment,
    pub locals: LocalVars,
    pub history: History,
    last_status: ExitCode,
    path_invalid: bool,
    should_exit: bool,
    replay: Option<String>,
}

impl Session {
    pub fn new(env: Environment) -> Self {
        Self {
            env,
            locals: LocalVars::new(),
            history: History::default(),
            last_status: 0,
            path_invalid: false,
            should_exit: false,
            replay: None,
        }
    }

    /// Status of the most recent command.
    pub fn last_status(&self) -> ExitCode {
        self.last_status
    }

    pub(crate) fn set_last_status(&mut self, status: ExitCode) {
        self.last_status = status;
    }

    /// Set once an `export PATH=...` left no usable search directory.
    pub fn path_invalid(&self) -> bool {
        self.path_invalid
    }

    pub(crate) fn mark_path_invalid(&mut self) {
        self.path_invalid = true;
    }

    /// Set by `exit`; the line source stops feeding lines.
    pub fn should_exit(&self) -> bool {
        self.should_exit
    }

    pub(crate) fn request_exit(&mut self) {
        self.should_exit = true;
    }

    /// Queue a history entry to run once the current builtin has returned.
    pub(crate) fn queue_replay(&mut self, command: String) {
        self.replay = Some(command);
    }

    pub(crate) fn take_replay(&mut self) -> Option<String> {
        self.replay.take()
    }

    /// Exit status of the whole shell process.
    ///
    /// The fatal PATH flag wins over whatever the last command returned.
    pub fn final_status(&self) -> ExitCode {
        if self.path_invalid {
            STATUS_FATAL_PATH
        } else {
            self.last_status
        }
    }
}
