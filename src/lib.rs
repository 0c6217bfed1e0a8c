//! A small line-oriented command shell.
//!
//! Each input line is stripped of comments, searched for redirections
//! (`<`, `>`, `>>`, `&>`, `&>>`, `2>`), split into words, expanded
//! (`$NAME` from exported, then local variables), recorded in a bounded
//! history and finally run, either as one of the builtins (`cd`, `pwd`,
//! `export`, `local`, `vars`, `history`, `ls`, `exit`) or as an external
//! program found through `PATH`.
//!
//! The main entry point is [`Interpreter`], which owns one [`Session`]
//! (exported variables, working directory, local variables, history and exit
//! status). The public modules [`command`], [`env`] and [`history`] expose the
//! traits and types the interpreter is built from.

mod builtin;
pub mod command;
pub mod env;
pub mod error;
mod external;
pub mod history;
mod interpreter;
mod io_adapters;
mod lexer;
pub mod redirect;
mod session;
mod substitute;
mod vars;

pub use error::ShellError;
pub use interpreter::Interpreter;
pub use io_adapters::{Captured, Console, MemReader, MemWriter, Terminal};
pub use session::Session;
pub use vars::LocalVars;
