use anyhow::{Context, Result};
use argh::FromArgs;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process::ExitCode;
use tinysh::Interpreter;

#[derive(FromArgs)]
/// A small line-oriented shell. Reads commands from SCRIPT when given,
/// otherwise from the terminal.
struct Cli {
    #[argh(positional)]
    /// file with one command per line.
    script: Option<PathBuf>,

    #[argh(switch, short = 'v')]
    /// log every resolved command to stderr.
    verbose: bool,

    #[argh(option)]
    /// number of history entries to keep (at most 100).
    history_size: Option<usize>,
}

fn main() -> ExitCode {
    let cli: Cli = argh::from_env();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(status) => ExitCode::from((status & 0xff) as u8),
        Err(err) => {
            eprintln!("tinysh: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    // a second logger or a missing terminal only costs us diagnostics
    let _ = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );
}

fn run(cli: Cli) -> Result<i32> {
    let mut sh = Interpreter::default();
    if let Some(size) = cli.history_size {
        sh.session_mut()
            .history
            .resize(size)
            .context("--history-size")?;
    }

    match cli.script {
        Some(path) => {
            let file =
                File::open(&path).with_context(|| format!("cannot open {}", path.display()))?;
            log::debug!("running script {}", path.display());
            Ok(sh.run_batch(BufReader::new(file))?)
        }
        None => Ok(sh.repl()?),
    }
}
