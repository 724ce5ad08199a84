// LUX - Symbol table and execution engine for the LUX scripting language
// Copyright (C) 2026  Marcel Joachim Kloubert <marcel@kloubert.dev>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.


//! LUX Interpreter CLI
//!
//! Runs LUX source files and statements, or reads statements interactively.

use clap::Parser;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use lux::error::render_report;
use lux::lexer::needs_more_input;
use lux::{Interpreter, InterpreterConfig, LuxError};

/// LUX - symbol table and execution engine for the LUX scripting language
#[derive(Parser, Debug)]
#[command(name = "lux")]
#[command(author = "LUX Team")]
#[command(version)]
#[command(about = "Interpreter for the LUX numerical scripting language")]
#[command(long_about = r#"
LUX runs scripts written in a small array-oriented scripting language.
Files are executed first, then statements given with -e. Without either,
statements are read from standard input.

Example usage:
  lux script.lux
  lux -e "print, total(indgen(10))"
  lux -p ./lib analysis.lux --stats
"#)]
struct Cli {
    /// Source files to run (.lux)
    files: Vec<PathBuf>,

    /// Statement to execute after the files (repeatable)
    #[arg(short = 'e', long = "execute", value_name = "STATEMENT")]
    statements: Vec<String>,

    /// Directory searched for include and routine files (repeatable)
    #[arg(short = 'p', long = "path", env = "LUX_PATH", value_delimiter = ':')]
    search_path: Vec<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print symbol range usage at exit
    #[arg(long)]
    stats: bool,

    /// Slots in the named-variable range
    #[arg(long, value_name = "N")]
    named_slots: Option<usize>,

    /// Slots in the temporary-variable range
    #[arg(long, value_name = "N")]
    temp_slots: Option<usize>,

    /// Slots in the executable range
    #[arg(long, value_name = "N")]
    exec_slots: Option<usize>,

    /// Slots in the temporary-executable range
    #[arg(long, value_name = "N")]
    temp_exec_slots: Option<usize>,
}

/// How a run ended.
enum Outcome {
    Success,
    ScriptError,
    Unreadable,
    Fatal,
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success => ExitCode::SUCCESS,
            Outcome::ScriptError => ExitCode::from(1),
            Outcome::Unreadable => ExitCode::from(3),
            Outcome::Fatal => ExitCode::from(4),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = build_config(&cli);
    log::debug!("range capacities: {:?}", config.capacities());

    let mut interp = match Interpreter::new(config) {
        Ok(interp) => interp,
        Err(e) => {
            eprintln!("Error: Cannot start interpreter: {}", e);
            return Outcome::Fatal.into();
        }
    };

    let outcome = run(&cli, &mut interp);
    if cli.stats {
        print_stats(&interp);
    }
    outcome.into()
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn build_config(cli: &Cli) -> InterpreterConfig {
    let mut config = InterpreterConfig::default();
    if let Some(dir) = cli.files.first().and_then(|f| f.parent()) {
        if !dir.as_os_str().is_empty() {
            config = config.with_base_dir(dir);
        }
    }
    for dir in &cli.search_path {
        config = config.with_search_dir(dir);
    }
    if let Some(n) = cli.named_slots {
        config.named_slots = n;
    }
    if let Some(n) = cli.temp_slots {
        config.temp_slots = n;
    }
    if let Some(n) = cli.exec_slots {
        config.exec_slots = n;
    }
    if let Some(n) = cli.temp_exec_slots {
        config.temp_exec_slots = n;
    }
    config
}

fn run(cli: &Cli, interp: &mut Interpreter) -> Outcome {
    for path in &cli.files {
        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => {
                eprintln!("Error: Cannot read {}: {}", path.display(), e);
                return Outcome::Unreadable;
            }
        };
        log::info!("running {}", path.display());
        if let Err(e) = interp.run_source(&source) {
            return report(interp, &e, &source, file_label(path));
        }
    }

    for statement in &cli.statements {
        if let Err(e) = interp.run_source(statement) {
            return report(interp, &e, statement, "<command line>");
        }
    }

    if cli.files.is_empty() && cli.statements.is_empty() {
        return repl(interp);
    }
    Outcome::Success
}

/// Read statements from standard input until it is exhausted.
///
/// Input that ends inside an open construct is continued on the next line.
/// Errors are reported and counted, and reading goes on.
fn repl(interp: &mut Interpreter) -> Outcome {
    let stdin = io::stdin();
    let interactive = stdin.is_terminal();
    let mut buffer = String::new();
    let mut failed = false;

    prompt(interactive, false);
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                eprintln!("Error: Cannot read standard input: {}", e);
                return Outcome::Unreadable;
            }
        };
        buffer.push_str(&line);
        buffer.push('\n');
        if needs_more_input(&buffer) {
            prompt(interactive, true);
            continue;
        }

        if let Err(e) = interp.run_source(&buffer) {
            if let Outcome::Fatal = report(interp, &e, &buffer, "<stdin>") {
                return Outcome::Fatal;
            }
            failed = true;
        }
        buffer.clear();
        prompt(interactive, false);
    }

    if !buffer.trim().is_empty() {
        if let Err(e) = interp.run_source(&buffer) {
            return report(interp, &e, &buffer, "<stdin>");
        }
    }
    if failed && !interactive {
        Outcome::ScriptError
    } else {
        Outcome::Success
    }
}

fn prompt(interactive: bool, continuation: bool) {
    if interactive {
        print!("{}", if continuation { "...> " } else { "LUX> " });
        let _ = io::stdout().flush();
    }
}

/// Print an error and count it in `!ERRORS`.
fn report(interp: &mut Interpreter, error: &LuxError, source: &str, label: &str) -> Outcome {
    let color = io::stderr().is_terminal();
    eprint!("{}", render_report(error, source, Some(label), color));
    interp.record_error();
    if error.code.is_fatal() {
        Outcome::Fatal
    } else {
        Outcome::ScriptError
    }
}

fn file_label(path: &Path) -> &str {
    path.file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("<input>")
}

fn print_stats(interp: &Interpreter) {
    eprintln!("{:<22} {:>8} {:>8} {:>8}", "range", "capacity", "in use", "cursor");
    for stats in interp.stats() {
        eprintln!(
            "{:<22} {:>8} {:>8} {:>8}",
            stats.region.name(),
            stats.capacity,
            stats.in_use,
            stats.cursor
        );
    }
}
