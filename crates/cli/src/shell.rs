//! Line-oriented console shell.
//!
//! Reads one command per line from stdin and keeps the bus session open
//! between lines. Blank lines and `#` comments are skipped.

use anyhow::Result;
use clap::Parser;
use smconsole_simplemotion_v2::SmBus;
use std::io::{self, BufRead, IsTerminal, Write};

use crate::commands::{ShellCommand, ShellLine};
use crate::console::Console;
use crate::output;

pub fn run<B: SmBus>(console: &mut Console<B>, json: bool, show_errors: bool) -> Result<()> {
    let stdin = io::stdin();
    let interactive = stdin.is_terminal();

    prompt(interactive, console.is_connected())?;
    for line in stdin.lock().lines() {
        let line = line?;
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.first() {
            None => {}
            Some(word) if word.starts_with('#') => {}
            Some(_) => match ShellLine::try_parse_from(&words) {
                Ok(ShellLine {
                    command: ShellCommand::Quit,
                }) => break,
                Ok(ShellLine {
                    command: ShellCommand::Console(command),
                }) => match console.execute(&command) {
                    Ok(report) => output::print_report(&report, json, show_errors),
                    Err(e) => {
                        let e = anyhow::Error::from(e);
                        if json {
                            output::print_error_json(&e);
                        } else {
                            output::print_error_human(&e);
                        }
                    }
                },
                Err(e) => e.print()?,
            },
        }
        prompt(interactive, console.is_connected())?;
    }
    Ok(())
}

fn prompt(interactive: bool, connected: bool) -> io::Result<()> {
    if interactive {
        let mut stderr = io::stderr();
        let prompt = if connected { "sm> " } else { "sm (not connected)> " };
        write!(stderr, "{}", prompt)?;
        stderr.flush()?;
    }
    Ok(())
}
