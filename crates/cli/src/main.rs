//! smconsole - SimpleMotion V2 operator console
//!
//! Drives one servo drive over an SM bus: enable, home, move, read status
//! and raw parameters. Every action is followed by a bus status check that
//! reports transport and drive-side command errors.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod commands;
mod config;
mod console;
mod drive;
mod error;
mod output;
mod shell;

use anyhow::Result;
use clap::{Parser, Subcommand};
use smconsole_simplemotion_v2::NodeAddress;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{
    EnvFilter, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::commands::ConsoleCommand;
use crate::config::ConsoleConfig;
use crate::console::Console;
use crate::error::CliError;

#[derive(Parser)]
#[command(name = "smconsole")]
#[command(about = "SimpleMotion V2 operator console - drive control and bus diagnostics")]
#[command(version)]
#[command(long_about = "
smconsole talks to a servo drive over a SimpleMotion V2 bus. Each action is
followed by a bus status check; transport and drive-side errors are reported
on stderr and turn into a non-zero exit code.

Run `smconsole shell` to keep the bus open and type commands one per line.
Use --json flag for machine-readable output suitable for scripting.
")]
struct Cli {
    /// Output format (human-readable or JSON)
    #[arg(
        long,
        global = true,
        help = "Output in JSON format for machine parsing"
    )]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file
    #[arg(long, global = true, env = "SMCONSOLE_CONFIG")]
    config: Option<PathBuf>,

    /// Bus device name, or `virtual` for the simulated drive
    #[arg(long, global = true)]
    bus: Option<String>,

    /// Drive node address
    #[arg(short, long, global = true)]
    address: Option<NodeAddress>,

    /// Run fast checks after actions
    #[arg(long)]
    fast: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive shell reading commands from stdin
    Shell,

    #[command(flatten)]
    Console(ConsoleCommand),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = execute_command(&cli);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let cli_error = e.downcast_ref::<CliError>();

            // A failed check has already been reported with its command output.
            if !matches!(cli_error, Some(CliError::CheckFailed(_))) {
                if cli.json {
                    output::print_error_json(&e);
                } else {
                    output::print_error_human(&e);
                }
            }

            ExitCode::from(cli_error.map_or(1, CliError::exit_code))
        }
    }
}

/// Install the log subscriber. Returns false when the filter drops every
/// event, bus error reports included.
fn init_logging(verbose: u8, configured_level: &str) -> bool {
    let log_level = match verbose {
        0 => configured_level,
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "smconsole={0},smconsole_diagnostics={0},smconsole_simplemotion_v2={0}",
            log_level
        ))
    });
    let reports_logged = filter.max_level_hint() != Some(LevelFilter::OFF);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    reports_logged
}

fn execute_command(cli: &Cli) -> Result<()> {
    let mut config = ConsoleConfig::resolve(cli.config.as_deref())?;
    config.apply_overrides(cli.bus.as_deref(), cli.address, cli.fast)?;
    let show_errors = !init_logging(cli.verbose, &config.log.level);

    let mut console = Console::new(config);
    match &cli.command {
        Commands::Shell => shell::run(&mut console, cli.json, show_errors),
        Commands::Console(command) => {
            if command.needs_session() {
                console.ensure_connected()?;
            }
            let report = console.execute(command)?;
            output::print_report(&report, cli.json, show_errors);
            if report.success {
                Ok(())
            } else {
                Err(CliError::CheckFailed(report.command).into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn parse_global_json_flag_before_subcommand() -> TestResult {
        let cli = Cli::try_parse_from(["smconsole", "--json", "read-status"])?;
        assert!(cli.json);
        Ok(())
    }

    #[test]
    fn parse_global_json_flag_after_subcommand() -> TestResult {
        let cli = Cli::try_parse_from(["smconsole", "read-status", "--json"])?;
        assert!(cli.json);
        Ok(())
    }

    #[test]
    fn parse_verbose_levels() -> TestResult {
        let cli0 = Cli::try_parse_from(["smconsole", "enable"])?;
        assert_eq!(cli0.verbose, 0);

        let cli2 = Cli::try_parse_from(["smconsole", "-vv", "enable"])?;
        assert_eq!(cli2.verbose, 2);
        Ok(())
    }

    #[test]
    fn parse_bus_and_address_overrides() -> TestResult {
        let cli = Cli::try_parse_from([
            "smconsole",
            "--bus",
            "/dev/ttyUSB0",
            "read-param",
            "800",
            "--address",
            "3",
        ])?;
        assert_eq!(cli.bus.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(cli.address, Some(3));
        assert!(matches!(
            cli.command,
            Commands::Console(ConsoleCommand::ReadParam { address: 800 })
        ));
        Ok(())
    }

    #[test]
    fn parse_top_level_fast_and_check_fast() -> TestResult {
        let cli = Cli::try_parse_from(["smconsole", "--fast", "check"])?;
        assert!(cli.fast);
        assert!(matches!(
            cli.command,
            Commands::Console(ConsoleCommand::Check { fast: false })
        ));

        let cli = Cli::try_parse_from(["smconsole", "check", "--fast"])?;
        assert!(!cli.fast);
        assert!(matches!(
            cli.command,
            Commands::Console(ConsoleCommand::Check { fast: true })
        ));
        Ok(())
    }

    #[test]
    fn parse_shell() -> TestResult {
        let cli = Cli::try_parse_from(["smconsole", "shell"])?;
        assert!(matches!(cli.command, Commands::Shell));
        Ok(())
    }

    #[test]
    fn parse_rejects_missing_subcommand() {
        assert!(matches!(Cli::try_parse_from(["smconsole"]), Err(_)));
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
