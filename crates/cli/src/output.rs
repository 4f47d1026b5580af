//! Output formatting for console responses

use anyhow::Error;
use colored::*;
use serde_json::json;

use crate::console::{CommandReport, Readout};
use crate::drive::DriveReadout;
use crate::error::CliError;

/// Print error in JSON format
pub fn print_error_json(error: &Error) {
    let error_json = json!({
        "success": false,
        "error": {
            "message": error.to_string(),
            "type": error_type_name(error)
        }
    });
    match serde_json::to_string_pretty(&error_json) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("Failed to format error as JSON: {}", e),
    }
}

/// Print error in human-readable format
pub fn print_error_human(error: &Error) {
    eprintln!("{} {}", "Error:".red().bold(), error);

    let mut source = error.source();
    while let Some(err) = source {
        eprintln!("  {} {}", "Caused by:".yellow(), err);
        source = err.source();
    }
}

/// Print the result of one console command.
///
/// The error report normally reaches stderr through the log, so human output
/// only marks the failure and adds the hint. `show_errors` prints the report
/// lines as well, for when logging is off.
pub fn print_report(report: &CommandReport, json: bool, show_errors: bool) {
    if json {
        match serde_json::to_string_pretty(report) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("Failed to format command result as JSON: {}", e),
        }
        return;
    }

    match &report.readout {
        Some(readout) => print_readout(readout),
        None if report.success => println!("{} {}", "✓".green(), report.command),
        None => {}
    }

    if !report.success {
        eprintln!(
            "{} {} reported bus errors",
            "✗".red(),
            report.command.bold()
        );
        if show_errors && let Some(errors) = &report.errors {
            for line in errors.lines() {
                eprintln!("{}", line);
            }
        }
    }
    if let Some(hint) = report.hint {
        eprintln!("{} {}", "Hint:".yellow(), hint);
    }
}

fn print_readout(readout: &Readout) {
    match readout {
        Readout::Status(status) => print_drive_status(status),
        Readout::Parameter { address, value } => {
            println!("Parameter {} = {}", address, value);
        }
        Readout::FastWriteRead {
            setpoint,
            torque,
            position,
            velocity,
        } => {
            println!("Setpoint: {}", setpoint);
            println!("  Torque: {}", torque);
            println!("  Position: {}", position);
            println!("  Velocity: {}", velocity);
        }
        Readout::Check {
            mode,
            transport,
            device,
        } => {
            println!("Check ({mode}): transport {transport}, device {device}");
        }
    }
}

fn print_drive_status(status: &DriveReadout) {
    println!("{}", "Drive status:".bold());
    println!("  Setpoint: {}", status.setpoint);
    println!("  Position feedback: {}", status.position_feedback);
    println!("  Status bits: {}", status.status_bits);
    println!("  Fault bits: {}", status.fault_bits);
    println!(
        "  Enabled: {}  Run: {}  Homing active: {}  Fault stop: {}",
        flag(status.enabled, false),
        flag(status.run, false),
        flag(status.homing_active, false),
        flag(status.fault_stop, true)
    );
    println!(
        "  Tracking error: {}  Over velocity: {}  Over current: {}  Under voltage: {}",
        flag(status.tracking_error, true),
        flag(status.over_velocity, true),
        flag(status.over_current, true),
        flag(status.under_voltage, true)
    );
}

fn flag(set: bool, is_fault: bool) -> ColoredString {
    match (set, is_fault) {
        (true, true) => "yes".red(),
        (true, false) => "yes".green(),
        (false, _) => "no".normal(),
    }
}

/// Get error type name for JSON output
fn error_type_name(error: &Error) -> &'static str {
    match error.downcast_ref::<CliError>() {
        Some(CliError::Bus(_)) => "Bus",
        Some(CliError::NotConnected) => "NotConnected",
        Some(CliError::CheckFailed(_)) => "CheckFailed",
        Some(CliError::InvalidConfiguration(_)) => "InvalidConfiguration",
        Some(CliError::YamlError(_)) => "YamlError",
        None => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smconsole_simplemotion_v2::SmError;

    #[test]
    fn test_error_type_name_for_cli_errors() {
        let err = Error::from(CliError::from(SmError::BusUnavailable("x".to_string())));
        assert_eq!(error_type_name(&err), "Bus");
        let err = Error::from(CliError::CheckFailed("enable"));
        assert_eq!(error_type_name(&err), "CheckFailed");
        assert_eq!(error_type_name(&anyhow::anyhow!("other")), "Unknown");
    }
}
