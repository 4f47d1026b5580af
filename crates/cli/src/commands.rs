//! Console command set, shared by one-shot subcommands and shell lines.

use clap::{Parser, Subcommand};

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Open the configured bus
    Connect,

    /// Close the bus (if open)
    Disconnect,

    /// Enable the drive
    Enable,

    /// Disable the drive
    Disable,

    /// Start homing (drive must be enabled)
    Home,

    /// Clear latched drive faults
    ClearFaults,

    /// Set the trajectory planner velocity limit
    SetVelocity {
        #[arg(allow_negative_numbers = true)]
        velocity: i32,
    },

    /// Set the absolute position setpoint
    SetSetpoint {
        #[arg(allow_negative_numbers = true)]
        setpoint: i32,
    },

    /// Read setpoint, position feedback, status and fault bits
    ReadStatus,

    /// Read one parameter by address
    ReadParam {
        /// Parameter address
        address: u16,
    },

    /// Write one parameter by address
    WriteParam {
        /// Parameter address
        address: u16,
        /// New value
        #[arg(allow_negative_numbers = true)]
        value: i32,
    },

    /// Write the setpoint and read torque, position and velocity in one burst
    FastWriteRead {
        #[arg(allow_negative_numbers = true)]
        setpoint: i32,
    },

    /// Check and report accumulated bus errors
    Check {
        /// Skip reading the drive's cumulative status register
        #[arg(long)]
        fast: bool,
    },
}

impl ConsoleCommand {
    /// Command name as typed by the operator.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::Enable => "enable",
            Self::Disable => "disable",
            Self::Home => "home",
            Self::ClearFaults => "clear-faults",
            Self::SetVelocity { .. } => "set-velocity",
            Self::SetSetpoint { .. } => "set-setpoint",
            Self::ReadStatus => "read-status",
            Self::ReadParam { .. } => "read-param",
            Self::WriteParam { .. } => "write-param",
            Self::FastWriteRead { .. } => "fast-write-read",
            Self::Check { .. } => "check",
        }
    }

    /// True when the command talks to the bus and needs an open session.
    pub fn needs_session(&self) -> bool {
        !matches!(self, Self::Connect | Self::Disconnect)
    }
}

/// One line typed at the shell prompt.
#[derive(Parser, Debug)]
#[command(name = "smconsole", no_binary_name = true, disable_version_flag = true)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: ShellCommand,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    #[command(flatten)]
    Console(ConsoleCommand),

    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn parse(line: &str) -> Result<ShellCommand, clap::Error> {
        ShellLine::try_parse_from(line.split_whitespace()).map(|l| l.command)
    }

    #[test]
    fn test_parse_simple_commands() -> TestResult {
        assert_eq!(
            parse("enable")?,
            ShellCommand::Console(ConsoleCommand::Enable)
        );
        assert_eq!(
            parse("clear-faults")?,
            ShellCommand::Console(ConsoleCommand::ClearFaults)
        );
        assert_eq!(parse("exit")?, ShellCommand::Quit);
        Ok(())
    }

    #[test]
    fn test_parse_negative_setpoint() -> TestResult {
        assert_eq!(
            parse("set-setpoint -2500")?,
            ShellCommand::Console(ConsoleCommand::SetSetpoint { setpoint: -2500 })
        );
        Ok(())
    }

    #[test]
    fn test_parse_write_param() -> TestResult {
        assert_eq!(
            parse("write-param 800 -1")?,
            ShellCommand::Console(ConsoleCommand::WriteParam {
                address: 800,
                value: -1
            })
        );
        Ok(())
    }

    #[test]
    fn test_parse_check_fast() -> TestResult {
        assert_eq!(
            parse("check --fast")?,
            ShellCommand::Console(ConsoleCommand::Check { fast: true })
        );
        Ok(())
    }

    #[test]
    fn test_rejects_address_out_of_range() {
        assert!(matches!(parse("read-param 70000"), Err(_)));
        assert!(matches!(parse("frobnicate"), Err(_)));
    }

    #[test]
    fn test_command_names_match_subcommands() -> TestResult {
        for line in [
            "read-status",
            "fast-write-read 5",
            "set-velocity 10",
            "connect",
        ] {
            match parse(line)? {
                ShellCommand::Console(cmd) => {
                    assert_eq!(Some(cmd.name()), line.split_whitespace().next());
                }
                ShellCommand::Quit => return Err("unexpected quit".into()),
            }
        }
        Ok(())
    }
}
