//! Operator console: drive actions over one bus session.
//!
//! Every action logs what it is about to do, runs its bus transactions and
//! then checks the session in the configured mode. Transaction errors are not
//! returned to the operator directly; they land in the status accumulators
//! and the check reports them.

use serde::Serialize;
use smconsole_diagnostics::{BusSession, CheckMode, CheckOutcome, ErrorReport};
use smconsole_simplemotion_v2::{
    QueuedCommand, ReturnLength, SMP_ABSOLUTE_POS_TARGET, SMP_ABSOLUTE_SETPOINT,
    SMP_ACTUAL_POSITION_FB, SMP_ACTUAL_TORQUE, SMP_ACTUAL_VELOCITY_FB, SMP_CB1_ENABLE,
    SMP_CONTROL_BITS1, SMP_FAULTS, SMP_HOMING_CONTROL, SMP_RETURN_PARAM_ADDR, SMP_RETURN_PARAM_LEN,
    SMP_STATUS, SMP_TRAJ_PLANNER_VEL, SmBus, SmError, SmResult, VirtualSmBus,
};
use tracing::{debug, error, info};

use crate::commands::ConsoleCommand;
use crate::config::{BusConfig, ConsoleConfig, VIRTUAL_BUS};
use crate::drive::DriveReadout;
use crate::error::CliError;

pub const READ_PARAM_HINT: &str =
    "Check that the parameter address is defined in the drive's parameter catalog";
pub const WRITE_PARAM_HINT: &str = "Check that the parameter address is defined and the value \
                                    is within its min-max range";

/// Transport behind the console when nothing else is injected.
pub type DynBus = Box<dyn SmBus + Send>;

/// Opens the bus named in the configuration.
pub type BusOpener<B> = fn(&BusConfig) -> SmResult<B>;

/// Open a bus by name. Only the virtual bus is built in.
pub fn open_bus(config: &BusConfig) -> SmResult<DynBus> {
    match config.name.as_str() {
        VIRTUAL_BUS => Ok(Box::new(VirtualSmBus::new(config.device_address))),
        other => Err(SmError::BusUnavailable(other.to_string())),
    }
}

/// Values read back by a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Readout {
    Status(DriveReadout),
    Parameter {
        address: u16,
        value: i32,
    },
    FastWriteRead {
        setpoint: i32,
        torque: i32,
        position: i32,
        velocity: i32,
    },
    Check {
        mode: CheckMode,
        transport: String,
        device: String,
    },
}

/// Result of one console command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandReport {
    pub command: &'static str,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<CheckMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<ErrorReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readout: Option<Readout>,
}

impl CommandReport {
    fn done(command: &'static str) -> Self {
        Self {
            command,
            success: true,
            mode: None,
            errors: None,
            hint: None,
            readout: None,
        }
    }

    fn from_outcome(command: &'static str, outcome: CheckOutcome) -> Self {
        Self {
            command,
            success: !outcome.had_error(),
            mode: Some(outcome.mode),
            errors: outcome.report,
            hint: None,
            readout: None,
        }
    }
}

/// The console state: configuration plus the open session, if any.
pub struct Console<B: SmBus = DynBus> {
    config: ConsoleConfig,
    opener: BusOpener<B>,
    session: Option<BusSession<B>>,
}

impl Console<DynBus> {
    pub fn new(config: ConsoleConfig) -> Self {
        Self::with_opener(config, open_bus)
    }
}

impl<B: SmBus> Console<B> {
    pub fn with_opener(config: ConsoleConfig, opener: BusOpener<B>) -> Self {
        Self {
            config,
            opener,
            session: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn session_mut(&mut self) -> Result<&mut BusSession<B>, CliError> {
        self.session.as_mut().ok_or(CliError::NotConnected)
    }

    /// Open the bus unless a session is already open. No check is run.
    pub fn ensure_connected(&mut self) -> Result<(), CliError> {
        if self.session.is_none() {
            self.open()?;
        }
        Ok(())
    }

    pub fn execute(&mut self, command: &ConsoleCommand) -> Result<CommandReport, CliError> {
        let name = command.name();
        match *command {
            ConsoleCommand::Connect => self.connect(),
            ConsoleCommand::Disconnect => Ok(self.disconnect()),
            ConsoleCommand::Enable => {
                info!("Enabling drive");
                self.write_and_check(name, SMP_CONTROL_BITS1, SMP_CB1_ENABLE)
            }
            ConsoleCommand::Disable => {
                info!("Disabling drive");
                self.write_and_check(name, SMP_CONTROL_BITS1, 0)
            }
            ConsoleCommand::Home => {
                info!("Starting homing");
                self.write_and_check(name, SMP_HOMING_CONTROL, 1)
            }
            ConsoleCommand::ClearFaults => {
                info!("Clearing drive faults");
                self.write_and_check(name, SMP_FAULTS, 0)
            }
            ConsoleCommand::SetVelocity { velocity } => {
                info!("Setting velocity limit to {}", velocity);
                self.write_and_check(name, SMP_TRAJ_PLANNER_VEL, velocity)
            }
            ConsoleCommand::SetSetpoint { setpoint } => {
                info!("Setting setpoint to {}", setpoint);
                self.write_and_check(name, SMP_ABSOLUTE_SETPOINT, setpoint)
            }
            ConsoleCommand::ReadStatus => self.read_status(),
            ConsoleCommand::ReadParam { address } => self.read_param(address),
            ConsoleCommand::WriteParam { address, value } => self.write_param(address, value),
            ConsoleCommand::FastWriteRead { setpoint } => self.fast_write_read(setpoint),
            ConsoleCommand::Check { fast } => {
                let mode = if fast {
                    CheckMode::Fast
                } else {
                    CheckMode::Thorough
                };
                self.check(mode)
            }
        }
    }

    fn open(&mut self) -> Result<(), CliError> {
        let bus_config = &self.config.bus;
        match (self.opener)(bus_config) {
            Ok(bus) => {
                let session = BusSession::open(bus, bus_config.device_address)
                    .with_policy(self.config.check.policy());
                info!(
                    "Successfully connected bus {}, drive node {}",
                    bus_config.name,
                    session.node()
                );
                self.session = Some(session);
                Ok(())
            }
            Err(e) => {
                error!("Couldn't connect to bus {}", bus_config.name);
                Err(e.into())
            }
        }
    }

    fn connect(&mut self) -> Result<CommandReport, CliError> {
        if let Some(session) = self.session.take() {
            session.close();
        }
        self.open()?;
        let mode = self.config.check.mode;
        self.finish("connect", mode)
    }

    fn disconnect(&mut self) -> CommandReport {
        info!("Closing bus (if open)");
        if let Some(session) = self.session.take() {
            session.close();
        }
        CommandReport::done("disconnect")
    }

    fn finish(
        &mut self,
        command: &'static str,
        mode: CheckMode,
    ) -> Result<CommandReport, CliError> {
        let outcome = self.session_mut()?.check(mode);
        Ok(CommandReport::from_outcome(command, outcome))
    }

    fn write_and_check(
        &mut self,
        command: &'static str,
        param: u16,
        value: i32,
    ) -> Result<CommandReport, CliError> {
        logged(self.session_mut()?.write_parameter(param, value));
        let mode = self.config.check.mode;
        self.finish(command, mode)
    }

    fn read_status(&mut self) -> Result<CommandReport, CliError> {
        info!("Reading drive status");
        let values = logged(self.session_mut()?.read_parameters(&[
            SMP_ABSOLUTE_POS_TARGET,
            SMP_ACTUAL_POSITION_FB,
            SMP_STATUS,
            SMP_FAULTS,
        ]));
        let mode = self.config.check.mode;
        let mut report = self.finish("read-status", mode)?;
        if report.success
            && let Some(&[setpoint, position, status, faults]) = values.as_deref()
        {
            report.readout = Some(Readout::Status(DriveReadout::decode(
                setpoint, position, status, faults,
            )));
        }
        Ok(report)
    }

    fn read_param(&mut self, address: u16) -> Result<CommandReport, CliError> {
        info!("Reading parameter {}", address);
        let value = logged(self.session_mut()?.read_parameter(address));
        let mode = self.config.check.mode;
        let mut report = self.finish("read-param", mode)?;
        match value {
            Some(value) if report.success => {
                report.readout = Some(Readout::Parameter { address, value });
            }
            _ => report.hint = Some(READ_PARAM_HINT),
        }
        Ok(report)
    }

    fn write_param(&mut self, address: u16, value: i32) -> Result<CommandReport, CliError> {
        info!("Writing {} to parameter {}", value, address);
        logged(self.session_mut()?.write_parameter(address, value));
        let mode = self.config.check.mode;
        let mut report = self.finish("write-param", mode)?;
        if !report.success {
            report.hint = Some(WRITE_PARAM_HINT);
        }
        Ok(report)
    }

    /// Setpoint write and three readouts in one queued transaction. The
    /// check that follows is always fast so the burst stays cheap.
    fn fast_write_read(&mut self, setpoint: i32) -> Result<CommandReport, CliError> {
        info!("Fast write/read with setpoint {}", setpoint);
        let session = self.session_mut()?;
        let return_len = ReturnLength::Bits24.to_register();
        logged(session.write_parameter(SMP_RETURN_PARAM_LEN, return_len));
        let returns = logged(session.execute_queue(&[
            QueuedCommand::SetParamAddr(SMP_ABSOLUTE_SETPOINT),
            QueuedCommand::Value(setpoint),
            QueuedCommand::SetParamAddr(SMP_RETURN_PARAM_ADDR),
            QueuedCommand::Value(i32::from(SMP_ACTUAL_TORQUE)),
            QueuedCommand::Value(i32::from(SMP_ACTUAL_POSITION_FB)),
            QueuedCommand::Value(i32::from(SMP_ACTUAL_VELOCITY_FB)),
        ]));
        let mut report = self.finish("fast-write-read", CheckMode::Fast)?;
        if let Some(&[.., torque, position, velocity]) = returns.as_deref() {
            report.readout = Some(Readout::FastWriteRead {
                setpoint,
                torque,
                position,
                velocity,
            });
        }
        Ok(report)
    }

    fn check(&mut self, mode: CheckMode) -> Result<CommandReport, CliError> {
        let outcome = self.session_mut()?.check(mode);
        let readout = Readout::Check {
            mode: outcome.mode,
            transport: outcome.sample.transport.to_string(),
            device: outcome.sample.device.to_string(),
        };
        let mut report = CommandReport::from_outcome("check", outcome);
        report.readout = Some(readout);
        Ok(report)
    }
}

/// Keep the value of a transaction; a failure is left for the check to report.
fn logged<T>(result: SmResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("Bus transaction failed: {}", e);
            None
        }
    }
}
