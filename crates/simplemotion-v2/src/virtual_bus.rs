//! Virtual SimpleMotion V2 bus with one simulated servo drive.
//!
//! `VirtualSmBus` implements [`SmBus`] so the console and the status checks
//! can run without hardware. It keeps the host-side [`BusStatus`] accumulator
//! the way a real transport does, rejects out-of-range writes through the
//! drive's `SMP_CUMULATIVE_STATUS` register, records every transaction in
//! order and supports disconnect and fault injection.

use std::collections::{BTreeMap, VecDeque};

use tracing::debug;

use crate::bus::{NodeAddress, QueuedCommand, SmBus};
use crate::error::{SmError, SmResult};
use crate::params::{
    CM_POSITION, CM_TORQUE, ReturnLength, SMP_ABSOLUTE_SETPOINT, SMP_ACTUAL_POSITION_FB,
    SMP_ACTUAL_TORQUE, SMP_ACTUAL_VELOCITY_FB, SMP_CB1_ENABLE, SMP_CONTROL_BITS1, SMP_CONTROL_MODE,
    SMP_CUMULATIVE_STATUS, SMP_FAULTS, SMP_HOMING_CONTROL, SMP_NODE_ADDRESS, SMP_NULL,
    SMP_RETURN_PARAM_ADDR, SMP_RETURN_PARAM_LEN, SMP_STATUS, SMP_TIMEOUT, SMP_TRAJ_PLANNER_VEL,
    drive,
};
use crate::status::{BusStatus, DeviceStatus};

/// Maximum transaction history retained by the virtual bus.
pub const MAX_TRANSACTION_HISTORY: usize = 256;

/// One simulated drive parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub value: i32,
    pub min: i32,
    pub max: i32,
    pub writable: bool,
}

impl ParamSpec {
    pub fn writable(value: i32, min: i32, max: i32) -> Self {
        Self {
            value,
            min,
            max,
            writable: true,
        }
    }

    pub fn read_only(value: i32) -> Self {
        Self {
            value,
            min: value,
            max: value,
            writable: false,
        }
    }
}

/// A bus transaction as seen by the virtual bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transaction {
    Read {
        node: NodeAddress,
        param: u16,
    },
    Write {
        node: NodeAddress,
        param: u16,
        value: i32,
    },
    Queue {
        node: NodeAddress,
        commands: usize,
    },
}

impl Transaction {
    /// Parameter addressed by a single read or write.
    pub fn param(&self) -> Option<u16> {
        match *self {
            Self::Read { param, .. } | Self::Write { param, .. } => Some(param),
            Self::Queue { .. } => None,
        }
    }
}

/// A software stand-in for an SM bus with one servo drive attached.
#[derive(Debug, Clone)]
pub struct VirtualSmBus {
    node: NodeAddress,
    params: BTreeMap<u16, ParamSpec>,
    cumulative: BusStatus,
    connected: bool,
    pending_faults: VecDeque<BusStatus>,
    transactions: VecDeque<Transaction>,
}

impl VirtualSmBus {
    /// Create a bus with a drive at `node`, using the default parameter table.
    pub fn new(node: NodeAddress) -> Self {
        let mut params = BTreeMap::new();
        params.insert(SMP_NODE_ADDRESS, ParamSpec::read_only(i32::from(node)));
        params.insert(SMP_RETURN_PARAM_ADDR, ParamSpec::writable(0, 0, 0xFFFF));
        params.insert(
            SMP_RETURN_PARAM_LEN,
            ParamSpec::writable(ReturnLength::Bits24.to_register(), 1, 3),
        );
        params.insert(SMP_TIMEOUT, ParamSpec::writable(100, 1, 10_000));
        params.insert(
            SMP_CUMULATIVE_STATUS,
            ParamSpec::writable(0, i32::MIN, i32::MAX),
        );
        params.insert(
            SMP_ABSOLUTE_SETPOINT,
            ParamSpec::writable(0, -(1 << 30), 1 << 30),
        );
        params.insert(SMP_FAULTS, ParamSpec::writable(0, 0, i32::MAX));
        params.insert(SMP_STATUS, ParamSpec::read_only(0));
        params.insert(
            SMP_CONTROL_MODE,
            ParamSpec::writable(CM_POSITION, CM_POSITION, CM_TORQUE),
        );
        params.insert(SMP_TRAJ_PLANNER_VEL, ParamSpec::writable(1000, 0, 32_767));
        params.insert(SMP_ACTUAL_TORQUE, ParamSpec::read_only(0));
        params.insert(SMP_ACTUAL_VELOCITY_FB, ParamSpec::read_only(0));
        params.insert(SMP_ACTUAL_POSITION_FB, ParamSpec::read_only(0));
        params.insert(SMP_HOMING_CONTROL, ParamSpec::writable(0, 0, 1));
        params.insert(SMP_CONTROL_BITS1, ParamSpec::writable(0, 0, 0xFFFF));

        debug!("Created VirtualSmBus node={} params={}", node, params.len());
        Self {
            node,
            params,
            cumulative: BusStatus::NONE,
            connected: true,
            pending_faults: VecDeque::new(),
            transactions: VecDeque::new(),
        }
    }

    pub fn node(&self) -> NodeAddress {
        self.node
    }

    /// Add or replace a simulated parameter.
    pub fn with_param(mut self, param: u16, spec: ParamSpec) -> Self {
        self.params.insert(param, spec);
        self
    }

    /// Simulate unplugging the adapter (subsequent calls report `NODEVICE`).
    pub fn disconnect(&mut self) {
        self.connected = false;
    }

    /// Plug the adapter back in.
    pub fn reconnect(&mut self) {
        self.connected = true;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Make the next transaction fail with `status`. Faults queue up in order.
    pub fn inject_fault(&mut self, status: BusStatus) {
        self.pending_faults.push_back(status);
    }

    /// Latch drive fault bits, as if the drive tripped.
    pub fn trip_drive(&mut self, faults: i32) {
        self.set_value(SMP_FAULTS, faults);
        self.refresh_status();
    }

    /// Set device-side cumulative status bits directly.
    pub fn raise_device_status(&mut self, status: DeviceStatus) {
        let current = self.device_status();
        self.set_value(SMP_CUMULATIVE_STATUS, (current | status).to_register());
    }

    /// Current device-side cumulative status, without a bus transaction.
    pub fn device_status(&self) -> DeviceStatus {
        DeviceStatus::from_register(self.value(SMP_CUMULATIVE_STATUS).unwrap_or(0))
    }

    /// Current value of a parameter, without a bus transaction.
    pub fn value(&self, param: u16) -> Option<i32> {
        self.params.get(&param).map(|spec| spec.value)
    }

    /// All transactions attempted since creation (bounded), in order.
    pub fn transactions(&self) -> &VecDeque<Transaction> {
        &self.transactions
    }

    /// Number of single reads or writes that addressed `param`.
    pub fn transaction_count(&self, param: u16) -> usize {
        self.transactions
            .iter()
            .filter(|t| t.param() == Some(param))
            .count()
    }

    /// Forget the transaction history.
    pub fn clear_records(&mut self) {
        self.transactions.clear();
    }

    fn record(&mut self, transaction: Transaction) {
        if self.transactions.len() >= MAX_TRANSACTION_HISTORY {
            self.transactions.pop_front();
        }
        self.transactions.push_back(transaction);
    }

    /// Transport-level outcome of one transaction addressed to `node`.
    fn begin(&mut self, node: NodeAddress) -> SmResult<()> {
        let status = if !self.connected {
            BusStatus::NODEVICE
        } else if let Some(fault) = self.pending_faults.pop_front() {
            fault
        } else if node != self.node {
            // Nobody answers on that address; the host times out.
            BusStatus::LENGTH
        } else {
            BusStatus::OK
        };

        self.cumulative |= status;
        if status.is_error() {
            debug!("VirtualSmBus transaction to node {node} failed: {status}");
            return Err(SmError::Transport(status));
        }
        Ok(())
    }

    fn reject(&mut self, status: DeviceStatus) {
        debug!("VirtualSmBus device rejected command: {}", status);
        self.raise_device_status(status);
    }

    fn set_value(&mut self, param: u16, value: i32) {
        if let Some(spec) = self.params.get_mut(&param) {
            spec.value = value;
        }
    }

    fn is_enabled(&self) -> bool {
        self.value(SMP_CONTROL_BITS1).unwrap_or(0) & SMP_CB1_ENABLE != 0
    }

    fn refresh_status(&mut self) {
        let faults = self.value(SMP_FAULTS).unwrap_or(0);
        let mut status = 0;
        if self.is_enabled() {
            status |= drive::STAT_ENABLED;
            if faults == 0 {
                status |= drive::STAT_RUN;
            }
        }
        if faults != 0 {
            status |= drive::STAT_FAULTSTOP;
        }
        self.set_value(SMP_STATUS, status);
    }

    fn device_read(&mut self, param: u16) -> i32 {
        match self.value(param) {
            Some(value) => value,
            None => {
                self.reject(DeviceStatus::INVALID_ADDR);
                0
            }
        }
    }

    fn device_write(&mut self, param: u16, value: i32) {
        let Some(spec) = self.params.get(&param).copied() else {
            self.reject(DeviceStatus::INVALID_ADDR);
            return;
        };
        if !spec.writable {
            self.reject(DeviceStatus::NACK);
            return;
        }
        if value > spec.max {
            self.reject(DeviceStatus::INVALID_VALUE | DeviceStatus::VALUE_TOO_HIGH);
            return;
        }
        if value < spec.min {
            self.reject(DeviceStatus::INVALID_VALUE | DeviceStatus::VALUE_TOO_LOW);
            return;
        }

        match param {
            SMP_HOMING_CONTROL if value != 0 => {
                if !self.is_enabled() {
                    self.reject(DeviceStatus::NACK);
                    return;
                }
                // Homing completes instantly at the current position.
                self.set_value(SMP_ACTUAL_POSITION_FB, 0);
                self.set_value(SMP_ABSOLUTE_SETPOINT, 0);
                self.set_value(SMP_ACTUAL_VELOCITY_FB, 0);
            }
            SMP_ABSOLUTE_SETPOINT => {
                self.set_value(param, value);
                if self.is_enabled() && self.value(SMP_FAULTS) == Some(0) {
                    self.set_value(SMP_ACTUAL_POSITION_FB, value);
                }
            }
            _ => self.set_value(param, value),
        }
        self.refresh_status();
    }

    fn return_length(&self) -> ReturnLength {
        self.value(SMP_RETURN_PARAM_LEN)
            .and_then(ReturnLength::from_register)
            .unwrap_or_default()
    }
}

impl SmBus for VirtualSmBus {
    fn read_parameter(&mut self, node: NodeAddress, param: u16) -> SmResult<i32> {
        self.record(Transaction::Read { node, param });
        self.begin(node)?;
        Ok(self.device_read(param))
    }

    fn write_parameter(&mut self, node: NodeAddress, param: u16, value: i32) -> SmResult<()> {
        self.record(Transaction::Write { node, param, value });
        self.begin(node)?;
        self.device_write(param, value);
        Ok(())
    }

    fn execute_queue(
        &mut self,
        node: NodeAddress,
        commands: &[QueuedCommand],
    ) -> SmResult<Vec<i32>> {
        self.record(Transaction::Queue {
            node,
            commands: commands.len(),
        });
        self.begin(node)?;

        let mut target = SMP_NULL;
        let mut returns = Vec::with_capacity(commands.len());
        for command in commands {
            match *command {
                QueuedCommand::SetParamAddr(addr) => target = addr,
                QueuedCommand::Value(value) => self.device_write(target, value),
            }
            let return_addr = self
                .value(SMP_RETURN_PARAM_ADDR)
                .and_then(|addr| u16::try_from(addr).ok())
                .unwrap_or(SMP_NULL);
            let value = if return_addr == SMP_NULL {
                0
            } else {
                self.device_read(return_addr)
            };
            returns.push(self.return_length().truncate(value));
        }
        Ok(returns)
    }

    fn cumulative_status(&self) -> BusStatus {
        self.cumulative
    }

    fn reset_cumulative_status(&mut self) {
        self.cumulative = BusStatus::NONE;
    }
}
