//! The SM bus transaction API consumed by the console.
//!
//! A transport owns the host-side [`BusStatus`] accumulator: every call ORs its
//! own status into it until [`SmBus::reset_cumulative_status`] is called.

use crate::error::SmResult;
use crate::status::BusStatus;

/// SM bus node address of a device.
pub type NodeAddress = u8;

/// One entry of a queued command batch.
///
/// `SetParamAddr` selects the parameter that subsequent `Value` commands
/// write to. Writing to `SMP_RETURN_PARAM_ADDR` selects which parameter every
/// following command returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuedCommand {
    /// `SMPCMD_SETPARAMADDR`, 2 bytes of outbound payload.
    SetParamAddr(u16),
    /// `SMPCMD_24B`, 3 bytes of outbound payload.
    Value(i32),
}

pub trait SmBus {
    /// Read one parameter.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SmError::Transport`] when the transaction fails.
    fn read_parameter(&mut self, node: NodeAddress, param: u16) -> SmResult<i32>;

    /// Write one parameter.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SmError::Transport`] when the transaction fails.
    fn write_parameter(&mut self, node: NodeAddress, param: u16, value: i32) -> SmResult<()>;

    /// Read several parameters. Transports that can batch reads override this.
    ///
    /// # Errors
    ///
    /// Fails on the first failing read.
    fn read_parameters(&mut self, node: NodeAddress, params: &[u16]) -> SmResult<Vec<i32>> {
        params
            .iter()
            .map(|&param| self.read_parameter(node, param))
            .collect()
    }

    /// Execute a queued command batch in one transmission and return one
    /// value per command.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SmError::Transport`] when the transmission fails.
    fn execute_queue(
        &mut self,
        node: NodeAddress,
        commands: &[QueuedCommand],
    ) -> SmResult<Vec<i32>>;

    /// Status accumulated by all calls since the last reset.
    fn cumulative_status(&self) -> BusStatus;

    fn reset_cumulative_status(&mut self);
}

impl<B: SmBus + ?Sized> SmBus for Box<B> {
    fn read_parameter(&mut self, node: NodeAddress, param: u16) -> SmResult<i32> {
        (**self).read_parameter(node, param)
    }

    fn write_parameter(&mut self, node: NodeAddress, param: u16, value: i32) -> SmResult<()> {
        (**self).write_parameter(node, param, value)
    }

    fn read_parameters(&mut self, node: NodeAddress, params: &[u16]) -> SmResult<Vec<i32>> {
        (**self).read_parameters(node, params)
    }

    fn execute_queue(
        &mut self,
        node: NodeAddress,
        commands: &[QueuedCommand],
    ) -> SmResult<Vec<i32>> {
        (**self).execute_queue(node, commands)
    }

    fn cumulative_status(&self) -> BusStatus {
        (**self).cumulative_status()
    }

    fn reset_cumulative_status(&mut self) {
        (**self).reset_cumulative_status()
    }
}
