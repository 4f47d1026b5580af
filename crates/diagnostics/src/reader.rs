//! Status reader: obtains the raw status values of one check.

use smconsole_simplemotion_v2::{
    BusStatus, DeviceStatus, NodeAddress, SMP_CUMULATIVE_STATUS, SmBus, SmResult,
};
use tracing::debug;

use crate::mode::CheckMode;

/// Raw status values a check classifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusSample {
    /// Accumulated transport status, including failures of the device read
    /// and clear issued by this check.
    pub transport: BusStatus,
    /// Device cumulative status. `ACK` in fast mode or when the read failed.
    pub device: DeviceStatus,
}

impl StatusSample {
    /// Build a sample from already known values.
    pub fn new(transport: BusStatus, device: DeviceStatus) -> Self {
        Self { transport, device }
    }
}

/// Read the drive's `SMP_CUMULATIVE_STATUS` register.
///
/// # Errors
///
/// Propagates the transport error; the register value is indeterminate then.
pub fn read_device_cumulative_status<B: SmBus + ?Sized>(
    bus: &mut B,
    node: NodeAddress,
) -> SmResult<DeviceStatus> {
    let raw = bus.read_parameter(node, SMP_CUMULATIVE_STATUS)?;
    Ok(DeviceStatus::from_register(raw))
}

/// Write zero to `SMP_CUMULATIVE_STATUS` if `observed` is not `ACK`.
///
/// Returns whether a write was issued.
///
/// # Errors
///
/// Propagates the transport error of the write.
pub fn clear_device_cumulative_status<B: SmBus + ?Sized>(
    bus: &mut B,
    node: NodeAddress,
    observed: DeviceStatus,
) -> SmResult<bool> {
    if observed.is_ack() {
        return Ok(false);
    }
    bus.write_parameter(node, SMP_CUMULATIVE_STATUS, 0)?;
    Ok(true)
}

/// Collect the status values for one check in `mode`.
///
/// The device register is read and cleared before the transport status is
/// taken, so failures of those two transactions show up in the sample.
pub(crate) fn sample<B: SmBus + ?Sized>(
    bus: &mut B,
    node: NodeAddress,
    mode: CheckMode,
) -> StatusSample {
    let mut failed = BusStatus::NONE;

    let device = if mode.reads_device() {
        match read_device_cumulative_status(bus, node) {
            Ok(device) => {
                if let Err(e) = clear_device_cumulative_status(bus, node, device) {
                    debug!("Clearing device cumulative status failed: {}", e);
                    failed |= e.status();
                }
                device
            }
            Err(e) => {
                debug!("Reading device cumulative status failed: {}", e);
                failed |= e.status();
                DeviceStatus::ACK
            }
        }
    } else {
        DeviceStatus::ACK
    };

    StatusSample {
        transport: bus.cumulative_status() | failed,
        device,
    }
}
