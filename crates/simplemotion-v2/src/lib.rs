//! SimpleMotion V2 bus status types and transaction API for Granite Devices servo drives.
//!
//! This crate does not frame or deframe bus bytes. It describes what a
//! SimpleMotion V2 transport reports back:
//!
//! - [`BusStatus`]: host-side transport status, accumulated across calls
//! - [`DeviceStatus`]: the drive's own cumulative command-acceptance register
//! - [`BusFault`] / [`DeviceFault`]: the named categories of each layer
//!
//! The narrow transaction API is the [`SmBus`] trait. [`VirtualSmBus`] is an
//! in-process simulated drive implementing it, used by the console and tests.
//!
//! # Key Features
//! - Typed status bitmasks with the SimpleMotion V2 bit layout
//! - Parameter address catalog for the registers the console touches
//! - Queued command batches with return-parameter readback
//! - Disconnect, wrong-node and fault injection on the virtual bus

#![deny(static_mut_refs)]

pub mod bus;
pub mod error;
pub mod params;
pub mod status;
pub mod virtual_bus;

pub use bus::{NodeAddress, QueuedCommand, SmBus};
pub use error::{SmError, SmResult};
pub use params::{
    ReturnLength, SMP_ABSOLUTE_POS_TARGET, SMP_ABSOLUTE_SETPOINT, SMP_ACTUAL_POSITION_FB,
    SMP_ACTUAL_TORQUE, SMP_ACTUAL_VELOCITY_FB, SMP_CB1_ENABLE, SMP_CONTROL_BITS1, SMP_CONTROL_MODE,
    SMP_CUMULATIVE_STATUS, SMP_FAULTS, SMP_HOMING_CONTROL, SMP_NODE_ADDRESS, SMP_NULL,
    SMP_RETURN_PARAM_ADDR, SMP_RETURN_PARAM_LEN, SMP_STATUS, SMP_TIMEOUT, SMP_TRAJ_PLANNER_VEL,
};
pub use status::{BusFault, BusStatus, DeviceFault, DeviceStatus};
pub use virtual_bus::{ParamSpec, Transaction, VirtualSmBus};
