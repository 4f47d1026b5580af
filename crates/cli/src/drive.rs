//! Decoding of the drive's status and fault registers.

use bitflags::bitflags;
use serde::Serialize;
use smconsole_simplemotion_v2::params::drive;

bitflags! {
    /// `SMP_STATUS` bits the console shows.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DriveStatus: i32 {
        const RUN = drive::STAT_RUN;
        const ENABLED = drive::STAT_ENABLED;
        const FAULT_STOP = drive::STAT_FAULTSTOP;
        const HOMING = drive::STAT_HOMING;
    }
}

bitflags! {
    /// `SMP_FAULTS` bits the console shows.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DriveFaults: i32 {
        const FOLLOW_ERROR = drive::FLT_FOLLOWERROR;
        const OVER_CURRENT = drive::FLT_OVERCURRENT;
        const UNDER_VOLTAGE = drive::FLT_UNDERVOLTAGE;
        const OVER_VELOCITY = drive::FLT_OVERVELOCITY;
    }
}

/// Values shown by `read-status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DriveReadout {
    pub setpoint: i32,
    pub position_feedback: i32,
    pub status_bits: i32,
    pub fault_bits: i32,
    pub enabled: bool,
    pub run: bool,
    pub homing_active: bool,
    pub fault_stop: bool,
    pub tracking_error: bool,
    pub over_velocity: bool,
    pub over_current: bool,
    pub under_voltage: bool,
}

impl DriveReadout {
    pub fn decode(
        setpoint: i32,
        position_feedback: i32,
        status_bits: i32,
        fault_bits: i32,
    ) -> Self {
        let status = DriveStatus::from_bits_retain(status_bits);
        let faults = DriveFaults::from_bits_retain(fault_bits);
        Self {
            setpoint,
            position_feedback,
            status_bits,
            fault_bits,
            enabled: status.contains(DriveStatus::ENABLED),
            run: status.contains(DriveStatus::RUN),
            homing_active: status.contains(DriveStatus::HOMING),
            fault_stop: status.contains(DriveStatus::FAULT_STOP),
            tracking_error: faults.contains(DriveFaults::FOLLOW_ERROR),
            over_velocity: faults.contains(DriveFaults::OVER_VELOCITY),
            over_current: faults.contains(DriveFaults::OVER_CURRENT),
            under_voltage: faults.contains(DriveFaults::UNDER_VOLTAGE),
        }
    }
}
