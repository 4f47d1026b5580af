//! SimpleMotion V2 parameter addresses used by the console.
//!
//! Only the registers the console reads or writes are listed. Everything is
//! an integer address of a 32-bit signed parameter.

/// Null parameter, also "no return parameter".
pub const SMP_NULL: u16 = 0;
/// SM bus node address of the device.
pub const SMP_NODE_ADDRESS: u16 = 1;
/// Parameter whose value is returned by every queued command.
pub const SMP_RETURN_PARAM_ADDR: u16 = 10;
/// Bit width of queued command return values, see [`ReturnLength`].
pub const SMP_RETURN_PARAM_LEN: u16 = 11;
/// Device-side bus timeout in milliseconds.
pub const SMP_TIMEOUT: u16 = 12;
/// Device-side cumulative command status, see [`crate::DeviceStatus`].
pub const SMP_CUMULATIVE_STATUS: u16 = 13;

/// Absolute position/velocity/torque setpoint.
pub const SMP_ABSOLUTE_SETPOINT: u16 = 551;
/// Alias used when the drive is in position mode.
pub const SMP_ABSOLUTE_POS_TARGET: u16 = SMP_ABSOLUTE_SETPOINT;
/// Drive fault bits. Writing 0 clears faults.
pub const SMP_FAULTS: u16 = 552;
/// Drive status bits.
pub const SMP_STATUS: u16 = 553;
/// Control mode (position, velocity, torque).
pub const SMP_CONTROL_MODE: u16 = 559;
/// Trajectory planner velocity limit.
pub const SMP_TRAJ_PLANNER_VEL: u16 = 800;
pub const SMP_ACTUAL_TORQUE: u16 = 901;
pub const SMP_ACTUAL_VELOCITY_FB: u16 = 902;
pub const SMP_ACTUAL_POSITION_FB: u16 = 903;
/// Writing 1 starts homing.
pub const SMP_HOMING_CONTROL: u16 = 2532;
pub const SMP_CONTROL_BITS1: u16 = 2533;

/// `SMP_CONTROL_BITS1` drive enable bit.
pub const SMP_CB1_ENABLE: i32 = 1 << 0;

/// Drive-domain bits of `SMP_STATUS` and `SMP_FAULTS`.
pub mod drive {
    pub const STAT_RUN: i32 = 1 << 1;
    pub const STAT_ENABLED: i32 = 1 << 2;
    pub const STAT_FAULTSTOP: i32 = 1 << 3;
    pub const STAT_HOMING: i32 = 1 << 7;

    pub const FLT_FOLLOWERROR: i32 = 1 << 1;
    pub const FLT_OVERCURRENT: i32 = 1 << 2;
    pub const FLT_UNDERVOLTAGE: i32 = 1 << 6;
    pub const FLT_OVERVELOCITY: i32 = 1 << 10;
}

/// Control mode values of `SMP_CONTROL_MODE`.
pub const CM_TORQUE: i32 = 3;
pub const CM_VELOCITY: i32 = 2;
pub const CM_POSITION: i32 = 1;

/// Return value width of queued commands (`SMP_RETURN_PARAM_LEN`).
///
/// Two bits of each width are consumed by the protocol, so a 24-bit return
/// carries at most a 22-bit signed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnLength {
    Bits16,
    #[default]
    Bits24,
    Bits32,
}

impl ReturnLength {
    pub fn from_register(value: i32) -> Option<Self> {
        match value {
            1 => Some(Self::Bits16),
            2 => Some(Self::Bits24),
            3 => Some(Self::Bits32),
            _ => None,
        }
    }

    pub fn to_register(self) -> i32 {
        match self {
            Self::Bits16 => 1,
            Self::Bits24 => 2,
            Self::Bits32 => 3,
        }
    }

    /// Number of payload bits available for the returned value.
    pub fn value_bits(self) -> u32 {
        match self {
            Self::Bits16 => 14,
            Self::Bits24 => 22,
            Self::Bits32 => 30,
        }
    }

    /// Truncate `value` to the payload width and sign-extend it back.
    pub fn truncate(self, value: i32) -> i32 {
        let shift = 32 - self.value_bits();
        value.wrapping_shl(shift).wrapping_shr(shift)
    }
}
