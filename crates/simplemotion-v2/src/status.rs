//! SimpleMotion V2 status bitmasks and their named fault categories.
//!
//! SM bus and SM devices report errors on two independent layers:
//!
//! 1. [`BusStatus`] is returned by every transport call and OR-ed into a
//!    host-side accumulator. It reports physical/communication problems that
//!    are observable without a working device (missing port, checksum).
//! 2. [`DeviceStatus`] is the drive's `SMP_CUMULATIVE_STATUS` register. It
//!    reports commands that reached the drive but were not accepted (invalid
//!    address, value out of range). Reading it needs a working connection.
//!
//! Drive-domain status and fault bits (`SMP_STATUS`, `SMP_FAULTS`) are a third
//! layer and are not modelled here.

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Host-side transport status of the SM bus.
    ///
    /// The empty value is `SM_NONE` (no transaction yet). `OK` is set by every
    /// successful call. Any other bit is an error.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BusStatus: u32 {
        /// Transaction completed.
        const OK            = 1 << 0;
        /// Target device or port unreachable.
        const NODEVICE      = 1 << 1;
        /// Generic bus-level fault.
        const BUS           = 1 << 2;
        /// Checksum or framing mismatch.
        const COMMUNICATION = 1 << 3;
        /// Invalid API argument.
        const PARAMETER     = 1 << 4;
        /// Timeout or malformed packet length.
        const LENGTH        = 1 << 5;
    }
}

impl BusStatus {
    /// `SM_NONE`: nothing has been transferred since the last reset.
    pub const NONE: Self = Self::empty();

    /// True when any bit other than `OK` is set, including unnamed bits.
    pub fn is_error(self) -> bool {
        self.bits() & !Self::OK.bits() != 0
    }

    /// Named transport faults that are set, in report order.
    pub fn faults(self) -> impl Iterator<Item = BusFault> {
        BusFault::ALL
            .into_iter()
            .filter(move |fault| self.contains(fault.flag()))
    }
}

impl fmt::Display for BusStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::NONE {
            return f.write_str("NONE");
        }
        bitflags::parser::to_writer(self, f)
    }
}

bitflags! {
    /// Device-side cumulative command status (`SMP_CUMULATIVE_STATUS`).
    ///
    /// The empty value is `SMP_CMD_STATUS_ACK`, the only good value. Unknown
    /// bits are retained so that they still count as a fault.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DeviceStatus: u32 {
        /// Command rejected.
        const NACK           = 1 << 0;
        /// Parameter address does not exist.
        const INVALID_ADDR   = 1 << 1;
        /// Parameter value rejected.
        const INVALID_VALUE  = 1 << 2;
        /// Value above the parameter maximum.
        const VALUE_TOO_HIGH = 1 << 3;
        /// Value below the parameter minimum.
        const VALUE_TOO_LOW  = 1 << 4;
    }
}

impl DeviceStatus {
    /// `SMP_CMD_STATUS_ACK`.
    pub const ACK: Self = Self::empty();

    /// Reinterpret a raw 32-bit register value, keeping unnamed bits.
    pub fn from_register(value: i32) -> Self {
        Self::from_bits_retain(value.cast_unsigned())
    }

    /// Register encoding of this status.
    pub fn to_register(self) -> i32 {
        self.bits().cast_signed()
    }

    pub fn is_ack(self) -> bool {
        self == Self::ACK
    }

    /// Named device faults that are set, in report order.
    pub fn faults(self) -> impl Iterator<Item = DeviceFault> {
        DeviceFault::ALL
            .into_iter()
            .filter(move |fault| self.contains(fault.flag()))
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ack() {
            return f.write_str("ACK");
        }
        bitflags::parser::to_writer(self, f)
    }
}

/// Named transport-level fault category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BusFault {
    NoDevice,
    InvalidParameter,
    CommunicationError,
    DataLengthError,
    BusError,
}

impl BusFault {
    /// Every category in report order.
    pub const ALL: [Self; 5] = [
        Self::NoDevice,
        Self::InvalidParameter,
        Self::CommunicationError,
        Self::DataLengthError,
        Self::BusError,
    ];

    pub fn flag(self) -> BusStatus {
        match self {
            Self::NoDevice => BusStatus::NODEVICE,
            Self::InvalidParameter => BusStatus::PARAMETER,
            Self::CommunicationError => BusStatus::COMMUNICATION,
            Self::DataLengthError => BusStatus::LENGTH,
            Self::BusError => BusStatus::BUS,
        }
    }

    /// Operator-facing line text.
    pub fn label(self) -> &'static str {
        match self {
            Self::NoDevice => "NoDevice (check port name)",
            Self::InvalidParameter => "InvalidParameter (API)",
            Self::CommunicationError => "Communication (checksum mismatch)",
            Self::DataLengthError => "DataLength (timeout or app error)",
            Self::BusError => "BusError",
        }
    }
}

/// Named device-protocol-level fault category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceFault {
    Nack,
    InvalidAddress,
    InvalidValue,
    ValueTooHigh,
    ValueTooLow,
}

impl DeviceFault {
    /// Every category in report order.
    pub const ALL: [Self; 5] = [
        Self::Nack,
        Self::InvalidAddress,
        Self::InvalidValue,
        Self::ValueTooHigh,
        Self::ValueTooLow,
    ];

    pub fn flag(self) -> DeviceStatus {
        match self {
            Self::Nack => DeviceStatus::NACK,
            Self::InvalidAddress => DeviceStatus::INVALID_ADDR,
            Self::InvalidValue => DeviceStatus::INVALID_VALUE,
            Self::ValueTooHigh => DeviceStatus::VALUE_TOO_HIGH,
            Self::ValueTooLow => DeviceStatus::VALUE_TOO_LOW,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Nack => "Command fail (NACK)",
            Self::InvalidAddress => "Invalid param address",
            Self::InvalidValue => "Invalid param value",
            Self::ValueTooHigh => "Value too high",
            Self::ValueTooLow => "Value too low",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bus_sentinels_are_not_errors() {
        assert!(!BusStatus::NONE.is_error());
        assert!(!BusStatus::OK.is_error());
    }

    #[test]
    fn test_bus_error_with_ok_bit_is_error() {
        assert!((BusStatus::OK | BusStatus::COMMUNICATION).is_error());
        assert!(BusStatus::NODEVICE.is_error());
    }

    #[test]
    fn test_bus_unnamed_bit_is_error() {
        let status = BusStatus::from_bits_retain(1 << 12);
        assert!(status.is_error());
        assert_eq!(status.faults().count(), 0);
    }

    #[test]
    fn test_bus_bit_layout() {
        assert_eq!(BusStatus::OK.bits(), 1);
        assert_eq!(BusStatus::NODEVICE.bits(), 2);
        assert_eq!(BusStatus::BUS.bits(), 4);
        assert_eq!(BusStatus::COMMUNICATION.bits(), 8);
        assert_eq!(BusStatus::PARAMETER.bits(), 16);
        assert_eq!(BusStatus::LENGTH.bits(), 32);
    }

    #[test]
    fn test_bus_faults_follow_report_order() {
        let status = BusStatus::BUS | BusStatus::NODEVICE | BusStatus::LENGTH;
        let faults: Vec<_> = status.faults().collect();
        assert_eq!(
            faults,
            vec![
                BusFault::NoDevice,
                BusFault::DataLengthError,
                BusFault::BusError
            ]
        );
    }

    #[test]
    fn test_device_register_roundtrip_keeps_unknown_bits() {
        let status = DeviceStatus::from_register(0x40 | 0x04);
        assert!(status.contains(DeviceStatus::INVALID_VALUE));
        assert_eq!(status.to_register(), 0x44);
        assert_eq!(
            status.faults().collect::<Vec<_>>(),
            vec![DeviceFault::InvalidValue]
        );
    }

    #[test]
    fn test_device_negative_register_value() {
        let status = DeviceStatus::from_register(-1);
        assert!(!status.is_ack());
        assert_eq!(status.faults().count(), DeviceFault::ALL.len());
    }

    #[test]
    fn test_display() {
        assert_eq!(BusStatus::NONE.to_string(), "NONE");
        assert_eq!(
            (BusStatus::OK | BusStatus::COMMUNICATION).to_string(),
            "OK | COMMUNICATION"
        );
        assert_eq!(DeviceStatus::ACK.to_string(), "ACK");
        assert_eq!(DeviceStatus::NACK.to_string(), "NACK");
    }

    #[test]
    fn test_flags_map_back_to_categories() {
        for fault in BusFault::ALL {
            assert_eq!(fault.flag().faults().collect::<Vec<_>>(), vec![fault]);
        }
        for fault in DeviceFault::ALL {
            assert_eq!(fault.flag().faults().collect::<Vec<_>>(), vec![fault]);
        }
    }
}
