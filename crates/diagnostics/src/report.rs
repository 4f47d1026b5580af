//! Status classifier and report rendering.
//!
//! A sample is an error when the transport status has any bit besides `OK`
//! or the device status is not `ACK`. Device bits are ignored whenever
//! `NODEVICE` is set, since nothing reached a device in that case.

use serde::Serialize;
use smconsole_simplemotion_v2::{BusFault, BusStatus, DeviceFault};
use std::fmt;

use crate::reader::StatusSample;

/// Report line used when an error holds but no named category is set.
pub const COMMUNICATION_ERROR_LINE: &str = "Communication error.";

const BUS_HEADER: &str = "Bus error flags:";
const DEVICE_HEADER: &str = "Device errors:";

/// Classified error of one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    bus: Vec<BusFault>,
    device: Vec<DeviceFault>,
    device_suppressed: bool,
    transport_error: bool,
}

/// Classify a sample. Returns `None` when there is nothing to report.
pub fn classify(sample: &StatusSample) -> Option<ErrorReport> {
    let transport = sample.transport;
    if !transport.is_error() && sample.device.is_ack() {
        return None;
    }

    let device_suppressed = transport.contains(BusStatus::NODEVICE);
    let device = if device_suppressed {
        Vec::new()
    } else {
        sample.device.faults().collect()
    };

    Some(ErrorReport {
        bus: transport.faults().collect(),
        device,
        device_suppressed,
        transport_error: transport.is_error(),
    })
}

impl ErrorReport {
    /// Transport categories, in report order.
    pub fn bus_faults(&self) -> &[BusFault] {
        &self.bus
    }

    /// Device categories, in report order. Empty when suppressed.
    pub fn device_faults(&self) -> &[DeviceFault] {
        &self.device
    }

    /// True when device bits were ignored because no device was reachable.
    pub fn device_suppressed(&self) -> bool {
        self.device_suppressed
    }

    /// True when the transport status held an error, named or not.
    pub fn transport_error(&self) -> bool {
        self.transport_error
    }

    /// True when the error carries no named category.
    pub fn is_generic(&self) -> bool {
        self.bus.is_empty() && self.device.is_empty()
    }

    /// True when the bus block is replaced by [`COMMUNICATION_ERROR_LINE`].
    ///
    /// That happens when no transport category is named but the transport
    /// still failed, or when no device category is named either.
    pub fn uses_generic_line(&self) -> bool {
        self.bus.is_empty() && (self.transport_error || self.device.is_empty())
    }

    /// Rendered report lines, blocks separated by an empty line.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if self.uses_generic_line() {
            lines.push(COMMUNICATION_ERROR_LINE.to_string());
        } else if !self.bus.is_empty() {
            lines.push(BUS_HEADER.to_string());
            lines.extend(self.bus.iter().map(|f| format!("* {}", f.label())));
        }
        if !self.device.is_empty() {
            if !lines.is_empty() {
                lines.push(String::new());
            }
            lines.push(DEVICE_HEADER.to_string());
            lines.extend(self.device.iter().map(|f| format!("* {}", f.label())));
        }
        lines
    }

    /// The report as one multi-line string.
    pub fn render(&self) -> String {
        self.lines().join("\n")
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smconsole_simplemotion_v2::DeviceStatus;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn report(transport: BusStatus, device: DeviceStatus) -> Option<ErrorReport> {
        classify(&StatusSample::new(transport, device))
    }

    #[test]
    fn test_healthy_sentinels_produce_no_report() {
        assert_eq!(report(BusStatus::OK, DeviceStatus::ACK), None);
        assert_eq!(report(BusStatus::NONE, DeviceStatus::ACK), None);
    }

    #[test]
    fn test_communication_and_bus_flags() -> TestResult {
        let r = report(BusStatus::COMMUNICATION | BusStatus::BUS, DeviceStatus::ACK)
            .ok_or("expected a report")?;
        assert_eq!(
            r.bus_faults(),
            &[BusFault::CommunicationError, BusFault::BusError]
        );
        assert!(r.device_faults().is_empty());
        assert_eq!(
            r.render(),
            "Bus error flags:\n* Communication (checksum mismatch)\n* BusError"
        );
        Ok(())
    }

    #[test]
    fn test_invalid_value_only_device_block() -> TestResult {
        let r = report(BusStatus::OK, DeviceStatus::INVALID_VALUE).ok_or("expected a report")?;
        assert!(r.bus_faults().is_empty());
        assert!(!r.transport_error());
        assert!(!r.uses_generic_line());
        assert_eq!(r.render(), "Device errors:\n* Invalid param value");
        Ok(())
    }

    #[test]
    fn test_unnamed_transport_bit_kept_next_to_device_block() -> TestResult {
        let transport = BusStatus::OK | BusStatus::from_bits_retain(1 << 9);
        let r = report(transport, DeviceStatus::NACK).ok_or("expected a report")?;
        assert!(r.transport_error());
        assert!(r.uses_generic_line());
        assert_eq!(
            r.lines(),
            vec![
                COMMUNICATION_ERROR_LINE,
                "",
                "Device errors:",
                "* Command fail (NACK)",
            ]
        );
        Ok(())
    }

    #[test]
    fn test_nodevice_suppresses_device_lines() -> TestResult {
        let r = report(BusStatus::NODEVICE, DeviceStatus::NACK).ok_or("expected a report")?;
        assert!(r.device_suppressed());
        assert_eq!(r.render(), "Bus error flags:\n* NoDevice (check port name)");
        Ok(())
    }

    #[test]
    fn test_both_blocks_bus_first() -> TestResult {
        let r = report(
            BusStatus::OK | BusStatus::LENGTH,
            DeviceStatus::VALUE_TOO_HIGH | DeviceStatus::NACK,
        )
        .ok_or("expected a report")?;
        assert_eq!(
            r.lines(),
            vec![
                "Bus error flags:",
                "* DataLength (timeout or app error)",
                "",
                "Device errors:",
                "* Command fail (NACK)",
                "* Value too high",
            ]
        );
        Ok(())
    }

    #[test]
    fn test_unnamed_bits_fall_back_to_generic_line() -> TestResult {
        let r = report(BusStatus::from_bits_retain(1 << 9), DeviceStatus::ACK)
            .ok_or("expected a report")?;
        assert!(r.is_generic());
        assert_eq!(r.render(), COMMUNICATION_ERROR_LINE);

        let r = report(BusStatus::OK, DeviceStatus::from_register(1 << 20))
            .ok_or("expected a report")?;
        assert_eq!(r.render(), COMMUNICATION_ERROR_LINE);
        Ok(())
    }

    #[test]
    fn test_display_matches_render() -> TestResult {
        let r = report(BusStatus::PARAMETER, DeviceStatus::ACK).ok_or("expected a report")?;
        assert_eq!(r.to_string(), r.render());
        Ok(())
    }
}
