//! Bus session: one open connection and its status accumulators.
//!
//! Every [`BusSession::check`] is a full cycle: read, classify, report,
//! reset. The reset runs whatever the outcome, so an error is reported once
//! and never again by a later check.

use serde::Serialize;
use smconsole_simplemotion_v2::{DeviceStatus, NodeAddress, QueuedCommand, SmBus, SmResult};
use tracing::{debug, error, warn};

use crate::REPORT_TARGET;
use crate::mode::{CheckMode, CheckPolicy};
use crate::reader::{self, StatusSample};
use crate::report::{ErrorReport, classify};

/// Result of one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    /// Mode that actually ran, after policy promotion.
    pub mode: CheckMode,
    /// Raw values the check classified.
    pub sample: StatusSample,
    /// Rendered error, if any.
    pub report: Option<ErrorReport>,
}

impl CheckOutcome {
    /// True when the check found an error.
    pub fn had_error(&self) -> bool {
        self.report.is_some()
    }
}

/// Counters over the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CheckStats {
    /// Checks run.
    pub checks: u64,
    /// Checks that found an error.
    pub failed: u64,
    /// Fast checks promoted to thorough by the policy.
    pub promoted: u64,
}

/// An open SM bus connection to one device.
#[derive(Debug)]
pub struct BusSession<B: SmBus> {
    bus: B,
    node: NodeAddress,
    policy: CheckPolicy,
    consecutive_fast: u32,
    stats: CheckStats,
}

impl<B: SmBus> BusSession<B> {
    /// Take ownership of an open bus and talk to the device at `node`.
    ///
    /// The transport accumulator is reset so the first check only reflects
    /// this session.
    pub fn open(mut bus: B, node: NodeAddress) -> Self {
        bus.reset_cumulative_status();
        debug!("Opened bus session for node {}", node);
        Self {
            bus,
            node,
            policy: CheckPolicy::default(),
            consecutive_fast: 0,
            stats: CheckStats::default(),
        }
    }

    /// Replace the check policy.
    pub fn with_policy(mut self, policy: CheckPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Device node address.
    pub fn node(&self) -> NodeAddress {
        self.node
    }

    /// Talk to another device on the same bus.
    pub fn set_node(&mut self, node: NodeAddress) {
        self.node = node;
    }

    /// Active check policy.
    pub fn policy(&self) -> CheckPolicy {
        self.policy
    }

    /// Underlying transport.
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Underlying transport, mutably. Transactions issued here are covered
    /// by the next check like any other.
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Fast checks run since the last thorough check.
    pub fn consecutive_fast_checks(&self) -> u32 {
        self.consecutive_fast
    }

    /// Lifetime counters.
    pub fn stats(&self) -> CheckStats {
        self.stats
    }

    /// Read one parameter of the session's device.
    ///
    /// # Errors
    ///
    /// Propagates the transport error.
    pub fn read_parameter(&mut self, param: u16) -> SmResult<i32> {
        self.bus.read_parameter(self.node, param)
    }

    /// Write one parameter of the session's device.
    ///
    /// # Errors
    ///
    /// Propagates the transport error.
    pub fn write_parameter(&mut self, param: u16, value: i32) -> SmResult<()> {
        self.bus.write_parameter(self.node, param, value)
    }

    /// Read several parameters of the session's device.
    ///
    /// # Errors
    ///
    /// Propagates the first transport error.
    pub fn read_parameters(&mut self, params: &[u16]) -> SmResult<Vec<i32>> {
        self.bus.read_parameters(self.node, params)
    }

    /// Execute a queued command batch on the session's device.
    ///
    /// # Errors
    ///
    /// Propagates the transport error.
    pub fn execute_queue(&mut self, commands: &[QueuedCommand]) -> SmResult<Vec<i32>> {
        self.bus.execute_queue(self.node, commands)
    }

    /// Read the device's cumulative status register.
    ///
    /// # Errors
    ///
    /// Propagates the transport error.
    pub fn read_device_cumulative_status(&mut self) -> SmResult<DeviceStatus> {
        reader::read_device_cumulative_status(&mut self.bus, self.node)
    }

    /// Clear the device's cumulative status register if `observed` is not `ACK`.
    ///
    /// # Errors
    ///
    /// Propagates the transport error.
    pub fn clear_device_cumulative_status(&mut self, observed: DeviceStatus) -> SmResult<bool> {
        reader::clear_device_cumulative_status(&mut self.bus, self.node, observed)
    }

    /// Run one check cycle and return its outcome.
    ///
    /// A found error is emitted as one `ERROR` event on [`REPORT_TARGET`].
    pub fn check(&mut self, mode: CheckMode) -> CheckOutcome {
        let effective = self.policy.effective_mode(mode, self.consecutive_fast);
        if effective != mode {
            warn!(
                "Promoting fast check to thorough after {} consecutive fast checks",
                self.consecutive_fast
            );
            self.stats.promoted = self.stats.promoted.saturating_add(1);
        }

        let sample = reader::sample(&mut self.bus, self.node, effective);
        let report = classify(&sample);
        self.bus.reset_cumulative_status();

        self.consecutive_fast = match effective {
            CheckMode::Fast => self.consecutive_fast.saturating_add(1),
            CheckMode::Thorough => 0,
        };
        self.stats.checks = self.stats.checks.saturating_add(1);

        if let Some(report) = &report {
            self.stats.failed = self.stats.failed.saturating_add(1);
            error!(target: REPORT_TARGET, "{}", report);
        }

        CheckOutcome {
            mode: effective,
            sample,
            report,
        }
    }

    /// Run one check cycle. Returns true when an error was found.
    pub fn check_and_report(&mut self, mode: CheckMode) -> bool {
        self.check(mode).had_error()
    }

    /// Close the session and hand the transport back.
    pub fn close(mut self) -> B {
        self.bus.reset_cumulative_status();
        debug!(
            "Closed bus session for node {} after {} checks ({} failed)",
            self.node, self.stats.checks, self.stats.failed
        );
        self.bus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smconsole_simplemotion_v2::{
        BusStatus, SMP_CUMULATIVE_STATUS, SMP_TRAJ_PLANNER_VEL, SmError, VirtualSmBus,
    };
    use tracing_test::traced_test;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn session() -> BusSession<VirtualSmBus> {
        BusSession::open(VirtualSmBus::new(1), 1)
    }

    #[test]
    fn test_open_resets_stale_transport_status() {
        let mut bus = VirtualSmBus::new(1);
        bus.inject_fault(BusStatus::BUS);
        assert!(matches!(
            bus.read_parameter(1, SMP_TRAJ_PLANNER_VEL),
            Err(SmError::Transport(_))
        ));
        let mut session = BusSession::open(bus, 1);
        assert!(!session.check_and_report(CheckMode::Fast));
    }

    #[test]
    fn test_clean_write_passes_thorough_check() -> TestResult {
        let mut session = session();
        session.write_parameter(SMP_TRAJ_PLANNER_VEL, 200)?;
        let outcome = session.check(CheckMode::Thorough);
        assert!(!outcome.had_error());
        assert_eq!(outcome.sample.transport, BusStatus::OK);
        Ok(())
    }

    #[test]
    #[traced_test]
    fn test_rejected_write_is_reported_and_logged() -> TestResult {
        let mut session = session();
        session.write_parameter(SMP_TRAJ_PLANNER_VEL, 1_000_000)?;
        assert!(session.check_and_report(CheckMode::Thorough));
        assert!(logs_contain("Device errors:"));
        assert!(logs_contain("Value too high"));
        Ok(())
    }

    #[test]
    fn test_second_check_is_clean() -> TestResult {
        let mut session = session();
        session.write_parameter(SMP_TRAJ_PLANNER_VEL, -5)?;
        session.bus_mut().inject_fault(BusStatus::BUS);
        assert!(matches!(
            session.read_parameter(SMP_TRAJ_PLANNER_VEL),
            Err(SmError::Transport(_))
        ));
        let first = session.check(CheckMode::Thorough);
        assert!(first.had_error());
        assert!(!session.check_and_report(CheckMode::Thorough));
        Ok(())
    }

    #[test]
    fn test_failed_clear_keeps_device_bits_for_next_check() -> TestResult {
        let mut session = session();
        session.write_parameter(SMP_TRAJ_PLANNER_VEL, -5)?;
        session.bus_mut().inject_fault(BusStatus::OK);
        session.bus_mut().inject_fault(BusStatus::COMMUNICATION);
        assert!(session.check_and_report(CheckMode::Thorough));
        // The clearing write failed, so the device still holds its bits.
        assert!(session.check_and_report(CheckMode::Thorough));
        assert!(!session.check_and_report(CheckMode::Thorough));
        Ok(())
    }

    #[test]
    fn test_fast_check_skips_device_register() -> TestResult {
        let mut session = session();
        session.write_parameter(SMP_TRAJ_PLANNER_VEL, 1_000_000)?;
        assert!(!session.check_and_report(CheckMode::Fast));
        assert_eq!(session.bus().transaction_count(SMP_CUMULATIVE_STATUS), 0);
        assert_eq!(session.consecutive_fast_checks(), 1);

        // The device fault is still latched for the next thorough check.
        assert!(session.check_and_report(CheckMode::Thorough));
        assert_eq!(session.consecutive_fast_checks(), 0);
        Ok(())
    }

    #[test]
    fn test_policy_promotes_long_fast_runs() -> TestResult {
        let mut session = session().with_policy(CheckPolicy::escalate_after(2));
        assert_eq!(session.policy(), CheckPolicy::escalate_after(2));
        session.write_parameter(SMP_TRAJ_PLANNER_VEL, 1_000_000)?;
        assert_eq!(session.check(CheckMode::Fast).mode, CheckMode::Fast);
        assert_eq!(session.check(CheckMode::Fast).mode, CheckMode::Fast);
        let third = session.check(CheckMode::Fast);
        assert_eq!(third.mode, CheckMode::Thorough);
        assert!(third.had_error());
        assert_eq!(session.stats().promoted, 1);
        Ok(())
    }

    #[test]
    fn test_stats_count_checks() {
        let mut session = session();
        session.bus_mut().inject_fault(BusStatus::LENGTH);
        assert!(matches!(
            session.read_parameter(SMP_TRAJ_PLANNER_VEL),
            Err(SmError::Transport(_))
        ));
        assert!(session.check_and_report(CheckMode::Fast));
        assert!(!session.check_and_report(CheckMode::Fast));
        assert_eq!(
            session.stats(),
            CheckStats {
                checks: 2,
                failed: 1,
                promoted: 0
            }
        );
    }

    #[test]
    fn test_close_returns_bus_with_clean_accumulator() -> TestResult {
        let mut session = session();
        session.write_parameter(SMP_TRAJ_PLANNER_VEL, 300)?;
        let bus = session.close();
        assert_eq!(bus.cumulative_status(), BusStatus::NONE);
        assert_eq!(bus.value(SMP_TRAJ_PLANNER_VEL), Some(300));
        Ok(())
    }
}
