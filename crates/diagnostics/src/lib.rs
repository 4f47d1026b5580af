//! SM bus error classification and cumulative status management.
//!
//! SimpleMotion V2 reports errors on layered status bit-fields. This crate
//! turns them into a yes/no answer and an operator-readable report after each
//! batch of bus transactions:
//!
//! - [`reader`]: reads and clears the drive's cumulative status register
//! - [`report`]: classifies a [`StatusSample`] and renders an [`ErrorReport`]
//! - [`session`]: [`BusSession`] owns one connection and its accumulators
//! - [`shared`]: [`SharedBusSession`] serializes concurrent users of a session
//!
//! # Example
//!
//! ```
//! use smconsole_diagnostics::{BusSession, CheckMode};
//! use smconsole_simplemotion_v2::{SMP_TRAJ_PLANNER_VEL, VirtualSmBus};
//!
//! let mut session = BusSession::open(VirtualSmBus::new(1), 1);
//! session.write_parameter(SMP_TRAJ_PLANNER_VEL, 500)?;
//! assert!(!session.check_and_report(CheckMode::Thorough));
//! # Ok::<(), smconsole_simplemotion_v2::SmError>(())
//! ```

#![deny(static_mut_refs)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod mode;
pub mod reader;
pub mod report;
pub mod session;
pub mod shared;

pub use mode::{CheckMode, CheckPolicy};
pub use reader::{StatusSample, clear_device_cumulative_status, read_device_cumulative_status};
pub use report::{COMMUNICATION_ERROR_LINE, ErrorReport, classify};
pub use session::{BusSession, CheckOutcome, CheckStats};
pub use shared::SharedBusSession;

/// Tracing target of rendered error reports.
pub const REPORT_TARGET: &str = "smconsole::bus";
