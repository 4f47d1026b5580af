//! Check modes and the fast-check escalation policy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How much of the status a check inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckMode {
    /// Transport status only. No bus transaction is issued, so this fits
    /// after latency-sensitive bursts. Rejected parameter values go unnoticed.
    Fast,
    /// Also read, and clear when non-zero, the drive's cumulative status.
    #[default]
    Thorough,
}

impl CheckMode {
    /// True when the check reads the device-side cumulative status.
    pub fn reads_device(self) -> bool {
        matches!(self, Self::Thorough)
    }
}

impl fmt::Display for CheckMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fast => f.write_str("fast"),
            Self::Thorough => f.write_str("thorough"),
        }
    }
}

/// Session-wide check policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckPolicy {
    /// Promote a fast check to a thorough one once this many fast checks ran
    /// back to back, so a latched device fault is eventually reported and
    /// cleared. `None` never promotes.
    pub max_consecutive_fast_checks: Option<u32>,
}

impl CheckPolicy {
    /// Policy that promotes after `limit` consecutive fast checks.
    pub fn escalate_after(limit: u32) -> Self {
        Self {
            max_consecutive_fast_checks: Some(limit),
        }
    }

    /// Mode to actually run, given the requested mode and the number of fast
    /// checks that ran since the last thorough one.
    pub fn effective_mode(&self, requested: CheckMode, consecutive_fast: u32) -> CheckMode {
        match (requested, self.max_consecutive_fast_checks) {
            (CheckMode::Fast, Some(limit)) if consecutive_fast >= limit => CheckMode::Thorough,
            _ => requested,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mode_is_thorough() {
        assert_eq!(CheckMode::default(), CheckMode::Thorough);
        assert!(CheckMode::Thorough.reads_device());
        assert!(!CheckMode::Fast.reads_device());
    }

    #[test]
    fn test_default_policy_never_promotes() {
        let policy = CheckPolicy::default();
        assert_eq!(
            policy.effective_mode(CheckMode::Fast, u32::MAX),
            CheckMode::Fast
        );
    }

    #[test]
    fn test_policy_promotes_at_limit() {
        let policy = CheckPolicy::escalate_after(3);
        assert_eq!(policy.effective_mode(CheckMode::Fast, 2), CheckMode::Fast);
        assert_eq!(
            policy.effective_mode(CheckMode::Fast, 3),
            CheckMode::Thorough
        );
        assert_eq!(
            policy.effective_mode(CheckMode::Thorough, 0),
            CheckMode::Thorough
        );
    }

    #[test]
    fn test_mode_serde_names() -> Result<(), Box<dyn std::error::Error>> {
        assert_eq!(serde_json::to_string(&CheckMode::Fast)?, "\"fast\"");
        let mode: CheckMode = serde_json::from_str("\"thorough\"")?;
        assert_eq!(mode, CheckMode::Thorough);
        Ok(())
    }
}
