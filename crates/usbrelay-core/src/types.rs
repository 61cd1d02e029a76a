//! Value types returned by the orchestrator.
//!
//! All of them serialize to the JSON shapes served by the HTTP API.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical relay state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelState {
    /// Relay energized.
    On,
    /// Relay released.
    #[default]
    Off,
}

impl ChannelState {
    /// Whether the relay is energized.
    #[must_use]
    pub fn is_on(self) -> bool {
        matches!(self, Self::On)
    }

    /// Wire name, `"on"` or `"off"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }
}

impl From<bool> for ChannelState {
    fn from(on: bool) -> Self {
        if on { Self::On } else { Self::Off }
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mirrored state of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayStatus {
    /// 1-based channel number.
    pub channel: u32,
    /// Last confirmed state.
    pub state: ChannelState,
}

/// Live driver information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Manufacturer string, `"Unknown"` when the device is closed.
    pub manufacturer: String,
    /// Product string, `"Unknown"` when the device is closed.
    pub product: String,
    /// Configured channel count.
    pub channels: u32,
    /// Whether the driver reports the device as open.
    pub connected: bool,
}

/// Burn-test cycling pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BurnTestMode {
    /// Every channel ON, then every channel OFF.
    #[default]
    All,
    /// Channel 1 and channel 2 in opposite phase.
    Alternate,
}

impl BurnTestMode {
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            Self::All => 0,
            Self::Alternate => 1,
        }
    }

    pub(crate) fn from_u8(raw: u8) -> Self {
        if raw == 1 { Self::Alternate } else { Self::All }
    }

    /// Wire name, `"all"` or `"alternate"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Alternate => "alternate",
        }
    }
}

impl fmt::Display for BurnTestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the current or last burn test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnTestStatus {
    /// Whether the background task is active.
    pub running: bool,
    /// Completed ON/OFF cycles.
    pub cycles_completed: u64,
    /// Target cycle count, 0 runs until stopped.
    pub cycles_target: u64,
    /// Failed channel writes so far.
    pub errors: u64,
    /// Cycling pattern.
    pub mode: BurnTestMode,
}

/// Secondary write failures that were logged instead of returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WriteFailureStats {
    /// Restore writes that failed while rolling back a bulk operation.
    pub rollback_failures: u64,
    /// OFF writes that failed during a fail-safe sweep.
    pub fail_safe_failures: u64,
    /// OFF writes that failed when a pulse timer fired.
    pub pulse_failures: u64,
}

impl WriteFailureStats {
    /// Sum of all counters.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.rollback_failures
            .saturating_add(self.fail_safe_failures)
            .saturating_add(self.pulse_failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_state_wire_names() -> Result<(), serde_json::Error> {
        assert_eq!(serde_json::to_string(&ChannelState::On)?, "\"on\"");
        assert_eq!(serde_json::to_string(&ChannelState::Off)?, "\"off\"");
        let parsed: ChannelState = serde_json::from_str("\"on\"")?;
        assert_eq!(parsed, ChannelState::On);
        assert!(serde_json::from_str::<ChannelState>("\"ON\"").is_err());
        Ok(())
    }

    #[test]
    fn test_channel_state_from_bool() {
        assert_eq!(ChannelState::from(true), ChannelState::On);
        assert_eq!(ChannelState::from(false), ChannelState::Off);
        assert_eq!(ChannelState::default(), ChannelState::Off);
    }

    #[test]
    fn test_burn_test_mode_u8_mapping() {
        for mode in [BurnTestMode::All, BurnTestMode::Alternate] {
            assert_eq!(BurnTestMode::from_u8(mode.as_u8()), mode);
        }
    }

    #[test]
    fn test_burn_test_status_shape() -> Result<(), serde_json::Error> {
        let status = BurnTestStatus {
            running: true,
            cycles_completed: 42,
            cycles_target: 100,
            errors: 0,
            mode: BurnTestMode::Alternate,
        };
        let value = serde_json::to_value(status)?;
        assert_eq!(
            value,
            serde_json::json!({
                "running": true,
                "cycles_completed": 42,
                "cycles_target": 100,
                "errors": 0,
                "mode": "alternate",
            })
        );
        Ok(())
    }

    #[test]
    fn test_write_failure_total_saturates() {
        let stats = WriteFailureStats {
            rollback_failures: u64::MAX,
            fail_safe_failures: 1,
            pulse_failures: 1,
        };
        assert_eq!(stats.total(), u64::MAX);
    }
}
