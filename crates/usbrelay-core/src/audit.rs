//! Audit trail of state-changing relay actions.
//!
//! Every mutation performed by the orchestrator produces exactly one
//! [`AuditEntry`]. The default sink, [`TracingAuditSink`], emits it as a
//! structured `tracing` event on the [`AUDIT_TARGET`] target so it can be
//! routed separately from the rest of the logs.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use tracing::info;

/// `tracing` target used for audit events.
pub const AUDIT_TARGET: &str = "relay::audit";

/// Kind of state-changing action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Single channel set.
    SetChannel,
    /// Bulk set of every channel.
    SetAllChannels,
    /// Fail-safe sweep to OFF.
    FailSafe,
    /// Pulse timer switched a channel OFF.
    PulseOff,
    /// Burn test started.
    BurnTestStart,
    /// Burn test stopped.
    BurnTestStop,
}

impl AuditAction {
    /// Wire name of the action.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SetChannel => "set_channel",
            Self::SetAllChannels => "set_all_channels",
            Self::FailSafe => "fail_safe",
            Self::PulseOff => "pulse_off",
            Self::BurnTestStart => "burn_test_start",
            Self::BurnTestStop => "burn_test_stop",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an action applied to.
///
/// Serializes as the bare channel number or the string `"all"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditTarget {
    /// One channel.
    Channel(u32),
    /// Every channel.
    All,
}

impl fmt::Display for AuditTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Channel(channel) => write!(f, "{channel}"),
            Self::All => f.write_str("all"),
        }
    }
}

impl Serialize for AuditTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Channel(channel) => serializer.serialize_u32(*channel),
            Self::All => serializer.serialize_str("all"),
        }
    }
}

impl<'de> Deserialize<'de> for AuditTarget {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Channel(u32),
            Name(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Channel(channel) => Ok(Self::Channel(channel)),
            Raw::Name(name) if name == "all" => Ok(Self::All),
            Raw::Name(name) => Err(D::Error::custom(format!(
                "expected a channel number or \"all\", got {name:?}"
            ))),
        }
    }
}

/// One audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// UTC time the action completed.
    pub timestamp: DateTime<Utc>,
    /// Action kind.
    pub action: AuditAction,
    /// Channel or `"all"`.
    pub target: AuditTarget,
    /// Resulting state, e.g. `"on"`, `"off"`, `"running"`.
    pub state: String,
}

impl AuditEntry {
    /// Create an entry stamped with the current time.
    #[must_use]
    pub fn now(action: AuditAction, target: AuditTarget, state: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            action,
            target,
            state: state.into(),
        }
    }
}

/// Destination for audit entries.
///
/// Sinks are called outside the device lock but may still be called from
/// several threads at once.
pub trait AuditSink: Send + Sync {
    /// Append one entry.
    fn record(&self, entry: &AuditEntry);
}

/// Sink that emits each entry as an `INFO` event on [`AUDIT_TARGET`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, entry: &AuditEntry) {
        info!(
            target: AUDIT_TARGET,
            timestamp = %entry.timestamp.to_rfc3339(),
            action = entry.action.as_str(),
            subject = %entry.target,
            state = %entry.state,
            "relay audit"
        );
    }
}

/// Sink that keeps entries in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries recorded so far.
    #[must_use]
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().clone()
    }

    /// Action kinds recorded so far, in order.
    #[must_use]
    pub fn actions(&self) -> Vec<AuditAction> {
        self.entries.lock().iter().map(|e| e.action).collect()
    }

    /// Drop every recorded entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, entry: &AuditEntry) {
        self.entries.lock().push(entry.clone());
    }
}
