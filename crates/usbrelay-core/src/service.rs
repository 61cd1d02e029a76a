//! The relay orchestrator.
//!
//! [`RelayService`] owns the driver, the channel-state mirror and the pulse
//! timers behind one lock. Every device write, from API calls, pulse timers
//! and the burn test alike, happens while that lock is held.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};
use usbrelay_device::{RelayDevice, RelayError, RelayResult};

use crate::audit::{AuditAction, AuditEntry, AuditSink, AuditTarget};
use crate::burn_test::BurnTestState;
use crate::error::{CoreError, CoreResult};
use crate::pulse::{self, PulseSlot};
use crate::types::{ChannelState, DeviceInfo, RelayStatus, WriteFailureStats};

/// Orchestrator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayServiceConfig {
    /// Number of relay channels, fixed for the service lifetime.
    pub channels: u32,
    /// Auto-off delay after a channel is set ON, 0 disables pulses.
    pub pulse_ms: u64,
}

impl Default for RelayServiceConfig {
    fn default() -> Self {
        Self {
            channels: 2,
            pulse_ms: 0,
        }
    }
}

impl RelayServiceConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `channels` is 0.
    pub fn validate(&self) -> CoreResult<()> {
        if self.channels == 0 {
            return Err(CoreError::invalid_configuration(
                "channels must be at least 1",
            ));
        }
        Ok(())
    }

    /// Pulse duration, `None` when pulses are disabled.
    #[must_use]
    pub fn pulse_duration(&self) -> Option<Duration> {
        (self.pulse_ms > 0).then(|| Duration::from_millis(self.pulse_ms))
    }
}

/// Mirror entry and pulse timer for one channel.
#[derive(Debug, Default)]
pub(crate) struct ChannelSlot {
    pub(crate) state: ChannelState,
    pub(crate) pulse: PulseSlot,
}

/// Everything guarded by the device lock.
pub(crate) struct Inner {
    pub(crate) driver: Box<dyn RelayDevice>,
    pub(crate) channels: Vec<ChannelSlot>,
}

impl Inner {
    pub(crate) fn slot_mut(&mut self, channel: u32) -> Option<&mut ChannelSlot> {
        let index = channel.checked_sub(1)? as usize;
        self.channels.get_mut(index)
    }
}

#[derive(Debug, Default)]
pub(crate) struct FailureCounters {
    rollback: AtomicU64,
    fail_safe: AtomicU64,
    pulse: AtomicU64,
}

impl FailureCounters {
    fn record_rollback(&self) {
        self.rollback.fetch_add(1, Ordering::Relaxed);
    }

    fn record_fail_safe(&self, count: u64) {
        self.fail_safe.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_pulse(&self) {
        self.pulse.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> WriteFailureStats {
        WriteFailureStats {
            rollback_failures: self.rollback.load(Ordering::Relaxed),
            fail_safe_failures: self.fail_safe.load(Ordering::Relaxed),
            pulse_failures: self.pulse.load(Ordering::Relaxed),
        }
    }
}

/// State shared between the service handle and its background tasks.
pub(crate) struct Shared {
    pub(crate) config: RelayServiceConfig,
    pub(crate) inner: Mutex<Inner>,
    pub(crate) audit: Arc<dyn AuditSink>,
    pub(crate) runtime: Handle,
    pub(crate) failures: FailureCounters,
    pub(crate) burn: BurnTestState,
}

impl Shared {
    pub(crate) fn record(&self, action: AuditAction, target: AuditTarget, state: &str) {
        self.audit.record(&AuditEntry::now(action, target, state));
    }

    fn check_channel(&self, channel: u32) -> RelayResult<()> {
        if channel == 0 || channel > self.config.channels {
            return Err(RelayError::invalid_channel(channel, self.config.channels));
        }
        Ok(())
    }
}

/// Concurrency-safe relay orchestrator.
///
/// Cloning is cheap and every clone drives the same device. Pulse timers and
/// the burn test run on the Tokio runtime passed to [`RelayService::new`] and
/// hold only weak references, so dropping the last handle winds them down.
///
/// The synchronous operations take the device lock and may block on USB I/O.
/// Call them from `tokio::task::spawn_blocking` when on an async worker.
#[derive(Clone)]
pub struct RelayService {
    pub(crate) shared: Arc<Shared>,
}

impl fmt::Debug for RelayService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayService")
            .field("config", &self.shared.config)
            .field("burn_test", &self.burn_test_status())
            .finish_non_exhaustive()
    }
}

impl RelayService {
    /// Build an orchestrator around an already opened (or failed) driver.
    ///
    /// All channels start OFF in the mirror. No device I/O is performed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfiguration`] if the configuration is invalid.
    pub fn new(
        driver: Box<dyn RelayDevice>,
        config: RelayServiceConfig,
        audit: Arc<dyn AuditSink>,
        runtime: Handle,
    ) -> CoreResult<Self> {
        config.validate()?;
        let channels = (0..config.channels)
            .map(|_| ChannelSlot::default())
            .collect();

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                inner: Mutex::new(Inner { driver, channels }),
                audit,
                runtime,
                failures: FailureCounters::default(),
                burn: BurnTestState::default(),
            }),
        })
    }

    /// Configured channel count.
    #[must_use]
    pub fn channel_count(&self) -> u32 {
        self.shared.config.channels
    }

    /// Configuration the service was built with.
    #[must_use]
    pub fn config(&self) -> RelayServiceConfig {
        self.shared.config
    }

    /// Whether the driver currently reports the device as open.
    #[must_use]
    pub fn is_device_connected(&self) -> bool {
        self.shared.inner.lock().driver.is_open()
    }

    /// Secondary write failures that were logged instead of returned.
    #[must_use]
    pub fn write_failures(&self) -> WriteFailureStats {
        self.shared.failures.snapshot()
    }

    /// Set one channel.
    ///
    /// A successful write cancels any pending pulse timer for the channel and,
    /// when the new state is ON and pulses are enabled, schedules a new one. A
    /// failed write leaves the pending timer in place.
    ///
    /// # Errors
    ///
    /// - [`RelayError::InvalidChannel`] if `channel` is outside `[1, N]`. No I/O
    ///   is attempted.
    /// - [`RelayError::DeviceCommunication`] if the write fails. The mirror keeps
    ///   its previous value.
    pub fn set(&self, channel: u32, state: ChannelState) -> RelayResult<RelayStatus> {
        let shared = &self.shared;
        shared.check_channel(channel)?;

        {
            let mut guard = shared.inner.lock();
            let Inner { driver, channels } = &mut *guard;
            let slot = channel
                .checked_sub(1)
                .and_then(|index| channels.get_mut(index as usize))
                .ok_or_else(|| RelayError::invalid_channel(channel, shared.config.channels))?;

            // A failed write keeps the mirror, so it keeps its pending pulse too.
            driver.set_channel(channel, state.is_on()).inspect_err(|e| {
                error!(channel, state = %state, error = %e, "Relay write failed");
            })?;
            let generation = slot.pulse.cancel();
            slot.state = state;

            let pulse = shared
                .config
                .pulse_duration()
                .filter(|_| state.is_on());
            if let Some(delay) = pulse {
                let handle = pulse::spawn(
                    &shared.runtime,
                    Arc::downgrade(shared),
                    channel,
                    generation,
                    delay,
                );
                slot.pulse.arm(handle);
                debug!(channel, pulse_ms = shared.config.pulse_ms, "Pulse timer armed");
            }
        }

        shared.record(
            AuditAction::SetChannel,
            AuditTarget::Channel(channel),
            state.as_str(),
        );
        info!(channel, state = %state, "Relay set");
        Ok(RelayStatus { channel, state })
    }

    /// Mirrored state of one channel. No device I/O.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidChannel`] if `channel` is outside `[1, N]`.
    pub fn get(&self, channel: u32) -> RelayResult<RelayStatus> {
        self.shared.check_channel(channel)?;
        let mut inner = self.shared.inner.lock();
        let state = inner
            .slot_mut(channel)
            .map(|slot| slot.state)
            .ok_or_else(|| RelayError::invalid_channel(channel, self.shared.config.channels))?;
        Ok(RelayStatus { channel, state })
    }

    /// Mirrored state of every channel, ascending. No device I/O.
    #[must_use]
    pub fn get_all(&self) -> Vec<RelayStatus> {
        let inner = self.shared.inner.lock();
        (1u32..)
            .zip(inner.channels.iter())
            .map(|(channel, slot)| RelayStatus {
                channel,
                state: slot.state,
            })
            .collect()
    }

    /// Set every channel, ascending, as one operation.
    ///
    /// On the first failed write every channel already switched is restored to
    /// its previous state (best effort, ascending) and the failure is returned.
    /// On success all pending pulse timers are cancelled and none are armed.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::DeviceCommunication`] from the first failed write.
    pub fn set_all(&self, state: ChannelState) -> RelayResult<Vec<RelayStatus>> {
        let shared = &self.shared;
        let statuses = {
            let mut guard = shared.inner.lock();
            let Inner { driver, channels } = &mut *guard;
            let previous: Vec<ChannelState> = channels.iter().map(|slot| slot.state).collect();

            let mut completed = 0usize;
            let mut failure = None;
            for (channel, slot) in (1u32..).zip(channels.iter_mut()) {
                if let Err(e) = driver.set_channel(channel, state.is_on()) {
                    failure = Some((channel, e));
                    break;
                }
                slot.state = state;
                completed += 1;
            }

            if let Some((channel, err)) = failure {
                error!(
                    channel,
                    state = %state,
                    error = %err,
                    rolled_back = completed,
                    "Bulk relay write failed, rolling back"
                );
                let restore = (1u32..)
                    .zip(channels.iter_mut().zip(previous))
                    .take(completed);
                for (channel, (slot, before)) in restore {
                    if let Err(e) = driver.set_channel(channel, before.is_on()) {
                        shared.failures.record_rollback();
                        warn!(channel, error = %e, "Rollback write failed");
                    }
                    slot.state = before;
                }
                return Err(err);
            }

            for slot in channels.iter_mut() {
                slot.pulse.cancel();
            }
            (1u32..)
                .zip(channels.iter())
                .map(|(channel, slot)| RelayStatus {
                    channel,
                    state: slot.state,
                })
                .collect::<Vec<_>>()
        };

        shared.record(AuditAction::SetAllChannels, AuditTarget::All, state.as_str());
        info!(state = %state, channels = statuses.len(), "All relays set");
        Ok(statuses)
    }

    /// Fail-safe sweep: switch every channel OFF, ascending.
    ///
    /// The mirror ends with every channel OFF even when writes fail. Failures
    /// are logged and counted, never returned. Pending pulse timers are
    /// cancelled.
    pub fn all_off(&self) {
        let shared = &self.shared;
        let failed = {
            let mut guard = shared.inner.lock();
            let Inner { driver, channels } = &mut *guard;
            let mut failed = 0u64;
            for (channel, slot) in (1u32..).zip(channels.iter_mut()) {
                slot.pulse.cancel();
                if let Err(e) = driver.set_channel(channel, false) {
                    failed += 1;
                    warn!(channel, error = %e, "Fail-safe OFF write failed");
                }
                slot.state = ChannelState::Off;
            }
            failed
        };

        if failed > 0 {
            shared.failures.record_fail_safe(failed);
        }
        shared.record(AuditAction::FailSafe, AuditTarget::All, "off");
        info!(failed, "Fail-safe: all relays OFF");
    }

    /// Live driver information, read under the device lock.
    #[must_use]
    pub fn device_info(&self) -> DeviceInfo {
        let inner = self.shared.inner.lock();
        DeviceInfo {
            manufacturer: inner.driver.manufacturer(),
            product: inner.driver.product(),
            channels: self.shared.config.channels,
            connected: inner.driver.is_open(),
        }
    }

    /// Whether a pulse timer is pending for `channel`.
    #[must_use]
    pub fn has_pending_pulse(&self, channel: u32) -> bool {
        self.shared
            .inner
            .lock()
            .slot_mut(channel)
            .is_some_and(|slot| slot.pulse.is_pending())
    }

    /// Graceful shutdown: stop the burn test, switch everything OFF if the
    /// device is connected, then close the driver.
    pub async fn shutdown(&self) {
        if self.burn_test_status().running {
            self.stop_burn_test().await;
        }

        let service = self.clone();
        let closed = tokio::task::spawn_blocking(move || {
            if service.is_device_connected() {
                service.all_off();
            } else {
                let mut inner = service.shared.inner.lock();
                for slot in &mut inner.channels {
                    slot.pulse.cancel();
                }
            }
            service.shared.inner.lock().driver.close();
        })
        .await;

        match closed {
            Ok(()) => info!("Relay service shut down"),
            Err(e) => error!(error = %e, "Relay shutdown task failed"),
        }
    }
}
