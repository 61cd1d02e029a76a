//! Per-channel auto-off timers.
//!
//! A pulse timer is a one-shot Tokio task. Each channel carries a generation
//! counter that is bumped whenever its timer is cancelled. A firing timer only
//! acts if its generation is still current when it holds the device lock, so a
//! timer that was aborted after its sleep finished cannot switch the channel
//! off behind a newer command.

use std::sync::Weak;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::audit::{AuditAction, AuditTarget};
use crate::service::Shared;
use crate::types::ChannelState;

/// Pulse bookkeeping for one channel.
#[derive(Debug, Default)]
pub(crate) struct PulseSlot {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl PulseSlot {
    /// Invalidate the pending timer, if any, and return the new generation.
    pub(crate) fn cancel(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.generation
    }

    pub(crate) fn arm(&mut self, handle: JoinHandle<()>) {
        self.handle = Some(handle);
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Forget the handle of a timer that is firing right now.
    pub(crate) fn disarm(&mut self) {
        self.handle = None;
    }
}

/// Spawn the timer task for `channel`.
pub(crate) fn spawn(
    runtime: &Handle,
    shared: Weak<Shared>,
    channel: u32,
    generation: u64,
    delay: Duration,
) -> JoinHandle<()> {
    runtime.spawn(async move {
        tokio::time::sleep(delay).await;
        let Some(shared) = shared.upgrade() else {
            return;
        };
        let fired = tokio::task::spawn_blocking(move || shared.pulse_off(channel, generation));
        if let Err(e) = fired.await {
            warn!(channel, error = %e, "Pulse timer task failed");
        }
    })
}

impl Shared {
    /// Switch `channel` off if the timer with `generation` is still current.
    pub(crate) fn pulse_off(&self, channel: u32, generation: u64) {
        let switched = {
            let mut guard = self.inner.lock();
            let inner = &mut *guard;
            let Some(slot) = inner.slot_mut(channel) else {
                return;
            };
            if !slot.pulse.is_current(generation) {
                debug!(channel, "Stale pulse timer ignored");
                return;
            }
            slot.pulse.disarm();

            match inner.driver.set_channel(channel, false) {
                Ok(()) => {
                    if let Some(slot) = inner.slot_mut(channel) {
                        slot.state = ChannelState::Off;
                    }
                    true
                }
                Err(e) => {
                    self.failures.record_pulse();
                    warn!(channel, error = %e, "Pulse auto-off failed");
                    false
                }
            }
        };

        if switched {
            self.record(AuditAction::PulseOff, AuditTarget::Channel(channel), "off");
            debug!(channel, "Pulse auto-off");
        }
    }
}
