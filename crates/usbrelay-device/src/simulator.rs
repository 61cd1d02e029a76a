//! In-memory relay board for development and demos without hardware.

use crate::traits::{RelayDevice, UNKNOWN};
use crate::{RelayError, RelayResult};
use tracing::info;

/// Simulated relay board that tracks channel states and logs every write.
#[derive(Debug)]
pub struct SimulatedRelayDevice {
    channels: u32,
    open: bool,
    states: Vec<bool>,
}

impl SimulatedRelayDevice {
    /// A closed simulator exposing `channels` relays.
    pub fn new(channels: u32) -> Self {
        Self {
            channels,
            open: false,
            states: Vec::new(),
        }
    }

    /// Simulated relay state, `None` when closed or out of range.
    pub fn state(&self, channel: u32) -> Option<bool> {
        let index = usize::try_from(channel.checked_sub(1)?).ok()?;
        self.states.get(index).copied()
    }
}

impl RelayDevice for SimulatedRelayDevice {
    fn open(&mut self) -> RelayResult<()> {
        self.open = true;
        self.states = (0..self.channels).map(|_| false).collect();
        info!(channels = self.channels, "Simulated relay device opened");
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
        self.states.clear();
        info!("Simulated relay device closed");
    }

    fn set_channel(&mut self, channel: u32, on: bool) -> RelayResult<()> {
        if !self.open {
            return Err(RelayError::communication("Mock device is not open"));
        }
        let slot = channel
            .checked_sub(1)
            .and_then(|index| usize::try_from(index).ok())
            .and_then(|index| self.states.get_mut(index))
            .ok_or_else(|| {
                RelayError::communication(format!("Simulated device has no channel {channel}"))
            })?;
        *slot = on;
        info!(channel, state = if on { "ON" } else { "OFF" }, "[SIM] relay switched");
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn manufacturer(&self) -> String {
        if self.open { "MockManufacturer" } else { UNKNOWN }.to_string()
    }

    fn product(&self) -> String {
        if self.open { "MockRelay" } else { UNKNOWN }.to_string()
    }
}
