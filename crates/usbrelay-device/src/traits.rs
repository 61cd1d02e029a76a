//! Relay driver contract and the test mock.

use crate::RelayResult;

/// Placeholder reported for descriptor strings of a closed device.
pub const UNKNOWN: &str = "Unknown";

/// A USB relay board.
///
/// Implementations are not reentrant: callers serialize every call through a
/// single lock. The orchestrator in `usbrelay-core` is the only component that
/// calls a driver once the process is running.
pub trait RelayDevice: Send {
    /// Open the device. Opening an already open device is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RelayError::DeviceNotFound`] when no matching device can be opened.
    fn open(&mut self) -> RelayResult<()>;

    /// Close the device. Closing a closed device is a no-op.
    fn close(&mut self);

    /// Switch one relay channel.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RelayError::DeviceCommunication`] when the device is closed or the
    /// write fails.
    fn set_channel(&mut self, channel: u32, on: bool) -> RelayResult<()>;

    /// Whether the device is currently open.
    fn is_open(&self) -> bool;

    /// Manufacturer string, [`UNKNOWN`] when closed.
    fn manufacturer(&self) -> String;

    /// Product string, [`UNKNOWN`] when closed.
    fn product(&self) -> String;
}

impl<D: RelayDevice + ?Sized> RelayDevice for Box<D> {
    fn open(&mut self) -> RelayResult<()> {
        (**self).open()
    }

    fn close(&mut self) {
        (**self).close();
    }

    fn set_channel(&mut self, channel: u32, on: bool) -> RelayResult<()> {
        (**self).set_channel(channel, on)
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn manufacturer(&self) -> String {
        (**self).manufacturer()
    }

    fn product(&self) -> String {
        (**self).product()
    }
}

pub mod mock {
    //! Recording relay driver with fault injection, for tests.
    //!
    //! [`MockRelayDevice`] is a cheap handle around shared state: keep one clone
    //! in the test and hand another to the code under test.

    use super::{RelayDevice, UNKNOWN};
    use crate::{RelayError, RelayResult};
    use parking_lot::Mutex;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    /// One write attempt as seen by the mock.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Write {
        pub channel: u32,
        pub on: bool,
        /// Whether the mock reported success for this write.
        pub accepted: bool,
    }

    #[derive(Debug, Default)]
    struct Faults {
        failing_channels: HashSet<u32>,
        fail_all: bool,
        /// Number of further writes allowed before every write fails.
        remaining_successes: Option<usize>,
    }

    #[derive(Debug, Default)]
    struct MockState {
        open: bool,
        writes: Vec<Write>,
        faults: Faults,
        write_delay: Duration,
    }

    /// In-memory driver that records every write and can be told to fail.
    #[derive(Debug, Clone, Default)]
    pub struct MockRelayDevice {
        state: Arc<Mutex<MockState>>,
    }

    impl MockRelayDevice {
        /// A closed mock device.
        pub fn new() -> Self {
            Self::default()
        }

        /// An already opened mock device.
        pub fn opened() -> Self {
            let device = Self::new();
            device.state.lock().open = true;
            device
        }

        /// Make every write to `channel` fail.
        pub fn fail_channel(&self, channel: u32) {
            self.state.lock().faults.failing_channels.insert(channel);
        }

        /// Make every write fail.
        pub fn fail_all(&self) {
            self.state.lock().faults.fail_all = true;
        }

        /// Allow `successes` more writes, then fail every write.
        pub fn fail_after(&self, successes: usize) {
            self.state.lock().faults.remaining_successes = Some(successes);
        }

        /// Remove all injected faults.
        pub fn heal(&self) {
            self.state.lock().faults = Faults::default();
        }

        /// Sleep this long inside every write, to widen race windows in tests.
        pub fn set_write_delay(&self, delay: Duration) {
            self.state.lock().write_delay = delay;
        }

        /// Every write attempt, in order.
        pub fn writes(&self) -> Vec<Write> {
            self.state.lock().writes.clone()
        }

        /// Accepted writes only, as `(channel, on)` pairs.
        pub fn accepted_writes(&self) -> Vec<(u32, bool)> {
            self.state
                .lock()
                .writes
                .iter()
                .filter(|w| w.accepted)
                .map(|w| (w.channel, w.on))
                .collect()
        }

        /// Number of write attempts, accepted or not.
        pub fn write_count(&self) -> usize {
            self.state.lock().writes.len()
        }

        /// Last accepted state of `channel`, as the hardware would hold it.
        pub fn physical_state(&self, channel: u32) -> Option<bool> {
            self.state
                .lock()
                .writes
                .iter()
                .rev()
                .find(|w| w.accepted && w.channel == channel)
                .map(|w| w.on)
        }

        /// Forget recorded writes.
        pub fn clear_writes(&self) {
            self.state.lock().writes.clear();
        }
    }

    impl RelayDevice for MockRelayDevice {
        fn open(&mut self) -> RelayResult<()> {
            self.state.lock().open = true;
            Ok(())
        }

        fn close(&mut self) {
            self.state.lock().open = false;
        }

        fn set_channel(&mut self, channel: u32, on: bool) -> RelayResult<()> {
            let delay = self.state.lock().write_delay;
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }

            let mut state = self.state.lock();
            let blocked = !state.open
                || state.faults.fail_all
                || state.faults.failing_channels.contains(&channel);
            let accepted = if blocked {
                false
            } else {
                match state.faults.remaining_successes.as_mut() {
                    Some(0) => false,
                    Some(remaining) => {
                        *remaining -= 1;
                        true
                    }
                    None => true,
                }
            };
            let open = state.open;
            state.writes.push(Write {
                channel,
                on,
                accepted,
            });

            if !open {
                return Err(RelayError::communication("Mock device is not open"));
            }
            if !accepted {
                return Err(RelayError::communication(format!(
                    "Injected failure on channel {channel}"
                )));
            }
            Ok(())
        }

        fn is_open(&self) -> bool {
            self.state.lock().open
        }

        fn manufacturer(&self) -> String {
            if self.is_open() {
                "MockManufacturer".to_string()
            } else {
                UNKNOWN.to_string()
            }
        }

        fn product(&self) -> String {
            if self.is_open() {
                "MockRelay".to_string()
            } else {
                UNKNOWN.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{MockRelayDevice, Write};
    use super::*;
    use crate::RelayError;

    #[test]
    fn test_mock_records_writes_in_order() -> RelayResult<()> {
        let handle = MockRelayDevice::opened();
        let mut device = handle.clone();

        device.set_channel(1, true)?;
        device.set_channel(1, false)?;

        assert_eq!(handle.accepted_writes(), vec![(1, true), (1, false)]);
        assert_eq!(handle.physical_state(1), Some(false));
        Ok(())
    }

    #[test]
    fn test_mock_closed_rejects_writes() {
        let mut device = MockRelayDevice::new();
        let result = device.set_channel(1, true);
        assert!(matches!(result, Err(RelayError::DeviceCommunication(_))));
        assert_eq!(device.manufacturer(), UNKNOWN);
        assert_eq!(device.product(), UNKNOWN);
    }

    #[test]
    fn test_mock_fail_channel() {
        let handle = MockRelayDevice::opened();
        handle.fail_channel(2);
        let mut device = handle.clone();

        assert!(device.set_channel(1, true).is_ok());
        assert!(device.set_channel(2, true).is_err());
        assert_eq!(
            handle.writes(),
            vec![
                Write {
                    channel: 1,
                    on: true,
                    accepted: true
                },
                Write {
                    channel: 2,
                    on: true,
                    accepted: false
                },
            ]
        );
    }

    #[test]
    fn test_mock_fail_after() {
        let handle = MockRelayDevice::opened();
        handle.fail_after(1);
        let mut device = handle.clone();

        assert!(device.set_channel(1, true).is_ok());
        assert!(device.set_channel(2, true).is_err());
        assert!(device.set_channel(3, true).is_err());

        handle.heal();
        assert!(device.set_channel(3, true).is_ok());
    }

    #[test]
    fn test_boxed_device_forwards() -> RelayResult<()> {
        let handle = MockRelayDevice::new();
        let mut boxed: Box<dyn RelayDevice> = Box::new(handle.clone());

        assert!(!boxed.is_open());
        boxed.open()?;
        assert!(boxed.is_open());
        assert_eq!(boxed.manufacturer(), "MockManufacturer");
        boxed.set_channel(4, true)?;
        boxed.close();
        assert!(!handle.is_open());
        assert_eq!(handle.accepted_writes(), vec![(4, true)]);
        Ok(())
    }
}
