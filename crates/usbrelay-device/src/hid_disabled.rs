//! Stand-in for the hidapi transport when the `hid` feature is off.
//!
//! Keeps the same constructor so callers need no cfg of their own. Opening
//! always fails, which leaves the service in disconnected mode.

use crate::traits::{RelayDevice, UNKNOWN};
use crate::{RelayError, RelayResult};
use tracing::warn;

/// USB HID relay board. This build has no HID backend.
#[derive(Debug)]
pub struct HidRelayDevice {
    vendor_id: u16,
    product_id: u16,
}

impl HidRelayDevice {
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
        }
    }

    pub fn vendor_id(&self) -> u16 {
        self.vendor_id
    }

    pub fn product_id(&self) -> u16 {
        self.product_id
    }
}

impl RelayDevice for HidRelayDevice {
    fn open(&mut self) -> RelayResult<()> {
        warn!("Built without the `hid` feature, hardware relays are unavailable");
        Err(RelayError::not_found(self.vendor_id, self.product_id))
    }

    fn close(&mut self) {}

    fn set_channel(&mut self, _channel: u32, _on: bool) -> RelayResult<()> {
        Err(RelayError::communication("Device is not open"))
    }

    fn is_open(&self) -> bool {
        false
    }

    fn manufacturer(&self) -> String {
        UNKNOWN.to_string()
    }

    fn product(&self) -> String {
        UNKNOWN.to_string()
    }
}
