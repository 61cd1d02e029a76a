//! Real hardware transport over hidapi.

use crate::report::encode_command;
use crate::traits::{RelayDevice, UNKNOWN};
use crate::{RelayError, RelayResult};
use hidapi::{HidApi, HidDevice};
use tracing::{debug, info, warn};

/// USB HID relay board opened by vendor and product ID.
///
/// Only the first matching board is used.
pub struct HidRelayDevice {
    vendor_id: u16,
    product_id: u16,
    device: Option<HidDevice>,
}

impl HidRelayDevice {
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
            device: None,
        }
    }

    pub fn vendor_id(&self) -> u16 {
        self.vendor_id
    }

    pub fn product_id(&self) -> u16 {
        self.product_id
    }

    fn descriptor(&self, read: impl Fn(&HidDevice) -> hidapi::HidResult<Option<String>>) -> String {
        self.device
            .as_ref()
            .and_then(|device| read(device).ok().flatten())
            .unwrap_or_else(|| UNKNOWN.to_string())
    }
}

impl std::fmt::Debug for HidRelayDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HidRelayDevice")
            .field("vendor_id", &format_args!("0x{:04X}", self.vendor_id))
            .field("product_id", &format_args!("0x{:04X}", self.product_id))
            .field("open", &self.device.is_some())
            .finish()
    }
}

impl RelayDevice for HidRelayDevice {
    fn open(&mut self) -> RelayResult<()> {
        if self.device.is_some() {
            return Ok(());
        }

        let api = HidApi::new().map_err(|e| {
            warn!(error = %e, "Failed to initialise HID API");
            RelayError::not_found(self.vendor_id, self.product_id)
        })?;
        let device = api.open(self.vendor_id, self.product_id).map_err(|e| {
            debug!(
                error = %e,
                vendor_id = format_args!("0x{:04X}", self.vendor_id),
                product_id = format_args!("0x{:04X}", self.product_id),
                "Relay device open failed"
            );
            RelayError::not_found(self.vendor_id, self.product_id)
        })?;

        self.device = Some(device);
        info!(
            vendor_id = format_args!("0x{:04X}", self.vendor_id),
            product_id = format_args!("0x{:04X}", self.product_id),
            "Relay device opened"
        );
        Ok(())
    }

    fn close(&mut self) {
        if self.device.take().is_some() {
            info!("Relay device closed");
        }
    }

    fn set_channel(&mut self, channel: u32, on: bool) -> RelayResult<()> {
        let device = self
            .device
            .as_ref()
            .ok_or_else(|| RelayError::communication("Device is not open"))?;
        let report = encode_command(channel, on)?;
        device.send_feature_report(&report).map_err(|e| {
            RelayError::communication(format!("Failed to set channel {channel}: {e}"))
        })?;
        debug!(channel, on, "Feature report sent");
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.device.is_some()
    }

    fn manufacturer(&self) -> String {
        self.descriptor(HidDevice::get_manufacturer_string)
    }

    fn product(&self) -> String {
        self.descriptor(HidDevice::get_product_string)
    }
}
