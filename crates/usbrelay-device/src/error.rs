//! Error types shared by the relay drivers and the orchestrator.
//!
//! The HTTP layer maps each variant to its own status code.

use thiserror::Error;

/// Errors raised by relay drivers and relay operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// Channel number outside `[1, max_channels]`. No I/O was attempted.
    #[error("Invalid channel {channel}. Must be between 1 and {max_channels}.")]
    InvalidChannel {
        /// The rejected channel number, as supplied by the caller.
        channel: i64,
        /// Configured channel count.
        max_channels: u32,
    },

    /// Writing to the device failed or the device is not open.
    #[error("{0}")]
    DeviceCommunication(String),

    /// The device could not be found or opened.
    #[error("Device not found: vendor=0x{vendor_id:04X}, product=0x{product_id:04X}")]
    DeviceNotFound {
        /// USB vendor ID that was searched for.
        vendor_id: u16,
        /// USB product ID that was searched for.
        product_id: u16,
    },
}

impl RelayError {
    /// Create an invalid channel error.
    #[must_use]
    pub fn invalid_channel(channel: impl Into<i64>, max_channels: u32) -> Self {
        Self::InvalidChannel {
            channel: channel.into(),
            max_channels,
        }
    }

    /// Create a device communication error.
    #[must_use]
    pub fn communication(message: impl Into<String>) -> Self {
        Self::DeviceCommunication(message.into())
    }

    /// Create a device-not-found error.
    #[must_use]
    pub fn not_found(vendor_id: u16, product_id: u16) -> Self {
        Self::DeviceNotFound {
            vendor_id,
            product_id,
        }
    }

    /// Whether the error was caused by the caller rather than the hardware.
    #[must_use]
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::InvalidChannel { .. })
    }
}

/// A specialized `Result` type for relay operations.
pub type RelayResult<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_channel_display() {
        let err = RelayError::invalid_channel(3, 2);
        assert_eq!(err.to_string(), "Invalid channel 3. Must be between 1 and 2.");
        assert!(err.is_caller_error());
    }

    #[test]
    fn test_not_found_display_uses_upper_hex() {
        let err = RelayError::not_found(0x16C0, 0x05DF);
        assert_eq!(
            err.to_string(),
            "Device not found: vendor=0x16C0, product=0x05DF"
        );
        assert!(!err.is_caller_error());
    }

    #[test]
    fn test_communication_keeps_message() {
        let err = RelayError::communication("Device is not open");
        assert_eq!(err.to_string(), "Device is not open");
        assert!(matches!(err, RelayError::DeviceCommunication(_)));
    }

    #[test]
    fn test_error_is_std_error() {
        let err = RelayError::communication("boom");
        let _: &dyn std::error::Error = &err;
    }
}
