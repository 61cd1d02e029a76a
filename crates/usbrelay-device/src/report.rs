//! Feature report encoding for DCT Tech style relay boards.

use crate::{RelayError, RelayResult};

/// Command byte that closes (energizes) a relay.
pub const COMMAND_ON: u8 = 0xFF;

/// Command byte that opens (releases) a relay.
pub const COMMAND_OFF: u8 = 0xFD;

/// Feature report length including the leading report ID.
pub const REPORT_LEN: usize = 9;

/// Default USB vendor ID of the relay boards.
pub const DEFAULT_VENDOR_ID: u16 = 0x16C0;

/// Default USB product ID of the relay boards.
pub const DEFAULT_PRODUCT_ID: u16 = 0x05DF;

/// Build the feature report that switches `channel` on or off.
///
/// Layout: `[report_id = 0, command, channel, 0, 0, 0, 0, 0, 0]`.
///
/// # Errors
///
/// Returns [`RelayError::DeviceCommunication`] if the channel does not fit the
/// single channel byte of the report.
pub fn encode_command(channel: u32, on: bool) -> RelayResult<[u8; REPORT_LEN]> {
    let channel = u8::try_from(channel).map_err(|e| {
        RelayError::communication(format!("Channel {channel} cannot be encoded: {e}"))
    })?;
    let command = if on { COMMAND_ON } else { COMMAND_OFF };
    Ok([0x00, command, channel, 0, 0, 0, 0, 0, 0])
}

/// Decode a report produced by [`encode_command`] back into `(channel, on)`.
///
/// Returns `None` for reports that are not relay commands.
pub fn decode_command(report: &[u8]) -> Option<(u32, bool)> {
    match report {
        [0x00, COMMAND_ON, channel, rest @ ..] if rest.len() == REPORT_LEN - 3 => {
            Some((u32::from(*channel), true))
        }
        [0x00, COMMAND_OFF, channel, rest @ ..] if rest.len() == REPORT_LEN - 3 => {
            Some((u32::from(*channel), false))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_on() -> RelayResult<()> {
        let report = encode_command(1, true)?;
        assert_eq!(report, [0x00, 0xFF, 0x01, 0, 0, 0, 0, 0, 0]);
        Ok(())
    }

    #[test]
    fn test_encode_off() -> RelayResult<()> {
        let report = encode_command(2, false)?;
        assert_eq!(report, [0x00, 0xFD, 0x02, 0, 0, 0, 0, 0, 0]);
        Ok(())
    }

    #[test]
    fn test_encode_rejects_wide_channel() {
        let result = encode_command(256, true);
        assert!(matches!(result, Err(RelayError::DeviceCommunication(_))));
    }

    #[test]
    fn test_decode_rejects_foreign_reports() {
        assert_eq!(decode_command(&[0x00, 0x01, 0x01, 0, 0, 0, 0, 0, 0]), None);
        assert_eq!(decode_command(&[0x00, COMMAND_ON, 0x01]), None);
        assert_eq!(decode_command(&[]), None);
    }

    #[test]
    fn test_decode_reads_channel_and_state() -> RelayResult<()> {
        assert_eq!(decode_command(&encode_command(8, false)?), Some((8, false)));
        Ok(())
    }
}
