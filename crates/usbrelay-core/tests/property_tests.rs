//! Property-based tests for channel validation and mirror consistency.

use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use usbrelay_core::prelude::*;
use usbrelay_device::mock::MockRelayDevice;

fn build(
    runtime: &tokio::runtime::Runtime,
    channels: u32,
) -> Result<(RelayService, MockRelayDevice), TestCaseError> {
    let device = MockRelayDevice::opened();
    let service = RelayService::new(
        Box::new(device.clone()),
        RelayServiceConfig {
            channels,
            pulse_ms: 0,
        },
        Arc::new(MemoryAuditSink::new()),
        runtime.handle().clone(),
    )
    .map_err(|e| TestCaseError::fail(e.to_string()))?;
    Ok((service, device))
}

fn runtime() -> Result<tokio::runtime::Runtime, TestCaseError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| TestCaseError::fail(e.to_string()))
}

proptest! {
    #[test]
    fn test_out_of_range_channels_never_touch_device(
        channels in 1u32..=16,
        offset in 1u32..1000,
        on in any::<bool>(),
    ) {
        let runtime = runtime()?;
        let (service, device) = build(&runtime, channels)?;
        let channel = channels + offset;

        let result = service.set(channel, ChannelState::from(on));
        prop_assert_eq!(result, Err(RelayError::invalid_channel(channel, channels)));
        prop_assert!(service.get(channel).is_err());
        prop_assert!(service.set(0, ChannelState::from(on)).is_err());
        prop_assert_eq!(device.write_count(), 0);
    }

    #[test]
    fn test_mirror_tracks_last_successful_write(
        channels in 1u32..=8,
        commands in prop::collection::vec((1u32..=8, any::<bool>()), 0..64),
    ) {
        let runtime = runtime()?;
        let (service, device) = build(&runtime, channels)?;
        let mut model: HashMap<u32, bool> = HashMap::new();

        for (channel, on) in commands {
            let result = service.set(channel, ChannelState::from(on));
            if channel <= channels {
                prop_assert!(result.is_ok());
                model.insert(channel, on);
            } else {
                prop_assert!(result.is_err());
            }
        }

        for status in service.get_all() {
            let expected = model.get(&status.channel).copied().unwrap_or(false);
            prop_assert_eq!(status.state.is_on(), expected);
            prop_assert_eq!(device.physical_state(status.channel).unwrap_or(false), expected);
        }
    }

    #[test]
    fn test_set_all_failure_restores_previous_mirror(
        channels in 2u32..=8,
        initial in prop::collection::vec(any::<bool>(), 8),
        failing in 1u32..=8,
    ) {
        let runtime = runtime()?;
        let (service, device) = build(&runtime, channels)?;
        let failing = failing.min(channels);

        for (channel, on) in (1..=channels).zip(initial.iter().copied()) {
            service
                .set(channel, ChannelState::from(on))
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
        }
        let before = service.get_all();

        device.fail_channel(failing);
        prop_assert!(service.set_all(ChannelState::On).is_err());
        prop_assert_eq!(service.get_all(), before);
    }
}
