//! Behaviour of the relay orchestrator's synchronous operations.

use std::sync::Arc;
use tokio::runtime::Handle;
use usbrelay_core::prelude::*;
use usbrelay_core::{AuditAction, AuditTarget};
use usbrelay_device::RelayDevice;
use usbrelay_device::mock::MockRelayDevice;

type TestResult = Result<(), Box<dyn std::error::Error>>;

struct Fixture {
    service: RelayService,
    device: MockRelayDevice,
    audit: Arc<MemoryAuditSink>,
}

fn fixture(channels: u32) -> Result<Fixture, CoreError> {
    let device = MockRelayDevice::opened();
    let audit = Arc::new(MemoryAuditSink::new());
    let service = RelayService::new(
        Box::new(device.clone()),
        RelayServiceConfig {
            channels,
            pulse_ms: 0,
        },
        audit.clone(),
        Handle::current(),
    )?;
    Ok(Fixture {
        service,
        device,
        audit,
    })
}

#[tokio::test]
async fn test_out_of_range_channel_is_rejected_without_io() -> TestResult {
    let f = fixture(2)?;

    for channel in [0, 3, 99] {
        let err = f.service.set(channel, ChannelState::On);
        assert_eq!(err, Err(RelayError::invalid_channel(channel, 2)));
        assert!(f.service.get(channel).is_err());
    }

    assert_eq!(f.device.write_count(), 0);
    assert!(f.audit.entries().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_set_on_then_off_writes_in_order() -> TestResult {
    let f = fixture(2)?;

    let status = f.service.set(1, ChannelState::On)?;
    assert_eq!(status.state, ChannelState::On);
    f.service.set(1, ChannelState::Off)?;

    assert_eq!(f.service.get(1)?.state, ChannelState::Off);
    assert_eq!(f.device.accepted_writes(), vec![(1, true), (1, false)]);
    assert_eq!(
        f.audit.actions(),
        vec![AuditAction::SetChannel, AuditAction::SetChannel]
    );
    Ok(())
}

#[tokio::test]
async fn test_get_all_is_ascending_and_reads_mirror_only() -> TestResult {
    let f = fixture(4)?;
    f.service.set(3, ChannelState::On)?;
    let writes_before = f.device.write_count();

    let all = f.service.get_all();
    let channels: Vec<u32> = all.iter().map(|s| s.channel).collect();
    assert_eq!(channels, vec![1, 2, 3, 4]);
    assert_eq!(
        all.iter().map(|s| s.state).collect::<Vec<_>>(),
        vec![
            ChannelState::Off,
            ChannelState::Off,
            ChannelState::On,
            ChannelState::Off
        ]
    );
    assert_eq!(f.device.write_count(), writes_before);
    Ok(())
}

#[tokio::test]
async fn test_set_all_on_switches_every_channel() -> TestResult {
    let f = fixture(3)?;

    let statuses = f.service.set_all(ChannelState::On)?;
    assert_eq!(statuses.len(), 3);
    assert!(statuses.iter().all(|s| s.state == ChannelState::On));
    assert_eq!(
        f.device.accepted_writes(),
        vec![(1, true), (2, true), (3, true)]
    );

    let entries = f.audit.entries();
    assert_eq!(entries.len(), 1);
    let entry = entries.first().ok_or("missing audit entry")?;
    assert_eq!(entry.action, AuditAction::SetAllChannels);
    assert_eq!(entry.target, AuditTarget::All);
    assert_eq!(entry.state, "on");
    Ok(())
}

#[tokio::test]
async fn test_set_all_failure_rolls_back_completed_channels() -> TestResult {
    let f = fixture(3)?;
    f.service.set(1, ChannelState::On)?;
    f.device.clear_writes();
    f.device.fail_channel(3);

    let result = f.service.set_all(ChannelState::On);
    assert!(matches!(result, Err(RelayError::DeviceCommunication(_))));

    // 1 and 2 switched, 3 failed, then 1 and 2 restored ascending.
    assert_eq!(
        f.device.accepted_writes(),
        vec![(1, true), (2, true), (1, true), (2, false)]
    );
    let states: Vec<ChannelState> = f.service.get_all().iter().map(|s| s.state).collect();
    assert_eq!(
        states,
        vec![ChannelState::On, ChannelState::Off, ChannelState::Off]
    );
    assert!(!f.audit.actions().contains(&AuditAction::SetAllChannels));
    assert_eq!(f.service.write_failures().rollback_failures, 0);
    Ok(())
}

#[tokio::test]
async fn test_failed_rollback_is_counted_and_mirror_restored() -> TestResult {
    let f = fixture(3)?;
    f.device.fail_after(1);

    let result = f.service.set_all(ChannelState::On);
    assert!(result.is_err());

    assert!(
        f.service
            .get_all()
            .iter()
            .all(|s| s.state == ChannelState::Off)
    );
    assert_eq!(f.service.write_failures().rollback_failures, 1);
    Ok(())
}

#[tokio::test]
async fn test_all_off_survives_total_device_failure() -> TestResult {
    let f = fixture(3)?;
    f.service.set_all(ChannelState::On)?;
    f.device.fail_all();

    f.service.all_off();

    assert!(
        f.service
            .get_all()
            .iter()
            .all(|s| s.state == ChannelState::Off)
    );
    assert_eq!(f.service.write_failures().fail_safe_failures, 3);
    assert_eq!(f.audit.actions().last(), Some(&AuditAction::FailSafe));
    Ok(())
}

#[tokio::test]
async fn test_all_off_writes_ascending() -> TestResult {
    let f = fixture(3)?;
    f.service.all_off();
    assert_eq!(
        f.device.accepted_writes(),
        vec![(1, false), (2, false), (3, false)]
    );
    Ok(())
}

#[tokio::test]
async fn test_device_info_tracks_connection() -> TestResult {
    let f = fixture(2)?;
    assert!(f.service.is_device_connected());

    let mut driver = f.device.clone();
    driver.close();

    let info = f.service.device_info();
    assert!(!info.connected);
    assert_eq!(info.manufacturer, "Unknown");
    assert_eq!(info.product, "Unknown");
    assert_eq!(info.channels, 2);
    assert!(!f.service.is_device_connected());
    Ok(())
}

#[tokio::test]
async fn test_shutdown_switches_off_and_closes() -> TestResult {
    let f = fixture(2)?;
    f.service.set(2, ChannelState::On)?;

    f.service.shutdown().await;

    assert!(!f.device.is_open());
    assert_eq!(f.device.physical_state(2), Some(false));
    assert_eq!(f.service.get(2)?.state, ChannelState::Off);
    Ok(())
}

#[tokio::test]
async fn test_shutdown_when_disconnected_skips_writes() -> TestResult {
    let device = MockRelayDevice::new();
    let service = RelayService::new(
        Box::new(device.clone()),
        RelayServiceConfig::default(),
        Arc::new(MemoryAuditSink::new()),
        Handle::current(),
    )?;

    service.shutdown().await;
    assert_eq!(device.write_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let result = RelayService::new(
        Box::new(MockRelayDevice::opened()),
        RelayServiceConfig {
            channels: 0,
            pulse_ms: 0,
        },
        Arc::new(MemoryAuditSink::new()),
        Handle::current(),
    );
    assert!(matches!(result, Err(CoreError::InvalidConfiguration(_))));
}
