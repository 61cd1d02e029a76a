//! # usbrelay-core
//!
//! Stateful orchestration of a USB relay board.
//!
//! [`RelayService`] serializes every device write behind one lock, keeps an
//! authoritative mirror of channel states, and runs the timed behaviour on
//! top of that:
//!
//! - bulk [`RelayService::set_all`] with rollback on partial failure
//! - the fail-safe sweep [`RelayService::all_off`], which never fails
//! - optional per-channel pulse timers that switch a channel back OFF
//! - a cancellable background burn test
//!
//! Every state change is reported to an [`AuditSink`].
//!
//! ## Architecture
//!
//! - [`service`] - the orchestrator and its configuration
//! - [`burn_test`] - burn-test control and the cycling task
//! - [`audit`] - audit entries and sinks
//! - [`types`] - serializable status types
//! - [`error`] - orchestrator error types
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use usbrelay_core::prelude::*;
//! use usbrelay_device::mock::MockRelayDevice;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let service = RelayService::new(
//!     Box::new(MockRelayDevice::opened()),
//!     RelayServiceConfig { channels: 2, pulse_ms: 0 },
//!     Arc::new(MemoryAuditSink::new()),
//!     tokio::runtime::Handle::current(),
//! )?;
//!
//! service.set(1, ChannelState::On)?;
//! assert_eq!(service.get(1)?.state, ChannelState::On);
//! # Ok(())
//! # }
//! ```

#![deny(
    unsafe_op_in_unsafe_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::panic,
    missing_docs,
    missing_debug_implementations
)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod audit;
pub mod error;
mod pulse;
pub mod service;
pub mod types;

pub mod prelude;

pub use audit::{AuditAction, AuditEntry, AuditSink, AuditTarget, MemoryAuditSink, TracingAuditSink};
pub use burn_test::BurnTestPlan;
pub use error::{CoreError, CoreResult};
pub use service::{RelayService, RelayServiceConfig};
pub use types::{
    BurnTestMode, BurnTestStatus, ChannelState, DeviceInfo, RelayStatus, WriteFailureStats,
};
pub use usbrelay_device::{RelayError, RelayResult};
