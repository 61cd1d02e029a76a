//! Drivers for DCT Tech style USB HID relay modules.
//!
//! The crate defines the [`RelayDevice`] contract used by the relay
//! orchestrator and ships three implementations:
//!
//! - [`HidRelayDevice`]: real hardware over hidapi (feature `hid`, without it
//!   every open fails with [`RelayError::DeviceNotFound`])
//! - [`SimulatedRelayDevice`]: in-memory board that logs every write
//! - [`mock::MockRelayDevice`]: recording driver with fault injection for tests
//!
//! Drivers are not thread safe on their own. Every call must be serialized by
//! the owner.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod error;
#[cfg(feature = "hid")]
pub mod hid;
#[cfg(not(feature = "hid"))]
#[path = "hid_disabled.rs"]
pub mod hid;
pub mod prelude;
pub mod report;
pub mod simulator;
pub mod traits;

pub use error::{RelayError, RelayResult};
pub use hid::HidRelayDevice;
pub use report::{DEFAULT_PRODUCT_ID, DEFAULT_VENDOR_ID};
pub use simulator::SimulatedRelayDevice;
pub use traits::{RelayDevice, UNKNOWN, mock};
