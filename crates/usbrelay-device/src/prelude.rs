//! Prelude for the relay drivers.
//!
//! ```
//! use usbrelay_device::prelude::*;
//! ```

pub use crate::error::{RelayError, RelayResult};
pub use crate::hid::HidRelayDevice;
pub use crate::simulator::SimulatedRelayDevice;
pub use crate::traits::RelayDevice;
