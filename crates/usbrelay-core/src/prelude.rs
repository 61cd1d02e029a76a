//! Prelude for usbrelay-core.
//!
//! # Example
//!
//! ```rust
//! use usbrelay_core::prelude::*;
//!
//! let config = RelayServiceConfig::default();
//! assert!(config.validate().is_ok());
//! assert_eq!(ChannelState::from(true), ChannelState::On);
//! ```

pub use crate::audit::{AuditSink, MemoryAuditSink, TracingAuditSink};
pub use crate::error::{CoreError, CoreResult};
pub use crate::service::{RelayService, RelayServiceConfig};
pub use crate::types::{BurnTestMode, BurnTestStatus, ChannelState, DeviceInfo, RelayStatus};
pub use usbrelay_device::{RelayError, RelayResult};
