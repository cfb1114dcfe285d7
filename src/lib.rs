//! Liquid Panel Library
//!
//! Telemetry and fan-curve core for a liquid-cooling control panel.
//!
//! # Features
//!
//! - Parse device status reports into per-component readouts
//! - Poll devices in the background and discover hot-plugged components
//! - Edit fan curves as ordered, temperature-unique step tables
//! - Persist duty profiles per device model
//!
//! # Example
//!
//! ```
//! use liquid_panel::cooling::{OnConflict, StepTable};
//! use liquid_panel::device::{DeviceHandle, SimulatedFanHub};
//! use liquid_panel::storage::{MemoryProfileStore, Profile, ProfileStore};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let hub = SimulatedFanHub::new();
//!
//!     // Build a curve
//!     let mut steps = StepTable::new();
//!     steps.add(30, 40)?;
//!     steps.add(50, 80)?;
//!     assert!(steps.update(30, 99, 1, OnConflict::Reject).is_err());
//!
//!     // Store it for this device model
//!     let mut store = MemoryProfileStore::new();
//!     store.save(&Profile::curve("quiet", &hub.info(), steps))?;
//!     assert_eq!(store.list(&hub.info())?, vec!["quiet"]);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod cooling;
pub mod device;
pub mod error;
pub mod logger;
pub mod panel;
pub mod protocol;
pub mod storage;
pub mod telemetry;
pub mod utils;

// Re-exports for convenience
pub use device::{DeviceHandle, DeviceInfo, DeviceSet};
pub use error::{PanelError, Result};
pub use panel::ControlPanel;
pub use protocol::{Readout, StatusLine, StatusValue, parse_status};
pub use telemetry::{TelemetryEvent, TelemetryUpdater};
