//! Background telemetry.
//!
//! - `events`: messages from workers to the control layer
//! - `registry`: components already seen per device
//! - `updater`: worker lifecycle and the poll loop

mod events;
mod registry;
mod updater;

pub use events::TelemetryEvent;
pub use registry::ComponentRegistry;
pub use updater::TelemetryUpdater;
