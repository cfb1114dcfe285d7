use crate::protocol::{Readout, Readouts};

/// Message from a telemetry worker to the control layer.
///
/// For one device, `ComponentsDiscovered` always precedes that device's first
/// `ComponentsUpdated`.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryEvent {
    /// Initial discovery finished; carries every component found.
    ComponentsDiscovered { device: usize, readouts: Readouts },
    /// A component appeared after initial discovery.
    ComponentDiscovered { device: usize, readout: Readout },
    /// Fresh readouts from one poll cycle.
    ComponentsUpdated { device: usize, readouts: Readouts },
    /// The worker observed cancellation and exited.
    Stopped { device: usize },
}

impl TelemetryEvent {
    /// Device slot the event belongs to.
    pub fn device(&self) -> usize {
        match self {
            TelemetryEvent::ComponentsDiscovered { device, .. }
            | TelemetryEvent::ComponentDiscovered { device, .. }
            | TelemetryEvent::ComponentsUpdated { device, .. }
            | TelemetryEvent::Stopped { device } => *device,
        }
    }
}
