//! Device abstraction layer.
//!
//! The hardware driver is an external collaborator. This module defines the
//! [`DeviceHandle`] seam the rest of the crate talks to, the identity record
//! stored with profiles, and the set of devices indexed by slot.

pub mod simulated;
#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{PanelError, Result};
use crate::protocol::StatusLine;

pub use simulated::{SimulatedCooler, SimulatedFanHub};

// =============================================================================
// Device Identity
// =============================================================================

/// Identity of a device model; profiles are namespaced by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub name: String,
    pub vendor_id: u16,
    pub product_id: u16,
}

impl DeviceInfo {
    pub fn new(name: &str, vendor_id: u16, product_id: u16) -> Self {
        Self {
            name: name.to_string(),
            vendor_id,
            product_id,
        }
    }

    /// Namespace key for this device model, e.g. `1e71_2006`.
    pub fn namespace(&self) -> String {
        format!("{:04x}_{:04x}", self.vendor_id, self.product_id)
    }
}

impl std::fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{:04x}:{:04x}]",
            self.name, self.vendor_id, self.product_id
        )
    }
}

// =============================================================================
// Device Handle
// =============================================================================

/// One connected device as exposed by the driver.
///
/// Calls may block for the duration of a device round trip. Implementations
/// are shared between the control layer and a telemetry worker, hence the
/// `&self` receivers.
pub trait DeviceHandle: Send + Sync {
    fn info(&self) -> DeviceInfo;

    /// Human readable description shown in device lists.
    fn description(&self) -> String {
        self.info().name
    }

    /// Serial number, if the device reports one.
    fn serial_number(&self) -> Option<String> {
        None
    }

    /// Open the connection to the device.
    fn connect(&self) -> Result<()> {
        Ok(())
    }

    /// Bring the device into a known state after connecting.
    fn initialize(&self) -> Result<()> {
        Ok(())
    }

    /// Release the connection. Safe to call when not connected.
    fn disconnect(&self) -> Result<()> {
        Ok(())
    }

    /// Read the current status report.
    fn get_status(&self) -> Result<Vec<StatusLine>>;

    /// Set a fixed duty (0-100) on a channel, e.g. `"Fan 1"`.
    fn set_fixed_duty(&self, channel: &str, percent: u8) -> Result<()>;

    /// Program a temperature/duty curve on a channel.
    ///
    /// Devices without curve support keep the default, which reports
    /// `NotSupportedByDevice`.
    fn set_speed_profile(&self, channel: &str, profile: &[(i8, i8)]) -> Result<()> {
        let _ = (channel, profile);
        Err(PanelError::NotSupportedByDevice {
            device: self.description(),
            operation: "speed curves".into(),
        })
    }
}

// =============================================================================
// Device Set
// =============================================================================

/// Connected devices, indexed by slot in discovery order.
#[derive(Clone, Default)]
pub struct DeviceSet {
    devices: Vec<Arc<dyn DeviceHandle>>,
}

impl DeviceSet {
    pub fn new(devices: Vec<Arc<dyn DeviceHandle>>) -> Self {
        Self { devices }
    }

    /// Connect and initialize every device.
    ///
    /// Each device is disconnected first so a connection left open by an
    /// earlier session does not block `connect`.
    pub fn open(devices: Vec<Arc<dyn DeviceHandle>>) -> Result<Self> {
        let set = Self::new(devices);
        for (index, device) in set.devices.iter().enumerate() {
            device.disconnect()?;
            device.connect()?;
            device.initialize()?;
            info!(device = index, name = %device.description(), "Device initialized");
        }
        Ok(set)
    }

    /// The built-in simulated devices, opened: a fan hub and an AIO cooler.
    pub fn simulated() -> Result<Self> {
        Self::open(vec![
            Arc::new(SimulatedFanHub::new()),
            Arc::new(SimulatedCooler::new()),
        ])
    }

    /// Disconnect every device. Failures are logged and do not stop the
    /// remaining devices from being closed.
    pub fn close(&self) {
        for (index, device) in self.devices.iter().enumerate() {
            if let Err(e) = device.disconnect() {
                warn!(device = index, error = %e, "Failed to disconnect device");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Device at `index`.
    ///
    /// # Errors
    /// `NoSuchDevice` if the slot is empty.
    pub fn get(&self, index: usize) -> Result<Arc<dyn DeviceHandle>> {
        self.devices
            .get(index)
            .cloned()
            .ok_or(PanelError::NoSuchDevice(index))
    }

    /// Slot of the first device whose description matches, case-insensitive.
    pub fn find(&self, description: &str) -> Option<usize> {
        let search = description.to_lowercase();
        self.devices
            .iter()
            .position(|d| d.description().to_lowercase() == search)
    }

    /// Slot of the device with this serial number.
    pub fn find_by_serial(&self, serial: &str) -> Option<usize> {
        self.devices
            .iter()
            .position(|d| d.serial_number().as_deref() == Some(serial))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn DeviceHandle>> {
        self.devices.iter()
    }
}

impl std::fmt::Debug for DeviceSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.devices.iter().map(|d| d.description()))
            .finish()
    }
}
