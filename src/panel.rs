//! Control layer.
//!
//! [`ControlPanel`] owns the telemetry updater and is the only consumer of
//! its events. It keeps the last readouts each device reported, tracks which
//! device is active, and pushes profiles down to devices.

use std::collections::HashMap;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

use crate::config::PollSettings;
use crate::device::{DeviceHandle, DeviceSet};
use crate::error::{PanelError, Result};
use crate::protocol::Readouts;
use crate::storage::{Profile, ProfileMode};
use crate::telemetry::{TelemetryEvent, TelemetryUpdater};

pub struct ControlPanel {
    updater: TelemetryUpdater,
    events: UnboundedReceiver<TelemetryEvent>,
    active: Option<usize>,
    readouts: HashMap<usize, Readouts>,
}

impl ControlPanel {
    pub fn new(devices: DeviceSet, settings: PollSettings) -> Self {
        let (updater, events) = TelemetryUpdater::new(devices, settings);
        Self {
            updater,
            events,
            active: None,
            readouts: HashMap::new(),
        }
    }

    pub fn devices(&self) -> &DeviceSet {
        self.updater.devices()
    }

    pub fn updater(&self) -> &TelemetryUpdater {
        &self.updater
    }

    pub fn active_device(&self) -> Option<usize> {
        self.active
    }

    /// Make `index` the polled device.
    ///
    /// Stops the previous device's worker before starting the new one.
    /// Switching to the already active device does nothing.
    pub fn switch_device(&mut self, index: usize) -> Result<()> {
        self.devices().get(index)?;
        if self.active == Some(index) && self.updater.is_running(index) {
            return Ok(());
        }

        if let Some(previous) = self.active.take() {
            self.updater.stop(previous);
        }
        self.updater.start(index)?;
        self.active = Some(index);
        info!(device = index, "Active device switched");
        Ok(())
    }

    /// Last readouts reported for `device`.
    ///
    /// Kept after the device stops or a poll fails, so consumers always have
    /// the last known good values.
    pub fn readouts(&self, device: usize) -> Option<&Readouts> {
        self.readouts.get(&device)
    }

    /// Fold one event into the panel state.
    pub fn handle_event(&mut self, event: &TelemetryEvent) {
        match event {
            TelemetryEvent::ComponentsDiscovered { device, readouts }
            | TelemetryEvent::ComponentsUpdated { device, readouts } => {
                self.readouts.insert(*device, readouts.clone());
            }
            TelemetryEvent::ComponentDiscovered { device, readout } => {
                self.readouts
                    .entry(*device)
                    .or_default()
                    .insert(readout.component_name.clone(), readout.clone());
            }
            TelemetryEvent::Stopped { .. } => {}
        }
    }

    /// Wait for the next event and apply it. `None` once every sender is gone.
    pub async fn next_event(&mut self) -> Option<TelemetryEvent> {
        let event = self.events.recv().await?;
        self.handle_event(&event);
        Some(event)
    }

    /// Apply `profile` to `channel` of `device`.
    ///
    /// Blocks for the device round trip.
    pub fn apply_profile(&self, device: usize, profile: &Profile, channel: &str) -> Result<()> {
        let handle = self.devices().get(device)?;
        apply_profile(handle.as_ref(), profile, channel)
    }

    /// Stop every worker, wait for them to exit, then disconnect the devices.
    pub async fn shutdown(self) {
        let devices = self.devices().clone();
        self.updater.shutdown().await;
        if let Err(e) = tokio::task::spawn_blocking(move || devices.close()).await {
            warn!(error = %e, "Device disconnect panicked");
        }
    }
}

/// Send a profile to a device channel.
///
/// Fixed-duty profiles go through `set_fixed_duty`, curves through
/// `set_speed_profile`. An unsupported mode comes back as
/// `NotSupportedByDevice`; the profile itself is left as is.
pub fn apply_profile(device: &dyn DeviceHandle, profile: &Profile, channel: &str) -> Result<()> {
    let result = match &profile.mode {
        ProfileMode::StaticDuty(duty) => device.set_fixed_duty(channel, *duty),
        ProfileMode::Curve(steps) => {
            if steps.is_empty() {
                return Err(PanelError::InvalidProfile(format!(
                    "'{}' has no steps",
                    profile.name
                )));
            }
            device.set_speed_profile(channel, &steps.as_pairs())
        }
    };

    match &result {
        Ok(()) => info!(profile = %profile.name, channel, device = %device.description(), "Profile applied"),
        Err(e @ PanelError::NotSupportedByDevice { .. }) => {
            warn!(profile = %profile.name, channel, error = %e, "Profile not applied")
        }
        Err(_) => {}
    }
    result
}
