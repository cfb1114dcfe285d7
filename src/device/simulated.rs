//! Simulated devices.
//!
//! Stand-ins for real hardware used by the CLI demo and tests. The fan hub
//! reports the same layout as a Smart Device style controller: six fan
//! slots, some of them unpopulated, plus firmware and noise lines.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::cooling::{Step, StepTable};
use crate::device::{DeviceHandle, DeviceInfo};
use crate::error::{PanelError, Result};
use crate::protocol::{StatusLine, StatusValue};

/// Fan slots on the simulated hub.
const HUB_SLOTS: usize = 6;

/// Duty a channel runs at until told otherwise.
const DEFAULT_DUTY: u8 = 40;

/// Pseudo-random RPM jitter derived from the poll counter.
fn jitter(tick: u64, slot: usize) -> i64 {
    ((tick.wrapping_mul(37) + slot as u64 * 11) % 50) as i64
}

// =============================================================================
// Fan Hub
// =============================================================================

/// Fan hub with DC-controlled fans. Accepts fixed duties, not curves.
pub struct SimulatedFanHub {
    info: DeviceInfo,
    populated: usize,
    /// Poll count after which one more fan shows up.
    hotplug_after: Option<u64>,
    connected: AtomicBool,
    tick: AtomicU64,
    duties: Mutex<HashMap<String, u8>>,
}

impl SimulatedFanHub {
    /// Hub with three connected fans.
    pub fn new() -> Self {
        Self::with_fans(3)
    }

    pub fn with_fans(populated: usize) -> Self {
        Self {
            info: DeviceInfo::new("NZXT Smart Device V2 (simulated)", 0x1e71, 0x2006),
            populated: populated.min(HUB_SLOTS),
            hotplug_after: None,
            connected: AtomicBool::new(false),
            tick: AtomicU64::new(0),
            duties: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Connect one more fan once `polls` status reads have happened.
    pub fn with_hotplug_after(mut self, polls: u64) -> Self {
        self.hotplug_after = Some(polls);
        self
    }

    fn populated_at(&self, tick: u64) -> usize {
        match self.hotplug_after {
            Some(polls) if tick >= polls => (self.populated + 1).min(HUB_SLOTS),
            _ => self.populated,
        }
    }

    fn duty(&self, channel: &str) -> u8 {
        self.duties
            .lock()
            .ok()
            .and_then(|d| d.get(channel).copied())
            .unwrap_or(DEFAULT_DUTY)
    }
}

impl Default for SimulatedFanHub {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceHandle for SimulatedFanHub {
    fn info(&self) -> DeviceInfo {
        self.info.clone()
    }

    fn serial_number(&self) -> Option<String> {
        Some("SIMHUB0001".into())
    }

    fn connect(&self) -> Result<()> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Every channel back to the default duty.
    fn initialize(&self) -> Result<()> {
        self.duties
            .lock()
            .map_err(|_| PanelError::InvalidInput("Device state poisoned".into()))?
            .clear();
        Ok(())
    }

    fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn get_status(&self) -> Result<Vec<StatusLine>> {
        let tick = self.tick.fetch_add(1, Ordering::SeqCst);
        let populated = self.populated_at(tick);
        let mut lines = Vec::with_capacity(HUB_SLOTS * 4 + 2);

        for slot in 1..=HUB_SLOTS {
            let name = format!("Fan {}", slot);
            if slot > populated {
                lines.push(StatusLine::new(&name, StatusValue::Absent, ""));
                continue;
            }

            let duty = self.duty(&name);
            let voltage = 12.0 * f64::from(duty) / 100.0;
            let speed = 300 + i64::from(duty) * 15 + jitter(tick, slot);

            lines.push(StatusLine::new(&name, "DC", ""));
            lines.push(StatusLine::new(&format!("{} current", name), 0.05, "A"));
            lines.push(StatusLine::new(&format!("{} speed", name), speed, "rpm"));
            lines.push(StatusLine::new(&format!("{} voltage", name), voltage, "V"));
        }

        lines.push(StatusLine::new("Firmware version", "1.0.4", ""));
        lines.push(StatusLine::new("Noise level", 30 + jitter(tick, 0) / 5, "dB"));
        Ok(lines)
    }

    fn set_fixed_duty(&self, channel: &str, percent: u8) -> Result<()> {
        if percent > 100 {
            return Err(PanelError::InvalidDuty(percent as i16));
        }

        let populated = self.populated_at(self.tick.load(Ordering::SeqCst));
        let known = (1..=populated).any(|slot| format!("Fan {}", slot) == channel);
        if !known {
            return Err(PanelError::InvalidInput(format!(
                "Unknown channel '{}' on {}",
                channel, self.info.name
            )));
        }

        let mut duties = self
            .duties
            .lock()
            .map_err(|_| PanelError::InvalidInput("Device state poisoned".into()))?;
        duties.insert(channel.to_string(), percent);
        Ok(())
    }
}

// =============================================================================
// AIO Cooler
// =============================================================================

/// AIO cooler whose pump only runs programmed curves.
pub struct SimulatedCooler {
    info: DeviceInfo,
    connected: AtomicBool,
    tick: AtomicU64,
    curve: Mutex<Vec<(i8, i8)>>,
}

impl SimulatedCooler {
    pub fn new() -> Self {
        Self {
            info: DeviceInfo::new("NZXT Kraken X (simulated)", 0x1e71, 0x2007),
            connected: AtomicBool::new(false),
            tick: AtomicU64::new(0),
            curve: Mutex::new(vec![(20, 60), (40, 80), (60, 100)]),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Curve currently programmed on the pump.
    pub fn programmed_curve(&self) -> Vec<(i8, i8)> {
        self.curve.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn liquid_temp(&self, tick: u64) -> f64 {
        30.0 + jitter(tick, 1) as f64 / 10.0
    }
}

impl Default for SimulatedCooler {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceHandle for SimulatedCooler {
    fn info(&self) -> DeviceInfo {
        self.info.clone()
    }

    fn serial_number(&self) -> Option<String> {
        Some("SIMAIO0001".into())
    }

    fn connect(&self) -> Result<()> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn get_status(&self) -> Result<Vec<StatusLine>> {
        let tick = self.tick.fetch_add(1, Ordering::SeqCst);
        let liquid = self.liquid_temp(tick);

        let steps = self
            .programmed_curve()
            .into_iter()
            .map(|(t, d)| Step::new(t, d))
            .collect();
        let duty = StepTable::from_steps(steps)
            .ok()
            .and_then(|table| table.duty_at(liquid as f32))
            .unwrap_or(100);

        Ok(vec![
            StatusLine::new("Liquid temperature", liquid, "°C"),
            StatusLine::new("Pump 1", "PWM", ""),
            StatusLine::new("Pump 1 current", 0.21, "A"),
            StatusLine::new("Pump 1 speed", 1200 + i64::from(duty) * 16, "rpm"),
            StatusLine::new("Pump 1 voltage", 12.0, "V"),
            StatusLine::new("Firmware version", "6.0.2", ""),
        ])
    }

    fn set_fixed_duty(&self, _channel: &str, _percent: u8) -> Result<()> {
        Err(PanelError::NotSupportedByDevice {
            device: self.info.name.clone(),
            operation: "fixed duty".into(),
        })
    }

    fn set_speed_profile(&self, channel: &str, profile: &[(i8, i8)]) -> Result<()> {
        if channel != "Pump 1" {
            return Err(PanelError::InvalidInput(format!(
                "Unknown channel '{}' on {}",
                channel, self.info.name
            )));
        }
        if profile.is_empty() {
            return Err(PanelError::InvalidProfile("Curve has no steps".into()));
        }

        let mut curve = self
            .curve
            .lock()
            .map_err(|_| PanelError::InvalidInput("Device state poisoned".into()))?;
        *curve = profile.to_vec();
        Ok(())
    }
}
