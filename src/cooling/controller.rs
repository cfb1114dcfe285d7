//! Duty targets for fixed-duty and curve-driven profiles.
//!
//! This module resolves the duty a profile asks for at a given temperature
//! and names the host temperature sources a curve can follow.

use crate::storage::ProfileMode;
use crate::utils::sensors::SystemSensors;

/// Host temperature source a fan curve follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempSource {
    /// CPU package temperature from system sensors
    Cpu,
    /// GPU temperature from system sensors
    Gpu,
}

impl From<&str> for TempSource {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "gpu" => TempSource::Gpu,
            _ => TempSource::Cpu,
        }
    }
}

impl std::fmt::Display for TempSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TempSource::Cpu => write!(f, "CPU"),
            TempSource::Gpu => write!(f, "GPU"),
        }
    }
}

impl TempSource {
    /// Current temperature of this source, if a matching sensor exists.
    pub fn read(&self, sensors: &SystemSensors) -> Option<f32> {
        match self {
            TempSource::Cpu => sensors.find_cpu_temp(),
            TempSource::Gpu => sensors.find_gpu_temp(),
        }
    }
}

/// Duty a profile asks for at `temperature`.
///
/// Fixed-duty profiles ignore the temperature. Curve profiles interpolate
/// between steps; an empty curve has no target.
pub fn target_duty(mode: &ProfileMode, temperature: f32) -> Option<u8> {
    match mode {
        ProfileMode::StaticDuty(duty) => Some(*duty),
        ProfileMode::Curve(steps) => steps.duty_at(temperature),
    }
}
