//! Host temperature sensors.
//!
//! Wraps `sysinfo` components to find the CPU and GPU temperatures a fan
//! curve can follow.

use sysinfo::Components;

/// Label fragments identifying CPU sensors across platforms.
const CPU_PATTERNS: [&str; 5] = ["cpu", "package", "core", "tdie", "tctl"];

/// Label fragments identifying GPU sensors.
const GPU_PATTERNS: [&str; 4] = ["gpu", "nvidia", "amdgpu", "edge"];

/// One host temperature sensor.
#[derive(Debug, Clone)]
pub struct SensorInfo {
    pub label: String,
    /// Celsius, `None` when the sensor cannot be read.
    pub temperature: Option<f32>,
}

/// Refreshable view of the host's temperature sensors.
pub struct SystemSensors {
    components: Components,
}

impl SystemSensors {
    pub fn new() -> Self {
        Self {
            components: Components::new_with_refreshed_list(),
        }
    }

    /// Re-read every sensor value.
    pub fn refresh(&mut self) {
        self.components.refresh(true);
    }

    pub fn find_cpu_temp(&self) -> Option<f32> {
        self.find_temp(&CPU_PATTERNS)
    }

    pub fn find_gpu_temp(&self) -> Option<f32> {
        self.find_temp(&GPU_PATTERNS)
    }

    pub fn list_all(&self) -> Vec<SensorInfo> {
        self.components
            .iter()
            .map(|c| SensorInfo {
                label: c.label().to_string(),
                temperature: c.temperature(),
            })
            .collect()
    }

    /// Temperature of the first readable sensor whose label matches a pattern.
    fn find_temp(&self, patterns: &[&str]) -> Option<f32> {
        self.components
            .iter()
            .filter(|c| label_matches(c.label(), patterns))
            .find_map(|c| c.temperature())
    }
}

impl Default for SystemSensors {
    fn default() -> Self {
        Self::new()
    }
}

fn label_matches(label: &str, patterns: &[&str]) -> bool {
    let label = label.to_lowercase();
    patterns.iter().any(|p| label.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_matching() {
        assert!(label_matches("k10temp Tctl", &CPU_PATTERNS));
        assert!(label_matches("Package id 0", &CPU_PATTERNS));
        assert!(label_matches("amdgpu edge", &GPU_PATTERNS));
        assert!(!label_matches("nvme Composite", &CPU_PATTERNS));
    }

    #[test]
    fn test_system_sensors_listing() {
        // Sensor availability depends on the host; only check it doesn't panic.
        let mut sensors = SystemSensors::new();
        sensors.refresh();
        let _ = sensors.list_all();
        let _ = sensors.find_cpu_temp();
    }
}
