//! Profile persistence.
//!
//! Profiles are namespaced per device model. The file store lays them out as
//! `<root>/duty/<vendor>_<product>/<name>.json`, so the same profile name
//! can exist for different devices.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::device::DeviceInfo;
use crate::error::{PanelError, Result};
use crate::storage::Profile;

/// Directory for duty profiles under the store root.
const DUTY_DIR: &str = "duty";
const PROFILE_EXT: &str = "json";

/// Persists profiles by name within a per-device namespace.
///
/// Names are used as file names as-is; callers validate them first with
/// [`crate::utils::parsing::validate_profile_name`].
pub trait ProfileStore {
    /// Profile names for `device`, sorted.
    fn list(&self, device: &DeviceInfo) -> Result<Vec<String>>;

    /// # Errors
    /// `ProfileNotFound` if no such profile exists.
    fn load(&self, device: &DeviceInfo, name: &str) -> Result<Profile>;

    /// Create or replace the profile.
    fn save(&mut self, profile: &Profile) -> Result<()>;

    /// # Errors
    /// `ProfileNotFound` if no such profile exists.
    fn delete(&mut self, device: &DeviceInfo, name: &str) -> Result<()>;

    fn exists(&self, device: &DeviceInfo, name: &str) -> Result<bool> {
        Ok(self.list(device)?.iter().any(|n| n == name))
    }
}

// =============================================================================
// File Store
// =============================================================================

/// Profiles as pretty JSON files.
#[derive(Debug, Clone)]
pub struct FileProfileStore {
    root: PathBuf,
}

impl FileProfileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn dir_for(&self, device: &DeviceInfo) -> PathBuf {
        self.root.join(DUTY_DIR).join(device.namespace())
    }

    /// Path a profile is stored at.
    pub fn path_for(&self, device: &DeviceInfo, name: &str) -> PathBuf {
        self.dir_for(device)
            .join(format!("{}.{}", name, PROFILE_EXT))
    }
}

impl ProfileStore for FileProfileStore {
    fn list(&self, device: &DeviceInfo) -> Result<Vec<String>> {
        let dir = self.dir_for(device);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(PROFILE_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn load(&self, device: &DeviceInfo, name: &str) -> Result<Profile> {
        let path = self.path_for(device, name);
        if !path.exists() {
            return Err(PanelError::ProfileNotFound(name.to_string()));
        }

        let content = std::fs::read_to_string(&path)?;
        serde_json::from_str(&content).map_err(|e| {
            PanelError::InvalidProfile(format!("Failed to parse '{}': {}", path.display(), e))
        })
    }

    fn save(&mut self, profile: &Profile) -> Result<()> {
        let dir = self.dir_for(&profile.device_info);
        std::fs::create_dir_all(&dir)?;

        let path = self.path_for(&profile.device_info, &profile.name);
        let content = serde_json::to_string_pretty(profile)?;
        std::fs::write(&path, content)?;
        debug!(path = %path.display(), "Profile saved");
        Ok(())
    }

    fn delete(&mut self, device: &DeviceInfo, name: &str) -> Result<()> {
        let path = self.path_for(device, name);
        if !path.exists() {
            return Err(PanelError::ProfileNotFound(name.to_string()));
        }
        std::fs::remove_file(&path)?;
        debug!(path = %path.display(), "Profile deleted");
        Ok(())
    }
}

// =============================================================================
// Memory Store
// =============================================================================

/// Map-backed store for tests and throwaway sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryProfileStore {
    profiles: HashMap<String, BTreeMap<String, Profile>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileStore for MemoryProfileStore {
    fn list(&self, device: &DeviceInfo) -> Result<Vec<String>> {
        Ok(self
            .profiles
            .get(&device.namespace())
            .map(|p| p.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn load(&self, device: &DeviceInfo, name: &str) -> Result<Profile> {
        self.profiles
            .get(&device.namespace())
            .and_then(|p| p.get(name))
            .cloned()
            .ok_or_else(|| PanelError::ProfileNotFound(name.to_string()))
    }

    fn save(&mut self, profile: &Profile) -> Result<()> {
        self.profiles
            .entry(profile.device_info.namespace())
            .or_default()
            .insert(profile.name.clone(), profile.clone());
        Ok(())
    }

    fn delete(&mut self, device: &DeviceInfo, name: &str) -> Result<()> {
        self.profiles
            .get_mut(&device.namespace())
            .and_then(|p| p.remove(name))
            .map(|_| ())
            .ok_or_else(|| PanelError::ProfileNotFound(name.to_string()))
    }
}
