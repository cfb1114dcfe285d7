//! Built-in profiles seeded into an empty device namespace.

use tracing::info;

use crate::cooling::StepTable;
use crate::device::DeviceInfo;
use crate::error::Result;
use crate::storage::{Profile, ProfileStore};

/// Silent curve - minimal noise, ramps at 50°C+.
pub const PROFILE_SILENT: [(i16, i16); 8] = [
    (20, 25),
    (30, 25),
    (40, 25),
    (45, 25),
    (50, 55),
    (55, 75),
    (58, 90),
    (59, 100),
];

/// Performance curve - aggressive cooling.
pub const PROFILE_PERFORMANCE: [(i16, i16); 6] =
    [(20, 50), (30, 55), (40, 65), (50, 80), (55, 90), (59, 100)];

/// Duty of the built-in fixed profile.
pub const FIXED_DUTY: u8 = 50;

/// The built-in profiles for `device`: `silent`, `performance`, `fixed`.
pub fn default_profiles(device: &DeviceInfo) -> Result<Vec<Profile>> {
    Ok(vec![
        Profile::curve("silent", device, StepTable::from_pairs(&PROFILE_SILENT)?),
        Profile::curve(
            "performance",
            device,
            StepTable::from_pairs(&PROFILE_PERFORMANCE)?,
        ),
        Profile::fixed("fixed", device, FIXED_DUTY)?,
    ])
}

/// Write the built-in profiles if `device` has none yet.
///
/// # Returns
/// Number of profiles written.
pub fn seed_default_profiles<S: ProfileStore + ?Sized>(
    store: &mut S,
    device: &DeviceInfo,
) -> Result<usize> {
    if !store.list(device)?.is_empty() {
        return Ok(0);
    }

    let profiles = default_profiles(device)?;
    for profile in &profiles {
        store.save(profile)?;
    }
    info!(device = %device, count = profiles.len(), "Seeded default profiles");
    Ok(profiles.len())
}
