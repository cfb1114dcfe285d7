use serde::{Deserialize, Serialize};

use crate::cooling::StepTable;
use crate::device::DeviceInfo;
use crate::error::{PanelError, Result};

/// What a profile drives a channel with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileMode {
    /// One duty regardless of temperature.
    StaticDuty(u8),
    /// Temperature-driven curve.
    Curve(StepTable),
}

/// A named duty profile for one device model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "StoredProfile", try_from = "StoredProfile")]
pub struct Profile {
    pub name: String,
    pub device_info: DeviceInfo,
    pub mode: ProfileMode,
}

impl Profile {
    pub fn fixed(name: &str, device_info: &DeviceInfo, duty: u8) -> Result<Self> {
        if duty > 100 {
            return Err(PanelError::InvalidDuty(duty as i16));
        }
        Ok(Self {
            name: name.to_string(),
            device_info: device_info.clone(),
            mode: ProfileMode::StaticDuty(duty),
        })
    }

    pub fn curve(name: &str, device_info: &DeviceInfo, steps: StepTable) -> Self {
        Self {
            name: name.to_string(),
            device_info: device_info.clone(),
            mode: ProfileMode::Curve(steps),
        }
    }

    /// The curve, if this is a curve profile.
    pub fn steps(&self) -> Option<&StepTable> {
        match &self.mode {
            ProfileMode::Curve(steps) => Some(steps),
            ProfileMode::StaticDuty(_) => None,
        }
    }

    /// Mutable access to the curve for editing.
    ///
    /// # Errors
    /// `InvalidProfile` for fixed-duty profiles.
    pub fn steps_mut(&mut self) -> Result<&mut StepTable> {
        match &mut self.mode {
            ProfileMode::Curve(steps) => Ok(steps),
            ProfileMode::StaticDuty(_) => Err(PanelError::InvalidProfile(format!(
                "'{}' is a fixed duty profile and has no steps",
                self.name
            ))),
        }
    }
}

/// On-disk form of a [`Profile`]. Exactly one of `static_duty` and `steps`
/// is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredProfile {
    pub name: String,
    pub device_info: DeviceInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_duty: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<StepTable>,
}

impl From<Profile> for StoredProfile {
    fn from(profile: Profile) -> Self {
        let (static_duty, steps) = match profile.mode {
            ProfileMode::StaticDuty(duty) => (Some(duty), None),
            ProfileMode::Curve(steps) => (None, Some(steps)),
        };
        Self {
            name: profile.name,
            device_info: profile.device_info,
            static_duty,
            steps,
        }
    }
}

impl TryFrom<StoredProfile> for Profile {
    type Error = PanelError;

    fn try_from(stored: StoredProfile) -> Result<Self> {
        let mode = match (stored.static_duty, stored.steps) {
            (Some(duty), None) if duty <= 100 => ProfileMode::StaticDuty(duty),
            (Some(duty), None) => return Err(PanelError::InvalidDuty(duty as i16)),
            (None, Some(steps)) => ProfileMode::Curve(steps),
            (Some(_), Some(_)) => {
                return Err(PanelError::InvalidProfile(format!(
                    "'{}' has both a static duty and steps",
                    stored.name
                )));
            }
            (None, None) => {
                return Err(PanelError::InvalidProfile(format!(
                    "'{}' has neither a static duty nor steps",
                    stored.name
                )));
            }
        };

        Ok(Self {
            name: stored.name,
            device_info: stored.device_info,
            mode,
        })
    }
}
