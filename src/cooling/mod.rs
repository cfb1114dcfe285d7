//! Cooling control module.
//!
//! Provides the fan-curve step table and duty resolution for profiles.

mod controller;
pub mod steps;

pub use controller::{TempSource, target_duty};
pub use steps::{OnConflict, Step, StepTable};
