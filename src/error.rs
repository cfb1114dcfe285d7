//! Custom error types for the control panel core.
//!
//! This module provides fine-grained error handling for device access,
//! fan-curve editing, and profile persistence.

use thiserror::Error;

/// Main error type for control panel operations.
#[derive(Error, Debug)]
pub enum PanelError {
    /// A single poll returned no usable status. Retried on the next cycle.
    #[error("Transient status read failure on device {device}: {message}")]
    TransientReadFailure { device: usize, message: String },

    /// A step with this temperature already exists in the curve.
    #[error("A step for {temperature}°C already exists at row {index}")]
    DuplicateTemperature { temperature: i8, index: usize },

    /// The device rejected the requested duty control.
    #[error("{device} does not support {operation}")]
    NotSupportedByDevice { device: String, operation: String },

    /// Step table row index does not exist.
    #[error("Row {index} out of range (table has {len} rows)")]
    IndexOutOfRange { index: usize, len: usize },

    /// Temperature outside the editable range.
    #[error("Invalid temperature {0}°C. Valid range: 0-100°C")]
    InvalidTemperature(i16),

    /// Duty cycle outside the editable range.
    #[error("Invalid duty cycle {0}%. Valid range: 0-100%")]
    InvalidDuty(i16),

    /// Persisted step record could not be read back.
    #[error("Invalid step record on line {line}: '{record}'")]
    InvalidStepRecord { line: usize, record: String },

    /// Profile has invalid content.
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    /// No profile with this name in the device namespace.
    #[error("Profile '{0}' not found")]
    ProfileNotFound(String),

    /// Device index does not refer to a connected device.
    #[error("No device at index {0}")]
    NoSuchDevice(usize),

    /// Generic invalid input error.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for control panel operations.
pub type Result<T> = std::result::Result<T, PanelError>;
