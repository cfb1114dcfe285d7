//! Parsing utilities for CLI arguments and editing-layer input.
//!
//! This module provides reusable parsing and validation functions for the
//! values a user types when editing profiles.

use crate::error::{PanelError, Result};

/// Longest profile name accepted by the editor.
pub const MAX_PROFILE_NAME_LEN: usize = 20;

// =============================================================================
// Profile Names
// =============================================================================

/// Check a profile name against the editor's naming rules.
///
/// Names become file names, so only ASCII letters, digits, `-` and `_` are
/// allowed, 1 to 20 characters long.
///
/// # Example
/// ```
/// use liquid_panel::utils::parsing::validate_profile_name;
///
/// assert!(validate_profile_name("night_quiet-2").is_ok());
/// assert!(validate_profile_name("../etc").is_err());
/// ```
pub fn validate_profile_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_PROFILE_NAME_LEN {
        return Err(PanelError::InvalidInput(format!(
            "Profile name must be 1-{} characters long",
            MAX_PROFILE_NAME_LEN
        )));
    }

    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(PanelError::InvalidInput(format!(
            "Profile name contains '{}'. Use letters, digits, '-' or '_'",
            c
        )));
    }

    Ok(())
}

// =============================================================================
// Curve Steps
// =============================================================================

/// Parse a single `TEMP:DUTY` step, e.g. `"40:60"`.
pub fn parse_step(text: &str) -> Result<(i16, i16)> {
    let invalid = || {
        PanelError::InvalidInput(format!(
            "Invalid step '{}'. Use TEMP:DUTY, e.g. 40:60",
            text
        ))
    };

    let (temperature, duty) = text.trim().split_once(':').ok_or_else(invalid)?;
    let temperature = temperature.trim().parse().map_err(|_| invalid())?;
    let duty = duty.trim().parse().map_err(|_| invalid())?;
    Ok((temperature, duty))
}

/// Parse a comma-separated step list, e.g. `"30:40,50:80"`.
///
/// # Example
/// ```
/// use liquid_panel::utils::parsing::parse_steps;
///
/// let steps = parse_steps("30:40, 50:80").unwrap();
/// assert_eq!(steps, vec![(30, 40), (50, 80)]);
/// ```
pub fn parse_steps(text: &str) -> Result<Vec<(i16, i16)>> {
    text.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(parse_step)
        .collect()
}

// =============================================================================
// Duty
// =============================================================================

/// Parse a duty percentage (0-100).
pub fn parse_duty(text: &str) -> Result<u8> {
    let duty: u8 = text
        .trim()
        .trim_end_matches('%')
        .parse()
        .map_err(|_| PanelError::InvalidInput(format!("Invalid duty '{}'", text)))?;

    if duty > 100 {
        return Err(PanelError::InvalidDuty(duty as i16));
    }
    Ok(duty)
}

// =============================================================================
// Tests
// =============================================================================
