//! Status report model shared with device drivers.
//!
//! Drivers report a flat list of `(label, value, unit)` lines; this module
//! owns that representation and the parser that groups it per component.

pub mod status;

pub use status::*;
