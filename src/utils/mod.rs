//! Utility modules.
//!
//! Input parsing for the editing layer and host sensor access.

pub mod parsing;
pub mod sensors;
