//! Profile storage and persistence module.
//!
//! Profile types, the per-device profile stores, and the built-in defaults.

pub mod defaults;
pub mod profiles;
pub mod types;

// Re-export commonly used items
pub use defaults::{default_profiles, seed_default_profiles};
pub use profiles::{FileProfileStore, MemoryProfileStore, ProfileStore};
pub use types::{Profile, ProfileMode, StoredProfile};
