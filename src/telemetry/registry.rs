//! Known components per device slot.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Slot {
    known: BTreeSet<String>,
    discovering: bool,
}

/// Component names already seen on each device, plus a guard marking
/// devices whose initial discovery is in flight.
///
/// Names are only ever added. Each slot is written by the worker polling
/// that device; the control layer only reads.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    slots: Mutex<HashMap<usize, Slot>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<usize, Slot>> {
        // Slots hold plain data, a panicked writer cannot leave them torn.
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Known component names of `device`, sorted.
    pub fn known(&self, device: usize) -> Vec<String> {
        self.slots()
            .get(&device)
            .map(|s| s.known.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn has_components(&self, device: usize) -> bool {
        self.slots()
            .get(&device)
            .is_some_and(|s| !s.known.is_empty())
    }

    pub fn is_discovering(&self, device: usize) -> bool {
        self.slots().get(&device).is_some_and(|s| s.discovering)
    }

    /// Claim initial discovery of `device`.
    ///
    /// Returns `false` if components are already known or another discovery
    /// holds the claim.
    pub fn begin_discovery(&self, device: usize) -> bool {
        let mut slots = self.slots();
        let slot = slots.entry(device).or_default();
        if !slot.known.is_empty() || slot.discovering {
            return false;
        }
        slot.discovering = true;
        true
    }

    pub fn end_discovery(&self, device: usize) {
        if let Some(slot) = self.slots().get_mut(&device) {
            slot.discovering = false;
        }
    }

    /// Record component names for `device`.
    ///
    /// # Returns
    /// The names that were not known before, in input order.
    pub fn register<'a>(
        &self,
        device: usize,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Vec<String> {
        let mut slots = self.slots();
        let slot = slots.entry(device).or_default();
        names
            .into_iter()
            .filter(|name| slot.known.insert((*name).to_string()))
            .map(str::to_string)
            .collect()
    }
}
