//! Fan-curve step table.
//!
//! A curve is a list of `(temperature, duty)` control points kept sorted by
//! temperature with at most one point per temperature. Editing operations
//! report conflicts instead of resolving them, so the editing layer can ask
//! the user before overwriting a step.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PanelError, Result};

/// Lowest temperature or duty accepted by edit operations.
pub const MIN_EDIT_VALUE: i16 = 0;

/// Highest temperature or duty accepted by edit operations.
pub const MAX_EDIT_VALUE: i16 = 100;

/// One control point of a fan curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Step {
    /// Temperature in °C.
    pub temperature: i8,
    /// Duty cycle in percent.
    pub duty: i8,
}

impl Step {
    pub fn new(temperature: i8, duty: i8) -> Self {
        Self { temperature, duty }
    }
}

/// How [`StepTable::update`] handles a temperature already used by another row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnConflict {
    /// Leave the table untouched and report `DuplicateTemperature`.
    Reject,
    /// Replace the conflicting row. Use only after the user confirmed.
    Overwrite,
}

/// Ordered, temperature-unique fan curve.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct StepTable {
    steps: Vec<Step>,
}

impl StepTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `(temperature, duty)` pairs, validating every edit.
    pub fn from_pairs(pairs: &[(i16, i16)]) -> Result<Self> {
        let mut table = Self::new();
        for &(temperature, duty) in pairs {
            table.add(temperature, duty)?;
        }
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Step> {
        self.steps.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Steps as `(temperature, duty)` tuples, in table order.
    pub fn as_pairs(&self) -> Vec<(i8, i8)> {
        self.steps.iter().map(|s| (s.temperature, s.duty)).collect()
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Add a step.
    ///
    /// # Returns
    /// The row index the step landed on.
    ///
    /// # Errors
    /// `DuplicateTemperature` if a step with this temperature exists; the
    /// table is left unchanged.
    pub fn add(&mut self, temperature: i16, duty: i16) -> Result<usize> {
        let step = validated_step(temperature, duty)?;

        if let Some(index) = self.location_for(step.temperature) {
            return Err(PanelError::DuplicateTemperature {
                temperature: step.temperature,
                index,
            });
        }

        let index = self.insertion_point_for(step.temperature);
        self.steps.insert(index, step);
        Ok(index)
    }

    /// Rewrite the row at `at_index` with new values.
    ///
    /// - If that row already has `temperature`, only its duty changes.
    /// - If another row has `temperature`, the call fails with
    ///   `DuplicateTemperature` under [`OnConflict::Reject`]. Under
    ///   [`OnConflict::Overwrite`] the other row is dropped and the new step
    ///   is written at `at_index`'s position.
    /// - Otherwise the row is overwritten and the table re-sorted.
    ///
    /// # Returns
    /// The row index of the written step after sorting.
    pub fn update(
        &mut self,
        temperature: i16,
        duty: i16,
        at_index: usize,
        on_conflict: OnConflict,
    ) -> Result<usize> {
        self.check_index(at_index)?;
        let step = validated_step(temperature, duty)?;

        match self.location_for(step.temperature) {
            Some(existing) if existing == at_index => {
                self.steps[at_index].duty = step.duty;
            }
            Some(existing) => {
                if on_conflict == OnConflict::Reject {
                    return Err(PanelError::DuplicateTemperature {
                        temperature: step.temperature,
                        index: existing,
                    });
                }
                self.steps.remove(existing);
                let position = if existing < at_index {
                    at_index - 1
                } else {
                    at_index
                };
                self.steps.insert(position, step);
            }
            None => {
                self.steps[at_index] = step;
            }
        }

        self.sort();
        Ok(self.insertion_point_for(step.temperature) - 1)
    }

    /// Remove the row at `at_index`.
    pub fn remove(&mut self, at_index: usize) -> Result<Step> {
        self.check_index(at_index)?;
        Ok(self.steps.remove(at_index))
    }

    /// Row index of the step with exactly this temperature.
    pub fn location_for(&self, temperature: i8) -> Option<usize> {
        self.steps
            .binary_search_by_key(&temperature, |s| s.temperature)
            .ok()
    }

    /// Row a new step with this temperature would be inserted at: the first
    /// row with a strictly higher temperature, or the end of the table.
    pub fn insertion_point_for(&self, temperature: i8) -> usize {
        self.steps.partition_point(|s| s.temperature <= temperature)
    }

    // =========================================================================
    // Evaluation
    // =========================================================================

    /// Duty the curve asks for at `temperature`.
    ///
    /// Linear between steps, clamped to the first and last step outside the
    /// curve. `None` for an empty table.
    pub fn duty_at(&self, temperature: f32) -> Option<u8> {
        let first = self.steps.first()?;
        let last = self.steps.last()?;

        if temperature <= first.temperature as f32 {
            return Some(clamp_duty(first.duty as f32));
        }
        if temperature >= last.temperature as f32 {
            return Some(clamp_duty(last.duty as f32));
        }

        self.steps.windows(2).find_map(|pair| {
            let (lo, hi) = (pair[0], pair[1]);
            let (t1, t2) = (lo.temperature as f32, hi.temperature as f32);
            if temperature < t1 || temperature > t2 {
                return None;
            }
            let ratio = (temperature - t1) / (t2 - t1);
            let duty = lo.duty as f32 + ratio * (hi.duty as f32 - lo.duty as f32);
            Some(clamp_duty(duty))
        })
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Encode as header-less `temperature,duty` lines.
    pub fn serialize(&self) -> String {
        self.steps
            .iter()
            .map(|s| format!("{},{}\n", s.temperature, s.duty))
            .collect()
    }

    /// Decode the form written by [`StepTable::serialize`].
    ///
    /// Records may appear in any order; the result is sorted. Blank lines are
    /// skipped. Values only need to fit the storage range (`i8`).
    pub fn deserialize(text: &str) -> Result<Self> {
        let mut steps: Vec<Step> = Vec::new();

        for (line_no, line) in text.lines().enumerate() {
            let record = line.trim();
            if record.is_empty() {
                continue;
            }

            let invalid = || PanelError::InvalidStepRecord {
                line: line_no + 1,
                record: record.to_string(),
            };

            let (temperature, duty) = record.split_once(',').ok_or_else(invalid)?;
            let step = Step {
                temperature: temperature.trim().parse().map_err(|_| invalid())?,
                duty: duty.trim().parse().map_err(|_| invalid())?,
            };
            steps.push(step);
        }

        Self::from_steps(steps)
    }

    /// Build a table from steps in any order, without the edit-range check.
    ///
    /// # Errors
    /// `DuplicateTemperature` if two steps share a temperature.
    pub fn from_steps(mut steps: Vec<Step>) -> Result<Self> {
        steps.sort_by_key(|s| s.temperature);
        if let Some(index) = steps
            .windows(2)
            .position(|w| w[0].temperature == w[1].temperature)
        {
            return Err(PanelError::DuplicateTemperature {
                temperature: steps[index].temperature,
                index,
            });
        }

        Ok(Self { steps })
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn sort(&mut self) {
        // Stable: rows with unchanged temperatures keep their relative order.
        self.steps.sort_by_key(|s| s.temperature);
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.steps.len() {
            return Err(PanelError::IndexOutOfRange {
                index,
                len: self.steps.len(),
            });
        }
        Ok(())
    }
}

fn validated_step(temperature: i16, duty: i16) -> Result<Step> {
    if !(MIN_EDIT_VALUE..=MAX_EDIT_VALUE).contains(&temperature) {
        return Err(PanelError::InvalidTemperature(temperature));
    }
    if !(MIN_EDIT_VALUE..=MAX_EDIT_VALUE).contains(&duty) {
        return Err(PanelError::InvalidDuty(duty));
    }
    // Both fit in i8 after the range check.
    Ok(Step::new(temperature as i8, duty as i8))
}

fn clamp_duty(duty: f32) -> u8 {
    duty.round().clamp(0.0, 100.0) as u8
}

impl std::fmt::Display for StepTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            writeln!(f, "{:>3}  {:>4}°C  {:>3}%", i, step.temperature, step.duty)?;
        }
        Ok(())
    }
}

impl FromStr for StepTable {
    type Err = PanelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::deserialize(s)
    }
}

impl From<StepTable> for String {
    fn from(table: StepTable) -> Self {
        table.serialize()
    }
}

impl TryFrom<String> for StepTable {
    type Error = PanelError;

    fn try_from(s: String) -> Result<Self> {
        Self::deserialize(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(pairs: &[(i16, i16)]) -> StepTable {
        StepTable::from_pairs(pairs).unwrap()
    }

    fn assert_sorted_unique(t: &StepTable) {
        for pair in t.steps().windows(2) {
            assert!(pair[0].temperature < pair[1].temperature, "{:?}", t);
        }
    }

    #[test]
    fn test_add_keeps_sorted() {
        let mut t = StepTable::new();
        assert_eq!(t.add(30, 40).unwrap(), 0);
        assert_eq!(t.add(50, 80).unwrap(), 1);
        assert_eq!(t.add(40, 60).unwrap(), 1);
        assert_eq!(t.as_pairs(), vec![(30, 40), (40, 60), (50, 80)]);
    }

    #[test]
    fn test_add_duplicate_rejected() {
        let mut t = table(&[(30, 40), (50, 80)]);
        let before = t.clone();

        let err = t.add(50, 10).unwrap_err();
        assert!(matches!(
            err,
            PanelError::DuplicateTemperature {
                temperature: 50,
                index: 1
            }
        ));
        assert_eq!(t, before);
    }

    #[test]
    fn test_add_validates_domain() {
        let mut t = StepTable::new();
        assert!(matches!(t.add(101, 50), Err(PanelError::InvalidTemperature(101))));
        assert!(matches!(t.add(-1, 50), Err(PanelError::InvalidTemperature(-1))));
        assert!(matches!(t.add(40, 150), Err(PanelError::InvalidDuty(150))));
        assert!(t.is_empty());
    }

    #[test]
    fn test_update_same_row_changes_duty() {
        let mut t = table(&[(30, 40), (50, 80)]);
        let index = t.update(50, 90, 1, OnConflict::Reject).unwrap();
        assert_eq!(index, 1);
        assert_eq!(t.as_pairs(), vec![(30, 40), (50, 90)]);
    }

    #[test]
    fn test_update_conflict_needs_confirmation() {
        let mut t = table(&[(30, 40), (50, 80)]);
        let before = t.clone();

        let err = t.update(30, 99, 1, OnConflict::Reject).unwrap_err();
        assert!(matches!(
            err,
            PanelError::DuplicateTemperature {
                temperature: 30,
                index: 0
            }
        ));
        assert_eq!(t, before);

        let index = t.update(30, 99, 1, OnConflict::Overwrite).unwrap();
        assert_eq!(index, 0);
        assert_eq!(t.as_pairs(), vec![(30, 99), (50, 80)]);
    }

    #[test]
    fn test_update_conflict_after_target_row() {
        let mut t = table(&[(20, 10), (30, 40), (50, 80)]);
        let index = t.update(50, 60, 0, OnConflict::Overwrite).unwrap();
        assert_eq!(index, 2);
        assert_eq!(t.as_pairs(), vec![(20, 10), (30, 40), (50, 60)]);
    }

    #[test]
    fn test_update_new_temperature_moves_row() {
        let mut t = table(&[(30, 40), (40, 60), (50, 80)]);
        let index = t.update(60, 100, 0, OnConflict::Reject).unwrap();
        assert_eq!(index, 2);
        assert_eq!(t.as_pairs(), vec![(40, 60), (50, 80), (60, 100)]);
    }

    #[test]
    fn test_update_and_remove_out_of_range() {
        let mut t = table(&[(30, 40)]);
        assert!(matches!(
            t.update(40, 50, 3, OnConflict::Overwrite),
            Err(PanelError::IndexOutOfRange { index: 3, len: 1 })
        ));
        assert!(matches!(
            t.remove(1),
            Err(PanelError::IndexOutOfRange { index: 1, len: 1 })
        ));
        assert_eq!(t.remove(0).unwrap(), Step::new(30, 40));
        assert!(t.is_empty());
    }

    #[test]
    fn test_location_and_insertion_point() {
        let t = table(&[(30, 40), (40, 60), (50, 80)]);
        assert_eq!(t.location_for(40), Some(1));
        assert_eq!(t.location_for(45), None);
        assert_eq!(t.insertion_point_for(10), 0);
        assert_eq!(t.insertion_point_for(40), 2);
        assert_eq!(t.insertion_point_for(45), 2);
        assert_eq!(t.insertion_point_for(90), 3);
    }

    #[test]
    fn test_edit_sequence_invariants() {
        let mut t = StepTable::new();
        let script: [(i16, i16, usize); 12] = [
            (50, 50, 0),
            (20, 20, 0),
            (80, 100, 1),
            (35, 40, 2),
            (20, 30, 3),
            (65, 70, 0),
            (35, 45, 1),
            (90, 100, 4),
            (10, 5, 2),
            (80, 90, 0),
            (45, 60, 5),
            (0, 0, 1),
        ];

        for (n, &(temperature, duty, row)) in script.iter().enumerate() {
            let _ = t.add(temperature, duty);
            let len = t.len().max(1);
            let _ = t.update(duty, temperature, row % len, OnConflict::Overwrite);
            let _ = t.update(temperature, duty, (row + 1) % len, OnConflict::Reject);
            if n % 3 == 2 && !t.is_empty() {
                let _ = t.remove(row % t.len());
            }
            assert_sorted_unique(&t);
        }
    }

    #[test]
    fn test_serialize_round_trip() {
        let t = table(&[(50, 80), (30, 40), (40, 60)]);
        let text = t.serialize();
        assert_eq!(text, "30,40\n40,60\n50,80\n");
        assert_eq!(StepTable::deserialize(&text).unwrap(), t);
        assert_eq!(StepTable::deserialize("").unwrap(), StepTable::new());
    }

    #[test]
    fn test_deserialize_sorts_and_tolerates_whitespace() {
        let t = StepTable::deserialize("50, 80\n\n 30,40 \r\n").unwrap();
        assert_eq!(t.as_pairs(), vec![(30, 40), (50, 80)]);
    }

    #[test]
    fn test_deserialize_rejects_bad_records() {
        assert!(matches!(
            StepTable::deserialize("30,40\n50;80\n"),
            Err(PanelError::InvalidStepRecord { line: 2, .. })
        ));
        assert!(matches!(
            StepTable::deserialize("300,40\n"),
            Err(PanelError::InvalidStepRecord { line: 1, .. })
        ));
        assert!(matches!(
            StepTable::deserialize("30,40\n30,50\n"),
            Err(PanelError::DuplicateTemperature { temperature: 30, .. })
        ));
    }

    #[test]
    fn test_duty_at_interpolates() {
        let t = table(&[(20, 25), (40, 50), (60, 100)]);
        assert_eq!(t.duty_at(20.0), Some(25));
        assert_eq!(t.duty_at(30.0), Some(38));
        assert_eq!(t.duty_at(10.0), Some(25));
        assert_eq!(t.duty_at(80.0), Some(100));
        assert_eq!(StepTable::new().duty_at(50.0), None);
    }

    #[test]
    fn test_serde_as_string() {
        let t = table(&[(30, 40), (50, 80)]);
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, "\"30,40\\n50,80\\n\"");
        let back: StepTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
