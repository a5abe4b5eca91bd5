//! Caregiver availability slots.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::AvailabilityError;

/// Open slots per date. At most one slot exists per (date, caregiver) pair;
/// a slot is consumed the instant a reservation claims it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Availability {
    slots: BTreeMap<NaiveDate, BTreeSet<String>>,
}

impl Availability {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a caregiver available on a date. Re-uploading the same date
    /// is rejected rather than silently tolerated.
    pub fn add_slot(&mut self, date: NaiveDate, caregiver: &str) -> Result<(), AvailabilityError> {
        let inserted = self
            .slots
            .entry(date)
            .or_default()
            .insert(caregiver.to_string());
        if !inserted {
            return Err(AvailabilityError::DuplicateAvailability {
                date,
                caregiver: caregiver.to_string(),
            });
        }
        Ok(())
    }

    /// The caregiver a claim on this date would go to, if any: the
    /// lexicographically smallest username with an open slot. Deterministic,
    /// and consistent with the ascending order of [`for_date`](Self::for_date).
    pub fn find_candidate(&self, date: NaiveDate) -> Option<&str> {
        self.slots
            .get(&date)
            .and_then(|caregivers| caregivers.iter().next())
            .map(String::as_str)
    }

    /// Consume a slot. Fails if the slot is no longer present, which is how
    /// a lost claim race is observed.
    pub fn remove_slot(
        &mut self,
        date: NaiveDate,
        caregiver: &str,
    ) -> Result<(), AvailabilityError> {
        let caregivers = self
            .slots
            .get_mut(&date)
            .ok_or_else(|| AvailabilityError::SlotNotFound {
                date,
                caregiver: caregiver.to_string(),
            })?;
        if !caregivers.remove(caregiver) {
            return Err(AvailabilityError::SlotNotFound {
                date,
                caregiver: caregiver.to_string(),
            });
        }
        if caregivers.is_empty() {
            self.slots.remove(&date);
        }
        Ok(())
    }

    /// Caregivers with an open slot on a date, ascending by username.
    pub fn for_date(&self, date: NaiveDate) -> impl Iterator<Item = &str> + '_ {
        self.slots
            .get(&date)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }
}
