//! Per-vaccine dose inventory.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::DoseCount;

use super::error::InventoryError;

/// Dose counts per vaccine name. Vaccines are created on first registration
/// and never deleted; counts can never go below zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Inventory {
    doses: BTreeMap<String, DoseCount>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new vaccine with its initial dose count.
    ///
    /// The caller is expected to branch on [`contains`](Self::contains)
    /// first; calling this for a known name is an error.
    pub fn ensure_vaccine(
        &mut self,
        name: &str,
        initial: DoseCount,
    ) -> Result<(), InventoryError> {
        if initial == 0 {
            return Err(InventoryError::InvalidAmount(initial));
        }
        if self.doses.contains_key(name) {
            return Err(InventoryError::DuplicateVaccine(name.to_string()));
        }
        self.doses.insert(name.to_string(), initial);
        Ok(())
    }

    /// Add doses to an existing vaccine.
    pub fn increase(&mut self, name: &str, amount: DoseCount) -> Result<(), InventoryError> {
        if amount == 0 {
            return Err(InventoryError::InvalidAmount(amount));
        }
        let count = self
            .doses
            .get_mut(name)
            .ok_or_else(|| InventoryError::UnknownVaccine(name.to_string()))?;
        *count += amount;
        Ok(())
    }

    /// Remove doses from an existing vaccine. All-or-nothing: on
    /// `InsufficientDoses` the count is left untouched.
    pub fn decrease(&mut self, name: &str, amount: DoseCount) -> Result<(), InventoryError> {
        let count = self
            .doses
            .get_mut(name)
            .ok_or_else(|| InventoryError::UnknownVaccine(name.to_string()))?;
        *count = count
            .checked_sub(amount)
            .ok_or_else(|| InventoryError::InsufficientDoses {
                vaccine: name.to_string(),
                available: *count,
                requested: amount,
            })?;
        Ok(())
    }

    /// Current dose count for a vaccine.
    pub fn query(&self, name: &str) -> Result<DoseCount, InventoryError> {
        self.doses
            .get(name)
            .copied()
            .ok_or_else(|| InventoryError::UnknownVaccine(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.doses.contains_key(name)
    }

    /// All vaccines and their counts, ascending by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, DoseCount)> + '_ {
        self.doses.iter().map(|(name, count)| (name.as_str(), *count))
    }
}
