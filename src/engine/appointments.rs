//! Finalized appointment records.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{Appointment, AppointmentId};

/// Appointments keyed by id. The ledger is the single owner of appointment
/// identity: ids come from a monotonic counter and are never reused, even
/// after cancellation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Appointments {
    records: BTreeMap<AppointmentId, Appointment>,
    next_id: AppointmentId,
}

impl Appointments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new appointment under a fresh id.
    pub fn insert(
        &mut self,
        caregiver: &str,
        patient: &str,
        vaccine: &str,
        date: NaiveDate,
    ) -> AppointmentId {
        self.next_id += 1;
        let id = self.next_id;
        self.records.insert(
            id,
            Appointment {
                id,
                caregiver: caregiver.to_string(),
                patient: patient.to_string(),
                vaccine: vaccine.to_string(),
                date,
            },
        );
        id
    }

    pub fn find_by_id(&self, id: AppointmentId) -> Option<&Appointment> {
        self.records.get(&id)
    }

    /// Remove a record, returning it. The freed id is not recycled.
    pub fn remove(&mut self, id: AppointmentId) -> Option<Appointment> {
        self.records.remove(&id)
    }

    /// A patient's appointments, ascending by id.
    pub fn for_patient(&self, patient: &str) -> impl Iterator<Item = &Appointment> + '_ {
        let patient = patient.to_string();
        self.records
            .values()
            .filter(move |appt| appt.patient == patient)
    }

    /// A caregiver's appointments, ascending by id.
    pub fn for_caregiver(&self, caregiver: &str) -> impl Iterator<Item = &Appointment> + '_ {
        let caregiver = caregiver.to_string();
        self.records
            .values()
            .filter(move |appt| appt.caregiver == caregiver)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
