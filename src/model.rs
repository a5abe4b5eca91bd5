//! Core domain types for the scheduler.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Appointment identifier, assigned monotonically by the appointment ledger.
pub type AppointmentId = u32;

/// Number of vaccine doses. Unsigned so inventory can never go negative.
pub type DoseCount = u32;

/// A command representing the possible mutating inputs of the engine.
#[derive(Debug, Clone)]
pub enum Command {
    /// Register a new vaccine or add doses to an existing one.
    AddDoses { vaccine: String, amount: DoseCount },
    /// Declare a caregiver available on a date.
    UploadAvailability { date: NaiveDate, caregiver: String },
    /// Claim one slot and one dose on behalf of a patient.
    Reserve {
        patient: String,
        date: NaiveDate,
        vaccine: String,
    },
    /// Reverse a claim: remove the appointment, restore dose and slot.
    Cancel {
        id: AppointmentId,
        requester: String,
    },
}

/// A finalized appointment. Immutable once created; cancellation removes
/// the whole record rather than editing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub caregiver: String,
    pub patient: String,
    pub vaccine: String,
    pub date: NaiveDate,
}

/// Successful outcome of a reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub appointment_id: AppointmentId,
    pub caregiver: String,
}
