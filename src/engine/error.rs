//! Error types for scheduling operations.

use chrono::NaiveDate;
use thiserror::Error;

use crate::model::{AppointmentId, DoseCount};

/// Top-level error returned by [`Scheduler::apply`](super::Scheduler::apply).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("add_doses failed: {0}")]
    Inventory(#[from] InventoryError),

    #[error("upload_availability failed: {0}")]
    Availability(#[from] AvailabilityError),

    #[error("reserve failed: {0}")]
    Reserve(#[from] ReserveError),

    #[error("cancel failed: {0}")]
    Cancel(#[from] CancelError),
}

/// Error during inventory mutation or lookup.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("unknown vaccine '{0}'")]
    UnknownVaccine(String),

    #[error("vaccine '{0}' already registered")]
    DuplicateVaccine(String),

    #[error("invalid dose amount {0}")]
    InvalidAmount(DoseCount),

    #[error("insufficient doses of '{vaccine}': available {available}, requested {requested}")]
    InsufficientDoses {
        vaccine: String,
        available: DoseCount,
        requested: DoseCount,
    },
}

/// Error during availability slot mutation.
#[derive(Debug, Error)]
pub enum AvailabilityError {
    #[error("caregiver '{caregiver}' already has a slot on {date}")]
    DuplicateAvailability { date: NaiveDate, caregiver: String },

    #[error("no slot for caregiver '{caregiver}' on {date}")]
    SlotNotFound { date: NaiveDate, caregiver: String },
}

/// Error during reservation. `NoCaregiverAvailable` and `NoDosesAvailable`
/// are independent conditions and are always reported separately.
#[derive(Debug, Error)]
pub enum ReserveError {
    #[error("no caregiver is available on {0}")]
    NoCaregiverAvailable(NaiveDate),

    #[error("no doses of '{0}' available")]
    NoDosesAvailable(String),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    Availability(#[from] AvailabilityError),
}

/// Error during cancellation.
#[derive(Debug, Error)]
pub enum CancelError {
    #[error("appointment {0} not found")]
    NotFound(AppointmentId),

    #[error("'{requester}' is not a participant of appointment {id}")]
    NotParticipant {
        id: AppointmentId,
        requester: String,
    },
}
