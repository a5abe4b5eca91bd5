pub mod accounts;
pub mod cli;
pub mod engine;
pub mod model;
pub mod store;

pub use engine::Scheduler;
pub use model::{Appointment, AppointmentId, Command, Confirmation, DoseCount};
