//! Vaccine appointment scheduling engine.
//!
//! The engine coordinates three ledgers (dose inventory, caregiver
//! availability, finalized appointments) and owns the claim: converting one
//! availability slot and one dose into one appointment as a single unit of
//! work. Also supports an async stream of commands.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio_stream::{Stream, StreamExt};
use tracing::info;

use crate::model::{AppointmentId, Command, Confirmation, DoseCount};

mod appointments;
pub use appointments::Appointments;

mod availability;
pub use availability::Availability;

mod inventory;
pub use inventory::Inventory;

mod error;
pub use error::{AvailabilityError, CancelError, EngineError, InventoryError, ReserveError};

/// The scheduling engine.
///
/// All mutating operations take `&mut self`, so within one process a claim
/// is atomic and isolated by construction: no other caller can observe or
/// interleave with a partially applied reservation. Shared use goes through
/// `Arc<tokio::sync::Mutex<Scheduler>>`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scheduler {
    inventory: Inventory,
    availability: Availability,
    appointments: Appointments,
}

/// Public API
impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the engine over the given command stream.
    ///
    /// Individual command failures are logged and skipped; they never stop
    /// the stream.
    pub async fn run(&mut self, mut stream: impl Stream<Item = Command> + Unpin) {
        while let Some(cmd) = stream.next().await {
            let _ = self.apply(cmd);
        }
    }

    /// Apply a single command on top of the current state.
    pub fn apply(&mut self, cmd: Command) -> Result<(), EngineError> {
        match cmd {
            Command::AddDoses { vaccine, amount } => {
                let result = self.add_doses(&vaccine, amount);
                match &result {
                    Ok(count) => info!(%vaccine, amount, count, "add_doses applied"),
                    Err(e) => info!(%vaccine, amount, reason = %e, "add_doses skipped"),
                }
                result?;
            }
            Command::UploadAvailability { date, caregiver } => {
                let result = self.upload_availability(date, &caregiver);
                match &result {
                    Ok(()) => info!(%date, %caregiver, "upload_availability applied"),
                    Err(e) => info!(%date, %caregiver, reason = %e, "upload_availability skipped"),
                }
                result?;
            }
            Command::Reserve {
                patient,
                date,
                vaccine,
            } => {
                let result = self.reserve(&patient, date, &vaccine);
                match &result {
                    Ok(confirmation) => info!(
                        %patient,
                        %date,
                        %vaccine,
                        appointment_id = confirmation.appointment_id,
                        caregiver = %confirmation.caregiver,
                        "reserve applied"
                    ),
                    Err(e) => info!(%patient, %date, %vaccine, reason = %e, "reserve skipped"),
                }
                result?;
            }
            Command::Cancel { id, requester } => {
                let result = self.cancel(id, &requester);
                match &result {
                    Ok(()) => info!(id, %requester, "cancel applied"),
                    Err(e) => info!(id, %requester, reason = %e, "cancel skipped"),
                }
                result?;
            }
        }
        Ok(())
    }

    /// Register a new vaccine or add doses to an existing one, returning the
    /// new dose count.
    pub fn add_doses(
        &mut self,
        vaccine: &str,
        amount: DoseCount,
    ) -> Result<DoseCount, InventoryError> {
        if self.inventory.contains(vaccine) {
            self.inventory.increase(vaccine, amount)?;
        } else {
            self.inventory.ensure_vaccine(vaccine, amount)?;
        }
        self.inventory.query(vaccine)
    }

    /// Declare a caregiver available on a date.
    pub fn upload_availability(
        &mut self,
        date: NaiveDate,
        caregiver: &str,
    ) -> Result<(), AvailabilityError> {
        self.availability.add_slot(date, caregiver)
    }

    /// Claim one slot and one dose for a patient.
    ///
    /// Dose exhaustion is checked before slot presence, so the case where a
    /// previous claim consumed both the last slot and the last dose reports
    /// `NoDosesAvailable` rather than `NoCaregiverAvailable`; the two
    /// conditions are never conflated. On success the dose decrement, slot
    /// removal, and appointment insert are all applied; on any failure none
    /// are.
    pub fn reserve(
        &mut self,
        patient: &str,
        date: NaiveDate,
        vaccine: &str,
    ) -> Result<Confirmation, ReserveError> {
        let doses = self.inventory.query(vaccine)?;
        if doses == 0 {
            return Err(ReserveError::NoDosesAvailable(vaccine.to_string()));
        }
        let caregiver = self
            .availability
            .find_candidate(date)
            .ok_or(ReserveError::NoCaregiverAvailable(date))?
            .to_string();

        self.inventory.decrease(vaccine, 1)?;
        if let Err(e) = self.availability.remove_slot(date, &caregiver) {
            // Compensate the decrement so a half-applied claim is never
            // visible. Unreachable while the candidate lookup and the claim
            // share one borrow, but the contract does not depend on that.
            self.inventory.increase(vaccine, 1)?;
            return Err(e.into());
        }
        let appointment_id = self.appointments.insert(&caregiver, patient, vaccine, date);

        Ok(Confirmation {
            appointment_id,
            caregiver,
        })
    }

    /// Reverse a claim: delete the appointment, restore the dose, restore
    /// the slot. Only a participant (the appointment's patient or caregiver)
    /// may cancel. A slot the caregiver has re-uploaded since the claim is
    /// left as is.
    pub fn cancel(&mut self, id: AppointmentId, requester: &str) -> Result<(), CancelError> {
        let appt = self
            .appointments
            .find_by_id(id)
            .ok_or(CancelError::NotFound(id))?;
        if appt.patient != requester && appt.caregiver != requester {
            return Err(CancelError::NotParticipant {
                id,
                requester: requester.to_string(),
            });
        }

        let Some(appt) = self.appointments.remove(id) else {
            return Err(CancelError::NotFound(id));
        };

        // The appointment guarantees the vaccine exists, so restoring the
        // dose cannot fail; the slot restore tolerates a re-uploaded slot.
        let _ = self.add_doses(&appt.vaccine, 1);
        let _ = self.availability.add_slot(appt.date, &appt.caregiver);

        Ok(())
    }

    /// Read-only schedule view for one date: every caregiver with an open
    /// slot paired with every vaccine and its count, caregivers ascending.
    pub fn schedule_for_date(
        &self,
        date: NaiveDate,
    ) -> impl Iterator<Item = (&str, &str, DoseCount)> + '_ {
        self.availability.for_date(date).flat_map(|caregiver| {
            self.inventory
                .iter()
                .map(move |(vaccine, count)| (caregiver, vaccine, count))
        })
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn availability(&self) -> &Availability {
        &self.availability
    }

    pub fn appointments(&self) -> &Appointments {
        &self.appointments
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::Mutex;

    use super::*;

    // test utils

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn single_slot_single_dose() -> Scheduler {
        let mut sched = Scheduler::new();
        sched.add_doses("Pfizer", 1).unwrap();
        sched
            .upload_availability(date("2022-01-01"), "car1")
            .unwrap();
        sched
    }

    #[test]
    fn new_scheduler_is_empty() {
        let sched = Scheduler::new();
        assert!(sched.appointments().is_empty());
        assert_eq!(sched.schedule_for_date(date("2022-01-01")).count(), 0);
    }

    // add_doses

    #[test]
    fn add_doses_creates_then_accumulates() {
        let mut sched = Scheduler::new();
        assert_eq!(sched.add_doses("Pfizer", 5).unwrap(), 5);
        assert_eq!(sched.add_doses("Pfizer", 3).unwrap(), 8);
        assert_eq!(sched.inventory().query("Pfizer").unwrap(), 8);
    }

    #[test]
    fn add_zero_doses_fails() {
        let mut sched = Scheduler::new();
        assert!(matches!(
            sched.add_doses("Pfizer", 0),
            Err(InventoryError::InvalidAmount(0))
        ));
    }

    // reserve

    #[test]
    fn reserve_claims_slot_and_dose() {
        let mut sched = single_slot_single_dose();

        let confirmation = sched.reserve("pat1", date("2022-01-01"), "Pfizer").unwrap();
        assert_eq!(confirmation.caregiver, "car1");

        // Dose consumed, slot gone, exactly one appointment recorded.
        assert_eq!(sched.inventory().query("Pfizer").unwrap(), 0);
        assert_eq!(sched.availability().find_candidate(date("2022-01-01")), None);
        assert_eq!(sched.appointments().len(), 1);

        let appt = sched
            .appointments()
            .find_by_id(confirmation.appointment_id)
            .unwrap();
        assert_eq!(appt.caregiver, "car1");
        assert_eq!(appt.patient, "pat1");
        assert_eq!(appt.vaccine, "Pfizer");
        assert_eq!(appt.date, date("2022-01-01"));
    }

    #[test]
    fn repeat_reserve_after_exhaustion_reports_no_doses() {
        let mut sched = single_slot_single_dose();
        sched.reserve("pat1", date("2022-01-01"), "Pfizer").unwrap();

        // Slot and dose are both gone; dose exhaustion wins the report.
        let result = sched.reserve("pat1", date("2022-01-01"), "Pfizer");
        assert!(matches!(result, Err(ReserveError::NoDosesAvailable(_))));
        assert_eq!(sched.appointments().len(), 1);
    }

    #[test]
    fn reserve_without_slot_reports_no_caregiver() {
        let mut sched = Scheduler::new();
        sched.add_doses("Pfizer", 5).unwrap();

        let result = sched.reserve("pat1", date("2022-01-01"), "Pfizer");
        assert!(matches!(result, Err(ReserveError::NoCaregiverAvailable(_))));

        // Nothing was consumed.
        assert_eq!(sched.inventory().query("Pfizer").unwrap(), 5);
        assert!(sched.appointments().is_empty());
    }

    #[test]
    fn reserve_with_zero_doses_reports_no_doses_and_keeps_slot() {
        let mut sched = single_slot_single_dose();
        sched.reserve("pat1", date("2022-01-01"), "Pfizer").unwrap();
        sched
            .upload_availability(date("2022-01-02"), "car1")
            .unwrap();

        let result = sched.reserve("pat2", date("2022-01-02"), "Pfizer");
        assert!(matches!(result, Err(ReserveError::NoDosesAvailable(_))));

        // The slot survives a dose-starved attempt.
        assert_eq!(
            sched.availability().find_candidate(date("2022-01-02")),
            Some("car1")
        );
        assert_eq!(sched.appointments().len(), 1);
    }

    #[test]
    fn reserve_unknown_vaccine_fails() {
        let mut sched = Scheduler::new();
        sched
            .upload_availability(date("2022-01-01"), "car1")
            .unwrap();

        let result = sched.reserve("pat1", date("2022-01-01"), "Pfizer");
        assert!(matches!(
            result,
            Err(ReserveError::Inventory(InventoryError::UnknownVaccine(_)))
        ));
        assert_eq!(
            sched.availability().find_candidate(date("2022-01-01")),
            Some("car1")
        );
    }

    #[test]
    fn reserve_picks_smallest_caregiver_username() {
        let mut sched = Scheduler::new();
        sched.add_doses("Pfizer", 2).unwrap();
        sched.upload_availability(date("2022-01-01"), "zoe").unwrap();
        sched.upload_availability(date("2022-01-01"), "abe").unwrap();

        let confirmation = sched.reserve("pat1", date("2022-01-01"), "Pfizer").unwrap();
        assert_eq!(confirmation.caregiver, "abe");

        let confirmation = sched.reserve("pat2", date("2022-01-01"), "Pfizer").unwrap();
        assert_eq!(confirmation.caregiver, "zoe");
    }

    #[test]
    fn single_slot_is_never_double_booked() {
        let mut sched = Scheduler::new();
        sched.add_doses("Pfizer", 10).unwrap();
        sched
            .upload_availability(date("2022-01-01"), "car1")
            .unwrap();

        sched.reserve("pat1", date("2022-01-01"), "Pfizer").unwrap();
        let result = sched.reserve("pat2", date("2022-01-01"), "Pfizer");
        assert!(matches!(result, Err(ReserveError::NoCaregiverAvailable(_))));
        assert_eq!(sched.appointments().len(), 1);
        assert_eq!(sched.inventory().query("Pfizer").unwrap(), 9);
    }

    #[test]
    fn appointment_ids_are_unique_and_increasing() {
        let mut sched = Scheduler::new();
        sched.add_doses("Pfizer", 3).unwrap();
        sched
            .upload_availability(date("2022-01-01"), "car1")
            .unwrap();
        sched
            .upload_availability(date("2022-01-02"), "car1")
            .unwrap();
        sched
            .upload_availability(date("2022-01-03"), "car1")
            .unwrap();

        let a = sched.reserve("pat1", date("2022-01-01"), "Pfizer").unwrap();
        let b = sched.reserve("pat1", date("2022-01-02"), "Pfizer").unwrap();
        let c = sched.reserve("pat1", date("2022-01-03"), "Pfizer").unwrap();
        assert!(a.appointment_id < b.appointment_id);
        assert!(b.appointment_id < c.appointment_id);
    }

    // cancel

    #[test]
    fn cancel_restores_dose_and_slot() {
        let mut sched = single_slot_single_dose();
        let confirmation = sched.reserve("pat1", date("2022-01-01"), "Pfizer").unwrap();

        sched.cancel(confirmation.appointment_id, "pat1").unwrap();

        assert!(sched.appointments().is_empty());
        assert_eq!(sched.inventory().query("Pfizer").unwrap(), 1);
        assert_eq!(
            sched.availability().find_candidate(date("2022-01-01")),
            Some("car1")
        );

        // The restored slot and dose are claimable again.
        sched.reserve("pat2", date("2022-01-01"), "Pfizer").unwrap();
        assert_eq!(sched.appointments().len(), 1);
    }

    #[test]
    fn caregiver_may_cancel_too() {
        let mut sched = single_slot_single_dose();
        let confirmation = sched.reserve("pat1", date("2022-01-01"), "Pfizer").unwrap();
        sched.cancel(confirmation.appointment_id, "car1").unwrap();
        assert!(sched.appointments().is_empty());
    }

    #[test]
    fn cancel_by_non_participant_fails() {
        let mut sched = single_slot_single_dose();
        let confirmation = sched.reserve("pat1", date("2022-01-01"), "Pfizer").unwrap();

        let result = sched.cancel(confirmation.appointment_id, "pat2");
        assert!(matches!(result, Err(CancelError::NotParticipant { .. })));
        assert_eq!(sched.appointments().len(), 1);
        assert_eq!(sched.inventory().query("Pfizer").unwrap(), 0);
    }

    #[test]
    fn cancel_unknown_appointment_fails() {
        let mut sched = Scheduler::new();
        assert!(matches!(
            sched.cancel(42, "pat1"),
            Err(CancelError::NotFound(42))
        ));
    }

    #[test]
    fn cancel_tolerates_reuploaded_slot() {
        let mut sched = single_slot_single_dose();
        let confirmation = sched.reserve("pat1", date("2022-01-01"), "Pfizer").unwrap();
        sched
            .upload_availability(date("2022-01-01"), "car1")
            .unwrap();

        sched.cancel(confirmation.appointment_id, "pat1").unwrap();

        let caregivers: Vec<_> = sched.availability().for_date(date("2022-01-01")).collect();
        assert_eq!(caregivers, vec!["car1"]);
        assert_eq!(sched.inventory().query("Pfizer").unwrap(), 1);
    }

    // schedule_for_date

    #[test]
    fn schedule_lists_caregiver_vaccine_cross_product() {
        let mut sched = Scheduler::new();
        sched.add_doses("Pfizer", 5).unwrap();
        sched.add_doses("Moderna", 3).unwrap();
        sched.upload_availability(date("2022-01-01"), "car2").unwrap();
        sched.upload_availability(date("2022-01-01"), "car1").unwrap();
        sched.upload_availability(date("2022-01-02"), "car3").unwrap();

        let rows: Vec<_> = sched.schedule_for_date(date("2022-01-01")).collect();
        assert_eq!(
            rows,
            vec![
                ("car1", "Moderna", 3),
                ("car1", "Pfizer", 5),
                ("car2", "Moderna", 3),
                ("car2", "Pfizer", 5),
            ]
        );
    }

    // apply / run

    #[test]
    fn apply_dispatches_commands() {
        let mut sched = Scheduler::new();
        sched
            .apply(Command::AddDoses {
                vaccine: "Pfizer".into(),
                amount: 1,
            })
            .unwrap();
        sched
            .apply(Command::UploadAvailability {
                date: date("2022-01-01"),
                caregiver: "car1".into(),
            })
            .unwrap();
        sched
            .apply(Command::Reserve {
                patient: "pat1".into(),
                date: date("2022-01-01"),
                vaccine: "Pfizer".into(),
            })
            .unwrap();

        assert_eq!(sched.appointments().len(), 1);

        let result = sched.apply(Command::Cancel {
            id: 999,
            requester: "pat1".into(),
        });
        assert!(matches!(
            result,
            Err(EngineError::Cancel(CancelError::NotFound(999)))
        ));
    }

    #[tokio::test]
    async fn run_skips_failed_commands_and_continues() {
        let mut sched = Scheduler::new();
        let commands = vec![
            Command::AddDoses {
                vaccine: "Pfizer".into(),
                amount: 2,
            },
            Command::UploadAvailability {
                date: date("2022-01-01"),
                caregiver: "car1".into(),
            },
            // Duplicate upload, skipped.
            Command::UploadAvailability {
                date: date("2022-01-01"),
                caregiver: "car1".into(),
            },
            Command::Reserve {
                patient: "pat1".into(),
                date: date("2022-01-01"),
                vaccine: "Pfizer".into(),
            },
            // Slot consumed above, skipped.
            Command::Reserve {
                patient: "pat2".into(),
                date: date("2022-01-01"),
                vaccine: "Pfizer".into(),
            },
        ];

        sched.run(tokio_stream::iter(commands)).await;

        assert_eq!(sched.appointments().len(), 1);
        assert_eq!(sched.inventory().query("Pfizer").unwrap(), 1);
    }

    // concurrency: one dose, two slots, two racing claims

    #[tokio::test]
    async fn racing_reservations_for_last_dose_yield_one_appointment() {
        let mut sched = Scheduler::new();
        sched.add_doses("Pfizer", 1).unwrap();
        sched
            .upload_availability(date("2022-01-01"), "car1")
            .unwrap();
        sched
            .upload_availability(date("2022-01-01"), "car2")
            .unwrap();

        let shared = Arc::new(Mutex::new(sched));
        let mut tasks = Vec::new();
        for patient in ["pat1", "pat2"] {
            let shared = Arc::clone(&shared);
            tasks.push(tokio::spawn(async move {
                let mut sched = shared.lock().await;
                sched.reserve(patient, date("2022-01-01"), "Pfizer")
            }));
        }

        let mut successes = 0;
        let mut no_doses = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => successes += 1,
                Err(ReserveError::NoDosesAvailable(_)) => no_doses += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(no_doses, 1);

        let sched = shared.lock().await;
        assert_eq!(sched.appointments().len(), 1);
        assert_eq!(sched.inventory().query("Pfizer").unwrap(), 0);
    }
}
