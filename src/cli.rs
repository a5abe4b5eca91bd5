//! Interactive command surface: line parsing and session-gated dispatch.
//!
//! The command loop is deliberately thin: it authenticates, parses and
//! renders messages, and forwards everything else to the engine. Login
//! produces a [`Session`] held by the [`App`]; core calls receive the
//! session's username explicitly.

use chrono::NaiveDate;
use thiserror::Error;
use tracing::warn;

use crate::accounts::{AccountError, Session};
use crate::engine::ReserveError;
use crate::model::{AppointmentId, DoseCount};
use crate::store::{State, Store, StoreError};

pub const GREETING: &str = "\
Welcome to the COVID-19 Vaccine Reservation Scheduling Application!
*** Please enter one of the following commands ***
> create_patient <username> <password>
> create_caregiver <username> <password>
> login_patient <username> <password>
> login_caregiver <username> <password>
> search_caregiver_schedule <date>
> reserve <date> <vaccine>
> upload_availability <date>
> cancel <appointment_id>
> add_doses <vaccine> <number>
> show_appointments
> logout
> quit";

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    CreatePatient { username: String, password: String },
    CreateCaregiver { username: String, password: String },
    LoginPatient { username: String, password: String },
    LoginCaregiver { username: String, password: String },
    SearchCaregiverSchedule { date: NaiveDate },
    Reserve { date: NaiveDate, vaccine: String },
    UploadAvailability { date: NaiveDate },
    Cancel { id: AppointmentId },
    AddDoses { vaccine: String, amount: DoseCount },
    ShowAppointments,
    Logout,
    Quit,
}

/// Errors that can occur when parsing a command line.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("empty input")]
    Empty,

    #[error("invalid operation name '{0}'")]
    UnknownCommand(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("invalid date '{0}'")]
    BadDate(String),

    #[error("invalid number '{0}'")]
    BadNumber(String),
}

fn parse_date(token: &str) -> Result<NaiveDate, ParseError> {
    token
        .parse()
        .map_err(|_| ParseError::BadDate(token.to_string()))
}

/// Parse one command line.
pub fn parse(line: &str) -> Result<CliCommand, ParseError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let (&operation, args) = tokens.split_first().ok_or(ParseError::Empty)?;

    let credentials = |usage: &'static str| match args {
        [username, password] => Ok((username.to_string(), password.to_string())),
        _ => Err(ParseError::Usage(usage)),
    };

    match operation {
        "create_patient" => {
            let (username, password) = credentials("create_patient <username> <password>")?;
            Ok(CliCommand::CreatePatient { username, password })
        }
        "create_caregiver" => {
            let (username, password) = credentials("create_caregiver <username> <password>")?;
            Ok(CliCommand::CreateCaregiver { username, password })
        }
        "login_patient" => {
            let (username, password) = credentials("login_patient <username> <password>")?;
            Ok(CliCommand::LoginPatient { username, password })
        }
        "login_caregiver" => {
            let (username, password) = credentials("login_caregiver <username> <password>")?;
            Ok(CliCommand::LoginCaregiver { username, password })
        }
        "search_caregiver_schedule" => match args {
            [date] => Ok(CliCommand::SearchCaregiverSchedule {
                date: parse_date(date)?,
            }),
            _ => Err(ParseError::Usage("search_caregiver_schedule <date>")),
        },
        "reserve" => match args {
            [date, vaccine] => Ok(CliCommand::Reserve {
                date: parse_date(date)?,
                vaccine: vaccine.to_string(),
            }),
            _ => Err(ParseError::Usage("reserve <date> <vaccine>")),
        },
        "upload_availability" => match args {
            [date] => Ok(CliCommand::UploadAvailability {
                date: parse_date(date)?,
            }),
            _ => Err(ParseError::Usage("upload_availability <date>")),
        },
        "cancel" => match args {
            [id] => Ok(CliCommand::Cancel {
                id: id.parse().map_err(|_| ParseError::BadNumber(id.to_string()))?,
            }),
            _ => Err(ParseError::Usage("cancel <appointment_id>")),
        },
        "add_doses" => match args {
            [vaccine, amount] => Ok(CliCommand::AddDoses {
                vaccine: vaccine.to_string(),
                amount: amount
                    .parse()
                    .map_err(|_| ParseError::BadNumber(amount.to_string()))?,
            }),
            _ => Err(ParseError::Usage("add_doses <vaccine> <number>")),
        },
        "show_appointments" => Ok(CliCommand::ShowAppointments),
        "logout" => Ok(CliCommand::Logout),
        "quit" => Ok(CliCommand::Quit),
        other => Err(ParseError::UnknownCommand(other.to_string())),
    }
}

/// What the loop should do after a line was handled.
#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Reply(String),
    Quit(String),
}

/// The interactive application: persisted state plus the current session.
#[derive(Debug)]
pub struct App {
    store: Store,
    state: State,
    session: Option<Session>,
}

impl App {
    /// Load persisted state from the store and start logged out.
    pub fn load(store: Store) -> Result<Self, StoreError> {
        let state = store.load()?;
        Ok(Self {
            store,
            state,
            session: None,
        })
    }

    /// Handle one input line and produce the reply to print. No input ever
    /// terminates the loop except `quit`.
    pub fn handle_line(&mut self, line: &str) -> Flow {
        let cmd = match parse(line) {
            Ok(cmd) => cmd,
            Err(ParseError::Empty) => return Flow::Reply(String::new()),
            Err(ParseError::UnknownCommand(_)) => {
                return Flow::Reply("Invalid operation name!".into());
            }
            Err(ParseError::BadDate(_)) => {
                return Flow::Reply("Please enter a valid date!".into());
            }
            Err(ParseError::BadNumber(_)) => {
                return Flow::Reply("Please enter a valid number!".into());
            }
            Err(e @ ParseError::Usage(_)) => return Flow::Reply(e.to_string()),
        };

        match cmd {
            CliCommand::CreatePatient { username, password } => {
                let result = self.state.accounts.create_patient(&username, &password);
                Flow::Reply(self.render_created(&username, result))
            }
            CliCommand::CreateCaregiver { username, password } => {
                let result = self.state.accounts.create_caregiver(&username, &password);
                Flow::Reply(self.render_created(&username, result))
            }
            CliCommand::LoginPatient { username, password } => {
                Flow::Reply(self.login(|state| state.accounts.login_patient(&username, &password)))
            }
            CliCommand::LoginCaregiver { username, password } => Flow::Reply(
                self.login(|state| state.accounts.login_caregiver(&username, &password)),
            ),
            CliCommand::SearchCaregiverSchedule { date } => {
                if self.session.is_none() {
                    return Flow::Reply("Please login first!".into());
                }
                let mut out = String::from("Available caregivers and vaccines:");
                for (caregiver, vaccine, doses) in self.state.scheduler.schedule_for_date(date) {
                    out.push_str(&format!("\n{caregiver} {vaccine} {doses}"));
                }
                Flow::Reply(out)
            }
            CliCommand::Reserve { date, vaccine } => {
                let Some(session) = &self.session else {
                    return Flow::Reply("Please login first!".into());
                };
                if !session.is_patient() {
                    return Flow::Reply("Please login as a patient!".into());
                }
                let patient = session.username.clone();
                let reply = match self.state.scheduler.reserve(&patient, date, &vaccine) {
                    Ok(confirmation) => {
                        self.persist();
                        format!(
                            "Appointment ID: {}, Caregiver username: {}",
                            confirmation.appointment_id, confirmation.caregiver
                        )
                    }
                    Err(ReserveError::NoCaregiverAvailable(_)) => {
                        "No Caregiver is available!".into()
                    }
                    Err(ReserveError::NoDosesAvailable(_)) => {
                        "Not enough available doses!".into()
                    }
                    Err(e) => e.to_string(),
                };
                Flow::Reply(reply)
            }
            CliCommand::UploadAvailability { date } => {
                let Some(session) = &self.session else {
                    return Flow::Reply("Please login as a caregiver first!".into());
                };
                if !session.is_caregiver() {
                    return Flow::Reply("Please login as a caregiver first!".into());
                }
                let caregiver = session.username.clone();
                let reply = match self.state.scheduler.upload_availability(date, &caregiver) {
                    Ok(()) => {
                        self.persist();
                        "Availability uploaded!".into()
                    }
                    Err(e) => e.to_string(),
                };
                Flow::Reply(reply)
            }
            CliCommand::Cancel { id } => {
                let Some(session) = &self.session else {
                    return Flow::Reply("Please login first!".into());
                };
                let requester = session.username.clone();
                let reply = match self.state.scheduler.cancel(id, &requester) {
                    Ok(()) => {
                        self.persist();
                        format!("Appointment {id} canceled.")
                    }
                    Err(e) => e.to_string(),
                };
                Flow::Reply(reply)
            }
            CliCommand::AddDoses { vaccine, amount } => {
                let Some(session) = &self.session else {
                    return Flow::Reply("Please login as a caregiver first!".into());
                };
                if !session.is_caregiver() {
                    return Flow::Reply("Please login as a caregiver first!".into());
                }
                let reply = match self.state.scheduler.add_doses(&vaccine, amount) {
                    Ok(_) => {
                        self.persist();
                        "Doses updated!".into()
                    }
                    Err(e) => e.to_string(),
                };
                Flow::Reply(reply)
            }
            CliCommand::ShowAppointments => {
                let Some(session) = &self.session else {
                    return Flow::Reply("Please login first!".into());
                };
                let appointments = self.state.scheduler.appointments();
                let mut out = String::new();
                if session.is_patient() {
                    for appt in appointments.for_patient(&session.username) {
                        out.push_str(&format!(
                            "{} {} {} {}\n",
                            appt.id, appt.vaccine, appt.date, appt.caregiver
                        ));
                    }
                } else {
                    for appt in appointments.for_caregiver(&session.username) {
                        out.push_str(&format!(
                            "{} {} {} {}\n",
                            appt.id, appt.vaccine, appt.date, appt.patient
                        ));
                    }
                }
                Flow::Reply(out.trim_end().to_string())
            }
            CliCommand::Logout => {
                if self.session.take().is_none() {
                    Flow::Reply("No user logged in!".into())
                } else {
                    Flow::Reply("Successfully logged out!".into())
                }
            }
            CliCommand::Quit => {
                self.persist();
                Flow::Quit("Bye!".into())
            }
        }
    }

    fn render_created(&mut self, username: &str, result: Result<(), AccountError>) -> String {
        match result {
            Ok(()) => {
                self.persist();
                format!("Created user {username}")
            }
            Err(AccountError::WeakPassword) => "Password is not strong enough.".into(),
            Err(AccountError::UsernameTaken(_)) => "Username taken, try again!".into(),
            Err(e) => {
                warn!(username, error = %e, "account creation failed");
                "Failed to create user.".into()
            }
        }
    }

    fn login(
        &mut self,
        attempt: impl FnOnce(&State) -> Result<Session, AccountError>,
    ) -> String {
        if self.session.is_some() {
            return "User already logged in.".into();
        }
        match attempt(&self.state) {
            Ok(session) => {
                let username = session.username.clone();
                self.session = Some(session);
                format!("Logged in as: {username}")
            }
            Err(_) => "Login failed.".into(),
        }
    }

    /// Snapshot the state. I/O failures are logged, never fatal, and leave
    /// the in-memory state authoritative.
    fn persist(&self) {
        if let Err(e) = self.store.save(&self.state) {
            warn!(error = %e, "failed to save state snapshot");
        }
    }
}
