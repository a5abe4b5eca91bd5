//! Patient and caregiver accounts.
//!
//! Credentials are stored as bcrypt hashes. A successful login yields an
//! explicit [`Session`] value that callers pass around; there is no ambient
//! "current user" state anywhere in the crate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum password length accepted at registration.
const MIN_PASSWORD_LEN: usize = 8;

/// The role a session was authenticated as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Patient,
    Caregiver,
}

/// An authenticated identity, produced by login and passed explicitly into
/// every call that needs one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub role: Role,
}

impl Session {
    pub fn is_patient(&self) -> bool {
        self.role == Role::Patient
    }

    pub fn is_caregiver(&self) -> bool {
        self.role == Role::Caregiver
    }
}

/// Error during account registration or login.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("username '{0}' is taken")]
    UsernameTaken(String),

    #[error("password is not strong enough")]
    WeakPassword,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

/// Registered patients and caregivers, keyed by username. The two
/// populations are independent; a username may exist in both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Accounts {
    patients: BTreeMap<String, String>,
    caregivers: BTreeMap<String, String>,
}

impl Accounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_patient(&mut self, username: &str, password: &str) -> Result<(), AccountError> {
        Self::register(&mut self.patients, username, password)
    }

    pub fn create_caregiver(&mut self, username: &str, password: &str) -> Result<(), AccountError> {
        Self::register(&mut self.caregivers, username, password)
    }

    pub fn login_patient(&self, username: &str, password: &str) -> Result<Session, AccountError> {
        Self::verify(&self.patients, username, password)?;
        Ok(Session {
            username: username.to_string(),
            role: Role::Patient,
        })
    }

    pub fn login_caregiver(&self, username: &str, password: &str) -> Result<Session, AccountError> {
        Self::verify(&self.caregivers, username, password)?;
        Ok(Session {
            username: username.to_string(),
            role: Role::Caregiver,
        })
    }

    fn register(
        table: &mut BTreeMap<String, String>,
        username: &str,
        password: &str,
    ) -> Result<(), AccountError> {
        if !password_is_strong(password) {
            return Err(AccountError::WeakPassword);
        }
        if table.contains_key(username) {
            return Err(AccountError::UsernameTaken(username.to_string()));
        }
        let hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)?;
        table.insert(username.to_string(), hash);
        Ok(())
    }

    fn verify(
        table: &BTreeMap<String, String>,
        username: &str,
        password: &str,
    ) -> Result<(), AccountError> {
        let hash = table
            .get(username)
            .ok_or(AccountError::InvalidCredentials)?;
        if !bcrypt::verify(password, hash)? {
            return Err(AccountError::InvalidCredentials);
        }
        Ok(())
    }
}

/// At least 8 characters with 2+ uppercase, 2+ lowercase, 2+ digits and one
/// special character.
fn password_is_strong(password: &str) -> bool {
    let mut upper = 0;
    let mut lower = 0;
    let mut digit = 0;
    let mut special = 0;
    for ch in password.chars() {
        if ch.is_ascii_uppercase() {
            upper += 1;
        } else if ch.is_ascii_lowercase() {
            lower += 1;
        } else if ch.is_ascii_digit() {
            digit += 1;
        } else {
            special += 1;
        }
    }
    password.len() >= MIN_PASSWORD_LEN && upper >= 2 && lower >= 2 && digit >= 2 && special >= 1
}
