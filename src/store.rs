//! JSON snapshot persistence for the whole application state.

use std::fs;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Scheduler;
use crate::accounts::Accounts;

/// Errors that can occur when loading or saving a snapshot.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state file i/o failed: {0}")]
    Io(#[from] io::Error),

    #[error("state file is not valid: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Everything that survives a restart: accounts, the three ledgers and the
/// appointment id counter (inside the scheduler).
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct State {
    pub accounts: Accounts,
    pub scheduler: Scheduler,
}

/// Snapshot file handle. With no path, the application runs ephemeral and
/// saves are no-ops.
#[derive(Debug)]
pub struct Store {
    path: Option<PathBuf>,
}

impl Store {
    pub fn ephemeral() -> Self {
        Self { path: None }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Load the persisted state, or the default state if the file does not
    /// exist yet.
    pub fn load(&self) -> Result<State, StoreError> {
        let Some(path) = &self.path else {
            return Ok(State::default());
        };
        match fs::read_to_string(path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(State::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write the state snapshot. A failure leaves the previous file intact:
    /// the snapshot is written to a sibling temp file first and renamed over.
    pub fn save(&self, state: &State) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(state)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}
