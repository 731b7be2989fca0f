//! Run-level errors.
//!
//! Per-window failures never surface here; they are collected in the
//! [`RestoreReport`](crate::RestoreReport). An [`Error`] means the run as a
//! whole could not proceed.

use hyprsession_core::BackendError;
use std::path::PathBuf;
use thiserror::Error;

/// Exit code for a run where every record reached its target state.
pub const EXIT_OK: i32 = 0;
/// Exit code for a run with at least one per-record failure.
pub const EXIT_RECORD_FAILURES: i32 = 1;
/// Exit code for a run that could not start or could not finish its I/O.
pub const EXIT_ENVIRONMENT: i32 = 3;

#[derive(Debug, Error)]
pub enum Error {
    #[error("window manager unavailable: {0}")]
    BackendUnavailable(String),

    #[error("invalid configuration {}: {message}", .path.display())]
    ConfigInvalid { path: PathBuf, message: String },

    #[error("invalid browser class pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("session file {}: {message}", .path.display())]
    SessionFile { path: PathBuf, message: String },
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        EXIT_ENVIRONMENT
    }
}

impl From<BackendError> for Error {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Unavailable(reason) => Error::BackendUnavailable(reason),
            rejected @ BackendError::CommandRejected { .. } => {
                Error::BackendUnavailable(rejected.to_string())
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
