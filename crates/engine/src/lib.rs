//! hypr-sessions Engine
//!
//! Turns a live Hyprland desktop into a saved [`Session`] and back.
//!
//! This crate handles:
//! - App mapping and settings (`session-apps.toml`)
//! - Capturing live windows, including PWA identity and terminal directories
//! - Resolving launch commands from the app mapping
//! - Relaunching a session and matching new windows to saved records
//! - Session file persistence
//!
//! Everything outside the process goes through the capability traits in
//! `hyprsession-core`, so both engines run unchanged against test fakes.

pub mod capture;
pub mod config;
pub mod error;
pub mod launch;
pub mod pwa;
pub mod report;
pub mod restore;
pub mod session_file;

pub use capture::{capture, terminal_working_directory};
pub use config::{
    default_config_path, default_session_path, AppMapping, CaptureConfig, Config, RestoreConfig,
    MAX_TIMEOUT_SECS, MIN_TIMEOUT_SECS,
};
pub use error::{Error, Result, EXIT_ENVIRONMENT, EXIT_OK, EXIT_RECORD_FAILURES};
pub use launch::{missing_mappings, resolve_command, CommandSource, LaunchPlan};
pub use pwa::PwaDetector;
pub use report::{
    Action, Failure, PlacementStep, RecordOutcome, RecordState, RejectedStep, RestoreReport,
    RestoreSummary,
};
pub use restore::{restore, Environment, Interrupt, RestoreOptions};
pub use session_file::{load_session, save_session};

pub use hyprsession_core::Session;
