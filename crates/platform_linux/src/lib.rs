//! hypr-sessions Platform (Linux)
//!
//! Concrete implementations of the capability traits from `hyprsession-core`.
//!
//! This crate handles:
//! - Window enumeration and placement over Hyprland's request socket
//! - Process table inspection via `/proc`
//! - Detached application launch through `sh -c`

mod hyprland;
mod launcher;
mod procfs;

pub use hyprland::{live_window_from, HyprlandClient, DEFAULT_SOCKET_TIMEOUT};
pub use launcher::ShellLauncher;
pub use procfs::{parse_stat, ProcFs, ProcStat};
