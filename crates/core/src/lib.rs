//! hypr-sessions Core
//!
//! Platform-agnostic session model for saving and restoring a Hyprland desktop.
//!
//! This crate holds:
//! - The persisted [`Session`] / [`WindowRecord`] model and its JSON shape
//! - The live view of the window manager ([`LiveWindow`], [`WorkspaceInfo`])
//! - The capability traits the capture and restore engines are written against
//!   ([`WindowManager`], [`ProcessInspector`], [`Launcher`], [`Clock`])

mod backend;
mod session;

pub use backend::{
    BackendError, Clock, LaunchError, Launcher, ProcessInspector, SystemClock, WindowManager,
    MAX_ANCESTRY_DEPTH,
};
pub use session::{PwaInfo, Session, WindowRecord};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a live window.
/// On Hyprland this is the client address (`0x…`) parsed as u64.
pub type WindowId = u64;

/// A position in layout coordinates (pixels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    /// Create a new point.
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A window size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    /// Create a new size.
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// A window as currently reported by the window manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveWindow {
    /// Window identifier, valid only for the lifetime of the window.
    pub id: WindowId,
    /// Runtime window class.
    pub class: String,
    /// Current title.
    pub title: String,
    /// Launcher-level identity (Hyprland's initial class).
    pub app_id: String,
    /// Workspace the window lives on.
    pub workspace_id: i32,
    /// Workspace name; `special:<name>` for scratchpads.
    pub workspace_name: String,
    /// Whether the window is floating.
    pub floating: bool,
    pub position: Point,
    pub size: Size,
    /// Owning process, if the window manager knows it.
    pub pid: Option<u32>,
}

/// A workspace as reported by the window manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceInfo {
    pub id: i32,
    pub name: String,
    /// Name of the monitor the workspace is shown on.
    pub monitor: String,
    /// Number of windows on the workspace.
    pub windows: usize,
}

impl WorkspaceInfo {
    /// Special workspaces (scratchpads) use non-positive ids.
    pub fn is_special(&self) -> bool {
        self.id <= 0
    }
}

/// Destination of a workspace move.
///
/// Regular workspaces are addressed by id. Special workspaces have
/// non-positive ids that only mean something to the running compositor, so
/// they are addressed by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkspaceTarget {
    pub id: i32,
    pub name: Option<String>,
}

impl WorkspaceTarget {
    pub fn new(id: i32, name: Option<String>) -> Self {
        Self { id, name }
    }

    pub fn is_special(&self) -> bool {
        self.id <= 0
    }
}

impl From<i32> for WorkspaceTarget {
    fn from(id: i32) -> Self {
        Self { id, name: None }
    }
}

impl fmt::Display for WorkspaceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) if self.is_special() => f.write_str(name),
            _ => write!(f, "{}", self.id),
        }
    }
}
