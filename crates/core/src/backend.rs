//! Capability traits for the outside world.
//!
//! Capture and restore never talk to Hyprland, `/proc` or `sh` directly; they
//! go through these traits so tests can script every collaborator.

use crate::{LiveWindow, Point, Size, WindowId, WorkspaceInfo, WorkspaceTarget};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Upper bound on parent links followed when checking process ancestry.
pub const MAX_ANCESTRY_DEPTH: usize = 64;

/// Errors reported by a window manager backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The control channel could not be reached or answered garbage.
    #[error("window manager unavailable: {0}")]
    Unavailable(String),

    /// The window manager refused a command, usually because the window is gone.
    #[error("command `{command}` rejected: {reply}")]
    CommandRejected { command: String, reply: String },
}

/// Query and control interface over the window manager.
///
/// Mutating calls are idempotent and fire-and-forget: success carries no payload.
pub trait WindowManager {
    /// All mapped windows, in the order the window manager reports them.
    fn list_windows(&self) -> Result<Vec<LiveWindow>, BackendError>;

    fn list_workspaces(&self) -> Result<Vec<WorkspaceInfo>, BackendError>;

    /// Move a window to a workspace without following it.
    fn move_to_workspace(
        &self,
        window: WindowId,
        workspace: &WorkspaceTarget,
    ) -> Result<(), BackendError>;

    fn set_floating(&self, window: WindowId, floating: bool) -> Result<(), BackendError>;

    fn resize(&self, window: WindowId, size: Size) -> Result<(), BackendError>;

    fn move_window(&self, window: WindowId, position: Point) -> Result<(), BackendError>;
}

/// Read-only view of the process table.
pub trait ProcessInspector {
    /// Full argv of a process.
    fn command_line(&self, pid: u32) -> Option<Vec<String>>;

    fn parent(&self, pid: u32) -> Option<u32>;

    /// Direct children, oldest first.
    fn children(&self, pid: u32) -> Vec<u32>;

    /// Leader of the foreground process group on the terminal `pid` is attached to.
    fn foreground_process(&self, _pid: u32) -> Option<u32> {
        None
    }

    fn working_directory(&self, pid: u32) -> Option<PathBuf>;

    /// Whether `pid` is `ancestor` or one of its descendants.
    fn is_descendant(&self, pid: u32, ancestor: u32) -> bool {
        let mut current = pid;
        for _ in 0..MAX_ANCESTRY_DEPTH {
            if current == ancestor {
                return true;
            }
            match self.parent(current) {
                Some(parent) if parent != current && parent != 0 => current = parent,
                _ => return false,
            }
        }
        false
    }
}

/// Errors that can occur when starting an application.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("working directory {} does not exist", .0.display())]
    MissingDirectory(PathBuf),

    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Starts applications detached from the caller.
pub trait Launcher {
    /// Spawn `command` and return its pid. The process is never waited on or killed.
    fn launch(&self, command: &str, cwd: Option<&Path>) -> Result<u32, LaunchError>;
}

/// Time source for the restore loop.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Tree(HashMap<u32, u32>);

    impl ProcessInspector for Tree {
        fn command_line(&self, _pid: u32) -> Option<Vec<String>> {
            None
        }

        fn parent(&self, pid: u32) -> Option<u32> {
            self.0.get(&pid).copied()
        }

        fn children(&self, pid: u32) -> Vec<u32> {
            let mut kids: Vec<u32> = self
                .0
                .iter()
                .filter(|(_, &parent)| parent == pid)
                .map(|(&child, _)| child)
                .collect();
            kids.sort_unstable();
            kids
        }

        fn working_directory(&self, _pid: u32) -> Option<PathBuf> {
            None
        }
    }

    #[test]
    fn test_is_descendant_walks_parents() {
        // 1 -> 100 (sh) -> 101 (app) -> 102 (helper)
        let tree = Tree(HashMap::from([(100, 1), (101, 100), (102, 101), (200, 1)]));
        assert!(tree.is_descendant(102, 100));
        assert!(tree.is_descendant(101, 101));
        assert!(!tree.is_descendant(200, 100));
        assert!(!tree.is_descendant(100, 101));
    }

    #[test]
    fn test_is_descendant_stops_on_cycle() {
        let tree = Tree(HashMap::from([(5, 6), (6, 5)]));
        assert!(!tree.is_descendant(5, 42));
    }

    #[test]
    fn test_default_foreground_is_none() {
        let tree = Tree(HashMap::new());
        assert_eq!(tree.foreground_process(1), None);
        assert_eq!(tree.children(1), Vec::<u32>::new());
    }

    #[test]
    fn test_system_clock_advances() {
        let clock = SystemClock;
        let start = clock.now();
        clock.sleep(Duration::from_millis(5));
        assert!(clock.now() >= start + Duration::from_millis(5));
    }

    #[test]
    fn test_error_messages() {
        let err = BackendError::CommandRejected {
            command: "dispatch settiled address:0x1".to_string(),
            reply: "No such window found".to_string(),
        };
        assert!(err.to_string().contains("No such window found"));

        let err = LaunchError::MissingDirectory(PathBuf::from("/nope"));
        assert_eq!(err.to_string(), "working directory /nope does not exist");
    }
}
