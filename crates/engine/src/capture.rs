//! Capture engine: live windows to a [`Session`].

use crate::config::{CaptureConfig, Config};
use crate::error::Result;
use crate::pwa::PwaDetector;
use hyprsession_core::{LiveWindow, ProcessInspector, Session, WindowManager, WindowRecord};
use tracing::{debug, info, Level};

/// Snapshot every eligible window, in window manager order.
///
/// Fails only when the window list itself cannot be read; per-window lookups
/// (command line, working directory) degrade to absent fields.
pub fn capture(
    windows: &dyn WindowManager,
    processes: &dyn ProcessInspector,
    config: &Config,
) -> Result<Session> {
    let detector = PwaDetector::new(&config.capture, &config.mapping)?;
    let live = windows.list_windows()?;

    if tracing::enabled!(Level::DEBUG) {
        log_workspaces(windows);
    }

    let mut skipped = 0;
    let mut records = Vec::with_capacity(live.len());
    for window in &live {
        if let Some(reason) = skip_reason(window, &config.capture) {
            debug!("Skipping {:#x} ({}): {}", window.id, window.class, reason);
            skipped += 1;
            continue;
        }
        records.push(capture_window(window, processes, &detector, &config.capture));
    }

    info!("Captured {} windows ({} skipped)", records.len(), skipped);
    Ok(Session::new(records))
}

fn log_workspaces(windows: &dyn WindowManager) {
    match windows.list_workspaces() {
        Ok(workspaces) => {
            for ws in &workspaces {
                debug!(
                    "Workspace {} '{}' on {}: {} windows",
                    ws.id, ws.name, ws.monitor, ws.windows
                );
            }
        }
        Err(e) => debug!("Workspace query failed: {}", e),
    }
}

fn skip_reason(window: &LiveWindow, capture: &CaptureConfig) -> Option<&'static str> {
    if window.workspace_id <= 0 && !capture.include_special_workspaces {
        Some("special workspace")
    } else if capture.is_ignored(&window.class) || capture.is_ignored(&window.app_id) {
        Some("ignored class")
    } else if window.class.is_empty() && window.app_id.is_empty() {
        Some("no class")
    } else {
        None
    }
}

fn capture_window(
    window: &LiveWindow,
    processes: &dyn ProcessInspector,
    detector: &PwaDetector,
    capture: &CaptureConfig,
) -> WindowRecord {
    let pwa_info = detector.detect(window, processes);

    let is_terminal = capture.is_terminal(&window.class) || capture.is_terminal(&window.app_id);
    let working_directory = if pwa_info.is_none() && is_terminal {
        window
            .pid
            .and_then(|pid| terminal_working_directory(processes, pid))
    } else {
        None
    };

    // Special workspace ids are per-session; only the name survives a restart.
    let workspace_name = if window.workspace_id <= 0 && !window.workspace_name.is_empty() {
        Some(window.workspace_name.clone())
    } else {
        None
    };

    WindowRecord {
        window_class: window.class.clone(),
        window_title: window.title.clone(),
        app_id: window.app_id.clone(),
        workspace_id: window.workspace_id,
        workspace_name,
        is_floating: window.floating,
        position: window.position,
        size: window.size,
        working_directory,
        pwa_info,
    }
}

/// Working directory of what is running inside a terminal.
///
/// The newest child of the terminal is its most recent shell. When that shell
/// has handed the terminal to a foreground job (an editor, a REPL), the job's
/// directory is the one the user sees.
pub fn terminal_working_directory(processes: &dyn ProcessInspector, terminal_pid: u32) -> Option<String> {
    let shell = *processes.children(terminal_pid).last()?;
    let target = processes
        .foreground_process(shell)
        .filter(|&fg| processes.is_descendant(fg, shell))
        .unwrap_or(shell);

    let cwd = processes
        .working_directory(target)
        .or_else(|| processes.working_directory(shell))?;
    Some(cwd.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyprsession_core::{BackendError, Point, Size, WindowId, WorkspaceInfo, WorkspaceTarget};
    use std::cell::Cell;
    use std::collections::HashMap;
    use std::path::PathBuf;

    #[derive(Default)]
    struct Procs {
        parents: HashMap<u32, u32>,
        cwds: HashMap<u32, PathBuf>,
        foreground: HashMap<u32, u32>,
    }

    impl ProcessInspector for Procs {
        fn command_line(&self, _pid: u32) -> Option<Vec<String>> {
            None
        }
        fn parent(&self, pid: u32) -> Option<u32> {
            self.parents.get(&pid).copied()
        }
        fn children(&self, pid: u32) -> Vec<u32> {
            let mut kids: Vec<u32> = self
                .parents
                .iter()
                .filter(|(_, &p)| p == pid)
                .map(|(&c, _)| c)
                .collect();
            kids.sort_unstable();
            kids
        }
        fn foreground_process(&self, pid: u32) -> Option<u32> {
            self.foreground.get(&pid).copied()
        }
        fn working_directory(&self, pid: u32) -> Option<PathBuf> {
            self.cwds.get(&pid).cloned()
        }
    }

    struct Windows {
        live: Vec<LiveWindow>,
        workspace_queries: Cell<u32>,
    }

    impl Windows {
        fn new(live: Vec<LiveWindow>) -> Self {
            Self {
                live,
                workspace_queries: Cell::new(0),
            }
        }
    }

    impl WindowManager for Windows {
        fn list_windows(&self) -> std::result::Result<Vec<LiveWindow>, BackendError> {
            Ok(self.live.clone())
        }
        fn list_workspaces(&self) -> std::result::Result<Vec<WorkspaceInfo>, BackendError> {
            self.workspace_queries.set(self.workspace_queries.get() + 1);
            Err(BackendError::Unavailable("not scripted".to_string()))
        }
        fn move_to_workspace(
            &self,
            _: WindowId,
            _: &WorkspaceTarget,
        ) -> std::result::Result<(), BackendError> {
            unreachable!()
        }
        fn set_floating(&self, _: WindowId, _: bool) -> std::result::Result<(), BackendError> {
            unreachable!()
        }
        fn resize(&self, _: WindowId, _: Size) -> std::result::Result<(), BackendError> {
            unreachable!()
        }
        fn move_window(&self, _: WindowId, _: Point) -> std::result::Result<(), BackendError> {
            unreachable!()
        }
    }

    fn window(id: WindowId, class: &str, workspace_id: i32, pid: u32) -> LiveWindow {
        LiveWindow {
            id,
            class: class.to_string(),
            title: format!("{class} title"),
            app_id: class.to_string(),
            workspace_id,
            workspace_name: if workspace_id > 0 {
                workspace_id.to_string()
            } else {
                "special:scratch".to_string()
            },
            floating: false,
            position: Point::new(5, 6),
            size: Size::new(700, 500),
            pid: Some(pid),
        }
    }

    #[test]
    fn test_terminal_cwd_prefers_foreground_job() {
        let mut procs = Procs::default();
        // alacritty 100 -> zsh 110 (old), zsh 120 (new) -> nvim 130
        procs.parents.extend([(110, 100), (120, 100), (130, 120)]);
        procs.cwds.insert(110, PathBuf::from("/home/u"));
        procs.cwds.insert(120, PathBuf::from("/home/u/proj"));
        procs.cwds.insert(130, PathBuf::from("/home/u/proj/src"));

        assert_eq!(
            terminal_working_directory(&procs, 100).as_deref(),
            Some("/home/u/proj")
        );

        procs.foreground.insert(120, 130);
        assert_eq!(
            terminal_working_directory(&procs, 100).as_deref(),
            Some("/home/u/proj/src")
        );
    }

    #[test]
    fn test_terminal_cwd_ignores_unrelated_foreground() {
        let mut procs = Procs::default();
        procs.parents.insert(110, 100);
        procs.cwds.insert(110, PathBuf::from("/srv"));
        procs.foreground.insert(110, 999);
        assert_eq!(terminal_working_directory(&procs, 100).as_deref(), Some("/srv"));
    }

    #[test]
    fn test_terminal_without_children() {
        let procs = Procs::default();
        assert_eq!(terminal_working_directory(&procs, 100), None);
    }

    #[test]
    fn test_capture_skips_and_orders() {
        let mut procs = Procs::default();
        procs.parents.insert(11, 10);
        procs.cwds.insert(11, PathBuf::from("/home/u/proj"));
        procs.cwds.insert(20, PathBuf::from("/should/not/appear"));

        let wm = Windows::new(vec![
            window(0x1, "Alacritty", 2, 10),
            window(0x2, "waybar", 1, 30),
            window(0x3, "firefox", 1, 20),
            window(0x4, "pavucontrol", -98, 40),
        ]);

        let session = capture(&wm, &procs, &Config::default()).unwrap();
        let classes: Vec<&str> = session.iter().map(|r| r.window_class.as_str()).collect();
        assert_eq!(classes, vec!["Alacritty", "firefox"]);

        let terminal = &session.records()[0];
        assert_eq!(terminal.working_directory.as_deref(), Some("/home/u/proj"));
        assert_eq!(terminal.workspace_id, 2);
        assert_eq!(terminal.size, Size::new(700, 500));
        assert_eq!(terminal.workspace_name, None);
        assert_eq!(session.records()[1].working_directory, None);
    }

    #[test]
    fn test_capture_queries_windows_once() {
        // No subscriber is installed here, so debug logging is off.
        let wm = Windows::new(vec![window(0x1, "firefox", 1, 20)]);
        capture(&wm, &Procs::default(), &Config::default()).unwrap();
        assert_eq!(wm.workspace_queries.get(), 0);
    }

    #[test]
    fn test_capture_special_workspaces_when_enabled() {
        let wm = Windows::new(vec![window(0x4, "pavucontrol", -98, 40)]);
        let mut config = Config::default();
        config.capture.include_special_workspaces = true;
        let session = capture(&wm, &Procs::default(), &config).unwrap();
        assert_eq!(session.len(), 1);
        let record = &session.records()[0];
        assert_eq!(record.workspace_id, -98);
        assert_eq!(record.workspace_name.as_deref(), Some("special:scratch"));
        assert_eq!(
            record.workspace_target(),
            WorkspaceTarget::new(-98, Some("special:scratch".to_string()))
        );
    }
}
