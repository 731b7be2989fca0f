//! Hyprland request-socket client.

use hyprsession_core::{
    BackendError, LiveWindow, Point, Size, WindowId, WindowManager, WorkspaceInfo,
    WorkspaceTarget,
};
use hyprsession_ipc::{
    dispatch_succeeded, parse_clients, parse_workspaces, socket_path_from_env,
    workspace_selector, Dispatch, HyprClient, Request, MAX_REPLY_SIZE,
};
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, trace};

/// Read/write timeout for one socket round trip.
pub const DEFAULT_SOCKET_TIMEOUT: Duration = Duration::from_secs(2);

/// Window manager backend talking to a running Hyprland instance.
#[derive(Debug, Clone)]
pub struct HyprlandClient {
    socket_path: PathBuf,
    timeout: Duration,
}

impl HyprlandClient {
    /// Client for an explicit socket path.
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            timeout: DEFAULT_SOCKET_TIMEOUT,
        }
    }

    /// Client for the instance named by `HYPRLAND_INSTANCE_SIGNATURE`.
    pub fn from_env() -> Result<Self, BackendError> {
        let path = socket_path_from_env().map_err(|e| BackendError::Unavailable(e.to_string()))?;
        Ok(Self::new(path))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Send one request and read the full reply.
    fn request(&self, request: &Request) -> Result<String, BackendError> {
        let unavailable = |what: &str, err: std::io::Error| {
            BackendError::Unavailable(format!(
                "{} {}: {}",
                what,
                self.socket_path.display(),
                err
            ))
        };

        let mut stream = UnixStream::connect(&self.socket_path)
            .map_err(|e| unavailable("failed to connect to", e))?;
        stream
            .set_read_timeout(Some(self.timeout))
            .map_err(|e| unavailable("failed to configure", e))?;
        stream
            .set_write_timeout(Some(self.timeout))
            .map_err(|e| unavailable("failed to configure", e))?;

        let encoded = request.encode();
        trace!("hyprland <- {}", encoded);
        stream
            .write_all(encoded.as_bytes())
            .map_err(|e| unavailable("failed to write to", e))?;

        let mut reply = Vec::new();
        stream
            .take(MAX_REPLY_SIZE as u64 + 1)
            .read_to_end(&mut reply)
            .map_err(|e| unavailable("failed to read from", e))?;
        if reply.len() > MAX_REPLY_SIZE {
            return Err(BackendError::Unavailable(format!(
                "reply to `{}` exceeds {} bytes",
                encoded, MAX_REPLY_SIZE
            )));
        }

        Ok(String::from_utf8_lossy(&reply).into_owned())
    }

    fn dispatch(&self, dispatch: Dispatch) -> Result<(), BackendError> {
        let command = dispatch.to_string();
        let reply = self.request(&Request::Dispatch(dispatch))?;
        if dispatch_succeeded(&reply) {
            debug!("dispatched {}", command);
            Ok(())
        } else {
            Err(BackendError::CommandRejected {
                command,
                reply: reply.trim().to_string(),
            })
        }
    }
}

/// Convert a `j/clients` entry into the backend-neutral window type.
pub fn live_window_from(client: &HyprClient) -> LiveWindow {
    let app_id = if client.initial_class.is_empty() {
        client.effective_class().to_string()
    } else {
        client.initial_class.clone()
    };
    LiveWindow {
        id: client.address,
        class: client.effective_class().to_string(),
        title: client.title.clone(),
        app_id,
        workspace_id: client.workspace.id,
        workspace_name: client.workspace.name.clone(),
        floating: client.floating,
        position: Point::new(client.at[0], client.at[1]),
        size: Size::new(client.size[0], client.size[1]),
        pid: client.process_id(),
    }
}

impl WindowManager for HyprlandClient {
    /// Lists mapped, visible clients. Unmapped and hidden windows (grouped
    /// tabs in the background, windows still initializing) are skipped.
    fn list_windows(&self) -> Result<Vec<LiveWindow>, BackendError> {
        let reply = self.request(&Request::Clients)?;
        let clients = parse_clients(&reply).map_err(|e| BackendError::Unavailable(e.to_string()))?;
        Ok(clients
            .iter()
            .filter(|c| c.mapped && !c.hidden)
            .map(live_window_from)
            .collect())
    }

    fn list_workspaces(&self) -> Result<Vec<WorkspaceInfo>, BackendError> {
        let reply = self.request(&Request::Workspaces)?;
        let workspaces =
            parse_workspaces(&reply).map_err(|e| BackendError::Unavailable(e.to_string()))?;
        Ok(workspaces
            .into_iter()
            .map(|ws| WorkspaceInfo {
                id: ws.id,
                name: ws.name,
                monitor: ws.monitor,
                windows: ws.windows,
            })
            .collect())
    }

    fn move_to_workspace(
        &self,
        window: WindowId,
        workspace: &WorkspaceTarget,
    ) -> Result<(), BackendError> {
        self.dispatch(Dispatch::MoveToWorkspaceSilent {
            workspace: workspace_selector(workspace.id, workspace.name.as_deref()),
            address: window,
        })
    }

    fn set_floating(&self, window: WindowId, floating: bool) -> Result<(), BackendError> {
        if floating {
            self.dispatch(Dispatch::SetFloating { address: window })
        } else {
            self.dispatch(Dispatch::SetTiled { address: window })
        }
    }

    fn resize(&self, window: WindowId, size: Size) -> Result<(), BackendError> {
        self.dispatch(Dispatch::ResizeExact {
            width: size.width,
            height: size.height,
            address: window,
        })
    }

    fn move_window(&self, window: WindowId, position: Point) -> Result<(), BackendError> {
        self.dispatch(Dispatch::MoveExact {
            x: position.x,
            y: position.y,
            address: window,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader};
    use std::os::unix::net::UnixListener;
    use std::thread;

    /// Serve one scripted reply per expected request, returning what was received.
    fn serve(dir: &Path, replies: Vec<&'static str>) -> (PathBuf, thread::JoinHandle<Vec<String>>) {
        let path = dir.join(".socket.sock");
        let listener = UnixListener::bind(&path).unwrap();
        let handle = thread::spawn(move || {
            let mut received = Vec::new();
            for reply in replies {
                let (mut stream, _) = listener.accept().unwrap();
                let mut line = String::new();
                // Requests are not newline-terminated; read what the client sent.
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let buf = reader.fill_buf().unwrap();
                line.push_str(&String::from_utf8_lossy(buf));
                received.push(line);
                stream.write_all(reply.as_bytes()).unwrap();
            }
            received
        });
        (path, handle)
    }

    #[test]
    fn test_list_windows_filters_unmapped() {
        let dir = tempfile::tempdir().unwrap();
        let reply = r#"[
            {"address": "0x10", "workspace": {"id": 1}, "class": "foot", "initialClass": "foot",
             "at": [0, 0], "size": [100, 100], "pid": 77},
            {"address": "0x20", "mapped": false, "workspace": {"id": 1}, "class": "ghost"},
            {"address": "0x30", "hidden": true, "workspace": {"id": 3}, "class": "tabbed"}
        ]"#;
        let (path, server) = serve(dir.path(), vec![reply]);

        let client = HyprlandClient::new(path);
        let windows = client.list_windows().unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].id, 0x10);
        assert_eq!(windows[0].class, "foot");
        assert_eq!(windows[0].pid, Some(77));

        let received = server.join().unwrap();
        assert_eq!(received, vec!["j/clients".to_string()]);
    }

    #[test]
    fn test_dispatch_rejected_on_error_reply() {
        let dir = tempfile::tempdir().unwrap();
        let (path, server) = serve(dir.path(), vec!["ok", "No such window found"]);

        let client = HyprlandClient::new(path);
        client.move_to_workspace(0xabc, &2.into()).unwrap();
        let err = client.set_floating(0xabc, false).unwrap_err();
        match err {
            BackendError::CommandRejected { command, reply } => {
                assert_eq!(command, "settiled address:0xabc");
                assert_eq!(reply, "No such window found");
            }
            other => panic!("expected CommandRejected, got {other:?}"),
        }

        let received = server.join().unwrap();
        assert_eq!(received[0], "dispatch movetoworkspacesilent 2,address:0xabc");
        assert_eq!(received[1], "dispatch settiled address:0xabc");
    }

    #[test]
    fn test_move_to_special_workspace_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let (path, server) = serve(dir.path(), vec!["ok"]);

        let client = HyprlandClient::new(path);
        let scratch = WorkspaceTarget::new(-98, Some("special:scratch".to_string()));
        client.move_to_workspace(0xabc, &scratch).unwrap();

        let received = server.join().unwrap();
        assert_eq!(
            received,
            vec!["dispatch movetoworkspacesilent special:scratch,address:0xabc".to_string()]
        );
    }

    #[test]
    fn test_missing_socket_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let client = HyprlandClient::new(dir.path().join("absent.sock"));
        assert!(matches!(
            client.list_windows(),
            Err(BackendError::Unavailable(_))
        ));
    }

    #[test]
    fn test_live_window_from_client() {
        let clients = hyprsession_ipc::parse_clients(
            r#"[{"address": "0x5", "workspace": {"id": 4}, "floating": true,
                 "class": "", "initialClass": "org.gnome.Nautilus", "title": "Files",
                 "at": [12, 34], "size": [640, 480], "pid": 900}]"#,
        )
        .unwrap();
        let window = live_window_from(&clients[0]);
        assert_eq!(window.class, "org.gnome.Nautilus");
        assert_eq!(window.app_id, "org.gnome.Nautilus");
        assert_eq!(window.workspace_id, 4);
        assert_eq!(window.workspace_name, "");
        assert!(window.floating);
        assert_eq!(window.position, Point::new(12, 34));
        assert_eq!(window.size, Size::new(640, 480));
    }
}
