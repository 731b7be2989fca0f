//! hypr-sessions IPC Protocol
//!
//! Wire types for Hyprland's request socket (`.socket.sock`).
//!
//! Each request is a single line written to a fresh connection; Hyprland
//! answers and closes the socket. Queries prefixed with `j/` answer JSON,
//! dispatches answer the literal `ok` or an error message.

use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the request socket inside the instance directory.
pub const SOCKET_NAME: &str = ".socket.sock";

/// Environment variable carrying the running Hyprland instance.
pub const INSTANCE_ENV: &str = "HYPRLAND_INSTANCE_SIGNATURE";

/// Maximum reply size accepted from the socket (4 MiB).
pub const MAX_REPLY_SIZE: usize = 4 * 1024 * 1024;

/// Reply Hyprland sends for a successful dispatch.
pub const DISPATCH_OK: &str = "ok";

/// Errors in locating the socket or decoding replies.
#[derive(Debug, Error)]
pub enum IpcError {
    #[error("HYPRLAND_INSTANCE_SIGNATURE is not set; is Hyprland running?")]
    NoInstance,

    #[error("invalid window address: {0}")]
    InvalidAddress(String),

    #[error("failed to parse reply: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Socket path for an instance signature.
///
/// Hyprland 0.40+ keeps its sockets under `$XDG_RUNTIME_DIR/hypr`; older
/// releases used `/tmp/hypr`.
pub fn socket_path(runtime_dir: Option<&Path>, signature: &str) -> PathBuf {
    let base = match runtime_dir {
        Some(dir) => dir.join("hypr"),
        None => PathBuf::from("/tmp/hypr"),
    };
    base.join(signature).join(SOCKET_NAME)
}

/// Socket path of the Hyprland instance this process runs under.
pub fn socket_path_from_env() -> Result<PathBuf, IpcError> {
    let signature = std::env::var(INSTANCE_ENV).map_err(|_| IpcError::NoInstance)?;
    if signature.trim().is_empty() {
        return Err(IpcError::NoInstance);
    }
    let runtime_dir = std::env::var_os("XDG_RUNTIME_DIR").map(PathBuf::from);
    let preferred = socket_path(runtime_dir.as_deref(), &signature);
    if runtime_dir.is_some() && !preferred.exists() {
        let legacy = socket_path(None, &signature);
        if legacy.exists() {
            return Ok(legacy);
        }
    }
    Ok(preferred)
}

/// Format a window address the way Hyprland expects it.
pub fn format_address(address: u64) -> String {
    format!("0x{:x}", address)
}

/// Parse a `0x…` window address.
pub fn parse_address(raw: &str) -> Result<u64, IpcError> {
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);
    u64::from_str_radix(digits, 16).map_err(|_| IpcError::InvalidAddress(raw.to_string()))
}

fn deserialize_address<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_address(&raw).map_err(serde::de::Error::custom)
}

/// Workspace argument for a dispatcher.
///
/// Hyprland reads a leading `-` or `+` as an offset from the current
/// workspace, so special workspaces (non-positive ids) are selected by name.
pub fn workspace_selector(id: i32, name: Option<&str>) -> String {
    if id > 0 {
        return id.to_string();
    }
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) if name == "special" || name.starts_with("special:") => name.to_string(),
        Some(name) => format!("special:{}", name),
        None => "special".to_string(),
    }
}

/// Requests sent to the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `j/clients`: every client window.
    Clients,
    /// `j/workspaces`: every workspace.
    Workspaces,
    /// `dispatch …`: a window-manager action.
    Dispatch(Dispatch),
}

impl Request {
    /// Encode the request as written to the socket.
    pub fn encode(&self) -> String {
        match self {
            Request::Clients => "j/clients".to_string(),
            Request::Workspaces => "j/workspaces".to_string(),
            Request::Dispatch(dispatch) => format!("dispatch {}", dispatch),
        }
    }
}

/// Dispatchers used to place restored windows.
///
/// Every variant targets an explicit address, so no focus change is needed
/// and commands for different windows can interleave freely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Move to a workspace without switching to it. `workspace` is a
    /// selector from [`workspace_selector`].
    MoveToWorkspaceSilent { workspace: String, address: u64 },
    SetFloating { address: u64 },
    SetTiled { address: u64 },
    /// Resize to an exact pixel size.
    ResizeExact { width: i32, height: i32, address: u64 },
    /// Move to an exact pixel position.
    MoveExact { x: i32, y: i32, address: u64 },
}

impl fmt::Display for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dispatch::MoveToWorkspaceSilent { workspace, address } => write!(
                f,
                "movetoworkspacesilent {},address:{}",
                workspace,
                format_address(*address)
            ),
            Dispatch::SetFloating { address } => {
                write!(f, "setfloating address:{}", format_address(*address))
            }
            Dispatch::SetTiled { address } => {
                write!(f, "settiled address:{}", format_address(*address))
            }
            Dispatch::ResizeExact {
                width,
                height,
                address,
            } => write!(
                f,
                "resizewindowpixel exact {} {},address:{}",
                width,
                height,
                format_address(*address)
            ),
            Dispatch::MoveExact { x, y, address } => write!(
                f,
                "movewindowpixel exact {} {},address:{}",
                x,
                y,
                format_address(*address)
            ),
        }
    }
}

/// Whether a dispatch reply reports success.
pub fn dispatch_succeeded(reply: &str) -> bool {
    reply.trim() == DISPATCH_OK
}

/// Workspace reference embedded in a client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorkspaceRef {
    pub id: i32,
    #[serde(default)]
    pub name: String,
}

/// One entry of the `j/clients` reply.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HyprClient {
    #[serde(deserialize_with = "deserialize_address")]
    pub address: u64,
    #[serde(default = "default_true")]
    pub mapped: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub at: [i32; 2],
    #[serde(default)]
    pub size: [i32; 2],
    pub workspace: WorkspaceRef,
    #[serde(default)]
    pub floating: bool,
    #[serde(default)]
    pub class: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "initialClass")]
    pub initial_class: String,
    #[serde(default, rename = "initialTitle")]
    pub initial_title: String,
    /// `-1` when Hyprland does not know the owning process.
    #[serde(default = "default_pid")]
    pub pid: i64,
}

impl HyprClient {
    /// Runtime class, falling back to the initial class for windows that
    /// have not announced one yet.
    pub fn effective_class(&self) -> &str {
        if self.class.is_empty() {
            &self.initial_class
        } else {
            &self.class
        }
    }

    /// Owning pid, if known.
    pub fn process_id(&self) -> Option<u32> {
        u32::try_from(self.pid).ok().filter(|&pid| pid > 0)
    }
}

/// One entry of the `j/workspaces` reply.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HyprWorkspace {
    pub id: i32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub monitor: String,
    #[serde(default)]
    pub windows: usize,
}

fn default_true() -> bool {
    true
}

fn default_pid() -> i64 {
    -1
}

/// Decode a `j/clients` reply.
pub fn parse_clients(reply: &str) -> Result<Vec<HyprClient>, IpcError> {
    Ok(serde_json::from_str(reply)?)
}

/// Decode a `j/workspaces` reply.
pub fn parse_workspaces(reply: &str) -> Result<Vec<HyprWorkspace>, IpcError> {
    Ok(serde_json::from_str(reply)?)
}
