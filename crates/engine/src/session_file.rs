//! Session file persistence.

use crate::error::{Error, Result};
use hyprsession_core::Session;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

fn session_error(path: &Path, message: impl Into<String>) -> Error {
    Error::SessionFile {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

/// Pretty-printed JSON for `session`.
pub fn to_json(session: &Session) -> Result<String> {
    serde_json::to_string_pretty(session).map_err(|e| Error::SessionFile {
        path: PathBuf::new(),
        message: format!("failed to serialize: {}", e),
    })
}

/// Write `session` to `path`, creating the parent directory.
///
/// The file is written next to its destination and renamed into place, so an
/// interrupted save never leaves a truncated session behind.
pub fn save_session(session: &Session, path: &Path) -> Result<()> {
    let json = to_json(session)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| session_error(path, format!("failed to create {}: {}", parent.display(), e)))?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let write = || -> std::io::Result<()> {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.write_all(b"\n")?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    };
    if let Err(e) = write() {
        let _ = fs::remove_file(&tmp_path);
        return Err(session_error(path, format!("failed to write: {}", e)));
    }

    tracing::info!("Saved {} windows to {}", session.len(), path.display());
    Ok(())
}

/// Read a session file.
pub fn load_session(path: &Path) -> Result<Session> {
    let content = fs::read_to_string(path)
        .map_err(|e| session_error(path, format!("failed to read: {}", e)))?;
    let session: Session = serde_json::from_str(&content)
        .map_err(|e| session_error(path, format!("invalid session: {}", e)))?;
    tracing::debug!("Loaded {} windows from {}", session.len(), path.display());
    Ok(session)
}
