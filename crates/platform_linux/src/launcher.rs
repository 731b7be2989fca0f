//! Detached application launch.

use hyprsession_core::{LaunchError, Launcher};
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// Launches commands through a POSIX shell so mapping entries can use
/// arguments, quoting and environment assignments.
#[derive(Debug, Clone)]
pub struct ShellLauncher {
    shell: PathBuf,
}

impl Default for ShellLauncher {
    fn default() -> Self {
        Self {
            shell: PathBuf::from("sh"),
        }
    }
}

impl ShellLauncher {
    pub fn new(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Launcher for ShellLauncher {
    fn launch(&self, command: &str, cwd: Option<&Path>) -> Result<u32, LaunchError> {
        if let Some(dir) = cwd {
            if !dir.is_dir() {
                return Err(LaunchError::MissingDirectory(dir.to_path_buf()));
            }
        }

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            // Own process group: a Ctrl-C aimed at us must not reach the app.
            .process_group(0);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        // The Child handle is dropped without waiting; the app outlives us.
        let child = cmd.spawn().map_err(|source| LaunchError::Spawn {
            command: command.to_string(),
            source,
        })?;
        let pid = child.id();

        match cwd {
            Some(dir) => info!("Launched `{}` (pid {}) in {}", command, pid, dir.display()),
            None => info!("Launched `{}` (pid {})", command, pid),
        }
        debug!("shell: {}", self.shell.display());
        Ok(pid)
    }
}
