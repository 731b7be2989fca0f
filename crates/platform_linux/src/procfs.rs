//! Process table inspection through `/proc`.

use hyprsession_core::ProcessInspector;
use std::fs;
use std::path::PathBuf;

/// The fields of `/proc/<pid>/stat` this crate cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcStat {
    pub pid: u32,
    pub ppid: u32,
    pub pgrp: i32,
    /// Foreground process group of the controlling terminal, `-1` if none.
    pub tpgid: i32,
    /// Start time in clock ticks after boot.
    pub start_time: u64,
}

/// Parse one `/proc/<pid>/stat` line.
///
/// The command name is wrapped in parentheses and may itself contain spaces
/// or parentheses, so fields are counted from the last `)`.
pub fn parse_stat(line: &str) -> Option<ProcStat> {
    let open = line.find('(')?;
    let close = line.rfind(')')?;
    let pid = line[..open].trim().parse().ok()?;
    let fields: Vec<&str> = line.get(close + 1..)?.split_whitespace().collect();
    // fields[0] is the state (field 3 in proc(5)).
    Some(ProcStat {
        pid,
        ppid: fields.get(1)?.parse().ok()?,
        pgrp: fields.get(2)?.parse().ok()?,
        tpgid: fields.get(5)?.parse().ok()?,
        start_time: fields.get(19)?.parse().ok()?,
    })
}

/// [`ProcessInspector`] backed by a procfs mount.
#[derive(Debug, Clone)]
pub struct ProcFs {
    root: PathBuf,
}

impl Default for ProcFs {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcFs {
    /// Inspector for the system `/proc`.
    pub fn new() -> Self {
        Self::with_root("/proc")
    }

    /// Inspector for a procfs-shaped tree rooted elsewhere.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn pid_dir(&self, pid: u32) -> PathBuf {
        self.root.join(pid.to_string())
    }

    pub fn stat(&self, pid: u32) -> Option<ProcStat> {
        let line = fs::read_to_string(self.pid_dir(pid).join("stat")).ok()?;
        parse_stat(&line)
    }

    fn all_stats(&self) -> Vec<ProcStat> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };
        entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().to_str()?.parse::<u32>().ok())
            .filter_map(|pid| self.stat(pid))
            .collect()
    }
}

fn split_command_line(raw: &[u8]) -> Vec<String> {
    let args: Vec<String> = raw
        .split(|&b| b == 0)
        .filter(|part| !part.is_empty())
        .map(|part| String::from_utf8_lossy(part).into_owned())
        .collect();

    // Chromium helpers rewrite their argv into a single space-separated string.
    if args.len() == 1 && args[0].contains(' ') {
        return args[0].split_whitespace().map(str::to_string).collect();
    }
    args
}

impl ProcessInspector for ProcFs {
    fn command_line(&self, pid: u32) -> Option<Vec<String>> {
        let raw = fs::read(self.pid_dir(pid).join("cmdline")).ok()?;
        let args = split_command_line(&raw);
        if args.is_empty() {
            None
        } else {
            Some(args)
        }
    }

    fn parent(&self, pid: u32) -> Option<u32> {
        self.stat(pid).map(|stat| stat.ppid)
    }

    fn children(&self, pid: u32) -> Vec<u32> {
        let mut children: Vec<ProcStat> = self
            .all_stats()
            .into_iter()
            .filter(|stat| stat.ppid == pid && stat.pid != pid)
            .collect();
        children.sort_by_key(|stat| (stat.start_time, stat.pid));
        children.into_iter().map(|stat| stat.pid).collect()
    }

    fn foreground_process(&self, pid: u32) -> Option<u32> {
        let stat = self.stat(pid)?;
        let leader = u32::try_from(stat.tpgid).ok().filter(|&p| p > 0)?;
        if leader == pid || self.pid_dir(leader).exists() {
            Some(leader)
        } else {
            None
        }
    }

    fn working_directory(&self, pid: u32) -> Option<PathBuf> {
        fs::read_link(self.pid_dir(pid).join("cwd")).ok()
    }
}
