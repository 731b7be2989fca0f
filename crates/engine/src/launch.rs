//! Launch command resolution.
//!
//! Mapping entries are shell command lines. Two placeholders are expanded
//! before launch, each replaced by a single shell-quoted word:
//! - `{cwd}`: the saved working directory, or `$HOME` when there is none
//! - `{url}`: the saved PWA launch URL

use crate::config::AppMapping;
use hyprsession_core::{Session, WindowRecord};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Which lookup produced a launch command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandSource {
    /// `[pwa]` entry for the display name.
    Pwa,
    /// `[apps]` entry.
    App,
    /// `restore.browser_command` with the saved URL.
    BrowserFallback,
}

/// A resolved command ready to hand to a launcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub command: String,
    pub cwd: Option<PathBuf>,
    pub source: CommandSource,
}

/// Quote `value` as one POSIX shell word.
pub fn shell_quote(value: &str) -> String {
    let safe = !value.is_empty()
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"/._-+:=@%,".contains(&b));
    if safe {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

/// Substitute `{cwd}` and `{url}` in a mapping template.
pub fn expand_template(template: &str, cwd: Option<&str>, url: Option<&str>) -> String {
    let mut command = template.to_string();
    if command.contains("{cwd}") {
        let cwd = cwd.map(shell_quote).unwrap_or_else(|| "\"$HOME\"".to_string());
        command = command.replace("{cwd}", &cwd);
    }
    if command.contains("{url}") {
        command = command.replace("{url}", &shell_quote(url.unwrap_or_default()));
    }
    command
}

/// Resolve the command that relaunches `record`.
///
/// PWA records try `pwa[display_name]`, then `apps[display_name]`, then the
/// browser fallback (only when a URL was saved). Other records try
/// `apps[app_id]`, then `apps[window_class]`.
pub fn resolve_command(
    record: &WindowRecord,
    mapping: &AppMapping,
    browser_command: &str,
) -> Option<LaunchPlan> {
    let cwd = record.working_directory.as_deref();

    let (template, source) = match &record.pwa_info {
        Some(pwa) => mapping
            .pwa(&pwa.display_name)
            .map(|t| (t, CommandSource::Pwa))
            .or_else(|| mapping.app(&pwa.display_name).map(|t| (t, CommandSource::App)))
            .or_else(|| {
                (!pwa.launch_url.is_empty() && !browser_command.is_empty())
                    .then_some((browser_command, CommandSource::BrowserFallback))
            })?,
        None => mapping
            .app(&record.app_id)
            .or_else(|| mapping.app(&record.window_class))
            .map(|t| (t, CommandSource::App))?,
    };

    let url = record.pwa_info.as_ref().map(|p| p.launch_url.as_str());
    Some(LaunchPlan {
        command: expand_template(template, cwd, url),
        cwd: cwd.map(PathBuf::from),
        source,
    })
}

/// Keys of records in `session` that no mapping entry resolves.
pub fn missing_mappings(
    session: &Session,
    mapping: &AppMapping,
    browser_command: &str,
) -> BTreeSet<String> {
    session
        .iter()
        .filter(|record| resolve_command(record, mapping, browser_command).is_none())
        .map(|record| record.display_key().to_string())
        .collect()
}
