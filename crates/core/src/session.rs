//! The persisted session model.
//!
//! A session file is a JSON array of [`WindowRecord`] objects in capture order.
//! Optional fields are omitted when absent and unknown fields are ignored, so
//! files written by older or newer builds still load.

use crate::{Point, Size, WorkspaceTarget};
use serde::{Deserialize, Serialize};

/// Identity of a Progressive Web App window.
///
/// PWA windows are hosted by a generic browser process, so their class and
/// title say little about which app they are. The display name is what restore
/// matches on; the URL is what it relaunches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PwaInfo {
    pub display_name: String,
    #[serde(default)]
    pub launch_url: String,
}

/// One saved window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowRecord {
    /// Runtime window class at capture time.
    pub window_class: String,

    #[serde(default)]
    pub window_title: String,

    /// Launcher-level identity; may differ from the class for PWAs.
    #[serde(default)]
    pub app_id: String,

    pub workspace_id: i32,

    /// Name of a special workspace; absent for regular ones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_name: Option<String>,

    #[serde(default)]
    pub is_floating: bool,

    #[serde(default)]
    pub position: Point,

    #[serde(default)]
    pub size: Size,

    /// Working directory of the terminal's foreground process.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pwa_info: Option<PwaInfo>,
}

impl WindowRecord {
    /// Whether this record was captured from a PWA host window.
    pub fn is_pwa(&self) -> bool {
        self.pwa_info.is_some()
    }

    /// Where restore moves this window.
    pub fn workspace_target(&self) -> WorkspaceTarget {
        WorkspaceTarget::new(self.workspace_id, self.workspace_name.clone())
    }

    /// The name a user would look for in the app mapping file.
    pub fn display_key(&self) -> &str {
        if let Some(pwa) = &self.pwa_info {
            return &pwa.display_name;
        }
        if !self.app_id.is_empty() {
            return &self.app_id;
        }
        &self.window_class
    }
}

/// An ordered, immutable sequence of saved windows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Session {
    records: Vec<WindowRecord>,
}

impl Session {
    /// Create a session from records in capture order.
    pub fn new(records: Vec<WindowRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[WindowRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WindowRecord> {
        self.records.iter()
    }
}

impl FromIterator<WindowRecord> for Session {
    fn from_iter<I: IntoIterator<Item = WindowRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Session {
    type Item = &'a WindowRecord;
    type IntoIter = std::slice::Iter<'a, WindowRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
