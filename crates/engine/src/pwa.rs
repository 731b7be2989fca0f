//! Progressive Web App identity.
//!
//! Chromium-family browsers host every installed web app in the same binary.
//! A PWA window is recognised by one of:
//! - the `--app=URL` / `--app-id=ID` flag on its process command line
//! - a per-app class such as `chrome-web.whatsapp.com__-Default`
//! - a generic browser class (`chromium`, `google-chrome`) whose title
//!   names a known PWA
//!
//! The display name is what restore matches on, so it is resolved the same
//! way at capture and at restore time.

use crate::config::{AppMapping, CaptureConfig};
use crate::error::Result;
use hyprsession_core::{LiveWindow, ProcessInspector, PwaInfo};
use regex::Regex;

/// Per-app window classes: `<browser>-<app id or host__path>-<profile>`.
const APP_WINDOW_CLASS: &str = r"^(?:chrome|chromium|brave|msedge)-(.+?)-(?:Default|Profile_\d+)$";

/// First http(s) URL in a launch template.
const TEMPLATE_URL: &str = r#"https?://[^\s'"]+"#;

/// App-mode flags found on a browser command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppMode {
    pub url: Option<String>,
    pub app_id: Option<String>,
}

/// Extract `--app=` / `--app-id=` from an argv.
pub fn app_mode(args: &[String]) -> Option<AppMode> {
    let mut mode = AppMode::default();
    let mut found = false;
    for arg in args {
        if let Some(url) = arg.strip_prefix("--app=") {
            mode.url = Some(url.to_string());
            found = true;
        } else if let Some(id) = arg.strip_prefix("--app-id=") {
            mode.app_id = Some(id.to_string());
            found = true;
        }
    }
    found.then_some(mode)
}

/// Resolves [`PwaInfo`] for live windows.
#[derive(Debug, Clone)]
pub struct PwaDetector {
    browser_classes: Vec<Regex>,
    app_window_class: Regex,
    template_url: Regex,
    /// `(lowercased key, key, template)`, longest key first.
    keys: Vec<(String, String, String)>,
}

impl PwaDetector {
    pub fn new(capture: &CaptureConfig, mapping: &AppMapping) -> Result<Self> {
        let mut keys: Vec<(String, String, String)> = mapping
            .pwa
            .iter()
            .filter(|(key, _)| !key.is_empty())
            .map(|(key, template)| (key.to_lowercase(), key.clone(), template.clone()))
            .collect();
        keys.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));

        Ok(Self {
            browser_classes: capture.compile_browser_classes()?,
            app_window_class: Regex::new(APP_WINDOW_CLASS)?,
            template_url: Regex::new(TEMPLATE_URL)?,
            keys,
        })
    }

    pub fn is_browser_class(&self, class: &str) -> bool {
        self.browser_classes.iter().any(|re| re.is_match(class))
    }

    pub fn is_app_window_class(&self, class: &str) -> bool {
        self.app_window_class.is_match(class)
    }

    /// The longest PWA key contained in `title`, ignoring case.
    pub fn key_for_title(&self, title: &str) -> Option<&str> {
        let title = title.to_lowercase();
        self.keys
            .iter()
            .find(|(lower, _, _)| title.contains(lower.as_str()))
            .map(|(_, key, _)| key.as_str())
    }

    /// The URL inside the `pwa` template for `key`.
    pub fn template_url(&self, key: &str) -> Option<String> {
        let (_, _, template) = self.keys.iter().find(|(_, k, _)| k == key)?;
        self.template_url
            .find(template)
            .map(|m| m.as_str().to_string())
    }

    /// The site URL encoded in a per-app class, for apps installed from a
    /// plain site rather than a manifest (`chrome-<host>__<path>-Default`).
    pub fn url_from_class(&self, class: &str) -> Option<String> {
        let encoded = self.app_window_class.captures(class)?.get(1)?.as_str();
        let (host, path) = encoded.split_once("__")?;
        if !host.contains('.') {
            return None;
        }
        let path = path.replace('_', "/");
        let path = path.trim_matches('/');
        if path.is_empty() {
            Some(format!("https://{}/", host))
        } else {
            Some(format!("https://{}/{}", host, path))
        }
    }

    /// Identify `window` as a PWA, or `None` for anything else including
    /// plain browser windows.
    pub fn detect(&self, window: &LiveWindow, processes: &dyn ProcessInspector) -> Option<PwaInfo> {
        let mode = window
            .pid
            .and_then(|pid| processes.command_line(pid))
            .and_then(|args| app_mode(&args));
        let app_class =
            self.is_app_window_class(&window.class) || self.is_app_window_class(&window.app_id);
        let generic = self.is_browser_class(&window.class) || self.is_browser_class(&window.app_id);

        let in_app_mode = mode.is_some();
        if !in_app_mode && !app_class && !generic {
            return None;
        }

        let key = self.key_for_title(&window.title);
        let display_name = match key {
            Some(key) => key.to_string(),
            None if (in_app_mode || app_class) && !window.title.is_empty() => window.title.clone(),
            None => return None,
        };

        let launch_url = mode
            .and_then(|m| m.url)
            .or_else(|| key.and_then(|k| self.template_url(k)))
            .or_else(|| self.url_from_class(&window.class))
            .or_else(|| self.url_from_class(&window.app_id))
            .unwrap_or_default();

        tracing::debug!(
            "PWA window {:#x}: '{}' ({})",
            window.id,
            display_name,
            if launch_url.is_empty() { "no url" } else { launch_url.as_str() }
        );
        Some(PwaInfo {
            display_name,
            launch_url,
        })
    }
}
