//! Restore engine: relaunch a [`Session`] and put each new window back.
//!
//! Restore runs in three phases on one thread:
//!
//! 1. **Launch**: resolve and spawn every record's command without waiting
//!    for any window. Each launch becomes a pending match with its own
//!    deadline.
//! 2. **Match**: a tick loop queries the window list once per tick and lets
//!    pending records claim windows that were not there before restore
//!    started. A window is claimed by at most one record.
//! 3. **Place**: a claimed window is moved to its workspace, set floating or
//!    tiled, resized and moved, in that order.
//!
//! Per-record failures end up in the [`RestoreReport`]; only an unreachable
//! window manager fails the run.

use crate::config::{Config, RestoreConfig, MAX_TIMEOUT_SECS};
use crate::error::Result;
use crate::launch::{resolve_command, LaunchPlan};
use crate::pwa::PwaDetector;
use crate::report::{
    Action, Failure, PlacementStep, RecordOutcome, RecordState, RejectedStep, RestoreReport,
};
use hyprsession_core::{
    BackendError, Clock, LaunchError, Launcher, LiveWindow, ProcessInspector, Session, WindowId,
    WindowManager, WindowRecord,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Per-run knobs, seeded from `[restore]` and overridden from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreOptions {
    pub dry_run: bool,
    /// How long each launched app gets to show a window.
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub match_existing_windows: bool,
    pub browser_command: String,
}

impl RestoreOptions {
    pub fn from_config(config: &RestoreConfig) -> Self {
        Self {
            dry_run: false,
            timeout: config.timeout(),
            poll_interval: config.poll_interval(),
            match_existing_windows: config.match_existing_windows,
            browser_command: config.browser_command.clone(),
        }
    }
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self::from_config(&RestoreConfig::default())
    }
}

/// User interrupts shared with a running restore.
///
/// The first interrupt stops further launches; records already launched keep
/// waiting for their windows. The second abandons those waits as well.
#[derive(Debug, Default)]
pub struct Interrupt {
    count: AtomicU8,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one interrupt and return how many have been seen.
    pub fn raise(&self) -> u8 {
        let previous = self
            .count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_add(1)))
            .unwrap_or(u8::MAX);
        previous.saturating_add(1)
    }

    pub fn stops_launches(&self) -> bool {
        self.count.load(Ordering::SeqCst) >= 1
    }

    pub fn abandons_pending(&self) -> bool {
        self.count.load(Ordering::SeqCst) >= 2
    }
}

/// The outside world restore acts on.
#[derive(Clone, Copy)]
pub struct Environment<'a> {
    pub windows: &'a dyn WindowManager,
    pub processes: &'a dyn ProcessInspector,
    pub launcher: &'a dyn Launcher,
    pub clock: &'a dyn Clock,
}

/// A launched record waiting for its window.
#[derive(Debug, Clone, Copy)]
struct PendingMatch {
    index: usize,
    pid: u32,
    deadline: Instant,
}

/// Replay `session`.
///
/// See [`Interrupt`] for how `interrupt` cuts a run short.
pub fn restore(
    session: &Session,
    config: &Config,
    options: &RestoreOptions,
    env: &Environment<'_>,
    interrupt: &Interrupt,
) -> Result<RestoreReport> {
    let mut outcomes: Vec<RecordOutcome> = session
        .iter()
        .enumerate()
        .map(|(index, record)| RecordOutcome::new(index, record))
        .collect();

    if options.dry_run {
        plan(session, config, options, &mut outcomes);
        return Ok(RestoreReport {
            dry_run: true,
            outcomes,
        });
    }

    let detector = PwaDetector::new(&config.capture, &config.mapping)?;

    let existing = env.windows.list_windows()?;
    let baseline: HashSet<WindowId> = if options.match_existing_windows {
        HashSet::new()
    } else {
        existing.iter().map(|w| w.id).collect()
    };
    debug!("{} windows open before restore", existing.len());

    let mut pending = launch_all(session, config, options, env, interrupt, &mut outcomes);
    info!("Launched {} of {} windows", pending.len(), session.len());

    let mut claimed: HashSet<WindowId> = HashSet::new();
    while !pending.is_empty() {
        match env.windows.list_windows() {
            Ok(live) => {
                let candidates: Vec<&LiveWindow> = live
                    .iter()
                    .filter(|w| !baseline.contains(&w.id) && !claimed.contains(&w.id))
                    .collect();
                let matches = assign(&pending, &candidates, session, &detector, env.processes);

                let mut matched_slots = HashSet::new();
                for (slot, window) in matches {
                    let index = pending[slot].index;
                    claimed.insert(window.id);
                    matched_slots.insert(slot);

                    let outcome = &mut outcomes[index];
                    outcome.state = RecordState::Matched;
                    outcome.window = Some(window.id);
                    debug!(
                        "{} matched window {:#x} '{}'",
                        outcome.label, window.id, window.title
                    );
                    place(env.windows, &session.records()[index], window.id, outcome);
                }

                let mut slot = 0;
                pending.retain(|_| {
                    let keep = !matched_slots.contains(&slot);
                    slot += 1;
                    keep
                });
            }
            Err(e) => warn!("Window query failed, retrying: {}", e),
        }

        if interrupt.abandons_pending() && !pending.is_empty() {
            warn!("Interrupted again: giving up on {} windows", pending.len());
            for p in pending.drain(..) {
                outcomes[p.index].fail(RecordState::Cancelled, Failure::Cancelled);
            }
            break;
        }

        let now = env.clock.now();
        pending.retain(|p| {
            if now < p.deadline {
                return true;
            }
            let outcome = &mut outcomes[p.index];
            warn!(
                "No window for {} (pid {}) before its deadline",
                outcome.label, p.pid
            );
            outcome.fail(RecordState::TimedOut, Failure::TimedOut);
            false
        });

        if !pending.is_empty() {
            env.clock.sleep(options.poll_interval);
        }
    }

    Ok(RestoreReport {
        dry_run: false,
        outcomes,
    })
}

/// Classify every record and list what restore would do, touching nothing.
fn plan(
    session: &Session,
    config: &Config,
    options: &RestoreOptions,
    outcomes: &mut [RecordOutcome],
) {
    for (record, outcome) in session.iter().zip(outcomes.iter_mut()) {
        let Some(launch) = resolve_command(record, &config.mapping, &options.browser_command)
        else {
            outcome.fail(RecordState::LaunchFailed, Failure::UnmappedApplication);
            continue;
        };
        outcome.command = Some(launch.command.clone());
        outcome.actions.push(launch_action(&launch));
        outcome.actions.extend(
            PlacementStep::for_record(record)
                .into_iter()
                .map(Action::Place),
        );
        outcome.state = RecordState::Planned;
    }
}

fn launch_action(plan: &LaunchPlan) -> Action {
    Action::Launch {
        command: plan.command.clone(),
        cwd: plan.cwd.as_ref().map(|p| p.to_string_lossy().into_owned()),
    }
}

fn launch_all(
    session: &Session,
    config: &Config,
    options: &RestoreOptions,
    env: &Environment<'_>,
    interrupt: &Interrupt,
    outcomes: &mut [RecordOutcome],
) -> Vec<PendingMatch> {
    let mut pending = Vec::new();
    let timeout = options.timeout.min(Duration::from_secs(MAX_TIMEOUT_SECS));

    for (index, record) in session.iter().enumerate() {
        let outcome = &mut outcomes[index];

        let Some(plan) = resolve_command(record, &config.mapping, &options.browser_command) else {
            warn!("No launch command for {}", outcome.label);
            outcome.fail(RecordState::LaunchFailed, Failure::UnmappedApplication);
            continue;
        };
        outcome.command = Some(plan.command.clone());

        if interrupt.stops_launches() {
            outcome.fail(RecordState::Cancelled, Failure::Cancelled);
            continue;
        }

        outcome.state = RecordState::Launching;
        outcome.actions.push(launch_action(&plan));
        match launch(env.launcher, &plan) {
            Ok(pid) => {
                outcome.state = RecordState::AwaitingWindow;
                let now = env.clock.now();
                pending.push(PendingMatch {
                    index,
                    pid,
                    deadline: now.checked_add(timeout).unwrap_or(now),
                });
            }
            Err(e) => {
                warn!("Failed to launch {}: {}", outcome.label, e);
                outcome.fail(RecordState::LaunchFailed, Failure::LaunchFailed(e.to_string()));
            }
        }
    }

    pending
}

/// Launch in the saved directory, or without one if it has since disappeared.
fn launch(launcher: &dyn Launcher, plan: &LaunchPlan) -> std::result::Result<u32, LaunchError> {
    match launcher.launch(&plan.command, plan.cwd.as_deref()) {
        Err(LaunchError::MissingDirectory(dir)) => {
            warn!(
                "{} no longer exists, launching `{}` without it",
                dir.display(),
                plan.command
            );
            launcher.launch(&plan.command, None)
        }
        result => result,
    }
}

/// Matching passes, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    /// The window belongs to the launched process tree.
    Descendant,
    /// A PWA window whose resolved display name matches.
    PwaName,
    /// Any window satisfying the record's predicate.
    FirstFree,
}

/// Pair pending records with candidate windows.
///
/// Each pass visits pending records in session order and gives each the
/// first unclaimed candidate, in window manager order, that qualifies.
/// Returns `(pending slot, window)` pairs.
fn assign<'w>(
    pending: &[PendingMatch],
    candidates: &[&'w LiveWindow],
    session: &Session,
    detector: &PwaDetector,
    processes: &dyn ProcessInspector,
) -> Vec<(usize, &'w LiveWindow)> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let wants_pwa = pending
        .iter()
        .any(|p| session.records()[p.index].is_pwa());
    let pwa_names: HashMap<WindowId, String> = if wants_pwa {
        candidates
            .iter()
            .filter_map(|w| Some((w.id, detector.detect(w, processes)?.display_name)))
            .collect()
    } else {
        HashMap::new()
    };

    let mut taken: HashSet<WindowId> = HashSet::new();
    let mut done: HashSet<usize> = HashSet::new();
    let mut result = Vec::new();

    for pass in [Pass::Descendant, Pass::PwaName, Pass::FirstFree] {
        for (slot, p) in pending.iter().enumerate() {
            if done.contains(&slot) {
                continue;
            }
            let record = &session.records()[p.index];
            let found = candidates.iter().copied().find(|w| {
                !taken.contains(&w.id) && qualifies(pass, p, record, w, &pwa_names, processes)
            });
            if let Some(window) = found {
                taken.insert(window.id);
                done.insert(slot);
                result.push((slot, window));
            }
        }
    }

    result
}

fn qualifies(
    pass: Pass,
    pending: &PendingMatch,
    record: &WindowRecord,
    window: &LiveWindow,
    pwa_names: &HashMap<WindowId, String>,
    processes: &dyn ProcessInspector,
) -> bool {
    let name_matches = record.pwa_info.as_ref().is_some_and(|pwa| {
        pwa_names
            .get(&window.id)
            .is_some_and(|name| *name == pwa.display_name)
    });
    let class_matches = window.class == record.window_class;

    match pass {
        Pass::Descendant => {
            (class_matches || name_matches)
                && window
                    .pid
                    .is_some_and(|pid| processes.is_descendant(pid, pending.pid))
        }
        Pass::PwaName => name_matches,
        Pass::FirstFree => class_matches || name_matches,
    }
}

/// Apply the placement sequence, recording refused steps and carrying on.
fn place(
    windows: &dyn WindowManager,
    record: &WindowRecord,
    window: WindowId,
    outcome: &mut RecordOutcome,
) {
    for step in PlacementStep::for_record(record) {
        outcome.actions.push(Action::Place(step.clone()));
        if let Err(e) = apply(windows, window, &step) {
            warn!("{}: {} on {:#x} failed: {}", outcome.label, step, window, e);
            outcome.rejected.push(RejectedStep {
                step,
                reason: e.to_string(),
            });
        }
    }
    outcome.state = RecordState::Placed;
    info!("Placed {} on workspace {}", outcome.label, record.workspace_target());
}

fn apply(
    windows: &dyn WindowManager,
    window: WindowId,
    step: &PlacementStep,
) -> std::result::Result<(), BackendError> {
    match step {
        PlacementStep::MoveToWorkspace(ws) => windows.move_to_workspace(window, ws),
        PlacementStep::SetFloating(floating) => windows.set_floating(window, *floating),
        PlacementStep::Resize(size) => windows.resize(window, *size),
        PlacementStep::Move(position) => windows.move_window(window, *position),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyprsession_core::{Point, PwaInfo, Size};
    use std::path::PathBuf;

    struct Tree(HashMap<u32, u32>);

    impl ProcessInspector for Tree {
        fn command_line(&self, _pid: u32) -> Option<Vec<String>> {
            None
        }
        fn parent(&self, pid: u32) -> Option<u32> {
            self.0.get(&pid).copied()
        }
        fn children(&self, _pid: u32) -> Vec<u32> {
            Vec::new()
        }
        fn working_directory(&self, _pid: u32) -> Option<PathBuf> {
            None
        }
    }

    fn record(class: &str) -> WindowRecord {
        WindowRecord {
            window_class: class.to_string(),
            window_title: String::new(),
            app_id: class.to_string(),
            workspace_id: 1,
            workspace_name: None,
            is_floating: false,
            position: Point::default(),
            size: Size::default(),
            working_directory: None,
            pwa_info: None,
        }
    }

    fn live(id: WindowId, class: &str, title: &str, pid: u32) -> LiveWindow {
        LiveWindow {
            id,
            class: class.to_string(),
            title: title.to_string(),
            app_id: class.to_string(),
            workspace_id: 1,
            workspace_name: "1".to_string(),
            floating: false,
            position: Point::default(),
            size: Size::default(),
            pid: Some(pid),
        }
    }

    fn pending(index: usize, pid: u32) -> PendingMatch {
        PendingMatch {
            index,
            pid,
            deadline: Instant::now(),
        }
    }

    fn detector(config: &Config) -> PwaDetector {
        PwaDetector::new(&config.capture, &config.mapping).unwrap()
    }

    #[test]
    fn test_assign_prefers_descendant() {
        let session = Session::new(vec![record("foot"), record("foot")]);
        let pending = vec![pending(0, 100), pending(1, 200)];
        // 0xb belongs to the second launch (201 -> 200).
        let a = live(0xa, "foot", "", 101);
        let b = live(0xb, "foot", "", 201);
        let tree = Tree(HashMap::from([(101, 100), (201, 200)]));
        let config = Config::default();

        let got = assign(&pending, &[&b, &a], &session, &detector(&config), &tree);
        let pairs: Vec<(usize, WindowId)> = got.iter().map(|(s, w)| (*s, w.id)).collect();
        assert_eq!(pairs, vec![(0, 0xa), (1, 0xb)]);
    }

    #[test]
    fn test_assign_falls_back_to_enumeration_order() {
        let session = Session::new(vec![record("foot"), record("foot")]);
        let pending = vec![pending(0, 100), pending(1, 200)];
        // foot --server: windows are owned by an unrelated daemon.
        let a = live(0xa, "foot", "", 999);
        let b = live(0xb, "foot", "", 999);
        let c = live(0xc, "firefox", "", 999);
        let config = Config::default();

        let got = assign(
            &pending,
            &[&c, &b, &a],
            &session,
            &detector(&config),
            &Tree(HashMap::new()),
        );
        let pairs: Vec<(usize, WindowId)> = got.iter().map(|(s, w)| (*s, w.id)).collect();
        assert_eq!(pairs, vec![(0, 0xb), (1, 0xa)]);
    }

    #[test]
    fn test_assign_pwa_name_beats_class() {
        let mut config = Config::default();
        config
            .mapping
            .pwa
            .insert("Slack".to_string(), "chromium --app=https://app.slack.com".to_string());
        config.mapping.pwa.insert(
            "WhatsApp".to_string(),
            "chromium --app=https://web.whatsapp.com".to_string(),
        );

        let mut whatsapp = record("chromium");
        whatsapp.pwa_info = Some(PwaInfo {
            display_name: "WhatsApp".to_string(),
            launch_url: String::new(),
        });
        let mut slack = record("chromium");
        slack.pwa_info = Some(PwaInfo {
            display_name: "Slack".to_string(),
            launch_url: String::new(),
        });
        let session = Session::new(vec![whatsapp, slack]);
        let pending = vec![pending(0, 100), pending(1, 200)];

        // The Slack window shows up first; class alone would hand it to WhatsApp.
        let s = live(0x5, "chromium", "Slack | general", 900);
        let w = live(0x6, "chromium", "WhatsApp", 900);

        let got = assign(
            &pending,
            &[&s, &w],
            &session,
            &detector(&config),
            &Tree(HashMap::new()),
        );
        let pairs: Vec<(usize, WindowId)> = got.iter().map(|(s, w)| (*s, w.id)).collect();
        assert_eq!(pairs, vec![(0, 0x6), (1, 0x5)]);
    }

    #[test]
    fn test_assign_never_shares_a_window() {
        let session = Session::new(vec![record("foot"), record("foot"), record("foot")]);
        let pending = vec![pending(0, 1), pending(1, 2), pending(2, 3)];
        let only = live(0xa, "foot", "", 50);
        let config = Config::default();

        let got = assign(
            &pending,
            &[&only],
            &session,
            &detector(&config),
            &Tree(HashMap::new()),
        );
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].0, 0);
    }

    #[test]
    fn test_options_from_config() {
        let mut restore = RestoreConfig::default();
        restore.timeout_secs = 30;
        restore.match_existing_windows = true;
        let options = RestoreOptions::from_config(&restore);
        assert_eq!(options.timeout, Duration::from_secs(30));
        assert_eq!(options.poll_interval, Duration::from_millis(250));
        assert!(options.match_existing_windows);
        assert!(!options.dry_run);
    }

    #[test]
    fn test_interrupt_levels() {
        let interrupt = Interrupt::new();
        assert!(!interrupt.stops_launches());
        assert_eq!(interrupt.raise(), 1);
        assert!(interrupt.stops_launches());
        assert!(!interrupt.abandons_pending());
        assert_eq!(interrupt.raise(), 2);
        assert!(interrupt.abandons_pending());
        for _ in 0..300 {
            interrupt.raise();
        }
        assert_eq!(interrupt.raise(), u8::MAX);
        assert!(interrupt.abandons_pending());
    }
}
