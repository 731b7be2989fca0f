//! Restore outcomes.

use crate::error::{EXIT_OK, EXIT_RECORD_FAILURES};
use hyprsession_core::{Point, Size, WindowId, WindowRecord, WorkspaceTarget};
use std::fmt;

/// Where a record is in the restore state machine.
///
/// `Pending → Launching → AwaitingWindow → Matched → Placed` is the success
/// path; `Planned` replaces it in dry-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordState {
    Pending,
    Launching,
    AwaitingWindow,
    Matched,
    Placed,
    Planned,
    TimedOut,
    LaunchFailed,
    Cancelled,
}

impl RecordState {
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            RecordState::TimedOut | RecordState::LaunchFailed | RecordState::Cancelled
        )
    }

    pub fn is_terminal(self) -> bool {
        self.is_failure() || matches!(self, RecordState::Placed | RecordState::Planned)
    }
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordState::Pending => "pending",
            RecordState::Launching => "launching",
            RecordState::AwaitingWindow => "awaiting window",
            RecordState::Matched => "matched",
            RecordState::Placed => "placed",
            RecordState::Planned => "planned",
            RecordState::TimedOut => "timed out",
            RecordState::LaunchFailed => "launch failed",
            RecordState::Cancelled => "cancelled",
        };
        f.pad(name)
    }
}

/// Why a record did not reach its target state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    UnmappedApplication,
    LaunchFailed(String),
    TimedOut,
    Cancelled,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::UnmappedApplication => f.write_str("no launch command mapped"),
            Failure::LaunchFailed(reason) => write!(f, "launch failed: {}", reason),
            Failure::TimedOut => f.write_str("no matching window before the deadline"),
            Failure::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// One placement call, in the order restore issues them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementStep {
    MoveToWorkspace(WorkspaceTarget),
    SetFloating(bool),
    Resize(Size),
    Move(Point),
}

impl PlacementStep {
    /// The placement sequence for a record: workspace, floating, size, position.
    pub fn for_record(record: &WindowRecord) -> [PlacementStep; 4] {
        [
            PlacementStep::MoveToWorkspace(record.workspace_target()),
            PlacementStep::SetFloating(record.is_floating),
            PlacementStep::Resize(record.size),
            PlacementStep::Move(record.position),
        ]
    }
}

impl fmt::Display for PlacementStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlacementStep::MoveToWorkspace(ws) => write!(f, "move to workspace {}", ws),
            PlacementStep::SetFloating(true) => f.write_str("set floating"),
            PlacementStep::SetFloating(false) => f.write_str("set tiled"),
            PlacementStep::Resize(size) => write!(f, "resize to {}x{}", size.width, size.height),
            PlacementStep::Move(pos) => write!(f, "move to {},{}", pos.x, pos.y),
        }
    }
}

/// Something restore did, or would do in dry-run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Launch { command: String, cwd: Option<String> },
    Place(PlacementStep),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Launch { command, cwd: Some(cwd) } => write!(f, "launch `{}` in {}", command, cwd),
            Action::Launch { command, cwd: None } => write!(f, "launch `{}`", command),
            Action::Place(step) => fmt::Display::fmt(step, f),
        }
    }
}

/// A placement step the window manager refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedStep {
    pub step: PlacementStep,
    pub reason: String,
}

/// What happened to one session record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    /// Position in the session.
    pub index: usize,
    pub window_class: String,
    pub app_id: String,
    /// Name shown to the user: PWA display name, app id or class.
    pub label: String,
    pub state: RecordState,
    pub failure: Option<Failure>,
    pub command: Option<String>,
    pub window: Option<WindowId>,
    pub actions: Vec<Action>,
    pub rejected: Vec<RejectedStep>,
}

impl RecordOutcome {
    pub fn new(index: usize, record: &WindowRecord) -> Self {
        Self {
            index,
            window_class: record.window_class.clone(),
            app_id: record.app_id.clone(),
            label: record.display_key().to_string(),
            state: RecordState::Pending,
            failure: None,
            command: None,
            window: None,
            actions: Vec::new(),
            rejected: Vec::new(),
        }
    }

    pub(crate) fn fail(&mut self, state: RecordState, failure: Failure) {
        self.state = state;
        self.failure = Some(failure);
    }
}

/// Per-state counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    pub total: usize,
    pub placed: usize,
    pub planned: usize,
    pub unmapped: usize,
    pub launch_failed: usize,
    pub timed_out: usize,
    pub cancelled: usize,
    pub rejected_steps: usize,
}

impl fmt::Display for RestoreSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} windows: ", self.total)?;
        if self.planned > 0 {
            write!(f, "{} planned", self.planned)?;
        } else {
            write!(f, "{} placed", self.placed)?;
        }
        for (count, what) in [
            (self.unmapped, "unmapped"),
            (self.launch_failed, "failed to launch"),
            (self.timed_out, "timed out"),
            (self.cancelled, "cancelled"),
            (self.rejected_steps, "placement steps rejected"),
        ] {
            if count > 0 {
                write!(f, ", {} {}", count, what)?;
            }
        }
        Ok(())
    }
}

/// Ordered outcomes of one restore run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    pub dry_run: bool,
    pub outcomes: Vec<RecordOutcome>,
}

impl RestoreReport {
    pub fn summary(&self) -> RestoreSummary {
        let mut summary = RestoreSummary {
            total: self.outcomes.len(),
            ..Default::default()
        };
        for outcome in &self.outcomes {
            summary.rejected_steps += outcome.rejected.len();
            match (&outcome.state, &outcome.failure) {
                (RecordState::Placed, _) => summary.placed += 1,
                (RecordState::Planned, _) => summary.planned += 1,
                (_, Some(Failure::UnmappedApplication)) => summary.unmapped += 1,
                (RecordState::LaunchFailed, _) => summary.launch_failed += 1,
                (RecordState::TimedOut, _) => summary.timed_out += 1,
                (RecordState::Cancelled, _) => summary.cancelled += 1,
                _ => {}
            }
        }
        summary
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(|o| o.state.is_failure())
    }

    pub fn failures(&self) -> impl Iterator<Item = &RecordOutcome> {
        self.outcomes.iter().filter(|o| o.state.is_failure())
    }

    /// Process exit code for this report.
    pub fn exit_code(&self) -> i32 {
        if self.has_failures() {
            EXIT_RECORD_FAILURES
        } else {
            EXIT_OK
        }
    }
}
