//! Workflow phase state machine for content plan jobs.
//!
//! A job walks a fixed forward sequence of phases. There is no branching and
//! no skipping; the single pause happens at THEME_SELECTION, where advancing
//! is gated on a recorded theme selection. Errors are a job-level concern -
//! the machine has no error phase, it simply stops advancing.
//!
//! The machine serializes itself into `Job.workflow_data` via
//! [`WorkflowState::save_state`] and is restored with
//! [`WorkflowState::load_state`]. The snapshot is owned by this module; no
//! other component interprets its contents. Unknown snapshot fields survive a
//! load/save round trip so newer snapshots stay readable.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Errors from phase machine operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("illegal transition from {from}: {reason}")]
    IllegalTransition {
        from: WorkflowPhase,
        reason: &'static str,
    },

    #[error("corrupt workflow snapshot: {0}")]
    CorruptState(String),

    #[error("theme number {index} is out of range (1..={len})")]
    OutOfRange { index: usize, len: usize },

    #[error("theme selection is not allowed in the {0} phase")]
    SelectionNotAllowed(WorkflowPhase),
}

/// The fixed, strictly ordered phases of a content plan job.
///
/// Declaration order is the progression order; `Ord` follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowPhase {
    Initialization,
    Research,
    Analysis,
    ThemeSelection,
    ContentIdeation,
    Editorial,
    Completion,
}

impl WorkflowPhase {
    /// All phases in progression order.
    pub const ALL: [WorkflowPhase; 7] = [
        WorkflowPhase::Initialization,
        WorkflowPhase::Research,
        WorkflowPhase::Analysis,
        WorkflowPhase::ThemeSelection,
        WorkflowPhase::ContentIdeation,
        WorkflowPhase::Editorial,
        WorkflowPhase::Completion,
    ];

    /// The phase that follows this one, or `None` from COMPLETION.
    pub fn next(self) -> Option<WorkflowPhase> {
        match self {
            WorkflowPhase::Initialization => Some(WorkflowPhase::Research),
            WorkflowPhase::Research => Some(WorkflowPhase::Analysis),
            WorkflowPhase::Analysis => Some(WorkflowPhase::ThemeSelection),
            WorkflowPhase::ThemeSelection => Some(WorkflowPhase::ContentIdeation),
            WorkflowPhase::ContentIdeation => Some(WorkflowPhase::Editorial),
            WorkflowPhase::Editorial => Some(WorkflowPhase::Completion),
            WorkflowPhase::Completion => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == WorkflowPhase::Completion
    }
}

impl std::fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WorkflowPhase::Initialization => "INITIALIZATION",
            WorkflowPhase::Research => "RESEARCH",
            WorkflowPhase::Analysis => "ANALYSIS",
            WorkflowPhase::ThemeSelection => "THEME_SELECTION",
            WorkflowPhase::ContentIdeation => "CONTENT_IDEATION",
            WorkflowPhase::Editorial => "EDITORIAL",
            WorkflowPhase::Completion => "COMPLETION",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for WorkflowPhase {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INITIALIZATION" => Ok(WorkflowPhase::Initialization),
            "RESEARCH" => Ok(WorkflowPhase::Research),
            "ANALYSIS" => Ok(WorkflowPhase::Analysis),
            "THEME_SELECTION" => Ok(WorkflowPhase::ThemeSelection),
            "CONTENT_IDEATION" => Ok(WorkflowPhase::ContentIdeation),
            "EDITORIAL" => Ok(WorkflowPhase::Editorial),
            "COMPLETION" => Ok(WorkflowPhase::Completion),
            _ => Err(WorkflowError::CorruptState(format!(
                "unrecognized phase: {}",
                s
            ))),
        }
    }
}

/// The theme selection recorded by the machine.
///
/// Kept separately from the `Theme` row's own `is_selected` flag; the caller
/// writes both in one transaction so they cannot drift apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedTheme {
    /// 1-based index into the job's themes, as presented to the user.
    pub index: usize,
    pub title: String,
}

/// Raw snapshot shape; extra fields pass through untouched.
#[derive(Deserialize)]
struct SnapshotRaw {
    current_phase: String,
    #[serde(default)]
    selected_theme: Option<SelectedTheme>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// The phase machine for one job.
#[derive(Debug, Clone)]
pub struct WorkflowState {
    current_phase: WorkflowPhase,
    selected_theme: Option<SelectedTheme>,
    /// Snapshot fields this version does not know about.
    extra: Map<String, Value>,
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowState {
    /// A fresh machine at INITIALIZATION.
    pub fn new() -> Self {
        Self {
            current_phase: WorkflowPhase::Initialization,
            selected_theme: None,
            extra: Map::new(),
        }
    }

    pub fn current_phase(&self) -> WorkflowPhase {
        self.current_phase
    }

    pub fn selected_theme(&self) -> Option<&SelectedTheme> {
        self.selected_theme.as_ref()
    }

    /// Move to the next phase in the fixed order.
    ///
    /// Fails from COMPLETION (terminal) and from THEME_SELECTION until a
    /// selection has been recorded.
    pub fn advance_phase(&mut self) -> Result<WorkflowPhase, WorkflowError> {
        if self.current_phase == WorkflowPhase::ThemeSelection && self.selected_theme.is_none() {
            return Err(WorkflowError::IllegalTransition {
                from: self.current_phase,
                reason: "a theme must be selected first",
            });
        }

        let next = self
            .current_phase
            .next()
            .ok_or(WorkflowError::IllegalTransition {
                from: self.current_phase,
                reason: "COMPLETION is terminal",
            })?;

        self.current_phase = next;
        Ok(next)
    }

    /// Record the user's theme choice.
    ///
    /// `index` is 1-based against `titles` (the job's themes in display
    /// order). Only legal while paused in THEME_SELECTION.
    pub fn process_theme_selection(
        &mut self,
        index: usize,
        titles: &[String],
    ) -> Result<&SelectedTheme, WorkflowError> {
        if self.current_phase != WorkflowPhase::ThemeSelection {
            return Err(WorkflowError::SelectionNotAllowed(self.current_phase));
        }
        if index < 1 || index > titles.len() {
            return Err(WorkflowError::OutOfRange {
                index,
                len: titles.len(),
            });
        }

        Ok(self.selected_theme.insert(SelectedTheme {
            index,
            title: titles[index - 1].clone(),
        }))
    }

    /// Serialize the machine into an opaque snapshot for `Job.workflow_data`.
    ///
    /// Unknown fields carried from a previous [`load_state`](Self::load_state)
    /// are re-emitted unchanged.
    pub fn save_state(&self) -> Value {
        let mut snapshot = self.extra.clone();
        snapshot.insert(
            "current_phase".to_string(),
            Value::String(self.current_phase.to_string()),
        );
        if let Some(selected) = &self.selected_theme {
            snapshot.insert(
                "selected_theme".to_string(),
                json!({ "index": selected.index, "title": selected.title }),
            );
        }
        Value::Object(snapshot)
    }

    /// Restore a machine from a snapshot produced by [`save_state`](Self::save_state).
    pub fn load_state(snapshot: &Value) -> Result<Self, WorkflowError> {
        let raw: SnapshotRaw = serde_json::from_value(snapshot.clone())
            .map_err(|e| WorkflowError::CorruptState(e.to_string()))?;
        let current_phase: WorkflowPhase = raw.current_phase.parse()?;

        Ok(Self {
            current_phase,
            selected_theme: raw.selected_theme,
            extra: raw.extra,
        })
    }
}
