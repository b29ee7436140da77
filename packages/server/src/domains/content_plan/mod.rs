//! Content plan domain - keyword-driven content strategy generation
//!
//! A job walks a fixed phase sequence from initialization to completion,
//! pausing once for the user to pick a theme. All coordination happens
//! through the jobs table: the web layer creates and inspects jobs, the
//! background pipelines do the work.
//!
//! # Components
//!
//! - `actions/` - The verbs: create, start, select, and the two pipelines
//! - `models/` - `Job` and `Theme` rows with their SQL
//! - `workflow` - The phase machine and its persisted snapshot
//! - `themes` - Parsing themes out of model output
//! - `prompts` - System prompts and user message builders
//! - `steps` - Output validation and step-skipping predicates
//! - `tasks` - Background task commands and handler registration
//! - `reaper` - Expired-claim sweep

pub mod actions;
pub mod models;
pub mod prompts;
pub mod reaper;
pub mod steps;
pub mod tasks;
pub mod themes;
pub mod workflow;

// Explicit re-exports to avoid ambiguous glob re-exports
pub use models::{Job, JobMessage, JobStatus, Theme};
pub use reaper::ClaimReaper;
pub use workflow::{SelectedTheme, WorkflowError, WorkflowPhase, WorkflowState};
