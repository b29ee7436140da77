//! Background task commands for the content plan workflow.
//!
//! Each command carries only the job ID; the handlers reload everything
//! else from the database so a reclaimed task always sees current state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domains::content_plan::actions::{continue_workflow, process_workflow};
use crate::kernel::tasks::{TaskMeta, TaskRegistry};
use crate::kernel::ServerDeps;

/// Runs the initial pipeline: scrape, search, brief, analysis, themes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessWorkflowTask {
    pub job_id: Uuid,
}

impl TaskMeta for ProcessWorkflowTask {
    fn task_type(&self) -> &'static str {
        "process_workflow"
    }

    fn idempotency_key(&self) -> Option<String> {
        Some(format!("process_workflow:{}", self.job_id))
    }

    fn reference_id(&self) -> Option<Uuid> {
        Some(self.job_id)
    }
}

/// Runs the continuation pipeline after a theme is selected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContinueWorkflowTask {
    pub job_id: Uuid,
}

impl TaskMeta for ContinueWorkflowTask {
    fn task_type(&self) -> &'static str {
        "continue_workflow"
    }

    fn idempotency_key(&self) -> Option<String> {
        Some(format!("continue_workflow:{}", self.job_id))
    }

    fn reference_id(&self) -> Option<Uuid> {
        Some(self.job_id)
    }
}

/// Register the content plan handlers on the shared task registry.
pub fn register_content_plan_tasks(registry: &mut TaskRegistry) {
    registry.register(
        "process_workflow",
        |task: ProcessWorkflowTask, deps: Arc<ServerDeps>| async move {
            process_workflow(&deps, task.job_id).await
        },
    );
    registry.register(
        "continue_workflow",
        |task: ContinueWorkflowTask, deps: Arc<ServerDeps>| async move {
            continue_workflow(&deps, task.job_id).await
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::tasks::TaskSpec;

    #[test]
    fn test_process_workflow_task_meta() {
        let job_id = Uuid::new_v4();
        let spec = TaskSpec::from_command(&ProcessWorkflowTask { job_id }).unwrap();

        assert_eq!(spec.task_type, "process_workflow");
        assert_eq!(spec.reference_id, Some(job_id));
        assert_eq!(
            spec.idempotency_key,
            Some(format!("process_workflow:{}", job_id))
        );
        assert_eq!(spec.args["job_id"], serde_json::json!(job_id));
    }

    #[test]
    fn test_continue_workflow_task_meta() {
        let job_id = Uuid::new_v4();
        let spec = TaskSpec::from_command(&ContinueWorkflowTask { job_id }).unwrap();

        assert_eq!(spec.task_type, "continue_workflow");
        assert_eq!(spec.reference_id, Some(job_id));
        assert_eq!(
            spec.idempotency_key,
            Some(format!("continue_workflow:{}", job_id))
        );
    }

    #[test]
    fn test_task_payload_round_trip() {
        let job_id = Uuid::new_v4();
        let value = serde_json::to_value(ProcessWorkflowTask { job_id }).unwrap();
        let back: ProcessWorkflowTask = serde_json::from_value(value).unwrap();
        assert_eq!(back.job_id, job_id);
    }

    #[test]
    fn test_registration_covers_both_task_types() {
        let mut registry = TaskRegistry::new();
        register_content_plan_tasks(&mut registry);

        assert!(registry.is_registered("process_workflow"));
        assert!(registry.is_registered("continue_workflow"));
    }
}
