//! Per-task job report.

use std::fmt::Write;

use serde::Serialize;

use crate::error::PlanError;
use crate::run_stats::RunStats;
use crate::schedule::Assignment;
use crate::simulator::ExecutionTrace;
use crate::workflow::Workflow;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Success,
    Failed,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            TaskStatus::Success => write!(f, "SUCCESS"),
            TaskStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// One line of the report.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct JobRow {
    pub task_id: usize,
    pub name: String,
    /// Ids of the predecessor tasks.
    pub dependencies: Vec<usize>,
    pub status: TaskStatus,
    pub vm: usize,
    pub duration: f64,
    pub start: f64,
    pub finish: f64,
    /// Distance from an entry task, entry tasks being at depth 0.
    pub depth: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Report {
    /// Completed tasks in completion order followed by the failed ones by id.
    pub rows: Vec<JobRow>,
    pub makespan: f64,
    pub stats: RunStats,
}

impl Report {
    /// Builds the report from a (possibly partial) trace.
    ///
    /// Tasks which did not complete are reported as failed with their planned VM and times.
    pub fn build(
        workflow: &Workflow,
        assignment: &Assignment,
        trace: &ExecutionTrace,
        stats: RunStats,
    ) -> Result<Self, PlanError> {
        let depths = workflow.depths()?;
        let row = |task: usize, status: TaskStatus, vm: usize, start: f64, finish: f64| JobRow {
            task_id: task,
            name: workflow.get_task(task).name.clone(),
            dependencies: workflow.predecessors(task).into_iter().map(|(pred, _)| pred).collect(),
            status,
            vm,
            duration: finish - start,
            start,
            finish,
            depth: depths[task],
        };

        let mut rows = trace
            .executions()
            .map(|e| row(e.task, TaskStatus::Success, e.vm, e.start, e.finish))
            .collect::<Vec<_>>();
        for task in (0..workflow.task_count()).filter(|&t| trace.execution(t).is_none()) {
            let planned = assignment.get(task).ok_or_else(|| {
                PlanError::InternalInvariantViolation(format!("task {} has no assignment entry", task))
            })?;
            rows.push(row(task, TaskStatus::Failed, planned.vm, planned.start, planned.finish));
        }

        Ok(Self {
            rows,
            makespan: trace.makespan(),
            stats,
        })
    }

    pub fn failed_count(&self) -> usize {
        self.rows.iter().filter(|r| r.status == TaskStatus::Failed).count()
    }

    pub fn row(&self, task: usize) -> Option<&JobRow> {
        self.rows.iter().find(|r| r.task_id == task)
    }

    /// Tab-separated job table.
    pub fn to_table(&self) -> String {
        let mut table = String::new();
        let _ = writeln!(table, "Task ID\tName\tDependencies\tSTATUS\tVM ID\tTime\tStart Time\tFinish Time\tDepth");
        for row in self.rows.iter() {
            let _ = writeln!(
                table,
                "{}\t{}\t{}\t{}\t{}\t{:.2}\t{:.2}\t{:.2}\t{}",
                row.task_id,
                row.name,
                row.dependencies.iter().map(|d| format!("{},", d)).collect::<String>(),
                row.status,
                row.vm,
                row.duration,
                row.start,
                row.finish,
                row.depth
            );
        }
        table
    }
}
