//! Error types.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Malformed workflow description. Reported before any planning starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorkflowError {
    #[error("workflow has no tasks")]
    Empty,

    #[error("cycle detected between tasks {}", .tasks.join(", "))]
    CycleDetected { tasks: Vec<String> },

    #[error("task {task} depends on unknown {dependency}")]
    DanglingDependency { task: String, dependency: String },

    #[error("task {task} has negative cost {cost}")]
    NegativeCost { task: String, cost: f64 },

    #[error("data item {data_item} has negative size {size}")]
    NegativeDataSize { data_item: String, size: f64 },

    #[error("duplicate task name {0}")]
    DuplicateTaskName(String),

    #[error("data item {0} is declared more than once")]
    DuplicateDataItem(String),
}

/// Malformed cluster description. Reported before any planning starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClusterError {
    #[error("cluster has no virtual machines")]
    NoVirtualMachines,

    #[error("vm {vm} has non-positive speed {speed}")]
    NonPositiveSpeed { vm: String, speed: f64 },

    #[error("network bandwidth must be positive, got {0}")]
    NonPositiveBandwidth(f64),

    #[error("network latency must be non-negative, got {0}")]
    NegativeLatency(f64),

    #[error("overhead {name} must be non-negative, got {value}")]
    NegativeOverhead { name: &'static str, value: f64 },

    #[error("unknown vm {0}")]
    UnknownVm(usize),
}

/// Kind of inconsistency found while replaying a plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConflictKind {
    /// The VM was still running `other_task` when the task was due to start.
    VmDoubleBooked { other_task: usize },
    /// A predecessor had not finished (or its data had not arrived) at the planned start.
    DependencyNotMet { predecessor: usize, ready_at: f64 },
}

/// Plan inconsistency detected by the execution simulator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleConflict {
    pub task: usize,
    pub vm: usize,
    pub start: f64,
    pub finish: f64,
    pub kind: ConflictKind,
}

impl std::fmt::Display for ScheduleConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.kind {
            ConflictKind::VmDoubleBooked { other_task } => write!(
                f,
                "task {} planned on vm {} for [{:.3}, {:.3}) overlaps task {}",
                self.task, self.vm, self.start, self.finish, other_task
            ),
            ConflictKind::DependencyNotMet { predecessor, ready_at } => write!(
                f,
                "task {} planned on vm {} at {:.3} but input from task {} is ready only at {:.3}",
                self.task, self.vm, self.start, predecessor, ready_at
            ),
        }
    }
}

/// Errors produced by a planning and simulation run.
///
/// None of them is retried: every variant aborts the run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("invalid workflow: {0}")]
    InvalidWorkflow(#[from] WorkflowError),

    #[error("invalid cluster: {0}")]
    InvalidCluster(#[from] ClusterError),

    #[error("schedule conflict: {0}")]
    ScheduleConflict(ScheduleConflict),

    #[error("internal invariant violation: {0}")]
    InternalInvariantViolation(String),
}

/// Errors produced while reading workflows and configuration files.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("can't read file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("can't parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("can't parse DAX: {0}")]
    Xml(#[from] serde_xml_rs::Error),

    #[error("unsupported workflow format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("invalid workflow: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("invalid cluster: {0}")]
    Cluster(#[from] ClusterError),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

pub(crate) fn read_file<P: AsRef<std::path::Path>>(path: P) -> Result<String, LoadError> {
    std::fs::read_to_string(&path).map_err(|source| LoadError::Io {
        path: path.as_ref().to_path_buf(),
        source,
    })
}
