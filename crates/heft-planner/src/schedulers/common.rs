use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::cluster::Cluster;
use crate::cost::CostEstimator;
use crate::error::PlanError;
use crate::schedule::Assignment;

/// How a planner picks the start time on a candidate VM.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotPolicy {
    /// Start no earlier than the VM free-time, i.e. after everything already planned on it.
    #[default]
    Append,
    /// Reuse an idle gap between already planned tasks when the task fits into it.
    Insertion,
}

#[derive(Clone, Debug)]
pub struct ScheduledTask {
    pub start_time: f64,
    pub end_time: f64,
    pub task: usize,
}

impl ScheduledTask {
    pub fn new(start_time: f64, end_time: f64, task: usize) -> ScheduledTask {
        ScheduledTask {
            start_time,
            end_time,
            task,
        }
    }
}

impl PartialOrd for ScheduledTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledTask {
    fn cmp(&self, other: &Self) -> Ordering {
        self.start_time
            .total_cmp(&other.start_time)
            .then(self.end_time.total_cmp(&other.end_time))
            .then(self.task.cmp(&other.task))
    }
}

impl PartialEq for ScheduledTask {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScheduledTask {}

/// Planned busy intervals of every VM.
pub struct VmTimeline {
    initial_free_time: Vec<f64>,
    scheduled_tasks: Vec<BTreeSet<ScheduledTask>>,
}

impl VmTimeline {
    /// Starts from the current free-time of each VM; nothing is placed before it.
    pub fn new(cluster: &Cluster) -> Self {
        Self {
            initial_free_time: cluster.vms().iter().map(|vm| vm.free_time).collect(),
            scheduled_tasks: vec![BTreeSet::new(); cluster.vm_count()],
        }
    }

    pub fn free_time(&self, vm: usize) -> f64 {
        self.scheduled_tasks[vm]
            .iter()
            .next_back()
            .map_or(self.initial_free_time[vm], |t| t.end_time.max(self.initial_free_time[vm]))
    }

    /// Earliest start on `vm` not before `ready_time` for a task running `duration`.
    pub fn earliest_start(&self, vm: usize, ready_time: f64, duration: f64, policy: SlotPolicy) -> f64 {
        let base = ready_time.max(self.initial_free_time[vm]);
        match policy {
            SlotPolicy::Append => base.max(self.free_time(vm)),
            SlotPolicy::Insertion => {
                let mut candidate = base;
                for scheduled_task in self.scheduled_tasks[vm].iter() {
                    if scheduled_task.end_time <= candidate {
                        continue;
                    }
                    if scheduled_task.start_time >= candidate + duration {
                        break;
                    }
                    candidate = scheduled_task.end_time;
                }
                candidate
            }
        }
    }

    pub fn reserve(&mut self, vm: usize, start_time: f64, end_time: f64, task: usize) {
        self.scheduled_tasks[vm].insert(ScheduledTask::new(start_time, end_time, task));
    }
}

/// Time at which all inputs of `task` can be present on `vm`.
///
/// Every predecessor must already be placed, otherwise the planning order is broken.
pub fn data_ready_time(
    task: usize,
    vm: usize,
    predecessors: &[(usize, f64)],
    assignment: &Assignment,
    estimator: &CostEstimator,
) -> Result<f64, PlanError> {
    let mut ready_time: f64 = 0.;
    for &(pred, data) in predecessors.iter() {
        let entry = assignment.get(pred).ok_or_else(|| {
            PlanError::InternalInvariantViolation(format!(
                "predecessor {} of task {} is not scheduled yet",
                pred, task
            ))
        })?;
        ready_time = ready_time.max(entry.finish + estimator.communication_cost(data, entry.vm, vm));
    }
    Ok(ready_time)
}
