use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::cost::CostEstimator;
use crate::simulator::ExecutionTrace;

/// Contains metrics collected from a simulation run.
#[derive(Serialize, Deserialize, Clone, Default, Debug, PartialEq)]
pub struct RunStats {
    /// Makespan expected by the planning algorithm.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_makespan: Option<f64>,
    /// Finish time of the last completed task.
    pub makespan: f64,
    /// Lower bound of the makespan (critical path on the fastest VM or perfectly balanced work).
    pub makespan_lower_bound: f64,
    /// Total task execution time (in seconds).
    pub total_task_time: f64,
    /// Total amount of data transmitted between different VMs (in MB).
    pub total_network_traffic: f64,
    /// Total time of data transfers between different VMs, overheads included (in seconds).
    pub total_network_time: f64,
    /// The number of VMs on which at least one task has been executed.
    pub used_vm_count: usize,
    /// Ratio of busy VM time to `makespan * vm_count`.
    pub vm_utilization: f64,
    /// Same as `vm_utilization` with unused VMs left out of the denominator.
    pub vm_utilization_used: f64,
}

impl RunStats {
    pub fn new(expected_makespan: Option<f64>, makespan_lower_bound: f64) -> Self {
        Self {
            expected_makespan,
            makespan_lower_bound,
            ..Default::default()
        }
    }

    /// Aggregates the completed part of `trace`.
    pub fn collect(&mut self, trace: &ExecutionTrace, estimator: &CostEstimator) {
        let workflow = estimator.workflow();
        let mut used_vms = BTreeSet::new();
        for execution in trace.executions() {
            self.total_task_time += execution.duration();
            self.makespan = self.makespan.max(execution.finish);
            used_vms.insert(execution.vm);

            for (pred, data) in workflow.predecessors(execution.task) {
                if let Some(pred_execution) = trace.execution(pred) {
                    if pred_execution.vm != execution.vm {
                        self.total_network_traffic += data;
                        self.total_network_time += estimator.communication_cost(data, pred_execution.vm, execution.vm);
                    }
                }
            }
        }

        self.used_vm_count = used_vms.len();
        if self.makespan > 0. {
            self.vm_utilization = self.total_task_time / (self.makespan * estimator.vm_count() as f64);
            if self.used_vm_count > 0 {
                self.vm_utilization_used = self.total_task_time / (self.makespan * self.used_vm_count as f64);
            }
        }
    }
}
