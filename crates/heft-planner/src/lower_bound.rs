//! Makespan lower bounds.

use crate::cluster::Cluster;
use crate::error::WorkflowError;
use crate::workflow::Workflow;

/// Lower bound of the makespan of any schedule of `workflow` on `cluster`.
///
/// The maximum of the critical path on the fastest VM and the total work spread perfectly over
/// all VMs. Communication is ignored, since tasks of a path may share a VM.
pub fn makespan_lower_bound(workflow: &Workflow, cluster: &Cluster) -> Result<f64, WorkflowError> {
    Ok(critical_path_time(workflow, cluster)?.max(total_comp_time(workflow, cluster)))
}

/// Longest path by computation cost, every task running on the fastest VM.
pub fn critical_path_time(workflow: &Workflow, cluster: &Cluster) -> Result<f64, WorkflowError> {
    let max_speed = cluster.vms().iter().map(|vm| vm.speed).fold(0., f64::max);
    let mut ranks = vec![0.; workflow.task_count()];
    for task in workflow.topological_order()?.into_iter().rev() {
        let tail = workflow
            .successors(task)
            .iter()
            .map(|&(succ, _)| ranks[succ])
            .fold(0., f64::max);
        ranks[task] = workflow.get_task(task).cost / max_speed + tail;
    }
    Ok(ranks.into_iter().fold(0., f64::max))
}

fn total_comp_time(workflow: &Workflow, cluster: &Cluster) -> f64 {
    workflow.get_tasks().iter().map(|t| t.cost).sum::<f64>() / cluster.vms().iter().map(|vm| vm.speed).sum::<f64>()
}
