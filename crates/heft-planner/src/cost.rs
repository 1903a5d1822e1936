//! Computation and communication cost estimates.

use crate::cluster::Cluster;
use crate::workflow::Workflow;

/// Estimates execution and transfer times of a workflow on a cluster.
///
/// Averages are used for ranking only; placement uses the exact values for a concrete VM pair.
/// VM speeds and network parameters are copied, so the cluster stays free for the planner to update
/// VM availability.
pub struct CostEstimator<'a> {
    workflow: &'a Workflow,
    speeds: Vec<f64>,
    bandwidth: f64,
    fixed_delay: f64,
    avg_inverse_speed: f64,
    avg_net_time: f64,
    avg_fixed_delay: f64,
}

impl<'a> CostEstimator<'a> {
    /// Both inputs are expected to be validated, see
    /// [`Workflow::validate`](crate::workflow::Workflow::validate) and
    /// [`Cluster::new`](crate::cluster::Cluster::new).
    pub fn new(workflow: &'a Workflow, cluster: &Cluster) -> Self {
        let vm_count = cluster.vm_count() as f64;
        // average time over all VMs for executing one work unit
        let avg_inverse_speed = cluster.vms().iter().map(|vm| 1. / vm.speed).sum::<f64>() / vm_count;
        // share of ordered VM pairs which actually transfer data (same-VM pairs are free)
        let remote_share = (vm_count - 1.) / vm_count;
        let fixed_delay = cluster.network().latency + cluster.overheads().total();
        Self {
            workflow,
            speeds: cluster.vms().iter().map(|vm| vm.speed).collect(),
            bandwidth: cluster.network().bandwidth,
            fixed_delay,
            avg_inverse_speed,
            avg_net_time: remote_share / cluster.network().bandwidth,
            avg_fixed_delay: remote_share * fixed_delay,
        }
    }

    pub fn workflow(&self) -> &'a Workflow {
        self.workflow
    }

    pub fn vm_count(&self) -> usize {
        self.speeds.len()
    }

    /// Mean of `cost / speed` over all VMs.
    pub fn average_computation_cost(&self, task: usize) -> f64 {
        self.workflow.get_task(task).cost * self.avg_inverse_speed
    }

    pub fn computation_cost(&self, task: usize, vm: usize) -> f64 {
        self.workflow.get_task(task).cost / self.speeds[vm]
    }

    /// Time to move `data` MB from `vm_a` to `vm_b`: zero on the same VM, otherwise latency plus
    /// transfer time plus the configured overheads.
    pub fn communication_cost(&self, data: f64, vm_a: usize, vm_b: usize) -> f64 {
        if vm_a == vm_b {
            return 0.;
        }
        self.fixed_delay + data / self.bandwidth
    }

    /// Mean of [`communication_cost`](Self::communication_cost) over all ordered VM pairs.
    pub fn average_communication_cost(&self, data: f64) -> f64 {
        self.avg_fixed_delay + data * self.avg_net_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::VmConfig;
    use crate::network::{NetworkConfig, OverheadConfig};

    fn cluster(speeds: &[f64], overheads: OverheadConfig) -> Cluster {
        let vms = speeds
            .iter()
            .enumerate()
            .map(|(i, &speed)| VmConfig {
                name: i.to_string(),
                speed,
            })
            .collect();
        Cluster::new(vms, NetworkConfig::constant(2., 0.5), overheads).unwrap()
    }

    #[test]
    fn computation_costs() {
        let mut workflow = Workflow::new();
        workflow.add_task("a", 12.);
        let cluster = cluster(&[1., 2., 3.], OverheadConfig::default());
        let estimator = CostEstimator::new(&workflow, &cluster);

        assert_eq!(estimator.computation_cost(0, 2), 4.);
        // (12 + 6 + 4) / 3
        assert!((estimator.average_computation_cost(0) - 22. / 3.).abs() < 1e-12);
    }

    #[test]
    fn communication_costs_are_symmetric_and_free_locally() {
        let workflow = Workflow::new();
        let overheads = OverheadConfig {
            queue_delay: 1.,
            clustering_delay: 0.25,
            ..Default::default()
        };
        let cluster = cluster(&[1., 1.], overheads);
        let estimator = CostEstimator::new(&workflow, &cluster);

        assert_eq!(estimator.communication_cost(10., 1, 1), 0.);
        // latency 0.5 + overheads 1.25 + 10 / 2
        assert_eq!(estimator.communication_cost(10., 0, 1), 6.75);
        assert_eq!(estimator.communication_cost(10., 1, 0), 6.75);
        // half of the ordered pairs are local
        assert!((estimator.average_communication_cost(10.) - 6.75 / 2.).abs() < 1e-12);
    }

    #[test]
    fn single_vm_has_no_communication() {
        let workflow = Workflow::new();
        let cluster = cluster(&[5.], OverheadConfig::default());
        let estimator = CostEstimator::new(&workflow, &cluster);
        assert_eq!(estimator.average_communication_cost(100.), 0.);
    }
}
