use rand::prelude::*;
use rand_pcg::Pcg64;

use crate::cluster::Cluster;
use crate::context::SimulationContext;
use crate::cost::CostEstimator;
use crate::error::PlanError;
use crate::schedule::{Assignment, ScheduleEntry};
use crate::schedulers::common::{data_ready_time, SlotPolicy, VmTimeline};
use crate::{log_debug, log_info};

/// Baseline planner placing every task on a uniformly random VM.
///
/// Tasks are visited in topological order and start as soon as their inputs and the chosen VM are
/// available. The generator is seeded, so plans are reproducible.
pub struct RandomPlanner {
    rng: Pcg64,
    ctx: SimulationContext,
}

impl RandomPlanner {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg64::seed_from_u64(seed),
            ctx: SimulationContext::new("random"),
        }
    }

    pub fn schedule(&mut self, estimator: &CostEstimator, cluster: &mut Cluster) -> Result<Assignment, PlanError> {
        let workflow = estimator.workflow();
        let order = workflow.topological_order()?;
        let mut timeline = VmTimeline::new(cluster);
        let mut assignment = Assignment::new(workflow.task_count());

        for task in order {
            let vm = self.rng.gen_range(0..estimator.vm_count());
            let ready_time = data_ready_time(task, vm, &workflow.predecessors(task), &assignment, estimator)?;
            let time = estimator.computation_cost(task, vm);
            let start = timeline.earliest_start(vm, ready_time, time, SlotPolicy::Append);

            log_debug!(
                self.ctx,
                "scheduling [random] task {} on vm {} on time {:.3}-{:.3}",
                workflow.get_task(task).name,
                cluster.vm(vm)?.name,
                start,
                start + time
            );

            timeline.reserve(vm, start, start + time, task);
            cluster.set_free_time(vm, timeline.free_time(vm));
            assignment.insert(ScheduleEntry {
                task,
                vm,
                start,
                finish: start + time,
            })?;
        }

        log_info!(self.ctx, "expected makespan: {:.3}", assignment.expected_makespan());
        Ok(assignment)
    }
}
