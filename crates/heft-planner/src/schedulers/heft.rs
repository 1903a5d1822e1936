use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::Serialize;

use crate::cluster::Cluster;
use crate::context::SimulationContext;
use crate::cost::CostEstimator;
use crate::error::PlanError;
use crate::schedule::{Assignment, ScheduleEntry};
use crate::schedulers::common::{data_ready_time, SlotPolicy, VmTimeline};
use crate::{log_debug, log_info};

/// Upward ranks of all tasks.
///
/// The rank of a task estimates the length of the longest path from its start to the end of the
/// workflow, using average computation and communication costs.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RankTable {
    ranks: Vec<f64>,
    order: Vec<usize>,
}

impl RankTable {
    /// Computes ranks in reverse topological order, so every successor is ranked before its
    /// predecessors without recursion. Fails on cyclic workflows before producing any rank.
    pub fn compute(estimator: &CostEstimator) -> Result<Self, PlanError> {
        let workflow = estimator.workflow();
        let topological_order = workflow.topological_order()?;

        let mut ranks = vec![0.; workflow.task_count()];
        for &task in topological_order.iter().rev() {
            let tail = workflow
                .successors(task)
                .iter()
                .map(|&(succ, data)| estimator.average_communication_cost(data) + ranks[succ])
                .fold(0., f64::max);
            ranks[task] = estimator.average_computation_cost(task) + tail;
        }

        let mut order = (0..workflow.task_count()).collect::<Vec<_>>();
        order.sort_by(|&a, &b| ranks[b].total_cmp(&ranks[a]).then(a.cmp(&b)));
        Ok(Self { ranks, order })
    }

    pub fn rank(&self, task: usize) -> f64 {
        self.ranks[task]
    }

    pub fn ranks(&self) -> &[f64] {
        &self.ranks
    }

    /// Task ids by descending rank, ties broken by lower id.
    pub fn order(&self) -> &[usize] {
        &self.order
    }
}

/// Lifecycle of a [`HeftPlanner`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PlannerState {
    Unranked,
    Ranked,
    /// Terminal: the assignment has been produced.
    Scheduled,
}

#[derive(PartialEq)]
struct ReadyTask {
    rank: f64,
    task: usize,
}

impl Eq for ReadyTask {}

impl PartialOrd for ReadyTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ReadyTask {
    // max-heap: higher rank first, then lower id
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank.total_cmp(&other.rank).then(other.task.cmp(&self.task))
    }
}

/// Heterogeneous Earliest Finish Time planner.
///
/// Tasks are taken by descending upward rank and each one is placed on the VM that gives it the
/// earliest finish time (lowest VM id on ties). Decisions are never revisited.
pub struct HeftPlanner {
    slot_policy: SlotPolicy,
    state: PlannerState,
    ranks: Option<RankTable>,
    ctx: SimulationContext,
}

impl HeftPlanner {
    pub fn new() -> Self {
        Self {
            slot_policy: SlotPolicy::Append,
            state: PlannerState::Unranked,
            ranks: None,
            ctx: SimulationContext::new("heft"),
        }
    }

    pub fn with_slot_policy(mut self, slot_policy: SlotPolicy) -> Self {
        self.slot_policy = slot_policy;
        self
    }

    pub fn state(&self) -> PlannerState {
        self.state
    }

    pub fn ranks(&self) -> Option<&RankTable> {
        self.ranks.as_ref()
    }

    pub fn into_ranks(self) -> Option<RankTable> {
        self.ranks
    }

    /// UNRANKED → RANKED.
    pub fn rank(&mut self, estimator: &CostEstimator) -> Result<&RankTable, PlanError> {
        if self.state != PlannerState::Unranked {
            return Err(PlanError::InternalInvariantViolation(format!(
                "can't rank tasks in state {:?}",
                self.state
            )));
        }
        let ranks = RankTable::compute(estimator)?;
        log_debug!(
            self.ctx,
            "ranked {} tasks, top rank {:.3}",
            ranks.ranks.len(),
            ranks.order.first().map_or(0., |&t| ranks.rank(t))
        );
        self.state = PlannerState::Ranked;
        Ok(self.ranks.insert(ranks))
    }

    /// RANKED → SCHEDULED, ranking first if needed.
    ///
    /// Updates the free-time of every VM the tasks were placed on.
    pub fn schedule(&mut self, estimator: &CostEstimator, cluster: &mut Cluster) -> Result<Assignment, PlanError> {
        if self.state == PlannerState::Unranked {
            self.rank(estimator)?;
        }
        let ranks = match (self.state, self.ranks.as_ref()) {
            (PlannerState::Ranked, Some(ranks)) => ranks,
            _ => {
                return Err(PlanError::InternalInvariantViolation(format!(
                    "can't schedule tasks in state {:?}",
                    self.state
                )))
            }
        };

        let workflow = estimator.workflow();
        let total_tasks = workflow.task_count();
        let predecessors = (0..total_tasks).map(|t| workflow.predecessors(t)).collect::<Vec<_>>();
        let successors = (0..total_tasks).map(|t| workflow.successors(t)).collect::<Vec<_>>();

        // a task becomes ready once all of its predecessors are placed, which keeps the
        // descending rank order precedence-safe even for zero-cost tasks
        let mut pending = predecessors.iter().map(|p| p.len()).collect::<Vec<_>>();
        let mut ready = (0..total_tasks)
            .filter(|&t| pending[t] == 0)
            .map(|task| ReadyTask {
                rank: ranks.rank(task),
                task,
            })
            .collect::<BinaryHeap<_>>();

        let mut timeline = VmTimeline::new(cluster);
        let mut assignment = Assignment::new(total_tasks);

        while let Some(ReadyTask { task, .. }) = ready.pop() {
            let mut best: Option<ScheduleEntry> = None;
            for vm in 0..estimator.vm_count() {
                let ready_time = data_ready_time(task, vm, &predecessors[task], &assignment, estimator)?;
                let time = estimator.computation_cost(task, vm);
                let start = timeline.earliest_start(vm, ready_time, time, self.slot_policy);
                if best.as_ref().map_or(true, |b| start + time < b.finish) {
                    best = Some(ScheduleEntry {
                        task,
                        vm,
                        start,
                        finish: start + time,
                    });
                }
            }
            let entry = best.ok_or_else(|| {
                PlanError::InternalInvariantViolation(format!("no vm available for task {}", task))
            })?;

            log_debug!(
                self.ctx,
                "scheduling [heft] task {} on vm {} on time {:.3}-{:.3}",
                workflow.get_task(task).name,
                cluster.vm(entry.vm)?.name,
                entry.start,
                entry.finish
            );

            timeline.reserve(entry.vm, entry.start, entry.finish, task);
            cluster.set_free_time(entry.vm, timeline.free_time(entry.vm));
            assignment.insert(entry)?;

            for &(succ, _) in successors[task].iter() {
                pending[succ] -= 1;
                if pending[succ] == 0 {
                    ready.push(ReadyTask {
                        rank: ranks.rank(succ),
                        task: succ,
                    });
                }
            }
        }

        if !assignment.is_complete() {
            return Err(PlanError::InternalInvariantViolation(format!(
                "only {} of {} tasks were scheduled",
                assignment.order().len(),
                total_tasks
            )));
        }

        log_info!(self.ctx, "expected makespan: {:.3}", assignment.expected_makespan());
        self.state = PlannerState::Scheduled;
        Ok(assignment)
    }
}

impl Default for HeftPlanner {
    fn default() -> Self {
        Self::new()
    }
}
