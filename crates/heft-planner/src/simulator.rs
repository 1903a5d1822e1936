//! Replay of a static assignment on the simulated cluster.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::Serialize;

use crate::cluster::Cluster;
use crate::context::SimulationContext;
use crate::cost::CostEstimator;
use crate::error::{ConflictKind, PlanError, ScheduleConflict};
use crate::schedule::Assignment;
use crate::trace_log::{Event, TraceLog};
use crate::{log_debug, log_error, log_info, log_trace};

/// Tolerance used when comparing times computed along different paths.
const EPS: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum EventKind {
    TaskFinish,
    TaskStart,
}

struct QueuedEvent {
    time: f64,
    kind: EventKind,
    planned_finish: f64,
    order: usize,
    seq: u64,
    task: usize,
}

impl QueuedEvent {
    fn key_cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then(self.kind.cmp(&other.kind))
            .then(self.planned_finish.total_cmp(&other.planned_finish))
            .then(self.order.cmp(&other.order))
            .then(self.seq.cmp(&other.seq))
    }
}

impl PartialEq for QueuedEvent {
    fn eq(&self, other: &Self) -> bool {
        self.key_cmp(other) == Ordering::Equal
    }
}

impl Eq for QueuedEvent {}

impl PartialOrd for QueuedEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedEvent {
    // reversed for the max-heap: earliest event first
    fn cmp(&self, other: &Self) -> Ordering {
        other.key_cmp(self)
    }
}

/// Actual execution window of a task.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TaskExecution {
    pub task: usize,
    pub vm: usize,
    pub start: f64,
    pub finish: f64,
}

impl TaskExecution {
    pub fn duration(&self) -> f64 {
        self.finish - self.start
    }
}

/// Result of a replay: completed tasks and the event log.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExecutionTrace {
    executions: Vec<Option<TaskExecution>>,
    completion_order: Vec<usize>,
    makespan: f64,
    log: TraceLog,
}

impl ExecutionTrace {
    fn new(task_count: usize) -> Self {
        Self {
            executions: vec![None; task_count],
            completion_order: Vec::with_capacity(task_count),
            makespan: 0.,
            log: TraceLog::new(),
        }
    }

    /// Execution of a completed task, `None` if the task did not complete.
    pub fn execution(&self, task: usize) -> Option<&TaskExecution> {
        self.executions.get(task).and_then(|e| e.as_ref())
    }

    /// Completed tasks in completion order.
    pub fn executions(&self) -> impl Iterator<Item = &TaskExecution> + '_ {
        self.completion_order
            .iter()
            .filter_map(move |&t| self.executions[t].as_ref())
    }

    pub fn completed_count(&self) -> usize {
        self.completion_order.len()
    }

    pub fn is_complete(&self) -> bool {
        self.completion_order.len() == self.executions.len()
    }

    /// Finish time of the last completed task.
    pub fn makespan(&self) -> f64 {
        self.makespan
    }

    pub fn log(&self) -> &TraceLog {
        &self.log
    }
}

/// Replays an [`Assignment`] in time order.
///
/// Tasks start exactly at their planned start times and run for their computation cost on the
/// assigned VM. Before each start the simulator checks that the VM is idle and that the outputs of
/// all predecessors have arrived; the first violation aborts the replay.
pub struct ExecutionSimulator<'a> {
    estimator: &'a CostEstimator<'a>,
    cluster: &'a Cluster,
    assignment: &'a Assignment,
    ctx: SimulationContext,
}

impl<'a> ExecutionSimulator<'a> {
    pub fn new(estimator: &'a CostEstimator<'a>, cluster: &'a Cluster, assignment: &'a Assignment) -> Self {
        Self {
            estimator,
            cluster,
            assignment,
            ctx: SimulationContext::new("simulator"),
        }
    }

    /// Replays the whole assignment, failing on the first conflict.
    pub fn run(&mut self) -> Result<ExecutionTrace, PlanError> {
        match self.run_partial() {
            (trace, None) => Ok(trace),
            (_, Some(err)) => Err(err),
        }
    }

    /// Replays the assignment and keeps whatever was completed before a failure.
    pub fn run_partial(&mut self) -> (ExecutionTrace, Option<PlanError>) {
        let mut trace = ExecutionTrace::new(self.estimator.workflow().task_count());
        trace.log.log_cluster(self.cluster);
        trace.log.log_workflow(self.estimator.workflow());
        let result = self.replay(&mut trace);
        match result {
            Ok(()) => {
                log_info!(self.ctx, "workflow completed, makespan: {:.3}", trace.makespan);
                (trace, None)
            }
            Err(err) => {
                log_error!(self.ctx, "replay aborted: {}", err);
                (trace, Some(err))
            }
        }
    }

    fn replay(&mut self, trace: &mut ExecutionTrace) -> Result<(), PlanError> {
        let workflow = self.estimator.workflow();
        let total_tasks = workflow.task_count();
        if self.assignment.task_count() != total_tasks {
            return Err(PlanError::InternalInvariantViolation(format!(
                "assignment covers {} tasks, workflow has {}",
                self.assignment.task_count(),
                total_tasks
            )));
        }

        if let Some(task) = (0..total_tasks).find(|&t| self.assignment.get(t).is_none()) {
            return Err(missing_entry(task));
        }

        let mut queue = BinaryHeap::new();
        let mut seq = 0;
        for (order, &task) in self.assignment.order().iter().enumerate() {
            let entry = self.assignment.get(task).ok_or_else(|| missing_entry(task))?;
            let vm = self.cluster.vm(entry.vm)?;
            trace.log.log_event(
                &self.ctx,
                Event::TaskScheduled {
                    time: 0.,
                    task_id: task,
                    task_name: workflow.get_task(task).name.clone(),
                    vm: vm.name.clone(),
                    start: entry.start,
                    finish: entry.finish,
                },
            );
            queue.push(QueuedEvent {
                time: entry.start,
                kind: EventKind::TaskStart,
                planned_finish: entry.finish,
                order,
                seq,
                task,
            });
            seq += 1;
        }

        let predecessors = (0..total_tasks).map(|t| workflow.predecessors(t)).collect::<Vec<_>>();
        let successors = (0..total_tasks).map(|t| workflow.successors(t)).collect::<Vec<_>>();
        let mut unfinished_preds = predecessors.iter().map(|p| p.len()).collect::<Vec<_>>();
        // tasks started so far with their execution windows
        let mut started: Vec<Option<TaskExecution>> = vec![None; total_tasks];
        let mut running: Vec<Option<usize>> = vec![None; self.cluster.vm_count()];

        while let Some(event) = queue.pop() {
            self.ctx.set_time(event.time);
            let task = event.task;
            log_trace!(self.ctx, "{:?} of task {}", event.kind, task);
            match event.kind {
                EventKind::TaskStart => {
                    let entry = self.assignment.get(task).ok_or_else(|| missing_entry(task))?;
                    let conflict = |kind| {
                        PlanError::ScheduleConflict(ScheduleConflict {
                            task,
                            vm: entry.vm,
                            start: entry.start,
                            finish: entry.finish,
                            kind,
                        })
                    };

                    if let Some(other) = running[entry.vm] {
                        let busy_until = started[other].as_ref().map_or(f64::INFINITY, |e| e.finish);
                        if busy_until > event.time + EPS {
                            return Err(conflict(ConflictKind::VmDoubleBooked { other_task: other }));
                        }
                    }

                    for &(pred, data) in predecessors[task].iter() {
                        let ready_at = match started[pred].as_ref() {
                            Some(e) => e.finish + self.estimator.communication_cost(data, e.vm, entry.vm),
                            None => {
                                let planned = self.assignment.get(pred).ok_or_else(|| missing_entry(pred))?;
                                planned.finish + self.estimator.communication_cost(data, planned.vm, entry.vm)
                            }
                        };
                        if started[pred].is_none() || ready_at > event.time + EPS {
                            return Err(conflict(ConflictKind::DependencyNotMet {
                                predecessor: pred,
                                ready_at,
                            }));
                        }
                    }

                    let execution = TaskExecution {
                        task,
                        vm: entry.vm,
                        start: event.time,
                        finish: event.time + self.estimator.computation_cost(task, entry.vm),
                    };
                    trace.log.log_event(
                        &self.ctx,
                        Event::TaskStarted {
                            time: event.time,
                            task_id: task,
                            task_name: workflow.get_task(task).name.clone(),
                            vm: self.cluster.vm(entry.vm)?.name.clone(),
                        },
                    );
                    queue.push(QueuedEvent {
                        time: execution.finish,
                        kind: EventKind::TaskFinish,
                        planned_finish: entry.finish,
                        order: event.order,
                        seq,
                        task,
                    });
                    seq += 1;
                    running[entry.vm] = Some(task);
                    started[task] = Some(execution);
                }
                EventKind::TaskFinish => {
                    let execution = started[task].clone().ok_or_else(|| {
                        PlanError::InternalInvariantViolation(format!("task {} finished without starting", task))
                    })?;
                    if running[execution.vm] == Some(task) {
                        running[execution.vm] = None;
                    }
                    trace.log.log_event(
                        &self.ctx,
                        Event::TaskCompleted {
                            time: event.time,
                            task_id: task,
                            task_name: workflow.get_task(task).name.clone(),
                            vm: self.cluster.vm(execution.vm)?.name.clone(),
                        },
                    );
                    trace.makespan = trace.makespan.max(execution.finish);
                    trace.executions[task] = Some(execution);
                    trace.completion_order.push(task);

                    for &(succ, _) in successors[task].iter() {
                        unfinished_preds[succ] -= 1;
                        if unfinished_preds[succ] == 0 {
                            trace.log.log_event(
                                &self.ctx,
                                Event::TaskReady {
                                    time: event.time,
                                    task_id: succ,
                                    task_name: workflow.get_task(succ).name.clone(),
                                },
                            );
                        }
                    }
                }
            }
        }

        if !trace.is_complete() {
            return Err(PlanError::InternalInvariantViolation(format!(
                "only {} of {} tasks completed",
                trace.completed_count(),
                total_tasks
            )));
        }
        log_debug!(self.ctx, "all {} tasks completed", total_tasks);
        Ok(())
    }
}

fn missing_entry(task: usize) -> PlanError {
    PlanError::InternalInvariantViolation(format!("task {} has no assignment entry", task))
}
