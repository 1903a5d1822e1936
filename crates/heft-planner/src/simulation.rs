//! Main entry point for planning and simulating a workflow run.

use serde::Serialize;

use crate::cluster::{Cluster, ClusterConfig};
use crate::config::RunConfig;
use crate::context::SimulationContext;
use crate::cost::CostEstimator;
use crate::error::PlanError;
use crate::lower_bound::makespan_lower_bound;
use crate::planner::{Plan, PlanningAlgorithm};
use crate::report::Report;
use crate::run_stats::RunStats;
use crate::simulator::{ExecutionSimulator, ExecutionTrace};
use crate::workflow::Workflow;
use crate::{log_info, log_warn};

/// Everything produced by a run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunResult {
    pub plan: Plan,
    pub trace: ExecutionTrace,
    pub report: Report,
}

/// Wires workflow, cluster and planning algorithm together:
/// validation, planning, replay and reporting.
pub struct WorkflowSimulation {
    workflow: Workflow,
    cluster: Cluster,
    algorithm: PlanningAlgorithm,
    ctx: SimulationContext,
}

impl WorkflowSimulation {
    pub fn new(workflow: Workflow, cluster: Cluster, algorithm: PlanningAlgorithm) -> Self {
        Self {
            workflow,
            cluster,
            algorithm,
            ctx: SimulationContext::new("simulation"),
        }
    }

    pub fn from_config(workflow: Workflow, cluster: &ClusterConfig, run: &RunConfig) -> Result<Self, PlanError> {
        Ok(Self::new(workflow, cluster.build()?, run.resolved_algorithm()))
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn cluster(&self) -> &Cluster {
        &self.cluster
    }

    pub fn algorithm(&self) -> PlanningAlgorithm {
        self.algorithm
    }

    /// Validates the inputs and computes a fresh assignment, starting from idle VMs.
    pub fn plan(&mut self) -> Result<Plan, PlanError> {
        self.workflow.validate()?;
        self.cluster.reset();
        log_info!(
            self.ctx,
            "planning {} tasks on {} vms with {}",
            self.workflow.task_count(),
            self.cluster.vm_count(),
            self.algorithm
        );
        let estimator = CostEstimator::new(&self.workflow, &self.cluster);
        self.algorithm.plan(&estimator, &mut self.cluster)
    }

    /// Plans and replays the workflow, failing on the first error.
    pub fn run(&mut self) -> Result<RunResult, PlanError> {
        match self.run_partial()? {
            (result, None) => Ok(result),
            (_, Some(err)) => Err(err),
        }
    }

    /// Plans and replays the workflow.
    ///
    /// Invalid inputs and planning failures are returned as errors. A replay failure still
    /// produces the result with the tasks completed so far, the rest reported as failed.
    pub fn run_partial(&mut self) -> Result<(RunResult, Option<PlanError>), PlanError> {
        let plan = self.plan()?;
        let estimator = CostEstimator::new(&self.workflow, &self.cluster);
        let (trace, error) = ExecutionSimulator::new(&estimator, &self.cluster, &plan.assignment).run_partial();
        if error.is_some() {
            log_warn!(
                self.ctx,
                "replay stopped after {} of {} tasks",
                trace.completed_count(),
                self.workflow.task_count()
            );
        }

        let mut stats = RunStats::new(
            Some(plan.assignment.expected_makespan()),
            makespan_lower_bound(&self.workflow, &self.cluster)?,
        );
        stats.collect(&trace, &estimator);
        let report = Report::build(&self.workflow, &plan.assignment, &trace, stats)?;
        log_info!(
            self.ctx,
            "makespan: {:.3}, failed tasks: {}",
            report.makespan,
            report.failed_count()
        );

        Ok((RunResult { plan, trace, report }, error))
    }
}
