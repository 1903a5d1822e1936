//! Workflow execution log.

use std::fs::File;
use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::cluster::Cluster;
use crate::context::SimulationContext;
use crate::log_debug;
use crate::workflow::Workflow;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TaskScheduled {
        time: f64,
        task_id: usize,
        task_name: String,
        vm: String,
        start: f64,
        finish: f64,
    },
    TaskReady {
        time: f64,
        task_id: usize,
        task_name: String,
    },
    TaskStarted {
        time: f64,
        task_id: usize,
        task_name: String,
        vm: String,
    },
    TaskCompleted {
        time: f64,
        task_id: usize,
        task_name: String,
        vm: String,
    },
}

impl Event {
    pub fn time(&self) -> f64 {
        match self {
            Event::TaskScheduled { time, .. }
            | Event::TaskReady { time, .. }
            | Event::TaskStarted { time, .. }
            | Event::TaskCompleted { time, .. } => *time,
        }
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Event::TaskScheduled {
                task_name,
                vm,
                start,
                finish,
                ..
            } => write!(f, "scheduled task {task_name} to {vm} for {start:.3}-{finish:.3}"),
            Event::TaskReady { task_name, .. } => write!(f, "task {task_name} is ready"),
            Event::TaskStarted { task_name, vm, .. } => write!(f, "started task {task_name} on {vm}"),
            Event::TaskCompleted { task_name, vm, .. } => write!(f, "completed task {task_name} on {vm}"),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Default, Debug, PartialEq)]
pub struct Vm {
    pub name: String,
    pub speed: f64,
}

#[derive(Serialize, Deserialize, Clone, Default, Debug, PartialEq)]
pub struct Task {
    pub name: String,
    pub cost: f64,
    pub inputs: Vec<usize>,
    pub outputs: Vec<usize>,
}

#[derive(Serialize, Deserialize, Clone, Default, Debug, PartialEq)]
pub struct DataItem {
    pub name: String,
    pub size: f64,
    pub consumers: Vec<usize>,
}

#[derive(Serialize, Deserialize, Clone, Default, Debug, PartialEq)]
pub struct Graph {
    pub tasks: Vec<Task>,
    pub data_items: Vec<DataItem>,
}

/// Everything needed to visualize a run: the cluster, the workflow and the timeline of events.
#[derive(Serialize, Deserialize, Clone, Default, Debug, PartialEq)]
pub struct TraceLog {
    pub vms: Vec<Vm>,
    pub graph: Graph,
    pub events: Vec<Event>,
}

impl TraceLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log_event(&mut self, ctx: &SimulationContext, event: Event) {
        log_debug!(ctx, "{}", event);
        self.events.push(event);
    }

    pub fn log_cluster(&mut self, cluster: &Cluster) {
        self.vms = cluster
            .vms()
            .iter()
            .map(|vm| Vm {
                name: vm.name.clone(),
                speed: vm.speed,
            })
            .collect();
    }

    pub fn log_workflow(&mut self, workflow: &Workflow) {
        self.graph.tasks = workflow
            .get_tasks()
            .iter()
            .map(|task| Task {
                name: task.name.clone(),
                cost: task.cost,
                inputs: task.inputs.clone(),
                outputs: task.outputs.clone(),
            })
            .collect();
        self.graph.data_items = workflow
            .get_data_items()
            .iter()
            .map(|data_item| DataItem {
                name: data_item.name.clone(),
                size: data_item.size,
                consumers: data_item.consumers().to_vec(),
            })
            .collect();
    }

    pub fn save_to_file(&self, filename: &str) -> Result<(), std::io::Error> {
        File::create(filename)?.write_all(serde_json::to_string_pretty(self)?.as_bytes())
    }
}
