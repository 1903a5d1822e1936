//! Workflow task.

use serde::Serialize;

/// Represents a workflow task.
///
/// Described by the amount of computation (work units, i.e. runtime at the reference speed multiplied
/// by that speed). A task running on a VM with speed `s` takes `cost / s` time units.
///
/// Each task can consume (as task inputs) and produce (as task outputs) one or more data items.
#[derive(Clone, Debug, Serialize)]
pub struct Task {
    pub id: usize,
    pub name: String,
    pub cost: f64,
    pub inputs: Vec<usize>,
    pub outputs: Vec<usize>,
}

impl Task {
    /// Creates new task.
    pub fn new(id: usize, name: &str, cost: f64) -> Self {
        Self {
            id,
            name: name.to_string(),
            cost,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Adds task input.
    pub fn add_input(&mut self, data_item_id: usize) {
        self.inputs.push(data_item_id);
    }

    /// Adds task output.
    pub fn add_output(&mut self, data_item_id: usize) {
        self.outputs.push(data_item_id);
    }
}
