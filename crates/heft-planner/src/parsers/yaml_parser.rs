use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{read_file, LoadError, WorkflowError};
use crate::workflow::Workflow;

#[derive(Debug, Serialize, Deserialize)]
struct DataItem {
    name: String,
    size: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct Task {
    name: String,
    cost: f64,
    #[serde(default = "Vec::new")]
    inputs: Vec<String>,
    #[serde(default = "Vec::new")]
    outputs: Vec<DataItem>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Yaml {
    tasks: Vec<Task>,
    #[serde(default = "Vec::new")]
    inputs: Vec<DataItem>,
}

impl Workflow {
    /// Reads workflow from a YAML file.
    ///
    /// ```yaml
    /// inputs:
    ///   - name: raw
    ///     size: 10
    /// tasks:
    ///   - name: A
    ///     cost: 100
    ///     inputs: [raw]
    ///     outputs:
    ///       - name: a_out
    ///         size: 5
    ///   - name: B
    ///     cost: 200
    ///     inputs: [a_out]
    /// ```
    ///
    /// Costs are in work units, sizes in MB.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        Self::from_yaml_str(&read_file(path)?)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, LoadError> {
        let yaml: Yaml = serde_yaml::from_str(s)?;
        let mut workflow = Workflow::new();
        let mut data_items: IndexMap<String, usize> = IndexMap::new();
        for data_item in yaml.inputs.iter() {
            if data_items.contains_key(&data_item.name) {
                return Err(WorkflowError::DuplicateDataItem(data_item.name.clone()).into());
            }
            data_items.insert(
                data_item.name.clone(),
                workflow.add_data_item(&data_item.name, data_item.size),
            );
        }

        let mut task_ids: IndexMap<&str, usize> = IndexMap::new();
        for task in yaml.tasks.iter() {
            if task_ids.contains_key(task.name.as_str()) {
                return Err(WorkflowError::DuplicateTaskName(task.name.clone()).into());
            }
            let task_id = workflow.add_task(&task.name, task.cost);
            task_ids.insert(&task.name, task_id);
            for output in task.outputs.iter() {
                if data_items.contains_key(&output.name) {
                    return Err(WorkflowError::DuplicateDataItem(output.name.clone()).into());
                }
                data_items.insert(
                    output.name.clone(),
                    workflow.add_task_output(task_id, &output.name, output.size)?,
                );
            }
        }

        for (task_id, task) in yaml.tasks.iter().enumerate() {
            for input in task.inputs.iter() {
                let data_item_id = *data_items.get(input).ok_or_else(|| WorkflowError::DanglingDependency {
                    task: task.name.clone(),
                    dependency: input.clone(),
                })?;
                workflow.add_data_dependency(data_item_id, task_id)?;
            }
        }

        workflow.validate()?;
        Ok(workflow)
    }
}
