use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_xml_rs::from_str;

use crate::context::SimulationContext;
use crate::error::{read_file, LoadError, WorkflowError};
use crate::log_debug;
use crate::parsers::config::ParserConfig;
use crate::workflow::Workflow;

const BYTES_PER_MB: f64 = 1e6;

#[derive(Debug, Serialize, Deserialize)]
struct File {
    #[serde(rename = "file", alias = "name")]
    name: String,
    link: String,
    #[serde(default)]
    size: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct Job {
    id: String,
    name: String,
    runtime: f64,
    #[serde(rename = "uses", default)]
    files: Vec<File>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Parent {
    #[serde(rename = "ref")]
    id: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Child {
    #[serde(rename = "ref")]
    id: String,
    #[serde(rename = "parent", default)]
    parents: Vec<Parent>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename = "adag")]
struct Dax {
    #[serde(rename = "job", default)]
    jobs: Vec<Job>,
    #[serde(rename = "child", default)]
    children: Vec<Child>,
}

impl Workflow {
    /// Reads workflow from a file in [DAX format](https://pegasus.isi.edu/documentation/development/schemas.html).
    ///
    /// Job runtimes are seconds on a machine with `config.reference_speed`, file sizes are bytes.
    pub fn from_dax<P: AsRef<Path>>(path: P, config: &ParserConfig) -> Result<Self, LoadError> {
        Self::from_dax_str(&read_file(path)?, config)
    }

    pub fn from_dax_str(s: &str, config: &ParserConfig) -> Result<Self, LoadError> {
        if !(config.reference_speed > 0.) {
            return Err(LoadError::InvalidParameter(format!(
                "reference speed must be positive, got {}",
                config.reference_speed
            )));
        }
        let dax: Dax = from_str(s)?;
        let mut workflow = Workflow::new();
        let mut data_items: IndexMap<String, usize> = IndexMap::new();
        let mut task_ids: IndexMap<&str, usize> = IndexMap::new();

        for job in dax.jobs.iter() {
            if task_ids.contains_key(job.id.as_str()) {
                return Err(WorkflowError::DuplicateTaskName(job.id.clone()).into());
            }
            // job names repeat across a DAX, ids don't
            let task_id = workflow.add_task(&format!("{}_{}", job.name, job.id), job.runtime * config.reference_speed);
            task_ids.insert(&job.id, task_id);
            for file in job.files.iter() {
                if file.link == "output" {
                    if data_items.contains_key(&file.name) {
                        return Err(WorkflowError::DuplicateDataItem(file.name.clone()).into());
                    }
                    data_items.insert(
                        file.name.clone(),
                        workflow.add_task_output(task_id, &file.name, file.size / BYTES_PER_MB)?,
                    );
                }
            }
        }

        for (task_id, job) in dax.jobs.iter().enumerate() {
            for file in job.files.iter() {
                if file.link == "input" {
                    let data_item_id = match data_items.get(&file.name) {
                        Some(&data_item_id) => data_item_id,
                        None => {
                            let data_item_id = workflow.add_data_item(&file.name, file.size / BYTES_PER_MB);
                            data_items.insert(file.name.clone(), data_item_id);
                            data_item_id
                        }
                    };
                    workflow.add_data_dependency(data_item_id, task_id)?;
                }
            }
        }

        // explicit dependencies not backed by a file become zero-size edges
        let ctx = SimulationContext::new("dax_parser");
        for child in dax.children.iter() {
            let child_id = *task_ids
                .get(child.id.as_str())
                .ok_or_else(|| WorkflowError::DanglingDependency {
                    task: format!("child {}", child.id),
                    dependency: format!("job {}", child.id),
                })?;
            for parent in child.parents.iter() {
                let parent_id = *task_ids
                    .get(parent.id.as_str())
                    .ok_or_else(|| WorkflowError::DanglingDependency {
                        task: child.id.clone(),
                        dependency: parent.id.clone(),
                    })?;
                if workflow.predecessors(child_id).iter().all(|&(pred, _)| pred != parent_id) {
                    log_debug!(ctx, "control dependency {} -> {}", parent.id, child.id);
                    workflow.add_dependency(parent_id, child_id, 0.)?;
                }
            }
        }

        workflow.validate()?;
        Ok(workflow)
    }
}
