//! Workflow graph.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use crate::data_item::DataItem;
use crate::error::WorkflowError;
use crate::task::Task;

/// Directed acyclic graph of tasks connected through data items.
///
/// Tasks and data items are addressed by dense indices assigned in insertion order. Edges are
/// derived: task `a` precedes task `b` when `b` consumes a data item produced by `a`, and the edge
/// weight is the total size of such items.
#[derive(Clone, Debug, Default)]
pub struct Workflow {
    tasks: Vec<Task>,
    data_items: Vec<DataItem>,
}

impl Workflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_task(&mut self, name: &str, cost: f64) -> usize {
        let task_id = self.tasks.len();
        self.tasks.push(Task::new(task_id, name, cost));
        task_id
    }

    pub fn get_task(&self, task_id: usize) -> &Task {
        &self.tasks[task_id]
    }

    pub fn get_tasks(&self) -> &Vec<Task> {
        &self.tasks
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn get_data_item(&self, data_id: usize) -> &DataItem {
        &self.data_items[data_id]
    }

    pub fn get_data_items(&self) -> &Vec<DataItem> {
        &self.data_items
    }

    /// Adds a workflow input, i.e. a data item which is not produced by any task.
    pub fn add_data_item(&mut self, name: &str, size: f64) -> usize {
        let data_item_id = self.data_items.len();
        self.data_items.push(DataItem::new(name, size, None));
        data_item_id
    }

    pub fn add_task_output(&mut self, producer: usize, name: &str, size: f64) -> Result<usize, WorkflowError> {
        if producer >= self.tasks.len() {
            return Err(WorkflowError::DanglingDependency {
                task: format!("data item {}", name),
                dependency: format!("task #{}", producer),
            });
        }
        let data_item_id = self.data_items.len();
        self.data_items.push(DataItem::new(name, size, Some(producer)));
        self.tasks[producer].add_output(data_item_id);
        Ok(data_item_id)
    }

    pub fn add_data_dependency(&mut self, data_item_id: usize, consumer_id: usize) -> Result<(), WorkflowError> {
        if consumer_id >= self.tasks.len() {
            return Err(WorkflowError::DanglingDependency {
                task: format!("task #{}", consumer_id),
                dependency: format!("data item #{}", data_item_id),
            });
        }
        let Some(data_item) = self.data_items.get_mut(data_item_id) else {
            return Err(WorkflowError::DanglingDependency {
                task: self.tasks[consumer_id].name.clone(),
                dependency: format!("data item #{}", data_item_id),
            });
        };
        if data_item.consumers.contains(&consumer_id) {
            return Ok(());
        }
        data_item.add_consumer(consumer_id);
        self.tasks[consumer_id].add_input(data_item_id);
        Ok(())
    }

    /// Connects two tasks with a data item of the given size.
    ///
    /// Pure control dependencies use size 0.
    pub fn add_dependency(&mut self, predecessor: usize, successor: usize, size: f64) -> Result<usize, WorkflowError> {
        for (task, other) in [(successor, predecessor), (predecessor, successor)] {
            if task >= self.tasks.len() {
                return Err(WorkflowError::DanglingDependency {
                    task: self
                        .tasks
                        .get(other)
                        .map_or_else(|| format!("task #{}", other), |t| t.name.clone()),
                    dependency: format!("task #{}", task),
                });
            }
        }
        let name = format!("{}->{}", self.tasks[predecessor].name, self.tasks[successor].name);
        let data_item_id = self.add_task_output(predecessor, &name, size)?;
        self.add_data_dependency(data_item_id, successor)?;
        Ok(data_item_id)
    }

    /// Direct predecessors of the task with the total size of data received from each of them,
    /// ordered by task id.
    pub fn predecessors(&self, task_id: usize) -> Vec<(usize, f64)> {
        let mut result: BTreeMap<usize, f64> = BTreeMap::new();
        for &data_item_id in self.tasks[task_id].inputs.iter() {
            let data_item = &self.data_items[data_item_id];
            if let Some(producer) = data_item.producer {
                *result.entry(producer).or_default() += data_item.size;
            }
        }
        result.into_iter().collect()
    }

    /// Direct successors of the task with the total size of data sent to each of them,
    /// ordered by task id.
    pub fn successors(&self, task_id: usize) -> Vec<(usize, f64)> {
        let mut result: BTreeMap<usize, f64> = BTreeMap::new();
        for &data_item_id in self.tasks[task_id].outputs.iter() {
            let data_item = &self.data_items[data_item_id];
            for &consumer in data_item.consumers.iter() {
                *result.entry(consumer).or_default() += data_item.size;
            }
        }
        result.into_iter().collect()
    }

    /// Tasks without predecessors.
    pub fn entry_tasks(&self) -> Vec<usize> {
        (0..self.tasks.len())
            .filter(|&t| self.predecessors(t).is_empty())
            .collect()
    }

    /// Tasks without successors.
    pub fn exit_tasks(&self) -> Vec<usize> {
        (0..self.tasks.len()).filter(|&t| self.successors(t).is_empty()).collect()
    }

    /// Returns tasks in topological order.
    ///
    /// Among the tasks which are ready at the same step the lowest id goes first, so the order is
    /// fully determined by the graph. Fails with [`WorkflowError::CycleDetected`] listing the tasks
    /// that could not be ordered.
    pub fn topological_order(&self) -> Result<Vec<usize>, WorkflowError> {
        let total_tasks = self.tasks.len();
        let successors = (0..total_tasks).map(|t| self.successors(t)).collect::<Vec<_>>();
        let mut in_degree = vec![0usize; total_tasks];
        for succ in successors.iter() {
            for &(s, _) in succ.iter() {
                in_degree[s] += 1;
            }
        }

        let mut ready: BinaryHeap<Reverse<usize>> =
            (0..total_tasks).filter(|&t| in_degree[t] == 0).map(Reverse).collect();
        let mut order = Vec::with_capacity(total_tasks);
        while let Some(Reverse(task)) = ready.pop() {
            order.push(task);
            for &(s, _) in successors[task].iter() {
                in_degree[s] -= 1;
                if in_degree[s] == 0 {
                    ready.push(Reverse(s));
                }
            }
        }

        if order.len() < total_tasks {
            let tasks = (0..total_tasks)
                .filter(|&t| in_degree[t] > 0)
                .map(|t| self.tasks[t].name.clone())
                .collect();
            return Err(WorkflowError::CycleDetected { tasks });
        }
        Ok(order)
    }

    /// Longest path distance (in edges) from an entry task, entry tasks being at depth 0.
    pub fn depths(&self) -> Result<Vec<usize>, WorkflowError> {
        let order = self.topological_order()?;
        let mut depths = vec![0usize; self.tasks.len()];
        for &task in order.iter() {
            depths[task] = self
                .predecessors(task)
                .iter()
                .map(|&(pred, _)| depths[pred] + 1)
                .max()
                .unwrap_or(0);
        }
        Ok(depths)
    }

    /// Checks the structural invariants required by the planner.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.tasks.is_empty() {
            return Err(WorkflowError::Empty);
        }
        if let Some(task) = self.tasks.iter().find(|t| !(t.cost >= 0.) || !t.cost.is_finite()) {
            return Err(WorkflowError::NegativeCost {
                task: task.name.clone(),
                cost: task.cost,
            });
        }
        if let Some(data_item) = self
            .data_items
            .iter()
            .find(|d| !(d.size >= 0.) || !d.size.is_finite())
        {
            return Err(WorkflowError::NegativeDataSize {
                data_item: data_item.name.clone(),
                size: data_item.size,
            });
        }
        self.topological_order().map(|_| ())
    }
}
