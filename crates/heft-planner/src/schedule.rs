//! Static task-to-VM assignment produced by a planner.

use serde::Serialize;

use crate::error::PlanError;

/// Planned placement of one task.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScheduleEntry {
    pub task: usize,
    pub vm: usize,
    pub start: f64,
    pub finish: f64,
}

impl ScheduleEntry {
    pub fn duration(&self) -> f64 {
        self.finish - self.start
    }
}

/// Mapping from task to its planned placement.
///
/// Besides the per-task lookup it keeps the order in which the planner made its decisions, which
/// the simulator uses to order simultaneous task starts.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Assignment {
    entries: Vec<Option<ScheduleEntry>>,
    order: Vec<usize>,
}

impl Assignment {
    pub fn new(task_count: usize) -> Self {
        Self {
            entries: vec![None; task_count],
            order: Vec::with_capacity(task_count),
        }
    }

    /// Builds an assignment from entries listed in decision order.
    pub fn from_entries(task_count: usize, entries: Vec<ScheduleEntry>) -> Result<Self, PlanError> {
        let mut assignment = Self::new(task_count);
        for entry in entries {
            assignment.insert(entry)?;
        }
        Ok(assignment)
    }

    pub fn insert(&mut self, entry: ScheduleEntry) -> Result<(), PlanError> {
        let task = entry.task;
        let task_count = self.entries.len();
        match self.entries.get_mut(task) {
            None => Err(PlanError::InternalInvariantViolation(format!(
                "task {} is out of range for a workflow of {} tasks",
                task, task_count
            ))),
            Some(Some(_)) => Err(PlanError::InternalInvariantViolation(format!(
                "task {} is assigned twice",
                task
            ))),
            Some(slot) => {
                if !(entry.finish >= entry.start) {
                    return Err(PlanError::InternalInvariantViolation(format!(
                        "task {} finishes at {} before its start {}",
                        task, entry.finish, entry.start
                    )));
                }
                *slot = Some(entry);
                self.order.push(task);
                Ok(())
            }
        }
    }

    pub fn get(&self, task: usize) -> Option<&ScheduleEntry> {
        self.entries.get(task).and_then(|e| e.as_ref())
    }

    /// Task ids in the order they were placed.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Entries in the order they were placed.
    pub fn entries(&self) -> impl Iterator<Item = &ScheduleEntry> + '_ {
        self.order.iter().filter_map(move |&t| self.entries[t].as_ref())
    }

    pub fn task_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_complete(&self) -> bool {
        self.order.len() == self.entries.len()
    }

    /// Latest planned finish time.
    pub fn expected_makespan(&self) -> f64 {
        self.entries().map(|e| e.finish).fold(0., f64::max)
    }
}
