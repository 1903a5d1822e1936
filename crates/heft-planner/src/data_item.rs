//! Data item.

use serde::Serialize;

/// Represents a data item produced or consumed by workflow tasks.
///
/// Data items are produced by tasks or defined as workflow inputs. An item that links a producer to
/// its consumers is what turns into a weighted edge of the workflow graph.
#[derive(Clone, Debug, Serialize)]
pub struct DataItem {
    pub name: String,
    /// Size in MB.
    pub size: f64,
    /// Task producing this item, `None` for workflow inputs.
    pub producer: Option<usize>,
    pub(crate) consumers: Vec<usize>,
}

impl DataItem {
    /// Creates new data item.
    pub fn new(name: &str, size: f64, producer: Option<usize>) -> Self {
        Self {
            name: name.to_string(),
            size,
            producer,
            consumers: Vec::new(),
        }
    }

    /// Adds a [task](crate::task::Task) that consumes the data item.
    pub fn add_consumer(&mut self, consumer: usize) {
        self.consumers.push(consumer);
    }

    pub fn consumers(&self) -> &[usize] {
        &self.consumers
    }

    /// Whether the item is a workflow input (not produced by any task).
    pub fn is_input(&self) -> bool {
        self.producer.is_none()
    }
}
