//! Component clock used for log prefixes.

/// Name and current time of a planning or simulation component.
///
/// Planning happens before execution, so planner contexts stay at time zero while the
/// simulator context follows the replay clock.
#[derive(Clone, Debug)]
pub struct SimulationContext {
    name: String,
    time: f64,
}

impl SimulationContext {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            time: 0.,
        }
    }

    /// Returns the name of component associated with this context.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current time of the component.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub(crate) fn set_time(&mut self, time: f64) {
        self.time = time;
    }
}
