use serde::Deserialize;

/// Common settings for workflow parsers.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ParserConfig {
    /// Speed of the machine task runtimes were measured on, in work units per second
    /// (default: 1000).
    #[serde(default = "default_reference_speed")]
    pub reference_speed: f64,
}

fn default_reference_speed() -> f64 {
    1000.
}

impl ParserConfig {
    pub fn with_reference_speed(speed: f64) -> Self {
        Self {
            reference_speed: speed,
        }
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self::with_reference_speed(default_reference_speed())
    }
}
